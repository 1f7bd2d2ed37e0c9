/// Task assignment
///
/// [`service::TaskService`] creates tasks together with their assignment,
/// applies partial updates and serves the per-user task listings.

pub mod service;
