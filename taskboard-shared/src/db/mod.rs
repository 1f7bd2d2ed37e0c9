/// Database layer for Taskboard
///
/// # Modules
///
/// - `pool`: PostgreSQL connection pool with health checks
/// - `migrations`: Schema migration runner
///
/// Row types and their queries live in [`crate::models`].

pub mod migrations;
pub mod pool;
