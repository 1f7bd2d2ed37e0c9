/// Database models for Taskboard
///
/// Each model exposes associated async functions that run against any
/// PostgreSQL executor (a pool or an open transaction).
///
/// # Models
///
/// - `user`: User accounts, credentials and login throttle state
/// - `task`: Tasks with priority, status and due date
/// - `assignment`: Task-to-user binding with a priority flag
///
/// # Example
///
/// ```no_run
/// use taskboard_shared::models::task::{CreateTask, Task, TaskStatus};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let task = Task::create(&pool, CreateTask {
///     title: "Review budget".to_string(),
///     description: None,
///     priority: None,
///     due_date: None,
///     status: TaskStatus::Pending,
///     created_by: Some("ana".to_string()),
///     note: None,
///     now: chrono::Utc::now(),
/// }).await?;
/// # Ok(())
/// # }
/// ```

pub mod assignment;
pub mod task;
pub mod user;
