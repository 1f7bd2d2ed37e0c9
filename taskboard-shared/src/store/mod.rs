/// Persistence abstraction for users, tasks and assignments
///
/// Services receive an `Arc<dyn Store>` at construction time; nothing in the
/// crate reaches for a global database handle.
///
/// # Implementations
///
/// - [`postgres::PgStore`]: sqlx/PostgreSQL, delegating to the model layer
/// - [`memory::MemoryStore`]: process-local tables with fault injection
///
/// # Consistency
///
/// The store gives no cross-table transaction guarantee in general.
/// [`Store::create_assigned_task`] is the one multi-row write; its default
/// body compensates a failed assignment insert by deleting the task, and
/// stores with real transactions override it.

pub mod memory;
pub mod postgres;

use crate::models::{
    assignment::{AssignedTask, Assignment, CreateAssignment, UpdateAssignment},
    task::{CreateTask, Task, UpdateTask},
    user::{CreateUser, User},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Store error type
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique key (email, username, ...) is already taken
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    /// Database driver error
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    /// The store could not complete the operation
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            // 23505 = unique_violation
            if db_err.code().as_deref() == Some("23505") {
                let constraint = db_err.constraint().unwrap_or("unknown").to_string();
                return StoreError::UniqueViolation(constraint);
            }
        }
        StoreError::Database(err)
    }
}

/// Store result type alias
pub type StoreResult<T> = Result<T, StoreError>;

/// Persistent row store used by the auth and task services
#[async_trait]
pub trait Store: Send + Sync {
    /// Verifies connectivity
    async fn ping(&self) -> StoreResult<()>;

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>>;

    /// Inserts a user with a zero failure count
    async fn insert_user(&self, data: CreateUser) -> StoreResult<User>;

    /// Persists the failure counter and last-failed-attempt timestamp
    async fn update_login_state(
        &self,
        user_id: Uuid,
        failed_attempts: i32,
        last_failed_attempt: Option<DateTime<Utc>>,
    ) -> StoreResult<()>;

    async fn update_password(&self, user_id: Uuid, password_hash: &str) -> StoreResult<Option<User>>;

    async fn insert_task(&self, data: CreateTask) -> StoreResult<Task>;

    async fn find_task(&self, task_id: i64) -> StoreResult<Option<Task>>;

    /// Applies present fields and sets `updated_at = now`
    async fn update_task(
        &self,
        task_id: i64,
        data: UpdateTask,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Task>>;

    async fn delete_task(&self, task_id: i64) -> StoreResult<bool>;

    /// Tasks whose created-by label equals `label`, newest first
    async fn list_tasks_created_by(&self, label: &str) -> StoreResult<Vec<Task>>;

    async fn insert_assignment(&self, data: CreateAssignment) -> StoreResult<Assignment>;

    async fn find_assignment_by_task(&self, task_id: i64) -> StoreResult<Option<Assignment>>;

    async fn find_assignment(&self, task_id: i64, user_id: Uuid) -> StoreResult<Option<Assignment>>;

    async fn update_assignment(
        &self,
        assignment_id: i64,
        data: UpdateAssignment,
    ) -> StoreResult<Option<Assignment>>;

    /// Assignments of a user joined with their tasks
    async fn list_assigned_tasks(
        &self,
        user_id: Uuid,
        priority_only: bool,
    ) -> StoreResult<Vec<AssignedTask>>;

    /// Creates a task and its assignment as one logical write
    ///
    /// If the assignment insert fails the task is deleted again before the
    /// error is returned, so this path never leaves an unassigned task.
    async fn create_assigned_task(
        &self,
        task: CreateTask,
        user_id: Uuid,
        is_priority: bool,
    ) -> StoreResult<(Task, Assignment)> {
        let task = self.insert_task(task).await?;

        let assignment = match self
            .insert_assignment(CreateAssignment {
                user_id,
                task_id: task.id,
                is_priority,
            })
            .await
        {
            Ok(assignment) => assignment,
            Err(err) => {
                tracing::warn!(
                    task_id = task.id,
                    error = %err,
                    "Assignment insert failed, deleting task"
                );
                if let Err(cleanup_err) = self.delete_task(task.id).await {
                    tracing::error!(
                        task_id = task.id,
                        error = %cleanup_err,
                        "Failed to delete task after assignment failure; task is orphaned"
                    );
                }
                return Err(err);
            }
        };

        Ok((task, assignment))
    }
}
