/// PostgreSQL store backed by a sqlx connection pool
///
/// Delegates every operation to the model layer. Task creation with its
/// assignment runs inside a single transaction instead of relying on
/// compensation.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use taskboard_shared::db::pool::{create_pool, DatabaseConfig};
/// use taskboard_shared::store::{postgres::PgStore, Store};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig {
///     url: std::env::var("DATABASE_URL")?,
///     ..Default::default()
/// }).await?;
///
/// let store: Arc<dyn Store> = Arc::new(PgStore::new(pool));
/// store.ping().await?;
/// # Ok(())
/// # }
/// ```

use super::{Store, StoreResult};
use crate::db::pool::health_check;
use crate::models::{
    assignment::{AssignedTask, Assignment, CreateAssignment, UpdateAssignment},
    task::{CreateTask, Task, UpdateTask},
    user::{CreateUser, User},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

/// sqlx-backed [`Store`]
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Underlying pool, for migrations and shutdown
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(health_check(&self.pool).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(User::find_by_email(&self.pool, email).await?)
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        Ok(User::find_by_username(&self.pool, username).await?)
    }

    async fn insert_user(&self, data: CreateUser) -> StoreResult<User> {
        Ok(User::create(&self.pool, data).await?)
    }

    async fn update_login_state(
        &self,
        user_id: Uuid,
        failed_attempts: i32,
        last_failed_attempt: Option<DateTime<Utc>>,
    ) -> StoreResult<()> {
        let updated =
            User::update_login_state(&self.pool, user_id, failed_attempts, last_failed_attempt)
                .await?;
        if !updated {
            debug!(%user_id, "Login state update matched no user");
        }
        Ok(())
    }

    async fn update_password(&self, user_id: Uuid, password_hash: &str) -> StoreResult<Option<User>> {
        Ok(User::update_password(&self.pool, user_id, password_hash).await?)
    }

    async fn insert_task(&self, data: CreateTask) -> StoreResult<Task> {
        Ok(Task::create(&self.pool, data).await?)
    }

    async fn find_task(&self, task_id: i64) -> StoreResult<Option<Task>> {
        Ok(Task::find_by_id(&self.pool, task_id).await?)
    }

    async fn update_task(
        &self,
        task_id: i64,
        data: UpdateTask,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Task>> {
        Ok(Task::update(&self.pool, task_id, data, now).await?)
    }

    async fn delete_task(&self, task_id: i64) -> StoreResult<bool> {
        Ok(Task::delete(&self.pool, task_id).await?)
    }

    async fn list_tasks_created_by(&self, label: &str) -> StoreResult<Vec<Task>> {
        Ok(Task::list_by_created_by(&self.pool, label).await?)
    }

    async fn insert_assignment(&self, data: CreateAssignment) -> StoreResult<Assignment> {
        Ok(Assignment::create(&self.pool, data).await?)
    }

    async fn find_assignment_by_task(&self, task_id: i64) -> StoreResult<Option<Assignment>> {
        Ok(Assignment::find_by_task(&self.pool, task_id).await?)
    }

    async fn find_assignment(&self, task_id: i64, user_id: Uuid) -> StoreResult<Option<Assignment>> {
        Ok(Assignment::find_by_task_and_user(&self.pool, task_id, user_id).await?)
    }

    async fn update_assignment(
        &self,
        assignment_id: i64,
        data: UpdateAssignment,
    ) -> StoreResult<Option<Assignment>> {
        Ok(Assignment::update(&self.pool, assignment_id, data).await?)
    }

    async fn list_assigned_tasks(
        &self,
        user_id: Uuid,
        priority_only: bool,
    ) -> StoreResult<Vec<AssignedTask>> {
        Ok(Assignment::list_for_user(&self.pool, user_id, priority_only).await?)
    }

    async fn create_assigned_task(
        &self,
        task: CreateTask,
        user_id: Uuid,
        is_priority: bool,
    ) -> StoreResult<(Task, Assignment)> {
        let mut tx = self.pool.begin().await?;

        let task = Task::create(&mut *tx, task).await?;
        let assignment = Assignment::create(
            &mut *tx,
            CreateAssignment {
                user_id,
                task_id: task.id,
                is_priority,
            },
        )
        .await?;

        // Dropping `tx` on an early return rolls back both inserts
        tx.commit().await?;

        debug!(task_id = task.id, assignment_id = assignment.id, "Task and assignment committed");
        Ok((task, assignment))
    }
}
