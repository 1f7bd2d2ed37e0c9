/// Assignment model and database operations
///
/// An assignment binds one task to its responsible user and carries the
/// user's priority flag for that task.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE assignments (
///     id BIGSERIAL PRIMARY KEY,
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     task_id BIGINT NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
///     is_priority BOOLEAN NOT NULL DEFAULT FALSE
/// );
/// ```

use super::task::{Task, TaskPriority, TaskStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgExecutor;
use uuid::Uuid;

const ASSIGNMENT_COLUMNS: &str = "id, user_id, task_id, is_priority";

/// Assignment row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Assignment {
    pub id: i64,
    pub user_id: Uuid,
    pub task_id: i64,
    pub is_priority: bool,
}

/// Input for creating an assignment
#[derive(Debug, Clone)]
pub struct CreateAssignment {
    pub user_id: Uuid,
    pub task_id: i64,
    pub is_priority: bool,
}

/// Partial assignment update
#[derive(Debug, Clone, Default)]
pub struct UpdateAssignment {
    /// Repoint the assignment to another user
    pub user_id: Option<Uuid>,
    pub is_priority: Option<bool>,
}

/// An assignment together with the task it points to
#[derive(Debug, Clone, PartialEq)]
pub struct AssignedTask {
    pub assignment: Assignment,
    pub task: Task,
}

/// Flat row returned by the assignments/tasks join
#[derive(sqlx::FromRow)]
struct AssignedTaskRow {
    assignment_id: i64,
    user_id: Uuid,
    task_id: i64,
    is_priority: bool,
    title: String,
    description: Option<String>,
    priority: Option<TaskPriority>,
    due_date: Option<DateTime<Utc>>,
    status: TaskStatus,
    created_by: Option<String>,
    note: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<AssignedTaskRow> for AssignedTask {
    fn from(row: AssignedTaskRow) -> Self {
        Self {
            assignment: Assignment {
                id: row.assignment_id,
                user_id: row.user_id,
                task_id: row.task_id,
                is_priority: row.is_priority,
            },
            task: Task {
                id: row.task_id,
                title: row.title,
                description: row.description,
                priority: row.priority,
                due_date: row.due_date,
                status: row.status,
                created_by: row.created_by,
                note: row.note,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
        }
    }
}

impl Assignment {
    /// Inserts a new assignment
    pub async fn create<'e, E>(executor: E, data: CreateAssignment) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            r#"
            INSERT INTO assignments (user_id, task_id, is_priority)
            VALUES ($1, $2, $3)
            RETURNING {ASSIGNMENT_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Assignment>(&query)
            .bind(data.user_id)
            .bind(data.task_id)
            .bind(data.is_priority)
            .fetch_one(executor)
            .await
    }

    /// Finds the (first) assignment of a task
    pub async fn find_by_task<'e, E>(executor: E, task_id: i64) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "SELECT {ASSIGNMENT_COLUMNS} FROM assignments WHERE task_id = $1 ORDER BY id LIMIT 1"
        );

        sqlx::query_as::<_, Assignment>(&query)
            .bind(task_id)
            .fetch_optional(executor)
            .await
    }

    /// Finds the assignment binding `task_id` to `user_id`
    pub async fn find_by_task_and_user<'e, E>(
        executor: E,
        task_id: i64,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "SELECT {ASSIGNMENT_COLUMNS} FROM assignments WHERE task_id = $1 AND user_id = $2 ORDER BY id LIMIT 1"
        );

        sqlx::query_as::<_, Assignment>(&query)
            .bind(task_id)
            .bind(user_id)
            .fetch_optional(executor)
            .await
    }

    /// Applies a partial update to an assignment
    pub async fn update<'e, E>(
        executor: E,
        id: i64,
        data: UpdateAssignment,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            r#"
            UPDATE assignments
            SET user_id = COALESCE($2, user_id),
                is_priority = COALESCE($3, is_priority)
            WHERE id = $1
            RETURNING {ASSIGNMENT_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Assignment>(&query)
            .bind(id)
            .bind(data.user_id)
            .bind(data.is_priority)
            .fetch_optional(executor)
            .await
    }

    /// Lists a user's assignments joined with their tasks
    ///
    /// Ordered newest assignment first; with `priority_only` ordered by task
    /// id descending and filtered to flagged assignments.
    pub async fn list_for_user<'e, E>(
        executor: E,
        user_id: Uuid,
        priority_only: bool,
    ) -> Result<Vec<AssignedTask>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let (filter, order) = if priority_only {
            ("AND a.is_priority", "t.id DESC")
        } else {
            ("", "a.id DESC")
        };

        let query = format!(
            r#"
            SELECT a.id AS assignment_id, a.user_id, a.task_id, a.is_priority,
                   t.title, t.description, t.priority, t.due_date, t.status,
                   t.created_by, t.note, t.created_at, t.updated_at
            FROM assignments a
            JOIN tasks t ON t.id = a.task_id
            WHERE a.user_id = $1 {filter}
            ORDER BY {order}
            "#
        );

        let rows = sqlx::query_as::<_, AssignedTaskRow>(&query)
            .bind(user_id)
            .fetch_all(executor)
            .await?;

        Ok(rows.into_iter().map(AssignedTask::from).collect())
    }
}
