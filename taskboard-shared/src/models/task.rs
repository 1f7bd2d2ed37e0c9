/// Task model and database operations
///
/// A task is a unit of work with an optional priority and due date. Tasks
/// are bound to their responsible user through an
/// [`Assignment`](crate::models::assignment::Assignment).
///
/// # Status values
///
/// ```text
/// pendiente | en_progreso | completada | cancelada
/// ```
///
/// Any status may be set directly; there is no enforced transition order.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE task_priority AS ENUM ('alta', 'media', 'baja');
/// CREATE TYPE task_status AS ENUM ('pendiente', 'en_progreso', 'completada', 'cancelada');
///
/// CREATE TABLE tasks (
///     id BIGSERIAL PRIMARY KEY,
///     title TEXT NOT NULL,
///     description TEXT,
///     priority task_priority,
///     due_date TIMESTAMPTZ,
///     status task_status NOT NULL DEFAULT 'pendiente',
///     created_by TEXT,
///     note TEXT,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgExecutor;
use std::fmt;
use std::str::FromStr;

const TASK_COLUMNS: &str = "id, title, description, priority, due_date, status, created_by, \
     note, created_at, updated_at";

/// Task priority
///
/// Stored and exchanged with the Spanish wire values `alta`, `media`, `baja`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_priority")]
pub enum TaskPriority {
    #[serde(rename = "alta")]
    #[sqlx(rename = "alta")]
    High,

    #[serde(rename = "media")]
    #[sqlx(rename = "media")]
    Medium,

    #[serde(rename = "baja")]
    #[sqlx(rename = "baja")]
    Low,
}

impl TaskPriority {
    pub const ALL: [TaskPriority; 3] = [TaskPriority::High, TaskPriority::Medium, TaskPriority::Low];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::High => "alta",
            TaskPriority::Medium => "media",
            TaskPriority::Low => "baja",
        }
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskPriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskPriority::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| format!("unknown priority '{}'", s))
    }
}

/// Task status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status")]
pub enum TaskStatus {
    #[default]
    #[serde(rename = "pendiente")]
    #[sqlx(rename = "pendiente")]
    Pending,

    #[serde(rename = "en_progreso")]
    #[sqlx(rename = "en_progreso")]
    InProgress,

    #[serde(rename = "completada")]
    #[sqlx(rename = "completada")]
    Completed,

    #[serde(rename = "cancelada")]
    #[sqlx(rename = "cancelada")]
    Cancelled,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 4] = [
        TaskStatus::Pending,
        TaskStatus::InProgress,
        TaskStatus::Completed,
        TaskStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pendiente",
            TaskStatus::InProgress => "en_progreso",
            TaskStatus::Completed => "completada",
            TaskStatus::Cancelled => "cancelada",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskStatus::ALL
            .into_iter()
            .find(|st| st.as_str() == s)
            .ok_or_else(|| format!("unknown status '{}'", s))
    }
}

/// Task row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    pub id: i64,

    /// Required, non-empty title
    pub title: String,

    pub description: Option<String>,

    pub priority: Option<TaskPriority>,

    pub due_date: Option<DateTime<Utc>>,

    pub status: TaskStatus,

    /// Free-text label of whoever created the task (usually a username)
    pub created_by: Option<String>,

    pub note: Option<String>,

    pub created_at: DateTime<Utc>,

    /// Refreshed on every update
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new task
#[derive(Debug, Clone)]
pub struct CreateTask {
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<DateTime<Utc>>,
    pub status: TaskStatus,
    pub created_by: Option<String>,
    pub note: Option<String>,
    /// Used for both `created_at` and `updated_at`
    pub now: DateTime<Utc>,
}

/// Partial task update
///
/// Only non-None fields are written. Nullable columns use `Option<Option<_>>`
/// so that `Some(None)` clears the value. `updated_at` is always set.
#[derive(Debug, Clone, Default)]
pub struct UpdateTask {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub priority: Option<Option<TaskPriority>>,
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub status: Option<TaskStatus>,
    pub created_by: Option<Option<String>>,
    pub note: Option<Option<String>>,
}

impl UpdateTask {
    /// Applies the present fields to an in-memory task
    pub fn apply_to(&self, task: &mut Task, now: DateTime<Utc>) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(description) = &self.description {
            task.description = description.clone();
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(due_date) = self.due_date {
            task.due_date = due_date;
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(created_by) = &self.created_by {
            task.created_by = created_by.clone();
        }
        if let Some(note) = &self.note {
            task.note = note.clone();
        }
        task.updated_at = now;
    }
}

impl Task {
    /// Inserts a new task
    pub async fn create<'e, E>(executor: E, data: CreateTask) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            r#"
            INSERT INTO tasks (title, description, priority, due_date, status, created_by, note, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
            RETURNING {TASK_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Task>(&query)
            .bind(data.title)
            .bind(data.description)
            .bind(data.priority)
            .bind(data.due_date)
            .bind(data.status)
            .bind(data.created_by)
            .bind(data.note)
            .bind(data.now)
            .fetch_one(executor)
            .await
    }

    /// Finds a task by ID
    pub async fn find_by_id<'e, E>(executor: E, id: i64) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1");

        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Applies a partial update
    ///
    /// # Returns
    ///
    /// The updated task, or None if it doesn't exist
    pub async fn update<'e, E>(
        executor: E,
        id: i64,
        data: UpdateTask,
        now: DateTime<Utc>,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        // $1 = id, $2 = updated_at
        let mut query = String::from("UPDATE tasks SET updated_at = $2");
        let mut bind_count = 2;

        let mut push = |column: &str, present: bool| {
            if present {
                bind_count += 1;
                query.push_str(&format!(", {} = ${}", column, bind_count));
            }
        };
        push("title", data.title.is_some());
        push("description", data.description.is_some());
        push("priority", data.priority.is_some());
        push("due_date", data.due_date.is_some());
        push("status", data.status.is_some());
        push("created_by", data.created_by.is_some());
        push("note", data.note.is_some());

        query.push_str(&format!(" WHERE id = $1 RETURNING {TASK_COLUMNS}"));

        let mut q = sqlx::query_as::<_, Task>(&query).bind(id).bind(now);

        if let Some(title) = data.title {
            q = q.bind(title);
        }
        if let Some(description) = data.description {
            q = q.bind(description);
        }
        if let Some(priority) = data.priority {
            q = q.bind(priority);
        }
        if let Some(due_date) = data.due_date {
            q = q.bind(due_date);
        }
        if let Some(status) = data.status {
            q = q.bind(status);
        }
        if let Some(created_by) = data.created_by {
            q = q.bind(created_by);
        }
        if let Some(note) = data.note {
            q = q.bind(note);
        }

        q.fetch_optional(executor).await
    }

    /// Lists tasks whose created-by label equals `label`, newest first
    pub async fn list_by_created_by<'e, E>(executor: E, label: &str) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE created_by = $1 ORDER BY created_at DESC, id DESC"
        );

        sqlx::query_as::<_, Task>(&query)
            .bind(label)
            .fetch_all(executor)
            .await
    }

    /// Deletes a task (assignments cascade)
    pub async fn delete<'e, E>(executor: E, id: i64) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
