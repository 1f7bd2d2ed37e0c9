/// Task creation, updates and per-user projections
///
/// Every task created here is paired with exactly one assignment. The pair
/// is written through [`Store::create_assigned_task`], so a failed
/// assignment insert never leaves the task behind.

use crate::error::{ServiceError, ServiceResult};
use crate::models::{
    assignment::{AssignedTask, Assignment, CreateAssignment, UpdateAssignment},
    task::{CreateTask, Task, TaskPriority, TaskStatus, UpdateTask},
    user::User,
};
use crate::store::Store;
use crate::validation::{
    check, parse_due_date, validate_due_date, validate_priority, validate_status, WireNames,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

/// A new task and the username it is assigned to
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct NewTask {
    #[serde(rename = "titulo")]
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,

    #[serde(rename = "usernameAsignado")]
    #[validate(length(min = 1, message = "Assignee username is required"))]
    pub assignee: String,

    #[serde(rename = "descripcion")]
    pub description: Option<String>,

    #[serde(rename = "prioridad")]
    #[validate(custom(function = "validate_priority"))]
    pub priority: Option<String>,

    #[serde(rename = "fechaVencimiento")]
    #[validate(custom(function = "validate_due_date"))]
    pub due_date: Option<String>,

    #[serde(rename = "estado")]
    #[validate(custom(function = "validate_status"))]
    pub status: Option<String>,

    /// Free-text creator label
    #[serde(rename = "asignadoPor")]
    pub created_by: Option<String>,

    #[serde(rename = "nota")]
    pub note: Option<String>,

    #[serde(rename = "esPrioridad")]
    pub is_priority: Option<bool>,
}

impl WireNames for NewTask {
    const WIRE_NAMES: &'static [(&'static str, &'static str)] = &[
        ("title", "titulo"),
        ("assignee", "usernameAsignado"),
        ("priority", "prioridad"),
        ("due_date", "fechaVencimiento"),
        ("status", "estado"),
    ];
}

/// Distinguishes an explicit `null` (`Some(None)`) from an absent key (`None`)
pub fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Partial task update
///
/// Absent fields are left untouched. Nullable fields accept `null` to clear
/// the stored value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TaskChanges {
    #[serde(rename = "titulo")]
    pub title: Option<String>,

    #[serde(rename = "descripcion", deserialize_with = "nullable")]
    pub description: Option<Option<String>>,

    #[serde(rename = "prioridad", deserialize_with = "nullable")]
    pub priority: Option<Option<String>>,

    #[serde(rename = "fechaVencimiento", deserialize_with = "nullable")]
    pub due_date: Option<Option<String>>,

    #[serde(rename = "estado")]
    pub status: Option<String>,

    #[serde(rename = "asignadoPor", deserialize_with = "nullable")]
    pub created_by: Option<Option<String>>,

    #[serde(rename = "nota", deserialize_with = "nullable")]
    pub note: Option<Option<String>>,

    /// Reassign to this username (creates the assignment if missing)
    #[serde(rename = "usernameAsignado")]
    pub assignee: Option<String>,

    #[serde(rename = "esPrioridad")]
    pub is_priority: Option<bool>,
}

impl Validate for TaskChanges {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let mut rule = |field: &'static str, result: Result<(), ValidationError>| {
            if let Err(error) = result {
                errors.add(field, error);
            }
        };

        if let Some(title) = &self.title {
            rule("titulo", non_empty(title, "Title cannot be empty"));
        }
        if let Some(Some(priority)) = &self.priority {
            rule("prioridad", validate_priority(priority));
        }
        if let Some(Some(due_date)) = &self.due_date {
            rule("fechaVencimiento", validate_due_date(due_date));
        }
        if let Some(status) = &self.status {
            rule("estado", validate_status(status));
        }
        if let Some(assignee) = &self.assignee {
            rule("usernameAsignado", non_empty(assignee, "Assignee username cannot be empty"));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Empty optional text is stored as null
fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.is_empty())
}

// Errors are already keyed by request name
impl WireNames for TaskChanges {}

fn non_empty(value: &str, message: &'static str) -> Result<(), ValidationError> {
    if value.is_empty() {
        let mut error = ValidationError::new("length");
        error.message = Some(message.into());
        return Err(error);
    }
    Ok(())
}

/// Identity of a resolved user as echoed back to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRef {
    pub username: String,
    pub id: Uuid,
}

impl From<&User> for UserRef {
    fn from(user: &User) -> Self {
        Self {
            username: user.username.clone(),
            id: user.id,
        }
    }
}

/// Result of [`TaskService::create_task`]
#[derive(Debug, Clone)]
pub struct CreatedTask {
    pub task: Task,
    pub assignment: Assignment,
    pub assignee: UserRef,
}

/// Result of [`TaskService::update_task`]
#[derive(Debug, Clone)]
pub struct UpdatedTask {
    pub task: Task,

    /// Present when the assignment was repointed, created or re-flagged
    pub assignment: Option<Assignment>,
}

/// Task assignment service
#[derive(Clone)]
pub struct TaskService {
    store: Arc<dyn Store>,
}

impl TaskService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn create_task(&self, input: NewTask) -> ServiceResult<CreatedTask> {
        self.create_task_at(input, Utc::now()).await
    }

    /// Creates a task assigned to `input.assignee`
    ///
    /// # Errors
    ///
    /// - `Validation` for missing title/assignee or bad enumerated values
    /// - `NotFound` if the assignee doesn't exist (nothing is written)
    /// - `Store` if either insert fails
    pub async fn create_task_at(
        &self,
        input: NewTask,
        now: DateTime<Utc>,
    ) -> ServiceResult<CreatedTask> {
        check(&input)?;

        let user = self.resolve_user(&input.assignee, "Assigned user not found").await?;

        let data = CreateTask {
            title: input.title,
            description: non_blank(input.description),
            priority: input.priority.as_deref().map(parse_priority).transpose()?,
            due_date: input.due_date.as_deref().map(parse_date).transpose()?,
            status: input
                .status
                .as_deref()
                .map(parse_status)
                .transpose()?
                .unwrap_or_default(),
            created_by: non_blank(input.created_by),
            note: non_blank(input.note),
            now,
        };

        let (task, assignment) = self
            .store
            .create_assigned_task(data, user.id, input.is_priority.unwrap_or(false))
            .await?;

        info!(
            task_id = task.id,
            assignment_id = assignment.id,
            assignee = %user.username,
            "Task created"
        );

        Ok(CreatedTask {
            task,
            assignment,
            assignee: UserRef::from(&user),
        })
    }

    pub async fn update_task(&self, task_id: i64, changes: TaskChanges) -> ServiceResult<UpdatedTask> {
        self.update_task_at(task_id, changes, Utc::now()).await
    }

    /// Applies a partial update and adjusts the assignment
    ///
    /// A new assignee repoints the existing assignment or creates one.
    /// `is_priority` alone only touches an existing assignment.
    pub async fn update_task_at(
        &self,
        task_id: i64,
        changes: TaskChanges,
        now: DateTime<Utc>,
    ) -> ServiceResult<UpdatedTask> {
        check(&changes)?;

        if self.store.find_task(task_id).await?.is_none() {
            return Err(ServiceError::NotFound("Task not found".to_string()));
        }

        // Resolved before any write so an unknown assignee changes nothing
        let assignee = match changes.assignee.as_deref() {
            Some(username) => Some(self.resolve_user(username, "Assigned user not found").await?),
            None => None,
        };

        let update = UpdateTask {
            title: changes.title,
            description: changes.description,
            priority: changes
                .priority
                .map(|p| p.as_deref().map(parse_priority).transpose())
                .transpose()?,
            due_date: changes
                .due_date
                .map(|d| d.as_deref().map(parse_date).transpose())
                .transpose()?,
            status: changes.status.as_deref().map(parse_status).transpose()?,
            created_by: changes.created_by,
            note: changes.note,
        };

        let task = self
            .store
            .update_task(task_id, update, now)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Task not found".to_string()))?;

        let assignment = match (assignee, changes.is_priority) {
            (Some(user), is_priority) => Some(self.reassign(task_id, &user, is_priority).await?),
            (None, Some(is_priority)) => self.reflag(task_id, is_priority).await?,
            (None, None) => None,
        };

        debug!(task_id, "Task updated");

        Ok(UpdatedTask { task, assignment })
    }

    /// Tasks whose created-by label is `username`
    pub async fn tasks_created_by(&self, username: &str) -> ServiceResult<(UserRef, Vec<Task>)> {
        let user = self.resolve_user(username, "User not found").await?;
        let tasks = self.store.list_tasks_created_by(&user.username).await?;
        Ok((UserRef::from(&user), tasks))
    }

    pub async fn tasks_assigned_to(
        &self,
        username: &str,
    ) -> ServiceResult<(UserRef, Vec<AssignedTask>)> {
        let user = self.resolve_user(username, "User not found").await?;
        let tasks = self.store.list_assigned_tasks(user.id, false).await?;
        Ok((UserRef::from(&user), tasks))
    }

    pub async fn priority_tasks_of(
        &self,
        username: &str,
    ) -> ServiceResult<(UserRef, Vec<AssignedTask>)> {
        let user = self.resolve_user(username, "User not found").await?;
        let tasks = self.store.list_assigned_tasks(user.id, true).await?;
        Ok((UserRef::from(&user), tasks))
    }

    /// Flips the priority flag of `username`'s assignment on `task_id`
    pub async fn toggle_priority(&self, task_id: i64, username: &str) -> ServiceResult<Assignment> {
        if username.is_empty() {
            return Err(ServiceError::invalid("username", "Username is required"));
        }

        let user = self.resolve_user(username, "Assigned user not found").await?;

        let assignment = self
            .store
            .find_assignment(task_id, user.id)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound("No assignment found for this task and user".to_string())
            })?;

        let updated = self
            .store
            .update_assignment(
                assignment.id,
                UpdateAssignment {
                    user_id: None,
                    is_priority: Some(!assignment.is_priority),
                },
            )
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound("No assignment found for this task and user".to_string())
            })?;

        info!(task_id, is_priority = updated.is_priority, "Task priority toggled");

        Ok(updated)
    }

    async fn resolve_user(&self, username: &str, missing: &str) -> ServiceResult<User> {
        self.store
            .find_user_by_username(username)
            .await?
            .ok_or_else(|| ServiceError::NotFound(missing.to_string()))
    }

    async fn reassign(
        &self,
        task_id: i64,
        user: &User,
        is_priority: Option<bool>,
    ) -> ServiceResult<Assignment> {
        match self.store.find_assignment_by_task(task_id).await? {
            Some(existing) => {
                let updated = self
                    .store
                    .update_assignment(
                        existing.id,
                        UpdateAssignment {
                            user_id: Some(user.id),
                            is_priority,
                        },
                    )
                    .await?
                    .ok_or_else(|| ServiceError::NotFound("Assignment not found".to_string()))?;
                info!(task_id, assignee = %user.username, "Task reassigned");
                Ok(updated)
            }
            None => {
                let created = self
                    .store
                    .insert_assignment(CreateAssignment {
                        user_id: user.id,
                        task_id,
                        is_priority: is_priority.unwrap_or(false),
                    })
                    .await?;
                info!(task_id, assignee = %user.username, "Task assigned");
                Ok(created)
            }
        }
    }

    async fn reflag(&self, task_id: i64, is_priority: bool) -> ServiceResult<Option<Assignment>> {
        let Some(existing) = self.store.find_assignment_by_task(task_id).await? else {
            debug!(task_id, "No assignment to flag");
            return Ok(None);
        };

        let updated = self
            .store
            .update_assignment(
                existing.id,
                UpdateAssignment {
                    user_id: None,
                    is_priority: Some(is_priority),
                },
            )
            .await?;
        Ok(updated)
    }
}

// Inputs are validated before these run; the errors only guard direct callers
fn parse_priority(raw: &str) -> ServiceResult<TaskPriority> {
    raw.parse()
        .map_err(|message: String| ServiceError::invalid("prioridad", &message))
}

fn parse_status(raw: &str) -> ServiceResult<TaskStatus> {
    raw.parse()
        .map_err(|message: String| ServiceError::invalid("estado", &message))
}

fn parse_date(raw: &str) -> ServiceResult<DateTime<Utc>> {
    parse_due_date(raw)
        .ok_or_else(|| ServiceError::invalid("fechaVencimiento", "Due date must be a valid ISO 8601 date"))
}
