/// Task endpoints
///
/// # Endpoints
///
/// - `POST  /api/tasks` - Create a task and assign it
/// - `PATCH /api/tasks/:id` - Partial update, optionally reassigning
/// - `GET   /api/tasks/createdByUser/:username` - Tasks labelled as created by a user
/// - `GET   /api/tasks/assignedToUser/:username` - Assignments of a user with their tasks
/// - `GET   /api/tasks/priority/:username` - A user's priority tasks
/// - `PATCH /api/tasks/priority/:idTarea` - Toggle a user's priority flag
/// - `PATCH /api/tasks/note/:id` - Set or clear the note
/// - `PATCH /api/tasks/status/:id` - Change the status
///
/// Field names on the wire are Spanish (`titulo`, `estado`, ...), matching
/// the existing client.

use super::{ApiJson, Envelope};
use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use taskboard_shared::models::{
    assignment::{AssignedTask, Assignment},
    task::{Task, TaskPriority, TaskStatus},
};
use taskboard_shared::tasks::service::{nullable, NewTask, TaskChanges, UserRef};
use taskboard_shared::validation::parse_task_id;
use uuid::Uuid;

/// Task as exposed to clients
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskView {
    pub id: i64,
    pub titulo: String,
    pub descripcion: Option<String>,
    pub prioridad: Option<TaskPriority>,
    pub fecha_creacion: DateTime<Utc>,
    pub fecha_vencimiento: Option<DateTime<Utc>>,
    pub estado: TaskStatus,
    pub asignado_por: Option<String>,
    pub nota: Option<String>,
    pub ultima_actualizacion: DateTime<Utc>,
}

impl From<Task> for TaskView {
    fn from(task: Task) -> Self {
        Self {
            id: task.id,
            titulo: task.title,
            descripcion: task.description,
            prioridad: task.priority,
            fecha_creacion: task.created_at,
            fecha_vencimiento: task.due_date,
            estado: task.status,
            asignado_por: task.created_by,
            nota: task.note,
            ultima_actualizacion: task.updated_at,
        }
    }
}

/// Assignment as exposed to clients
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentView {
    pub id: i64,
    pub id_user: Uuid,
    pub id_tarea: i64,
    pub es_prioridad: bool,
}

impl From<Assignment> for AssignmentView {
    fn from(assignment: Assignment) -> Self {
        Self {
            id: assignment.id,
            id_user: assignment.user_id,
            id_tarea: assignment.task_id,
            es_prioridad: assignment.is_priority,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AssignedTaskView {
    pub asignacion: AssignmentView,
    pub tarea: TaskView,
}

impl From<AssignedTask> for AssignedTaskView {
    fn from(row: AssignedTask) -> Self {
        Self {
            asignacion: row.assignment.into(),
            tarea: row.task.into(),
        }
    }
}

/// Priority listing entry: the task plus its flag
#[derive(Debug, Serialize)]
pub struct PriorityTaskView {
    #[serde(flatten)]
    pub tarea: TaskView,

    #[serde(rename = "esPrioridad")]
    pub es_prioridad: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedPayload {
    pub tarea: TaskView,
    pub asignacion: AssignmentView,
    pub usuario_asignado: UserRef,
}

#[derive(Debug, Serialize)]
pub struct UpdatedPayload {
    pub tarea: TaskView,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub asignacion: Option<AssignmentView>,
}

#[derive(Debug, Serialize)]
pub struct TaskPayload {
    pub tarea: TaskView,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedByPayload {
    pub usuario: UserRef,
    pub tareas: Vec<TaskView>,
    pub total_tareas: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignedPayload {
    pub usuario: UserRef,
    pub tareas_asignadas: Vec<AssignedTaskView>,
    pub total_tareas: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriorityPayload {
    pub usuario: UserRef,
    pub tareas_prioritarias: Vec<PriorityTaskView>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggledPayload {
    pub asignacion_actualizada: AssignmentView,
}

/// Body of `PATCH /priority/:idTarea`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TogglePriorityRequest {
    pub username: String,
}

/// Body of `PATCH /note/:id`
///
/// An explicit `null` clears the note; a missing `nota` leaves it as is.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NoteRequest {
    #[serde(deserialize_with = "nullable")]
    pub nota: Option<Option<String>>,
}

/// Body of `PATCH /status/:id`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StatusRequest {
    pub estado: Option<String>,
}

/// Create a task assigned to `usernameAsignado`
///
/// # Errors
///
/// - `400 Bad Request`: Missing title/assignee or invalid enumerated values
/// - `404 Not Found`: Assignee doesn't exist
/// - `500 Internal Server Error`: Server error (no task is left behind)
pub async fn create_task(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<NewTask>,
) -> ApiResult<(StatusCode, Json<Envelope<CreatedPayload>>)> {
    let created = state.tasks.create_task(req).await?;

    Ok((
        StatusCode::CREATED,
        Json(Envelope::ok(
            "Task created and assigned successfully",
            CreatedPayload {
                tarea: created.task.into(),
                asignacion: created.assignment.into(),
                usuario_asignado: created.assignee,
            },
        )),
    ))
}

/// Partial update of any task field, optionally reassigning
pub async fn update_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<TaskChanges>,
) -> ApiResult<Json<Envelope<UpdatedPayload>>> {
    let task_id = parse_task_id(&id)?;
    let updated = state.tasks.update_task(task_id, req).await?;

    Ok(Json(Envelope::ok(
        format!("Task {} updated successfully", task_id),
        UpdatedPayload {
            tarea: updated.task.into(),
            asignacion: updated.assignment.map(Into::into),
        },
    )))
}

pub async fn created_by_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> ApiResult<Json<Envelope<CreatedByPayload>>> {
    let (usuario, tasks) = state.tasks.tasks_created_by(&username).await?;
    let tareas: Vec<TaskView> = tasks.into_iter().map(Into::into).collect();

    Ok(Json(Envelope::ok(
        format!("Tasks created by {}", usuario.username),
        CreatedByPayload {
            total_tareas: tareas.len(),
            usuario,
            tareas,
        },
    )))
}

pub async fn assigned_to_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> ApiResult<Json<Envelope<AssignedPayload>>> {
    let (usuario, rows) = state.tasks.tasks_assigned_to(&username).await?;
    let tareas_asignadas: Vec<AssignedTaskView> = rows.into_iter().map(Into::into).collect();

    Ok(Json(Envelope::ok(
        format!("Tasks assigned to {}", usuario.username),
        AssignedPayload {
            total_tareas: tareas_asignadas.len(),
            usuario,
            tareas_asignadas,
        },
    )))
}

/// `GET /priority/:username`
pub async fn priority_tasks(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> ApiResult<Json<Envelope<PriorityPayload>>> {
    let (usuario, rows) = state.tasks.priority_tasks_of(&username).await?;
    let tareas_prioritarias: Vec<PriorityTaskView> = rows
        .into_iter()
        .map(|row| PriorityTaskView {
            es_prioridad: row.assignment.is_priority,
            tarea: row.task.into(),
        })
        .collect();

    Ok(Json(Envelope::ok(
        format!(
            "{} priority tasks for user {}",
            tareas_prioritarias.len(),
            usuario.username
        ),
        PriorityPayload {
            usuario,
            tareas_prioritarias,
        },
    )))
}

/// `PATCH /priority/:idTarea`
pub async fn toggle_priority(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<TogglePriorityRequest>,
) -> ApiResult<Json<Envelope<ToggledPayload>>> {
    let task_id = parse_task_id(&id)?;
    let assignment = state.tasks.toggle_priority(task_id, &req.username).await?;

    Ok(Json(Envelope::ok(
        format!(
            "Priority of task {} set to {} for user {}",
            task_id, assignment.is_priority, req.username
        ),
        ToggledPayload {
            asignacion_actualizada: assignment.into(),
        },
    )))
}

pub async fn update_note(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<NoteRequest>,
) -> ApiResult<Json<Envelope<TaskPayload>>> {
    let task_id = parse_task_id(&id)?;
    let changes = TaskChanges {
        note: req.nota,
        ..Default::default()
    };
    let updated = state.tasks.update_task(task_id, changes).await?;

    Ok(Json(Envelope::ok(
        format!("Note of task {} updated successfully", task_id),
        TaskPayload {
            tarea: updated.task.into(),
        },
    )))
}

pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<StatusRequest>,
) -> ApiResult<Json<Envelope<TaskPayload>>> {
    let task_id = parse_task_id(&id)?;
    let estado = req
        .estado
        .filter(|estado| !estado.is_empty())
        .ok_or_else(|| {
            ApiError::ValidationError(vec![taskboard_shared::error::FieldError::new(
                "estado",
                "Status is required",
            )])
        })?;

    let changes = TaskChanges {
        status: Some(estado),
        ..Default::default()
    };
    let updated = state.tasks.update_task(task_id, changes).await?;

    Ok(Json(Envelope::ok(
        format!(
            "Status of task {} set to '{}'",
            task_id,
            updated.task.status
        ),
        TaskPayload {
            tarea: updated.task.into(),
        },
    )))
}
