/// In-memory store
///
/// Keeps users, tasks and assignments in mutex-guarded tables with
/// sequential ids. Used by the test suites and when the server runs without
/// `DATABASE_URL`. Data is lost on restart.
///
/// Operations can be made to fail on demand with [`MemoryStore::fail_on`],
/// which is how store-failure and compensation paths are exercised.
///
/// # Example
///
/// ```
/// use taskboard_shared::store::memory::{FailPoint, MemoryStore};
///
/// let store = MemoryStore::new();
/// store.fail_on(FailPoint::InsertAssignment);
/// assert_eq!(store.task_count(), 0);
/// ```

use super::{Store, StoreError, StoreResult};
use crate::models::{
    assignment::{AssignedTask, Assignment, CreateAssignment, UpdateAssignment},
    task::{CreateTask, Task, UpdateTask},
    user::{CreateUser, User},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

/// Store operations that can be forced to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    Ping,
    FindUser,
    InsertUser,
    UpdateLoginState,
    /// Only login-state writes that zero the counter
    ResetLoginState,
    UpdatePassword,
    InsertTask,
    UpdateTask,
    DeleteTask,
    InsertAssignment,
    UpdateAssignment,
    ListTasks,
}

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    tasks: BTreeMap<i64, Task>,
    assignments: BTreeMap<i64, Assignment>,
    next_task_id: i64,
    next_assignment_id: i64,
    failing: HashSet<FailPoint>,
}

/// Process-local [`Store`]
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call of `point` fail until [`Self::recover`]
    pub fn fail_on(&self, point: FailPoint) {
        self.lock().failing.insert(point);
    }

    /// Clears all armed fail points
    pub fn recover(&self) {
        self.lock().failing.clear();
    }

    pub fn task_count(&self) -> usize {
        self.lock().tasks.len()
    }

    pub fn assignment_count(&self) -> usize {
        self.lock().assignments.len()
    }

    /// Snapshot of a user row, including secrets and throttle state
    pub fn user_by_username(&self, username: &str) -> Option<User> {
        self.lock()
            .users
            .iter()
            .find(|u| u.username == username)
            .cloned()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        // A panic while holding the lock cannot leave a row half-written
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Locks the tables, failing if `point` is armed
    fn tables_for(&self, point: FailPoint) -> StoreResult<MutexGuard<'_, Tables>> {
        let tables = self.lock();
        if tables.failing.contains(&point) {
            return Err(StoreError::Unavailable(format!("{:?} failed", point)));
        }
        Ok(tables)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        self.tables_for(FailPoint::Ping).map(|_| ())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let tables = self.tables_for(FailPoint::FindUser)?;
        Ok(tables.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let tables = self.tables_for(FailPoint::FindUser)?;
        Ok(tables.users.iter().find(|u| u.username == username).cloned())
    }

    async fn insert_user(&self, data: CreateUser) -> StoreResult<User> {
        let mut tables = self.tables_for(FailPoint::InsertUser)?;

        if tables.users.iter().any(|u| u.email == data.email) {
            return Err(StoreError::UniqueViolation("users_email_key".to_string()));
        }
        if tables.users.iter().any(|u| u.username == data.username) {
            return Err(StoreError::UniqueViolation("users_username_key".to_string()));
        }

        let user = User {
            id: Uuid::new_v4(),
            email: data.email,
            username: data.username,
            password_hash: data.password_hash,
            first_name: data.first_name,
            last_name: data.last_name,
            recovery_answer_hash: data.recovery_answer_hash,
            failed_attempts: 0,
            last_failed_attempt: None,
            created_at: Utc::now(),
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn update_login_state(
        &self,
        user_id: Uuid,
        failed_attempts: i32,
        last_failed_attempt: Option<DateTime<Utc>>,
    ) -> StoreResult<()> {
        let mut tables = self.tables_for(FailPoint::UpdateLoginState)?;
        if failed_attempts == 0 && tables.failing.contains(&FailPoint::ResetLoginState) {
            return Err(StoreError::Unavailable("ResetLoginState failed".to_string()));
        }
        if let Some(user) = tables.users.iter_mut().find(|u| u.id == user_id) {
            user.failed_attempts = failed_attempts;
            user.last_failed_attempt = last_failed_attempt;
        }
        Ok(())
    }

    async fn update_password(&self, user_id: Uuid, password_hash: &str) -> StoreResult<Option<User>> {
        let mut tables = self.tables_for(FailPoint::UpdatePassword)?;
        Ok(tables
            .users
            .iter_mut()
            .find(|u| u.id == user_id)
            .map(|user| {
                user.password_hash = password_hash.to_string();
                user.clone()
            }))
    }

    async fn insert_task(&self, data: CreateTask) -> StoreResult<Task> {
        let mut tables = self.tables_for(FailPoint::InsertTask)?;
        tables.next_task_id += 1;

        let task = Task {
            id: tables.next_task_id,
            title: data.title,
            description: data.description,
            priority: data.priority,
            due_date: data.due_date,
            status: data.status,
            created_by: data.created_by,
            note: data.note,
            created_at: data.now,
            updated_at: data.now,
        };
        tables.tasks.insert(task.id, task.clone());
        Ok(task)
    }

    async fn find_task(&self, task_id: i64) -> StoreResult<Option<Task>> {
        let tables = self.lock();
        Ok(tables.tasks.get(&task_id).cloned())
    }

    async fn update_task(
        &self,
        task_id: i64,
        data: UpdateTask,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Task>> {
        let mut tables = self.tables_for(FailPoint::UpdateTask)?;
        Ok(tables.tasks.get_mut(&task_id).map(|task| {
            data.apply_to(task, now);
            task.clone()
        }))
    }

    async fn delete_task(&self, task_id: i64) -> StoreResult<bool> {
        let mut tables = self.tables_for(FailPoint::DeleteTask)?;
        let removed = tables.tasks.remove(&task_id).is_some();
        // ON DELETE CASCADE
        tables.assignments.retain(|_, a| a.task_id != task_id);
        Ok(removed)
    }

    async fn list_tasks_created_by(&self, label: &str) -> StoreResult<Vec<Task>> {
        let tables = self.tables_for(FailPoint::ListTasks)?;
        let mut tasks: Vec<Task> = tables
            .tasks
            .values()
            .filter(|t| t.created_by.as_deref() == Some(label))
            .cloned()
            .collect();
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(tasks)
    }

    async fn insert_assignment(&self, data: CreateAssignment) -> StoreResult<Assignment> {
        let mut tables = self.tables_for(FailPoint::InsertAssignment)?;

        if !tables.tasks.contains_key(&data.task_id) {
            return Err(StoreError::Unavailable(format!(
                "task {} does not exist",
                data.task_id
            )));
        }

        tables.next_assignment_id += 1;
        let assignment = Assignment {
            id: tables.next_assignment_id,
            user_id: data.user_id,
            task_id: data.task_id,
            is_priority: data.is_priority,
        };
        tables.assignments.insert(assignment.id, assignment.clone());
        Ok(assignment)
    }

    async fn find_assignment_by_task(&self, task_id: i64) -> StoreResult<Option<Assignment>> {
        let tables = self.lock();
        Ok(tables
            .assignments
            .values()
            .find(|a| a.task_id == task_id)
            .cloned())
    }

    async fn find_assignment(&self, task_id: i64, user_id: Uuid) -> StoreResult<Option<Assignment>> {
        let tables = self.lock();
        Ok(tables
            .assignments
            .values()
            .find(|a| a.task_id == task_id && a.user_id == user_id)
            .cloned())
    }

    async fn update_assignment(
        &self,
        assignment_id: i64,
        data: UpdateAssignment,
    ) -> StoreResult<Option<Assignment>> {
        let mut tables = self.tables_for(FailPoint::UpdateAssignment)?;
        Ok(tables.assignments.get_mut(&assignment_id).map(|assignment| {
            if let Some(user_id) = data.user_id {
                assignment.user_id = user_id;
            }
            if let Some(is_priority) = data.is_priority {
                assignment.is_priority = is_priority;
            }
            assignment.clone()
        }))
    }

    async fn list_assigned_tasks(
        &self,
        user_id: Uuid,
        priority_only: bool,
    ) -> StoreResult<Vec<AssignedTask>> {
        let tables = self.tables_for(FailPoint::ListTasks)?;
        let mut rows: Vec<AssignedTask> = tables
            .assignments
            .values()
            .filter(|a| a.user_id == user_id && (!priority_only || a.is_priority))
            .filter_map(|a| {
                tables.tasks.get(&a.task_id).map(|task| AssignedTask {
                    assignment: a.clone(),
                    task: task.clone(),
                })
            })
            .collect();

        if priority_only {
            rows.sort_by(|a, b| b.task.id.cmp(&a.task.id));
        } else {
            rows.sort_by(|a, b| b.assignment.id.cmp(&a.assignment.id));
        }
        Ok(rows)
    }
}
