use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use validator::Validate;

use crate::{
    error::{ServiceError, not_found, validation},
    service::entitlement::{EntitlementResolver, EvaluationView},
    store::RecordStore,
    types::{NewTask, Task, TaskFilter, TaskId, TaskPatch, TaskStatus, User},
};

pub const DEFAULT_LIST_LIMIT: usize = 10;
pub const MAX_LIST_LIMIT: usize = 100;

fn default_max_code_bytes() -> usize {
    100_000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskLimits {
    #[serde(default = "default_max_code_bytes")]
    pub max_code_bytes: usize,
}

impl Default for TaskLimits {
    fn default() -> Self {
        Self {
            max_code_bytes: default_max_code_bytes(),
        }
    }
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    #[validate(length(max = 200, message = "Title must be at most 200 characters"))]
    pub title: Option<String>,
    #[validate(length(max = 5000, message = "Description must be at most 5000 characters"))]
    pub description: Option<String>,
    pub code_content: Option<String>,
    #[validate(length(max = 50, message = "Language must be at most 50 characters"))]
    pub language: Option<String>,
    #[serde(default, alias = "user_id")]
    pub user_id: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    #[validate(length(max = 200, message = "Title must be at most 200 characters"))]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub description: Option<Option<String>>,
    pub code_content: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub language: Option<Option<String>>,
    /// Only accepted so it can be refused; status belongs to the evaluation
    /// state machine.
    #[serde(default)]
    pub status: Option<Value>,
    #[serde(default, alias = "user_id")]
    pub user_id: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListTasksQuery {
    pub limit: Option<String>,
    pub offset: Option<String>,
    pub search: Option<String>,
    pub status: Option<String>,
}

/// Task plus its (redacted) evaluation.
#[derive(Debug, Clone, Serialize)]
pub struct TaskDetail {
    pub task: Task,
    pub evaluation: Option<EvaluationView>,
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn check_bounds(request: &impl Validate) -> Result<(), ServiceError> {
    request
        .validate()
        .map_err(|errors| validation(errors.to_string()))
}

/// Parses a paging parameter; anything unparsable falls back to `default`.
pub fn parse_paging(raw: Option<&str>, default: usize, max: usize) -> usize {
    raw.and_then(|raw| raw.trim().parse::<usize>().ok())
        .unwrap_or(default)
        .min(max)
}

pub struct TaskService {
    store: Arc<dyn RecordStore>,
    limits: TaskLimits,
}

impl TaskService {
    pub fn new(store: Arc<dyn RecordStore>, limits: TaskLimits) -> Self {
        Self { store, limits }
    }

    fn check_code(&self, code: &str) -> Result<(), ServiceError> {
        if code.len() > self.limits.max_code_bytes {
            return Err(validation(format!(
                "Code content must be at most {} bytes",
                self.limits.max_code_bytes
            )));
        }
        Ok(())
    }

    pub async fn create(
        &self,
        user: &User,
        request: CreateTaskRequest,
    ) -> Result<Task, ServiceError> {
        if request.user_id.is_some() {
            return Err(validation("User ID cannot be provided in request body"));
        }
        let request = CreateTaskRequest {
            title: trimmed(request.title),
            description: trimmed(request.description),
            code_content: request
                .code_content
                .filter(|code| !code.trim().is_empty()),
            language: trimmed(request.language),
            user_id: None,
        };
        let title = request
            .title
            .clone()
            .ok_or_else(|| validation("Title is required and must not be empty"))?;
        let code_content = request
            .code_content
            .clone()
            .ok_or_else(|| validation("Code content is required and must not be empty"))?;
        check_bounds(&request)?;
        self.check_code(&code_content)?;

        let task = self
            .store
            .insert_task(NewTask {
                owner_id: user.id.clone(),
                title,
                description: request.description,
                code_content,
                language: request.language,
            })
            .await?;
        tracing::info!(target: "tasks", task_id = task.id, "task_created");
        Ok(task)
    }

    pub async fn get(&self, user: &User, task_id: TaskId) -> Result<TaskDetail, ServiceError> {
        let task = self
            .store
            .get_task(&user.id, task_id)
            .await?
            .ok_or_else(|| not_found("Task not found"))?;
        let evaluation = self
            .store
            .find_evaluation_by_task(&user.id, task_id)
            .await?
            .map(|evaluation| EntitlementResolver::view(user, evaluation));
        Ok(TaskDetail { task, evaluation })
    }

    pub async fn list(
        &self,
        user: &User,
        query: &ListTasksQuery,
    ) -> Result<Vec<Task>, ServiceError> {
        let filter = TaskFilter {
            search: trimmed(query.search.clone()),
            // Unknown status values are ignored rather than rejected.
            status: query.status.as_deref().and_then(TaskStatus::parse),
            limit: parse_paging(query.limit.as_deref(), DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT),
            offset: parse_paging(query.offset.as_deref(), 0, usize::MAX),
        };
        Ok(self.store.list_tasks(&user.id, &filter).await?)
    }

    pub async fn update(
        &self,
        user: &User,
        task_id: TaskId,
        request: UpdateTaskRequest,
    ) -> Result<Task, ServiceError> {
        if request.user_id.is_some() {
            return Err(validation("User ID cannot be provided in request body"));
        }
        if request.status.is_some() {
            return Err(validation(
                "Status cannot be modified directly; it is set by evaluation",
            ));
        }

        let title = match request.title {
            Some(title) => Some(
                trimmed(Some(title))
                    .ok_or_else(|| validation("Title must not be empty if provided"))?,
            ),
            None => None,
        };
        let code_content = match request.code_content {
            Some(code) if code.trim().is_empty() => {
                return Err(validation("Code content must not be empty if provided"));
            }
            other => other,
        };
        check_bounds(&UpdateTaskRequest {
            title: title.clone(),
            ..UpdateTaskRequest::default()
        })?;
        if let Some(code) = &code_content {
            self.check_code(code)?;
        }

        let patch = TaskPatch {
            title,
            description: request.description.map(trimmed),
            code_content,
            language: request.language.map(trimmed),
        };
        if patch.is_empty() {
            return Err(validation("No valid fields to update"));
        }

        self.store
            .get_task(&user.id, task_id)
            .await?
            .ok_or_else(|| not_found("Task not found"))?;
        let task = self.store.update_task(&user.id, task_id, &patch).await?;
        tracing::info!(target: "tasks", task_id = task.id, "task_updated");
        Ok(task)
    }

    pub async fn delete(&self, user: &User, task_id: TaskId) -> Result<Task, ServiceError> {
        let task = self.store.delete_task(&user.id, task_id).await?;
        tracing::info!(target: "tasks", task_id = task.id, "task_deleted");
        Ok(task)
    }
}
