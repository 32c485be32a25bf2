//! Task use cases.
//!
//! [`TaskService`] validates raw caller input, turns it into domain values
//! and runs it against the store through an [`OwnerScope`], so every
//! operation only ever sees the caller's own tasks.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::domain::{
    Priority, Task, TaskChanges, TaskId, TaskStatus, TaskSummary, UserId, parse_timestamp,
};
use crate::infrastructure::{
    OwnerScope, PaginatedResult, Pagination, SortDirection, SortField, TaskFilter, TaskSort,
    TaskStore,
};

use super::error::ServiceError;
use super::validation::Validator;

// =============================================================================
// Inputs
// =============================================================================

/// Task fields as sent by a caller.
///
/// Creation requires every field; an update applies whichever are present.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskInput {
    pub title: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub priority: Option<i64>,
    pub status: Option<String>,
}

/// Raw listing query parameters. Empty values count as absent.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTasksQuery {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

fn validate_title(title: String) -> Result<String, &'static str> {
    if title.trim().is_empty() {
        Err("Title must not be empty")
    } else {
        Ok(title)
    }
}

fn parse_positive(value: &str, field: &str) -> Result<u32, String> {
    value
        .trim()
        .parse::<u32>()
        .ok()
        .filter(|value| *value > 0)
        .ok_or_else(|| format!("{field} must be a positive integer"))
}

// =============================================================================
// Task Service
// =============================================================================

#[derive(Clone)]
pub struct TaskService {
    store: Arc<dyn TaskStore>,
    default_page_size: u32,
}

impl std::fmt::Debug for TaskService {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("TaskService")
            .field("store", &"Arc<dyn TaskStore>")
            .field("default_page_size", &self.default_page_size)
            .finish()
    }
}

impl TaskService {
    /// `default_page_size` is used when a listing omits `limit`; zero is
    /// raised to one.
    #[must_use]
    pub fn new(store: Arc<dyn TaskStore>, default_page_size: u32) -> Self {
        Self {
            store,
            default_page_size: default_page_size.max(1),
        }
    }

    fn scope<'a>(&'a self, owner_id: &'a UserId) -> OwnerScope<'a> {
        OwnerScope::new(self.store.as_ref(), owner_id)
    }

    /// Validates `input` and stores a new task owned by `owner_id`.
    ///
    /// # Errors
    ///
    /// `Validation` listing every invalid or missing field; `Store` if the
    /// insert fails.
    pub async fn create(&self, owner_id: &UserId, input: TaskInput) -> Result<Task, ServiceError> {
        let mut validator = Validator::new();
        let title = validator.require("title", "Title", input.title, validate_title);
        let start_time = validator.require("startTime", "Start time", input.start_time, |value| {
            parse_timestamp(&value)
        });
        let end_time = validator.require("endTime", "End time", input.end_time, |value| {
            parse_timestamp(&value)
        });
        let priority = validator.require("priority", "Priority", input.priority, Priority::new);
        let status = validator.require("status", "Status", input.status, |value| {
            value.parse::<TaskStatus>()
        });

        let (Some(title), Some(start_time), Some(end_time), Some(priority), Some(status)) =
            (title, start_time, end_time, priority, status)
        else {
            let error = validator.into_error();
            tracing::debug!(%owner_id, violations = error.errors.len(), "Task creation rejected");
            return Err(error.into());
        };

        let task = Task {
            task_id: TaskId::generate(),
            owner_id: owner_id.clone(),
            title,
            priority,
            status,
            start_time,
            end_time,
        };

        let task = self.scope(owner_id).insert(task).await?;
        tracing::info!(task_id = %task.task_id, %owner_id, "Task created");
        Ok(task)
    }

    /// Returns one page of the caller's tasks plus the size of the whole
    /// filtered set.
    ///
    /// # Errors
    ///
    /// `Validation` for unparseable filter, sort or paging values; `Store`
    /// if the query fails.
    pub async fn list(
        &self,
        owner_id: &UserId,
        query: ListTasksQuery,
    ) -> Result<PaginatedResult<Task>, ServiceError> {
        let mut validator = Validator::new();
        let status = validator.optional("status", present(query.status), |value| {
            value.parse::<TaskStatus>()
        });
        let priority = validator.optional("priority", present(query.priority), |value| {
            value.parse::<Priority>()
        });
        let field = validator.optional("sortBy", present(query.sort_by), |value| {
            value.parse::<SortField>()
        });
        let direction = validator.optional("sortOrder", present(query.sort_order), |value| {
            value.parse::<SortDirection>()
        });
        let page = validator.optional("page", present(query.page), |value| {
            parse_positive(&value, "page")
        });
        let limit = validator.optional("limit", present(query.limit), |value| {
            parse_positive(&value, "limit")
        });
        validator.finish()?;

        let filter = TaskFilter {
            status,
            priority,
            ..TaskFilter::default()
        };
        let sort = TaskSort::new(field.unwrap_or_default(), direction.unwrap_or_default());
        let pagination = Pagination::new(
            page.unwrap_or(1),
            limit.unwrap_or(self.default_page_size),
        )
        .unwrap_or_default();

        let result = self.scope(owner_id).page(filter, sort, pagination).await?;
        tracing::debug!(
            %owner_id,
            total = result.total,
            page = pagination.page,
            returned = result.items.len(),
            "Tasks listed"
        );
        Ok(result)
    }

    /// Applies the fields present in `input` to the caller's task.
    ///
    /// An input without any field leaves the task unchanged and returns it.
    ///
    /// # Errors
    ///
    /// `Validation` for invalid fields (nothing is written), `NotFound`
    /// when the task is absent or not owned, `Store` on store failure.
    pub async fn update(
        &self,
        owner_id: &UserId,
        task_id: TaskId,
        input: TaskInput,
    ) -> Result<Task, ServiceError> {
        let mut validator = Validator::new();
        let changes = TaskChanges {
            title: validator.optional("title", input.title, validate_title),
            start_time: validator.optional("startTime", input.start_time, |value| {
                parse_timestamp(&value)
            }),
            end_time: validator.optional("endTime", input.end_time, |value| {
                parse_timestamp(&value)
            }),
            priority: validator.optional("priority", input.priority, Priority::new),
            status: validator.optional("status", input.status, |value| {
                value.parse::<TaskStatus>()
            }),
        };
        validator.finish()?;

        let task = self
            .scope(owner_id)
            .update(task_id, &changes)
            .await?
            .ok_or(ServiceError::NotFound)?;
        tracing::info!(%task_id, %owner_id, "Task updated");
        Ok(task)
    }

    /// Removes the caller's task and returns it.
    ///
    /// # Errors
    ///
    /// `NotFound` when the task is absent or not owned, `Store` on store
    /// failure.
    pub async fn delete(&self, owner_id: &UserId, task_id: TaskId) -> Result<Task, ServiceError> {
        let task = self
            .scope(owner_id)
            .delete(task_id)
            .await?
            .ok_or(ServiceError::NotFound)?;
        tracing::info!(%task_id, %owner_id, "Task deleted");
        Ok(task)
    }

    /// Aggregates all of the caller's tasks as seen at `now`.
    ///
    /// # Errors
    ///
    /// `Store` if the tasks cannot be read.
    pub async fn summarize(
        &self,
        owner_id: &UserId,
        now: DateTime<Utc>,
    ) -> Result<TaskSummary, ServiceError> {
        let tasks = self.scope(owner_id).all().await?;
        tracing::debug!(%owner_id, tasks = tasks.len(), "Summary computed");
        Ok(TaskSummary::compute(&tasks, now))
    }
}

// =============================================================================
// Tests
// =============================================================================
