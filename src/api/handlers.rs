//! HTTP handlers for the task endpoints.
//!
//! Handlers only translate: they pull the caller, path, query and body out
//! of the request, hand them to [`TaskService`] and shape the result.

use std::sync::Arc;

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::auth::{IdentityResolver, StaticTokenResolver};
use crate::config::AppConfig;
use crate::domain::TaskId;
use crate::infrastructure::TaskStore;
use crate::service::{ListTasksQuery, TaskInput, TaskService};

use super::auth::AuthenticatedUser;
use super::dto::{
    DeleteTaskResponse, TaskListResponse, TaskResponse, TaskSummaryResponse, UpdateTaskResponse,
};
use super::error::ApiErrorResponse;

// =============================================================================
// Application State
// =============================================================================

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub task_service: TaskService,
    pub identity_resolver: Arc<dyn IdentityResolver>,
}

impl AppState {
    #[must_use]
    pub fn new(task_service: TaskService, identity_resolver: Arc<dyn IdentityResolver>) -> Self {
        Self {
            task_service,
            identity_resolver,
        }
    }

    /// Wires `store` with the page size and static tokens from `config`.
    #[must_use]
    pub fn from_config(store: Arc<dyn TaskStore>, config: &AppConfig) -> Self {
        Self::new(
            TaskService::new(store, config.default_page_size),
            Arc::new(StaticTokenResolver::new(config.auth_tokens.clone())),
        )
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("AppState")
            .field("task_service", &self.task_service)
            .field("identity_resolver", &"Arc<dyn IdentityResolver>")
            .finish()
    }
}

// =============================================================================
// Task Handlers
// =============================================================================

/// `POST /api/tasks/create-task`
///
/// # Errors
///
/// - **400**: invalid body or fields
/// - **401**: missing or rejected credential
pub async fn create_task(
    State(state): State<AppState>,
    AuthenticatedUser(owner_id): AuthenticatedUser,
    body: Result<Json<TaskInput>, JsonRejection>,
) -> Result<(StatusCode, Json<TaskResponse>), ApiErrorResponse> {
    let Json(input) = body?;
    let task = state.task_service.create(&owner_id, input).await?;
    Ok((StatusCode::CREATED, Json(TaskResponse::from(task))))
}

/// `GET /api/tasks/all?status=&priority=&sortBy=&sortOrder=&page=&limit=`
///
/// # Errors
///
/// - **400**: unparseable query value
/// - **401**: missing or rejected credential
pub async fn list_tasks(
    State(state): State<AppState>,
    AuthenticatedUser(owner_id): AuthenticatedUser,
    query: Result<Query<ListTasksQuery>, QueryRejection>,
) -> Result<Json<TaskListResponse>, ApiErrorResponse> {
    let Query(query) = query?;
    let page = state.task_service.list(&owner_id, query).await?;
    Ok(Json(TaskListResponse::from(page)))
}

/// `PUT /api/tasks/update-task/{id}`
///
/// The identifier is checked before the body.
///
/// # Errors
///
/// - **400**: malformed identifier, invalid body or fields
/// - **401**: missing or rejected credential
/// - **404**: task absent or owned by someone else
pub async fn update_task(
    State(state): State<AppState>,
    AuthenticatedUser(owner_id): AuthenticatedUser,
    path: Result<Path<String>, PathRejection>,
    body: Result<Json<TaskInput>, JsonRejection>,
) -> Result<Json<UpdateTaskResponse>, ApiErrorResponse> {
    let Path(id) = path?;
    let task_id = TaskId::parse(&id)?;
    let Json(input) = body?;
    let task = state.task_service.update(&owner_id, task_id, input).await?;
    Ok(Json(UpdateTaskResponse {
        task: TaskResponse::from(task),
    }))
}

/// `DELETE /api/tasks/delete-task/{id}`
///
/// # Errors
///
/// - **400**: malformed identifier
/// - **401**: missing or rejected credential
/// - **404**: task absent or owned by someone else
pub async fn delete_task(
    State(state): State<AppState>,
    AuthenticatedUser(owner_id): AuthenticatedUser,
    path: Result<Path<String>, PathRejection>,
) -> Result<Json<DeleteTaskResponse>, ApiErrorResponse> {
    let Path(id) = path?;
    let task_id = TaskId::parse(&id)?;
    state.task_service.delete(&owner_id, task_id).await?;
    Ok(Json(DeleteTaskResponse::deleted()))
}

/// `GET /api/tasks/summary`
///
/// # Errors
///
/// - **401**: missing or rejected credential
pub async fn task_summary(
    State(state): State<AppState>,
    AuthenticatedUser(owner_id): AuthenticatedUser,
) -> Result<Json<TaskSummaryResponse>, ApiErrorResponse> {
    let summary = state.task_service.summarize(&owner_id, Utc::now()).await?;
    Ok(Json(TaskSummaryResponse::from(summary)))
}

// =============================================================================
// GET /health Handler
// =============================================================================

/// Health check response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Health check endpoint. Requires no credential.
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0"
/// }
/// ```
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
