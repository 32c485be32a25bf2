//! API module for HTTP handlers.
//!
//! This module contains route definitions, the authentication extractor and
//! request/response handling.

pub mod auth;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod routes;

pub use auth::AuthenticatedUser;
pub use dto::{
    DeleteTaskResponse, TaskListResponse, TaskResponse, TaskSummaryResponse, UpdateTaskResponse,
};
pub use error::{ApiError, ApiErrorResponse};
pub use handlers::{
    AppState, HealthResponse, create_task, delete_task, health_check, list_tasks, task_summary,
    update_task,
};
pub use routes::create_router;
