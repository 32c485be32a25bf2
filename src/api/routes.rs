//! Routing definitions for the task tracker API.

use axum::Router;
use axum::routing::{delete, get, post, put};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{
    AppState, create_task, delete_task, health_check, list_tasks, task_summary, update_task,
};

/// Creates the application router with all routes and middleware.
///
/// ```ignore
/// let state = AppState::from_config(store, &config);
/// let router = create_router(state);
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
/// axum::serve(listener, router).await?;
/// ```
pub fn create_router(state: AppState) -> Router {
    let task_routes = Router::new()
        .route("/create-task", post(create_task))
        .route("/all", get(list_tasks))
        .route("/summary", get(task_summary))
        .route("/update-task/{id}", put(update_task))
        .route("/delete-task/{id}", delete(delete_task));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/tasks", task_routes)
        .layer(TraceLayer::new_for_http())
        .layer(create_cors_layer())
        .with_state(state)
}

fn create_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}
