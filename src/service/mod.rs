//! Application services: input validation and the task use cases.

pub mod error;
pub mod task_service;
pub mod validation;

pub use error::ServiceError;
pub use task_service::{ListTasksQuery, TaskInput, TaskService};
pub use validation::{FieldError, ValidationError, Validator};
