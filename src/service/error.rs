//! Task service errors.

use thiserror::Error;

use crate::infrastructure::RepositoryError;

use super::validation::ValidationError;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The task does not exist or belongs to someone else.
    #[error("Task not found")]
    NotFound,

    #[error("Store failure: {0}")]
    Store(#[from] RepositoryError),
}
