//! Infrastructure layer: the task store contract and its backends.

pub mod factory;
pub mod in_memory;
pub mod postgres;
pub mod repository;
pub mod scoped;

pub use factory::{FactoryError, StoreFactory};
pub use in_memory::InMemoryTaskStore;
pub use postgres::PostgresTaskStore;
pub use repository::{
    InvalidSort, PaginatedResult, Pagination, RepositoryError, SortDirection, SortField,
    StoreFuture, TaskFilter, TaskSort, TaskStore,
};
pub use scoped::OwnerScope;
