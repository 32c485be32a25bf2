//! Store factory for runtime backend selection.
//!
//! Picks the [`TaskStore`] implementation from [`StorageConfig`]: the
//! in-memory store needs no setup, the `PostgreSQL` store opens a pool and
//! makes sure the schema exists before the server starts accepting
//! requests.
//!
//! # Example
//!
//! ```ignore
//! let config = AppConfig::from_env()?;
//! let store = StoreFactory::new(config.storage).create().await?;
//! ```

use std::sync::Arc;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use crate::config::{ConfigurationError, StorageConfig, StorageMode};

use super::{InMemoryTaskStore, PostgresTaskStore, RepositoryError, TaskStore};

/// Errors that can occur during store initialization.
#[derive(Debug, Error)]
pub enum FactoryError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Database connection error: {0}")]
    DatabaseConnection(String),

    /// The `tasks` table could not be created.
    #[error("Schema initialization error: {0}")]
    Schema(#[from] RepositoryError),
}

/// Factory creating the configured task store.
#[derive(Debug, Clone)]
pub struct StoreFactory {
    config: StorageConfig,
}

impl StoreFactory {
    #[must_use]
    pub const fn new(config: StorageConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub const fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Creates the store selected by the configuration.
    ///
    /// # Errors
    ///
    /// Returns `FactoryError` if the database URL is missing, the
    /// connection fails, or the schema cannot be created.
    pub async fn create(&self) -> Result<Arc<dyn TaskStore>, FactoryError> {
        match self.config.storage_mode {
            StorageMode::InMemory => Ok(Arc::new(InMemoryTaskStore::new())),
            StorageMode::Postgres => {
                let pool = self.create_postgres_pool().await?;
                let store = PostgresTaskStore::new(pool);
                store.ensure_schema().await?;
                tracing::info!("PostgreSQL schema ready");
                Ok(Arc::new(store))
            }
        }
    }

    async fn create_postgres_pool(&self) -> Result<PgPool, FactoryError> {
        let database_url = self
            .config
            .database_url
            .as_ref()
            .ok_or(ConfigurationError::MissingDatabaseUrl)?;

        PgPoolOptions::new()
            .max_connections(self.config.max_connections)
            .connect(database_url)
            .await
            .map_err(|error| FactoryError::DatabaseConnection(error.to_string()))
    }
}

// =============================================================================
// Tests
// =============================================================================
