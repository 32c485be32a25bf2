//! Application configuration.
//!
//! Everything is read from environment variables (optionally seeded from a
//! `.env` file by the binary). Empty or whitespace-only values count as
//! unset.
//!
//! # Environment Variables
//!
//! - `HOST`: bind address (default: `0.0.0.0`)
//! - `PORT`: bind port (default: `3000`)
//! - `WORKER_THREADS`: tokio worker threads (default: logical CPU count)
//! - `STORAGE_MODE`: `in_memory` (default) | `postgres`
//! - `DATABASE_URL`: `PostgreSQL` connection URL (required when `STORAGE_MODE=postgres`)
//! - `DATABASE_MAX_CONNECTIONS`: pool size (default: `10`)
//! - `AUTH_TOKENS`: `token:user` pairs separated by commas
//! - `DEFAULT_PAGE_SIZE`: listing page size when `limit` is absent (default: `10`)
//! - `LOG_FORMAT`: `text` (default) | `json`
//!
//! # Example
//!
//! ```ignore
//! let config = AppConfig::builder()
//!     .port(8080)
//!     .auth_token("secret", "alice")
//!     .build()?;
//! ```

use std::collections::HashMap;
use std::env;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::domain::UserId;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_PAGE_SIZE: u32 = 10;

// =============================================================================
// Error Types
// =============================================================================

/// Errors raised while reading or validating configuration.
///
/// Messages never include credential values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("Invalid storage mode: '{0}'. Expected 'in_memory' or 'postgres'")]
    InvalidStorageMode(String),

    #[error("DATABASE_URL environment variable is required when STORAGE_MODE=postgres")]
    MissingDatabaseUrl,

    #[error("Invalid log format: '{0}'. Expected 'text' or 'json'")]
    InvalidLogFormat(String),

    /// A numeric variable could not be parsed or is out of range.
    #[error("{name} must be a positive integer, got '{value}'")]
    InvalidNumber { name: &'static str, value: String },

    /// An `AUTH_TOKENS` entry is not of the form `token:user`.
    #[error("AUTH_TOKENS entry #{position} must have the form 'token:user'")]
    MalformedAuthToken { position: usize },

    #[error("AUTH_TOKENS entry #{position} repeats an earlier token")]
    DuplicateAuthToken { position: usize },
}

// =============================================================================
// Enumerations
// =============================================================================

/// Backend used for task records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageMode {
    /// Process-local storage, lost on restart.
    #[default]
    InMemory,
    Postgres,
}

impl FromStr for StorageMode {
    type Err = ConfigurationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "in_memory" | "inmemory" | "memory" => Ok(Self::InMemory),
            "postgres" | "postgresql" | "pg" => Ok(Self::Postgres),
            _ => Err(ConfigurationError::InvalidStorageMode(value.to_string())),
        }
    }
}

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigurationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "text" | "pretty" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(ConfigurationError::InvalidLogFormat(value.to_string())),
        }
    }
}

// =============================================================================
// Auth Tokens
// =============================================================================

/// Bearer tokens accepted by the static identity resolver.
///
/// `Debug` only reports how many tokens are configured.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct AuthTokens(HashMap<String, UserId>);

impl AuthTokens {
    /// Parses `token:user[,token:user...]`.
    ///
    /// Blank entries are skipped; whitespace around tokens and users is
    /// trimmed.
    ///
    /// # Errors
    ///
    /// Returns `MalformedAuthToken` for an entry missing either half and
    /// `DuplicateAuthToken` when a token appears twice.
    pub fn parse(value: &str) -> Result<Self, ConfigurationError> {
        let mut tokens = HashMap::new();

        for (index, entry) in value.split(',').enumerate() {
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }
            let position = index + 1;

            let (token, user) = entry
                .split_once(':')
                .map(|(token, user)| (token.trim(), user.trim()))
                .filter(|(token, user)| !token.is_empty() && !user.is_empty())
                .ok_or(ConfigurationError::MalformedAuthToken { position })?;

            if tokens
                .insert(token.to_string(), UserId::new(user))
                .is_some()
            {
                return Err(ConfigurationError::DuplicateAuthToken { position });
            }
        }

        Ok(Self(tokens))
    }

    pub fn insert(&mut self, token: impl Into<String>, user: UserId) {
        self.0.insert(token.into(), user);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn into_inner(self) -> HashMap<String, UserId> {
        self.0
    }
}

impl fmt::Debug for AuthTokens {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("AuthTokens")
            .field("count", &self.0.len())
            .finish()
    }
}

// =============================================================================
// Configuration Types
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// `None` keeps tokio's default (one per logical CPU).
    pub worker_threads: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            worker_threads: None,
        }
    }
}

impl ServerConfig {
    /// `host:port`, ready for `TcpListener::bind`.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct StorageConfig {
    pub storage_mode: StorageMode,
    /// Required when `storage_mode` is `Postgres`.
    pub database_url: Option<String>,
    pub max_connections: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            storage_mode: StorageMode::default(),
            database_url: None,
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }
}

// The connection URL may embed a password.
impl fmt::Debug for StorageConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("StorageConfig")
            .field("storage_mode", &self.storage_mode)
            .field("database_url", &self.database_url.as_ref().map(|_| "<set>"))
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

/// Complete runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub auth_tokens: AuthTokens,
    /// Page size used by listings that omit `limit`.
    pub default_page_size: u32,
    pub log_format: LogFormat,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            auth_tokens: AuthTokens::default(),
            default_page_size: DEFAULT_PAGE_SIZE,
            log_format: LogFormat::default(),
        }
    }
}

fn parse_number<T: FromStr>(name: &'static str, value: &str) -> Result<T, ConfigurationError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigurationError::InvalidNumber {
            name,
            value: value.to_string(),
        })
}

impl AppConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }

    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` for unparseable values or a failed
    /// [`validate`](Self::validate).
    pub fn from_env() -> Result<Self, ConfigurationError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Reads the configuration through `lookup`, which maps a variable name
    /// to its value.
    ///
    /// # Errors
    ///
    /// See [`from_env`](Self::from_env).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigurationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut config = Self::default();

        if let Some(host) = read("HOST") {
            config.server.host = host;
        }
        if let Some(port) = read("PORT") {
            config.server.port = parse_number("PORT", &port)?;
        }
        if let Some(threads) = read("WORKER_THREADS") {
            config.server.worker_threads = Some(parse_number("WORKER_THREADS", &threads)?);
        }
        if let Some(mode) = read("STORAGE_MODE") {
            config.storage.storage_mode = mode.parse()?;
        }
        config.storage.database_url = read("DATABASE_URL");
        if let Some(connections) = read("DATABASE_MAX_CONNECTIONS") {
            config.storage.max_connections =
                parse_number("DATABASE_MAX_CONNECTIONS", &connections)?;
        }
        if let Some(tokens) = read("AUTH_TOKENS") {
            config.auth_tokens = AuthTokens::parse(&tokens)?;
        }
        if let Some(page_size) = read("DEFAULT_PAGE_SIZE") {
            config.default_page_size = parse_number("DEFAULT_PAGE_SIZE", &page_size)?;
        }
        if let Some(format) = read("LOG_FORMAT") {
            config.log_format = format.parse()?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validates cross-field and range constraints.
    ///
    /// # Errors
    ///
    /// Returns `MissingDatabaseUrl` for postgres mode without a URL, and
    /// `InvalidNumber` for zero-valued counts.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.storage.storage_mode == StorageMode::Postgres
            && self.storage.database_url.is_none()
        {
            return Err(ConfigurationError::MissingDatabaseUrl);
        }
        if self.server.worker_threads == Some(0) {
            return Err(ConfigurationError::InvalidNumber {
                name: "WORKER_THREADS",
                value: "0".to_string(),
            });
        }
        if self.storage.max_connections == 0 {
            return Err(ConfigurationError::InvalidNumber {
                name: "DATABASE_MAX_CONNECTIONS",
                value: "0".to_string(),
            });
        }
        if self.default_page_size == 0 {
            return Err(ConfigurationError::InvalidNumber {
                name: "DEFAULT_PAGE_SIZE",
                value: "0".to_string(),
            });
        }
        Ok(())
    }
}

/// Builder for [`AppConfig`].
#[derive(Debug, Clone, Default)]
pub struct AppConfigBuilder {
    config: AppConfig,
}

impl AppConfigBuilder {
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.server.host = host.into();
        self
    }

    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.config.server.port = port;
        self
    }

    #[must_use]
    pub const fn worker_threads(mut self, threads: usize) -> Self {
        self.config.server.worker_threads = Some(threads);
        self
    }

    #[must_use]
    pub const fn storage_mode(mut self, mode: StorageMode) -> Self {
        self.config.storage.storage_mode = mode;
        self
    }

    #[must_use]
    pub fn database_url(mut self, url: impl Into<String>) -> Self {
        self.config.storage.database_url = Some(url.into());
        self
    }

    /// Accepts `token` as a credential for `user`.
    #[must_use]
    pub fn auth_token(mut self, token: impl Into<String>, user: impl Into<String>) -> Self {
        self.config.auth_tokens.insert(token, UserId::new(user));
        self
    }

    #[must_use]
    pub const fn default_page_size(mut self, page_size: u32) -> Self {
        self.config.default_page_size = page_size;
        self
    }

    #[must_use]
    pub const fn log_format(mut self, format: LogFormat) -> Self {
        self.config.log_format = format;
        self
    }

    /// Builds and validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` if the configuration is invalid.
    pub fn build(self) -> Result<AppConfig, ConfigurationError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

// =============================================================================
// Tests
// =============================================================================
