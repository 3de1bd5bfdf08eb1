//! Error types for the migrator
//!
//! Three families, matching how failures surface to callers:
//! structural problems found by the validator, store failures surfaced
//! verbatim, and failures while applying or reverting a specific migration.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for migrator operations
pub type MigratorResult<T> = Result<T, MigratorError>;

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by the core engine
#[derive(Debug, Error)]
pub enum MigratorError {
    /// The migration set is structurally invalid. Nothing touched the store.
    #[error("validation error: {reason}")]
    Validation { reason: String },

    /// A store call failed outside of a specific migration.
    #[error("engine error: {0}")]
    Engine(#[from] StoreError),

    /// An "up" statement (or its tracking insert) failed.
    #[error("migration {name} ({version}) failed: {source}")]
    Migration {
        version: String,
        name: String,
        #[source]
        source: StoreError,
    },

    /// A "down" statement (or its tracking delete) failed. Earlier
    /// migrations in the same call stay reverted.
    #[error("rollback of {name} ({version}) failed: {source}")]
    Rollback {
        version: String,
        name: String,
        #[source]
        source: StoreError,
    },

    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// A migration file could not be turned into a descriptor.
    #[error("failed to load {}: {message}", path.display())]
    Loader { path: PathBuf, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl MigratorError {
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
        }
    }

    pub fn loader(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Loader {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Whether the error was raised before any store access.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}

/// Errors raised by a [`Store`](crate::backends::Store) implementation
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("statement failed: {message} (statement: {statement})")]
    Statement { statement: String, message: String },

    #[error("failed to decode rows: {0}")]
    Decode(String),

    #[error("unsupported engine '{0}'")]
    UnsupportedEngine(String),
}

impl StoreError {
    pub fn statement(statement: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Statement {
            statement: statement.into(),
            message: message.into(),
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(e) => StoreError::Connection(e.to_string()),
            sqlx::Error::Io(e) => StoreError::Connection(e.to_string()),
            sqlx::Error::Tls(e) => StoreError::Connection(e.to_string()),
            sqlx::Error::PoolTimedOut => StoreError::Connection("pool timed out".to_string()),
            sqlx::Error::PoolClosed => StoreError::Connection("pool closed".to_string()),
            other => StoreError::Decode(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Decode(err.to_string())
    }
}

/// Configuration error type
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required configuration: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    #[error("Invalid value for field '{field}': '{value}'. Expected: {expected}")]
    InvalidValue {
        field: String,
        value: String,
        expected: String,
    },
}

impl ConfigError {
    pub fn invalid_value(
        field: impl Into<String>,
        value: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.into(),
            expected: expected.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migration_error_names_the_migration() {
        let err = MigratorError::Migration {
            version: "20221231054532".to_string(),
            name: "CreateComments".to_string(),
            source: StoreError::statement("CREATE TABLE comments", "syntax error"),
        };

        let message = err.to_string();
        assert!(message.contains("CreateComments"));
        assert!(message.contains("20221231054532"));
        assert!(!err.is_validation());
    }

    #[test]
    fn test_missing_fields_are_listed() {
        let err = ConfigError::MissingFields(vec![
            "DATABASE_URL".to_string(),
            "MIGRATIONS_TABLE".to_string(),
        ]);

        assert_eq!(
            err.to_string(),
            "missing required configuration: DATABASE_URL, MIGRATIONS_TABLE"
        );
    }

    #[test]
    fn test_validation_constructor() {
        let err = MigratorError::validation("duplicate migration version");
        assert!(err.is_validation());
        assert_eq!(err.to_string(), "validation error: duplicate migration version");
    }
}
