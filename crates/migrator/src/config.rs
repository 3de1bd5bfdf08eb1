//! Migrator configuration
//!
//! Everything the runner needs to know about its environment is carried
//! in one explicit value instead of process-wide state.

use std::env;
use std::path::PathBuf;

use crate::error::ConfigError;

pub const DEFAULT_DIRECTORY: &str = "./migrations";
pub const DEFAULT_SCHEMA_TABLE: &str = "_migrations";
pub const DEFAULT_ENGINE: &str = "postgresql";

/// Configuration for a migrator instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigratorConfig {
    /// Connection string (i.e. postgres://<user>:<password>@<host>:5432/database)
    pub database_url: Option<String>,
    /// Directory containing migration files
    pub directory: PathBuf,
    /// Table wherein applied migrations are tracked
    pub schema_table: String,
    /// Store/dialect name used to pick a backend from the registry
    pub engine: String,
}

impl MigratorConfig {
    pub fn new() -> Self {
        Self {
            database_url: None,
            directory: PathBuf::from(DEFAULT_DIRECTORY),
            schema_table: DEFAULT_SCHEMA_TABLE.to_string(),
            engine: DEFAULT_ENGINE.to_string(),
        }
    }

    /// Load configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let mut config = Self::new();

        config.database_url = env::var("DATABASE_URL").ok().filter(|v| !v.is_empty());

        if let Ok(directory) = env::var("MIGRATIONS_DIRECTORY") {
            config.directory = PathBuf::from(directory);
        }

        if let Ok(table) = env::var("MIGRATIONS_TABLE") {
            config.schema_table = table;
        }

        if let Ok(engine) = env::var("MIGRATIONS_ENGINE") {
            config.engine = engine;
        }

        config
    }

    pub fn with_database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = Some(url.into());
        self
    }

    pub fn with_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = directory.into();
        self
    }

    pub fn with_schema_table(mut self, table: impl Into<String>) -> Self {
        self.schema_table = table.into();
        self
    }

    pub fn with_engine(mut self, engine: impl Into<String>) -> Self {
        self.engine = engine.into();
        self
    }

    /// Report every missing required value at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut missing = Vec::new();

        if self.database_url.as_deref().map_or(true, str::is_empty) {
            missing.push("DATABASE_URL".to_string());
        }

        if self.directory.as_os_str().is_empty() {
            missing.push("MIGRATIONS_DIRECTORY".to_string());
        }

        if self.schema_table.is_empty() {
            missing.push("MIGRATIONS_TABLE".to_string());
        }

        if !missing.is_empty() {
            return Err(ConfigError::MissingFields(missing));
        }

        if !is_valid_table_name(&self.schema_table) {
            return Err(ConfigError::invalid_value(
                "schema_table",
                &self.schema_table,
                "a bare lower-case SQL identifier (letters, digits, underscores)",
            ));
        }

        Ok(())
    }
}

impl Default for MigratorConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// The schema table name is spliced into statements, so it must be a
/// plain identifier. It must also be lower-case: unquoted identifiers are
/// folded by the database, and the catalog lookup binds the name as given.
pub fn is_valid_table_name(table: &str) -> bool {
    let mut chars = table.chars();
    match chars.next() {
        Some(first) if first.is_ascii_lowercase() || first == '_' => {
            chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        }
        _ => false,
    }
}
