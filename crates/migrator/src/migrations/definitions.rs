//! Migration Definitions - Core types and structures for migrations
//!
//! Defines the migration descriptor, the persisted tracking record, and the
//! values returned by the runner.

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::time::Instant;

/// Format version written into every generated descriptor
pub const DESCRIPTOR_SCHEMA_VERSION: u32 = 1;

/// Ordered statement lists for applying and reverting a migration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Changes {
    #[serde(default, deserialize_with = "one_or_many")]
    pub up: Vec<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub down: Vec<String>,
}

impl Changes {
    pub fn new<U, D>(up: U, down: D) -> Self
    where
        U: IntoIterator,
        U::Item: Into<String>,
        D: IntoIterator,
        D::Item: Into<String>,
    {
        Self {
            up: up.into_iter().map(Into::into).collect(),
            down: down.into_iter().map(Into::into).collect(),
        }
    }
}

/// Descriptors have been written with a single string or a list per direction.
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(statement)) if statement.trim().is_empty() => Vec::new(),
        Some(OneOrMany::One(statement)) => vec![statement],
        Some(OneOrMany::Many(statements)) => statements,
    })
}

/// A single versioned, named unit of schema change
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Migration {
    /// Fixed-width numeric token taken from the file name
    #[serde(skip)]
    pub version: String,
    /// File the descriptor was loaded from (or written to)
    #[serde(skip)]
    pub file_name: String,
    /// Format version of the descriptor itself
    #[serde(default)]
    pub schema: u32,
    /// PascalCase identifier
    #[serde(default)]
    pub name: String,
    /// Target dialect
    #[serde(default)]
    pub engine: String,
    #[serde(default)]
    pub changes: Changes,
}

impl Migration {
    pub fn new(
        version: impl Into<String>,
        name: impl Into<String>,
        engine: impl Into<String>,
        file_name: impl Into<String>,
        changes: Changes,
    ) -> Self {
        Self {
            version: version.into(),
            file_name: file_name.into(),
            schema: DESCRIPTOR_SCHEMA_VERSION,
            name: name.into(),
            engine: engine.into(),
            changes,
        }
    }

    /// Whether `identifier` names this migration by version or by name
    pub fn matches(&self, identifier: &str) -> bool {
        self.version == identifier || self.name == identifier
    }

    pub fn description(&self) -> String {
        format!("Version: {} ({})", self.version, self.name)
    }
}

impl fmt::Display for Migration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.version)
    }
}

/// A row of the schema table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingRecord {
    pub id: i64,
    pub version: String,
    pub name: String,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
}

impl TrackingRecord {
    pub fn description(&self) -> String {
        match self.created_at {
            Some(applied_at) => format!(
                "Version: {} ({}). Applied at: {}",
                self.version, self.name, applied_at
            ),
            None => format!("Version: {} ({})", self.version, self.name),
        }
    }
}

/// One entry of the schema catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub table_schema: String,
    pub table_name: String,
    pub table_type: String,
}

/// Migration direction for execution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationDirection {
    /// Apply the migration (run UP statements)
    Up,
    /// Rollback the migration (run DOWN statements)
    Down,
}

impl fmt::Display for MigrationDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrationDirection::Up => write!(f, "up"),
            MigrationDirection::Down => write!(f, "down"),
        }
    }
}

/// Progress of a single Up/Down invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerState {
    Unvalidated,
    Validated,
    /// Nothing to do; the store already matches the sequence
    UpToDate,
    Applying,
    Applied,
    Failed,
}

impl fmt::Display for RunnerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self {
            RunnerState::Unvalidated => "unvalidated",
            RunnerState::Validated => "validated",
            RunnerState::UpToDate => "up-to-date",
            RunnerState::Applying => "applying",
            RunnerState::Applied => "applied",
            RunnerState::Failed => "failed",
        };
        write!(f, "{}", state)
    }
}

/// Result of running migrations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationRunResult {
    /// Terminal state: `UpToDate` when nothing ran, `Applied` otherwise
    pub state: RunnerState,
    /// Versions applied by this call, in order
    pub applied_migrations: Vec<String>,
    /// Total execution time in milliseconds
    pub execution_time_ms: u128,
}

impl MigrationRunResult {
    pub fn new(state: RunnerState, applied_migrations: Vec<String>, started: Instant) -> Self {
        Self {
            state,
            applied_migrations,
            execution_time_ms: started.elapsed().as_millis(),
        }
    }

    pub fn applied_count(&self) -> usize {
        self.applied_migrations.len()
    }
}

/// Result of rolling back migrations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollbackResult {
    pub state: RunnerState,
    /// Versions reverted by this call, in order
    pub rolled_back_migrations: Vec<String>,
    pub execution_time_ms: u128,
}

impl RollbackResult {
    pub fn new(state: RunnerState, rolled_back_migrations: Vec<String>, started: Instant) -> Self {
        Self {
            state,
            rolled_back_migrations,
            execution_time_ms: started.elapsed().as_millis(),
        }
    }

    pub fn rolled_back_count(&self) -> usize {
        self.rolled_back_migrations.len()
    }
}

/// Migration status in the system
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationStatus {
    /// Migration is pending (not yet applied)
    Pending(Migration),
    /// Migration has been applied
    Applied(Migration),
}

impl MigrationStatus {
    pub fn migration(&self) -> &Migration {
        match self {
            MigrationStatus::Pending(m) | MigrationStatus::Applied(m) => m,
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, MigrationStatus::Applied(_))
    }
}
