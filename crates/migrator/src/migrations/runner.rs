//! Migration Runner - Applies migrations against a store
//!
//! The runner validates a sequence, checks the schema table, and then walks
//! the sequence head to tail executing each migration's "up" statements and
//! recording it. Statements run one at a time with no enclosing transaction.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use super::definitions::{Migration, MigrationDirection, MigrationRunResult, MigrationStatus, RunnerState, TrackingRecord};
use super::manager::MigrationManager;
use super::sequence::Sequence;
use super::{sql, tracker, validation};
use crate::backends::{Store, StoreRegistry, StoreValue};
use crate::config::{is_valid_table_name, MigratorConfig};
use crate::error::{ConfigError, MigratorError, MigratorResult, StoreError};

/// Orchestrates validation, tracking, and statement execution
pub struct Runner {
    config: MigratorConfig,
    manager: MigrationManager,
    store: Option<Arc<dyn Store>>,
}

impl Runner {
    /// A runner without a store. Attach one with [`with_store`](Self::with_store)
    /// before applying anything.
    pub fn new(config: MigratorConfig) -> Self {
        let manager = MigrationManager::from_config(&config);
        Self {
            config,
            manager,
            store: None,
        }
    }

    /// Build the store named by `config.engine` from `registry`.
    pub fn from_registry(config: MigratorConfig, registry: &StoreRegistry) -> MigratorResult<Self> {
        let store = registry.build(&config)?;
        Ok(Self::new(config).with_store(store))
    }

    pub fn with_store(mut self, store: Arc<dyn Store>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn set_store(&mut self, store: Arc<dyn Store>) {
        self.store = Some(store);
    }

    pub fn config(&self) -> &MigratorConfig {
        &self.config
    }

    pub fn manager(&self) -> &MigrationManager {
        &self.manager
    }

    pub fn store(&self) -> Option<&Arc<dyn Store>> {
        self.store.as_ref()
    }

    pub fn schema_table(&self) -> &str {
        &self.config.schema_table
    }

    /// The store, provided the runner is configured well enough to use it.
    pub(crate) fn configured_store(&self) -> MigratorResult<&dyn Store> {
        let table = &self.config.schema_table;
        if table.is_empty() {
            return Err(ConfigError::MissingFields(vec!["MIGRATIONS_TABLE".to_string()]).into());
        }

        if !is_valid_table_name(table) {
            return Err(ConfigError::invalid_value(
                "schema_table",
                table,
                "a bare lower-case SQL identifier (letters, digits, underscores)",
            )
            .into());
        }

        self.store
            .as_deref()
            .ok_or_else(|| ConfigError::MissingFields(vec!["store".to_string()]).into())
    }

    /// Validator passthrough
    pub fn validate(&self, sequence: &Sequence) -> (bool, String) {
        validation::validate(sequence)
    }

    /// Reject an invalid sequence before any store access.
    pub(crate) fn ensure_valid(&self, sequence: &Sequence) -> MigratorResult<()> {
        validation::check(sequence).map_err(|invalid| {
            tracing::warn!("{}", invalid);
            MigratorError::validation(invalid.to_string())
        })
    }

    /// Apply `sequence`, head to tail.
    ///
    /// Stops at the first failing migration. Migrations applied before it
    /// stay applied; nothing after it runs.
    pub async fn up(&self, sequence: &Sequence) -> MigratorResult<MigrationRunResult> {
        let start_time = Instant::now();
        let store = self.configured_store()?;
        let table = self.schema_table();
        let mut state = RunnerState::Unvalidated;

        if sequence.is_empty() {
            advance(&mut state, RunnerState::UpToDate);
            return Ok(MigrationRunResult::new(state, Vec::new(), start_time));
        }

        self.ensure_valid(sequence)?;
        advance(&mut state, RunnerState::Validated);

        if tracker::is_up_to_date(store, table, sequence).await? {
            advance(&mut state, RunnerState::UpToDate);
            return Ok(MigrationRunResult::new(state, Vec::new(), start_time));
        }

        advance(&mut state, RunnerState::Applying);
        let mut applied = Vec::with_capacity(sequence.len());

        for migration in sequence {
            if let Err(source) = apply(store, table, migration).await {
                advance(&mut state, RunnerState::Failed);
                deregister(store, table, migration).await;

                return Err(MigratorError::Migration {
                    version: migration.version.clone(),
                    name: migration.name.clone(),
                    source,
                });
            }

            tracing::info!("Applied {}", migration);
            applied.push(migration.version.clone());
        }

        advance(&mut state, RunnerState::Applied);
        Ok(MigrationRunResult::new(state, applied, start_time))
    }

    /// Migrations in `sequence` without a tracking row, in `sequence` order
    pub async fn pending_migrations(&self, sequence: &Sequence) -> MigratorResult<Sequence> {
        let applied = self.applied_versions().await?;
        Ok(sequence
            .iter()
            .filter(|m| !applied.contains(&m.version))
            .cloned()
            .collect())
    }

    /// Migrations in `sequence` with a tracking row, in `sequence` order
    pub async fn applied_migrations(&self, sequence: &Sequence) -> MigratorResult<Sequence> {
        let applied = self.applied_versions().await?;
        Ok(sequence
            .iter()
            .filter(|m| applied.contains(&m.version))
            .cloned()
            .collect())
    }

    async fn applied_versions(&self) -> MigratorResult<HashSet<String>> {
        let store = self.configured_store()?;
        let records = tracker::applied_records(store, self.schema_table()).await?;
        Ok(records.into_iter().map(|r| r.version).collect())
    }

    /// Everything on disk, in file order
    pub fn load_migrations(&self) -> MigratorResult<Sequence> {
        self.manager.load_migrations()
    }

    /// Pending migrations on disk, truncated at `target` when given.
    pub async fn migration_plan(&self, target: Option<&str>) -> MigratorResult<Sequence> {
        let pending = self.pending_migrations(&self.load_migrations()?).await?;
        Ok(match target {
            Some(id) => pending.find(id).0,
            None => pending,
        })
    }

    /// Applied migrations on disk, most recent first, truncated at
    /// `target` when given.
    pub async fn rollback_plan(&self, target: Option<&str>) -> MigratorResult<Sequence> {
        let mut applied = self.applied_migrations(&self.load_migrations()?).await?;
        applied.reverse();
        Ok(match target {
            Some(id) => applied.find(id).0,
            None => applied,
        })
    }

    /// Pending/applied state of every migration on disk
    pub async fn status(&self) -> MigratorResult<Vec<MigrationStatus>> {
        let migrations = self.load_migrations()?;
        let applied = self.applied_versions().await?;

        Ok(migrations
            .into_iter()
            .map(|m| {
                if applied.contains(&m.version) {
                    MigrationStatus::Applied(m)
                } else {
                    MigrationStatus::Pending(m)
                }
            })
            .collect())
    }

    /// Latest tracking row, and whether the schema table exists
    pub async fn version(&self) -> MigratorResult<(Option<TrackingRecord>, bool)> {
        let store = self.configured_store()?;
        Ok(tracker::version(store, self.schema_table()).await?)
    }

    pub async fn is_up_to_date(&self, sequence: &Sequence) -> MigratorResult<bool> {
        let store = self.configured_store()?;
        Ok(tracker::is_up_to_date(store, self.schema_table(), sequence).await?)
    }

    pub async fn start_tracking(&self) -> MigratorResult<()> {
        let store = self.configured_store()?;
        Ok(tracker::start_tracking(store, self.schema_table()).await?)
    }

    pub async fn stop_tracking(&self) -> MigratorResult<()> {
        let store = self.configured_store()?;
        Ok(tracker::stop_tracking(store, self.schema_table()).await?)
    }

    /// Write a new descriptor for `name` targeting the active store's dialect.
    pub fn generate(&self, name: &str) -> MigratorResult<Migration> {
        let store = self.configured_store()?;
        self.manager.generate(name, store.name())
    }
}

impl fmt::Debug for Runner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runner")
            .field("config", &self.config)
            .field("store", &self.store.as_ref().map(|s| s.name().to_string()))
            .finish()
    }
}

pub(crate) fn advance(state: &mut RunnerState, next: RunnerState) {
    tracing::debug!("Runner state: {} -> {}", state, next);
    *state = next;
}

pub(crate) fn tracking_args(migration: &Migration) -> [StoreValue; 2] {
    [
        StoreValue::from(&migration.version),
        StoreValue::from(&migration.name),
    ]
}

/// Run every "up" statement, then record the migration.
async fn apply(store: &dyn Store, table: &str, migration: &Migration) -> Result<(), StoreError> {
    tracing::debug!("Running {} for {}", MigrationDirection::Up, migration);

    for statement in &migration.changes.up {
        store.create(statement, &[]).await?;
    }

    store
        .create(&sql::create_migration_entry(table), &tracking_args(migration))
        .await?;
    Ok(())
}

/// Best-effort removal of a tracking row for a failed migration.
async fn deregister(store: &dyn Store, table: &str, migration: &Migration) {
    if let Err(e) = store
        .delete(&sql::delete_migration_entry(table), &tracking_args(migration))
        .await
    {
        tracing::warn!("Unable to deregister {}: {}", migration, e);
    }
}
