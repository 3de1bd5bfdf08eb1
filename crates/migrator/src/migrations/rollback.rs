//! Migration Rollback - Reverts applied migrations
//!
//! The caller supplies the sequence already reversed, most recently applied
//! first. A failure part way through is terminal: migrations reverted
//! earlier in the same call stay reverted and nothing is re-applied.

use async_trait::async_trait;
use std::time::Instant;

use super::definitions::{Migration, MigrationDirection, RollbackResult, RunnerState};
use super::runner::{advance, tracking_args, Runner};
use super::sequence::Sequence;
use super::{sql, tracker};
use crate::backends::Store;
use crate::error::{MigratorError, MigratorResult, StoreError};

/// Extension trait for Runner to add rollback functionality
#[async_trait]
pub trait MigrationRollback {
    /// Revert `sequence` in the order given.
    async fn down(&self, sequence: &Sequence) -> MigratorResult<RollbackResult>;
}

#[async_trait]
impl MigrationRollback for Runner {
    async fn down(&self, sequence: &Sequence) -> MigratorResult<RollbackResult> {
        let start_time = Instant::now();
        let store = self.configured_store()?;
        let table = self.schema_table();
        let mut state = RunnerState::Unvalidated;

        self.ensure_valid(sequence)?;
        advance(&mut state, RunnerState::Validated);

        if tracker::is_empty(store, table).await? {
            advance(&mut state, RunnerState::UpToDate);
            return Ok(RollbackResult::new(state, Vec::new(), start_time));
        }

        advance(&mut state, RunnerState::Applying);
        let mut rolled_back = Vec::with_capacity(sequence.len());

        for migration in sequence {
            if let Err(source) = revert(store, table, migration).await {
                advance(&mut state, RunnerState::Failed);
                tracing::warn!(
                    "Rollback stopped at {}; {} reverted before it. Manual reconciliation required.",
                    migration,
                    rolled_back.len()
                );

                return Err(MigratorError::Rollback {
                    version: migration.version.clone(),
                    name: migration.name.clone(),
                    source,
                });
            }

            tracing::info!("Reverted {}", migration);
            rolled_back.push(migration.version.clone());
        }

        advance(&mut state, RunnerState::Applied);
        Ok(RollbackResult::new(state, rolled_back, start_time))
    }
}

/// Run every "down" statement, then drop the tracking row.
async fn revert(store: &dyn Store, table: &str, migration: &Migration) -> Result<(), StoreError> {
    tracing::debug!("Running {} for {}", MigrationDirection::Down, migration);

    for statement in &migration.changes.down {
        store.delete(statement, &[]).await?;
    }

    store
        .delete(&sql::delete_migration_entry(table), &tracking_args(migration))
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::MemoryStore;
    use crate::config::MigratorConfig;
    use crate::migrations::definitions::Changes;
    use std::sync::Arc;

    fn migration(version: &str, name: &str, file: &str, table: &str) -> Migration {
        Migration::new(
            version,
            name,
            "postgresql",
            file,
            Changes::new(
                [format!("CREATE TABLE {} (id SERIAL, body TEXT);", table)],
                [format!("DROP TABLE {};", table)],
            ),
        )
    }

    fn default_list() -> Sequence {
        vec![
            migration("20221231054540", "CreateUsers", "20221231054540_create_users.yaml", "users"),
            migration("20221231054541", "CreatePodcasts", "20221231054541_create_podcasts.yaml", "podcasts"),
            migration("20221231054542", "CreateArticles", "20221231054542_create_articles.yaml", "articles"),
        ]
        .into()
    }

    fn runner(store: Arc<MemoryStore>) -> Runner {
        Runner::new(MigratorConfig::new().with_schema_table("schema_migrations")).with_store(store)
    }

    #[tokio::test]
    async fn test_down_on_untracked_store_is_a_no_op() {
        let store = Arc::new(MemoryStore::new());
        let mut sequence = default_list();
        sequence.reverse();

        let result = runner(store.clone()).down(&sequence).await.unwrap();
        assert_eq!(result.state, RunnerState::UpToDate);
        assert_eq!(result.rolled_back_count(), 0);
        assert!(store.executed().await.is_empty());
    }

    #[tokio::test]
    async fn test_down_reverts_in_given_order() {
        let store = Arc::new(MemoryStore::new());
        let runner = runner(store.clone());
        runner.up(&default_list()).await.unwrap();

        let mut sequence = default_list();
        sequence.reverse();
        let (last_two, found) = sequence.find("CreatePodcasts");
        assert!(found);

        let result = runner.down(&last_two).await.unwrap();
        assert_eq!(result.state, RunnerState::Applied);
        assert_eq!(
            result.rolled_back_migrations,
            vec!["20221231054542", "20221231054541"]
        );
        assert!(store.has_table("users").await);
        assert!(!store.has_table("podcasts").await);
        assert_eq!(
            store.tracked_versions("schema_migrations").await,
            vec!["20221231054540"]
        );
    }

    #[tokio::test]
    async fn test_down_failure_is_terminal() {
        let store = Arc::new(MemoryStore::new());
        let runner = runner(store.clone());
        runner.up(&default_list()).await.unwrap();
        store.fail_on("DROP TABLE podcasts").await;

        let mut sequence = default_list();
        sequence.reverse();

        match runner.down(&sequence).await {
            Err(MigratorError::Rollback { version, name, .. }) => {
                assert_eq!(version, "20221231054541");
                assert_eq!(name, "CreatePodcasts");
            }
            other => panic!("expected rollback error, got {:?}", other),
        }

        // Articles stays reverted, nothing was re-applied
        assert!(!store.has_table("articles").await);
        assert!(store.has_table("podcasts").await);
        assert_eq!(
            store.tracked_versions("schema_migrations").await,
            vec!["20221231054540", "20221231054541"]
        );
    }

    #[tokio::test]
    async fn test_down_rejects_invalid_sequence() {
        let store = Arc::new(MemoryStore::new());
        let mut sequence = default_list();
        sequence.insert(migration(
            "20221231054543",
            "CreateUsers",
            "20221231054543_create_users.yaml",
            "users",
        ));

        let err = runner(store.clone()).down(&sequence).await.unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("duplicate migration name"));
        assert!(store.executed().await.is_empty());
    }
}
