//! End-to-end runner behaviour against the in-memory store

use std::fs;
use std::sync::Arc;

use dm_migrator::migrations::tracker;
use dm_migrator::{
    Changes, MemoryStore, Migration, MigrationRollback, MigrationStatus, MigratorConfig,
    MigratorError, Runner, RunnerState, Sequence, StoreError,
};
use tempfile::TempDir;

const TABLE: &str = "schema_migrations";

fn migration(version: &str, name: &str, snake: &str) -> Migration {
    Migration::new(
        version,
        name,
        "postgresql",
        format!("{}_{}.yaml", version, snake),
        Changes::new(
            [format!("CREATE TABLE {} (id SERIAL, name TEXT);", snake)],
            [format!("DROP TABLE {};", snake)],
        ),
    )
}

fn five_migrations() -> Sequence {
    vec![
        migration("20230101000001", "CreateUsers", "create_users"),
        migration("20230101000002", "CreateArticles", "create_articles"),
        migration("20230101000003", "CreateComments", "create_comments"),
        migration("20230101000004", "CreatePodcasts", "create_podcasts"),
        migration("20230101000005", "CreateEpisodes", "create_episodes"),
    ]
    .into()
}

fn runner(store: &Arc<MemoryStore>) -> Runner {
    Runner::new(MigratorConfig::new().with_schema_table(TABLE)).with_store(store.clone())
}

#[tokio::test]
async fn failure_on_third_migration_stops_the_run() {
    let store = Arc::new(MemoryStore::new());
    store.fail_on("CREATE TABLE create_comments").await;

    let err = runner(&store).up(&five_migrations()).await.unwrap_err();

    match &err {
        MigratorError::Migration { version, name, source } => {
            assert_eq!(version, "20230101000003");
            assert_eq!(name, "CreateComments");
            assert!(matches!(source, StoreError::Statement { .. }));
        }
        other => panic!("expected migration error, got {:?}", other),
    }
    assert!(err.to_string().contains("CreateComments (20230101000003)"));

    // 1 and 2 applied and tracked, 4 and 5 never ran
    assert!(store.has_table("create_users").await);
    assert!(store.has_table("create_articles").await);
    assert!(!store.has_table("create_podcasts").await);
    assert!(!store.has_table("create_episodes").await);
    assert_eq!(
        store.tracked_versions(TABLE).await,
        vec!["20230101000001", "20230101000002"]
    );

    // Deregistration of 3 was attempted after its statement failed
    let executed = store.executed().await;
    let last = executed.last().unwrap();
    assert!(last.starts_with(&format!("DELETE FROM {}", TABLE)));
    assert!(!executed.iter().any(|s| s.contains("create_podcasts")));
}

#[tokio::test]
async fn failed_deregistration_keeps_the_original_error() {
    let store = Arc::new(MemoryStore::new());
    store.fail_on("CREATE TABLE create_articles").await;
    store.fail_on(format!("DELETE FROM {}", TABLE)).await;

    let err = runner(&store).up(&five_migrations()).await.unwrap_err();

    match err {
        MigratorError::Migration { version, name, source } => {
            assert_eq!(version, "20230101000002");
            assert_eq!(name, "CreateArticles");
            match source {
                StoreError::Statement { statement, message } => {
                    assert!(statement.starts_with("CREATE TABLE create_articles"));
                    assert!(message.contains("CREATE TABLE create_articles"));
                }
                other => panic!("expected statement error, got {:?}", other),
            }
        }
        other => panic!("expected migration error, got {:?}", other),
    }
    assert_eq!(store.tracked_versions(TABLE).await, vec!["20230101000001"]);
}

#[tokio::test]
async fn seed_data_statements_apply_cleanly() {
    let store = Arc::new(MemoryStore::new());
    let mut sequence = Sequence::new();
    sequence.insert(Migration::new(
        "20230101000001",
        "CreateUsers",
        "postgresql",
        "20230101000001_create_users.yaml",
        Changes::new(
            [
                "CREATE TABLE users (id SERIAL, name TEXT);",
                "INSERT INTO users (name) VALUES ('admin');",
            ],
            ["DELETE FROM users WHERE name = 'admin';", "DROP TABLE users;"],
        ),
    ));

    let runner = runner(&store);
    let result = runner.up(&sequence).await.unwrap();
    assert_eq!(result.state, RunnerState::Applied);
    assert_eq!(store.tracked_versions(TABLE).await, vec!["20230101000001"]);

    let result = runner.down(&sequence).await.unwrap();
    assert_eq!(result.rolled_back_count(), 1);
    assert!(!store.has_table("users").await);
    assert!(store.tracked_versions(TABLE).await.is_empty());
}

#[tokio::test]
async fn up_to_date_sequence_executes_nothing() {
    let store = Arc::new(MemoryStore::new());
    let runner = runner(&store);
    let sequence = five_migrations();

    runner.up(&sequence).await.unwrap();
    let executed_before = store.executed().await.len();

    let result = runner.up(&sequence).await.unwrap();
    assert_eq!(result.state, RunnerState::UpToDate);
    assert_eq!(result.applied_count(), 0);
    assert_eq!(store.executed().await.len(), executed_before);
}

#[tokio::test]
async fn tracking_lifecycle() {
    let store = Arc::new(MemoryStore::new());
    let runner = runner(&store);

    assert!(tracker::is_empty(&*store, TABLE).await.unwrap());
    assert!(!tracker::is_tracked(&*store, TABLE).await.unwrap());

    runner.start_tracking().await.unwrap();
    assert!(tracker::is_tracked(&*store, TABLE).await.unwrap());
    assert!(tracker::is_empty(&*store, TABLE).await.unwrap());
    assert_eq!(runner.version().await.unwrap(), (None, true));

    let (first, _) = five_migrations().find("20230101000001");
    runner.up(&first).await.unwrap();
    assert!(!tracker::is_empty(&*store, TABLE).await.unwrap());

    runner.stop_tracking().await.unwrap();
    assert_eq!(runner.version().await.unwrap(), (None, false));
}

#[tokio::test]
async fn full_cycle_from_disk() {
    let dir = TempDir::new().unwrap();
    let write = |file: &str, name: &str, table: &str| {
        let content = format!(
            "schema: 1\nname: {}\nengine: postgresql\nchanges:\n  up:\n    - CREATE TABLE {} (id SERIAL, name TEXT);\n  down:\n    - DROP TABLE {};\n",
            name, table, table
        );
        fs::write(dir.path().join(file), content).unwrap();
    };
    write("20221231054530_create_users.yaml", "CreateUsers", "users");
    write("20221231054531_create_articles.yaml", "CreateArticles", "articles");
    write("20221231054532_create_comments.yaml", "CreateComments", "comments");

    let store = Arc::new(MemoryStore::new());
    let runner = Runner::new(
        MigratorConfig::new()
            .with_directory(dir.path())
            .with_schema_table(TABLE),
    )
    .with_store(store.clone());

    let (valid, reason) = runner.validate(&runner.load_migrations().unwrap());
    assert!(valid, "{}", reason);

    // Migrate up to CreateArticles by name
    let plan = runner.migration_plan(Some("CreateArticles")).await.unwrap();
    assert_eq!(plan.len(), 2);
    runner.up(&plan).await.unwrap();

    let status = runner.status().await.unwrap();
    let applied: Vec<bool> = status.iter().map(MigrationStatus::is_applied).collect();
    assert_eq!(applied, vec![true, true, false]);

    // Everything else
    let plan = runner.migration_plan(None).await.unwrap();
    assert_eq!(plan.head().unwrap().name, "CreateComments");
    runner.up(&plan).await.unwrap();
    assert!(runner.is_up_to_date(&runner.load_migrations().unwrap()).await.unwrap());

    // Roll back to (and including) CreateArticles by version
    let plan = runner.rollback_plan(Some("20221231054531")).await.unwrap();
    let names: Vec<&str> = plan.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["CreateComments", "CreateArticles"]);

    let result = runner.down(&plan).await.unwrap();
    assert_eq!(result.rolled_back_count(), 2);

    let (latest, tracked) = runner.version().await.unwrap();
    assert!(tracked);
    assert_eq!(latest.unwrap().version, "20221231054530");
    assert!(store.has_table("users").await);
    assert!(!store.has_table("articles").await);
}

#[tokio::test]
async fn invalid_descriptor_on_disk_is_rejected_before_store_access() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("20230226120000_create_orders.yaml"),
        "schema: 1\nname: CreateOrders\nengine: postgresql\nchanges:\n  up: CREATE TABLE orders (id SERIAL, total INT);\n  down: DELETE FROM orders;\n",
    )
    .unwrap();

    let store = Arc::new(MemoryStore::new());
    let runner = Runner::new(
        MigratorConfig::new()
            .with_directory(dir.path())
            .with_schema_table(TABLE),
    )
    .with_store(store.clone());

    let sequence = runner.load_migrations().unwrap();
    let err = runner.up(&sequence).await.unwrap_err();
    assert!(err.is_validation());
    assert!(err
        .to_string()
        .contains("CREATE and DROP instructions must always be paired"));
    assert!(store.executed().await.is_empty());
}
