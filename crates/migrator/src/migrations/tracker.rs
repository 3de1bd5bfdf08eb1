//! Schema table tracking
//!
//! Free functions over a store and a schema table name. The table's
//! existence means "this database is tracked"; its rows are the applied
//! migrations.

use crate::backends::{read_into, Store, StoreValue};
use crate::error::StoreResult;

use super::definitions::{TableSchema, TrackingRecord};
use super::sequence::Sequence;
use super::sql;

#[derive(serde::Deserialize)]
struct Count {
    count: i64,
}

/// Whether `table` exists in the store's catalog
pub async fn is_tracked(store: &dyn Store, table: &str) -> StoreResult<bool> {
    let tables: Vec<TableSchema> =
        read_into(store, sql::schema_table_exists(), &[StoreValue::from(table)]).await?;
    Ok(!tables.is_empty())
}

/// True when the table is missing or has no rows.
pub async fn is_empty(store: &dyn Store, table: &str) -> StoreResult<bool> {
    if !is_tracked(store, table).await? {
        return Ok(true);
    }

    let counts: Vec<Count> = read_into(store, &sql::number_of_applied_migrations(table), &[]).await?;
    Ok(counts.first().map_or(true, |c| c.count == 0))
}

/// The most recently inserted tracking row, and whether the table exists.
pub async fn version(store: &dyn Store, table: &str) -> StoreResult<(Option<TrackingRecord>, bool)> {
    if !is_tracked(store, table).await? {
        return Ok((None, false));
    }

    let mut records: Vec<TrackingRecord> =
        read_into(store, &sql::select_latest_migration(table), &[]).await?;
    Ok((records.pop(), true))
}

/// Every tracking row, oldest first. Empty when untracked.
pub async fn applied_records(store: &dyn Store, table: &str) -> StoreResult<Vec<TrackingRecord>> {
    if !is_tracked(store, table).await? {
        return Ok(Vec::new());
    }

    read_into(store, &sql::select_migrations(table), &[]).await
}

/// Compare the sequence tail against the latest tracked version.
///
/// Starts tracking as a side effect when the table is missing.
pub async fn is_up_to_date(store: &dyn Store, table: &str, sequence: &Sequence) -> StoreResult<bool> {
    if !is_tracked(store, table).await? {
        start_tracking(store, table).await?;
    }

    let Some(tail) = sequence.tail() else {
        return Ok(true);
    };

    let (latest, _) = version(store, table).await?;
    Ok(latest.map_or(false, |record| record.version == tail.version))
}

/// Create the schema table. Does nothing when it already exists.
pub async fn start_tracking(store: &dyn Store, table: &str) -> StoreResult<()> {
    if is_tracked(store, table).await? {
        return Ok(());
    }

    tracing::debug!("Creating schema table {}", table);
    store.create(&sql::create_migration_table(table), &[]).await?;
    Ok(())
}

/// Drop the schema table. Does nothing when it is already gone.
pub async fn stop_tracking(store: &dyn Store, table: &str) -> StoreResult<()> {
    if !is_tracked(store, table).await? {
        return Ok(());
    }

    tracing::debug!("Dropping schema table {}", table);
    store.delete(&sql::drop_migration_table(table), &[]).await?;
    Ok(())
}
