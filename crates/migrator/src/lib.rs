//! # dm-migrator: ordered schema migrations
//!
//! Loads versioned migration descriptors from disk, validates them as a
//! sequence, and applies or reverts them against a pluggable [`Store`],
//! recording applied versions in a schema table.
//!
//! ```no_run
//! use std::sync::Arc;
//! use dm_migrator::{MemoryStore, MigratorConfig, Runner};
//!
//! # async fn run() -> dm_migrator::MigratorResult<()> {
//! let runner = Runner::new(MigratorConfig::from_env()).with_store(Arc::new(MemoryStore::new()));
//! let pending = runner.migration_plan(None).await?;
//! runner.up(&pending).await?;
//! # Ok(())
//! # }
//! ```

pub mod backends;
pub mod config;
pub mod error;
pub mod migrations;

// Re-export core traits and types
pub use backends::{read_into, MemoryStore, PostgresStore, Row, Store, StoreRegistry, StoreValue};
pub use config::MigratorConfig;
pub use error::*;
pub use migrations::*;
