//! Store Backends
//!
//! The [`Store`] contract plus the concrete stores shipped with the crate,
//! and a registry that picks one by dialect name.

pub mod core;
pub mod memory;
pub mod postgres;

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::MigratorConfig;
use crate::error::{StoreError, StoreResult};

// Re-export core traits and types
pub use self::core::*;
pub use memory::MemoryStore;
pub use postgres::PostgresStore;

/// Constructor for a store from configuration
pub type StoreFactory = fn(&MigratorConfig) -> StoreResult<Arc<dyn Store>>;

/// Dialect name to store constructor
#[derive(Clone)]
pub struct StoreRegistry {
    factories: BTreeMap<String, StoreFactory>,
}

impl StoreRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Register (or replace) a constructor. Names are case-insensitive.
    pub fn register(&mut self, name: &str, factory: StoreFactory) -> &mut Self {
        self.factories.insert(name.to_lowercase(), factory);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(&name.to_lowercase())
    }

    /// Registered dialect names, sorted
    pub fn names(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }

    /// Build the store named by `config.engine`.
    pub fn build(&self, config: &MigratorConfig) -> StoreResult<Arc<dyn Store>> {
        let factory = self
            .factories
            .get(&config.engine.to_lowercase())
            .ok_or_else(|| StoreError::UnsupportedEngine(config.engine.clone()))?;

        tracing::debug!("Building '{}' store", config.engine);
        factory(config)
    }
}

impl Default for StoreRegistry {
    fn default() -> Self {
        let mut registry = Self::new();
        registry
            .register("postgresql", postgres_factory)
            .register("postgres", postgres_factory)
            .register("memory", memory_factory);
        registry
    }
}

impl std::fmt::Debug for StoreRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreRegistry")
            .field("engines", &self.names())
            .finish()
    }
}

fn postgres_factory(config: &MigratorConfig) -> StoreResult<Arc<dyn Store>> {
    let url = config
        .database_url
        .as_deref()
        .ok_or_else(|| StoreError::Connection("DATABASE_URL is not set".to_string()))?;

    Ok(Arc::new(PostgresStore::connect_lazy(url)?))
}

fn memory_factory(config: &MigratorConfig) -> StoreResult<Arc<dyn Store>> {
    let store = match config.database_url.as_deref() {
        Some(url) => MemoryStore::with_url(url),
        None => MemoryStore::new(),
    };
    Ok(Arc::new(store))
}
