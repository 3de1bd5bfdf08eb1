//! Core Store Traits
//!
//! The runner and tracker only ever talk to a database through [`Store`].
//! Concrete dialect drivers implement it; the core never sees a driver type.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

use crate::error::{StoreError, StoreResult};

/// One result row: column name to value
pub type Row = serde_json::Map<String, JsonValue>;

/// Store value enumeration for parameter binding
#[derive(Debug, Clone, PartialEq)]
pub enum StoreValue {
    Null,
    Bool(bool),
    Int64(i64),
    Float64(f64),
    String(String),
}

impl StoreValue {
    pub fn is_null(&self) -> bool {
        matches!(self, StoreValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            StoreValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            StoreValue::Null => JsonValue::Null,
            StoreValue::Bool(b) => JsonValue::Bool(*b),
            StoreValue::Int64(i) => JsonValue::from(*i),
            StoreValue::Float64(f) => serde_json::Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            StoreValue::String(s) => JsonValue::String(s.clone()),
        }
    }
}

impl From<&str> for StoreValue {
    fn from(value: &str) -> Self {
        StoreValue::String(value.to_string())
    }
}

impl From<String> for StoreValue {
    fn from(value: String) -> Self {
        StoreValue::String(value)
    }
}

impl From<&String> for StoreValue {
    fn from(value: &String) -> Self {
        StoreValue::String(value.clone())
    }
}

impl From<i64> for StoreValue {
    fn from(value: i64) -> Self {
        StoreValue::Int64(value)
    }
}

impl From<bool> for StoreValue {
    fn from(value: bool) -> Self {
        StoreValue::Bool(value)
    }
}

/// Abstract persistence capability
///
/// Every call is a single attempt and an independent unit of work; the
/// core never retries and never wraps calls in a transaction.
#[async_trait]
pub trait Store: Send + Sync {
    /// Execute a mutating statement and return the affected row count
    async fn create(&self, statement: &str, args: &[StoreValue]) -> StoreResult<u64>;

    /// Execute a query and return its rows
    async fn read(&self, query: &str, args: &[StoreValue]) -> StoreResult<Vec<Row>>;

    /// Execute a delete-oriented mutating statement
    async fn delete(&self, statement: &str, args: &[StoreValue]) -> StoreResult<u64>;

    /// Human-readable name of this store (i.e. "PostgreSQL")
    fn name(&self) -> &str;

    fn database_url(&self) -> &str;
}

/// Execute `query` and decode every row into `T`.
pub async fn read_into<T>(store: &dyn Store, query: &str, args: &[StoreValue]) -> StoreResult<Vec<T>>
where
    T: DeserializeOwned,
{
    let rows = store.read(query, args).await?;
    decode_rows(rows)
}

pub fn decode_rows<T>(rows: Vec<Row>) -> StoreResult<Vec<T>>
where
    T: DeserializeOwned,
{
    rows.into_iter()
        .map(|row| {
            serde_json::from_value(JsonValue::Object(row))
                .map_err(|e| StoreError::Decode(e.to_string()))
        })
        .collect()
}
