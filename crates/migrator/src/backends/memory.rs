//! In-memory Store
//!
//! Understands just enough SQL to stand in for a real database while
//! exercising the runner: table creation and removal, the schema-table
//! statements the tracker issues (recognised by their bound version and
//! name), and everything else is recorded and accepted. Statements containing a registered failure fragment fail.

use async_trait::async_trait;
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value as JsonValue};
use std::collections::{BTreeMap, BTreeSet};
use tokio::sync::Mutex;

use super::core::{Row, Store, StoreValue};
use crate::error::{StoreError, StoreResult};

static CREATE_TABLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*CREATE\s+TABLE\s+(IF\s+NOT\s+EXISTS\s+)?([^\s(;]+)")
        .expect("create table pattern is a valid regex")
});

static DROP_TABLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*DROP\s+TABLE\s+(IF\s+EXISTS\s+)?([^\s(;]+)")
        .expect("drop table pattern is a valid regex")
});

static INSERT_INTO: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*INSERT\s+INTO\s+([^\s(;]+)").expect("insert pattern is a valid regex"));

static DELETE_FROM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*DELETE\s+FROM\s+([^\s;]+)").expect("delete pattern is a valid regex"));

static SELECT_FROM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bFROM\s+([^\s;]+)").expect("select pattern is a valid regex"));

#[derive(Debug, Clone)]
struct TrackingRow {
    id: i64,
    version: String,
    name: String,
    created_at: chrono::NaiveDateTime,
}

#[derive(Debug, Default)]
struct MemoryState {
    tables: BTreeSet<String>,
    rows: BTreeMap<String, Vec<TrackingRow>>,
    sequences: BTreeMap<String, i64>,
    executed: Vec<String>,
    fail_on: Vec<String>,
}

/// A Store that keeps everything in process memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    url: String,
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            url: "memory://".to_string(),
            state: Mutex::new(MemoryState::default()),
        }
    }

    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            state: Mutex::new(MemoryState::default()),
        }
    }

    /// Make every statement containing `fragment` fail.
    pub async fn fail_on(&self, fragment: impl Into<String>) {
        self.state.lock().await.fail_on.push(fragment.into());
    }

    pub async fn clear_failures(&self) {
        self.state.lock().await.fail_on.clear();
    }

    /// Every statement that executed successfully, in order
    pub async fn executed(&self) -> Vec<String> {
        self.state.lock().await.executed.clone()
    }

    pub async fn has_table(&self, table: &str) -> bool {
        self.state.lock().await.tables.contains(&table.to_lowercase())
    }

    /// Versions tracked in `table`, oldest first
    pub async fn tracked_versions(&self, table: &str) -> Vec<String> {
        self.state
            .lock()
            .await
            .rows
            .get(&table.to_lowercase())
            .map(|rows| rows.iter().map(|r| r.version.clone()).collect())
            .unwrap_or_default()
    }

    async fn mutate(&self, statement: &str, args: &[StoreValue]) -> StoreResult<u64> {
        let mut state = self.state.lock().await;
        state.check_failure(statement)?;

        let affected = state.apply(statement, args)?;
        state.executed.push(statement.to_string());
        Ok(affected)
    }
}

impl MemoryState {
    fn check_failure(&self, statement: &str) -> StoreResult<()> {
        match self.fail_on.iter().find(|f| statement.contains(f.as_str())) {
            Some(fragment) => Err(StoreError::statement(
                statement,
                format!("injected failure on '{}'", fragment),
            )),
            None => Ok(()),
        }
    }

    fn apply(&mut self, statement: &str, args: &[StoreValue]) -> StoreResult<u64> {
        if let Some(caps) = CREATE_TABLE.captures(statement) {
            let table = caps[2].to_lowercase();
            if self.tables.contains(&table) {
                if caps.get(1).is_some() {
                    return Ok(0);
                }
                return Err(StoreError::statement(
                    statement,
                    format!("relation \"{}\" already exists", table),
                ));
            }
            self.tables.insert(table);
            return Ok(0);
        }

        if let Some(caps) = DROP_TABLE.captures(statement) {
            let table = caps[2].to_lowercase();
            if !self.tables.remove(&table) {
                if caps.get(1).is_some() {
                    return Ok(0);
                }
                return Err(StoreError::statement(
                    statement,
                    format!("table \"{}\" does not exist", table),
                ));
            }
            self.rows.remove(&table);
            self.sequences.remove(&table);
            return Ok(0);
        }

        // Only tracking rows carry bind values; data statements pass through.
        if args.is_empty() {
            return Ok(0);
        }

        if let Some(caps) = INSERT_INTO.captures(statement) {
            let table = caps[1].to_lowercase();
            self.require_table(statement, &table)?;
            let (version, name) = version_and_name(statement, args)?;
            return self.insert_row(statement, &table, version, name);
        }

        if let Some(caps) = DELETE_FROM.captures(statement) {
            let table = caps[1].to_lowercase();
            self.require_table(statement, &table)?;
            let (version, name) = version_and_name(statement, args)?;
            let rows = self.rows.entry(table).or_default();
            let before = rows.len();
            rows.retain(|r| !(r.version == version && r.name == name));
            return Ok((before - rows.len()) as u64);
        }

        Ok(0)
    }

    fn require_table(&self, statement: &str, table: &str) -> StoreResult<()> {
        if self.tables.contains(table) {
            Ok(())
        } else {
            Err(StoreError::statement(
                statement,
                format!("relation \"{}\" does not exist", table),
            ))
        }
    }

    fn insert_row(&mut self, statement: &str, table: &str, version: String, name: String) -> StoreResult<u64> {
        let rows = self.rows.entry(table.to_string()).or_default();
        if rows.iter().any(|r| r.version == version || r.name == name) {
            return Err(StoreError::statement(
                statement,
                "duplicate key value violates unique constraint",
            ));
        }

        let next_id = self.sequences.entry(table.to_string()).or_insert(0);
        *next_id += 1;

        rows.push(TrackingRow {
            id: *next_id,
            version,
            name,
            created_at: Utc::now().naive_utc(),
        });
        Ok(1)
    }

    fn query(&self, query: &str, args: &[StoreValue]) -> StoreResult<Vec<Row>> {
        if query.contains("information_schema.tables") {
            let table = args
                .first()
                .and_then(StoreValue::as_str)
                .map(str::to_lowercase)
                .unwrap_or_default();

            if !self.tables.contains(&table) {
                return Ok(Vec::new());
            }

            return Ok(vec![to_row(json!({
                "table_schema": "public",
                "table_name": table,
                "table_type": "BASE TABLE",
            }))]);
        }

        let table = SELECT_FROM
            .captures(query)
            .map(|caps| caps[1].to_lowercase())
            .ok_or_else(|| StoreError::statement(query, "unsupported query"))?;
        self.require_table(query, &table)?;

        let rows = self.rows.get(&table).cloned().unwrap_or_default();
        let upper = query.to_uppercase();

        if upper.contains("COUNT(") {
            return Ok(vec![to_row(json!({ "count": rows.len() as i64 }))]);
        }

        let selected: Vec<&TrackingRow> = if upper.contains("ORDER BY ID DESC LIMIT 1") {
            rows.iter().rev().take(1).collect()
        } else {
            rows.iter().collect()
        };

        Ok(selected
            .into_iter()
            .map(|r| {
                to_row(json!({
                    "id": r.id,
                    "version": r.version,
                    "name": r.name,
                    "created_at": r.created_at,
                }))
            })
            .collect())
    }
}

fn version_and_name(statement: &str, args: &[StoreValue]) -> StoreResult<(String, String)> {
    match args {
        [StoreValue::String(version), StoreValue::String(name), ..] => Ok((version.clone(), name.clone())),
        _ => Err(StoreError::statement(
            statement,
            "expected version and name arguments",
        )),
    }
}

fn to_row(value: JsonValue) -> Row {
    match value {
        JsonValue::Object(map) => map,
        _ => Row::new(),
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create(&self, statement: &str, args: &[StoreValue]) -> StoreResult<u64> {
        self.mutate(statement, args).await
    }

    async fn read(&self, query: &str, args: &[StoreValue]) -> StoreResult<Vec<Row>> {
        let state = self.state.lock().await;
        state.check_failure(query)?;
        state.query(query, args)
    }

    async fn delete(&self, statement: &str, args: &[StoreValue]) -> StoreResult<u64> {
        self.mutate(statement, args).await
    }

    fn name(&self) -> &str {
        "Memory"
    }

    fn database_url(&self) -> &str {
        &self.url
    }
}
