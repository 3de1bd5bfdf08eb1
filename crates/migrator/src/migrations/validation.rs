//! Structural validation of a migration sequence
//!
//! Runs before any store access. A single forward pass, failing on the
//! first problem found.

use std::collections::{BTreeSet, HashSet};
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use super::definitions::Migration;
use super::naming;
use super::sequence::Sequence;

/// Minimum number of space-separated tokens in an "up" statement
pub const MIN_UP_TOKENS: usize = 5;

/// Minimum number of space-separated tokens in a "down" statement
pub const MIN_DOWN_TOKENS: usize = 3;

static CREATE_TABLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bCREATE\s+TABLE\s+(?:IF\s+NOT\s+EXISTS\s+)?([^\s(;]+)")
        .expect("create table pattern is a valid regex")
});

static DROP_TABLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bDROP\s+TABLE\s+(?:IF\s+EXISTS\s+)?([^\s(;]+)")
        .expect("drop table pattern is a valid regex")
});

/// Why a migration was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidReason {
    DuplicateVersion,
    DuplicateName,
    MissingEngine,
    InvalidMigrateInstruction,
    InvalidRollbackInstruction,
    UnpairedCreateDrop,
    VersionMismatch,
    NameMismatch,
}

impl fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            InvalidReason::DuplicateVersion => "duplicate migration version",
            InvalidReason::DuplicateName => "duplicate migration name",
            InvalidReason::MissingEngine => "missing engine",
            InvalidReason::InvalidMigrateInstruction => "missing (or invalid) migrate instruction",
            InvalidReason::InvalidRollbackInstruction => "missing (or invalid) rollback instruction",
            InvalidReason::UnpairedCreateDrop => "CREATE and DROP instructions must always be paired",
            InvalidReason::VersionMismatch => "version mismatch",
            InvalidReason::NameMismatch => "name mismatch",
        };
        write!(f, "{}", reason)
    }
}

/// A rejected migration and the first rule it broke
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidMigration {
    pub version: String,
    pub name: String,
    pub reason: InvalidReason,
}

impl fmt::Display for InvalidMigration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invalid migration: {} ({}). Reason: {}.",
            self.name, self.version, self.reason
        )
    }
}

/// Validate a sequence.
///
/// Returns `(true, "")` when every migration passes, otherwise `false`
/// and a human-readable reason naming the first offending migration.
pub fn validate(sequence: &Sequence) -> (bool, String) {
    match check(sequence) {
        Ok(()) => (true, String::new()),
        Err(invalid) => {
            tracing::warn!("{}", invalid);
            (false, invalid.to_string())
        }
    }
}

/// Same rules as [`validate`], returning the structured failure.
pub fn check(sequence: &Sequence) -> Result<(), InvalidMigration> {
    let mut visited_versions: HashSet<&str> = HashSet::new();
    let mut visited_names: HashSet<&str> = HashSet::new();

    for migration in sequence {
        let reject = |reason| InvalidMigration {
            version: migration.version.clone(),
            name: migration.name.clone(),
            reason,
        };

        if visited_versions.contains(migration.version.as_str()) {
            return Err(reject(InvalidReason::DuplicateVersion));
        }

        if visited_names.contains(migration.name.as_str()) {
            return Err(reject(InvalidReason::DuplicateName));
        }

        if migration.engine.trim().is_empty() {
            return Err(reject(InvalidReason::MissingEngine));
        }

        if !statements_are_well_formed(&migration.changes.up, MIN_UP_TOKENS) {
            return Err(reject(InvalidReason::InvalidMigrateInstruction));
        }

        if !statements_are_well_formed(&migration.changes.down, MIN_DOWN_TOKENS) {
            return Err(reject(InvalidReason::InvalidRollbackInstruction));
        }

        if !creates_and_drops_are_paired(migration) {
            return Err(reject(InvalidReason::UnpairedCreateDrop));
        }

        let (version, name) = naming::parts_from_file_name(&migration.file_name);

        if migration.version != version {
            return Err(reject(InvalidReason::VersionMismatch));
        }

        if migration.name != name {
            return Err(reject(InvalidReason::NameMismatch));
        }

        visited_versions.insert(migration.version.as_str());
        visited_names.insert(migration.name.as_str());
    }

    Ok(())
}

/// Token-count sanity check, not a parser. Tokens are split on single
/// spaces, so runs of spaces count as extra (empty) tokens.
fn statements_are_well_formed(statements: &[String], min_tokens: usize) -> bool {
    !statements.is_empty()
        && statements
            .iter()
            .all(|statement| statement.split(' ').count() >= min_tokens)
}

fn creates_and_drops_are_paired(migration: &Migration) -> bool {
    let created = table_names(&CREATE_TABLE, &migration.changes.up);
    let dropped = table_names(&DROP_TABLE, &migration.changes.down);
    created == dropped
}

fn table_names(pattern: &Regex, statements: &[String]) -> BTreeSet<String> {
    statements
        .iter()
        .flat_map(|statement| pattern.captures_iter(statement))
        .filter_map(|caps| caps.get(1))
        .map(|m| normalize_table_name(m.as_str()))
        .collect()
}

fn normalize_table_name(raw: &str) -> String {
    raw.trim_end_matches(',')
        .split('.')
        .map(|part| part.trim_matches('"').to_lowercase())
        .collect::<Vec<_>>()
        .join(".")
}
