//! Ordered collections of migrations
//!
//! A [`Sequence`] keeps migrations in the order they were inserted; that
//! order is the order they are applied (or reverted) in. Nothing here
//! re-sorts, and nothing here touches a store.

use std::collections::HashMap;
use std::fmt;

use super::definitions::Migration;

/// An ordered collection of migrations with version and name lookup
#[derive(Debug, Clone, Default)]
pub struct Sequence {
    migrations: Vec<Migration>,
    by_version: HashMap<String, usize>,
    by_name: HashMap<String, usize>,
}

impl Sequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.migrations.len()
    }

    /// Alias of [`len`](Self::len)
    pub fn size(&self) -> usize {
        self.len()
    }

    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }

    pub fn head(&self) -> Option<&Migration> {
        self.migrations.first()
    }

    pub fn tail(&self) -> Option<&Migration> {
        self.migrations.last()
    }

    /// Append at the tail.
    pub fn insert(&mut self, migration: Migration) {
        let index = self.migrations.len();
        self.by_version
            .entry(migration.version.clone())
            .or_insert(index);
        self.by_name.entry(migration.name.clone()).or_insert(index);
        self.migrations.push(migration);
    }

    /// Remove the first migration whose version or name equals `identifier`.
    pub fn remove(&mut self, identifier: &str) -> Option<Migration> {
        let index = self.position(identifier)?;
        let removed = self.migrations.remove(index);
        self.reindex();
        Some(removed)
    }

    /// Flip the order in place; head and tail swap.
    pub fn reverse(&mut self) {
        self.migrations.reverse();
        self.reindex();
    }

    /// Walk from the head and return everything up to and including the
    /// first migration matching `identifier`.
    ///
    /// When nothing matches the returned sequence is empty.
    pub fn find(&self, identifier: &str) -> (Sequence, bool) {
        match self.position(identifier) {
            Some(index) => (self.migrations[..=index].iter().cloned().collect(), true),
            None => (Sequence::new(), false),
        }
    }

    pub fn get(&self, identifier: &str) -> Option<&Migration> {
        self.position(identifier).map(|index| &self.migrations[index])
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.position(identifier).is_some()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Migration> {
        self.migrations.iter()
    }

    /// Migrations keyed by version. Later duplicates overwrite earlier ones.
    pub fn to_map(&self) -> HashMap<String, Migration> {
        self.migrations
            .iter()
            .map(|m| (m.version.clone(), m.clone()))
            .collect()
    }

    pub fn to_vec(&self) -> Vec<Migration> {
        self.migrations.clone()
    }

    pub fn as_slice(&self) -> &[Migration] {
        &self.migrations
    }

    pub fn description(&self) -> String {
        match self.migrations.len() {
            0 => "No migrations.".to_string(),
            1 => "1 migration".to_string(),
            n => format!("{} migrations", n),
        }
    }

    /// Position of the earliest migration matching by version or name.
    fn position(&self, identifier: &str) -> Option<usize> {
        match (
            self.by_version.get(identifier),
            self.by_name.get(identifier),
        ) {
            (Some(&v), Some(&n)) => Some(v.min(n)),
            (Some(&v), None) => Some(v),
            (None, Some(&n)) => Some(n),
            (None, None) => None,
        }
    }

    fn reindex(&mut self) {
        self.by_version.clear();
        self.by_name.clear();
        for (index, migration) in self.migrations.iter().enumerate() {
            self.by_version
                .entry(migration.version.clone())
                .or_insert(index);
            self.by_name.entry(migration.name.clone()).or_insert(index);
        }
    }
}

impl PartialEq for Sequence {
    fn eq(&self, other: &Self) -> bool {
        self.migrations == other.migrations
    }
}

impl Eq for Sequence {}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.migrations.iter().map(|m| m.name.as_str()).collect();
        write!(f, "{}", names.join(" -> "))
    }
}

impl FromIterator<Migration> for Sequence {
    fn from_iter<I: IntoIterator<Item = Migration>>(iter: I) -> Self {
        let mut sequence = Sequence::new();
        sequence.extend(iter);
        sequence
    }
}

impl Extend<Migration> for Sequence {
    fn extend<I: IntoIterator<Item = Migration>>(&mut self, iter: I) {
        for migration in iter {
            self.insert(migration);
        }
    }
}

impl From<Vec<Migration>> for Sequence {
    fn from(migrations: Vec<Migration>) -> Self {
        migrations.into_iter().collect()
    }
}

impl IntoIterator for Sequence {
    type Item = Migration;
    type IntoIter = std::vec::IntoIter<Migration>;

    fn into_iter(self) -> Self::IntoIter {
        self.migrations.into_iter()
    }
}

impl<'a> IntoIterator for &'a Sequence {
    type Item = &'a Migration;
    type IntoIter = std::slice::Iter<'a, Migration>;

    fn into_iter(self) -> Self::IntoIter {
        self.migrations.iter()
    }
}
