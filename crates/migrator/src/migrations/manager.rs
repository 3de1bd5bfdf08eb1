//! Migration Manager - File system operations for migrations
//!
//! Discovers migration files, decodes them into a [`Sequence`], and writes
//! newly generated descriptors.

use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};

use super::definitions::{Changes, Migration};
use super::naming::{self, FILE_PATTERN, VERSION_WIDTH};
use super::sequence::Sequence;
use crate::config::MigratorConfig;
use crate::error::{MigratorError, MigratorResult};

/// Loads and creates migration files in a single directory
#[derive(Debug, Clone)]
pub struct MigrationManager {
    directory: PathBuf,
}

impl MigrationManager {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn from_config(config: &MigratorConfig) -> Self {
        Self::new(config.directory.clone())
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Names of the files in the directory that look like migrations,
    /// sorted. A missing directory has no files.
    pub fn matching_files(&self) -> MigratorResult<Vec<String>> {
        if !self.directory.exists() {
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&self.directory)
            .map_err(|e| MigratorError::loader(&self.directory, format!("Failed to read directory: {}", e)))?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }

            if let Some(file_name) = entry.file_name().to_str() {
                if FILE_PATTERN.is_match(file_name) {
                    files.push(file_name.to_string());
                }
            }
        }

        files.sort();
        Ok(files)
    }

    /// Every migration in the directory, in file-name order
    pub fn load_migrations(&self) -> MigratorResult<Sequence> {
        let mut sequence = Sequence::new();

        for file_name in self.matching_files()? {
            sequence.insert(self.parse_file(&file_name)?);
        }

        tracing::debug!(
            "Loaded {} from {}",
            sequence.description(),
            self.directory.display()
        );
        Ok(sequence)
    }

    fn parse_file(&self, file_name: &str) -> MigratorResult<Migration> {
        let path = self.directory.join(file_name);

        let version = FILE_PATTERN
            .captures(file_name)
            .and_then(|caps| caps.name("version"))
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| MigratorError::loader(&path, "file name does not carry a version"))?;

        let content = fs::read_to_string(&path)?;
        let mut migration: Migration = serde_yaml::from_str(&content)
            .map_err(|e| MigratorError::loader(&path, e.to_string()))?;

        migration.version = version;
        migration.file_name = file_name.to_string();
        Ok(migration)
    }

    /// Whether a migration with an equivalent name already exists on disk.
    pub fn name_conflict(&self, name: &str) -> MigratorResult<bool> {
        let wanted = naming::to_pascal_case(&naming::to_snake_case(name));

        Ok(self
            .matching_files()?
            .iter()
            .any(|file| naming::parts_from_file_name(file).1 == wanted))
    }

    /// Write a new, empty descriptor for `name` and return it.
    ///
    /// Callers check [`name_conflict`](Self::name_conflict) first.
    pub fn generate(&self, name: &str, engine: &str) -> MigratorResult<Migration> {
        let name = naming::to_pascal_case(&naming::to_snake_case(name));
        if name.is_empty() {
            return Err(MigratorError::validation("migration name is empty"));
        }

        let version = generate_version();
        let file_name = naming::file_name(&version, &name);
        let migration = Migration::new(
            version,
            name,
            engine.to_lowercase(),
            file_name,
            Changes::default(),
        );

        fs::create_dir_all(&self.directory)?;

        let path = self.directory.join(&migration.file_name);
        fs::write(&path, serde_yaml::to_string(&migration)?)?;

        tracing::info!("Created migration {}", path.display());
        Ok(migration)
    }
}

/// Current UTC time as a 20-digit version token
pub fn generate_version() -> String {
    loop {
        let version = Utc::now().format("%Y%m%d%H%M%S%6f").to_string();
        if version.len() == VERSION_WIDTH {
            return version;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const USERS: &str = r#"
schema: 1
name: CreateUsers
engine: postgresql
changes:
  up:
    - CREATE TABLE users (id SERIAL, name TEXT);
  down:
    - DROP TABLE users;
"#;

    const ARTICLES: &str = r#"
schema: 1
name: CreateArticles
engine: postgresql
changes:
  up: CREATE TABLE articles (id SERIAL, title TEXT);
  down: DROP TABLE articles;
"#;

    fn write(dir: &TempDir, file: &str, content: &str) {
        fs::write(dir.path().join(file), content).unwrap();
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let manager = MigrationManager::new("/definitely/not/here");
        assert!(manager.matching_files().unwrap().is_empty());
        assert!(manager.load_migrations().unwrap().is_empty());
    }

    #[test]
    fn test_load_migrations_in_file_order() {
        let dir = TempDir::new().unwrap();
        write(&dir, "20221231054531_create_articles.yaml", ARTICLES);
        write(&dir, "20221231054530_create_users.yml", USERS);
        write(&dir, "README.md", "not a migration");
        write(&dir, "create_comments.yaml", USERS);

        let manager = MigrationManager::new(dir.path());
        assert_eq!(
            manager.matching_files().unwrap(),
            vec![
                "20221231054530_create_users.yml",
                "20221231054531_create_articles.yaml"
            ]
        );

        let sequence = manager.load_migrations().unwrap();
        assert_eq!(sequence.len(), 2);

        let users = sequence.head().unwrap();
        assert_eq!(users.version, "20221231054530");
        assert_eq!(users.name, "CreateUsers");
        assert_eq!(users.file_name, "20221231054530_create_users.yml");
        assert_eq!(users.changes.down, vec!["DROP TABLE users;"]);

        // Single-string statements become one-element lists
        let articles = sequence.tail().unwrap();
        assert_eq!(articles.changes.up.len(), 1);
        assert_eq!(articles.schema, 1);
    }

    #[test]
    fn test_malformed_descriptor() {
        let dir = TempDir::new().unwrap();
        write(&dir, "20221231054530_create_users.yaml", "changes: [not, a, map");

        let manager = MigrationManager::new(dir.path());
        match manager.load_migrations() {
            Err(MigratorError::Loader { path, .. }) => {
                assert!(path.ends_with("20221231054530_create_users.yaml"))
            }
            other => panic!("expected loader error, got {:?}", other),
        }
    }

    #[test]
    fn test_generate_writes_descriptor() {
        let dir = TempDir::new().unwrap();
        let manager = MigrationManager::new(dir.path().join("migrations"));

        let migration = manager.generate("create_users", "PostgreSQL").unwrap();
        assert_eq!(migration.version.len(), VERSION_WIDTH);
        assert_eq!(migration.name, "CreateUsers");
        assert_eq!(migration.engine, "postgresql");
        assert_eq!(migration.schema, 1);
        assert_eq!(
            migration.file_name,
            format!("{}_create_users.yaml", migration.version)
        );

        let loaded = manager.load_migrations().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.head().unwrap(), &migration);
    }

    #[test]
    fn test_name_conflict() {
        let dir = TempDir::new().unwrap();
        write(&dir, "20221231054530_create_users.yaml", USERS);

        let manager = MigrationManager::new(dir.path());
        assert!(manager.name_conflict("CreateUsers").unwrap());
        assert!(manager.name_conflict("create_users").unwrap());
        assert!(!manager.name_conflict("CreatePodcasts").unwrap());
    }

    #[test]
    fn test_generated_versions_are_fixed_width() {
        let version = generate_version();
        assert_eq!(version.len(), 20);
        assert!(version.chars().all(|c| c.is_ascii_digit()));
    }
}
