use anyhow::bail;

use super::Context;

/// Check the migration files without touching the database.
pub fn run(context: &Context) -> anyhow::Result<()> {
    let runner = context.offline_runner();
    let migrations = runner.load_migrations()?;

    if migrations.is_empty() {
        println!("No migrations found.");
        return Ok(());
    }

    let (valid, reason) = runner.validate(&migrations);
    if !valid {
        bail!(reason);
    }

    println!("Migrations are valid.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dm_migrator::MigratorConfig;
    use std::fs;
    use tempfile::TempDir;

    fn context(dir: &TempDir) -> Context {
        Context::new(MigratorConfig::new().with_directory(dir.path()))
    }

    #[test]
    fn test_empty_directory_is_fine() {
        let dir = TempDir::new().unwrap();
        assert!(run(&context(&dir)).is_ok());
    }

    #[test]
    fn test_reports_first_invalid_migration() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("20221231054530_create_users.yaml"),
            "schema: 1\nname: CreateUsers\nchanges:\n  up: CREATE TABLE users (id SERIAL, name TEXT);\n  down: DROP TABLE users;\n",
        )
        .unwrap();

        let err = run(&context(&dir)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid migration: CreateUsers (20221231054530). Reason: missing engine."
        );
    }
}
