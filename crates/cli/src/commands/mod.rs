pub mod generate;
pub mod migrate;
pub mod rollback;
pub mod show;
pub mod status;
pub mod track;
pub mod validate;

use anyhow::bail;
use dm_migrator::naming::Identifier;
use dm_migrator::{MigratorConfig, Runner, StoreRegistry};

/// Everything a command needs to build a runner
pub struct Context {
    pub config: MigratorConfig,
    registry: StoreRegistry,
}

impl Context {
    pub fn new(config: MigratorConfig) -> Self {
        Self {
            config,
            registry: StoreRegistry::default(),
        }
    }

    /// A runner attached to the configured store.
    pub fn runner(&self) -> anyhow::Result<Runner> {
        self.config.validate()?;

        Ok(Runner::from_registry(self.config.clone(), &self.registry)?)
    }

    /// A runner for commands that only read migration files.
    pub fn offline_runner(&self) -> Runner {
        Runner::new(self.config.clone())
    }
}

/// Accept a migration name or version token from the command line.
pub fn parse_identifier(value: &str) -> anyhow::Result<Identifier> {
    match Identifier::parse(value) {
        Some(identifier) => Ok(identifier),
        None => bail!("invalid migration version or name: '{}'", value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dm_migrator::Store;

    #[test]
    fn test_parse_identifier() {
        assert_eq!(
            parse_identifier("create_users").unwrap(),
            Identifier::Name("CreateUsers".to_string())
        );
        assert_eq!(
            parse_identifier("20221231054530").unwrap(),
            Identifier::Version("20221231054530".to_string())
        );
        assert!(parse_identifier("2022-12-31").is_err());
        assert!(parse_identifier("create__users").is_err());
    }

    #[test]
    fn test_runner_requires_database_url() {
        let context = Context::new(MigratorConfig::new());
        let err = context.runner().unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn test_unknown_engine_is_reported() {
        let config = MigratorConfig::new()
            .with_database_url("postgres://localhost/app")
            .with_engine("oracle");
        let err = Context::new(config).runner().unwrap_err();
        assert!(err.to_string().contains("unsupported engine 'oracle'"));
    }

    #[test]
    fn test_memory_engine_builds_runner() {
        let config = MigratorConfig::new()
            .with_database_url("memory://test")
            .with_engine("memory");
        let runner = Context::new(config).runner().unwrap();
        assert_eq!(runner.store().unwrap().name(), "Memory");
    }
}
