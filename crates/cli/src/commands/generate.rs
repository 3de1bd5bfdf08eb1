use anyhow::bail;
use dm_migrator::naming::Identifier;

use super::{parse_identifier, Context};

/// Write a new migration file named after `name`.
pub fn run(context: &Context, name: &str) -> anyhow::Result<()> {
    let name = match parse_identifier(name)? {
        Identifier::Name(name) => name,
        Identifier::Version(version) => bail!("'{}' is a version, not a migration name", version),
    };

    let runner = context.runner()?;

    if runner.manager().name_conflict(&name)? {
        bail!("a migration with this name already exists");
    }

    let migration = runner.generate(&name)?;
    println!(
        "Created {}",
        runner.manager().directory().join(&migration.file_name).display()
    );
    Ok(())
}
