use dm_migrator::naming;

use super::Context;

/// Every migration file on disk
pub fn all(context: &Context) -> anyhow::Result<()> {
    let runner = context.offline_runner();

    for file in runner.manager().matching_files()? {
        let (version, name) = naming::parts_from_file_name(&file);
        println!("Version: {} ({})", version, name);
    }
    Ok(())
}

pub async fn applied(context: &Context) -> anyhow::Result<()> {
    let runner = context.runner()?;
    let applied = runner.applied_migrations(&runner.load_migrations()?).await?;

    for migration in &applied {
        println!("{}", migration.description());
    }
    Ok(())
}

pub async fn pending(context: &Context) -> anyhow::Result<()> {
    let runner = context.runner()?;
    let pending = runner.pending_migrations(&runner.load_migrations()?).await?;

    for migration in &pending {
        println!("{}", migration.description());
    }
    Ok(())
}

/// The most recently applied migration
pub async fn version(context: &Context) -> anyhow::Result<()> {
    let runner = context.runner()?;

    match runner.version().await? {
        (Some(record), _) => println!("Current version: {}", record.description()),
        (None, true) => println!("No migrations have been applied."),
        (None, false) => println!("Database is not tracked."),
    }
    Ok(())
}
