use anyhow::bail;
use dm_migrator::naming::Identifier;
use dm_migrator::RunnerState;

use super::{parse_identifier, Context};

/// Apply pending migrations, optionally stopping at `to`.
pub async fn run(context: &Context, to: Option<&str>) -> anyhow::Result<()> {
    let target = to.map(parse_identifier).transpose()?;
    let runner = context.runner()?;

    let plan = runner
        .migration_plan(target.as_ref().map(Identifier::as_str))
        .await?;

    if plan.is_empty() {
        if let Some(target) = target {
            bail!("no pending migration matches '{}'", target.as_str());
        }
        println!("Nothing to migrate.");
        return Ok(());
    }

    let result = runner.up(&plan).await?;

    if result.state == RunnerState::UpToDate {
        println!("Database is up to date.");
        return Ok(());
    }

    for migration in plan.iter().filter(|m| result.applied_migrations.contains(&m.version)) {
        println!("Applied {}", migration.description());
    }
    println!(
        "{} applied in {}ms.",
        plan.description(),
        result.execution_time_ms
    );
    Ok(())
}
