use anyhow::bail;
use dm_migrator::naming::Identifier;
use dm_migrator::{MigrationRollback, RunnerState};

use super::{parse_identifier, Context};

/// Revert applied migrations, most recent first, optionally stopping at `to`.
pub async fn run(context: &Context, to: Option<&str>) -> anyhow::Result<()> {
    let target = to.map(parse_identifier).transpose()?;
    let runner = context.runner()?;

    let plan = runner
        .rollback_plan(target.as_ref().map(Identifier::as_str))
        .await?;

    if plan.is_empty() {
        if let Some(target) = target {
            bail!("no applied migration matches '{}'", target.as_str());
        }
        println!("Nothing to roll back.");
        return Ok(());
    }

    let result = runner.down(&plan).await?;

    if result.state == RunnerState::UpToDate {
        println!("Nothing to roll back.");
        return Ok(());
    }

    for migration in plan
        .iter()
        .filter(|m| result.rolled_back_migrations.contains(&m.version))
    {
        println!("Reverted {}", migration.description());
    }
    println!(
        "{} reverted in {}ms.",
        plan.description(),
        result.execution_time_ms
    );
    Ok(())
}
