use dm_migrator::MigrationStatus;

use super::Context;

/// Applied/pending state of every migration on disk
pub async fn run(context: &Context) -> anyhow::Result<()> {
    let runner = context.runner()?;
    let statuses = runner.status().await?;

    if statuses.is_empty() {
        println!("No migrations found.");
        return Ok(());
    }

    for status in &statuses {
        let marker = match status {
            MigrationStatus::Applied(_) => "applied",
            MigrationStatus::Pending(_) => "pending",
        };
        println!("[{:>7}] {}", marker, status.migration().description());
    }

    let applied = statuses.iter().filter(|s| s.is_applied()).count();
    println!("{} of {} applied.", applied, statuses.len());
    Ok(())
}
