use super::Context;

/// Create the schema table
pub async fn start(context: &Context) -> anyhow::Result<()> {
    let runner = context.runner()?;
    runner.start_tracking().await?;
    println!("Tracking migrations in {}.", runner.schema_table());
    Ok(())
}

/// Drop the schema table
pub async fn stop(context: &Context) -> anyhow::Result<()> {
    let runner = context.runner()?;
    runner.stop_tracking().await?;
    println!("Stopped tracking migrations in {}.", runner.schema_table());
    Ok(())
}
