mod commands;
mod logging;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use dm_migrator::config::{DEFAULT_DIRECTORY, DEFAULT_ENGINE, DEFAULT_SCHEMA_TABLE};
use dm_migrator::MigratorConfig;

use commands::*;
use logging::{LogFormat, LoggingConfig};

#[derive(Parser)]
#[command(name = "dm", version)]
#[command(about = "DM, short for Database Migrator, is a migration management tool")]
struct Cli {
    /// Database connection string
    #[arg(long, short = 'u', global = true, env = "DATABASE_URL", hide_env_values = true)]
    database_url: Option<String>,

    /// Directory containing migration files
    #[arg(long, global = true, env = "MIGRATIONS_DIRECTORY", default_value = DEFAULT_DIRECTORY)]
    directory: PathBuf,

    /// Table wherein migrations are tracked
    #[arg(long, global = true, env = "MIGRATIONS_TABLE", default_value = DEFAULT_SCHEMA_TABLE)]
    table: String,

    /// Database engine
    #[arg(long, global = true, env = "MIGRATIONS_ENGINE", default_value = DEFAULT_ENGINE)]
    engine: String,

    /// Enable debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Tracing filter directives, overriding --verbose (e.g. "dm_migrator=debug,sqlx=warn")
    #[arg(long, global = true)]
    log_filter: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run pending migration(s)
    Migrate {
        /// Stop after this migration (version or name)
        #[arg(long, alias = "version")]
        to: Option<String>,
    },

    /// Roll back applied migration(s), most recent first
    Rollback {
        /// Stop after this migration (version or name)
        #[arg(long, alias = "version")]
        to: Option<String>,
    },

    /// Validate the migration files
    Validate,

    /// Generate a migration file in the migrations directory
    Generate {
        /// Migration name (i.e. CreateUsers or create_users)
        name: String,
    },

    /// Show the state of applied and pending migrations
    Show {
        #[command(subcommand)]
        show_command: ShowCommands,
    },

    /// Show every migration and whether it has been applied
    Status,

    /// Manage the table wherein migrations are tracked
    Track {
        #[command(subcommand)]
        track_command: TrackCommands,
    },
}

#[derive(Subcommand)]
enum ShowCommands {
    /// List all migration files
    All,
    /// List only applied migrations
    Applied,
    /// List only pending migrations
    #[command(alias = "p")]
    Pending,
    /// Show the most recently applied migration
    Version,
}

#[derive(Subcommand)]
enum TrackCommands {
    /// Create the tracking table
    Start,
    /// Drop the tracking table
    Stop,
}

impl Cli {
    fn logging_config(&self) -> LoggingConfig {
        let config = LoggingConfig::new(self.verbose, self.log_format);
        match &self.log_filter {
            Some(filter) => config.with_env_filter(filter.as_str()),
            None => config,
        }
    }

    fn migrator_config(&self) -> MigratorConfig {
        let mut config = MigratorConfig::new()
            .with_directory(self.directory.clone())
            .with_schema_table(self.table.clone())
            .with_engine(self.engine.clone());
        config.database_url = self.database_url.clone().filter(|url| !url.is_empty());
        config
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    logging::init_logging(&cli.logging_config())?;

    let context = Context::new(cli.migrator_config());

    match cli.command {
        Commands::Migrate { to } => migrate::run(&context, to.as_deref()).await?,
        Commands::Rollback { to } => rollback::run(&context, to.as_deref()).await?,
        Commands::Validate => validate::run(&context)?,
        Commands::Generate { name } => generate::run(&context, &name)?,
        Commands::Show { show_command } => match show_command {
            ShowCommands::All => show::all(&context)?,
            ShowCommands::Applied => show::applied(&context).await?,
            ShowCommands::Pending => show::pending(&context).await?,
            ShowCommands::Version => show::version(&context).await?,
        },
        Commands::Status => status::run(&context).await?,
        Commands::Track { track_command } => match track_command {
            TrackCommands::Start => track::start(&context).await?,
            TrackCommands::Stop => track::stop(&context).await?,
        },
    }

    Ok(())
}
