//! Logging setup for the command line
//!
//! Diagnostics go to stderr through tracing; command output stays on stdout.

use std::io;
use tracing_subscriber::{fmt::Layer, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Output format for log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "warn")
    pub level: String,
    pub format: LogFormat,
    /// Overrides `level` (e.g. "dm_migrator=debug,sqlx=warn")
    pub env_filter: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
            env_filter: None,
        }
    }
}

impl LoggingConfig {
    pub fn new(verbose: bool, format: LogFormat) -> Self {
        Self {
            level: if verbose { "debug" } else { "info" }.to_string(),
            format,
            env_filter: None,
        }
    }

    pub fn with_env_filter<S: Into<String>>(mut self, filter: S) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// RUST_LOG wins over everything else.
    fn filter(&self) -> Result<EnvFilter, tracing_subscriber::filter::ParseError> {
        let directives = self.env_filter.as_deref().unwrap_or(&self.level);
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(directives))
    }
}

pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let filter = config.filter()?;

    match config.format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(Layer::new().with_writer(io::stderr).json())
            .try_init()?,
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(Layer::new().with_writer(io::stderr).with_target(false))
            .try_init()?,
    }

    tracing::debug!(
        "Logging initialized (level: {}, format: {:?})",
        config.level,
        config.format
    );
    Ok(())
}
