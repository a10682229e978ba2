//! Process-wide log and trace output.
//!
//! Library code logs through the `log` facade and opens `tracing` spans on the
//! job path. Both end up in the same `tracing-subscriber` pipeline.

use thiserror::Error;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

/// Filter used when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "docagent=info";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    #[default]
    Plain,
    Json,
}

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Failed to install tracing subscriber: {0}")]
    Subscriber(#[from] tracing::subscriber::SetGlobalDefaultError),

    #[error("Failed to bridge log records: {0}")]
    LogBridge(#[from] log::SetLoggerError),
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

fn subscriber(format: LogFormat) -> Box<dyn tracing::Subscriber + Send + Sync> {
    let registry = Registry::default().with(env_filter());
    match format {
        LogFormat::Plain => Box::new(registry.with(fmt::layer().with_target(true))),
        LogFormat::Json => Box::new(registry.with(fmt::layer().json().with_current_span(true))),
    }
}

/// Installs the global subscriber. Call once, early in `main`.
pub fn init_logging(format: LogFormat) -> Result<(), LoggingError> {
    tracing::subscriber::set_global_default(subscriber(format))?;
    tracing_log::LogTracer::init()?;
    Ok(())
}
