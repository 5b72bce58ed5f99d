use anyhow::{anyhow, Result};
use clap::ValueEnum;
use std::io;
use tracing::Level;
use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq)]
pub enum LogLevel {
    No,
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    pub fn to_tracing_level(&self) -> Option<Level> {
        match self {
            LogLevel::No => None,
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Warning => Some(Level::WARN),
            LogLevel::Error => Some(Level::ERROR),
        }
    }
}

/// Installs the global subscriber. Returns the file writer guard, which has
/// to stay alive for as long as the process logs to a file.
pub fn init_logger(log_level: LogLevel, log_file: &str) -> Result<Option<WorkerGuard>> {
    let Some(level) = log_level.to_tracing_level() else {
        return Ok(None);
    };

    let env_filter = EnvFilter::from_default_env().add_directive(level.as_str().parse()?);

    if !log_file.is_empty() {
        let file_appender = rolling::daily(".", log_file);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        let subscriber = fmt()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_env_filter(env_filter)
            .with_file(false)
            .with_target(false)
            .finish();

        tracing::subscriber::set_global_default(subscriber)
            .map_err(|e| anyhow!("Couldn't set file subscriber: {}", e))?;

        Ok(Some(guard))
    } else {
        let subscriber = fmt()
            .with_writer(io::stdout)
            .with_env_filter(env_filter)
            .with_file(false)
            .with_target(false)
            .finish();

        tracing::subscriber::set_global_default(subscriber)
            .map_err(|e| anyhow!("Couldn't set stdout subscriber: {}", e))?;

        Ok(None)
    }
}
