//! Logging setup.
//!
//! The tracing subscriber filters through a reloadable [`EnvFilter`] so the
//! configured level can change while the service runs.

use std::fmt;
use std::sync::{Mutex, PoisonError};

use serde::Deserialize;
use tracing::info;
use tracing_subscriber::{
    layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Registry,
};

use crate::errors::LoggingError;

#[cfg(test)]
#[path = "logging_tests.rs"]
mod tests;

/// Handle used to swap the active filter.
pub type FilterHandle = reload::Handle<EnvFilter, Registry>;

/// Configured log verbosity.
///
/// Parsing is case-insensitive; anything unrecognised means [`LogLevel::Info`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "DEBUG" => LogLevel::Debug,
            "INFO" => LogLevel::Info,
            "WARNING" => LogLevel::Warning,
            "ERROR" => LogLevel::Error,
            "CRITICAL" => LogLevel::Critical,
            _ => LogLevel::Info,
        }
    }

    /// The `EnvFilter` directive for this level. `tracing` has no level above
    /// `error`, so `Critical` shares it.
    pub fn directive(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error | LogLevel::Critical => "error",
        }
    }
}

impl From<String> for LogLevel {
    fn from(value: String) -> Self {
        LogLevel::parse(&value)
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
            LogLevel::Critical => "CRITICAL",
        };
        f.write_str(name)
    }
}

/// Applies configured log levels to the running subscriber.
///
/// Remembers the last applied level so a reload that leaves `debug_level`
/// unchanged does not touch the filter. That keeps a `RUST_LOG` filter given
/// at startup in force until the configured level actually changes.
pub struct LogLevelController {
    handle: FilterHandle,
    previous: Mutex<LogLevel>,
}

impl LogLevelController {
    pub fn new(handle: FilterHandle, initial: LogLevel) -> Self {
        Self {
            handle,
            previous: Mutex::new(initial),
        }
    }

    pub fn current(&self) -> LogLevel {
        *self.previous.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Switches the filter to `level`. Returns `false` when it was already active.
    pub fn apply(&self, level: LogLevel) -> Result<bool, LoggingError> {
        let mut previous = self.previous.lock().unwrap_or_else(PoisonError::into_inner);
        if *previous == level {
            return Ok(false);
        }

        self.handle.reload(EnvFilter::new(level.directive()))?;
        let from = std::mem::replace(&mut *previous, level);
        info!(from = %from, to = %level, "log level changed");

        Ok(true)
    }
}

/// Installs the global subscriber.
///
/// `RUST_LOG` takes precedence over `level` when set.
pub fn init_logging(level: LogLevel) -> Result<LogLevelController, LoggingError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.directive()));
    let (filter_layer, handle) = reload::Layer::new(filter);

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(tracing_subscriber::fmt::layer())
        .try_init()?;

    Ok(LogLevelController::new(handle, level))
}
