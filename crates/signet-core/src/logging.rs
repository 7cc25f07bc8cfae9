//! Tracing/logging initialisation with a runtime-reloadable level.
//!
//! The relay accepts a `set_log_level` control message at runtime, so the
//! `EnvFilter` is installed behind a `reload` layer and the returned
//! [`LogLevelHandle`] can swap it without restarting the process.

use std::fmt;
use std::str::FromStr;

use tracing_subscriber::{
    EnvFilter, Registry, layer::SubscriberExt, reload, util::SubscriberInitExt,
};

use crate::error::Error;

/// Process-wide verbosity. Default is [`LogLevel::Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    #[default]
    Error,
    Info,
    Debug,
}

impl LogLevel {
    /// Filter directive understood by `EnvFilter`.
    pub const fn directive(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Info => "info",
            Self::Debug => "debug",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.directive())
    }
}

impl FromStr for LogLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            other => Err(Error::Config(format!("unknown log level: {other}"))),
        }
    }
}

/// Handle for changing the process-wide log level at runtime.
#[derive(Clone)]
pub struct LogLevelHandle {
    handle: reload::Handle<EnvFilter, Registry>,
}

impl LogLevelHandle {
    /// Replace the active filter. A failed reload (subscriber torn down)
    /// is ignored; there is nowhere left to log to anyway.
    pub fn set_level(&self, level: LogLevel) {
        let _ = self.handle.reload(EnvFilter::new(level.directive()));
    }
}

/// Initialise the global tracing subscriber.
///
/// * `default_level` -- level used when the `RUST_LOG` env-var is not set.
/// * `log_json` -- when `true`, emit structured JSON log lines instead of the
///   human-readable format.
///
/// Returns a [`LogLevelHandle`] for runtime level changes. Must be called at
/// most once per process.
pub fn init_tracing(default_level: LogLevel, log_json: bool) -> LogLevelHandle {
    let env_filter = std::env::var("RUST_LOG")
        .map_or_else(|_| EnvFilter::new(default_level.directive()), EnvFilter::new);
    let (filter_layer, handle) = reload::Layer::new(env_filter);

    if log_json {
        tracing_subscriber::registry()
            .with(filter_layer)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter_layer)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    LogLevelHandle { handle }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parse_known_levels() {
        assert_eq!("error".parse::<LogLevel>().unwrap(), LogLevel::Error);
        assert_eq!("INFO".parse::<LogLevel>().unwrap(), LogLevel::Info);
        assert_eq!("Debug".parse::<LogLevel>().unwrap(), LogLevel::Debug);
    }

    #[test]
    fn parse_unknown_level_fails() {
        assert!("verbose".parse::<LogLevel>().is_err());
    }

    #[test]
    fn default_level_is_error() {
        assert_eq!(LogLevel::default(), LogLevel::Error);
    }

    #[test]
    fn directive_round_trips_through_display() {
        for level in [LogLevel::Error, LogLevel::Info, LogLevel::Debug] {
            assert_eq!(level.to_string().parse::<LogLevel>().unwrap(), level);
        }
    }
}
