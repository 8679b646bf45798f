//! Logging initialisation for Foxweb applications.
//!
//! Thin wrapper over `tracing-subscriber`: pick a level and a format, call
//! `init()` once at startup. `RUST_LOG` takes precedence when set.

use tracing_subscriber::EnvFilter;

// Re-export the macros the rest of the framework logs with
pub use tracing::{debug, error, info, trace, warn};

/// Log level for filtering messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable single-line output
    #[default]
    Compact,
    /// Multi-line output with targets and fields
    Pretty,
    /// Structured JSON, one event per line
    Json,
}

/// Logging configuration builder
#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    level: LogLevel,
    format: LogFormat,
}

impl LogConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Install the global subscriber. Later calls are ignored, so libraries
    /// and tests can both call this safely.
    pub fn init(&self) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.level.as_str()));

        let builder = tracing_subscriber::fmt().with_env_filter(filter);
        let result = match self.format {
            LogFormat::Compact => builder.compact().try_init(),
            LogFormat::Pretty => builder.pretty().try_init(),
            LogFormat::Json => builder.json().try_init(),
        };
        // A second init (e.g. from tests) is not an error worth surfacing.
        let _ = result;
    }
}
