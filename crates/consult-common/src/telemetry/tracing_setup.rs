//! Tracing and logging setup
//!
//! Logs go to stderr so a host program keeps stdout to itself. `RUST_LOG` always wins
//! over the preset directives.

use crate::config::Environment;
use std::env;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

/// Directives used when nothing more specific is configured
///
/// The HTTP and WebSocket stacks are chatty at debug level; keep them at warn.
pub const DEFAULT_DIRECTIVES: &str = "info,hyper=warn,reqwest=warn,tungstenite=warn,tokio_tungstenite=warn";

const DEVELOPMENT_DIRECTIVES: &str =
    "debug,consult_session=trace,consult_realtime=trace,hyper=info,tungstenite=info,tokio_tungstenite=info";

/// Tracing configuration options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracingConfig {
    /// `EnvFilter` directives used when `RUST_LOG` is not set
    pub directives: String,
    /// Enable JSON output format
    pub json: bool,
    /// Log span open/close (shows refresh and request timings)
    pub span_events: bool,
    /// Include file and line numbers
    pub file_line: bool,
    /// Colored output
    pub ansi: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            directives: DEFAULT_DIRECTIVES.to_string(),
            json: false,
            span_events: false,
            file_line: false,
            ansi: true,
        }
    }
}

impl TracingConfig {
    /// Verbose client internals, quiet transports
    #[must_use]
    pub fn development() -> Self {
        Self {
            directives: DEVELOPMENT_DIRECTIVES.to_string(),
            span_events: true,
            file_line: true,
            ..Self::default()
        }
    }

    /// JSON lines without color
    #[must_use]
    pub fn production() -> Self {
        Self {
            json: true,
            ansi: false,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn for_environment(env: Environment) -> Self {
        match env {
            Environment::Development => Self::development(),
            Environment::Staging => Self::default(),
            Environment::Production => Self::production(),
        }
    }

    /// Preset chosen by `APP_ENV`, read before any configuration is loaded
    #[must_use]
    pub fn from_env() -> Self {
        let env = env::var("APP_ENV")
            .ok()
            .and_then(|value| Environment::parse(&value))
            .unwrap_or(Environment::Staging);
        Self::for_environment(env)
    }

    /// Replace the fallback directives
    #[must_use]
    pub fn with_directives(mut self, directives: impl Into<String>) -> Self {
        self.directives = directives.into();
        self
    }

    fn span_events(&self) -> FmtSpan {
        if self.span_events {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        }
    }

    fn fmt_layer(&self) -> Box<dyn Layer<Registry> + Send + Sync> {
        let layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(self.ansi)
            .with_file(self.file_line)
            .with_line_number(self.file_line)
            .with_span_events(self.span_events());

        if self.json {
            layer.json().boxed()
        } else {
            layer.boxed()
        }
    }

    fn env_filter(&self) -> Result<EnvFilter, TracingError> {
        if let Ok(filter) = EnvFilter::try_from_default_env() {
            return Ok(filter);
        }
        EnvFilter::try_new(&self.directives)
            .map_err(|e| TracingError::InvalidDirectives(e.to_string()))
    }
}

/// Install the subscriber for the preset picked by `APP_ENV`
///
/// Safe to call more than once; later calls report `AlreadyInitialized`.
pub fn try_init_tracing() -> Result<(), TracingError> {
    try_init_tracing_with_config(&TracingConfig::from_env())
}

/// Install the subscriber with an explicit configuration
pub fn try_init_tracing_with_config(config: &TracingConfig) -> Result<(), TracingError> {
    tracing_subscriber::registry()
        .with(config.fmt_layer())
        .with(config.env_filter()?)
        .try_init()
        .map_err(|_| TracingError::AlreadyInitialized)
}

/// Tracing initialization errors
#[derive(Debug, thiserror::Error)]
pub enum TracingError {
    #[error("Tracing subscriber already initialized")]
    AlreadyInitialized,

    #[error("Invalid log directives: {0}")]
    InvalidDirectives(String),
}
