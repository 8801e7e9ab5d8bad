//! # consult-common
//!
//! Shared utilities including configuration, error handling, token claims, and telemetry.

pub mod auth;
pub mod config;
pub mod error;
pub mod telemetry;

// Re-export commonly used types at crate root
pub use auth::{peek_claims, refresh_expiry_hint, AccessTokenSource, TokenClaims};
pub use config::{
    ApiConfig, AppSettings, ClientConfig, ConfigError, Environment, RealtimeConfig, RouteConfig,
    StorageConfig,
};
pub use error::{ClientError, ClientResult, RefreshError};
pub use telemetry::{try_init_tracing, try_init_tracing_with_config, TracingConfig, TracingError};
