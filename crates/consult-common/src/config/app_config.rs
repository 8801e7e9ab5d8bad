//! Client configuration structs
//!
//! Loads configuration from environment variables (and a `.env` file when present).

use reqwest::Url;
use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Main client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    pub app: AppSettings,
    pub api: ApiConfig,
    pub realtime: RealtimeConfig,
    pub storage: StorageConfig,
    pub routes: RouteConfig,
}

/// General application settings
#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default = "default_env")]
    pub env: Environment,
    /// Origin the application itself is served from (the "page" origin)
    #[serde(default)]
    pub origin: Option<String>,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    pub(crate) fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "production" => Some(Self::Production),
            "staging" => Some(Self::Staging),
            "development" => Some(Self::Development),
            _ => None,
        }
    }
}

/// REST API settings
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Base origin of the REST API, e.g. `https://api.example.com`
    pub base_url: String,
    #[serde(default = "default_refresh_path")]
    pub refresh_path: String,
    #[serde(default = "default_login_path")]
    pub login_path: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Upper bound on a single token refresh call
    #[serde(default = "default_refresh_timeout")]
    pub refresh_timeout_secs: u64,
}

impl ApiConfig {
    /// Create an API config with default paths and timeouts
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            refresh_path: default_refresh_path(),
            login_path: default_login_path(),
            request_timeout_secs: default_request_timeout(),
            refresh_timeout_secs: default_refresh_timeout(),
        }
    }

    /// Join a path onto the base URL
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        let base = self.base_url.trim_end_matches('/');
        if path.starts_with('/') {
            format!("{base}{path}")
        } else {
            format!("{base}/{path}")
        }
    }

    #[must_use]
    pub fn refresh_url(&self) -> String {
        self.url(&self.refresh_path)
    }

    #[must_use]
    pub fn login_url(&self) -> String {
        self.url(&self.login_path)
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    #[must_use]
    pub fn refresh_timeout(&self) -> Duration {
        Duration::from_secs(self.refresh_timeout_secs)
    }
}

/// Realtime (WebSocket) settings
#[derive(Debug, Clone, Deserialize)]
pub struct RealtimeConfig {
    /// Explicit socket host override (`host[:port]`)
    #[serde(default)]
    pub ws_host: Option<String>,
    #[serde(default = "default_reconnect_base_delay")]
    pub reconnect_base_delay_ms: u64,
    #[serde(default = "default_reconnect_max_delay")]
    pub reconnect_max_delay_ms: u64,
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            ws_host: None,
            reconnect_base_delay_ms: default_reconnect_base_delay(),
            reconnect_max_delay_ms: default_reconnect_max_delay(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
        }
    }
}

impl RealtimeConfig {
    /// Backoff delay before reconnect number `attempt + 1`
    ///
    /// Doubles from the base delay and is capped at the maximum.
    #[must_use]
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 1_u64.checked_shl(attempt).unwrap_or(u64::MAX);
        let delay = self.reconnect_base_delay_ms.saturating_mul(factor);
        Duration::from_millis(delay.min(self.reconnect_max_delay_ms))
    }
}

/// Persistent storage settings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageConfig {
    /// Where the refresh token is persisted; `None` keeps it in memory only
    #[serde(default)]
    pub refresh_token_path: Option<PathBuf>,
}

/// Navigation targets used by the session layer
#[derive(Debug, Clone, Deserialize)]
pub struct RouteConfig {
    #[serde(default = "default_login_route")]
    pub login: String,
    #[serde(default = "default_service_down_route")]
    pub service_down: String,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            login: default_login_route(),
            service_down: default_service_down_route(),
        }
    }
}

// Default value functions
fn default_app_name() -> String {
    "consult-client".to_string()
}

fn default_env() -> Environment {
    Environment::Development
}

fn default_refresh_path() -> String {
    "/api/token/refresh/".to_string()
}

fn default_login_path() -> String {
    "/api/token/".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_refresh_timeout() -> u64 {
    15
}

fn default_reconnect_base_delay() -> u64 {
    1000
}

fn default_reconnect_max_delay() -> u64 {
    30_000
}

fn default_max_reconnect_attempts() -> u32 {
    5
}

fn default_login_route() -> String {
    "/login".to_string()
}

fn default_service_down_route() -> String {
    "/service-unavailable".to_string()
}

fn parse_var<T: std::str::FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(name) {
        Ok(raw) if raw.trim().is_empty() => Ok(None),
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue(name, raw)),
        Err(_) => Ok(None),
    }
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|s| !s.trim().is_empty())
}

impl ClientConfig {
    /// Build a configuration for the given API base with every other value defaulted
    #[must_use]
    pub fn for_api(base_url: impl Into<String>) -> Self {
        Self {
            app: AppSettings {
                name: default_app_name(),
                env: default_env(),
                origin: None,
            },
            api: ApiConfig::new(base_url),
            realtime: RealtimeConfig::default(),
            storage: StorageConfig::default(),
            routes: RouteConfig::default(),
        }
    }

    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if `API_BASE_URL` is missing or a value cannot be parsed
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let config = Self {
            app: AppSettings {
                name: env::var("APP_NAME").unwrap_or_else(|_| default_app_name()),
                env: env::var("APP_ENV")
                    .ok()
                    .and_then(|s| Environment::parse(&s))
                    .unwrap_or_default(),
                origin: optional_var("APP_ORIGIN"),
            },
            api: ApiConfig {
                base_url: optional_var("API_BASE_URL")
                    .ok_or(ConfigError::MissingVar("API_BASE_URL"))?,
                refresh_path: env::var("API_REFRESH_PATH")
                    .unwrap_or_else(|_| default_refresh_path()),
                login_path: env::var("API_LOGIN_PATH").unwrap_or_else(|_| default_login_path()),
                request_timeout_secs: parse_var("API_REQUEST_TIMEOUT_SECS")?
                    .unwrap_or_else(default_request_timeout),
                refresh_timeout_secs: parse_var("API_REFRESH_TIMEOUT_SECS")?
                    .unwrap_or_else(default_refresh_timeout),
            },
            realtime: RealtimeConfig {
                ws_host: optional_var("WS_HOST"),
                reconnect_base_delay_ms: parse_var("WS_RECONNECT_BASE_DELAY_MS")?
                    .unwrap_or_else(default_reconnect_base_delay),
                reconnect_max_delay_ms: parse_var("WS_RECONNECT_MAX_DELAY_MS")?
                    .unwrap_or_else(default_reconnect_max_delay),
                max_reconnect_attempts: parse_var("WS_MAX_RECONNECT_ATTEMPTS")?
                    .unwrap_or_else(default_max_reconnect_attempts),
            },
            storage: StorageConfig {
                refresh_token_path: optional_var("REFRESH_TOKEN_PATH").map(PathBuf::from),
            },
            routes: RouteConfig {
                login: env::var("ROUTE_LOGIN").unwrap_or_else(|_| default_login_route()),
                service_down: env::var("ROUTE_SERVICE_DOWN")
                    .unwrap_or_else(|_| default_service_down_route()),
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints
    ///
    /// # Errors
    /// Returns an error when a URL does not parse or the backoff window is inverted
    pub fn validate(&self) -> Result<(), ConfigError> {
        Url::parse(&self.api.base_url)
            .map_err(|_| ConfigError::InvalidValue("API_BASE_URL", self.api.base_url.clone()))?;

        if let Some(origin) = &self.app.origin {
            Url::parse(origin)
                .map_err(|_| ConfigError::InvalidValue("APP_ORIGIN", origin.clone()))?;
        }

        if self.realtime.reconnect_base_delay_ms > self.realtime.reconnect_max_delay_ms {
            return Err(ConfigError::InvalidValue(
                "WS_RECONNECT_BASE_DELAY_MS",
                format!(
                    "{} exceeds max delay {}",
                    self.realtime.reconnect_base_delay_ms, self.realtime.reconnect_max_delay_ms
                ),
            ));
        }

        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
