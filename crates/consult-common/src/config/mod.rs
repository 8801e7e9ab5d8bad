//! Configuration structs

mod app_config;

pub use app_config::{
    ApiConfig, AppSettings, ClientConfig, ConfigError, Environment, RealtimeConfig, RouteConfig,
    StorageConfig,
};
