//! # consult-session
//!
//! Session manager for the consultation client: token storage, transparent access
//! token refresh, and an authenticated HTTP client.
//!
//! ## Features
//!
//! - **Token Storage**: In-memory access token, persistent refresh token
//! - **Single-flight Refresh**: Concurrent 401s share one refresh call
//! - **Redirects**: Login view on lost sessions, service-down view on outages
//!
//! ## Example
//!
//! ```ignore
//! use consult_common::ClientConfig;
//! use consult_session::{LoginRequest, SessionClient};
//!
//! let config = ClientConfig::from_env()?;
//! let client = SessionClient::new(&config)?;
//!
//! if !client.silent_restore().await {
//!     client.login(&LoginRequest::new("user@example.com", "secret")).await?;
//! }
//!
//! let profile: serde_json::Value = client.get_json("/api/me/").await?;
//! ```

pub mod client;
pub mod dto;
pub mod navigation;
pub mod refresh;
pub mod store;

// Re-export client types
pub use client::{ApiRequest, SessionClient, SessionClientBuilder};

// Re-export wire types
pub use dto::{LoginRequest, TokenResponse};

// Re-export navigation types
pub use navigation::{LogNavigator, Navigator, RecordingNavigator, Route};

// Re-export refresh types
pub use refresh::{RefreshCoordinator, RefreshOutcome};

// Re-export store types
pub use store::{
    FileRefreshTokenStore, MemoryRefreshTokenStore, RefreshTokenStore, StoredRefreshToken,
    TokenStore,
};
