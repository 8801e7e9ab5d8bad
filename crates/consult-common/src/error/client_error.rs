//! Client error types
//!
//! Unified error handling for everything a caller of the session layer can observe.

use std::fmt;

/// Why a token refresh did not produce a new access token
///
/// Cloned to every caller queued behind the refresh.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RefreshError {
    #[error("no refresh token stored")]
    NoRefreshToken,

    #[error("refresh token rejected (status {status})")]
    Rejected { status: u16 },

    #[error("refresh request failed: {0}")]
    Network(String),

    #[error("refresh response invalid: {0}")]
    InvalidResponse(String),

    #[error("refresh timed out")]
    TimedOut,

    #[error("session ended")]
    SessionEnded,

    #[error("refresh cancelled")]
    Cancelled,
}

/// Client-wide error type
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    // Transport errors
    #[error("Network unavailable: {0}")]
    NetworkUnavailable(String),

    #[error("Server unavailable (status {status})")]
    ServerUnavailable { status: u16 },

    // Authentication errors
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Session refresh failed: {0}")]
    RefreshFailed(RefreshError),

    #[error("Session ended")]
    SessionEnded,

    // Any other non-success response
    #[error("Request failed with status {status}: {message}")]
    Status { status: u16, message: String },

    // Local errors
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// Classify a non-success HTTP status
    #[must_use]
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        match status {
            401 => Self::Unauthorized,
            502..=504 => Self::ServerUnavailable { status },
            _ => Self::Status {
                status,
                message: message.into(),
            },
        }
    }

    /// HTTP status associated with this error, if one was received
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::ServerUnavailable { status } | Self::Status { status, .. } => Some(*status),
            Self::Unauthorized => Some(401),
            Self::RefreshFailed(RefreshError::Rejected { status }) => Some(*status),
            _ => None,
        }
    }

    /// Get error code for logs and UI mapping
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NetworkUnavailable(_) => "NETWORK_UNAVAILABLE",
            Self::ServerUnavailable { .. } => "SERVER_UNAVAILABLE",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::RefreshFailed(_) => "REFRESH_FAILED",
            Self::SessionEnded => "SESSION_ENDED",
            Self::Status { .. } => "REQUEST_FAILED",
            Self::Decode(_) => "DECODE_ERROR",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
        }
    }

    /// Backend or network outage (sends the user to the service-down view)
    #[must_use]
    pub fn is_outage(&self) -> bool {
        matches!(self, Self::NetworkUnavailable(_) | Self::ServerUnavailable { .. })
    }

    /// The session cannot be recovered without a fresh login
    #[must_use]
    pub fn is_session_terminal(&self) -> bool {
        matches!(self, Self::RefreshFailed(_) | Self::SessionEnded)
    }

    /// Create a storage error
    #[must_use]
    pub fn storage(msg: impl fmt::Display) -> Self {
        Self::Storage(msg.to_string())
    }
}

impl From<RefreshError> for ClientError {
    fn from(err: RefreshError) -> Self {
        match err {
            RefreshError::SessionEnded => Self::SessionEnded,
            other => Self::RefreshFailed(other),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return Self::from_status(status.as_u16(), err.to_string());
        }
        if err.is_decode() {
            return Self::Status {
                status: 0,
                message: format!("invalid response body: {err}"),
            };
        }
        Self::NetworkUnavailable(err.to_string())
    }
}

/// Result type alias for client operations
pub type ClientResult<T> = Result<T, ClientError>;
