//! Realtime error types
//!
//! These never reach callers of `open`/`send`; they are logged and reflected
//! through the connection state.

use tokio_tungstenite::tungstenite;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RealtimeError {
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("handshake failed: {0}")]
    Handshake(String),

    #[error("gave up after {attempts} reconnect attempts")]
    ReconnectExhausted { attempts: u32 },

    #[error("invalid socket endpoint: {0}")]
    InvalidEndpoint(String),
}

impl From<tungstenite::Error> for RealtimeError {
    fn from(err: tungstenite::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for RealtimeError {
    fn from(err: serde_json::Error) -> Self {
        Self::MalformedFrame(err.to_string())
    }
}

pub type RealtimeResult<T> = Result<T, RealtimeError>;
