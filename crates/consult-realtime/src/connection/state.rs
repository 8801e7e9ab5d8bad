//! Connection state
//!
//! Published on a watch channel so a UI can render connection status.

use std::fmt;
use std::time::Duration;

/// Lifecycle of a room connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// Never opened
    #[default]
    Idle,
    /// Handshake in progress
    Connecting,
    /// Handshake succeeded; sends are transmitted
    Open,
    /// Waiting `delay` before reconnect number `attempt`
    Reconnecting { attempt: u32, delay: Duration },
    /// Closed by the caller or by the server with 1000
    ClosedClean,
    /// Server rejected the token (4001)
    ClosedAuthRejected,
    /// Reconnect ceiling reached
    ClosedExhausted,
}

impl ConnectionState {
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Open)
    }

    /// No further reconnects will happen on their own
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::ClosedClean | Self::ClosedAuthRejected | Self::ClosedExhausted
        )
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Reconnecting { .. } => "reconnecting",
            Self::ClosedClean => "closed",
            Self::ClosedAuthRejected => "auth_rejected",
            Self::ClosedExhausted => "exhausted",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reconnecting { attempt, delay } => {
                write!(f, "reconnecting (attempt {attempt}, in {}ms)", delay.as_millis())
            }
            other => f.write_str(other.name()),
        }
    }
}
