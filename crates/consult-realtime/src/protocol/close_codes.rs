//! WebSocket close codes
//!
//! Classifies the close code of a finished connection to decide whether to reconnect.

use std::fmt;

/// Caller or server closed on purpose
pub const NORMAL_CLOSURE: u16 = 1000;

/// No close frame status was present
pub const NO_STATUS_RECEIVED: u16 = 1005;

/// Connection dropped without a close frame (also used for failed handshakes)
pub const ABNORMAL_CLOSURE: u16 = 1006;

/// Server refused the access token
pub const AUTH_REJECTED: u16 = 4001;

/// How a connection ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CloseKind {
    /// Intentional close (1000)
    Clean,
    /// Authentication rejected (4001)
    AuthRejected,
    /// Anything else
    Unexpected,
}

impl CloseKind {
    /// Classify a raw close code
    #[must_use]
    pub const fn classify(code: u16) -> Self {
        match code {
            NORMAL_CLOSURE => Self::Clean,
            AUTH_REJECTED => Self::AuthRejected,
            _ => Self::Unexpected,
        }
    }

    /// Check if the client should attempt to reconnect after this close
    #[must_use]
    pub const fn should_reconnect(self) -> bool {
        matches!(self, Self::Unexpected)
    }

    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Clean => "Closed normally",
            Self::AuthRejected => "Authentication rejected",
            Self::Unexpected => "Closed unexpectedly",
        }
    }
}

impl fmt::Display for CloseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}
