//! Chat socket protocol
//!
//! Close codes, event payloads, and URL layout.

mod close_codes;
mod endpoint;
mod events;

pub use close_codes::{
    CloseKind, ABNORMAL_CLOSURE, AUTH_REJECTED, NORMAL_CLOSURE, NO_STATUS_RECEIVED,
};
pub use endpoint::SocketEndpoint;
pub use events::{ChatMessage, InboundEvent, OutboundEvent, TypingEvent, UserStatusEvent};
