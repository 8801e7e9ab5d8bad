//! # consult-realtime
//!
//! Realtime connection manager for consultation chat rooms.
//!
//! ## Features
//!
//! - **One socket per room**: `<scheme>://<host>/ws/chat/<room>/?token=<access token>`
//! - **Reconnect**: Exponential backoff on unexpected drops, none after 1000 or 4001
//! - **Typed events**: `chat_message`, `typing` and `user_status` dispatched to handlers
//!
//! ## Example
//!
//! ```ignore
//! use consult_realtime::{ChatHandlers, OutboundEvent, RealtimeManager};
//!
//! let realtime = RealtimeManager::new(&config, session.tokens())?;
//! let handlers = ChatHandlers::new()
//!     .on_message(|msg| println!("{:?}", msg.text))
//!     .on_typing(|t| println!("typing: {}", t.is_typing));
//!
//! let socket = realtime.join("42", handlers);
//! socket.send(&OutboundEvent::chat_message("hello"));
//! ```

pub mod connection;
pub mod error;
pub mod protocol;
pub mod transport;

// Re-export connection types
pub use connection::{ChatHandlers, ChatSocket, ConnectionState, RealtimeManager};

// Re-export error types
pub use error::{RealtimeError, RealtimeResult};

// Re-export protocol types
pub use protocol::{
    ChatMessage, CloseKind, InboundEvent, OutboundEvent, SocketEndpoint, TypingEvent,
    UserStatusEvent,
};

// Re-export transport types
pub use transport::{Connector, Frame, FrameSink, FrameStream, TungsteniteConnector};
