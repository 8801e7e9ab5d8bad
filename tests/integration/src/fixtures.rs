//! Test fixtures and data generators
//!
//! Provides reusable credentials, room ids, and handler sets.

use consult_realtime::{ChatHandlers, ChatMessage, TypingEvent};
use consult_session::LoginRequest;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;

/// Credentials accepted by the test backend
pub const TEST_EMAIL: &str = "patient@example.com";
pub const TEST_PASSWORD: &str = "TestPass123!";

/// Counter for unique test data
static COUNTER: AtomicU64 = AtomicU64::new(1);

/// Get a unique suffix for test data
pub fn unique_suffix() -> u64 {
    COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// A room id no other test uses
pub fn unique_room() -> String {
    format!("room{}", unique_suffix())
}

pub fn credentials() -> LoginRequest {
    LoginRequest::new(TEST_EMAIL, TEST_PASSWORD)
}

pub fn bad_credentials() -> LoginRequest {
    LoginRequest::new(TEST_EMAIL, "wrong-password")
}

/// Handlers that forward chat messages and typing events into channels
pub struct CollectingHandlers {
    pub handlers: ChatHandlers,
    pub messages: mpsc::UnboundedReceiver<ChatMessage>,
    pub typing: mpsc::UnboundedReceiver<TypingEvent>,
}

impl CollectingHandlers {
    pub fn new() -> Self {
        let (message_tx, messages) = mpsc::unbounded_channel();
        let (typing_tx, typing) = mpsc::unbounded_channel();

        let handlers = ChatHandlers::new()
            .on_message(move |msg| {
                let _ = message_tx.send(msg);
            })
            .on_typing(move |event| {
                let _ = typing_tx.send(event);
            });

        Self {
            handlers,
            messages,
            typing,
        }
    }
}

impl Default for CollectingHandlers {
    fn default() -> Self {
        Self::new()
    }
}
