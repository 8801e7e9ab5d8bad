//! Inbound event callbacks

use crate::protocol::{ChatMessage, InboundEvent, TypingEvent, UserStatusEvent};
use std::sync::Arc;

pub type Handler<T> = Arc<dyn Fn(T) + Send + Sync>;

/// Callbacks for one room
///
/// Replaced wholesale on every `open`; the socket reads the current set for each frame.
#[derive(Clone, Default)]
pub struct ChatHandlers {
    on_message: Option<Handler<ChatMessage>>,
    on_typing: Option<Handler<TypingEvent>>,
    on_user_status: Option<Handler<UserStatusEvent>>,
}

impl ChatHandlers {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn on_message(mut self, f: impl Fn(ChatMessage) + Send + Sync + 'static) -> Self {
        self.on_message = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn on_typing(mut self, f: impl Fn(TypingEvent) + Send + Sync + 'static) -> Self {
        self.on_typing = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn on_user_status(mut self, f: impl Fn(UserStatusEvent) + Send + Sync + 'static) -> Self {
        self.on_user_status = Some(Arc::new(f));
        self
    }

    /// Route an event to its callback; returns `false` if none is registered
    pub fn dispatch(&self, event: InboundEvent) -> bool {
        match event {
            InboundEvent::ChatMessage(msg) => call(self.on_message.as_ref(), msg),
            InboundEvent::Typing(typing) => call(self.on_typing.as_ref(), typing),
            InboundEvent::UserStatus(status) => call(self.on_user_status.as_ref(), status),
        }
    }
}

fn call<T>(handler: Option<&Handler<T>>, payload: T) -> bool {
    match handler {
        Some(handler) => {
            handler(payload);
            true
        }
        None => false,
    }
}

impl std::fmt::Debug for ChatHandlers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatHandlers")
            .field("on_message", &self.on_message.is_some())
            .field("on_typing", &self.on_typing.is_some())
            .field("on_user_status", &self.on_user_status.is_some())
            .finish()
    }
}
