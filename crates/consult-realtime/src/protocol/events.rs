//! Chat socket event payloads
//!
//! Inbound frames are JSON objects discriminated by `type`. Payload fields are parsed
//! leniently; anything not modelled here is kept in `extra`.

use crate::error::RealtimeError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ============================================================================
// Inbound
// ============================================================================

/// A chat message pushed by the server
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChatMessage {
    #[serde(default, alias = "message_id")]
    pub id: Option<Value>,
    #[serde(default, alias = "message", alias = "content")]
    pub text: Option<String>,
    #[serde(default, alias = "sender_id", alias = "user_id")]
    pub sender: Option<Value>,
    #[serde(default, alias = "created_at")]
    pub timestamp: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Another participant started or stopped typing
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TypingEvent {
    #[serde(default)]
    pub user_id: Option<Value>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub is_typing: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A participant's presence changed
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UserStatusEvent {
    #[serde(default)]
    pub user_id: Option<Value>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub is_online: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Recognised inbound events
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    ChatMessage(ChatMessage),
    Typing(TypingEvent),
    UserStatus(UserStatusEvent),
}

impl InboundEvent {
    /// Parse a text frame
    ///
    /// Returns `Ok(None)` for well-formed JSON with an unknown or missing `type`.
    pub fn parse(text: &str) -> Result<Option<Self>, RealtimeError> {
        let mut value: Value = serde_json::from_str(text)?;

        let Some(kind) = value.get("type").and_then(Value::as_str).map(str::to_owned) else {
            return Ok(None);
        };
        if let Some(object) = value.as_object_mut() {
            object.remove("type");
        }

        let event = match kind.as_str() {
            "chat_message" => Self::ChatMessage(serde_json::from_value(value)?),
            "typing" => Self::Typing(serde_json::from_value(value)?),
            "user_status" => Self::UserStatus(serde_json::from_value(value)?),
            _ => return Ok(None),
        };
        Ok(Some(event))
    }

    /// Wire name of this event
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::ChatMessage(_) => "chat_message",
            Self::Typing(_) => "typing",
            Self::UserStatus(_) => "user_status",
        }
    }
}

// ============================================================================
// Outbound
// ============================================================================

/// Frames the client sends
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundEvent {
    ChatMessage { text: String },
    Typing { is_typing: bool },
    MessageRead { message_id: Value },
}

impl OutboundEvent {
    #[must_use]
    pub fn chat_message(text: impl Into<String>) -> Self {
        Self::ChatMessage { text: text.into() }
    }

    #[must_use]
    pub fn typing(is_typing: bool) -> Self {
        Self::Typing { is_typing }
    }

    #[must_use]
    pub fn message_read(message_id: impl Into<Value>) -> Self {
        Self::MessageRead {
            message_id: message_id.into(),
        }
    }

    /// Serialize to a text frame
    pub fn to_json(&self) -> Result<String, RealtimeError> {
        serde_json::to_string(self).map_err(|e| RealtimeError::Transport(e.to_string()))
    }
}
