//! Message types for the conversation transcript.
//!
//! A [`ChatMessage`] is one entry in the transcript: identity, role,
//! text, and creation time. The [`Turn`] form is what goes over the wire
//! to the gateway — role and content only, no local metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who authored a transcript message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// User input.
    User,
    /// Assistant (model) output.
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// A single message in the conversation transcript.
///
/// `id`, `role`, and `timestamp` are fixed at creation. `content` is
/// mutable only for an assistant message while its stream is in
/// progress; once the stream resolves it is frozen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Opaque unique identifier, stable for the message's lifetime.
    pub id: Uuid,
    /// Who authored this message.
    pub role: Role,
    /// Message text. Grows append-only while an assistant stream runs.
    pub content: String,
    /// Creation time, set once.
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    /// Create a user message with a fresh id.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create an assistant message under a pre-allocated id.
    ///
    /// The session allocates the id before the first delta arrives so
    /// later deltas can be routed to the same message.
    #[must_use]
    pub fn assistant_with_id(id: Uuid, content: impl Into<String>) -> Self {
        Self {
            id,
            role: Role::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// Wire form of this message.
    #[must_use]
    pub fn to_turn(&self) -> Turn {
        Turn {
            role: self.role,
            content: self.content.clone(),
        }
    }
}

/// A role/content pair as sent to the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// Message role.
    pub role: Role,
    /// Message text.
    pub content: String,
}

impl Turn {
    /// Create a user turn.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create an assistant turn.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_display() {
        assert_eq!(Role::User.to_string(), "user");
        assert_eq!(Role::Assistant.to_string(), "assistant");
    }

    #[test]
    fn role_serializes_lowercase() {
        let json = serde_json::to_string(&Role::Assistant).unwrap_or_default();
        assert_eq!(json, "\"assistant\"");
    }

    #[test]
    fn user_message_gets_fresh_id() {
        let a = ChatMessage::user("one");
        let b = ChatMessage::user("two");
        assert_ne!(a.id, b.id);
        assert_eq!(a.role, Role::User);
    }

    #[test]
    fn assistant_message_keeps_given_id() {
        let id = Uuid::new_v4();
        let msg = ChatMessage::assistant_with_id(id, "Sys");
        assert_eq!(msg.id, id);
        assert_eq!(msg.role, Role::Assistant);
        assert_eq!(msg.content, "Sys");
    }

    #[test]
    fn to_turn_drops_local_metadata() {
        let msg = ChatMessage::user("status check");
        let turn = msg.to_turn();
        assert_eq!(turn, Turn::user("status check"));
    }

    #[test]
    fn chat_message_serde_round_trip() {
        let msg = ChatMessage::user("status check");
        let json = serde_json::to_string(&msg).unwrap_or_default();
        let back: ChatMessage = match serde_json::from_str(&json) {
            Ok(m) => m,
            Err(e) => unreachable!("message must round-trip: {e}"),
        };
        assert_eq!(back.id, msg.id);
        assert_eq!(back, msg);
    }

    #[test]
    fn turn_wire_shape() {
        let turn = Turn::assistant("Systems nominal.");
        let json = serde_json::to_value(&turn).unwrap_or_default();
        assert_eq!(
            json,
            serde_json::json!({"role": "assistant", "content": "Systems nominal."})
        );
    }
}
