//! Conversation transcript storage.
//!
//! Insertion order is conversation order. The transcript is append-only
//! except for [`Transcript::clear`]. At most one assistant message may be
//! in progress (receiving deltas) at a time, and while in progress it is
//! always the last element.

use uuid::Uuid;

use crate::message::{ChatMessage, Turn};

/// Ordered list of chat messages for one conversation context.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
}

impl Transcript {
    /// Create an empty transcript.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message.
    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// Append `delta` to the message with the given id.
    ///
    /// Returns `false` when no such message exists (e.g. the transcript
    /// was cleared while the stream was in flight). The in-progress
    /// assistant message is always the last element, so only the tail is
    /// inspected — deltas never mutate the middle of the conversation.
    pub fn append_to(&mut self, id: Uuid, delta: &str) -> bool {
        match self.messages.last_mut() {
            Some(last) if last.id == id => {
                last.content.push_str(delta);
                true
            }
            _ => false,
        }
    }

    /// Reset the transcript to empty.
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// All messages, in conversation order.
    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Wire form of the transcript, in conversation order.
    #[must_use]
    pub fn to_turns(&self) -> Vec<Turn> {
        self.messages.iter().map(ChatMessage::to_turn).collect()
    }

    /// Number of messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the transcript is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Role;

    #[test]
    fn push_preserves_insertion_order() {
        let mut transcript = Transcript::new();
        transcript.push(ChatMessage::user("first"));
        transcript.push(ChatMessage::user("second"));

        let messages = transcript.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content, "first");
        assert_eq!(messages[1].content, "second");
    }

    #[test]
    fn append_to_grows_last_message() {
        let mut transcript = Transcript::new();
        transcript.push(ChatMessage::user("status check"));
        let id = Uuid::new_v4();
        transcript.push(ChatMessage::assistant_with_id(id, "Sys"));

        assert!(transcript.append_to(id, "tems "));
        assert!(transcript.append_to(id, "nominal."));

        let messages = transcript.messages();
        assert_eq!(messages[1].content, "Systems nominal.");
    }

    #[test]
    fn append_to_unknown_id_is_rejected() {
        let mut transcript = Transcript::new();
        transcript.push(ChatMessage::user("hello"));

        assert!(!transcript.append_to(Uuid::new_v4(), "late delta"));
        assert_eq!(transcript.messages()[0].content, "hello");
    }

    #[test]
    fn append_to_only_touches_the_tail() {
        let mut transcript = Transcript::new();
        let stale = Uuid::new_v4();
        transcript.push(ChatMessage::assistant_with_id(stale, "done"));
        transcript.push(ChatMessage::user("next question"));

        // The stale assistant message is no longer last, so it is frozen.
        assert!(!transcript.append_to(stale, " more"));
        assert_eq!(transcript.messages()[0].content, "done");
    }

    #[test]
    fn clear_resets_to_empty() {
        let mut transcript = Transcript::new();
        transcript.push(ChatMessage::user("hello"));
        transcript.clear();
        assert!(transcript.is_empty());
        assert_eq!(transcript.len(), 0);
    }

    #[test]
    fn to_turns_maps_roles_and_content() {
        let mut transcript = Transcript::new();
        transcript.push(ChatMessage::user("ping"));
        transcript.push(ChatMessage::assistant_with_id(Uuid::new_v4(), "pong"));

        let turns = transcript.to_turns();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, Role::User);
        assert_eq!(turns[0].content, "ping");
        assert_eq!(turns[1].role, Role::Assistant);
        assert_eq!(turns[1].content, "pong");
    }
}
