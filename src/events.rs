//! Event types flowing between the transport, the session, and observers.
//!
//! Transport side: a stream delivers zero or more ordered
//! [`StreamEvent::Delta`]s followed by exactly one terminal event
//! ([`StreamEvent::Done`] or [`StreamEvent::Error`]).
//!
//! Observer side: [`SessionEvent`]s are broadcast by the session so any
//! UI can react to transcript changes without the session depending on a
//! rendering framework.

/// One event from an open gateway stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// An incremental fragment of assistant text.
    Delta {
        /// The text fragment.
        text: String,
    },
    /// The stream ended normally. Terminal.
    Done,
    /// The stream failed. Terminal.
    Error {
        /// Description of what went wrong, suitable for a user notice.
        message: String,
    },
}

impl StreamEvent {
    /// Whether this event terminates the stream.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Delta { .. })
    }
}

/// Events broadcast by a [`ChatSession`](crate::session::ChatSession).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The transcript changed (message appended or delta applied).
    TranscriptChanged,
    /// The transcript was reset to empty.
    TranscriptCleared,
    /// An exchange resolved successfully.
    ExchangeCompleted {
        /// Final assistant message content (for TTS hand-off).
        text: String,
    },
    /// An exchange resolved with a failure.
    ExchangeFailed {
        /// User-facing notice describing the cause.
        notice: String,
    },
}
