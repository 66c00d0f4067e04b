//! Error types for the dasom assistant core.

/// Top-level error type for the chat and voice subsystems.
#[derive(Debug, thiserror::Error)]
pub enum AssistantError {
    /// Connection-level transport failure (before any delta arrived).
    #[error("transport error: {0}")]
    Transport(String),

    /// Gateway rejected the request with HTTP 429.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Gateway rejected the request with HTTP 402 (credits exhausted).
    #[error("credits required: {0}")]
    CreditsRequired(String),

    /// Gateway-signaled failure (5xx or an error payload).
    #[error("gateway error: {0}")]
    Gateway(String),

    /// Failure in the middle of an event stream.
    #[error("stream error: {0}")]
    Stream(String),

    /// Speech recognition or synthesis error.
    #[error("voice error: {0}")]
    Voice(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Channel send/receive error.
    #[error("channel error: {0}")]
    Channel(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AssistantError {
    /// User-facing notice for this failure.
    ///
    /// Every cause maps to a distinct, speakable message so the UI can
    /// surface it as a transient notification without inspecting the
    /// variant. Technical detail stays in the `Display` output and logs.
    #[must_use]
    pub fn user_notice(&self) -> String {
        match self {
            Self::Transport(_) => "Neural connection failed.".to_owned(),
            Self::RateLimited(_) => {
                "Rate limit exceeded. Neural processing temporarily throttled. \
                 Please try again shortly."
                    .to_owned()
            }
            Self::CreditsRequired(_) => {
                "Neural core requires additional resources. Please add credits to continue."
                    .to_owned()
            }
            Self::Gateway(msg) => {
                if msg.trim().is_empty() {
                    "Neural core connection failed.".to_owned()
                } else {
                    msg.clone()
                }
            }
            Self::Stream(msg) => format!("Response stream interrupted: {msg}"),
            Self::Voice(msg) => format!("Voice input error: {msg}"),
            Self::Config(_) | Self::Channel(_) | Self::Io(_) => {
                "Unknown neural processing error.".to_owned()
            }
        }
    }
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, AssistantError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notices_are_distinct_per_cause() {
        let errors = [
            AssistantError::Transport("refused".into()),
            AssistantError::RateLimited("429".into()),
            AssistantError::CreditsRequired("402".into()),
            AssistantError::Stream("EOF".into()),
            AssistantError::Voice("no-speech".into()),
        ];
        let notices: Vec<String> = errors.iter().map(AssistantError::user_notice).collect();
        for (i, a) in notices.iter().enumerate() {
            for b in notices.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn gateway_notice_prefers_server_message() {
        let err = AssistantError::Gateway("Upstream model unavailable.".into());
        assert_eq!(err.user_notice(), "Upstream model unavailable.");
    }

    #[test]
    fn gateway_notice_falls_back_when_blank() {
        let err = AssistantError::Gateway("  ".into());
        assert_eq!(err.user_notice(), "Neural core connection failed.");
    }

    #[test]
    fn display_includes_detail() {
        let err = AssistantError::RateLimited("retry after 30s".into());
        assert!(format!("{err}").contains("retry after 30s"));
    }
}
