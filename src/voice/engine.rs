//! Speech engine seam.
//!
//! The platform speech capability (browser Web Speech, a native
//! synthesizer, a test double) sits behind [`SpeechEngine`]. The voice
//! channel only ever drives one recognition session or one utterance at
//! a time; the engine just has to honor the cancel calls.

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::Stream;

use crate::error::Result;
use crate::voice::persona::VoicePersona;

/// One event from a live speech-recognition session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionEvent {
    /// Current (possibly partial) transcript. Each event replaces the
    /// previous text; fragments are not concatenated by the caller.
    Partial {
        /// Best transcript so far.
        text: String,
    },
    /// The engine stopped recognizing (silence, stop call, or error).
    /// Terminal.
    Ended,
}

/// A boxed stream of recognition events from one listening session.
pub type RecognitionStream = Pin<Box<dyn Stream<Item = RecognitionEvent> + Send>>;

/// Trait for platform speech capabilities.
#[async_trait]
pub trait SpeechEngine: Send + Sync {
    /// Whether speech recognition is available on this platform.
    ///
    /// Probed at call time; an unavailable engine rejects listening but
    /// never affects chat.
    fn is_available(&self) -> bool;

    /// Begin a recognition session.
    ///
    /// The stream yields [`RecognitionEvent::Partial`] updates and ends
    /// with exactly one [`RecognitionEvent::Ended`].
    ///
    /// # Errors
    ///
    /// Returns an error when the recognizer cannot be started.
    async fn start_recognition(&self) -> Result<RecognitionStream>;

    /// Abort the current recognition session, if any.
    async fn cancel_recognition(&self);

    /// Speak `text` with the given persona.
    ///
    /// Resolves when the utterance finishes or is cancelled.
    ///
    /// # Errors
    ///
    /// Returns an error when synthesis fails.
    async fn speak(&self, text: &str, persona: &VoicePersona) -> Result<()>;

    /// Stop the current utterance, if any.
    async fn cancel_speech(&self);
}
