//! Voice decorator around the chat session.
//!
//! [`VoiceAssistant`] wires a [`VoiceChannel`] to a [`ChatSession`]
//! without either knowing about the other: recognition results are
//! auto-sent into the session after a short debounce, and completed
//! assistant replies are spoken back when voice output is enabled.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::Result;
use crate::events::SessionEvent;
use crate::session::{ChatSession, SendOutcome};
use crate::voice::{VoiceChannel, VoiceEvent};

/// Debounce between recognition end and the automatic send, covering
/// trailing partial results from the recognizer.
pub const AUTO_SEND_DEBOUNCE: Duration = Duration::from_millis(500);

/// Behavior knobs for the voice decorator.
#[derive(Debug, Clone)]
pub struct VoiceOptions {
    /// Speak completed assistant replies aloud.
    pub speak_replies: bool,
    /// Delay between recognition end and the automatic send.
    pub auto_send_delay: Duration,
}

impl Default for VoiceOptions {
    fn default() -> Self {
        Self {
            speak_replies: true,
            auto_send_delay: AUTO_SEND_DEBOUNCE,
        }
    }
}

/// Chat session with voice input/output attached.
pub struct VoiceAssistant {
    session: Arc<ChatSession>,
    voice: Arc<VoiceChannel>,
    tasks: Vec<JoinHandle<()>>,
}

impl std::fmt::Debug for VoiceAssistant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoiceAssistant").finish_non_exhaustive()
    }
}

impl VoiceAssistant {
    /// Attach `voice` to `session`.
    ///
    /// Spawns the bridging tasks; they are aborted on drop, abandoning
    /// any in-flight events (screen teardown semantics).
    #[must_use]
    pub fn new(session: Arc<ChatSession>, voice: Arc<VoiceChannel>, options: VoiceOptions) -> Self {
        let mut tasks = Vec::with_capacity(2);

        // Recognition end → debounced auto-send.
        {
            let session = Arc::clone(&session);
            let voice = Arc::clone(&voice);
            let delay = options.auto_send_delay;
            let mut events = voice.subscribe();
            tasks.push(tokio::spawn(async move {
                loop {
                    match events.recv().await {
                        Ok(VoiceEvent::ListeningEnded { transcript }) => {
                            if transcript.trim().is_empty() {
                                continue;
                            }
                            tokio::time::sleep(delay).await;
                            if voice.is_listening() {
                                // User started a new session during the
                                // debounce; let that one finish instead.
                                continue;
                            }
                            // Re-read in case a trailing partial landed.
                            let pending = voice.live_transcript();
                            if session.send_message(&pending) == SendOutcome::Accepted {
                                debug!("voice transcript auto-sent");
                                voice.discard_transcript();
                            }
                        }
                        Ok(_) => {}
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => {}
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    }
                }
            }));
        }

        // Exchange completion → spoken reply.
        if options.speak_replies {
            let voice = Arc::clone(&voice);
            let mut events = session.subscribe();
            tasks.push(tokio::spawn(async move {
                loop {
                    match events.recv().await {
                        Ok(SessionEvent::ExchangeCompleted { text }) => {
                            voice.speak(&text).await;
                        }
                        Ok(_) => {}
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => {}
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    }
                }
            }));
        }

        Self {
            session,
            voice,
            tasks,
        }
    }

    /// The wrapped chat session.
    #[must_use]
    pub fn session(&self) -> &Arc<ChatSession> {
        &self.session
    }

    /// The wrapped voice channel.
    #[must_use]
    pub fn voice(&self) -> &Arc<VoiceChannel> {
        &self.voice
    }

    /// Start listening for voice input.
    ///
    /// # Errors
    ///
    /// Returns an error when recognition is unavailable or fails to
    /// start; the chat session is unaffected.
    pub async fn start_listening(&self) -> Result<()> {
        self.voice.start_listening().await
    }

    /// Stop listening for voice input.
    pub async fn stop_listening(&self) {
        self.voice.stop_listening().await;
    }
}

impl Drop for VoiceAssistant {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}
