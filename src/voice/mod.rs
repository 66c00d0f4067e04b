//! Voice I/O: speech recognition and synthesis around the chat session.
//!
//! The platform ships one speech engine, so at most one recognition
//! session OR one utterance may be active at any time, process-wide.
//! [`VoiceChannel`] models that as an explicit state machine
//! {Idle, Listening, Speaking} with guarded transitions and explicit
//! cancel-before-start calls — listening always preempts speaking, and a
//! new utterance preempts the one playing.
//!
//! Voice failures are logged and absorbed; they never block or corrupt
//! the chat transcript.

pub mod assistant;
pub mod engine;
pub mod persona;

use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::error::{AssistantError, Result};
use crate::voice::engine::{RecognitionEvent, SpeechEngine};
use crate::voice::persona::{self as persona_mod, PersonaStore};

pub use assistant::{VoiceAssistant, VoiceOptions};
pub use engine::{RecognitionStream, SpeechEngine as Engine};
pub use persona::{FilePersonaStore, MemoryPersonaStore, VoicePersona};

const EVENT_CAPACITY: usize = 64;

/// What the shared speech engine is doing right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoicePhase {
    /// Neither channel is active.
    Idle,
    /// Speech recognition is running.
    Listening,
    /// An utterance is playing.
    Speaking,
}

/// Events broadcast by the voice channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceEvent {
    /// Recognition started; the live transcript was reset.
    ListeningStarted,
    /// The live transcript changed (replaces, not appends).
    TranscriptUpdated {
        /// Best transcript so far.
        text: String,
    },
    /// Recognition ended (silence, stop call, or engine error).
    ListeningEnded {
        /// Final live transcript at the moment recognition ended.
        transcript: String,
    },
    /// An utterance started playing.
    SpeakingStarted,
    /// The utterance finished or was cancelled.
    SpeakingEnded,
}

#[derive(Debug)]
struct VoiceState {
    phase: VoicePhase,
    /// Bumped on every transition start; spawned tasks with a stale
    /// generation must not touch the phase.
    generation: u64,
    transcript: String,
}

struct Inner {
    engine: Arc<dyn SpeechEngine>,
    store: Arc<dyn PersonaStore>,
    state: Mutex<VoiceState>,
    events: broadcast::Sender<VoiceEvent>,
}

/// The single owned voice resource: one recognizer, one synthesizer,
/// mutual exclusion enforced by guarded state transitions.
pub struct VoiceChannel {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for VoiceChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoiceChannel")
            .field("phase", &self.phase())
            .finish()
    }
}

impl VoiceChannel {
    /// Create a channel over the given engine and persona store.
    #[must_use]
    pub fn new(engine: Arc<dyn SpeechEngine>, store: Arc<dyn PersonaStore>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                engine,
                store,
                state: Mutex::new(VoiceState {
                    phase: VoicePhase::Idle,
                    generation: 0,
                    transcript: String::new(),
                }),
                events,
            }),
        }
    }

    /// Subscribe to voice events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<VoiceEvent> {
        self.inner.events.subscribe()
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> VoicePhase {
        self.inner.lock().phase
    }

    /// Whether recognition is running.
    #[must_use]
    pub fn is_listening(&self) -> bool {
        self.phase() == VoicePhase::Listening
    }

    /// Whether an utterance is playing.
    #[must_use]
    pub fn is_speaking(&self) -> bool {
        self.phase() == VoicePhase::Speaking
    }

    /// The live (possibly partial) transcript of the current or most
    /// recent listening session.
    #[must_use]
    pub fn live_transcript(&self) -> String {
        self.inner.lock().transcript.clone()
    }

    /// Drop the live transcript (after it has been sent into the chat).
    pub fn discard_transcript(&self) {
        self.inner.lock().transcript.clear();
    }

    /// Start a speech-recognition session.
    ///
    /// Cancels any playing utterance first (listening takes priority).
    /// A no-op when already listening.
    ///
    /// # Errors
    ///
    /// Returns [`AssistantError::Voice`] when recognition is
    /// unavailable on this platform or the recognizer fails to start.
    /// Chat is unaffected either way.
    pub async fn start_listening(&self) -> Result<()> {
        if !self.inner.engine.is_available() {
            return Err(AssistantError::Voice(
                "speech recognition is not supported on this device".to_owned(),
            ));
        }

        let (was_speaking, generation) = {
            let mut state = self.inner.lock();
            if state.phase == VoicePhase::Listening {
                return Ok(());
            }
            let was_speaking = state.phase == VoicePhase::Speaking;
            state.generation = state.generation.wrapping_add(1);
            state.phase = VoicePhase::Listening;
            state.transcript.clear();
            (was_speaking, state.generation)
        };

        // Listening preempts speech output; never both active.
        if was_speaking {
            self.inner.engine.cancel_speech().await;
            self.inner.emit(VoiceEvent::SpeakingEnded);
        }

        let mut stream = match self.inner.engine.start_recognition().await {
            Ok(stream) => stream,
            Err(e) => {
                warn!("failed to start speech recognition: {e}");
                self.inner.settle(generation, VoicePhase::Idle);
                return Err(AssistantError::Voice(format!(
                    "failed to start voice input: {e}"
                )));
            }
        };

        self.inner.emit(VoiceEvent::ListeningStarted);

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            use futures_util::StreamExt;
            while let Some(event) = stream.next().await {
                match event {
                    RecognitionEvent::Partial { text } => {
                        {
                            let mut state = inner.lock();
                            if state.generation != generation {
                                return;
                            }
                            state.transcript = text.clone();
                        }
                        inner.emit(VoiceEvent::TranscriptUpdated { text });
                    }
                    RecognitionEvent::Ended => break,
                }
            }

            let transcript = {
                let mut state = inner.lock();
                if state.generation != generation {
                    return;
                }
                state.phase = VoicePhase::Idle;
                state.transcript.clone()
            };
            inner.emit(VoiceEvent::ListeningEnded { transcript });
        });

        Ok(())
    }

    /// Stop the current recognition session, if any.
    pub async fn stop_listening(&self) {
        let listening = self.inner.lock().phase == VoicePhase::Listening;
        if listening {
            // The forwarding task observes the engine's Ended event and
            // performs the transition + ListeningEnded emission.
            self.inner.engine.cancel_recognition().await;
        }
    }

    /// Speak `text` with the active persona.
    ///
    /// Skipped while listening (listening has priority) and for blank
    /// text. A playing utterance is preempted. Synthesis errors are
    /// logged and absorbed.
    pub async fn speak(&self, text: &str) {
        if text.trim().is_empty() {
            return;
        }

        let (was_speaking, generation) = {
            let mut state = self.inner.lock();
            if state.phase == VoicePhase::Listening {
                debug!("speak skipped: listening in progress");
                return;
            }
            let was_speaking = state.phase == VoicePhase::Speaking;
            state.generation = state.generation.wrapping_add(1);
            state.phase = VoicePhase::Speaking;
            (was_speaking, state.generation)
        };

        if was_speaking {
            self.inner.engine.cancel_speech().await;
            self.inner.emit(VoiceEvent::SpeakingEnded);
        }

        // Persona selection is read at speak time so settings changes
        // take effect on the next utterance.
        let persona = persona_mod::persona(&self.inner.store.active_persona_id());
        self.inner.emit(VoiceEvent::SpeakingStarted);

        let inner = Arc::clone(&self.inner);
        let text = text.to_owned();
        tokio::spawn(async move {
            if let Err(e) = inner.engine.speak(&text, &persona).await {
                warn!("speech synthesis failed: {e}");
            }
            if inner.settle(generation, VoicePhase::Idle) {
                inner.emit(VoiceEvent::SpeakingEnded);
            }
        });
    }

    /// Stop the current utterance, if any.
    pub async fn stop_speaking(&self) {
        let speaking = self.inner.lock().phase == VoicePhase::Speaking;
        if speaking {
            self.inner.engine.cancel_speech().await;
        }
    }
}

impl Inner {
    fn lock(&self) -> std::sync::MutexGuard<'_, VoiceState> {
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn emit(&self, event: VoiceEvent) {
        let _ = self.events.send(event);
    }

    /// Move to `phase` if `generation` is still current. Returns whether
    /// the transition happened.
    fn settle(&self, generation: u64, phase: VoicePhase) -> bool {
        let mut state = self.lock();
        if state.generation != generation {
            return false;
        }
        state.phase = phase;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voice::persona::VoicePersona;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    /// Scripted engine: hands out recognition streams from a queue and
    /// records cancel calls.
    struct FakeEngine {
        available: bool,
        recognitions: Mutex<Vec<Vec<RecognitionEvent>>>,
        speech_cancelled: AtomicBool,
        speak_calls: AtomicUsize,
        /// Block each speak() until cancelled when true.
        hold_speech: bool,
        speech_release: tokio::sync::Notify,
    }

    impl FakeEngine {
        fn base() -> Self {
            Self {
                available: true,
                recognitions: Mutex::new(Vec::new()),
                speech_cancelled: AtomicBool::new(false),
                speak_calls: AtomicUsize::new(0),
                hold_speech: false,
                speech_release: tokio::sync::Notify::new(),
            }
        }

        fn new() -> Arc<Self> {
            Arc::new(Self::base())
        }

        fn holding_speech() -> Arc<Self> {
            Arc::new(Self {
                hold_speech: true,
                ..Self::base()
            })
        }

        fn unavailable() -> Arc<Self> {
            Arc::new(Self {
                available: false,
                ..Self::base()
            })
        }

        fn queue_recognition(&self, events: Vec<RecognitionEvent>) {
            self.recognitions
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .push(events);
        }
    }

    #[async_trait]
    impl SpeechEngine for FakeEngine {
        fn is_available(&self) -> bool {
            self.available
        }

        async fn start_recognition(&self) -> crate::error::Result<RecognitionStream> {
            let events = self
                .recognitions
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .pop()
                .unwrap_or_else(|| vec![RecognitionEvent::Ended]);
            Ok(Box::pin(futures_util::stream::iter(events)))
        }

        async fn cancel_recognition(&self) {}

        async fn speak(&self, _text: &str, _persona: &VoicePersona) -> crate::error::Result<()> {
            self.speak_calls.fetch_add(1, Ordering::SeqCst);
            if self.hold_speech {
                self.speech_release.notified().await;
            }
            Ok(())
        }

        async fn cancel_speech(&self) {
            self.speech_cancelled.store(true, Ordering::SeqCst);
            self.speech_release.notify_waiters();
        }
    }

    fn channel(engine: Arc<FakeEngine>) -> VoiceChannel {
        VoiceChannel::new(engine, Arc::new(MemoryPersonaStore::default()))
    }

    async fn wait_for(channel: &VoiceChannel, phase: VoicePhase) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while channel.phase() != phase {
            assert!(
                tokio::time::Instant::now() < deadline,
                "never reached {phase:?}"
            );
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    #[tokio::test]
    async fn unavailable_engine_rejects_listening() {
        let voice = channel(FakeEngine::unavailable());
        let result = voice.start_listening().await;
        assert!(matches!(result, Err(AssistantError::Voice(_))));
        assert_eq!(voice.phase(), VoicePhase::Idle);
    }

    #[tokio::test]
    async fn recognition_updates_live_transcript() {
        let engine = FakeEngine::new();
        engine.queue_recognition(vec![
            RecognitionEvent::Partial {
                text: "open".into(),
            },
            RecognitionEvent::Partial {
                text: "open the inbox".into(),
            },
            RecognitionEvent::Ended,
        ]);
        let voice = channel(engine);
        let mut rx = voice.subscribe();

        voice.start_listening().await.expect("engine available");
        wait_for(&voice, VoicePhase::Idle).await;

        assert_eq!(voice.live_transcript(), "open the inbox");

        // The final event carries the transcript for auto-send.
        let mut ended = None;
        while let Ok(event) = rx.try_recv() {
            if let VoiceEvent::ListeningEnded { transcript } = event {
                ended = Some(transcript);
            }
        }
        assert_eq!(ended.as_deref(), Some("open the inbox"));
    }

    #[tokio::test]
    async fn listening_preempts_speech_output() {
        let engine = FakeEngine::holding_speech();
        let voice = channel(engine.clone());

        voice.speak("Systems nominal.").await;
        wait_for(&voice, VoicePhase::Speaking).await;

        engine.queue_recognition(vec![RecognitionEvent::Ended]);
        voice.start_listening().await.expect("engine available");

        assert!(engine.speech_cancelled.load(Ordering::SeqCst));
        wait_for(&voice, VoicePhase::Idle).await;
    }

    #[tokio::test]
    async fn speak_skipped_while_listening() {
        // Recognition that never ends on its own.
        let (_tx, rx_stream) = tokio::sync::mpsc::channel::<RecognitionEvent>(1);

        struct HeldEngine {
            stream: Mutex<Option<RecognitionStream>>,
            speak_calls: AtomicUsize,
        }

        #[async_trait]
        impl SpeechEngine for HeldEngine {
            fn is_available(&self) -> bool {
                true
            }
            async fn start_recognition(&self) -> crate::error::Result<RecognitionStream> {
                Ok(self
                    .stream
                    .lock()
                    .unwrap_or_else(std::sync::PoisonError::into_inner)
                    .take()
                    .expect("single session"))
            }
            async fn cancel_recognition(&self) {}
            async fn speak(
                &self,
                _text: &str,
                _persona: &VoicePersona,
            ) -> crate::error::Result<()> {
                self.speak_calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
            async fn cancel_speech(&self) {}
        }

        let held = Arc::new(HeldEngine {
            stream: Mutex::new(Some(Box::pin(
                tokio_stream::wrappers::ReceiverStream::new(rx_stream),
            ))),
            speak_calls: AtomicUsize::new(0),
        });
        let voice = VoiceChannel::new(held.clone(), Arc::new(MemoryPersonaStore::default()));

        voice.start_listening().await.expect("engine available");
        assert_eq!(voice.phase(), VoicePhase::Listening);

        voice.speak("should be skipped").await;
        assert_eq!(held.speak_calls.load(Ordering::SeqCst), 0);
        assert_eq!(voice.phase(), VoicePhase::Listening);
    }

    #[tokio::test]
    async fn new_utterance_preempts_playing_one() {
        let engine = FakeEngine::holding_speech();
        let voice = channel(engine.clone());

        voice.speak("first").await;
        wait_for(&voice, VoicePhase::Speaking).await;

        // Synthesis runs on a spawned task; wait until the first
        // utterance has actually reached the engine before preempting.
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while engine.speak_calls.load(Ordering::SeqCst) == 0 {
            assert!(
                tokio::time::Instant::now() < deadline,
                "first utterance never started"
            );
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        voice.speak("second").await;
        assert!(engine.speech_cancelled.load(Ordering::SeqCst));
        assert!(engine.speak_calls.load(Ordering::SeqCst) >= 1);
        assert_eq!(voice.phase(), VoicePhase::Speaking);
    }

    #[tokio::test]
    async fn blank_text_is_not_spoken() {
        let engine = FakeEngine::new();
        let voice = channel(engine.clone());

        voice.speak("   ").await;
        assert_eq!(voice.phase(), VoicePhase::Idle);
        assert_eq!(engine.speak_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn speaking_returns_to_idle_when_utterance_finishes() {
        let engine = FakeEngine::new();
        let voice = channel(engine);
        let mut rx = voice.subscribe();

        voice.speak("done quickly").await;
        wait_for(&voice, VoicePhase::Idle).await;

        let mut saw_started = false;
        let mut saw_ended = false;
        while let Ok(event) = rx.try_recv() {
            match event {
                VoiceEvent::SpeakingStarted => saw_started = true,
                VoiceEvent::SpeakingEnded => saw_ended = true,
                _ => {}
            }
        }
        assert!(saw_started && saw_ended);
    }
}
