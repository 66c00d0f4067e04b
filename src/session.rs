//! Streaming chat session manager.
//!
//! [`ChatSession`] owns the conversation transcript, mediates exactly
//! one streaming exchange with the gateway at a time, and mutates the
//! in-progress assistant message as deltas arrive. Observers follow the
//! transcript through a broadcast channel instead of a UI framework
//! binding.
//!
//! Exchange lifecycle:
//!
//! ```text
//! send_message → user message appended (sync) → stream opened
//!     → first delta appends assistant message
//!     → later deltas grow it in arrival order
//!     → Done / Error clears the loading flags
//! ```
//!
//! Admission control: while `is_loading` is true, further sends are
//! dropped, not queued. Failures keep whatever partial assistant text
//! already streamed — partial output beats silent loss.

use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::AssistantError;
use crate::events::{SessionEvent, StreamEvent};
use crate::message::{ChatMessage, Turn};
use crate::transcript::Transcript;
use crate::transport::StreamTransport;

/// Broadcast capacity for session events. Slow observers miss events
/// rather than backpressure the exchange task.
const EVENT_CAPACITY: usize = 64;

/// Result of a [`ChatSession::send_message`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The exchange was started.
    Accepted,
    /// Input was empty after trimming; nothing happened.
    RejectedEmpty,
    /// An exchange is already in flight; the call was dropped.
    RejectedBusy,
}

#[derive(Debug)]
struct SessionState {
    transcript: Transcript,
    is_loading: bool,
    is_streaming: bool,
    /// Bumped by `clear_chat`; an exchange holding a stale epoch ignores
    /// its remaining deltas and completion payload.
    epoch: u64,
}

struct Shared {
    transport: Arc<dyn StreamTransport>,
    context: Option<String>,
    state: Mutex<SessionState>,
    events: broadcast::Sender<SessionEvent>,
}

/// One conversation context: transcript, loading state, and the
/// single-in-flight exchange gate.
pub struct ChatSession {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("context", &self.shared.context)
            .finish()
    }
}

impl ChatSession {
    /// Create a session over the given transport.
    ///
    /// `context` is an opaque tag forwarded to the transport with every
    /// exchange (e.g. the owning screen's name).
    #[must_use]
    pub fn new(transport: Arc<dyn StreamTransport>, context: Option<String>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            shared: Arc::new(Shared {
                transport,
                context,
                state: Mutex::new(SessionState {
                    transcript: Transcript::new(),
                    is_loading: false,
                    is_streaming: false,
                    epoch: 0,
                }),
                events,
            }),
        }
    }

    /// Subscribe to session events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.shared.events.subscribe()
    }

    /// Snapshot of the transcript, in conversation order.
    #[must_use]
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.shared.lock().transcript.messages().to_vec()
    }

    /// Whether an exchange is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.shared.lock().is_loading
    }

    /// Whether deltas are actively being applied.
    #[must_use]
    pub fn is_streaming(&self) -> bool {
        self.shared.lock().is_streaming
    }

    /// Start a streaming exchange for `input`.
    ///
    /// Empty input (after trimming) and calls made while an exchange is
    /// in flight are dropped without side effects. On acceptance the
    /// user message is appended before this function returns; the
    /// exchange itself runs on a spawned task and resolves through the
    /// event channel.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn send_message(&self, input: &str) -> SendOutcome {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return SendOutcome::RejectedEmpty;
        }

        let (turns, epoch) = {
            let mut state = self.shared.lock();
            if state.is_loading {
                debug!("send_message dropped: exchange already in flight");
                return SendOutcome::RejectedBusy;
            }
            state.is_loading = true;
            state.is_streaming = true;
            state.transcript.push(ChatMessage::user(trimmed));
            (state.transcript.to_turns(), state.epoch)
        };
        self.shared.emit(SessionEvent::TranscriptChanged);

        info!("exchange started ({} turns)", turns.len());
        let shared = Arc::clone(&self.shared);
        let assistant_id = Uuid::new_v4();
        tokio::spawn(async move {
            shared.run_exchange(turns, assistant_id, epoch).await;
        });

        SendOutcome::Accepted
    }

    /// Reset the transcript to empty.
    ///
    /// Loading flags are untouched; if an exchange is in flight its late
    /// deltas and completion are ignored rather than appended into the
    /// emptied transcript.
    pub fn clear_chat(&self) {
        {
            let mut state = self.shared.lock();
            state.transcript.clear();
            state.epoch = state.epoch.wrapping_add(1);
        }
        self.shared.emit(SessionEvent::TranscriptCleared);
    }
}

impl Shared {
    fn lock(&self) -> std::sync::MutexGuard<'_, SessionState> {
        // A poisoned transcript lock means a panic mid-mutation; the
        // transcript itself is still structurally valid.
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }

    async fn run_exchange(&self, turns: Vec<Turn>, assistant_id: Uuid, epoch: u64) {
        let mut stream = match self
            .transport
            .open(&turns, self.context.as_deref())
            .await
        {
            Ok(stream) => stream,
            Err(e) => {
                warn!("exchange failed before streaming: {e}");
                self.finish(epoch, Err(e.user_notice()));
                return;
            }
        };

        let mut accumulated = String::new();
        let mut resolved = false;
        // Tracked explicitly: an empty first delta must not leave the
        // exchange looking like it never started.
        let mut started = false;

        use futures_util::StreamExt;
        while let Some(event) = stream.next().await {
            match event {
                StreamEvent::Delta { text } => {
                    let first = !started;
                    started = true;
                    accumulated.push_str(&text);
                    self.apply_delta(assistant_id, &text, first, epoch);
                }
                StreamEvent::Done => {
                    self.finish(epoch, Ok(accumulated.clone()));
                    resolved = true;
                    break;
                }
                StreamEvent::Error { message } => {
                    warn!("exchange failed mid-stream: {message}");
                    // Partial assistant content stays in the transcript.
                    self.finish(epoch, Err(AssistantError::Gateway(message).user_notice()));
                    resolved = true;
                    break;
                }
            }
        }

        // Transport contract promises a terminal event; tolerate a
        // stream that just stops so the session never wedges closed.
        if !resolved {
            self.finish(epoch, Ok(accumulated));
        }
    }

    fn apply_delta(&self, assistant_id: Uuid, text: &str, first: bool, epoch: u64) {
        let applied = {
            let mut state = self.lock();
            if state.epoch != epoch {
                false
            } else if first {
                state
                    .transcript
                    .push(ChatMessage::assistant_with_id(assistant_id, text));
                true
            } else {
                state.transcript.append_to(assistant_id, text)
            }
        };
        if applied {
            self.emit(SessionEvent::TranscriptChanged);
        }
    }

    /// Resolve the exchange: clear the flags and notify observers.
    ///
    /// A stale epoch (transcript cleared mid-flight) still unlocks the
    /// session but emits no completion or failure — the result was
    /// abandoned along with the transcript it belonged to.
    fn finish(&self, epoch: u64, outcome: std::result::Result<String, String>) {
        let current = {
            let mut state = self.lock();
            state.is_loading = false;
            state.is_streaming = false;
            state.epoch == epoch
        };
        if !current {
            debug!("exchange resolved after clear_chat; result dropped");
            return;
        }
        match outcome {
            Ok(text) => {
                info!("exchange completed ({} chars)", text.len());
                self.emit(SessionEvent::ExchangeCompleted { text });
            }
            Err(notice) => self.emit(SessionEvent::ExchangeFailed { notice }),
        }
    }
}
