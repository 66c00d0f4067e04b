//! Dasom: streaming chat session core with voice I/O.
//!
//! The heart of the crate is [`ChatSession`]: it owns one conversation
//! transcript, runs at most one streaming exchange against the LLM
//! gateway at a time, and grows the in-progress assistant message as
//! deltas arrive. Everything around it is a narrow seam:
//!
//! - [`StreamTransport`] — the gateway contract (turn list in, ordered
//!   delta stream out), implemented by [`GatewayTransport`] over SSE.
//! - [`SpeechEngine`](voice::engine::SpeechEngine) — the platform
//!   speech capability, driven by the [`VoiceChannel`] state machine
//!   (idle / listening / speaking, never both voice channels at once).
//! - [`VoiceAssistant`] — the optional decorator that auto-sends
//!   recognized speech into the session and speaks completed replies.
//!
//! Observers follow transcript changes through broadcast events, so any
//! UI can render the conversation without the core depending on it.

pub mod config;
pub mod error;
pub mod events;
pub mod message;
pub mod session;
pub mod transcript;
pub mod transport;
pub mod voice;

pub use config::AssistantConfig;
pub use error::{AssistantError, Result};
pub use events::{SessionEvent, StreamEvent};
pub use message::{ChatMessage, Role, Turn};
pub use session::{ChatSession, SendOutcome};
pub use transcript::Transcript;
pub use transport::{DeltaStream, GatewayConfig, GatewayTransport, StreamTransport};
pub use voice::{VoiceAssistant, VoiceChannel, VoiceEvent, VoiceOptions, VoicePhase};
