//! Streaming transport seam between the session and the LLM gateway.
//!
//! The session consumes the gateway through [`StreamTransport`] only:
//! hand over the turn list plus an optional context tag, get back a
//! single logical stream of [`StreamEvent`]s. Wire framing (SSE, JSON
//! chunk shape, `[DONE]` sentinel) is the transport's business.

pub mod gateway;
pub mod sse;

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::Stream;

use crate::error::Result;
use crate::events::StreamEvent;
use crate::message::Turn;

pub use gateway::{GatewayConfig, GatewayTransport};

/// A boxed stream of delta events from one exchange.
pub type DeltaStream = Pin<Box<dyn Stream<Item = StreamEvent> + Send>>;

/// Trait for streaming LLM transports.
///
/// Contract: the returned stream yields zero or more ordered
/// [`StreamEvent::Delta`]s, then exactly one terminal event. The caller
/// never opens a second stream while one is outstanding (the session's
/// loading gate enforces this).
#[async_trait]
pub trait StreamTransport: Send + Sync {
    /// Open a streaming exchange for the given conversation.
    ///
    /// # Errors
    ///
    /// Returns an error when the connection itself cannot be
    /// established or the gateway rejects the request outright. Failures
    /// after the stream is open arrive as [`StreamEvent::Error`].
    async fn open(&self, turns: &[Turn], context: Option<&str>) -> Result<DeltaStream>;
}
