//! Hosted LLM gateway adapter.
//!
//! Implements [`StreamTransport`] against the assistant gateway: a
//! single POST carrying the turn list and context tag, answered with an
//! SSE body of OpenAI-style delta chunks ending in `[DONE]`. HTTP-level
//! rejections are mapped to distinct user-facing causes (rate limit,
//! credits, gateway failure) before any stream exists.

use async_trait::async_trait;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{AssistantError, Result};
use crate::events::StreamEvent;
use crate::message::Turn;
use crate::transport::sse::{self, SseFeed};
use crate::transport::{DeltaStream, StreamTransport};

/// Connection settings for the gateway transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Full URL of the streaming chat endpoint.
    pub url: String,
    /// Bearer token sent with each request. Empty disables the header.
    #[serde(default)]
    pub api_key: String,
}

impl GatewayConfig {
    /// Create a config for the given endpoint URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: String::new(),
        }
    }

    /// Set the bearer token.
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = key.into();
        self
    }
}

/// Streaming transport backed by the hosted gateway.
pub struct GatewayTransport {
    config: GatewayConfig,
    client: reqwest::Client,
}

impl std::fmt::Debug for GatewayTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayTransport")
            .field("url", &self.config.url)
            .finish()
    }
}

impl GatewayTransport {
    /// Create a transport with the given configuration.
    #[must_use]
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    /// Map a non-success HTTP status to the matching error cause.
    fn map_http_error(status: reqwest::StatusCode, body: &str) -> AssistantError {
        let message = extract_error_message(body);
        match status.as_u16() {
            429 => AssistantError::RateLimited(message),
            402 => AssistantError::CreditsRequired(message),
            _ => AssistantError::Gateway(message),
        }
    }
}

/// Pull the `error` field out of a gateway error body, falling back to
/// the raw body text.
fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(String::from))
        .unwrap_or_else(|| body.to_owned())
}

/// Extract events from one SSE data payload.
///
/// The gateway relays OpenAI-style chunks: the delta text lives at
/// `choices[0].delta.content`, and a `finish_reason` of `"stop"` ends
/// the stream. A top-level `error` field ends the stream with a failure.
fn parse_chunk(data: &str) -> Vec<StreamEvent> {
    let parsed: serde_json::Value = match serde_json::from_str(data) {
        Ok(v) => v,
        // Keep-alive or malformed chunk; skip rather than abort.
        Err(_) => return Vec::new(),
    };

    if let Some(message) = parsed.get("error").and_then(|e| e.as_str()) {
        return vec![StreamEvent::Error {
            message: message.to_owned(),
        }];
    }

    let mut events = Vec::new();
    if let Some(choices) = parsed.get("choices").and_then(|c| c.as_array()) {
        for choice in choices {
            if let Some(content) = choice
                .get("delta")
                .and_then(|d| d.get("content"))
                .and_then(|c| c.as_str())
                && !content.is_empty()
            {
                events.push(StreamEvent::Delta {
                    text: content.to_owned(),
                });
            }

            if choice.get("finish_reason").and_then(|f| f.as_str()) == Some("stop") {
                events.push(StreamEvent::Done);
            }
        }
    }

    events
}

#[async_trait]
impl StreamTransport for GatewayTransport {
    async fn open(&self, turns: &[Turn], context: Option<&str>) -> Result<DeltaStream> {
        let mut body = serde_json::json!({ "messages": turns });
        if let Some(intent) = context
            && let Some(obj) = body.as_object_mut()
        {
            obj.insert("intent".into(), serde_json::json!(intent));
        }

        let mut request = self
            .client
            .post(&self.config.url)
            .header("Content-Type", "application/json");
        if !self.config.api_key.is_empty() {
            request = request.header("Authorization", format!("Bearer {}", self.config.api_key));
        }

        let response = request
            .json(&body)
            .send()
            .await
            .map_err(|e| AssistantError::Transport(format!("gateway request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            warn!("gateway rejected request: HTTP {status}");
            return Err(Self::map_http_error(status, &body_text));
        }

        debug!("gateway stream open");
        let mut byte_stream = response.bytes_stream();

        let events = async_stream::stream! {
            let mut feed = SseFeed::new();
            let mut terminated = false;

            'outer: while let Some(next) = byte_stream.next().await {
                let chunk = match next {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        terminated = true;
                        yield StreamEvent::Error {
                            message: format!("stream read failed: {e}"),
                        };
                        break;
                    }
                };

                for payload in feed.push(&chunk) {
                    if sse::is_done(&payload) {
                        terminated = true;
                        yield StreamEvent::Done;
                        break 'outer;
                    }
                    for event in parse_chunk(&payload) {
                        let terminal = event.is_terminal();
                        yield event;
                        if terminal {
                            terminated = true;
                            break 'outer;
                        }
                    }
                }
            }

            // Connection closed without a sentinel: treat as a clean end so
            // partial output is kept and the session unlocks.
            if !terminated {
                if let Some(payload) = feed.finish()
                    && !sse::is_done(&payload)
                {
                    for event in parse_chunk(&payload) {
                        if event.is_terminal() {
                            yield event;
                            return;
                        }
                        yield event;
                    }
                }
                yield StreamEvent::Done;
            }
        };

        Ok(Box::pin(events))
    }
}
