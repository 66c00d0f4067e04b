//! Incremental Server-Sent Events parsing for gateway streams.
//!
//! The gateway frames its response as SSE: one `data: {json}` chunk per
//! event, blank-line delimited, ending with the `data: [DONE]` sentinel.
//! [`SseFeed`] turns arbitrary byte chunks into complete data payloads,
//! buffering partial lines across network reads.

/// The end-of-stream sentinel payload.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Whether a data payload is the `[DONE]` sentinel.
#[must_use]
pub fn is_done(data: &str) -> bool {
    data.trim() == DONE_SENTINEL
}

/// Incremental SSE parser yielding `data:` payloads.
///
/// Feed raw bytes via [`SseFeed::push`]; each returned string is the
/// joined data payload of one complete event. Event types, ids, and
/// comment lines are ignored — the gateway only uses data chunks.
#[derive(Debug, Default)]
pub struct SseFeed {
    /// Raw bytes of the current (incomplete) line. Decoded only once
    /// the line is complete, so a multibyte character split across
    /// network reads survives intact.
    line_buffer: Vec<u8>,
    data_lines: Vec<String>,
}

impl SseFeed {
    /// Create an empty feed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a chunk of bytes, returning any completed data payloads.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut payloads = Vec::new();

        for &byte in chunk {
            if byte == b'\n' {
                let line = self.take_buffered_line();
                if let Some(payload) = self.take_line(&line) {
                    payloads.push(payload);
                }
            } else {
                self.line_buffer.push(byte);
            }
        }

        payloads
    }

    /// Flush any buffered data as a final payload when the stream ends.
    pub fn finish(&mut self) -> Option<String> {
        if !self.line_buffer.is_empty() {
            let line = self.take_buffered_line();
            self.take_line(&line);
        }

        if self.data_lines.is_empty() {
            None
        } else {
            Some(self.drain_event())
        }
    }

    fn take_buffered_line(&mut self) -> String {
        let mut line = std::mem::take(&mut self.line_buffer);
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        String::from_utf8_lossy(&line).into_owned()
    }

    /// Consume one complete line. Returns a payload at event boundaries.
    fn take_line(&mut self, line: &str) -> Option<String> {
        if line.is_empty() {
            if self.data_lines.is_empty() {
                return None;
            }
            return Some(self.drain_event());
        }

        // Comment lines start with ':'.
        if line.starts_with(':') {
            return None;
        }

        if let Some(value) = line.strip_prefix("data:") {
            self.data_lines
                .push(value.strip_prefix(' ').unwrap_or(value).to_owned());
        }
        // Other fields (event:, id:, retry:) are ignored.

        None
    }

    fn drain_event(&mut self) -> String {
        let payload = self.data_lines.join("\n");
        self.data_lines.clear();
        payload
    }
}
