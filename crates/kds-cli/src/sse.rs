//! Incremental Server-Sent Events frame decoding.
//!
//! The transport delivers arbitrary byte chunks; frames are `data: <JSON>`
//! blocks terminated by a blank line. A malformed frame is logged and
//! skipped — a single bad frame never tears the connection down.

use kds_core::event::KitchenEvent;

/// Incremental decoder from transport chunks to kitchen events.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: String,
}

impl FrameDecoder {
    /// Creates an empty decoder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a transport chunk, returning every event completed by it.
    ///
    /// Partial frames stay buffered until the terminating blank line
    /// arrives. Carriage returns are stripped on ingest, so `\r\n` framing
    /// decodes the same as `\n`.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<KitchenEvent> {
        let text = String::from_utf8_lossy(chunk);
        for ch in text.chars() {
            if ch != '\r' {
                self.buffer.push(ch);
            }
        }

        let mut events = Vec::new();
        while let Some(boundary) = self.buffer.find("\n\n") {
            let frame: String = self.buffer.drain(..boundary + 2).collect();
            if let Some(event) = decode_frame(frame.trim()) {
                events.push(event);
            }
        }
        events
    }
}

/// Decodes one complete frame, or `None` for comments and malformed input.
fn decode_frame(frame: &str) -> Option<KitchenEvent> {
    let mut data_lines = Vec::new();
    for line in frame.lines() {
        if let Some(rest) = line.strip_prefix("data:") {
            data_lines.push(rest.strip_prefix(' ').unwrap_or(rest));
        }
        // Lines starting with ':' are comments; other fields (event/id/retry)
        // are not used on this channel.
    }

    if data_lines.is_empty() {
        return None;
    }

    let data = data_lines.join("\n");
    match serde_json::from_str(&data) {
        Ok(event) => Some(event),
        Err(err) => {
            tracing::warn!(error = %err, frame = %data, "ignoring malformed event frame");
            None
        }
    }
}
