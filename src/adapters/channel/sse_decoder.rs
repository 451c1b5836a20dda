//! Incremental Server-Sent Events decoder.
//!
//! Bytes arrive in arbitrary chunks; a frame is complete at the first blank
//! line. Wire format:
//!
//! ```text
//! event: schedule-updated
//! id: 7
//! data: {"id":"c-1"}
//!
//! : keep-alive comment
//! ```
//!
//! A line that grows past the length limit without a newline is dropped
//! along with the frame it belonged to; decoding resumes after the next
//! newline.

use crate::domain::events::RawFrame;

/// Default cap on a single pending line.
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

/// Stateful line-oriented decoder.
#[derive(Debug)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    max_line: usize,
    /// Skipping the tail of an over-long line.
    discarding: bool,
    event: Option<String>,
    data: Vec<String>,
    id: Option<String>,
}

impl Default for SseDecoder {
    fn default() -> Self {
        Self::with_max_line(MAX_LINE_BYTES)
    }
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_line(max_line: usize) -> Self {
        Self {
            buffer: Vec::new(),
            max_line,
            discarding: false,
            event: None,
            data: Vec::new(),
            id: None,
        }
    }

    /// Feeds a chunk and returns every frame it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<RawFrame> {
        let mut frames = Vec::new();

        let chunk = if self.discarding {
            match chunk.iter().position(|b| *b == b'\n') {
                Some(pos) => {
                    self.discarding = false;
                    &chunk[pos + 1..]
                }
                None => return frames,
            }
        } else {
            chunk
        };
        self.buffer.extend_from_slice(chunk);

        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim_end_matches(['\n', '\r']);

            if line.is_empty() {
                if let Some(frame) = self.dispatch() {
                    frames.push(frame);
                }
            } else {
                self.field(line);
            }
        }

        if self.buffer.len() > self.max_line {
            tracing::warn!(
                pending_bytes = self.buffer.len(),
                limit = self.max_line,
                "SSE line exceeds limit; dropping frame"
            );
            self.buffer.clear();
            self.event = None;
            self.data.clear();
            self.id = None;
            self.discarding = true;
        }

        frames
    }

    /// Bytes held while waiting for a newline.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    fn field(&mut self, line: &str) {
        if line.starts_with(':') {
            return;
        }

        let (name, value) = match line.split_once(':') {
            Some((name, value)) => (name, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match name {
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            "id" => self.id = Some(value.to_string()),
            _ => {}
        }
    }

    /// A frame with a name but no data still counts; a bare blank line does not.
    fn dispatch(&mut self) -> Option<RawFrame> {
        let event = self.event.take();
        let id = self.id.take();
        if event.is_none() && self.data.is_empty() {
            return None;
        }

        let data = std::mem::take(&mut self.data).join("\n");
        Some(RawFrame { event, data, id })
    }
}
