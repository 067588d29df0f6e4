//! # Sentence Buffer
//!
//! Fixed-capacity text buffer the encoder renders into.
//!
//! The buffer is split into a body region and a trailer region of
//! [`TRAILER_LEN`] bytes. Body writes that do not fit are cut at the body
//! limit and flag the buffer as truncated; the trailer region stays free so
//! the checksum and terminator can always be appended.

use std::fmt;

use super::protocol::{SENTENCE_CAPACITY, TRAILER_LEN};

/// Caller-owned buffer for one encode and transmit cycle
#[derive(Clone)]
pub struct SentenceBuffer {
    bytes: [u8; SENTENCE_CAPACITY],
    len: usize,
    truncated: bool,
}

impl SentenceBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self {
            bytes: [0u8; SENTENCE_CAPACITY],
            len: 0,
            truncated: false,
        }
    }

    /// Reset the buffer for the next sentence
    pub fn clear(&mut self) {
        self.len = 0;
        self.truncated = false;
    }

    /// Total capacity in bytes, terminator included
    pub const fn capacity(&self) -> usize {
        SENTENCE_CAPACITY
    }

    /// Number of bytes written so far
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether nothing has been written yet
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether a body write was cut short since the last [`clear`](Self::clear)
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Rendered bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    /// Rendered text
    ///
    /// Writes are only ever cut on character boundaries, so the content is
    /// always valid UTF-8.
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(self.as_bytes()).unwrap_or_default()
    }

    /// Append to the body region, truncating at `capacity - TRAILER_LEN`
    pub(crate) fn push_body(&mut self, s: &str) {
        self.push_bounded(s, SENTENCE_CAPACITY - TRAILER_LEN);
    }

    /// Append to the trailer region, truncating at `capacity`
    pub(crate) fn push_trailer(&mut self, s: &str) {
        self.push_bounded(s, SENTENCE_CAPACITY);
    }

    fn push_bounded(&mut self, s: &str, limit: usize) {
        let room = limit.saturating_sub(self.len);
        let mut take = s.len().min(room);
        while !s.is_char_boundary(take) {
            take -= 1;
        }
        if take < s.len() {
            self.truncated = true;
        }

        self.bytes[self.len..self.len + take].copy_from_slice(&s.as_bytes()[..take]);
        self.len += take;
    }
}

impl Default for SentenceBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SentenceBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SentenceBuffer")
            .field("content", &self.as_str())
            .field("truncated", &self.truncated)
            .finish()
    }
}

/// Body writes through `write!`. Never fails: overflow truncates instead.
impl fmt::Write for SentenceBuffer {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.push_body(s);
        Ok(())
    }
}
