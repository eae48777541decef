//! Throttles how often a streamed reply is flushed to the chat message.
//!
//! Chat APIs rate limit message edits aggressively, so the reply buffer
//! is only flushed when enough new text accumulated or enough time
//! passed since the last flush. Everything here is pure bookkeeping;
//! the caller performs the actual edit with the rendered text.

use std::time::{Duration, Instant};

/// Appended to in-progress renders so the message reads as still being
/// typed.
pub const CURSOR_MARKER: &str = "▌";

/// Stand-in text while the reply is empty, and the final text when the
/// model streams no content at all. An empty message edit would be
/// rejected by the API.
pub const PLACEHOLDER: &str = "…";

#[derive(Debug)]
pub struct EditScheduler {
    buffer: String,
    char_len: usize,
    chars_per_edit: usize,
    min_interval: Duration,
    last_edit: Instant,
    last_edit_len: usize,
}

impl EditScheduler {
    pub fn new(chars_per_edit: usize, min_interval: Duration, now: Instant) -> Self {
        EditScheduler {
            buffer: String::new(),
            char_len: 0,
            // Guard against a zero threshold so the modulo below can't
            // divide by zero
            chars_per_edit: chars_per_edit.max(1),
            min_interval,
            last_edit: now,
            last_edit_len: 0,
        }
    }

    /// Absorb one stream fragment. Returns the text to edit into the
    /// message, cursor marker included, when a flush is due.
    ///
    /// A flush is due when the accumulated character count lands
    /// exactly on a multiple of the threshold, or when more than the
    /// minimum interval elapsed since the last flush. A fragment that
    /// jumps over a multiple without landing on it does not trigger the
    /// size condition. At most one flush is issued per fragment, and
    /// never two flushes for the same buffer length.
    pub fn push(&mut self, fragment: &str, now: Instant) -> Option<String> {
        self.buffer.push_str(fragment);
        self.char_len += fragment.chars().count();

        // Nothing new to show since the last flush
        if self.char_len == self.last_edit_len {
            return None;
        }

        let size_due = self.char_len % self.chars_per_edit == 0;
        let time_due = now.duration_since(self.last_edit) > self.min_interval;
        if !(size_due || time_due) {
            return None;
        }

        self.last_edit = now;
        self.last_edit_len = self.char_len;
        Some(format!("{}{}", self.buffer, CURSOR_MARKER))
    }

    /// The text the message should end on: the full reply without the
    /// cursor marker, or the placeholder when nothing streamed.
    pub fn render_final(&self) -> String {
        if self.buffer.is_empty() {
            PLACEHOLDER.to_string()
        } else {
            self.buffer.clone()
        }
    }

    /// Consume the scheduler and take the raw accumulated reply. Empty
    /// when the stream produced no content.
    pub fn into_text(self) -> String {
        self.buffer
    }
}
