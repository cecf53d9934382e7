//! Screen state for the chat view

use crate::controller::{Update, UpdateCause};
use crate::scroll::ScrollAnchor;
use crate::tui::types::InputMode;

/// Rows moved by PgUp/PgDn
pub const PAGE_ROWS: usize = 10;

/// Chat view screen state
///
/// Scroll position is kept as rows from the bottom, so prepending older
/// messages leaves the reader where they were without any adjustment.
#[derive(Debug, Clone, Default)]
pub struct ChatViewScreen {
    /// Input buffer
    pub input: String,
    /// What the input buffer is for
    pub mode: InputMode,
    /// Rows between the newest message and the bottom of the viewport
    pub scroll_from_bottom: usize,
    /// Message rows that fit in the viewport
    pub viewport_rows: usize,
    /// Status message
    pub status_message: Option<String>,
}

impl ChatViewScreen {
    /// Create new chat view screen
    pub fn new() -> Self {
        Self::default()
    }

    /// Add character to input
    pub fn add_char(&mut self, c: char) {
        self.input.push(c);
    }

    /// Remove last character from input
    pub fn backspace(&mut self) {
        self.input.pop();
    }

    /// Take the input buffer, leaving it empty
    pub fn take_input(&mut self) -> String {
        std::mem::take(&mut self.input)
    }

    /// Start typing a peer id to switch to
    pub fn begin_switch(&mut self) {
        self.mode = InputMode::SwitchPeer;
        self.input.clear();
    }

    /// Go back to composing messages
    pub fn end_switch(&mut self) {
        self.mode = InputMode::Message;
        self.input.clear();
    }

    /// Largest useful scroll distance for `total` messages
    pub fn max_scroll(&self, total: usize) -> usize {
        total.saturating_sub(self.viewport_rows.max(1))
    }

    /// Scroll toward older messages; returns true once the top is reached
    pub fn scroll_up(&mut self, rows: usize, total: usize) -> bool {
        let max = self.max_scroll(total);
        self.scroll_from_bottom = (self.scroll_from_bottom + rows).min(max);
        self.scroll_from_bottom >= max
    }

    /// Scroll toward newer messages
    pub fn scroll_down(&mut self, rows: usize) {
        self.scroll_from_bottom = self.scroll_from_bottom.saturating_sub(rows);
    }

    /// Jump to the newest message
    pub fn scroll_to_bottom(&mut self) {
        self.scroll_from_bottom = 0;
    }

    /// Apply the anchor chosen for `update`
    pub fn apply_anchor(&mut self, anchor: ScrollAnchor, update: &Update) {
        match anchor {
            ScrollAnchor::Bottom => self.scroll_to_bottom(),
            ScrollAnchor::Preserve => {}
            ScrollAnchor::Suppressed => {
                // Keep the same rows on screen when a message lands below them.
                if update.cause == UpdateCause::LiveAppend {
                    self.scroll_from_bottom += update.count;
                }
            }
        }
    }

    /// Index range of messages visible for `total` messages
    pub fn visible_range(&self, total: usize) -> std::ops::Range<usize> {
        let end = total.saturating_sub(self.scroll_from_bottom.min(self.max_scroll(total)));
        let start = end.saturating_sub(self.viewport_rows.max(1));
        start..end
    }
}
