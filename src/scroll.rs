//! Scroll anchoring decisions for the message list

use crate::controller::UpdateCause;

/// Default near-bottom distance, in the consumer's scroll units (rows for the TUI)
pub const DEFAULT_BOTTOM_THRESHOLD: u32 = 3;

/// What the view should do with its scroll position after an update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollAnchor {
    /// Scroll to the newest message
    Bottom,
    /// Keep the reader on the same messages; content was prepended
    Preserve,
    /// Leave the scroll position alone
    Suppressed,
}

/// Decides a [`ScrollAnchor`] per update cycle
#[derive(Debug, Clone, Copy)]
pub struct ScrollAnchorController {
    bottom_threshold: u32,
}

impl ScrollAnchorController {
    /// Create a controller with the given near-bottom threshold
    pub fn new(bottom_threshold: u32) -> Self {
        Self { bottom_threshold }
    }

    /// Near-bottom threshold in use
    pub fn bottom_threshold(&self) -> u32 {
        self.bottom_threshold
    }

    /// Whether `distance_from_bottom` counts as following the tail
    pub fn is_near_bottom(&self, distance_from_bottom: u32) -> bool {
        distance_from_bottom <= self.bottom_threshold
    }

    /// Anchor for an update of `cause` seen at `distance_from_bottom`
    pub fn decide(&self, cause: &UpdateCause, distance_from_bottom: u32) -> ScrollAnchor {
        match cause {
            UpdateCause::InitialLoad => ScrollAnchor::Bottom,
            UpdateCause::OlderPrepend => ScrollAnchor::Preserve,
            UpdateCause::LiveAppend if self.is_near_bottom(distance_from_bottom) => ScrollAnchor::Bottom,
            UpdateCause::LiveAppend => ScrollAnchor::Suppressed,
            UpdateCause::Presence
            | UpdateCause::Profile
            | UpdateCause::Notice(_)
            | UpdateCause::Disconnected => ScrollAnchor::Suppressed,
        }
    }
}

impl Default for ScrollAnchorController {
    fn default() -> Self {
        Self::new(DEFAULT_BOTTOM_THRESHOLD)
    }
}
