//! Presence tracking for the open conversation
//!
//! Keeps the set of online users (seeded by a snapshot, maintained by
//! deltas) and the conversation peer's last-seen time.

use chrono::Utc;
use std::collections::{HashMap, HashSet};
use tracing::debug;

const MINUTE_MS: i64 = 60 * 1000;
const HOUR_MS: i64 = 60 * MINUTE_MS;
const DAY_MS: i64 = 24 * HOUR_MS;
/// Approximate month used by [`format_last_seen`]; not calendar-aware
const MONTH_MS: i64 = 30 * DAY_MS;

/// Online set plus per-peer last-seen timestamps
#[derive(Debug, Default)]
pub struct PresenceTracker {
    /// Conversation peer whose offline transitions are recorded
    peer_id: Option<String>,
    online: HashSet<String>,
    /// Unix milliseconds of the last online-to-offline transition
    last_seen: HashMap<String, i64>,
}

impl PresenceTracker {
    /// Create a tracker with no conversation peer
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a tracker recording last-seen times for `peer_id`
    pub fn for_peer(peer_id: impl Into<String>) -> Self {
        Self {
            peer_id: Some(peer_id.into()),
            ..Self::default()
        }
    }

    /// Conversation peer, if any
    pub fn peer_id(&self) -> Option<&str> {
        self.peer_id.as_deref()
    }

    /// Replace the online set wholesale
    pub fn apply_snapshot<I, S>(&mut self, online_ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.online = online_ids.into_iter().map(Into::into).collect();
        debug!("Presence snapshot: {} online", self.online.len());
    }

    /// Add `peer_id` to the online set
    pub fn mark_online(&mut self, peer_id: &str) {
        self.online.insert(peer_id.to_string());
    }

    /// Remove `peer_id` from the online set
    ///
    /// For the conversation peer, `last_seen_at` is recorded only on an
    /// online-to-offline transition. A call for a peer that is not online
    /// leaves the recorded time unchanged; [`Self::seed_last_seen`] covers a
    /// peer with no transition yet.
    pub fn mark_offline(&mut self, peer_id: &str, last_seen_at: i64) {
        let was_online = self.online.remove(peer_id);

        if self.peer_id.as_deref() != Some(peer_id) {
            return;
        }

        if was_online {
            self.last_seen.insert(peer_id.to_string(), last_seen_at);
        } else {
            debug!("{} was not online, last seen left unchanged", peer_id);
        }
    }

    /// Seed the last-seen time from the external lookup
    ///
    /// A time already recorded from a live transition wins.
    pub fn seed_last_seen(&mut self, peer_id: &str, last_seen_at: i64) {
        self.last_seen.entry(peer_id.to_string()).or_insert(last_seen_at);
    }

    /// Whether `peer_id` is currently online
    pub fn is_online(&self, peer_id: &str) -> bool {
        self.online.contains(peer_id)
    }

    /// Recorded last-seen time of `peer_id` (Unix milliseconds)
    pub fn last_seen_at(&self, peer_id: &str) -> Option<i64> {
        self.last_seen.get(peer_id).copied()
    }

    /// Number of users currently online
    pub fn online_count(&self) -> usize {
        self.online.len()
    }

    /// Presence text for `peer_id` relative to the current time
    pub fn last_seen_text(&self, peer_id: &str) -> String {
        self.last_seen_text_at(peer_id, Utc::now().timestamp_millis())
    }

    /// Presence text for `peer_id` relative to `now_ms`
    pub fn last_seen_text_at(&self, peer_id: &str, now_ms: i64) -> String {
        if self.is_online(peer_id) {
            return "Online".to_string();
        }
        match self.last_seen_at(peer_id) {
            Some(at) => format_last_seen(now_ms - at),
            None => "Offline".to_string(),
        }
    }

    /// Forget everything, including the conversation peer
    pub fn reset(&mut self) {
        self.peer_id = None;
        self.online.clear();
        self.last_seen.clear();
    }

    /// Forget everything and start tracking `peer_id`
    pub fn reset_for_peer(&mut self, peer_id: impl Into<String>) {
        self.reset();
        self.peer_id = Some(peer_id.into());
    }
}

/// Render an elapsed duration as last-seen text
///
/// Floors into the coarsest unit not exceeding the elapsed time, with
/// boundaries at one minute, one hour, one day and thirty days. Negative
/// elapsed values (clock skew) count as "just now".
pub fn format_last_seen(elapsed_ms: i64) -> String {
    if elapsed_ms < MINUTE_MS {
        return "Last seen just now".to_string();
    }

    let (count, unit) = if elapsed_ms < HOUR_MS {
        (elapsed_ms / MINUTE_MS, "minute")
    } else if elapsed_ms < DAY_MS {
        (elapsed_ms / HOUR_MS, "hour")
    } else if elapsed_ms < MONTH_MS {
        (elapsed_ms / DAY_MS, "day")
    } else {
        (elapsed_ms / MONTH_MS, "month")
    };

    let plural = if count > 1 { "s" } else { "" };
    format!("Last seen {} {}{} ago", count, unit, plural)
}
