//! Message store for the active conversation
//!
//! Holds the ordered message list, the pagination cursor and the merge rules
//! that combine history pages with live arrivals:
//! - the newest page replaces the contents
//! - older pages are prepended in front of what is loaded
//! - live messages are appended at the tail in arrival order
//!
//! No re-sort is ever performed. Each page is trusted to be ascending by
//! `created_at`, and live appends keep arrival order even under clock skew.
//!
//! Loads come in two shapes. [`MessageStore::load_newest`] and
//! [`MessageStore::load_older`] fetch and apply in one call. The
//! `begin_*`/`complete_*` pairs split a load around an externally driven
//! fetch so the controller can run it as a background task and drop the
//! result if the conversation was torn down in the meantime.

use crate::api::ChatApi;
use crate::message::{Message, MessagePage};
use crate::Result;
use std::collections::{VecDeque, vec_deque};
use tracing::{debug, warn};

/// Request for an older history page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OlderCursor {
    /// Exclusive upper bound: the oldest loaded message's `created_at`
    pub before: i64,
}

/// Ordered messages of one conversation plus pagination state
#[derive(Debug, Default)]
pub struct MessageStore {
    messages: VecDeque<Message>,
    has_more: bool,
    loading_older: bool,
    newest_loaded: bool,
    /// Live messages at the tail appended since the last reset or newest page
    live_tail: usize,
}

impl MessageStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages in display order (oldest first)
    pub fn messages(&self) -> vec_deque::Iter<'_, Message> {
        self.messages.iter()
    }

    /// Owned copy of the messages in display order
    pub fn to_vec(&self) -> Vec<Message> {
        self.messages.iter().cloned().collect()
    }

    /// Number of stored messages
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the store holds no messages
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Whether older pages may still exist
    pub fn has_more(&self) -> bool {
        self.has_more
    }

    /// Whether an older-page request is in flight
    pub fn is_loading_older(&self) -> bool {
        self.loading_older
    }

    /// Whether the newest page has been applied since the last reset
    pub fn is_newest_loaded(&self) -> bool {
        self.newest_loaded
    }

    /// `created_at` of the oldest loaded message
    pub fn oldest_created_at(&self) -> Option<i64> {
        self.messages.front().map(|m| m.created_at)
    }

    /// Fetch the newest page and replace the contents
    pub async fn load_newest(&mut self, api: &dyn ChatApi, peer_id: &str, limit: usize) -> Result<usize> {
        let page = api.history(peer_id, None, limit).await?;
        Ok(self.apply_newest(page))
    }

    /// Fetch the page before the oldest loaded message and prepend it
    ///
    /// Returns `Ok(None)` without fetching when a load is already in flight
    /// or the history is exhausted. A failed fetch leaves the contents
    /// untouched and clears the in-flight guard.
    pub async fn load_older(
        &mut self,
        api: &dyn ChatApi,
        peer_id: &str,
        limit: usize,
    ) -> Result<Option<usize>> {
        let Some(cursor) = self.begin_load_older() else {
            return Ok(None);
        };

        match api.history(peer_id, Some(cursor.before), limit).await {
            Ok(page) => Ok(Some(self.complete_older(page))),
            Err(e) => {
                self.fail_older();
                Err(e)
            }
        }
    }

    /// Replace the contents with the newest page
    ///
    /// Live messages appended since the last reset or newest page are kept
    /// at the tail unless the page already carries them. A live message
    /// counts as carried when a page entry near the tail has the same sender
    /// and text; live timestamps are local receive times and are not
    /// compared. Returns the number of messages now stored.
    pub fn apply_newest(&mut self, page: MessagePage) -> usize {
        let live = self.live_tail.min(self.messages.len());
        let live: Vec<Message> = self.messages.drain(self.messages.len() - live..).collect();

        let window = &page.messages[page.messages.len().saturating_sub(live.len())..];
        let mut matched = vec![false; window.len()];
        let mut carried = Vec::with_capacity(live.len());
        for message in live {
            let in_page = window.iter().enumerate().position(|(i, p)| {
                !matched[i] && p.sender_id == message.sender_id && p.text == message.text
            });
            match in_page {
                Some(i) => matched[i] = true,
                None => carried.push(message),
            }
        }

        debug!(
            "Applying newest page: {} messages, has_more={}, {} live carried over",
            page.messages.len(),
            page.has_more,
            carried.len()
        );

        self.messages = page.messages.into();
        self.messages.extend(carried);
        self.has_more = page.has_more;
        self.loading_older = false;
        self.newest_loaded = true;
        self.live_tail = 0;
        self.messages.len()
    }

    /// Mark an older-page load as started
    ///
    /// Returns `None`, changing nothing, when a load is already in flight,
    /// the history is exhausted, or there is no oldest message to page from.
    pub fn begin_load_older(&mut self) -> Option<OlderCursor> {
        if self.loading_older || !self.has_more {
            return None;
        }
        let before = self.oldest_created_at()?;
        self.loading_older = true;
        Some(OlderCursor { before })
    }

    /// Prepend a fetched older page and clear the in-flight guard
    ///
    /// Returns the number of messages prepended.
    pub fn complete_older(&mut self, page: MessagePage) -> usize {
        let count = page.messages.len();
        for message in page.messages.into_iter().rev() {
            self.messages.push_front(message);
        }
        self.has_more = page.has_more;
        self.loading_older = false;
        debug!("Prepended {} older messages, has_more={}", count, self.has_more);
        count
    }

    /// Clear the in-flight guard after a failed older-page fetch
    pub fn fail_older(&mut self) {
        if self.loading_older {
            warn!("Older page load failed; keeping {} loaded messages", self.messages.len());
        }
        self.loading_older = false;
    }

    /// Append a live message at the tail
    pub fn append_live(&mut self, message: Message) {
        if let Some(last) = self.messages.back() {
            if message.created_at < last.created_at {
                debug!(
                    "Live message older than tail ({} < {}), appending in arrival order",
                    message.created_at, last.created_at
                );
            }
        }
        self.messages.push_back(message);
        self.live_tail += 1;
    }

    /// Clear everything, including pagination state
    pub fn reset(&mut self) {
        self.messages.clear();
        self.has_more = false;
        self.loading_older = false;
        self.newest_loaded = false;
        self.live_tail = 0;
    }
}
