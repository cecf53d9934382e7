//! Chat controller
//!
//! Orchestrates one conversation view: opens the session, runs the history,
//! profile and last-seen lookups as background tasks, feeds live events into
//! the message store and presence tracker, and reports each state change to
//! the view as an [`Update`].
//!
//! The controller is driven from a single task. Lookups run on spawned tasks
//! and report back through an internal channel; each result carries the
//! generation it was issued under and is discarded when a teardown or peer
//! switch has happened since.

use crate::api::ChatApi;
use crate::message::{Message, PeerProfile};
use crate::presence::PresenceTracker;
use crate::protocol::InboundEvent;
use crate::scroll::{ScrollAnchor, ScrollAnchorController};
use crate::session::{SessionManager, SessionState};
use crate::settings::Settings;
use crate::store::MessageStore;
use crate::transport::Connector;
use crate::{MessagePage, Result};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Why the view should re-render
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateCause {
    /// First history page applied
    InitialLoad,
    /// Older history page prepended
    OlderPrepend,
    /// Live message appended at the tail
    LiveAppend,
    /// Online set or last-seen changed
    Presence,
    /// Peer profile loaded
    Profile,
    /// Something the view may surface to the user (server notice or failed lookup)
    Notice(String),
    /// The live channel ended; no session is open
    Disconnected,
}

/// One state change reported to the view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Update {
    /// What changed
    pub cause: UpdateCause,
    /// Messages added by this update (0 for non-message updates)
    pub count: usize,
}

impl Update {
    fn new(cause: UpdateCause, count: usize) -> Self {
        Self { cause, count }
    }
}

/// Result of a background lookup
#[derive(Debug)]
enum TaskResult {
    Newest(Result<MessagePage>),
    Older(Result<MessagePage>),
    Profile(Result<PeerProfile>),
    LastSeen(Result<Option<i64>>),
}

#[derive(Debug)]
struct TaskOutcome {
    generation: u64,
    peer_id: String,
    result: TaskResult,
}

/// Coordinates session, store, presence and scroll anchoring for one view
pub struct ChatController {
    local_user_id: String,
    api: Arc<dyn ChatApi>,
    session: SessionManager,
    store: MessageStore,
    presence: PresenceTracker,
    scroll: ScrollAnchorController,
    page_size: usize,
    peer_id: Option<String>,
    profile: Option<PeerProfile>,
    generation: u64,
    task_tx: mpsc::UnboundedSender<TaskOutcome>,
    task_rx: mpsc::UnboundedReceiver<TaskOutcome>,
}

impl ChatController {
    /// Create a controller with no open conversation
    pub fn new(
        local_user_id: impl Into<String>,
        connector: Arc<dyn Connector>,
        api: Arc<dyn ChatApi>,
        settings: &Settings,
    ) -> Self {
        let local_user_id = local_user_id.into();
        let (task_tx, task_rx) = mpsc::unbounded_channel();

        Self {
            session: SessionManager::new(connector, local_user_id.clone()),
            local_user_id,
            api,
            store: MessageStore::new(),
            presence: PresenceTracker::new(),
            scroll: ScrollAnchorController::new(settings.bottom_threshold),
            page_size: settings.history_page_size.max(1),
            peer_id: None,
            profile: None,
            generation: 0,
            task_tx,
            task_rx,
        }
    }

    /// Open the conversation with `peer_id`
    ///
    /// Joins the peer's room and starts the newest-page, profile and
    /// last-seen lookups. A transport failure is returned; the lookups are
    /// started regardless so history is visible without a live channel.
    pub async fn open(&mut self, peer_id: &str) -> Result<()> {
        if self.peer_id.as_deref() == Some(peer_id) && self.session.is_active() {
            debug!("Conversation with {} already open", peer_id);
            return Ok(());
        }
        if self.peer_id.is_some() {
            self.teardown().await;
        }

        self.generation += 1;
        self.peer_id = Some(peer_id.to_string());
        self.presence.reset_for_peer(peer_id);
        info!("Opening conversation with {} (generation {})", peer_id, self.generation);

        self.spawn_newest();
        self.spawn_profile();
        self.spawn_last_seen();

        self.session.open(peer_id).await
    }

    /// Close the current conversation and open one with `peer_id`
    pub async fn switch_peer(&mut self, peer_id: &str) -> Result<()> {
        self.teardown().await;
        self.open(peer_id).await
    }

    /// Close the current conversation
    ///
    /// Live handlers are detached first; lookups still in flight complete
    /// on their own and their results are discarded.
    pub async fn teardown(&mut self) {
        self.generation += 1;
        self.session.close().await;
        self.store.reset();
        self.presence.reset();
        self.profile = None;
        if let Some(peer_id) = self.peer_id.take() {
            info!("Conversation with {} torn down", peer_id);
        }
    }

    /// Send `text` to the peer
    ///
    /// Blank text and a missing session are silent no-ops (`Ok(false)`).
    /// The message appears in the list when the server echoes it back.
    pub async fn send(&mut self, text: &str) -> Result<bool> {
        self.session.send(text).await
    }

    /// Request the page before the oldest loaded message
    ///
    /// Returns `false`, issuing nothing, when a load is already in flight,
    /// the history is exhausted, or no conversation is open.
    pub fn load_older(&mut self) -> bool {
        let Some(peer_id) = self.peer_id.clone() else {
            return false;
        };
        let Some(cursor) = self.store.begin_load_older() else {
            return false;
        };

        debug!("Loading messages before {} for {}", cursor.before, peer_id);
        let api = Arc::clone(&self.api);
        let limit = self.page_size;
        self.spawn_task(peer_id.clone(), async move {
            TaskResult::Older(api.history(&peer_id, Some(cursor.before), limit).await)
        });
        true
    }

    /// Wait for and apply the next live event or lookup result
    ///
    /// Events and results that change nothing visible (read receipts,
    /// superseded results) are consumed without returning. Returns `None`
    /// only if the internal task channel closes.
    ///
    /// Cancel-safe: an update is applied and returned in the same poll, so
    /// dropping the future (e.g. on a timeout) loses nothing.
    pub async fn next_update(&mut self) -> Option<Update> {
        loop {
            let input = tokio::select! {
                event = self.session.next_event() => Input::Live(event),
                outcome = self.task_rx.recv() => Input::Task(outcome?),
            };

            let update = match input {
                Input::Live(Some(event)) => self.apply_event(event),
                Input::Live(None) => {
                    self.session.handle_disconnect();
                    Some(Update::new(UpdateCause::Disconnected, 0))
                }
                Input::Task(outcome) => self.apply_outcome(outcome),
            };

            if update.is_some() {
                return update;
            }
        }
    }

    /// Scroll anchor for `update` given the view's distance from the bottom
    pub fn scroll_anchor(&self, update: &Update, distance_from_bottom: u32) -> ScrollAnchor {
        self.scroll.decide(&update.cause, distance_from_bottom)
    }

    /// Messages of the open conversation, oldest first
    pub fn messages(&self) -> &MessageStore {
        &self.store
    }

    /// Local user id
    pub fn local_user_id(&self) -> &str {
        &self.local_user_id
    }

    /// Peer of the open conversation
    pub fn peer_id(&self) -> Option<&str> {
        self.peer_id.as_deref()
    }

    /// Peer profile, once loaded
    pub fn profile(&self) -> Option<&PeerProfile> {
        self.profile.as_ref()
    }

    /// Display name for the peer
    pub fn peer_display_name(&self) -> String {
        let fallback = self.peer_id.as_deref().unwrap_or("");
        match &self.profile {
            Some(profile) => profile.display_name(fallback),
            None => fallback.to_string(),
        }
    }

    /// Whether the peer is online
    pub fn is_peer_online(&self) -> bool {
        self.peer_id
            .as_deref()
            .is_some_and(|peer| self.presence.is_online(peer))
    }

    /// Presence text for the peer ("Online", "Offline", "Last seen ...")
    pub fn last_seen_text(&self) -> String {
        match self.peer_id.as_deref() {
            Some(peer) => self.presence.last_seen_text(peer),
            None => "Offline".to_string(),
        }
    }

    /// Presence tracker of the open conversation
    pub fn presence(&self) -> &PresenceTracker {
        &self.presence
    }

    /// Whether older history may exist
    pub fn has_more(&self) -> bool {
        self.store.has_more()
    }

    /// Whether an older page is in flight
    pub fn is_loading_older(&self) -> bool {
        self.store.is_loading_older()
    }

    /// Session lifecycle state
    pub fn session_state(&self) -> SessionState {
        self.session.state()
    }

    fn apply_event(&mut self, event: InboundEvent) -> Option<Update> {
        match event {
            InboundEvent::OnlineUsers(ids) => {
                self.presence.apply_snapshot(ids);
                self.session.mark_joined();
                Some(Update::new(UpdateCause::Presence, 0))
            }
            InboundEvent::UserOnline { user_id } => {
                self.presence.mark_online(&user_id);
                Some(Update::new(UpdateCause::Presence, 0))
            }
            InboundEvent::UserOffline { user_id, last_seen_at } => {
                let at = last_seen_at.unwrap_or_else(|| Utc::now().timestamp_millis());
                self.presence.mark_offline(&user_id, at);
                Some(Update::new(UpdateCause::Presence, 0))
            }
            InboundEvent::MessageReceived {
                sender_id,
                text,
                created_at,
                ..
            } => {
                let created_at = created_at.unwrap_or_else(|| Utc::now().timestamp_millis());
                self.store.append_live(Message::new(sender_id, text, created_at));
                Some(Update::new(UpdateCause::LiveAppend, 1))
            }
            InboundEvent::MessagesSeen { seen_by } => {
                debug!("Messages seen by {}", seen_by);
                None
            }
            InboundEvent::ErrorMessage(text) => {
                warn!("Server error message: {}", text);
                Some(Update::new(UpdateCause::Notice(text), 0))
            }
            InboundEvent::Unknown(name) => {
                debug!("Ignoring unknown event {}", name);
                None
            }
        }
    }

    fn apply_outcome(&mut self, outcome: TaskOutcome) -> Option<Update> {
        if outcome.generation != self.generation {
            debug!(
                "Discarding stale result for {} (generation {} != {})",
                outcome.peer_id, outcome.generation, self.generation
            );
            return None;
        }

        match outcome.result {
            TaskResult::Newest(Ok(page)) => {
                let count = self.store.apply_newest(page);
                Some(Update::new(UpdateCause::InitialLoad, count))
            }
            TaskResult::Older(Ok(page)) => {
                let count = self.store.complete_older(page);
                Some(Update::new(UpdateCause::OlderPrepend, count))
            }
            TaskResult::Profile(Ok(profile)) => {
                self.profile = Some(profile);
                Some(Update::new(UpdateCause::Profile, 0))
            }
            TaskResult::LastSeen(Ok(Some(at))) => {
                self.presence.seed_last_seen(&outcome.peer_id, at);
                Some(Update::new(UpdateCause::Presence, 0))
            }
            TaskResult::LastSeen(Ok(None)) => None,
            TaskResult::Older(Err(e)) => {
                self.store.fail_older();
                Some(self.fetch_failed("older messages", &outcome.peer_id, e))
            }
            TaskResult::Newest(Err(e)) => Some(self.fetch_failed("messages", &outcome.peer_id, e)),
            TaskResult::Profile(Err(e)) => Some(self.fetch_failed("profile", &outcome.peer_id, e)),
            TaskResult::LastSeen(Err(e)) => Some(self.fetch_failed("last seen", &outcome.peer_id, e)),
        }
    }

    fn fetch_failed(&self, what: &str, peer_id: &str, error: crate::Error) -> Update {
        warn!("Failed to load {} for {}: {}", what, peer_id, error);
        Update::new(UpdateCause::Notice(format!("Could not load {}", what)), 0)
    }

    fn spawn_newest(&self) {
        let Some(peer_id) = self.peer_id.clone() else {
            return;
        };
        let api = Arc::clone(&self.api);
        let limit = self.page_size;
        self.spawn_task(peer_id.clone(), async move {
            TaskResult::Newest(api.history(&peer_id, None, limit).await)
        });
    }

    fn spawn_profile(&self) {
        let Some(peer_id) = self.peer_id.clone() else {
            return;
        };
        let api = Arc::clone(&self.api);
        self.spawn_task(peer_id.clone(), async move {
            TaskResult::Profile(api.profile(&peer_id).await)
        });
    }

    fn spawn_last_seen(&self) {
        let Some(peer_id) = self.peer_id.clone() else {
            return;
        };
        let api = Arc::clone(&self.api);
        self.spawn_task(peer_id.clone(), async move {
            TaskResult::LastSeen(api.last_seen(&peer_id).await)
        });
    }

    fn spawn_task<F>(&self, peer_id: String, task: F)
    where
        F: std::future::Future<Output = TaskResult> + Send + 'static,
    {
        let tx = self.task_tx.clone();
        let generation = self.generation;
        tokio::spawn(async move {
            let result = task.await;
            // The controller may be gone; nothing to report to then.
            let _ = tx.send(TaskOutcome {
                generation,
                peer_id,
                result,
            });
        });
    }
}

enum Input {
    Live(Option<InboundEvent>),
    Task(TaskOutcome),
}
