//! Session manager
//!
//! Owns the single live channel for the active conversation. A session moves
//! through `Idle -> Joining -> Joined -> Leaving -> Idle`; only one session
//! exists at a time, and switching peers always closes the old session
//! before the new one is opened.

use crate::protocol::{InboundEvent, OutboundEvent};
use crate::transport::{Connector, EventReceiver, LiveChannel};
use crate::Result;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Lifecycle of the session manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No session
    Idle,
    /// Join sent, waiting for the presence snapshot
    Joining,
    /// Presence snapshot received
    Joined,
    /// Handlers detached, channel closing
    Leaving,
}

/// One open conversation with a single peer
pub struct ChatSession {
    /// Session identifier used in logs
    pub id: Uuid,
    /// Local user (read-only identity)
    pub local_user_id: String,
    /// Conversation peer
    pub peer_id: String,
    channel: Box<dyn LiveChannel>,
    events: EventReceiver,
}

impl std::fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("id", &self.id)
            .field("local_user_id", &self.local_user_id)
            .field("peer_id", &self.peer_id)
            .finish_non_exhaustive()
    }
}

/// Opens, switches and closes the live session
pub struct SessionManager {
    connector: Arc<dyn Connector>,
    local_user_id: String,
    state: SessionState,
    session: Option<ChatSession>,
}

impl SessionManager {
    /// Create an idle session manager
    pub fn new(connector: Arc<dyn Connector>, local_user_id: impl Into<String>) -> Self {
        Self {
            connector,
            local_user_id: local_user_id.into(),
            state: SessionState::Idle,
            session: None,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Whether a session is open
    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// Peer of the open session
    pub fn peer_id(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.peer_id.as_str())
    }

    /// The open session
    pub fn session(&self) -> Option<&ChatSession> {
        self.session.as_ref()
    }

    /// Local user this manager joins as
    pub fn local_user_id(&self) -> &str {
        &self.local_user_id
    }

    /// Open a session with `peer_id`
    ///
    /// Reuses the open session when it is already with `peer_id`; otherwise
    /// closes it first. On a transport failure the manager is left idle and
    /// the error is returned; no retry is attempted.
    pub async fn open(&mut self, peer_id: &str) -> Result<()> {
        if self.peer_id() == Some(peer_id) {
            debug!("Session with {} already open, reusing", peer_id);
            return Ok(());
        }
        if self.session.is_some() {
            self.close().await;
        }

        self.state = SessionState::Joining;
        match self.establish(peer_id).await {
            Ok(session) => {
                info!("Session {} joining chat with {}", session.id, peer_id);
                self.session = Some(session);
                Ok(())
            }
            Err(e) => {
                error!("Failed to open session with {}: {}", peer_id, e);
                self.state = SessionState::Idle;
                Err(e)
            }
        }
    }

    async fn establish(&self, peer_id: &str) -> Result<ChatSession> {
        let mut channel = self.connector.connect().await?;

        let events = match channel.subscribe().await {
            Ok(events) => events,
            Err(e) => {
                let _ = channel.close().await;
                return Err(e);
            }
        };

        let join = OutboundEvent::JoinChat {
            peer_id: peer_id.to_string(),
        };
        if let Err(e) = channel.emit(&join).await {
            channel.unsubscribe().await;
            let _ = channel.close().await;
            return Err(e);
        }

        Ok(ChatSession {
            id: Uuid::new_v4(),
            local_user_id: self.local_user_id.clone(),
            peer_id: peer_id.to_string(),
            channel,
            events,
        })
    }

    /// Record that the presence snapshot for the open session arrived
    pub fn mark_joined(&mut self) {
        if self.state == SessionState::Joining && self.session.is_some() {
            self.state = SessionState::Joined;
            debug!("Session joined");
        }
    }

    /// Detach handlers and terminate the channel
    ///
    /// The event receiver is dropped before any I/O, so nothing from the old
    /// session is delivered once this is called. Errors while leaving are
    /// logged, never returned.
    pub async fn close(&mut self) {
        let Some(session) = self.session.take() else {
            self.state = SessionState::Idle;
            return;
        };

        self.state = SessionState::Leaving;
        let ChatSession {
            id,
            peer_id,
            mut channel,
            events,
            ..
        } = session;
        drop(events);
        channel.unsubscribe().await;

        let leave = OutboundEvent::LeaveChat {
            peer_id: peer_id.clone(),
        };
        if let Err(e) = channel.emit(&leave).await {
            debug!("Could not send leave for {}: {}", peer_id, e);
        }
        if let Err(e) = channel.close().await {
            warn!("Error closing session {}: {}", id, e);
        }

        info!("Session {} with {} closed", id, peer_id);
        self.state = SessionState::Idle;
    }

    /// Close then open; never leaves two sessions joined
    pub async fn switch_peer(&mut self, peer_id: &str) -> Result<()> {
        self.close().await;
        self.open(peer_id).await
    }

    /// Send `text` to the peer
    ///
    /// Returns `Ok(false)` without touching the channel when there is no
    /// session or `text` is blank after trimming.
    pub async fn send(&mut self, text: &str) -> Result<bool> {
        let text = text.trim();
        if text.is_empty() {
            debug!("Ignoring blank outgoing message");
            return Ok(false);
        }
        let Some(session) = self.session.as_mut() else {
            debug!("No open session, outgoing message dropped");
            return Ok(false);
        };

        let event = OutboundEvent::SendMessage {
            peer_id: session.peer_id.clone(),
            text: text.to_string(),
        };
        session.channel.emit(&event).await?;
        Ok(true)
    }

    /// Next inbound event of the open session
    ///
    /// Resolves to `None` when the channel ends. Stays pending while no
    /// session is open.
    pub async fn next_event(&mut self) -> Option<InboundEvent> {
        match self.session.as_mut() {
            Some(session) => session.events.recv().await,
            None => std::future::pending().await,
        }
    }

    /// Drop a session whose channel ended underneath it
    ///
    /// Synchronous: the server already hung up, so there is nothing to send.
    /// Dropping the channel releases the connection.
    pub fn handle_disconnect(&mut self) {
        if let Some(session) = self.session.take() {
            warn!("Session {} with {} lost its channel", session.id, session.peer_id);
        }
        self.state = SessionState::Idle;
    }
}
