// Scripted fakes for the live channel and the HTTP lookups

use crate::api::ChatApi;
use crate::controller::{ChatController, Update, UpdateCause};
use crate::message::{Message, MessagePage, PeerProfile};
use crate::protocol::{InboundEvent, OutboundEvent};
use crate::settings::Settings;
use crate::transport::{Connector, EventReceiver, LiveChannel};
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

type Slot = Arc<Mutex<Option<mpsc::UnboundedSender<InboundEvent>>>>;

/// Test-side view of one fake channel
#[derive(Clone, Default)]
pub struct ChannelHandle {
    emitted: Arc<Mutex<Vec<OutboundEvent>>>,
    closed: Arc<Mutex<bool>>,
    slot: Slot,
}

impl ChannelHandle {
    /// Deliver an inbound event; false if nobody is subscribed
    pub fn push(&self, event: InboundEvent) -> bool {
        match self.slot.lock().unwrap().as_ref() {
            Some(tx) => tx.send(event).is_ok(),
            None => false,
        }
    }

    /// Simulate the server dropping the connection
    pub fn hang_up(&self) {
        self.slot.lock().unwrap().take();
    }

    pub fn emitted(&self) -> Vec<OutboundEvent> {
        self.emitted.lock().unwrap().clone()
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.lock().unwrap()
    }

    pub fn is_subscribed(&self) -> bool {
        self.slot.lock().unwrap().is_some()
    }
}

struct FakeChannel {
    handle: ChannelHandle,
}

#[async_trait]
impl LiveChannel for FakeChannel {
    async fn emit(&mut self, event: &OutboundEvent) -> Result<()> {
        if self.handle.is_closed() {
            return Err(Error::Transport("Channel is closed".to_string()));
        }
        self.handle.emitted.lock().unwrap().push(event.clone());
        Ok(())
    }

    async fn subscribe(&mut self) -> Result<EventReceiver> {
        let mut slot = self.handle.slot.lock().unwrap();
        if slot.is_some() {
            return Err(Error::Transport("Channel already has a subscriber".to_string()));
        }
        let (tx, rx) = mpsc::unbounded_channel();
        *slot = Some(tx);
        Ok(rx)
    }

    async fn unsubscribe(&mut self) {
        self.handle.slot.lock().unwrap().take();
    }

    async fn close(&mut self) -> Result<()> {
        *self.handle.closed.lock().unwrap() = true;
        self.handle.slot.lock().unwrap().take();
        Ok(())
    }
}

// Dropping the channel releases the connection, like the TCP channel does
impl Drop for FakeChannel {
    fn drop(&mut self) {
        *self.handle.closed.lock().unwrap() = true;
        self.handle.slot.lock().unwrap().take();
    }
}

/// Connector handing out fake channels and remembering each one
#[derive(Default)]
pub struct FakeConnector {
    channels: Mutex<Vec<ChannelHandle>>,
    fail: Mutex<bool>,
}

impl FakeConnector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_fail(&self, fail: bool) {
        *self.fail.lock().unwrap() = fail;
    }

    pub fn connections(&self) -> usize {
        self.channels.lock().unwrap().len()
    }

    pub fn channel(&self, index: usize) -> ChannelHandle {
        self.channels.lock().unwrap()[index].clone()
    }

    pub fn last(&self) -> ChannelHandle {
        self.channels
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no channel opened")
    }

    pub fn open_channels(&self) -> usize {
        self.channels
            .lock()
            .unwrap()
            .iter()
            .filter(|c| !c.is_closed())
            .count()
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(&self) -> Result<Box<dyn LiveChannel>> {
        if *self.fail.lock().unwrap() {
            return Err(Error::Transport("connection refused".to_string()));
        }
        let handle = ChannelHandle::default();
        self.channels.lock().unwrap().push(handle.clone());
        Ok(Box::new(FakeChannel { handle }))
    }
}

/// Scripted history/profile/last-seen lookups
#[derive(Default)]
pub struct FakeApi {
    /// Pages keyed by (peer, before)
    pages: Mutex<HashMap<(String, Option<i64>), MessagePage>>,
    profiles: Mutex<HashMap<String, PeerProfile>>,
    last_seen: Mutex<HashMap<String, i64>>,
    delays: Mutex<HashMap<String, Duration>>,
    fail_history: Mutex<bool>,
    history_calls: Mutex<Vec<(String, Option<i64>)>>,
}

impl FakeApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_page(&self, peer: &str, before: Option<i64>, page: MessagePage) {
        self.pages.lock().unwrap().insert((peer.to_string(), before), page);
    }

    pub fn set_profile(&self, peer: &str, first: &str, last: &str) {
        let profile = PeerProfile {
            first_name: first.to_string(),
            last_name: last.to_string(),
            ..PeerProfile::default()
        };
        self.profiles.lock().unwrap().insert(peer.to_string(), profile);
    }

    pub fn set_last_seen(&self, peer: &str, at: i64) {
        self.last_seen.lock().unwrap().insert(peer.to_string(), at);
    }

    /// Delay every lookup for `peer`
    pub fn set_delay(&self, peer: &str, delay: Duration) {
        self.delays.lock().unwrap().insert(peer.to_string(), delay);
    }

    pub fn set_fail_history(&self, fail: bool) {
        *self.fail_history.lock().unwrap() = fail;
    }

    pub fn history_calls(&self) -> Vec<(String, Option<i64>)> {
        self.history_calls.lock().unwrap().clone()
    }

    async fn wait(&self, peer: &str) {
        let delay = self.delays.lock().unwrap().get(peer).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl ChatApi for FakeApi {
    async fn history(&self, peer_id: &str, before: Option<i64>, _limit: usize) -> Result<MessagePage> {
        self.history_calls
            .lock()
            .unwrap()
            .push((peer_id.to_string(), before));
        self.wait(peer_id).await;

        if *self.fail_history.lock().unwrap() {
            return Err(Error::Fetch("history unavailable".to_string()));
        }
        Ok(self
            .pages
            .lock()
            .unwrap()
            .get(&(peer_id.to_string(), before))
            .cloned()
            .unwrap_or_default())
    }

    async fn profile(&self, peer_id: &str) -> Result<PeerProfile> {
        self.wait(peer_id).await;
        self.profiles
            .lock()
            .unwrap()
            .get(peer_id)
            .cloned()
            .ok_or_else(|| Error::Fetch(format!("no profile for {}", peer_id)))
    }

    async fn last_seen(&self, peer_id: &str) -> Result<Option<i64>> {
        self.wait(peer_id).await;
        Ok(self.last_seen.lock().unwrap().get(peer_id).copied())
    }
}

pub fn msg(sender: &str, text: &str, created_at: i64) -> Message {
    Message::new(sender, text, created_at)
}

pub fn page(messages: Vec<Message>, has_more: bool) -> MessagePage {
    MessagePage::new(messages, has_more)
}

pub fn live(sender: &str, text: &str) -> InboundEvent {
    InboundEvent::MessageReceived {
        sender_id: sender.to_string(),
        text: text.to_string(),
        created_at: None,
        first_name: None,
    }
}

pub fn controller(connector: &Arc<FakeConnector>, api: &Arc<FakeApi>) -> ChatController {
    ChatController::new(
        "me",
        connector.clone(),
        api.clone(),
        &Settings::default(),
    )
}

/// Next update, failing the test after a second of silence
pub async fn next_update(controller: &mut ChatController) -> Update {
    tokio::time::timeout(Duration::from_secs(1), controller.next_update())
        .await
        .expect("timed out waiting for update")
        .expect("controller stopped")
}

/// Skip updates until one with a cause matching `wanted`
pub async fn wait_for<F>(controller: &mut ChatController, wanted: F) -> Update
where
    F: Fn(&UpdateCause) -> bool,
{
    for _ in 0..16 {
        let update = next_update(controller).await;
        if wanted(&update.cause) {
            return update;
        }
    }
    panic!("expected update never arrived");
}

/// Assert that no update arrives within `ms` milliseconds
pub async fn assert_quiet(controller: &mut ChatController, ms: u64) {
    let result = tokio::time::timeout(Duration::from_millis(ms), controller.next_update()).await;
    assert!(result.is_err(), "unexpected update: {:?}", result);
}
