//! Protocol module
//!
//! This module defines the live-channel wire format for Peerchat including:
//! - Outbound events (join, send, leave)
//! - Inbound events (presence snapshot and deltas, messages, notices)
//! - Newline-delimited JSON framing (`{"event": ..., "data": ...}`)
//! - Timestamp decoding (epoch milliseconds or RFC 3339)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Event name constants as they appear on the wire
pub mod names {
    /// Outbound: join the per-peer room
    pub const JOIN_CHAT: &str = "joinChat";
    /// Outbound: send a message to the peer
    pub const SEND_MESSAGE: &str = "sendMessage";
    /// Outbound: leave the per-peer room
    pub const LEAVE_CHAT: &str = "leaveChat";
    /// Inbound: full online-set snapshot
    pub const ONLINE_USERS: &str = "onlineUsers";
    /// Inbound: a user came online
    pub const USER_ONLINE: &str = "userOnline";
    /// Inbound: a user went offline
    pub const USER_OFFLINE: &str = "userOffline";
    /// Inbound: a chat message
    pub const MESSAGE_RECEIVED: &str = "messageReceived";
    /// Inbound: read receipt
    pub const MESSAGES_SEEN: &str = "messagesSeen";
    /// Inbound: server-side error notice
    pub const ERROR_MESSAGE: &str = "errorMessage";
}

/// Events the client emits on the live channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundEvent {
    /// Join the room shared with `peer_id`
    JoinChat {
        /// Conversation peer
        peer_id: String,
    },
    /// Send a text message to `peer_id`
    SendMessage {
        /// Conversation peer
        peer_id: String,
        /// Message text (already trimmed and non-empty)
        text: String,
    },
    /// Leave the room shared with `peer_id`
    LeaveChat {
        /// Conversation peer
        peer_id: String,
    },
}

/// Events the server pushes on the live channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// Authoritative set of online user ids
    OnlineUsers(Vec<String>),
    /// A user came online
    UserOnline {
        /// User that came online
        user_id: String,
    },
    /// A user went offline
    UserOffline {
        /// User that went offline
        user_id: String,
        /// When the user was last seen (epoch ms), if the server supplied it
        last_seen_at: Option<i64>,
    },
    /// A chat message in the joined room
    MessageReceived {
        /// Author of the message
        sender_id: String,
        /// Message text
        text: String,
        /// Server timestamp (epoch ms), if supplied
        created_at: Option<i64>,
        /// Author's display name, if supplied
        first_name: Option<String>,
    },
    /// Read receipt, informational only
    MessagesSeen {
        /// User that has seen the conversation
        seen_by: String,
    },
    /// Non-fatal server notice
    ErrorMessage(String),
    /// Any event name this client does not understand
    Unknown(String),
}

impl InboundEvent {
    /// Wire name of this event
    pub fn name(&self) -> &str {
        match self {
            Self::OnlineUsers(_) => names::ONLINE_USERS,
            Self::UserOnline { .. } => names::USER_ONLINE,
            Self::UserOffline { .. } => names::USER_OFFLINE,
            Self::MessageReceived { .. } => names::MESSAGE_RECEIVED,
            Self::MessagesSeen { .. } => names::MESSAGES_SEEN,
            Self::ErrorMessage(_) => names::ERROR_MESSAGE,
            Self::Unknown(name) => name,
        }
    }
}

/// A single frame on the wire
#[derive(Debug, Serialize, Deserialize)]
struct Frame {
    event: String,
    #[serde(default)]
    data: Value,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PeerPayload<'a> {
    peer_id: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SendPayload<'a> {
    peer_id: &'a str,
    text: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserOnlinePayload {
    user_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserOfflinePayload {
    user_id: String,
    #[serde(default, deserialize_with = "timestamp::deserialize_opt")]
    last_seen_at: Option<i64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageReceivedPayload {
    sender_id: String,
    text: String,
    #[serde(default, deserialize_with = "timestamp::deserialize_opt")]
    created_at: Option<i64>,
    #[serde(default)]
    first_name: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessagesSeenPayload {
    seen_by: String,
}

/// Encode an outbound event as one newline-terminated JSON frame
pub fn encode_frame(event: &OutboundEvent) -> Result<String> {
    let frame = match event {
        OutboundEvent::JoinChat { peer_id } => Frame {
            event: names::JOIN_CHAT.to_string(),
            data: serde_json::to_value(PeerPayload { peer_id })?,
        },
        OutboundEvent::SendMessage { peer_id, text } => Frame {
            event: names::SEND_MESSAGE.to_string(),
            data: serde_json::to_value(SendPayload { peer_id, text })?,
        },
        OutboundEvent::LeaveChat { peer_id } => Frame {
            event: names::LEAVE_CHAT.to_string(),
            data: serde_json::to_value(PeerPayload { peer_id })?,
        },
    };

    let mut line = serde_json::to_string(&frame)?;
    line.push('\n');
    Ok(line)
}

/// Decode one inbound JSON frame (without its trailing newline)
pub fn decode_frame(line: &str) -> Result<InboundEvent> {
    let frame: Frame = serde_json::from_str(line.trim())
        .map_err(|e| Error::Protocol(format!("Malformed frame: {}", e)))?;

    let payload_err =
        |e: serde_json::Error| Error::Protocol(format!("Invalid {} payload: {}", frame.event, e));

    let event = match frame.event.as_str() {
        names::ONLINE_USERS => {
            InboundEvent::OnlineUsers(serde_json::from_value(frame.data.clone()).map_err(payload_err)?)
        }
        names::USER_ONLINE => {
            let p: UserOnlinePayload = serde_json::from_value(frame.data.clone()).map_err(payload_err)?;
            InboundEvent::UserOnline { user_id: p.user_id }
        }
        names::USER_OFFLINE => {
            let p: UserOfflinePayload = serde_json::from_value(frame.data.clone()).map_err(payload_err)?;
            InboundEvent::UserOffline {
                user_id: p.user_id,
                last_seen_at: p.last_seen_at,
            }
        }
        names::MESSAGE_RECEIVED => {
            let p: MessageReceivedPayload =
                serde_json::from_value(frame.data.clone()).map_err(payload_err)?;
            InboundEvent::MessageReceived {
                sender_id: p.sender_id,
                text: p.text,
                created_at: p.created_at,
                first_name: p.first_name,
            }
        }
        names::MESSAGES_SEEN => {
            let p: MessagesSeenPayload = serde_json::from_value(frame.data.clone()).map_err(payload_err)?;
            InboundEvent::MessagesSeen { seen_by: p.seen_by }
        }
        names::ERROR_MESSAGE => match frame.data {
            Value::String(text) => InboundEvent::ErrorMessage(text),
            other => InboundEvent::ErrorMessage(other.to_string()),
        },
        _ => InboundEvent::Unknown(frame.event.clone()),
    };

    Ok(event)
}

/// Timestamp decoding shared by the wire and HTTP payloads
///
/// Servers send either integer epoch milliseconds or RFC 3339 strings; both
/// are normalized to epoch milliseconds.
pub mod timestamp {
    use chrono::DateTime;
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Millis(i64),
        Float(f64),
        Text(String),
    }

    fn normalize<E: serde::de::Error>(raw: Raw) -> Result<i64, E> {
        match raw {
            Raw::Millis(ms) => Ok(ms),
            Raw::Float(ms) => Ok(ms as i64),
            Raw::Text(text) => parse_text(&text).map_err(E::custom),
        }
    }

    /// Parse an RFC 3339 string or a decimal millisecond count
    pub fn parse_text(text: &str) -> Result<i64, String> {
        if let Ok(ms) = text.parse::<i64>() {
            return Ok(ms);
        }
        DateTime::parse_from_rfc3339(text)
            .map(|dt| dt.timestamp_millis())
            .map_err(|e| format!("invalid timestamp {:?}: {}", text, e))
    }

    /// Deserialize a required timestamp
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        normalize(Raw::deserialize(deserializer)?)
    }

    /// Deserialize an optional (nullable) timestamp
    pub fn deserialize_opt<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<i64>, D::Error> {
        match Option::<Raw>::deserialize(deserializer)? {
            Some(raw) => normalize(raw).map(Some),
            None => Ok(None),
        }
    }
}
