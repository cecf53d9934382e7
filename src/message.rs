//! Conversation data model: messages, history pages and peer profiles

use crate::protocol::timestamp;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single chat message
///
/// Equality is structural: two messages with the same sender, text and
/// timestamp compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Author of the message
    pub sender_id: String,
    /// Message text
    pub text: String,
    /// Creation time in Unix milliseconds
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub created_at: i64,
}

impl Message {
    /// Create a new message
    pub fn new(sender_id: impl Into<String>, text: impl Into<String>, created_at: i64) -> Self {
        Self {
            sender_id: sender_id.into(),
            text: text.into(),
            created_at,
        }
    }

    /// Whether this message was written by `user_id`
    pub fn is_from(&self, user_id: &str) -> bool {
        self.sender_id == user_id
    }
}

/// One page of conversation history, oldest first
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePage {
    /// Messages in ascending `created_at` order
    #[serde(default)]
    pub messages: Vec<Message>,
    /// Whether older pages exist; `false` is terminal
    #[serde(default)]
    pub has_more: bool,
}

impl MessagePage {
    /// Create a page from messages
    pub fn new(messages: Vec<Message>, has_more: bool) -> Self {
        Self { messages, has_more }
    }

    /// Timestamp of the oldest message in the page
    pub fn oldest_created_at(&self) -> Option<i64> {
        self.messages.first().map(|m| m.created_at)
    }

    /// Timestamp of the newest message in the page
    pub fn newest_created_at(&self) -> Option<i64> {
        self.messages.last().map(|m| m.created_at)
    }

    /// Number of messages in the page
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the page carries no messages
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Public profile of the conversation peer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerProfile {
    /// Given name
    #[serde(default)]
    pub first_name: String,
    /// Family name
    #[serde(default)]
    pub last_name: String,
    /// Avatar URL
    #[serde(default)]
    pub photo_url: Option<String>,
    /// Any other profile fields the server returns
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PeerProfile {
    /// Full display name, falling back to `fallback` when both names are empty
    pub fn display_name(&self, fallback: &str) -> String {
        let name = format!("{} {}", self.first_name, self.last_name);
        let name = name.trim();
        if name.is_empty() {
            fallback.to_string()
        } else {
            name.to_string()
        }
    }
}

/// Response of the last-seen lookup
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastSeen {
    /// Last time the peer was online (Unix milliseconds), if ever recorded
    #[serde(default, deserialize_with = "timestamp::deserialize_opt")]
    pub last_seen_at: Option<i64>,
}
