//! HTTP-style lookups the chat core consumes
//!
//! [`ChatApi`] is the seam for history, profile and last-seen lookups.
//! [`HttpChatApi`] implements it over JSON/HTTP with reqwest; tests and
//! other front-ends can supply their own implementation.

use crate::message::{LastSeen, MessagePage, PeerProfile};
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

/// History, profile and last-seen lookups for a conversation peer
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// Fetch up to `limit` messages older than `before` (exclusive), or the
    /// newest page when `before` is `None`
    async fn history(&self, peer_id: &str, before: Option<i64>, limit: usize) -> Result<MessagePage>;

    /// Fetch the peer's public profile
    async fn profile(&self, peer_id: &str) -> Result<PeerProfile>;

    /// Fetch the peer's last-seen time (Unix milliseconds), if recorded
    async fn last_seen(&self, peer_id: &str) -> Result<Option<i64>>;
}

/// [`ChatApi`] over JSON/HTTP
///
/// Endpoints, relative to the base URL:
/// - `GET /chat/{peer}/messages?limit=N[&before=ms]`
/// - `GET /profile/{peer}`
/// - `GET /profile/{peer}/last-seen`
///
/// Session cookies and other authentication belong to the supplied
/// [`Client`]; see [`HttpChatApi::with_client`].
#[derive(Debug, Clone)]
pub struct HttpChatApi {
    client: Client,
    base_url: String,
}

impl HttpChatApi {
    /// Create an API client with a default reqwest client
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    /// Create an API client around a preconfigured reqwest client
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    /// Base URL requests are issued against
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL for `segments` under the base URL, each segment percent-encoded
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| Error::Fetch(format!("Invalid base URL {}: {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| Error::Fetch(format!("Base URL {} cannot take a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str], query: &[(&str, String)]) -> Result<T> {
        let url = self.endpoint(segments)?;
        debug!("GET {}", url);

        let response = self
            .client
            .get(url.clone())
            .query(query)
            .send()
            .await
            .map_err(|e| Error::Fetch(format!("Request to {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            warn!("GET {} returned {}", url, status);
            return Err(Error::Fetch(format!("GET {} returned {}", url, status)));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| Error::Fetch(format!("Invalid response from {}: {}", url, e)))
    }
}

#[async_trait]
impl ChatApi for HttpChatApi {
    async fn history(&self, peer_id: &str, before: Option<i64>, limit: usize) -> Result<MessagePage> {
        let mut query = vec![("limit", limit.to_string())];
        if let Some(before) = before {
            query.push(("before", before.to_string()));
        }
        self.get_json(&["chat", peer_id, "messages"], &query).await
    }

    async fn profile(&self, peer_id: &str) -> Result<PeerProfile> {
        self.get_json(&["profile", peer_id], &[]).await
    }

    async fn last_seen(&self, peer_id: &str) -> Result<Option<i64>> {
        let body: LastSeen = self.get_json(&["profile", peer_id, "last-seen"], &[]).await?;
        Ok(body.last_seen_at)
    }
}
