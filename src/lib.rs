//! Peerchat - presence-aware, paginated real-time chat client core
//!
//! This library provides the conversation subsystem of the Peerchat social
//! client: one live channel per open conversation, server-backed message
//! history merged with live arrivals, peer presence with last-seen text, and
//! scroll anchoring decisions for the view that renders it all.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod api;
pub mod controller;
pub mod message;
pub mod presence;
pub mod protocol;
pub mod scroll;
pub mod session;
pub mod settings;
pub mod store;
pub mod transport;
pub mod tui;

#[cfg(test)]
mod tests;

pub use controller::{ChatController, Update, UpdateCause};
pub use message::{Message, MessagePage, PeerProfile};
pub use scroll::ScrollAnchor;
pub use settings::Settings;

/// Result type alias for Peerchat operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Peerchat operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Live channel could not be opened or written to
    #[error("Transport error: {0}")]
    Transport(String),

    /// History, profile or last-seen lookup failed
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// Undecodable live-channel frame
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Settings file could not be read or parsed
    #[error("Config error: {0}")]
    Config(String),

    /// General I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// Whether this error came from the live channel
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_))
    }

    /// Whether this error came from an HTTP-style lookup
    pub fn is_fetch(&self) -> bool {
        matches!(self, Error::Fetch(_) | Error::Http(_))
    }
}

/// Initialize the Peerchat library with logging
pub fn init() {
    tracing_subscriber::fmt::init();
}
