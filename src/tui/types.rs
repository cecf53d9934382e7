//! Core types for the chat view

/// What the input box is currently editing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    /// Composing a message to the current peer
    #[default]
    Message,
    /// Typing the id of a peer to switch to
    SwitchPeer,
}

impl InputMode {
    /// Title shown on the input box
    pub fn title(&self) -> &str {
        match self {
            Self::Message => "Type your message",
            Self::SwitchPeer => "Switch to peer id",
        }
    }
}
