//! Main TUI application state and logic

use crate::controller::{ChatController, Update, UpdateCause};
use crate::tui::screens::{ChatViewScreen, PAGE_ROWS};
use crate::tui::types::InputMode;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// Application state
pub struct App {
    /// Conversation controller
    pub controller: ChatController,
    /// Chat view state
    pub screen: ChatViewScreen,
    /// Should quit
    pub should_quit: bool,
}

impl App {
    /// Create the app around a controller
    pub fn new(controller: ChatController) -> Self {
        Self {
            controller,
            screen: ChatViewScreen::new(),
            should_quit: false,
        }
    }

    /// Open the conversation with `peer_id`
    pub async fn open(&mut self, peer_id: &str) {
        self.screen.scroll_to_bottom();
        self.screen.status_message = Some(format!("Connecting to {}...", peer_id));
        match self.controller.switch_peer(peer_id).await {
            Ok(()) => self.screen.status_message = None,
            Err(e) => self.screen.status_message = Some(format!("Live chat unavailable: {}", e)),
        }
    }

    /// Handle one key press
    pub async fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }

        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true;
            }
            KeyCode::Esc if self.screen.mode == InputMode::SwitchPeer => self.screen.end_switch(),
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Tab => self.screen.begin_switch(),
            KeyCode::Enter => self.submit().await,
            KeyCode::Backspace => self.screen.backspace(),
            KeyCode::Char(c) => self.screen.add_char(c),
            KeyCode::Up => self.scroll_up(1),
            KeyCode::PageUp => self.scroll_up(PAGE_ROWS),
            KeyCode::Down => self.screen.scroll_down(1),
            KeyCode::PageDown => self.screen.scroll_down(PAGE_ROWS),
            KeyCode::End => self.screen.scroll_to_bottom(),
            _ => {}
        }
    }

    /// Apply an update from the controller to the view state
    pub fn apply_update(&mut self, update: &Update) {
        let anchor = self
            .controller
            .scroll_anchor(update, self.screen.scroll_from_bottom as u32);
        self.screen.apply_anchor(anchor, update);

        match &update.cause {
            UpdateCause::Notice(text) => self.screen.status_message = Some(text.clone()),
            UpdateCause::Disconnected => {
                self.screen.status_message = Some("Disconnected from live chat".to_string())
            }
            UpdateCause::OlderPrepend if update.count == 0 => {
                self.screen.status_message = Some("No older messages".to_string())
            }
            UpdateCause::OlderPrepend => self.screen.status_message = None,
            _ => {}
        }
    }

    async fn submit(&mut self) {
        let input = self.screen.take_input();
        match self.screen.mode {
            InputMode::Message => match self.controller.send(&input).await {
                Ok(_) => {}
                Err(e) => {
                    self.screen.status_message = Some(format!("Send failed: {}", e));
                    self.screen.input = input;
                }
            },
            InputMode::SwitchPeer => {
                self.screen.end_switch();
                let peer_id = input.trim();
                if !peer_id.is_empty() {
                    self.open(peer_id).await;
                }
            }
        }
    }

    fn scroll_up(&mut self, rows: usize) {
        let total = self.controller.messages().len();
        let at_top = self.screen.scroll_up(rows, total);
        if at_top && self.controller.load_older() {
            self.screen.status_message = Some("Loading older messages...".to_string());
        }
    }
}
