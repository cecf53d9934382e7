//! UI rendering module

mod chat_view;
mod helpers;

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use crate::tui::app::App;

pub use chat_view::render_chat_view;
pub use helpers::format_clock;

/// Vertical layout of the chat view: header, messages, input, status
pub fn chat_layout(area: Rect) -> std::rc::Rc<[Rect]> {
    Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(3),    // Message history
            Constraint::Length(3), // Input box
            Constraint::Length(1), // Status/Help
        ])
        .split(area)
}

/// Message rows that fit in the history pane for a terminal of `area`
pub fn message_rows(area: Rect) -> usize {
    chat_layout(area)[1].height.saturating_sub(2) as usize
}

/// Main UI rendering function
pub fn ui(f: &mut Frame, app: &App) {
    render_chat_view(f, app);
}
