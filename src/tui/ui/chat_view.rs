//! Chat view screen rendering

use ratatui::{
    layout::Alignment,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use crate::tui::app::App;
use crate::tui::ui::{chat_layout, format_clock};

/// Renders the screen
pub fn render_chat_view(f: &mut Frame, app: &App) {
    let chunks = chat_layout(f.size());
    let controller = &app.controller;
    let screen = &app.screen;

    // Header - peer name and presence
    let presence_color = if controller.is_peer_online() {
        Color::Green
    } else {
        Color::DarkGray
    };
    let header = match controller.peer_id() {
        Some(_) => Line::from(vec![
            Span::styled(
                controller.peer_display_name(),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ),
            Span::raw("  "),
            Span::styled(controller.last_seen_text(), Style::default().fg(presence_color)),
        ]),
        None => Line::from(Span::styled(
            "No conversation open (Tab to pick a peer)",
            Style::default().fg(Color::DarkGray),
        )),
    };
    let header = Paragraph::new(header)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(header, chunks[0]);

    // Message history
    let store = controller.messages();
    let total = store.len();
    let mut title = format!("Messages ({})", total);
    if controller.is_loading_older() {
        title.push_str(" - loading older...");
    } else if total > 0 && !controller.has_more() {
        title.push_str(" - start of conversation");
    }

    if total == 0 {
        let empty_msg = Paragraph::new("No messages yet. Type a message below and press Enter to send.")
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title(title));
        f.render_widget(empty_msg, chunks[1]);
    } else {
        let range = screen.visible_range(total);
        let me = controller.local_user_id();
        let peer_name = controller.peer_display_name();

        let message_lines: Vec<Line> = store
            .messages()
            .skip(range.start)
            .take(range.len())
            .map(|msg| {
                let is_from_me = msg.is_from(me);
                let sender_label = if is_from_me { "You" } else { peer_name.as_str() };
                let sender_color = if is_from_me { Color::Green } else { Color::Blue };

                Line::from(vec![
                    Span::styled(
                        format!("[{}] ", format_clock(msg.created_at)),
                        Style::default().fg(Color::DarkGray),
                    ),
                    Span::styled(
                        format!("{}: ", sender_label),
                        Style::default().fg(sender_color).add_modifier(Modifier::BOLD),
                    ),
                    Span::styled(msg.text.as_str(), Style::default().fg(Color::White)),
                ])
            })
            .collect();

        let messages_widget =
            Paragraph::new(message_lines).block(Block::default().borders(Borders::ALL).title(title));
        f.render_widget(messages_widget, chunks[1]);
    }

    // Input box
    let input_widget = Paragraph::new(screen.input.as_str())
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL).title(screen.mode.title()));
    f.render_widget(input_widget, chunks[2]);

    // Status/Help
    let help_text = if let Some(status) = &screen.status_message {
        status.clone()
    } else {
        "Enter: Send | Up/PgUp: Older | Down/PgDn/End: Newer | Tab: Switch peer | Esc: Quit".to_string()
    };
    let help = Paragraph::new(help_text)
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center);
    f.render_widget(help, chunks[3]);
}
