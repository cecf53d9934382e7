//! Peerchat TUI (Terminal User Interface)
//!
//! A terminal conversation view for Peerchat.
//!
//! Usage: `peerchat-tui [peer_id]`. Settings are read from the file named by
//! `PEERCHAT_CONFIG` (default `peerchat.json`) with `PEERCHAT_*` overrides.

use anyhow::Context;
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use peerchat::api::HttpChatApi;
use peerchat::transport::TcpConnector;
use peerchat::tui::{App, ui};
use peerchat::{ChatController, Settings};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// How long to wait for controller updates between input polls
const UPDATE_POLL: Duration = Duration::from_millis(50);

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::var("PEERCHAT_CONFIG").unwrap_or_else(|_| "peerchat.json".to_string());
    let mut settings = Settings::load(&config_path).with_context(|| format!("loading {}", config_path))?;
    settings.apply_env();

    if let Some(log_path) = &settings.log_path {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)
            .with_context(|| format!("opening log file {}", log_path))?;
        tracing_subscriber::fmt()
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .init();
    }

    let connector = Arc::new(TcpConnector::new(settings.channel_addr.clone()));
    let api = Arc::new(HttpChatApi::new(settings.api_base_url.clone()));
    let controller = ChatController::new(settings.local_user_id.clone(), connector, api, &settings);
    let mut app = App::new(controller);

    if let Some(peer_id) = std::env::args().nth(1) {
        app.open(&peer_id).await;
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app).await;

    app.controller.teardown().await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("Error: {:?}", err);
    }

    Ok(())
}

async fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    loop {
        app.screen.viewport_rows = ui::message_rows(terminal.size()?);
        terminal.draw(|f| ui::ui(f, app))?;

        while event::poll(Duration::ZERO)? {
            if let Event::Key(key) = event::read()? {
                app.handle_key(key).await;
            }
        }

        if app.should_quit {
            return Ok(());
        }

        if let Ok(Some(update)) = tokio::time::timeout(UPDATE_POLL, app.controller.next_update()).await {
            app.apply_update(&update);
        }
    }
}
