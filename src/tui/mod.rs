//! TUI (Terminal User Interface) module
//!
//! A terminal conversation view over [`crate::ChatController`], kept apart
//! from the binary so its state handling can be tested without a terminal.

pub mod types;
pub mod screens;
pub mod app;
pub mod ui;

// Re-export main types for convenience
pub use types::InputMode;
pub use screens::ChatViewScreen;
pub use app::App;
