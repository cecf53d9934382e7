//! UI helper functions

use chrono::{DateTime, Local};

/// Format a message timestamp (Unix milliseconds) as local "HH:MM"
pub fn format_clock(created_at: i64) -> String {
    DateTime::from_timestamp_millis(created_at)
        .map(|dt| dt.with_timezone(&Local).format("%H:%M").to_string())
        .unwrap_or_else(|| "--:--".to_string())
}
