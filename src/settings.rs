//! Client configuration

use crate::scroll::DEFAULT_BOTTOM_THRESHOLD;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Environment variable overriding [`Settings::api_base_url`]
pub const ENV_API_URL: &str = "PEERCHAT_API_URL";
/// Environment variable overriding [`Settings::channel_addr`]
pub const ENV_CHANNEL_ADDR: &str = "PEERCHAT_CHANNEL_ADDR";
/// Environment variable overriding [`Settings::local_user_id`]
pub const ENV_USER_ID: &str = "PEERCHAT_USER_ID";

/// Client settings
///
/// Stored as JSON. Missing fields take their defaults, so older files keep
/// loading as fields are added.
///
/// # Example
/// ```rust,no_run
/// use peerchat::Settings;
///
/// // Load settings (returns default if file doesn't exist)
/// let mut settings = Settings::load("peerchat.json").expect("Failed to load");
/// settings.apply_env();
///
/// println!("History from {}", settings.api_base_url);
/// println!("Live channel at {}", settings.channel_addr);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Base URL of the history/profile HTTP API
    pub api_base_url: String,
    /// Address of the live event server ("host:port")
    pub channel_addr: String,
    /// Id of the signed-in user
    pub local_user_id: String,
    /// Messages requested per history page
    pub history_page_size: usize,
    /// Distance from the bottom still treated as following new messages
    pub bottom_threshold: u32,
    /// Where to write logs; logging is off when unset
    pub log_path: Option<String>,
}

impl Settings {
    /// Load settings from a JSON file
    ///
    /// Returns default settings if the file doesn't exist or is empty.
    pub fn load<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Ok(Self::default());
        }

        let data = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read settings: {}", e)))?;

        if data.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_json::from_str(&data).map_err(|e| Error::Config(format!("Failed to parse settings: {}", e)))
    }

    /// Save settings to a JSON file, creating parent directories
    pub fn save<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Config(format!("Failed to create settings directory: {}", e)))?;
        }

        let json = serde_json::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize settings: {}", e)))?;

        std::fs::write(path, json).map_err(|e| Error::Config(format!("Failed to write settings: {}", e)))?;

        Ok(())
    }

    /// Override fields from `PEERCHAT_*` environment variables
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Override fields from any key lookup (environment, CLI, tests)
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.is_empty()) {
            self.api_base_url = url;
        }
        if let Some(addr) = lookup(ENV_CHANNEL_ADDR).filter(|v| !v.is_empty()) {
            self.channel_addr = addr;
        }
        if let Some(user) = lookup(ENV_USER_ID).filter(|v| !v.is_empty()) {
            self.local_user_id = user;
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:7777".to_string(),
            channel_addr: "127.0.0.1:7778".to_string(),
            local_user_id: String::new(),
            history_page_size: 20,
            bottom_threshold: DEFAULT_BOTTOM_THRESHOLD,
            log_path: None,
        }
    }
}
