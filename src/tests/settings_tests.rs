use crate::settings::{ENV_API_URL, ENV_CHANNEL_ADDR, ENV_USER_ID, Settings};
use crate::Error;
use std::collections::HashMap;
use tempfile::TempDir;

#[test]
fn test_settings_default() {
    let settings = Settings::default();
    assert_eq!(settings.api_base_url, "http://localhost:7777");
    assert_eq!(settings.channel_addr, "127.0.0.1:7778");
    assert_eq!(settings.history_page_size, 20);
    assert_eq!(settings.bottom_threshold, 3);
    assert!(settings.local_user_id.is_empty());
    assert!(settings.log_path.is_none());
}

#[test]
fn test_settings_load_missing_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("missing.json");

    assert_eq!(Settings::load(&path).unwrap(), Settings::default());
}

#[test]
fn test_settings_save_and_load() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nested").join("peerchat.json");

    let settings = Settings {
        local_user_id: "me".to_string(),
        history_page_size: 50,
        log_path: Some("/tmp/peerchat.log".to_string()),
        ..Settings::default()
    };
    settings.save(&path).unwrap();

    assert_eq!(Settings::load(&path).unwrap(), settings);
}

#[test]
fn test_settings_partial_file_uses_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("peerchat.json");
    std::fs::write(&path, r#"{"local_user_id":"me","bottom_threshold":8}"#).unwrap();

    let settings = Settings::load(&path).unwrap();
    assert_eq!(settings.local_user_id, "me");
    assert_eq!(settings.bottom_threshold, 8);
    assert_eq!(settings.history_page_size, 20);
    assert_eq!(settings.channel_addr, "127.0.0.1:7778");
}

#[test]
fn test_settings_empty_file_uses_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("peerchat.json");
    std::fs::write(&path, "  \n").unwrap();

    assert_eq!(Settings::load(&path).unwrap(), Settings::default());
}

#[test]
fn test_settings_invalid_json_is_config_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("peerchat.json");
    std::fs::write(&path, "{ not json").unwrap();

    assert!(matches!(Settings::load(&path), Err(Error::Config(_))));
}

#[test]
fn test_settings_overrides() {
    let vars: HashMap<&str, &str> = [
        (ENV_API_URL, "https://chat.example.com"),
        (ENV_USER_ID, "alice"),
        (ENV_CHANNEL_ADDR, ""),
    ]
    .into_iter()
    .collect();

    let mut settings = Settings::default();
    settings.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

    assert_eq!(settings.api_base_url, "https://chat.example.com");
    assert_eq!(settings.local_user_id, "alice");
    // Empty values leave the field alone
    assert_eq!(settings.channel_addr, "127.0.0.1:7778");
}
