//! Application configuration management.
//!
//! This module handles loading and saving the application configuration,
//! which includes the backend URL and the last event operated.
//!
//! Configuration is stored at `~/.config/event-checkin/config.json`.
//! Environment variables take precedence over the file.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::api::DEFAULT_API_URL;

/// Application name used for config directory paths
const APP_NAME: &str = "event-checkin";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Overrides the backend base URL
pub const ENV_API_URL: &str = "CHECKIN_API_URL";

/// Bearer token for the backend, issued by the surrounding application
pub const ENV_API_TOKEN: &str = "CHECKIN_API_TOKEN";

/// Event to open when none is given on the command line
pub const ENV_EVENT_ID: &str = "CHECKIN_EVENT_ID";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    pub api_url: Option<String>,
    pub last_event_id: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    fn load_from(path: &PathBuf) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    fn save_to(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Backend URL: env var, then config file, then the default.
    pub fn api_url(&self) -> String {
        Self::pick(std::env::var(ENV_API_URL).ok(), self.api_url.clone())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
    }

    /// Event id: explicit argument, then env var, then the last one used.
    pub fn event_id(&self, arg: Option<String>) -> Option<String> {
        Self::pick(arg, std::env::var(ENV_EVENT_ID).ok())
            .or_else(|| self.last_event_id.clone())
    }

    pub fn api_token() -> Option<String> {
        std::env::var(ENV_API_TOKEN).ok().filter(|t| !t.trim().is_empty())
    }

    fn pick(first: Option<String>, second: Option<String>) -> Option<String> {
        first
            .filter(|v| !v.trim().is_empty())
            .or_else(|| second.filter(|v| !v.trim().is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pick_prefers_first_non_empty() {
        assert_eq!(
            Config::pick(Some("a".into()), Some("b".into())),
            Some("a".to_string())
        );
        assert_eq!(Config::pick(Some("  ".into()), Some("b".into())), Some("b".to_string()));
        assert_eq!(Config::pick(None, Some("".into())), None);
    }

    #[test]
    fn test_event_id_argument_wins() {
        let config = Config {
            api_url: None,
            last_event_id: Some("OLD".to_string()),
        };
        assert_eq!(config.event_id(Some("E1".to_string())), Some("E1".to_string()));
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = std::env::temp_dir().join(format!("event-checkin-test-{}", std::process::id()));
        let path = dir.join(CONFIG_FILE);
        let config = Config {
            api_url: Some("http://backend:8080/api".to_string()),
            last_event_id: Some("E1".to_string()),
        };
        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), config);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_missing_file_loads_defaults() {
        let path = std::env::temp_dir().join("event-checkin-missing").join(CONFIG_FILE);
        assert_eq!(Config::load_from(&path).unwrap(), Config::default());
    }
}
