use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::constants::{defaults, limits, paths, relay};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub relay: RelaySettings,
    pub chat: ChatSettings,
    pub limits: LimitSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelaySettings {
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSettings {
    pub default_language: String,
    pub max_context_messages: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitSettings {
    pub max_requests_per_minute: u32,
    pub max_requests_per_day: u32,
    pub max_language_switches_per_minute: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            relay: RelaySettings {
                base_url: relay::DEFAULT_BASE_URL.to_string(),
                timeout_secs: relay::REQUEST_TIMEOUT_SECS,
            },
            chat: ChatSettings {
                default_language: defaults::LANGUAGE.to_string(),
                max_context_messages: crate::constants::context::MAX_CONTEXT_MESSAGES,
            },
            limits: LimitSettings {
                max_requests_per_minute: limits::MAX_REQUESTS_PER_MINUTE,
                max_requests_per_day: limits::MAX_REQUESTS_PER_DAY,
                max_language_switches_per_minute: limits::MAX_LANGUAGE_SWITCHES_PER_MINUTE,
            },
        }
    }
}

impl Settings {
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(paths::CONFIG_DIR)
            .join(paths::CONFIG_FILE)
    }

    /// Load settings from the config file, falling back to defaults when the
    /// file is missing or malformed.
    pub fn load() -> Self {
        let config_path = Self::config_path();
        if config_path.exists() {
            if let Ok(content) = std::fs::read_to_string(&config_path) {
                if let Ok(config) = toml::from_str(&content) {
                    return config;
                }
            }
        }
        Self::default()
    }

    pub fn save(&self) -> Result<(), crate::error::BuddyError> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::BuddyError::Config(e.to_string()))?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.limits.max_requests_per_minute, 12);
        assert_eq!(settings.limits.max_requests_per_day, 1400);
        assert_eq!(settings.limits.max_language_switches_per_minute, 2);
        assert_eq!(settings.chat.default_language, "en");
        assert_eq!(settings.chat.max_context_messages, 50);
    }

    #[test]
    fn toml_roundtrip() {
        let mut settings = Settings::default();
        settings.relay.base_url = "http://relay.test/api".to_string();
        settings.chat.default_language = "fr".to_string();

        let serialized = toml::to_string_pretty(&settings).unwrap();
        let loaded: Settings = toml::from_str(&serialized).unwrap();

        assert_eq!(loaded.relay.base_url, "http://relay.test/api");
        assert_eq!(loaded.chat.default_language, "fr");
    }
}
