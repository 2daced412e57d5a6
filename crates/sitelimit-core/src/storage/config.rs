//! TOML-based application configuration.
//!
//! Holds the knobs that are not part of the budget record itself:
//! - The local resource tracked tabs are redirected to while blocked
//! - Notification preferences and wording
//!
//! Configuration is stored at `~/.config/sitelimit/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::data_dir;
use crate::error::ConfigError;

/// Blocking configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockingConfig {
    /// Fixed local resource blocked tabs are sent to.
    #[serde(default = "default_blocked_page")]
    pub page: String,
}

/// Notification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_notification_title")]
    pub title: String,
    #[serde(default = "default_notification_message")]
    pub message: String,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/sitelimit/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub blocking: BlockingConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
}

// Default functions
fn default_blocked_page() -> String {
    "sitelimit://blocked".into()
}
fn default_notification_title() -> String {
    "Website Blocked".into()
}
fn default_notification_message() -> String {
    "Today's budget for tracked sites is used up.".into()
}
fn default_true() -> bool {
    true
}

impl Default for BlockingConfig {
    fn default() -> Self {
        Self {
            page: default_blocked_page(),
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            title: default_notification_title(),
            message: default_notification_message(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            blocking: BlockingConfig::default(),
            notifications: NotificationsConfig::default(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let invalid = |message: &str| ConfigError::InvalidKey {
            key: key.to_string(),
            message: message.to_string(),
        };

        let (parents, leaf) = match key.rsplit_once('.') {
            Some((parents, leaf)) => (Some(parents), leaf),
            None => (None, key),
        };
        if leaf.is_empty() {
            return Err(invalid("config key is empty"));
        }

        let mut current = root;
        if let Some(parents) = parents {
            for part in parents.split('.') {
                current = current
                    .get_mut(part)
                    .ok_or_else(|| invalid("unknown config key"))?;
            }
        }

        let obj = current
            .as_object_mut()
            .ok_or_else(|| invalid("unknown config key"))?;
        let existing = obj.get(leaf).ok_or_else(|| invalid("unknown config key"))?;

        let new_value = match existing {
            serde_json::Value::Bool(_) => serde_json::Value::Bool(
                value
                    .parse::<bool>()
                    .map_err(|_| invalid("expected true or false"))?,
            ),
            serde_json::Value::Number(_) => serde_json::Value::Number(
                value
                    .parse::<u64>()
                    .map(Into::into)
                    .map_err(|_| invalid("expected a non-negative integer"))?,
            ),
            _ => serde_json::Value::String(value.into()),
        };

        obj.insert(leaf.to_string(), new_value);
        Ok(())
    }

    fn path() -> Result<PathBuf, ConfigError> {
        let dir = data_dir().map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Ok(dir.join("config.toml"))
    }

    /// Load from disk or return default.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        match std::fs::read_to_string(&path) {
            Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path,
                message: e.to_string(),
            }),
            Err(_) => {
                let cfg = Self::default();
                cfg.save()?;
                Ok(cfg)
            }
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::path()?;
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::SaveFailed {
            path: path.clone(),
            message: e.to_string(),
        })?;
        std::fs::write(&path, content).map_err(|e| ConfigError::SaveFailed {
            path,
            message: e.to_string(),
        })
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key and persist. Returns error if the key is
    /// unknown or the value cannot be parsed into the field's type.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json =
            serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        *self = serde_json::from_value(json).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        self.save()?;
        Ok(())
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }
}
