//! TOML-based application configuration.
//!
//! Stores engine tuning:
//! - Rest timer default duration, poll interval and notification text
//! - Debounce windows for persistence and exercise reordering
//! - Storage keys for the session snapshot, agent mirror and rest timer
//!
//! Configuration is stored at `~/.config/repkeeper/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::ConfigError;
use crate::notify::NotificationPayload;

/// Rest timer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestConfig {
    #[serde(default = "default_rest_seconds")]
    pub default_seconds: u64,
    /// Foreground recomputation interval.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_notification_title")]
    pub notification_title: String,
    #[serde(default = "default_notification_body")]
    pub notification_body: String,
}

/// Debounce and tick timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingConfig {
    #[serde(default = "default_persist_debounce_ms")]
    pub persist_debounce_ms: u64,
    #[serde(default = "default_reorder_debounce_ms")]
    pub reorder_debounce_ms: u64,
    #[serde(default = "default_cardio_tick_ms")]
    pub cardio_tick_ms: u64,
}

/// Storage keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_session_key")]
    pub session_key: String,
    #[serde(default = "default_mirror_key")]
    pub mirror_key: String,
    #[serde(default = "default_rest_end_key")]
    pub rest_end_key: String,
    /// Remembered rest duration and paused flag.
    #[serde(default = "default_rest_state_key")]
    pub rest_state_key: String,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/repkeeper/config.toml`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub rest: RestConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

fn default_rest_seconds() -> u64 {
    90
}
fn default_poll_interval_ms() -> u64 {
    100
}
fn default_notification_title() -> String {
    "Rest complete".into()
}
fn default_notification_body() -> String {
    "Time for your next set".into()
}
fn default_persist_debounce_ms() -> u64 {
    200
}
fn default_reorder_debounce_ms() -> u64 {
    300
}
fn default_cardio_tick_ms() -> u64 {
    1000
}
fn default_session_key() -> String {
    "active_workout_session".into()
}
fn default_mirror_key() -> String {
    "agent_workout_mirror".into()
}
fn default_rest_end_key() -> String {
    "rest_timer_end_ms".into()
}
fn default_rest_state_key() -> String {
    "rest_timer_state".into()
}

impl Default for RestConfig {
    fn default() -> Self {
        Self {
            default_seconds: default_rest_seconds(),
            poll_interval_ms: default_poll_interval_ms(),
            notification_title: default_notification_title(),
            notification_body: default_notification_body(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            persist_debounce_ms: default_persist_debounce_ms(),
            reorder_debounce_ms: default_reorder_debounce_ms(),
            cardio_tick_ms: default_cardio_tick_ms(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            session_key: default_session_key(),
            mirror_key: default_mirror_key(),
            rest_end_key: default_rest_end_key(),
            rest_state_key: default_rest_state_key(),
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
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => value
                        .parse::<u64>()
                        .map(|n| serde_json::Value::Number(n.into()))
                        .map_err(|_| invalid(format!("cannot parse '{value}' as a whole number")))?,
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, writing defaults if the file is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
            Err(_) => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
        }
    }

    /// Persist to the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
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

    /// Set a config value by key without saving. Returns error if key is unknown.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value cannot be parsed.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        *self = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Notification payload for rest expiry.
    pub fn rest_payload(&self) -> NotificationPayload {
        NotificationPayload::rest_finished(&self.rest.notification_title, &self.rest.notification_body)
    }
}
