mod config;
pub mod database;
mod memory;
pub mod migrations;

pub use config::{Config, RestConfig, StorageConfig, TimingConfig};
pub use database::{Database, WorkoutRecord};
pub use memory::MemoryStore;

use std::path::PathBuf;

use crate::error::{ConfigError, StorageError};

/// String key-value storage shared by the snapshot, mirror and rest timer.
///
/// Implementations must be usable from the runtime task and the host at the
/// same time, hence `Send + Sync`.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Returns `~/.config/repkeeper[-dev]/` based on REPKEEPER_ENV.
///
/// Set REPKEEPER_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("REPKEEPER_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("repkeeper-dev")
    } else {
        base_dir.join("repkeeper")
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
