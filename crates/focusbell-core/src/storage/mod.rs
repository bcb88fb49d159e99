mod config;
pub mod database;
mod memory;
mod toml_store;

pub use config::{Config, DefaultsConfig, EngineTuning, LogConfig, StorageBackend, StorageConfig};
pub use database::SqliteSettingsStore;
pub use memory::MemorySettingsStore;
pub use toml_store::TomlSettingsStore;

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SettingsError;
use crate::timer::TimerSettings;

/// Fixed identifier the settings record is stored under.
pub const SETTINGS_KEY: &str = "timer_settings";

/// Persistence for the two timer durations.
///
/// The engine owns one boxed store and only calls it at construction
/// (`load`) and on `UPDATE_SETTINGS` (`save`).
pub trait SettingsStore: Send {
    /// Previously persisted settings, or `None` if nothing was saved yet.
    fn load(&self) -> Result<Option<TimerSettings>, SettingsError>;

    /// Replace the persisted settings.
    fn save(&self, settings: &TimerSettings) -> Result<(), SettingsError>;
}

/// Persisted layout of the settings record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsRecord {
    #[serde(rename = "sessionDuration")]
    pub session_duration: u32,
    #[serde(rename = "intervalDuration")]
    pub interval_duration: u32,
    #[serde(rename = "savedAt", default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
}

impl SettingsRecord {
    pub fn stamped(settings: &TimerSettings) -> Self {
        Self {
            session_duration: settings.session_duration_secs,
            interval_duration: settings.interval_duration_secs,
            saved_at: Some(Utc::now()),
        }
    }

    /// Convert back, rejecting records that no longer validate.
    ///
    /// # Errors
    /// Returns [`SettingsError::Corrupt`] for invalid durations.
    pub fn into_settings(self) -> Result<TimerSettings, SettingsError> {
        TimerSettings::new(self.session_duration, self.interval_duration)
            .map_err(|e| SettingsError::Corrupt(e.to_string()))
    }
}

/// Open the store selected by `backend` in the data directory.
///
/// # Errors
/// Returns an error if the data directory or database cannot be opened.
pub fn open_store(backend: StorageBackend) -> Result<Box<dyn SettingsStore>, SettingsError> {
    let store: Box<dyn SettingsStore> = match backend {
        StorageBackend::Sqlite => Box::new(SqliteSettingsStore::open()?),
        StorageBackend::Toml => Box::new(TomlSettingsStore::new(data_dir()?.join("settings.toml"))),
        StorageBackend::Memory => Box::new(MemorySettingsStore::new()),
    };
    Ok(store)
}

/// Returns `~/.config/focusbell[-dev]/` based on FOCUSBELL_ENV.
///
/// Set FOCUSBELL_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> std::io::Result<PathBuf> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("FOCUSBELL_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("focusbell-dev")
    } else {
        base_dir.join("focusbell")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
