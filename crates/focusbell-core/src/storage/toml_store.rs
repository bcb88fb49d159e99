//! Settings kept in a standalone TOML file.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{SettingsRecord, SettingsStore};
use crate::error::SettingsError;
use crate::timer::TimerSettings;

#[derive(Debug, Default, Serialize, Deserialize)]
struct SettingsFile {
    #[serde(default)]
    timer_settings: Option<SettingsRecord>,
}

/// Stores the record as a `[timer_settings]` table.
#[derive(Debug, Clone)]
pub struct TomlSettingsStore {
    path: PathBuf,
}

impl TomlSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for TomlSettingsStore {
    fn load(&self) -> Result<Option<TimerSettings>, SettingsError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(SettingsError::LoadFailed {
                    path: self.path.clone(),
                    message: e.to_string(),
                })
            }
        };
        let file: SettingsFile =
            toml::from_str(&content).map_err(|e| SettingsError::Corrupt(e.to_string()))?;
        file.timer_settings
            .map(SettingsRecord::into_settings)
            .transpose()
    }

    fn save(&self, settings: &TimerSettings) -> Result<(), SettingsError> {
        let save_failed = |message: String| SettingsError::SaveFailed {
            path: self.path.clone(),
            message,
        };
        let file = SettingsFile {
            timer_settings: Some(SettingsRecord::stamped(settings)),
        };
        let content = toml::to_string_pretty(&file).map_err(|e| save_failed(e.to_string()))?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| save_failed(e.to_string()))?;
        }
        std::fs::write(&self.path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }
}
