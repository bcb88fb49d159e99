use std::sync::{Arc, Mutex, MutexGuard};

use super::SettingsStore;
use crate::error::SettingsError;
use crate::timer::TimerSettings;

#[derive(Debug, Default)]
struct Slot {
    settings: Option<TimerSettings>,
    fail_load: bool,
    fail_save: bool,
    save_count: usize,
}

/// In-process store. Clones share the same slot.
///
/// Load and save failures can be switched on to exercise the engine's
/// fallback paths.
#[derive(Debug, Clone, Default)]
pub struct MemorySettingsStore {
    slot: Arc<Mutex<Slot>>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: TimerSettings) -> Self {
        let store = Self::new();
        store.slot().settings = Some(settings);
        store
    }

    fn slot(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn fail_loads(&self, fail: bool) {
        self.slot().fail_load = fail;
    }

    pub fn fail_saves(&self, fail: bool) {
        self.slot().fail_save = fail;
    }

    /// Last successfully saved (or seeded) settings.
    pub fn stored(&self) -> Option<TimerSettings> {
        self.slot().settings
    }

    pub fn save_count(&self) -> usize {
        self.slot().save_count
    }
}

impl SettingsStore for MemorySettingsStore {
    fn load(&self) -> Result<Option<TimerSettings>, SettingsError> {
        let slot = self.slot();
        if slot.fail_load {
            return Err(SettingsError::Unavailable("load disabled".to_string()));
        }
        Ok(slot.settings)
    }

    fn save(&self, settings: &TimerSettings) -> Result<(), SettingsError> {
        let mut slot = self.slot();
        if slot.fail_save {
            return Err(SettingsError::Unavailable("save disabled".to_string()));
        }
        slot.settings = Some(*settings);
        slot.save_count += 1;
        Ok(())
    }
}
