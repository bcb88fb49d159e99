use tracing::info;

use super::{spawn_engine, EngineHandle};
use crate::error::CoreError;
use crate::storage::SettingsStore;
use crate::timer::EngineConfig;

/// Keeps at most one engine instance alive.
///
/// Two live instances for the same logical timer would both decrement the
/// same counters, so every spawn tears the previous instance down first.
#[derive(Debug, Default)]
pub struct Supervisor {
    current: Option<EngineHandle>,
    generation: u64,
}

impl Supervisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current instance with a fresh engine.
    ///
    /// # Errors
    /// Propagates spawn failures; the previous instance is gone either way.
    pub async fn spawn(
        &mut self,
        store: Box<dyn SettingsStore>,
        config: EngineConfig,
    ) -> Result<&mut EngineHandle, CoreError> {
        self.replace_with(|| spawn_engine(store, config)).await
    }

    /// Tear down the current instance, then build a new one with `factory`.
    ///
    /// # Errors
    /// Propagates the factory's error.
    pub async fn replace_with<F>(&mut self, factory: F) -> Result<&mut EngineHandle, CoreError>
    where
        F: FnOnce() -> Result<EngineHandle, CoreError>,
    {
        self.teardown().await;
        let handle = factory()?;
        self.generation += 1;
        info!(generation = self.generation, "engine instance created");
        Ok(self.current.insert(handle))
    }

    /// Stop the current instance, if any.
    pub async fn teardown(&mut self) {
        if let Some(handle) = self.current.take() {
            info!(generation = self.generation, "tearing down engine instance");
            handle.shutdown().await;
        }
    }

    pub fn current(&mut self) -> Option<&mut EngineHandle> {
        self.current.as_mut()
    }

    pub fn is_active(&self) -> bool {
        self.current.is_some()
    }

    /// Number of instances created so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}
