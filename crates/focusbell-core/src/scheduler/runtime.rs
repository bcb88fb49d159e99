//! Tokio-backed scheduler used by the async engine host.

use std::collections::HashMap;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use super::{Scheduler, TickHandle};
use crate::error::SchedulerError;

/// Spawns one sleeping task per wake-up and reports fired handles on a
/// channel. Cancelling aborts the sleeping task.
#[derive(Debug)]
pub struct TokioScheduler {
    runtime: Handle,
    wakeups: mpsc::UnboundedSender<TickHandle>,
    sleepers: HashMap<TickHandle, JoinHandle<()>>,
    next_id: u64,
}

impl TokioScheduler {
    /// Build a scheduler and the receiver its wake-ups arrive on.
    ///
    /// # Errors
    /// Returns [`SchedulerError::Unavailable`] when called outside a tokio
    /// runtime.
    pub fn channel() -> Result<(Self, mpsc::UnboundedReceiver<TickHandle>), SchedulerError> {
        let runtime =
            Handle::try_current().map_err(|e| SchedulerError::Unavailable(e.to_string()))?;
        let (tx, rx) = mpsc::unbounded_channel();
        Ok((
            Self {
                runtime,
                wakeups: tx,
                sleepers: HashMap::new(),
                next_id: 1,
            },
            rx,
        ))
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&mut self, delay: Duration) -> Result<TickHandle, SchedulerError> {
        if self.wakeups.is_closed() {
            return Err(SchedulerError::Unavailable(
                "wake-up receiver dropped".to_string(),
            ));
        }
        self.sleepers.retain(|_, task| !task.is_finished());

        let handle = TickHandle::new(self.next_id);
        self.next_id += 1;
        let tx = self.wakeups.clone();
        let task = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            // Receiver gone means the engine was torn down.
            let _ = tx.send(handle);
        });
        self.sleepers.insert(handle, task);
        Ok(handle)
    }

    fn cancel(&mut self, handle: TickHandle) {
        if let Some(task) = self.sleepers.remove(&handle) {
            debug!(handle = handle.id(), "aborting scheduled wake-up");
            task.abort();
        }
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        for (_, task) in self.sleepers.drain() {
            task.abort();
        }
    }
}
