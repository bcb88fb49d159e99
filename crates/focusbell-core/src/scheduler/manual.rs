//! Deterministic scheduler for tests and simulations.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use super::{Scheduler, TickHandle};
use crate::clock::{Clock, ManualClock};
use crate::error::SchedulerError;

/// A wake-up waiting in a [`ManualScheduler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingWakeup {
    pub handle: TickHandle,
    /// Clock reading at which the wake-up becomes due.
    pub due_ms: u64,
    /// Delay that was requested.
    pub delay: Duration,
}

#[derive(Debug)]
struct Queue {
    next_id: u64,
    pending: Vec<PendingWakeup>,
    available: bool,
    scheduled_total: usize,
}

/// Scheduler whose wake-ups are fired by the test driving it.
///
/// Clones share one queue, so the driver keeps a clone while the engine
/// owns the boxed original.
#[derive(Debug, Clone)]
pub struct ManualScheduler {
    clock: ManualClock,
    queue: Arc<Mutex<Queue>>,
}

impl ManualScheduler {
    pub fn new(clock: ManualClock) -> Self {
        Self {
            clock,
            queue: Arc::new(Mutex::new(Queue {
                next_id: 1,
                pending: Vec::new(),
                available: true,
                scheduled_total: 0,
            })),
        }
    }

    fn queue(&self) -> MutexGuard<'_, Queue> {
        self.queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Simulate the timer facility disappearing (or coming back).
    pub fn set_available(&self, available: bool) {
        self.queue().available = available;
    }

    pub fn pending(&self) -> Vec<PendingWakeup> {
        self.queue().pending.clone()
    }

    pub fn pending_count(&self) -> usize {
        self.queue().pending.len()
    }

    /// Total number of successful `schedule` calls so far.
    pub fn scheduled_total(&self) -> usize {
        self.queue().scheduled_total
    }

    /// Earliest pending wake-up without removing it.
    pub fn peek_next(&self) -> Option<PendingWakeup> {
        self.queue()
            .pending
            .iter()
            .min_by_key(|w| (w.due_ms, w.handle))
            .copied()
    }

    /// Remove and return the earliest pending wake-up.
    pub fn pop_next(&self) -> Option<PendingWakeup> {
        let mut queue = self.queue();
        let index = queue
            .pending
            .iter()
            .enumerate()
            .min_by_key(|(_, w)| (w.due_ms, w.handle))
            .map(|(i, _)| i)?;
        Some(queue.pending.remove(index))
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&mut self, delay: Duration) -> Result<TickHandle, SchedulerError> {
        let now = self.clock.now_ms();
        let mut queue = self.queue();
        if !queue.available {
            return Err(SchedulerError::Unavailable(
                "manual scheduler disabled".to_string(),
            ));
        }
        let handle = TickHandle::new(queue.next_id);
        queue.next_id += 1;
        queue.scheduled_total += 1;
        let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        queue.pending.push(PendingWakeup {
            handle,
            due_ms: now.saturating_add(delay_ms),
            delay,
        });
        Ok(handle)
    }

    fn cancel(&mut self, handle: TickHandle) {
        self.queue().pending.retain(|w| w.handle != handle);
    }
}
