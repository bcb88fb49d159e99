//! Cancellable one-shot wake-ups.
//!
//! The engine never sleeps itself. It asks a [`Scheduler`] to deliver a
//! [`TickHandle`] after a delay and keeps that handle as its single pending
//! wake-up. Cancelling is synchronous from the engine's point of view: once
//! `cancel` returns, the engine forgets the handle, so a wake-up that was
//! already in flight is recognised as stale and dropped.

mod manual;
mod runtime;

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::SchedulerError;

pub use manual::{ManualScheduler, PendingWakeup};
pub use runtime::TokioScheduler;

/// Identifies one scheduled wake-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TickHandle(u64);

impl TickHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

/// "Call me back after `delay`" primitive.
pub trait Scheduler: Send {
    /// Arrange for `TickHandle` to be delivered once `delay` has passed.
    ///
    /// # Errors
    /// Returns [`SchedulerError::Unavailable`] when no timer facility can
    /// deliver the wake-up. The engine treats this as fatal.
    fn schedule(&mut self, delay: Duration) -> Result<TickHandle, SchedulerError>;

    /// Withdraw a wake-up. Unknown or already-fired handles are ignored.
    fn cancel(&mut self, handle: TickHandle);
}
