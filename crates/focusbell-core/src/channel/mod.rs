//! Message-passing boundary around the engine.
//!
//! [`spawn_engine`] moves a [`TimerEngine`] into its own tokio task. The
//! caller holds an [`EngineHandle`] and never touches engine state: commands
//! go in over one unbounded channel, events come back over another, in the
//! order the engine produced them.

pub mod codec;
mod supervisor;

pub use supervisor::Supervisor;

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::clock::{Clock, SystemClock};
use crate::error::CoreError;
use crate::events::{Command, Event};
use crate::scheduler::TokioScheduler;
use crate::storage::SettingsStore;
use crate::timer::{EngineConfig, TimerEngine};

/// Cloneable command sender, detached from the event stream.
pub type CommandSender = mpsc::UnboundedSender<Command>;

/// Caller side of a running engine instance.
#[derive(Debug)]
pub struct EngineHandle {
    commands: Option<CommandSender>,
    events: mpsc::UnboundedReceiver<Event>,
    task: JoinHandle<()>,
}

/// Start an engine on the current tokio runtime with the system clock.
///
/// # Errors
/// Returns [`CoreError::Scheduler`] when called outside a tokio runtime.
pub fn spawn_engine(
    store: Box<dyn SettingsStore>,
    config: EngineConfig,
) -> Result<EngineHandle, CoreError> {
    spawn_engine_with_clock(Arc::new(SystemClock::new()), store, config)
}

/// Start an engine with an explicit clock.
///
/// # Errors
/// Returns [`CoreError::Scheduler`] when called outside a tokio runtime.
pub fn spawn_engine_with_clock(
    clock: Arc<dyn Clock>,
    store: Box<dyn SettingsStore>,
    config: EngineConfig,
) -> Result<EngineHandle, CoreError> {
    let (scheduler, mut wakeups) = TokioScheduler::channel()?;
    let (command_tx, mut command_rx) = mpsc::unbounded_channel::<Command>();
    let (event_tx, event_rx) = mpsc::unbounded_channel::<Event>();
    let mut engine = TimerEngine::new(clock, Box::new(scheduler), store, config);

    let task = tokio::spawn(async move {
        info!(settings = ?engine.settings(), "engine started");
        let mut outbox = engine.drain_notices();
        loop {
            for event in outbox.drain(..) {
                if event_tx.send(event).is_err() {
                    debug!("event receiver dropped, stopping engine");
                    engine.shutdown();
                    return;
                }
            }
            outbox = tokio::select! {
                // Commands first, so a RESET queued next to a due tick wins.
                biased;
                command = command_rx.recv() => match command {
                    Some(command) => engine.handle(command),
                    None => break,
                },
                Some(handle) = wakeups.recv() => engine.on_wakeup(handle),
            };
        }
        engine.shutdown();
        info!("engine stopped");
    });

    Ok(EngineHandle {
        commands: Some(command_tx),
        events: event_rx,
        task,
    })
}

impl EngineHandle {
    /// Queue a command. Never blocks.
    ///
    /// # Errors
    /// Returns [`CoreError::ChannelClosed`] once the engine is gone or input
    /// was closed.
    pub fn send(&self, command: Command) -> Result<(), CoreError> {
        self.commands
            .as_ref()
            .ok_or(CoreError::ChannelClosed)?
            .send(command)
            .map_err(|_| CoreError::ChannelClosed)
    }

    /// Decode a wire message and queue it.
    ///
    /// # Errors
    /// Returns [`CoreError::Protocol`] for malformed input, or
    /// [`CoreError::ChannelClosed`].
    pub fn send_json(&self, text: &str) -> Result<(), CoreError> {
        let command = codec::decode_command(text)?;
        self.send(command)
    }

    /// A detached sender, e.g. for a separate input task.
    pub fn sender(&self) -> Option<CommandSender> {
        self.commands.clone()
    }

    /// Next event; `None` once the engine has stopped and the queue is drained.
    pub async fn recv(&mut self) -> Option<Event> {
        self.events.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Event> {
        self.events.try_recv().ok()
    }

    /// Stop accepting commands. The engine finishes the queued ones, then
    /// stops once every detached sender is dropped too.
    pub fn close_input(&mut self) {
        self.commands = None;
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Tear the engine down immediately, cancelling any pending wake-up.
    pub async fn shutdown(self) {
        self.task.abort();
        // Cancelled is the expected outcome here.
        let _ = self.task.await;
    }
}
