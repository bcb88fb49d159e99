//! Deterministic simulation harness for the timer engine.
//!
//! Drives a [`TimerEngine`] with a [`ManualClock`] and a
//! [`ManualScheduler`], so tests can fire ticks exactly on time, late, or
//! after a long suspension, and inspect when every event was emitted.

use std::sync::Arc;
use std::time::Duration;

use crate::clock::{Clock, ManualClock};
use crate::events::{Command, Event};
use crate::scheduler::ManualScheduler;
use crate::storage::{MemorySettingsStore, SettingsStore};
use crate::timer::{EngineConfig, TimerEngine, TimerSettings, TimerState};

/// What produced a traced event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceSource {
    Startup,
    Command,
    Tick,
}

/// One emitted event and the clock reading when it was emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceEntry {
    pub at_ms: u64,
    pub source: TraceSource,
    pub event: Event,
}

/// Engine plus manual time, with a full event trace.
pub struct SimulatedHost {
    clock: ManualClock,
    scheduler: ManualScheduler,
    engine: TimerEngine,
    trace: Vec<TraceEntry>,
}

impl SimulatedHost {
    /// Host whose store already holds `settings`.
    pub fn new(settings: TimerSettings) -> Self {
        Self::with_store(
            Box::new(MemorySettingsStore::with_settings(settings)),
            EngineConfig::default(),
        )
    }

    pub fn with_store(store: Box<dyn SettingsStore>, config: EngineConfig) -> Self {
        let clock = ManualClock::new(0);
        let scheduler = ManualScheduler::new(clock.clone());
        let mut engine = TimerEngine::new(
            Arc::new(clock.clone()),
            Box::new(scheduler.clone()),
            store,
            config,
        );
        let notices = engine.drain_notices();
        let mut host = Self {
            clock,
            scheduler,
            engine,
            trace: Vec::new(),
        };
        host.record(TraceSource::Startup, notices);
        host
    }

    pub fn engine(&self) -> &TimerEngine {
        &self.engine
    }

    pub fn clock(&self) -> &ManualClock {
        &self.clock
    }

    pub fn scheduler(&self) -> &ManualScheduler {
        &self.scheduler
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    pub fn trace(&self) -> &[TraceEntry] {
        &self.trace
    }

    /// Send a command at the current clock reading.
    pub fn command(&mut self, command: Command) -> Vec<Event> {
        let events = self.engine.handle(command);
        self.record(TraceSource::Command, events.clone());
        events
    }

    /// Fire the next pending wake-up on time. `None` if nothing is pending.
    pub fn step(&mut self) -> Option<Vec<Event>> {
        self.step_late(Duration::ZERO)
    }

    /// Fire the next pending wake-up `lateness` after it was due, as if the
    /// host had been busy or suspended.
    pub fn step_late(&mut self, lateness: Duration) -> Option<Vec<Event>> {
        let wakeup = self.scheduler.pop_next()?;
        let late_ms = u64::try_from(lateness.as_millis()).unwrap_or(u64::MAX);
        self.clock.set(wakeup.due_ms.saturating_add(late_ms));
        let events = self.engine.on_wakeup(wakeup.handle);
        self.record(TraceSource::Tick, events.clone());
        Some(events)
    }

    /// Let `by` of wall time pass, firing every wake-up that falls due.
    pub fn advance(&mut self, by: Duration) {
        let target = self
            .now_ms()
            .saturating_add(u64::try_from(by.as_millis()).unwrap_or(u64::MAX));
        while let Some(next) = self.scheduler.peek_next() {
            if next.due_ms > target {
                break;
            }
            self.step();
        }
        self.clock.set(target);
    }

    /// Fire wake-ups until none remain or `max_steps` is reached.
    /// Returns the number fired.
    pub fn run_to_completion(&mut self, max_steps: usize) -> usize {
        let mut fired = 0;
        while fired < max_steps && self.step().is_some() {
            fired += 1;
        }
        fired
    }

    /// Every STATE_UPDATE emitted so far with its timestamp.
    pub fn states(&self) -> Vec<(u64, TimerState)> {
        self.trace
            .iter()
            .filter_map(|entry| entry.event.as_state().map(|s| (entry.at_ms, *s)))
            .collect()
    }

    /// STATE_UPDATEs produced by ticks, skipping those caused by commands.
    pub fn tick_states(&self) -> Vec<(u64, TimerState)> {
        self.trace
            .iter()
            .filter(|entry| entry.source == TraceSource::Tick)
            .filter_map(|entry| entry.event.as_state().map(|s| (entry.at_ms, *s)))
            .collect()
    }

    fn record(&mut self, source: TraceSource, events: Vec<Event>) {
        let at_ms = self.now_ms();
        self.trace.extend(events.into_iter().map(|event| TraceEntry {
            at_ms,
            source,
            event,
        }));
    }
}
