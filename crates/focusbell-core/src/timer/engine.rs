//! Timer engine implementation.
//!
//! The engine is a single-threaded state machine driven by two inputs:
//! caller [`Command`]s and scheduled wake-ups. It owns no thread and never
//! sleeps; it asks its [`Scheduler`] for the next wake-up and is called back
//! with the matching [`TickHandle`].
//!
//! ## Drift correction
//!
//! Every tick compares the clock against the nominal elapsed time
//! (`active_ms + paused_ms + tick`). The difference shortens or lengthens
//! the next wait, floored at `min_delay`. Paused ticks keep accumulating
//! `paused_ms`, so a resumed timer stays on the same phase as before.
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = TimerEngine::new(clock, scheduler, store, EngineConfig::default());
//! let events = engine.handle(Command::Start);
//! // When the scheduler fires:
//! let events = engine.on_wakeup(handle);
//! ```

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use super::settings::{SettingsPatch, TimerSettings};
use super::state::{TimerPhase, TimerState};
use crate::clock::Clock;
use crate::error::SchedulerError;
use crate::events::{Command, Event};
use crate::scheduler::{Scheduler, TickHandle};
use crate::storage::SettingsStore;

/// Static engine parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Used when the settings store has nothing (or fails to load).
    pub defaults: TimerSettings,
    /// Nominal tick period.
    pub tick: Duration,
    /// Lower bound on a corrected delay.
    pub min_delay: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            defaults: TimerSettings::default(),
            tick: Duration::from_millis(1000),
            min_delay: Duration::from_millis(50),
        }
    }
}

/// Bookkeeping for one active tick loop.
#[derive(Debug, Clone, Copy)]
struct RunContext {
    start_ms: u64,
    active_ms: u64,
    paused_ms: u64,
    /// Signed difference between measured and nominal elapsed time at the
    /// last tick.
    correction_ms: i64,
    pending: Option<TickHandle>,
}

impl RunContext {
    fn anchored(start_ms: u64, first: TickHandle) -> Self {
        Self {
            start_ms,
            active_ms: 0,
            paused_ms: 0,
            correction_ms: 0,
            pending: Some(first),
        }
    }
}

/// Core timer engine.
pub struct TimerEngine {
    settings: TimerSettings,
    phase: TimerPhase,
    session_time_left: u32,
    interval_time_left: u32,
    run: Option<RunContext>,
    /// Set once the scheduler refused a wake-up; START is refused afterwards.
    faulted: bool,
    config: EngineConfig,
    clock: Arc<dyn Clock>,
    scheduler: Box<dyn Scheduler>,
    store: Box<dyn SettingsStore>,
    notices: Vec<Event>,
}

impl TimerEngine {
    /// Create an engine in the `Idle` phase.
    ///
    /// Settings come from `store`, falling back to `config.defaults` when the
    /// store is empty, fails, or holds invalid values. Fallbacks caused by
    /// failures are queued as LOG events, see [`TimerEngine::drain_notices`].
    pub fn new(
        clock: Arc<dyn Clock>,
        scheduler: Box<dyn Scheduler>,
        store: Box<dyn SettingsStore>,
        config: EngineConfig,
    ) -> Self {
        let mut notices = Vec::new();
        let settings = match store.load() {
            Ok(Some(settings)) => match settings.validate() {
                Ok(()) => settings,
                Err(e) => {
                    warn!(error = %e, "stored settings invalid, using defaults");
                    notices.push(Event::log(format!(
                        "stored settings invalid ({e}); using defaults"
                    )));
                    config.defaults
                }
            },
            Ok(None) => config.defaults,
            Err(e) => {
                warn!(error = %e, "failed to load settings, using defaults");
                notices.push(Event::log(format!(
                    "failed to load settings ({e}); using defaults"
                )));
                config.defaults
            }
        };

        Self {
            settings,
            phase: TimerPhase::Idle,
            session_time_left: settings.session_duration_secs,
            interval_time_left: settings.interval_duration_secs,
            run: None,
            faulted: false,
            config,
            clock,
            scheduler,
            store,
            notices,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn phase(&self) -> TimerPhase {
        self.phase
    }

    pub fn settings(&self) -> TimerSettings {
        self.settings
    }

    pub fn state(&self) -> TimerState {
        TimerState {
            session_time_left: self.session_time_left,
            interval_time_left: self.interval_time_left,
            is_running: self.phase == TimerPhase::Running,
        }
    }

    /// Whether a tick loop is active (running or paused).
    pub fn has_active_loop(&self) -> bool {
        self.run.is_some()
    }

    pub fn pending_wakeup(&self) -> Option<TickHandle> {
        self.run.and_then(|run| run.pending)
    }

    /// Correction measured at the most recent tick, if a loop is active.
    pub fn last_correction_ms(&self) -> Option<i64> {
        self.run.map(|run| run.correction_ms)
    }

    pub fn is_faulted(&self) -> bool {
        self.faulted
    }

    /// LOG events produced during construction.
    pub fn drain_notices(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.notices)
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Apply one caller command and return the resulting events in order.
    pub fn handle(&mut self, command: Command) -> Vec<Event> {
        debug!(?command, phase = ?self.phase, "handling command");
        match command {
            Command::Start => self.start(),
            Command::Pause => self.pause(),
            Command::Reset => self.reset(),
            Command::UpdateSettings(patch) => self.update_settings(patch),
            Command::GetInitialSettings => self.initial_settings(),
        }
    }

    pub fn start(&mut self) -> Vec<Event> {
        match self.phase {
            TimerPhase::Running => Vec::new(),
            TimerPhase::SessionEnded => {
                vec![Event::log("session already ended; reset before starting again")]
            }
            TimerPhase::Idle | TimerPhase::Paused => {
                if self.faulted {
                    warn!("start refused, scheduler unavailable");
                    return vec![Event::log("start refused: scheduler unavailable")];
                }
                if self.run.is_none() {
                    let now = self.clock.now_ms();
                    match self.scheduler.schedule(self.config.tick) {
                        Ok(first) => self.run = Some(RunContext::anchored(now, first)),
                        Err(e) => return self.fault(e),
                    }
                }
                info!(
                    session_time_left = self.session_time_left,
                    interval_time_left = self.interval_time_left,
                    "timer running"
                );
                self.phase = TimerPhase::Running;
                vec![Event::StateUpdate(self.state())]
            }
        }
    }

    /// Freeze the counters. The tick loop keeps running.
    pub fn pause(&mut self) -> Vec<Event> {
        if self.phase != TimerPhase::Running {
            return Vec::new();
        }
        info!(session_time_left = self.session_time_left, "timer paused");
        self.phase = TimerPhase::Paused;
        vec![Event::StateUpdate(self.state())]
    }

    pub fn reset(&mut self) -> Vec<Event> {
        self.rewind();
        info!("timer reset");
        vec![Event::StateUpdate(self.state())]
    }

    /// Merge, validate, persist, then reset onto the new durations.
    ///
    /// Invalid input leaves everything as it was. A failed save still
    /// applies the settings in memory.
    pub fn update_settings(&mut self, patch: SettingsPatch) -> Vec<Event> {
        let next = match self.settings.apply(&patch) {
            Ok(next) => next,
            Err(e) => {
                warn!(error = %e, ?patch, "settings update rejected");
                return vec![Event::log(format!("settings update rejected: {e}"))];
            }
        };

        let mut events = Vec::new();
        if let Err(e) = self.store.save(&next) {
            warn!(error = %e, "failed to persist settings");
            events.push(Event::log(format!("failed to persist settings: {e}")));
        }

        self.settings = next;
        self.rewind();
        info!(
            session_duration_secs = next.session_duration_secs,
            interval_duration_secs = next.interval_duration_secs,
            "settings updated"
        );
        events.push(Event::SettingsUpdate(self.settings));
        events.push(Event::StateUpdate(self.state()));
        events
    }

    pub fn initial_settings(&self) -> Vec<Event> {
        vec![
            Event::SettingsUpdate(self.settings),
            Event::StateUpdate(self.state()),
        ]
    }

    /// Cancel any pending wake-up. Counters are left as they are.
    pub fn shutdown(&mut self) {
        self.cancel_loop();
    }

    // ── Ticks ────────────────────────────────────────────────────────

    /// Service a wake-up delivered by the scheduler.
    ///
    /// Handles other than the single pending one are stale (cancelled by a
    /// RESET or superseded) and ignored.
    pub fn on_wakeup(&mut self, handle: TickHandle) -> Vec<Event> {
        let now = self.clock.now_ms();
        let tick_ms = duration_ms(self.config.tick);

        let Some(run) = self.run.as_mut() else {
            debug!(handle = handle.id(), "wake-up with no active loop ignored");
            return Vec::new();
        };
        if run.pending != Some(handle) {
            debug!(handle = handle.id(), "stale wake-up ignored");
            return Vec::new();
        }
        run.pending = None;

        let expected = run.active_ms + run.paused_ms + tick_ms;
        let actual = now.saturating_sub(run.start_ms);
        run.correction_ms = signed_diff(actual, expected);

        if self.phase == TimerPhase::Paused {
            run.paused_ms += tick_ms;
            debug!(correction_ms = run.correction_ms, "paused tick");
            return self.reschedule();
        }

        if self.session_time_left == 0 {
            self.run = None;
            self.phase = TimerPhase::SessionEnded;
            return Vec::new();
        }

        run.active_ms += tick_ms;
        let correction_ms = run.correction_ms;
        self.session_time_left -= 1;
        self.interval_time_left = next_interval_left(
            self.interval_time_left,
            self.session_time_left,
            self.settings.interval_duration_secs,
        );
        debug!(
            session_time_left = self.session_time_left,
            interval_time_left = self.interval_time_left,
            correction_ms,
            "tick"
        );

        if self.session_time_left == 0 {
            self.run = None;
            self.phase = TimerPhase::SessionEnded;
            info!("session ended");
            return vec![Event::StateUpdate(self.state())];
        }

        let mut events = vec![Event::StateUpdate(self.state())];
        events.extend(self.reschedule());
        events
    }

    /// Wait before the next tick given the measured correction.
    pub fn corrected_delay(&self, correction_ms: i64) -> Duration {
        let tick = i64::try_from(duration_ms(self.config.tick)).unwrap_or(i64::MAX);
        let floor = i64::try_from(duration_ms(self.config.min_delay)).unwrap_or(0);
        let wait = tick.saturating_sub(correction_ms).max(floor);
        Duration::from_millis(u64::try_from(wait).unwrap_or(0))
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn reschedule(&mut self) -> Vec<Event> {
        let Some(correction_ms) = self.run.map(|run| run.correction_ms) else {
            return Vec::new();
        };
        let delay = self.corrected_delay(correction_ms);
        match self.scheduler.schedule(delay) {
            Ok(handle) => {
                if let Some(run) = self.run.as_mut() {
                    run.pending = Some(handle);
                }
                Vec::new()
            }
            Err(e) => self.fault(e),
        }
    }

    /// Drop the loop and refuse further starts.
    fn fault(&mut self, err: SchedulerError) -> Vec<Event> {
        error!(error = %err, "scheduler failure, engine halted");
        self.cancel_loop();
        self.faulted = true;
        if matches!(self.phase, TimerPhase::Running | TimerPhase::Paused) {
            self.phase = TimerPhase::Idle;
        }
        vec![
            Event::log(format!("timer halted: {err}")),
            Event::StateUpdate(self.state()),
        ]
    }

    fn rewind(&mut self) {
        self.cancel_loop();
        self.phase = TimerPhase::Idle;
        self.session_time_left = self.settings.session_duration_secs;
        self.interval_time_left = self.settings.interval_duration_secs;
    }

    fn cancel_loop(&mut self) {
        if let Some(run) = self.run.take() {
            if let Some(handle) = run.pending {
                self.scheduler.cancel(handle);
            }
        }
    }
}

/// Interval rollover.
///
/// An interval with one second left completes on this tick: a fresh one
/// starts unless the session just ended, in which case the interval ends
/// with it.
pub(crate) fn next_interval_left(left: u32, session_left: u32, interval_secs: u32) -> u32 {
    match left {
        1 if session_left != 0 => interval_secs,
        n => n.saturating_sub(1),
    }
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

fn signed_diff(actual: u64, expected: u64) -> i64 {
    if actual >= expected {
        i64::try_from(actual - expected).unwrap_or(i64::MAX)
    } else {
        i64::try_from(expected - actual).map(|d| -d).unwrap_or(i64::MIN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::scheduler::ManualScheduler;
    use crate::storage::MemorySettingsStore;

    struct Rig {
        clock: ManualClock,
        scheduler: ManualScheduler,
        store: MemorySettingsStore,
        engine: TimerEngine,
    }

    fn rig(session: u32, interval: u32) -> Rig {
        let clock = ManualClock::new(0);
        let scheduler = ManualScheduler::new(clock.clone());
        let store = MemorySettingsStore::with_settings(TimerSettings::new(session, interval).unwrap());
        let engine = TimerEngine::new(
            Arc::new(clock.clone()),
            Box::new(scheduler.clone()),
            Box::new(store.clone()),
            EngineConfig::default(),
        );
        Rig {
            clock,
            scheduler,
            store,
            engine,
        }
    }

    impl Rig {
        /// Fire the next wake-up exactly on time.
        fn fire(&mut self) -> Vec<Event> {
            let next = self.scheduler.pop_next().expect("a pending wake-up");
            self.clock.set(next.due_ms);
            self.engine.on_wakeup(next.handle)
        }
    }

    #[test]
    fn new_engine_is_idle_at_full_duration() {
        let r = rig(10, 3);
        assert_eq!(r.engine.phase(), TimerPhase::Idle);
        assert_eq!(
            r.engine.state(),
            TimerState {
                session_time_left: 10,
                interval_time_left: 3,
                is_running: false
            }
        );
        assert!(!r.engine.has_active_loop());
    }

    #[test]
    fn start_schedules_one_wakeup() {
        let mut r = rig(10, 3);
        let events = r.engine.start();
        assert_eq!(events.len(), 1);
        assert!(events[0].as_state().unwrap().is_running);
        assert_eq!(r.scheduler.pending_count(), 1);
        assert_eq!(r.scheduler.peek_next().unwrap().delay, Duration::from_millis(1000));
    }

    #[test]
    fn start_while_running_is_noop() {
        let mut r = rig(10, 3);
        r.engine.start();
        assert!(r.engine.start().is_empty());
        assert_eq!(r.scheduler.scheduled_total(), 1);
    }

    #[test]
    fn pause_keeps_loop_alive() {
        let mut r = rig(10, 3);
        r.engine.start();
        r.fire();
        let events = r.engine.pause();
        assert!(!events[0].as_state().unwrap().is_running);
        assert_eq!(r.engine.phase(), TimerPhase::Paused);

        assert!(r.fire().is_empty());
        assert!(r.engine.has_active_loop());
        assert_eq!(r.scheduler.pending_count(), 1);
        assert_eq!(r.engine.state().session_time_left, 9);
    }

    #[test]
    fn pause_when_idle_is_noop() {
        let mut r = rig(10, 3);
        assert!(r.engine.pause().is_empty());
        assert_eq!(r.engine.phase(), TimerPhase::Idle);
    }

    #[test]
    fn reset_cancels_pending_wakeup() {
        let mut r = rig(10, 3);
        r.engine.start();
        r.fire();
        let stale = r.engine.pending_wakeup().unwrap();
        r.engine.reset();
        assert_eq!(r.scheduler.pending_count(), 0);
        assert!(r.engine.on_wakeup(stale).is_empty());
        assert_eq!(r.engine.state().session_time_left, 10);
    }

    #[test]
    fn stale_handle_is_ignored_while_running() {
        let mut r = rig(10, 3);
        r.engine.start();
        let events = r.engine.on_wakeup(TickHandle::new(999));
        assert!(events.is_empty());
        assert_eq!(r.engine.state().session_time_left, 10);
    }

    #[test]
    fn session_end_is_terminal() {
        let mut r = rig(2, 1);
        r.engine.start();
        r.fire();
        let last = r.fire();
        assert_eq!(
            last,
            vec![Event::StateUpdate(TimerState {
                session_time_left: 0,
                interval_time_left: 0,
                is_running: false
            })]
        );
        assert_eq!(r.engine.phase(), TimerPhase::SessionEnded);
        assert_eq!(r.scheduler.pending_count(), 0);

        let events = r.engine.start();
        assert!(events[0].is_log());
        assert_eq!(r.engine.phase(), TimerPhase::SessionEnded);
    }

    #[test]
    fn update_settings_persists_and_resets() {
        let mut r = rig(10, 3);
        r.engine.start();
        r.fire();
        let events = r.engine.update_settings(SettingsPatch::full(20, 5));
        assert_eq!(
            events,
            vec![
                Event::SettingsUpdate(TimerSettings::new(20, 5).unwrap()),
                Event::StateUpdate(TimerState {
                    session_time_left: 20,
                    interval_time_left: 5,
                    is_running: false
                }),
            ]
        );
        assert_eq!(r.store.stored(), Some(TimerSettings::new(20, 5).unwrap()));
        assert_eq!(r.scheduler.pending_count(), 0);
    }

    #[test]
    fn invalid_update_keeps_previous_settings() {
        let mut r = rig(10, 3);
        let events = r.engine.update_settings(SettingsPatch::full(5, 30));
        assert_eq!(events.len(), 1);
        assert!(events[0].is_log());
        assert_eq!(r.engine.settings(), TimerSettings::new(10, 3).unwrap());
        assert_eq!(r.store.save_count(), 0);
    }

    #[test]
    fn failed_save_still_applies_settings() {
        let mut r = rig(10, 3);
        r.store.fail_saves(true);
        let events = r.engine.update_settings(SettingsPatch::full(8, 2));
        assert!(events[0].is_log());
        assert_eq!(events[1], Event::SettingsUpdate(TimerSettings::new(8, 2).unwrap()));
        assert_eq!(r.engine.state().session_time_left, 8);
    }

    #[test]
    fn load_failure_falls_back_to_defaults() {
        let clock = ManualClock::new(0);
        let store = MemorySettingsStore::new();
        store.fail_loads(true);
        let mut engine = TimerEngine::new(
            Arc::new(clock.clone()),
            Box::new(ManualScheduler::new(clock)),
            Box::new(store),
            EngineConfig::default(),
        );
        assert_eq!(engine.settings(), TimerSettings::default());
        let notices = engine.drain_notices();
        assert_eq!(notices.len(), 1);
        assert!(notices[0].is_log());
        assert!(engine.drain_notices().is_empty());
    }

    #[test]
    fn empty_store_uses_configured_defaults() {
        let clock = ManualClock::new(0);
        let config = EngineConfig {
            defaults: TimerSettings::new(900, 90).unwrap(),
            ..EngineConfig::default()
        };
        let mut engine = TimerEngine::new(
            Arc::new(clock.clone()),
            Box::new(ManualScheduler::new(clock)),
            Box::new(MemorySettingsStore::new()),
            config,
        );
        assert_eq!(engine.settings(), TimerSettings::new(900, 90).unwrap());
        assert!(engine.drain_notices().is_empty());
    }

    #[test]
    fn unavailable_scheduler_prevents_start() {
        let mut r = rig(10, 3);
        r.scheduler.set_available(false);
        let events = r.engine.start();
        assert!(events[0].is_log());
        assert!(!r.engine.state().is_running);
        assert_eq!(r.engine.phase(), TimerPhase::Idle);
        assert!(r.engine.is_faulted());

        // No retry, even once the facility is back.
        r.scheduler.set_available(true);
        let events = r.engine.start();
        assert!(events[0].is_log());
        assert_eq!(r.scheduler.scheduled_total(), 0);
    }

    #[test]
    fn scheduler_loss_mid_run_halts_engine() {
        let mut r = rig(10, 3);
        r.engine.start();
        r.scheduler.set_available(false);
        let events = r.fire();
        assert_eq!(events[0].as_state().unwrap().session_time_left, 9);
        assert!(events[1].is_log());
        let halted = events[2].as_state().unwrap();
        assert!(!halted.is_running);
        assert_eq!(halted.session_time_left, 9);
        assert_eq!(r.engine.phase(), TimerPhase::Idle);
        assert!(!r.engine.has_active_loop());
    }

    #[test]
    fn corrected_delay_is_floored() {
        let r = rig(10, 3);
        assert_eq!(r.engine.corrected_delay(0), Duration::from_millis(1000));
        assert_eq!(r.engine.corrected_delay(200), Duration::from_millis(800));
        assert_eq!(r.engine.corrected_delay(-100), Duration::from_millis(1100));
        assert_eq!(r.engine.corrected_delay(990), Duration::from_millis(50));
        assert_eq!(r.engine.corrected_delay(60_000), Duration::from_millis(50));
    }

    #[test]
    fn late_tick_shortens_next_wait() {
        let mut r = rig(10, 3);
        r.engine.start();
        let first = r.scheduler.pop_next().unwrap();
        r.clock.set(first.due_ms + 200);
        r.engine.on_wakeup(first.handle);
        assert_eq!(r.engine.last_correction_ms(), Some(200));
        let next = r.scheduler.peek_next().unwrap();
        assert_eq!(next.delay, Duration::from_millis(800));
        assert_eq!(next.due_ms, 2_000);
    }

    #[test]
    fn interval_rollover_rule() {
        assert_eq!(next_interval_left(3, 9, 3), 2);
        assert_eq!(next_interval_left(1, 5, 3), 3);
        assert_eq!(next_interval_left(1, 0, 3), 0);
        assert_eq!(next_interval_left(2, 0, 3), 1);
    }

    #[test]
    fn handle_dispatches_commands() {
        let mut r = rig(10, 3);
        let events = r.engine.handle(Command::GetInitialSettings);
        assert_eq!(events[0], Event::SettingsUpdate(TimerSettings::new(10, 3).unwrap()));
        assert!(events[1].as_state().is_some());
        assert_eq!(r.engine.handle(Command::Start).len(), 1);
        assert_eq!(r.engine.phase(), TimerPhase::Running);
    }
}
