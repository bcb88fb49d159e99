use serde::{Deserialize, Serialize};

/// Engine lifecycle phase.
///
/// ```text
/// Idle -> Running <-> Paused
///            |
///            v
///      SessionEnded        (RESET / UPDATE_SETTINGS from anywhere -> Idle)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerPhase {
    /// Nothing scheduled. Counters are at full duration, except after a
    /// scheduler fault, which leaves them where the run stopped.
    Idle,
    Running,
    /// Counters frozen; the tick loop keeps running.
    Paused,
    /// `session_time_left == 0`. Only RESET or UPDATE_SETTINGS leave it.
    SessionEnded,
}

/// Snapshot carried by `STATE_UPDATE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    pub session_time_left: u32,
    pub interval_time_left: u32,
    pub is_running: bool,
}
