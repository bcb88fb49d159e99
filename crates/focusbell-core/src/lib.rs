//! # focusbell Core Library
//!
//! A session/interval countdown that stays accurate against wall-clock time.
//! The engine runs isolated from its caller and is reachable only through
//! messages: commands in, state/settings/log events out.
//!
//! ## Architecture
//!
//! - **Timer Engine**: single-threaded state machine with a drift-corrected
//!   tick loop; time comes from an injected [`Clock`], wake-ups from an
//!   injected [`Scheduler`]
//! - **Channel**: tokio task hosting one engine, a JSON wire codec, and a
//!   [`Supervisor`] that keeps one instance alive at a time
//! - **Storage**: pluggable [`SettingsStore`] backends (SQLite, TOML, memory)
//!   and TOML-based application configuration
//!
//! ## Key Components
//!
//! - [`TimerEngine`]: Core timer state machine
//! - [`EngineHandle`]: Caller side of a running engine
//! - [`Command`] / [`Event`]: The message protocol
//! - [`Config`]: Application configuration management

pub mod channel;
pub mod clock;
pub mod error;
pub mod events;
pub mod scheduler;
pub mod simulation;
pub mod storage;
pub mod timer;

pub use channel::{spawn_engine, spawn_engine_with_clock, EngineHandle, Supervisor};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{
    ConfigError, CoreError, ProtocolError, SchedulerError, SettingsError, ValidationError,
};
pub use events::{Command, Event};
pub use scheduler::{ManualScheduler, Scheduler, TickHandle, TokioScheduler};
pub use storage::{
    Config, MemorySettingsStore, SettingsStore, SqliteSettingsStore, StorageBackend,
    TomlSettingsStore,
};
pub use timer::{EngineConfig, SettingsPatch, TimerEngine, TimerPhase, TimerSettings, TimerState};
