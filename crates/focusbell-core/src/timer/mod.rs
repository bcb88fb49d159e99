mod engine;
mod settings;
mod state;

pub use engine::{EngineConfig, TimerEngine};
pub use settings::{SettingsPatch, TimerSettings};
pub use state::{TimerPhase, TimerState};
