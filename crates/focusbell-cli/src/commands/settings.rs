use clap::Subcommand;
use focusbell_core::storage::open_store;
use focusbell_core::{Config, StorageBackend, TimerSettings};
use tracing::warn;

#[derive(Subcommand)]
pub enum SettingsAction {
    /// Show the durations a new engine would start with
    Get {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Persist new durations (seconds)
    Set { session: u32, interval: u32 },
    /// Persist the configured defaults
    Reset,
}

pub fn run(action: SettingsAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let defaults = config.engine_config()?.defaults;
    if config.storage.backend == StorageBackend::Memory {
        warn!("storage.backend is \"memory\"; settings do not outlive this process");
    }
    let store = open_store(config.storage.backend)?;

    match action {
        SettingsAction::Get { json } => {
            let settings = store.load()?.unwrap_or(defaults);
            if json {
                println!("{}", serde_json::to_string_pretty(&settings)?);
            } else {
                println!("session:  {}s", settings.session_duration_secs);
                println!("interval: {}s", settings.interval_duration_secs);
            }
        }
        SettingsAction::Set { session, interval } => {
            let settings = TimerSettings::new(session, interval)?;
            store.save(&settings)?;
            println!("ok");
        }
        SettingsAction::Reset => {
            store.save(&defaults)?;
            println!("settings reset to defaults");
        }
    }
    Ok(())
}
