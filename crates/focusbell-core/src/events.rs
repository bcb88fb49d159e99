use serde::{Deserialize, Serialize};

use crate::timer::{SettingsPatch, TimerSettings, TimerState};

/// Messages from the caller to the engine.
///
/// Wire form: `{"type": "UPDATE_SETTINGS", "payload": {...}}`; unit
/// commands omit `payload`. `UPDATE_SETTINGS` needs a payload object, though
/// both of its fields may be left out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Command {
    Start,
    Pause,
    Reset,
    UpdateSettings(SettingsPatch),
    /// Re-emit current settings and state without mutating anything.
    GetInitialSettings,
}

/// Every observable change in the engine produces an Event.
/// They are delivered in the order the engine performed the mutations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Event {
    StateUpdate(TimerState),
    SettingsUpdate(TimerSettings),
    /// Diagnostic only.
    Log { message: String },
}

impl Event {
    pub fn log(message: impl Into<String>) -> Self {
        Event::Log {
            message: message.into(),
        }
    }

    pub fn as_state(&self) -> Option<&TimerState> {
        match self {
            Event::StateUpdate(state) => Some(state),
            _ => None,
        }
    }

    pub fn as_settings(&self) -> Option<&TimerSettings> {
        match self {
            Event::SettingsUpdate(settings) => Some(settings),
            _ => None,
        }
    }

    pub fn is_log(&self) -> bool {
        matches!(self, Event::Log { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn state_update_uses_wire_field_names() {
        let event = Event::StateUpdate(TimerState {
            session_time_left: 9,
            interval_time_left: 2,
            is_running: true,
        });
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({
                "type": "STATE_UPDATE",
                "payload": { "sessionTimeLeft": 9, "intervalTimeLeft": 2, "isRunning": true }
            })
        );
    }

    #[test]
    fn log_event_carries_message() {
        assert_eq!(
            serde_json::to_value(Event::log("hello")).unwrap(),
            json!({ "type": "LOG", "payload": { "message": "hello" } })
        );
    }

    #[test]
    fn unit_commands_decode_without_payload() {
        let cmd: Command = serde_json::from_value(json!({ "type": "GET_INITIAL_SETTINGS" })).unwrap();
        assert_eq!(cmd, Command::GetInitialSettings);
    }

    #[test]
    fn update_settings_payload_fields_are_optional() {
        let cmd: Command = serde_json::from_value(json!({
            "type": "UPDATE_SETTINGS",
            "payload": { "intervalDurationSeconds": 120 }
        }))
        .unwrap();
        assert_eq!(
            cmd,
            Command::UpdateSettings(SettingsPatch {
                session_duration_seconds: None,
                interval_duration_seconds: Some(120),
            })
        );
    }
}
