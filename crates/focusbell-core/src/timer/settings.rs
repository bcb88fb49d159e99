use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Session and interval lengths, in seconds.
///
/// Serialized with the wire names used by `SETTINGS_UPDATE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerSettings {
    #[serde(rename = "sessionDurationSeconds")]
    pub session_duration_secs: u32,
    #[serde(rename = "intervalDurationSeconds")]
    pub interval_duration_secs: u32,
}

impl TimerSettings {
    pub const DEFAULT_SESSION_SECS: u32 = 1800;
    pub const DEFAULT_INTERVAL_SECS: u32 = 300;

    /// Build validated settings.
    ///
    /// # Errors
    /// See [`TimerSettings::validate`].
    pub fn new(
        session_duration_secs: u32,
        interval_duration_secs: u32,
    ) -> Result<Self, ValidationError> {
        let settings = Self {
            session_duration_secs,
            interval_duration_secs,
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Both durations must be positive and the interval must fit inside
    /// the session.
    ///
    /// # Errors
    /// Returns the first rule that is violated.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.session_duration_secs == 0 {
            return Err(ValidationError::NonPositive {
                field: "sessionDurationSeconds",
                value: 0,
            });
        }
        if self.interval_duration_secs == 0 {
            return Err(ValidationError::NonPositive {
                field: "intervalDurationSeconds",
                value: 0,
            });
        }
        if self.interval_duration_secs > self.session_duration_secs {
            return Err(ValidationError::IntervalExceedsSession {
                interval: self.interval_duration_secs,
                session: self.session_duration_secs,
            });
        }
        Ok(())
    }

    /// Overlay a partial update. Absent fields keep their current value.
    ///
    /// # Errors
    /// Returns a [`ValidationError`] if the merged result is invalid;
    /// `self` is left untouched either way.
    pub fn apply(&self, patch: &SettingsPatch) -> Result<Self, ValidationError> {
        let session = match patch.session_duration_seconds {
            Some(v) => checked_secs("sessionDurationSeconds", v)?,
            None => self.session_duration_secs,
        };
        let interval = match patch.interval_duration_seconds {
            Some(v) => checked_secs("intervalDurationSeconds", v)?,
            None => self.interval_duration_secs,
        };
        Self::new(session, interval)
    }
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            session_duration_secs: Self::DEFAULT_SESSION_SECS,
            interval_duration_secs: Self::DEFAULT_INTERVAL_SECS,
        }
    }
}

/// Payload of `UPDATE_SETTINGS`.
///
/// Fields are signed so that negative input reaches validation as a
/// domain error instead of failing to decode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_duration_seconds: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_duration_seconds: Option<i64>,
}

impl SettingsPatch {
    pub fn full(session_secs: u32, interval_secs: u32) -> Self {
        Self {
            session_duration_seconds: Some(i64::from(session_secs)),
            interval_duration_seconds: Some(i64::from(interval_secs)),
        }
    }
}

impl From<TimerSettings> for SettingsPatch {
    fn from(settings: TimerSettings) -> Self {
        Self::full(settings.session_duration_secs, settings.interval_duration_secs)
    }
}

fn checked_secs(field: &'static str, value: i64) -> Result<u32, ValidationError> {
    if value <= 0 {
        return Err(ValidationError::NonPositive { field, value });
    }
    u32::try_from(value).map_err(|_| ValidationError::OutOfRange {
        field,
        value,
        max: u32::MAX,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let settings = TimerSettings::default();
        assert_eq!(settings.session_duration_secs, 1800);
        assert_eq!(settings.interval_duration_secs, 300);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn rejects_zero_durations() {
        assert!(matches!(
            TimerSettings::new(0, 0),
            Err(ValidationError::NonPositive { field: "sessionDurationSeconds", .. })
        ));
        assert!(matches!(
            TimerSettings::new(60, 0),
            Err(ValidationError::NonPositive { field: "intervalDurationSeconds", .. })
        ));
    }

    #[test]
    fn rejects_interval_longer_than_session() {
        assert_eq!(
            TimerSettings::new(60, 90),
            Err(ValidationError::IntervalExceedsSession {
                interval: 90,
                session: 60
            })
        );
    }

    #[test]
    fn equal_interval_and_session_is_allowed() {
        assert!(TimerSettings::new(60, 60).is_ok());
    }

    #[test]
    fn patch_keeps_absent_fields() {
        let current = TimerSettings::new(600, 60).unwrap();
        let patch = SettingsPatch {
            session_duration_seconds: Some(900),
            interval_duration_seconds: None,
        };
        assert_eq!(current.apply(&patch).unwrap(), TimerSettings::new(900, 60).unwrap());
    }

    #[test]
    fn patch_rejects_negative_and_oversized_values() {
        let current = TimerSettings::default();
        let negative = SettingsPatch {
            session_duration_seconds: Some(-5),
            interval_duration_seconds: None,
        };
        assert!(matches!(
            current.apply(&negative),
            Err(ValidationError::NonPositive { value: -5, .. })
        ));

        let huge = SettingsPatch {
            session_duration_seconds: Some(i64::from(u32::MAX) + 1),
            interval_duration_seconds: None,
        };
        assert!(matches!(
            current.apply(&huge),
            Err(ValidationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn wire_names_are_camel_case() {
        let json = serde_json::to_value(TimerSettings::new(10, 3).unwrap()).unwrap();
        assert_eq!(json["sessionDurationSeconds"], 10);
        assert_eq!(json["intervalDurationSeconds"], 3);
    }
}
