use serde::{Deserialize, Serialize};

use super::engine::Phase;
use crate::error::EngineError;

/// Accepted ranges for timer settings.
pub mod constraints {
    pub const FOCUS_MIN: u32 = 1;
    pub const FOCUS_MAX: u32 = 120;
    pub const BREAK_MIN: u32 = 1;
    pub const BREAK_MAX: u32 = 30;
    pub const LONG_BREAK_MIN: u32 = 1;
    pub const LONG_BREAK_MAX: u32 = 60;
    pub const INTERVAL_MIN: u32 = 1;
    pub const INTERVAL_MAX: u32 = 10;
}

/// Durations and auto-start rules for the focus/break cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimerSettings {
    pub focus_minutes: u32,
    pub break_minutes: u32,
    pub long_break_minutes: u32,
    /// A long break follows every Nth completed focus phase.
    pub long_break_interval: u32,
    pub auto_start_breaks: bool,
    pub auto_start_next_focus: bool,
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            focus_minutes: 25,
            break_minutes: 5,
            long_break_minutes: 15,
            long_break_interval: 4,
            auto_start_breaks: true,
            auto_start_next_focus: false,
        }
    }
}

impl TimerSettings {
    /// Duration of `phase` in seconds.
    pub fn duration_secs(&self, phase: Phase) -> u64 {
        let minutes = match phase {
            Phase::Focus => self.focus_minutes,
            Phase::Break => self.break_minutes,
            Phase::LongBreak => self.long_break_minutes,
        };
        u64::from(minutes) * 60
    }

    /// Check every field against [`constraints`].
    pub fn validate(&self) -> Result<(), EngineError> {
        use constraints::*;

        check_range("focus_minutes", self.focus_minutes, FOCUS_MIN, FOCUS_MAX)?;
        check_range("break_minutes", self.break_minutes, BREAK_MIN, BREAK_MAX)?;
        check_range(
            "long_break_minutes",
            self.long_break_minutes,
            LONG_BREAK_MIN,
            LONG_BREAK_MAX,
        )?;
        check_range(
            "long_break_interval",
            self.long_break_interval,
            INTERVAL_MIN,
            INTERVAL_MAX,
        )
    }

    /// Copy of these settings with every field present in `patch` replaced.
    pub fn merged(&self, patch: &SettingsPatch) -> Self {
        Self {
            focus_minutes: patch.focus_minutes.unwrap_or(self.focus_minutes),
            break_minutes: patch.break_minutes.unwrap_or(self.break_minutes),
            long_break_minutes: patch.long_break_minutes.unwrap_or(self.long_break_minutes),
            long_break_interval: patch
                .long_break_interval
                .unwrap_or(self.long_break_interval),
            auto_start_breaks: patch.auto_start_breaks.unwrap_or(self.auto_start_breaks),
            auto_start_next_focus: patch
                .auto_start_next_focus
                .unwrap_or(self.auto_start_next_focus),
        }
    }
}

pub(crate) fn check_range(
    field: &'static str,
    value: u32,
    min: u32,
    max: u32,
) -> Result<(), EngineError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(EngineError::ConfigOutOfRange {
            field,
            value,
            min,
            max,
        })
    }
}

/// Partial settings update. Absent fields keep their current value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focus_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub break_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_break_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_break_interval: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_start_breaks: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_start_next_focus: Option<bool>,
}
