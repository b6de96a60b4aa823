use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::barrier::{BarrierAttempt, TargetKind};
use crate::timer::{Phase, TimerSettings, TimerStatus};

/// Every state change in the system produces an Event.
/// The host logs them; observers get full snapshots instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    TimerStarted {
        phase: Phase,
        remaining_secs: u64,
        /// Continued from a pause rather than started fresh.
        resumed: bool,
        at: DateTime<Utc>,
    },
    TimerPaused {
        phase: Phase,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerReset {
        phase: Phase,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    /// Countdown reached zero and the cycle moved on.
    PhaseCompleted {
        finished: Phase,
        next: Phase,
        status: TimerStatus,
        completed_pomodoros: u32,
        at: DateTime<Utc>,
    },
    BreakSkipped {
        skipped: Phase,
        status: TimerStatus,
        at: DateTime<Utc>,
    },
    TimerSettingsUpdated {
        settings: TimerSettings,
        /// Current phase duration was re-applied immediately.
        recomputed: bool,
        at: DateTime<Utc>,
    },
    BarrierActivated {
        /// `None` for an open-ended session.
        minutes: Option<u32>,
        at: DateTime<Utc>,
    },
    BarrierDeactivated {
        reason: DeactivationReason,
        at: DateTime<Utc>,
    },
    EmergencyUnlockUsed {
        used_today: u32,
        remaining_today: u32,
        at: DateTime<Utc>,
    },
    AttemptRecorded {
        attempt: BarrierAttempt,
    },
    AttemptsCleared {
        count: usize,
        at: DateTime<Utc>,
    },
    /// The enforcer failed; the attempt is still logged.
    BlockEnforcementFailed {
        kind: TargetKind,
        target: String,
        message: String,
        at: DateTime<Utc>,
    },
    BlocklistChanged {
        kind: TargetKind,
        id: String,
        change: BlocklistChange,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeactivationReason {
    Manual,
    Expired,
    EmergencyUnlock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlocklistChange {
    Added,
    Removed,
    Toggled { is_active: bool },
}
