//! Timer engine implementation.
//!
//! The timer engine is a tick-driven state machine. It does not use
//! internal threads or read the wall clock for its countdown - the caller
//! is responsible for calling `tick()` once per elapsed second.
//!
//! ## State
//!
//! Run-state and cycle position are independent:
//!
//! ```text
//! status: Idle -> Running <-> Paused      (reset: any -> Idle)
//! phase:  Focus -> Break | LongBreak -> Focus -> ...
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = TimerEngine::new(TimerSettings::default());
//! engine.start()?;
//! // Once per second:
//! if let Some(event) = engine.tick() { /* phase completed */ }
//! ```

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::settings::{SettingsPatch, TimerSettings};
use crate::clock::{system_clock, SharedClock};
use crate::error::EngineError;
use crate::events::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerStatus {
    Idle,
    Running,
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Focus,
    Break,
    LongBreak,
}

impl Phase {
    pub fn is_break(self) -> bool {
        matches!(self, Phase::Break | Phase::LongBreak)
    }
}

impl fmt::Display for TimerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TimerStatus::Idle => "idle",
            TimerStatus::Running => "running",
            TimerStatus::Paused => "paused",
        })
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::Focus => "focus",
            Phase::Break => "break",
            Phase::LongBreak => "long_break",
        })
    }
}

/// Read-only view of the timer handed to observers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerSnapshot {
    pub status: TimerStatus,
    pub phase: Phase,
    pub remaining_secs: u64,
    pub initial_duration_secs: u64,
    /// 0.0 .. 1.0 progress within the current phase.
    pub progress: f64,
    pub completed_pomodoros: u32,
    pub total_focused_secs_today: u64,
    pub settings: TimerSettings,
}

/// Core timer engine.
#[derive(Debug, Clone)]
pub struct TimerEngine {
    settings: TimerSettings,
    status: TimerStatus,
    phase: Phase,
    remaining_secs: u64,
    initial_duration_secs: u64,
    completed_pomodoros: u32,
    total_focused_secs_today: u64,
    /// Day the two counters above belong to.
    stats_date: NaiveDate,
    clock: SharedClock,
}

impl TimerEngine {
    /// Create an idle engine at the start of a focus phase.
    pub fn new(settings: TimerSettings) -> Self {
        Self::with_clock(settings, system_clock())
    }

    pub fn with_clock(settings: TimerSettings, clock: SharedClock) -> Self {
        let initial = settings.duration_secs(Phase::Focus);
        Self {
            settings,
            status: TimerStatus::Idle,
            phase: Phase::Focus,
            remaining_secs: initial,
            initial_duration_secs: initial,
            completed_pomodoros: 0,
            total_focused_secs_today: 0,
            stats_date: clock.today(),
            clock,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn status(&self) -> TimerStatus {
        self.status
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    pub fn initial_duration_secs(&self) -> u64 {
        self.initial_duration_secs
    }

    pub fn completed_pomodoros(&self) -> u32 {
        self.completed_pomodoros
    }

    pub fn total_focused_secs_today(&self) -> u64 {
        self.total_focused_secs_today
    }

    pub fn settings(&self) -> &TimerSettings {
        &self.settings
    }

    /// 0.0 .. 1.0 progress within current phase.
    pub fn progress(&self) -> f64 {
        if self.initial_duration_secs == 0 {
            return 0.0;
        }
        1.0 - (self.remaining_secs as f64 / self.initial_duration_secs as f64)
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            status: self.status,
            phase: self.phase,
            remaining_secs: self.remaining_secs,
            initial_duration_secs: self.initial_duration_secs,
            progress: self.progress(),
            completed_pomodoros: self.completed_pomodoros,
            total_focused_secs_today: self.total_focused_secs_today,
            settings: self.settings,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn start(&mut self) -> Result<Event, EngineError> {
        match self.status {
            TimerStatus::Running => Err(EngineError::InvalidTransition {
                command: "start",
                reason: "timer is already running".into(),
            }),
            TimerStatus::Idle | TimerStatus::Paused => {
                let resumed = self.status == TimerStatus::Paused;
                self.status = TimerStatus::Running;
                info!(phase = %self.phase, remaining_secs = self.remaining_secs, resumed, "timer started");
                Ok(Event::TimerStarted {
                    phase: self.phase,
                    remaining_secs: self.remaining_secs,
                    resumed,
                    at: self.clock.now(),
                })
            }
        }
    }

    pub fn pause(&mut self) -> Result<Event, EngineError> {
        if self.status != TimerStatus::Running {
            return Err(EngineError::InvalidTransition {
                command: "pause",
                reason: format!("timer is {}", self.status),
            });
        }
        self.status = TimerStatus::Paused;
        info!(phase = %self.phase, remaining_secs = self.remaining_secs, "timer paused");
        Ok(Event::TimerPaused {
            phase: self.phase,
            remaining_secs: self.remaining_secs,
            at: self.clock.now(),
        })
    }

    /// Back to idle with the full duration of the current phase.
    /// The phase itself is kept.
    pub fn reset(&mut self) -> Event {
        self.status = TimerStatus::Idle;
        self.remaining_secs = self.initial_duration_secs;
        info!(phase = %self.phase, "timer reset");
        Event::TimerReset {
            phase: self.phase,
            remaining_secs: self.remaining_secs,
            at: self.clock.now(),
        }
    }

    /// Call once per elapsed second. Returns `Some(Event::PhaseCompleted)`
    /// when this tick finishes the current phase.
    pub fn tick(&mut self) -> Option<Event> {
        self.roll_over_day();
        if self.status != TimerStatus::Running {
            return None;
        }
        if self.remaining_secs > 0 {
            self.remaining_secs -= 1;
            if self.remaining_secs > 0 {
                return None;
            }
        }
        debug!(phase = %self.phase, "countdown reached zero");
        let finished = self.complete_phase();
        Some(Event::PhaseCompleted {
            finished,
            next: self.phase,
            status: self.status,
            completed_pomodoros: self.completed_pomodoros,
            at: self.clock.now(),
        })
    }

    /// End a break early and move on to focus, exactly as if the break had
    /// run out.
    pub fn skip_break(&mut self) -> Result<Event, EngineError> {
        if !self.phase.is_break() {
            return Err(EngineError::InvalidTransition {
                command: "skip break",
                reason: "not in a break".into(),
            });
        }
        let skipped = self.complete_phase();
        Ok(Event::BreakSkipped {
            skipped,
            status: self.status,
            at: self.clock.now(),
        })
    }

    /// Merge `patch` into the settings.
    ///
    /// While idle, a changed duration for the current phase is applied
    /// immediately. Every other duration change waits until its phase is
    /// next entered. Out-of-range values reject the whole patch.
    pub fn update_settings(&mut self, patch: &SettingsPatch) -> Result<Event, EngineError> {
        let merged = self.settings.merged(patch);
        merged.validate()?;

        let current_changed =
            merged.duration_secs(self.phase) != self.settings.duration_secs(self.phase);
        self.settings = merged;

        let recomputed = self.status == TimerStatus::Idle && current_changed;
        if recomputed {
            self.enter_phase(self.phase);
        }
        info!(?patch, recomputed, "timer settings updated");
        Ok(Event::TimerSettingsUpdated {
            settings: self.settings,
            recomputed,
            at: self.clock.now(),
        })
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// Move to the next phase of the cycle. Returns the phase that ended.
    fn complete_phase(&mut self) -> Phase {
        let finished = self.phase;
        let (next, auto_start) = match finished {
            Phase::Focus => {
                self.roll_over_day();
                self.completed_pomodoros += 1;
                self.total_focused_secs_today += self.initial_duration_secs;
                let interval = self.settings.long_break_interval.max(1);
                let next = if self.completed_pomodoros % interval == 0 {
                    Phase::LongBreak
                } else {
                    Phase::Break
                };
                (next, self.settings.auto_start_breaks)
            }
            Phase::Break | Phase::LongBreak => (Phase::Focus, self.settings.auto_start_next_focus),
        };

        self.enter_phase(next);
        self.status = if auto_start {
            TimerStatus::Running
        } else {
            TimerStatus::Idle
        };
        info!(
            %finished,
            %next,
            status = %self.status,
            completed_pomodoros = self.completed_pomodoros,
            "phase completed"
        );
        finished
    }

    fn enter_phase(&mut self, phase: Phase) {
        self.phase = phase;
        self.initial_duration_secs = self.settings.duration_secs(phase);
        self.remaining_secs = self.initial_duration_secs;
    }

    fn roll_over_day(&mut self) {
        let today = self.clock.today();
        if today != self.stats_date {
            info!(%today, completed = self.completed_pomodoros, "new day, daily counters reset");
            self.stats_date = today;
            self.completed_pomodoros = 0;
            self.total_focused_secs_today = 0;
        }
    }
}
