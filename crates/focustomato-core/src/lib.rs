//! # Focustomato Core Library
//!
//! Core logic for a Pomodoro timer paired with a distraction barrier.
//! The CLI binary and any GUI shell are thin layers over this crate.
//!
//! ## Architecture
//!
//! - **Timer Engine**: a tick-driven state machine cycling focus and break
//!   phases. The caller invokes `tick()` once per second.
//! - **Barrier Engine**: blocklists, blocking sessions, the attempt log and
//!   the daily emergency-unlock allowance.
//! - **Host**: the single writer that owns both engines, applies commands
//!   and publishes snapshots.
//! - **Storage**: TOML configuration for settings and blocklists.
//!
//! ## Key Components
//!
//! - [`TimerEngine`]: focus/break state machine
//! - [`BarrierEngine`]: distraction blocking state
//! - [`FocusHost`]: command bridge and snapshot publisher
//! - [`Config`]: application configuration management

pub mod barrier;
pub mod clock;
pub mod error;
pub mod events;
pub mod host;
pub mod storage;
pub mod timer;

pub use barrier::{BarrierEngine, BarrierSettings, BarrierSnapshot, Enforcer, LoggingEnforcer, TargetKind};
pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use error::{ConfigError, EnforceError, EngineError};
pub use events::Event;
pub use host::{run_ticker, AppSnapshot, Command, FocusHost};
pub use storage::Config;
pub use timer::{Phase, SettingsPatch, TimerEngine, TimerSettings, TimerSnapshot, TimerStatus};
