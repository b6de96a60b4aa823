//! Host: the single writer for both engines.
//!
//! A [`FocusHost`] owns one [`TimerEngine`] and one [`BarrierEngine`],
//! turns UI commands into engine calls, and publishes the full
//! [`AppSnapshot`] to read-only subscribers after every change. Periodic
//! ticks come from [`run_ticker`] or, in tests, from calling
//! [`FocusHost::tick`] directly.

mod ticker;

pub use ticker::run_ticker;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::barrier::{BarrierEngine, BarrierSnapshot, Enforcer, LoggingEnforcer, TargetKind};
use crate::error::EngineError;
use crate::events::{BlocklistChange, Event};
use crate::storage::Config;
use crate::timer::{SettingsPatch, TimerEngine, TimerSnapshot};

/// Everything an observer needs to render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppSnapshot {
    pub timer: TimerSnapshot,
    pub barrier: BarrierSnapshot,
}

/// A user-originated request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    Start,
    Pause,
    Reset,
    SkipBreak,
    UpdateSettings(SettingsPatch),
    /// Raise the barrier, for `minutes` or open-ended.
    Activate { minutes: Option<u32> },
    Deactivate,
    EmergencyUnlock,
    RecordAttempt { kind: TargetKind, target: String },
    /// The host saw an access; block and log it if it hits the blocklist.
    ReportAccess { kind: TargetKind, target: String },
    AddApp { name: String, process_name: String },
    AddWebsite { name: String, url: String },
    RemoveApp { id: String },
    RemoveWebsite { id: String },
    ToggleApp { id: String },
    ToggleWebsite { id: String },
    ClearAttempts,
}

pub struct FocusHost {
    timer: TimerEngine,
    barrier: BarrierEngine,
    enforcer: Box<dyn Enforcer>,
    snapshots: watch::Sender<AppSnapshot>,
}

impl FocusHost {
    pub fn new(timer: TimerEngine, barrier: BarrierEngine) -> Self {
        let initial = AppSnapshot {
            timer: timer.snapshot(),
            barrier: barrier.snapshot(),
        };
        let (snapshots, _) = watch::channel(initial);
        Self {
            timer,
            barrier,
            enforcer: Box::new(LoggingEnforcer),
            snapshots,
        }
    }

    /// Engines seeded from configuration: timer settings, unlock
    /// allowance and blocklists.
    pub fn from_config(config: &Config) -> Self {
        Self::new(TimerEngine::new(config.timer), config.barrier_engine())
    }

    pub fn with_enforcer(mut self, enforcer: impl Enforcer + 'static) -> Self {
        self.enforcer = Box::new(enforcer);
        self
    }

    pub fn timer(&self) -> &TimerEngine {
        &self.timer
    }

    pub fn barrier(&self) -> &BarrierEngine {
        &self.barrier
    }

    pub fn snapshot(&self) -> AppSnapshot {
        AppSnapshot {
            timer: self.timer.snapshot(),
            barrier: self.barrier.snapshot(),
        }
    }

    /// Receiver that always holds the latest snapshot.
    pub fn subscribe(&self) -> watch::Receiver<AppSnapshot> {
        self.snapshots.subscribe()
    }

    /// Advance both engines by one second.
    pub fn tick(&mut self) -> Vec<Event> {
        let events: Vec<Event> = [self.timer.tick(), self.barrier.tick()]
            .into_iter()
            .flatten()
            .collect();
        self.publish();
        events
    }

    /// Apply one command. Rejected commands change nothing and publish
    /// nothing.
    pub fn execute(&mut self, command: Command) -> Result<Vec<Event>, EngineError> {
        debug!(?command, "executing command");
        let result = self.apply(command);
        match &result {
            Ok(_) => self.publish(),
            Err(e) => warn!(error = %e, "command rejected"),
        }
        result
    }

    /// Block and log an access to `target` if the barrier covers it.
    /// An enforcement failure is reported as an event and the attempt is
    /// still recorded.
    pub fn report_access(&mut self, kind: TargetKind, target: &str) -> Vec<Event> {
        let events = self.block_and_record(kind, target);
        if !events.is_empty() {
            self.publish();
        }
        events
    }

    fn block_and_record(&mut self, kind: TargetKind, target: &str) -> Vec<Event> {
        let blocked = match kind {
            TargetKind::App => self.barrier.blocking_app(target).is_some(),
            TargetKind::Website => self.barrier.blocking_website(target).is_some(),
        };
        if !blocked {
            return Vec::new();
        }

        let mut events = Vec::with_capacity(2);
        if let Err(e) = self.enforcer.enforce_block(kind, target) {
            warn!(%kind, blocked = target, error = %e, "enforcement failed");
            events.push(Event::BlockEnforcementFailed {
                kind,
                target: target.to_string(),
                message: e.to_string(),
                at: self.barrier.now(),
            });
        }
        events.push(self.barrier.record_attempt(kind, target));
        events
    }

    fn apply(&mut self, command: Command) -> Result<Vec<Event>, EngineError> {
        let event = match command {
            Command::Start => self.timer.start()?,
            Command::Pause => self.timer.pause()?,
            Command::Reset => self.timer.reset(),
            Command::SkipBreak => {
                if self.barrier.is_active() {
                    return Err(EngineError::InvalidTransition {
                        command: "skip break",
                        reason: "barrier is active".into(),
                    });
                }
                self.timer.skip_break()?
            }
            Command::UpdateSettings(patch) => self.timer.update_settings(&patch)?,
            Command::Activate { minutes: Some(minutes) } => self.barrier.activate_for(minutes)?,
            Command::Activate { minutes: None } => self.barrier.activate(),
            Command::Deactivate => self.barrier.deactivate(),
            Command::EmergencyUnlock => self.barrier.use_emergency_unlock()?,
            Command::RecordAttempt { kind, target } => self.barrier.record_attempt(kind, &target),
            Command::ReportAccess { kind, target } => {
                return Ok(self.block_and_record(kind, &target));
            }
            Command::ClearAttempts => self.barrier.clear_attempts(),
            Command::AddApp { name, process_name } => Event::BlocklistChanged {
                kind: TargetKind::App,
                id: self.barrier.add_blocked_app(&name, &process_name),
                change: BlocklistChange::Added,
            },
            Command::AddWebsite { name, url } => Event::BlocklistChanged {
                kind: TargetKind::Website,
                id: self.barrier.add_blocked_website(&name, &url),
                change: BlocklistChange::Added,
            },
            Command::RemoveApp { id } => {
                return Ok(removed(TargetKind::App, id, |id| self.barrier.remove_blocked_app(id)));
            }
            Command::RemoveWebsite { id } => {
                return Ok(removed(TargetKind::Website, id, |id| {
                    self.barrier.remove_blocked_website(id)
                }));
            }
            Command::ToggleApp { id } => {
                return Ok(toggled(TargetKind::App, id, |id| self.barrier.toggle_app_block(id)));
            }
            Command::ToggleWebsite { id } => {
                return Ok(toggled(TargetKind::Website, id, |id| {
                    self.barrier.toggle_website_block(id)
                }));
            }
        };
        Ok(vec![event])
    }

    fn publish(&self) {
        let next = self.snapshot();
        self.snapshots.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
    }
}

fn removed(kind: TargetKind, id: String, remove: impl FnOnce(&str) -> bool) -> Vec<Event> {
    if !remove(&id) {
        return Vec::new();
    }
    vec![Event::BlocklistChanged {
        kind,
        id,
        change: BlocklistChange::Removed,
    }]
}

fn toggled(kind: TargetKind, id: String, toggle: impl FnOnce(&str) -> Option<bool>) -> Vec<Event> {
    match toggle(&id) {
        Some(is_active) => vec![Event::BlocklistChanged {
            kind,
            id,
            change: BlocklistChange::Toggled { is_active },
        }],
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::{Phase, TimerSettings, TimerStatus};

    fn host() -> FocusHost {
        FocusHost::from_config(&Config::default())
    }

    #[test]
    fn commands_publish_snapshots() {
        let mut host = host();
        let mut rx = host.subscribe();
        assert!(!rx.has_changed().unwrap());

        host.execute(Command::Start).unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().timer.status, TimerStatus::Running);

        host.tick();
        assert_eq!(rx.borrow_and_update().timer.remaining_secs, 1499);
    }

    #[test]
    fn direct_access_reports_publish_snapshots() {
        let mut host = host();
        host.execute(Command::Activate { minutes: None }).unwrap();
        let mut rx = host.subscribe();
        let _ = rx.borrow_and_update();

        let events = host.report_access(TargetKind::App, "QQ.exe");
        assert_eq!(events.len(), 1);
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().barrier.attempts.len(), 1);

        host.report_access(TargetKind::App, "notepad.exe");
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn out_of_range_barrier_length_is_rejected() {
        let mut host = host();
        let mut rx = host.subscribe();
        for minutes in [0, 481] {
            assert!(matches!(
                host.execute(Command::Activate { minutes: Some(minutes) }),
                Err(EngineError::ConfigOutOfRange { field: "barrier_minutes", .. })
            ));
        }
        assert!(!host.barrier().is_active());
        assert!(!rx.has_changed().unwrap());
        host.execute(Command::Activate { minutes: Some(480) }).unwrap();
        assert_eq!(rx.borrow_and_update().barrier.remaining_secs, Some(480 * 60));
    }

    #[test]
    fn rejected_and_noop_commands_publish_nothing() {
        let mut host = host();
        let mut rx = host.subscribe();
        assert!(host.execute(Command::Pause).is_err());
        assert!(host
            .execute(Command::RemoveApp { id: "missing".into() })
            .unwrap()
            .is_empty());
        host.tick();
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn skip_break_blocked_while_barrier_active() {
        let settings = TimerSettings {
            focus_minutes: 1,
            ..TimerSettings::default()
        };
        let mut host = FocusHost::new(TimerEngine::new(settings), BarrierEngine::default());
        host.execute(Command::Start).unwrap();
        for _ in 0..60 {
            host.tick();
        }
        assert_eq!(host.timer().phase(), Phase::Break);

        host.execute(Command::Activate { minutes: Some(25) }).unwrap();
        assert!(matches!(
            host.execute(Command::SkipBreak),
            Err(EngineError::InvalidTransition { .. })
        ));
        host.execute(Command::Deactivate).unwrap();
        host.execute(Command::SkipBreak).unwrap();
        assert_eq!(host.timer().phase(), Phase::Focus);
    }

    #[test]
    fn blocklist_commands_report_changes() {
        let mut host = host();
        let events = host
            .execute(Command::ToggleApp { id: "qq".into() })
            .unwrap();
        assert_eq!(
            events,
            vec![Event::BlocklistChanged {
                kind: TargetKind::App,
                id: "qq".into(),
                change: BlocklistChange::Toggled { is_active: false },
            }]
        );
        let events = host
            .execute(Command::RemoveWebsite { id: "zhihu".into() })
            .unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(host.barrier().blocked_websites().count(), 2);
    }

    #[test]
    fn report_access_only_logs_blocked_targets() {
        let mut host = host();
        assert!(host.report_access(TargetKind::App, "WeChat.exe").is_empty());

        host.execute(Command::Activate { minutes: None }).unwrap();
        assert!(host.report_access(TargetKind::App, "notepad.exe").is_empty());
        let events = host
            .execute(Command::ReportAccess {
                kind: TargetKind::Website,
                target: "https://www.bilibili.com/video/1".into(),
            })
            .unwrap();
        assert!(matches!(events.as_slice(), [Event::AttemptRecorded { .. }]));
        assert_eq!(host.barrier().attempts().len(), 1);
    }

    #[test]
    fn command_json_shape() {
        let cmd: Command =
            serde_json::from_str(r#"{"command":"activate","minutes":45}"#).unwrap();
        assert_eq!(cmd, Command::Activate { minutes: Some(45) });
        let cmd: Command = serde_json::from_str(
            r#"{"command":"update_settings","focus_minutes":30}"#,
        )
        .unwrap();
        assert_eq!(
            cmd,
            Command::UpdateSettings(SettingsPatch {
                focus_minutes: Some(30),
                ..Default::default()
            })
        );
    }
}
