//! Barrier engine: the blocking session, the blocklists, the attempt log
//! and the emergency-unlock allowance.
//!
//! The only session state is whether the barrier is up (optionally with a
//! countdown). The emergency-unlock counter is reset lazily: an unlock on a
//! new calendar day starts counting from zero again.

use chrono::{DateTime, NaiveDate, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use super::target::{BarrierAttempt, BlockedApp, BlockedWebsite, TargetKind};
use crate::clock::{system_clock, SharedClock};
use crate::error::EngineError;
use crate::events::{DeactivationReason, Event};
use crate::timer::check_range;

pub const UNLOCKS_PER_DAY_MAX: u32 = 20;
/// Accepted length of a timed session, in minutes.
pub const SESSION_MINUTES_MIN: u32 = 1;
pub const SESSION_MINUTES_MAX: u32 = 480;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BarrierSettings {
    /// Emergency unlocks allowed per calendar day. 0 disables them.
    pub emergency_unlocks_per_day: u32,
}

impl Default for BarrierSettings {
    fn default() -> Self {
        Self {
            emergency_unlocks_per_day: 3,
        }
    }
}

impl BarrierSettings {
    pub fn validate(&self) -> Result<(), EngineError> {
        check_range(
            "emergency_unlocks_per_day",
            self.emergency_unlocks_per_day,
            0,
            UNLOCKS_PER_DAY_MAX,
        )
    }
}

/// Read-only view of the barrier handed to observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BarrierSnapshot {
    pub is_active: bool,
    /// Seconds left in a timed session, `None` when untimed or inactive.
    pub remaining_secs: Option<u64>,
    pub blocked_apps: Vec<BlockedApp>,
    pub blocked_websites: Vec<BlockedWebsite>,
    pub attempts: Vec<BarrierAttempt>,
    pub emergency_unlocks_used_today: u32,
    pub emergency_unlocks_remaining: u32,
    pub last_emergency_unlock_date: Option<NaiveDate>,
}

#[derive(Debug, Clone)]
pub struct BarrierEngine {
    settings: BarrierSettings,
    is_active: bool,
    remaining_secs: Option<u64>,
    blocked_apps: IndexMap<String, BlockedApp>,
    blocked_websites: IndexMap<String, BlockedWebsite>,
    attempts: Vec<BarrierAttempt>,
    emergency_unlocks_used_today: u32,
    last_emergency_unlock_date: Option<NaiveDate>,
    clock: SharedClock,
}

impl Default for BarrierEngine {
    fn default() -> Self {
        Self::new(BarrierSettings::default())
    }
}

impl BarrierEngine {
    pub fn new(settings: BarrierSettings) -> Self {
        Self::with_clock(settings, system_clock())
    }

    pub fn with_clock(settings: BarrierSettings, clock: SharedClock) -> Self {
        Self {
            settings,
            is_active: false,
            remaining_secs: None,
            blocked_apps: IndexMap::new(),
            blocked_websites: IndexMap::new(),
            attempts: Vec::new(),
            emergency_unlocks_used_today: 0,
            last_emergency_unlock_date: None,
            clock,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn remaining_secs(&self) -> Option<u64> {
        self.remaining_secs
    }

    pub fn settings(&self) -> &BarrierSettings {
        &self.settings
    }

    /// Current instant on the engine's clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn blocked_apps(&self) -> impl Iterator<Item = &BlockedApp> {
        self.blocked_apps.values()
    }

    pub fn blocked_websites(&self) -> impl Iterator<Item = &BlockedWebsite> {
        self.blocked_websites.values()
    }

    pub fn attempts(&self) -> &[BarrierAttempt] {
        &self.attempts
    }

    pub fn emergency_unlocks_used_today(&self) -> u32 {
        self.emergency_unlocks_used_today
    }

    pub fn last_emergency_unlock_date(&self) -> Option<NaiveDate> {
        self.last_emergency_unlock_date
    }

    /// Unlocks still available today, counting a stale counter as zero.
    pub fn unlocks_remaining_today(&self) -> u32 {
        self.settings
            .emergency_unlocks_per_day
            .saturating_sub(self.used_today(self.clock.today()))
    }

    /// The active entry blocking `process_name`, if the barrier is up.
    pub fn blocking_app(&self, process_name: &str) -> Option<&BlockedApp> {
        if !self.is_active {
            return None;
        }
        self.blocked_apps
            .values()
            .find(|app| app.is_active && app.matches(process_name))
    }

    /// The active entry blocking `url`, if the barrier is up.
    pub fn blocking_website(&self, url: &str) -> Option<&BlockedWebsite> {
        if !self.is_active {
            return None;
        }
        self.blocked_websites
            .values()
            .find(|site| site.is_active && site.matches(url))
    }

    pub fn snapshot(&self) -> BarrierSnapshot {
        BarrierSnapshot {
            is_active: self.is_active,
            remaining_secs: self.remaining_secs,
            blocked_apps: self.blocked_apps.values().cloned().collect(),
            blocked_websites: self.blocked_websites.values().cloned().collect(),
            attempts: self.attempts.clone(),
            emergency_unlocks_used_today: self.emergency_unlocks_used_today,
            emergency_unlocks_remaining: self.unlocks_remaining_today(),
            last_emergency_unlock_date: self.last_emergency_unlock_date,
        }
    }

    // ── Blocklists ───────────────────────────────────────────────────

    /// Returns the id of the new entry.
    pub fn add_blocked_app(&mut self, name: &str, process_name: &str) -> String {
        let id = Uuid::new_v4().to_string();
        self.blocked_apps.insert(
            id.clone(),
            BlockedApp {
                id: id.clone(),
                name: name.to_string(),
                process_name: process_name.to_string(),
                is_active: true,
            },
        );
        info!(%id, entry = name, process_name, "app added to blocklist");
        id
    }

    /// Returns the id of the new entry.
    pub fn add_blocked_website(&mut self, name: &str, url: &str) -> String {
        let id = Uuid::new_v4().to_string();
        self.blocked_websites.insert(
            id.clone(),
            BlockedWebsite {
                id: id.clone(),
                name: name.to_string(),
                url: url.to_string(),
                is_active: true,
            },
        );
        info!(%id, entry = name, url, "website added to blocklist");
        id
    }

    /// Returns whether an entry was removed. Unknown ids are ignored.
    pub fn remove_blocked_app(&mut self, id: &str) -> bool {
        self.blocked_apps.shift_remove(id).is_some()
    }

    /// Returns whether an entry was removed. Unknown ids are ignored.
    pub fn remove_blocked_website(&mut self, id: &str) -> bool {
        self.blocked_websites.shift_remove(id).is_some()
    }

    /// Flip an app entry. Returns its new state, `None` for unknown ids.
    pub fn toggle_app_block(&mut self, id: &str) -> Option<bool> {
        let app = self.blocked_apps.get_mut(id)?;
        app.is_active = !app.is_active;
        Some(app.is_active)
    }

    /// Flip a website entry. Returns its new state, `None` for unknown ids.
    pub fn toggle_website_block(&mut self, id: &str) -> Option<bool> {
        let site = self.blocked_websites.get_mut(id)?;
        site.is_active = !site.is_active;
        Some(site.is_active)
    }

    /// Insert entries verbatim, keeping their ids. An entry whose id is
    /// already present replaces the old one in place.
    /// Returns the number of entries imported.
    pub fn import_blocked_items(
        &mut self,
        apps: impl IntoIterator<Item = BlockedApp>,
        websites: impl IntoIterator<Item = BlockedWebsite>,
    ) -> usize {
        let mut count = 0;
        for app in apps {
            self.blocked_apps.insert(app.id.clone(), app);
            count += 1;
        }
        for site in websites {
            self.blocked_websites.insert(site.id.clone(), site);
            count += 1;
        }
        count
    }

    // ── Session ──────────────────────────────────────────────────────

    /// Raise the barrier with no end time. Idempotent.
    pub fn activate(&mut self) -> Event {
        self.is_active = true;
        self.remaining_secs = None;
        info!("barrier activated");
        Event::BarrierActivated {
            minutes: None,
            at: self.clock.now(),
        }
    }

    /// Raise the barrier for `minutes`; `tick()` lowers it at the end.
    /// Lengths outside the session range are rejected and change nothing.
    pub fn activate_for(&mut self, minutes: u32) -> Result<Event, EngineError> {
        check_range(
            "barrier_minutes",
            minutes,
            SESSION_MINUTES_MIN,
            SESSION_MINUTES_MAX,
        )?;
        self.is_active = true;
        self.remaining_secs = Some(u64::from(minutes) * 60);
        info!(minutes, "barrier activated");
        Ok(Event::BarrierActivated {
            minutes: Some(minutes),
            at: self.clock.now(),
        })
    }

    /// Lower the barrier. Idempotent.
    pub fn deactivate(&mut self) -> Event {
        self.lower(DeactivationReason::Manual)
    }

    /// Count down a timed session. Returns an event when it expires.
    pub fn tick(&mut self) -> Option<Event> {
        if !self.is_active {
            return None;
        }
        let remaining = self.remaining_secs.as_mut()?;
        *remaining = remaining.saturating_sub(1);
        if *remaining > 0 {
            return None;
        }
        Some(self.lower(DeactivationReason::Expired))
    }

    /// Log a blocked access. Entries are never changed afterwards.
    pub fn record_attempt(&mut self, kind: TargetKind, target: &str) -> Event {
        let attempt = BarrierAttempt {
            id: Uuid::new_v4().to_string(),
            timestamp: self.clock.now(),
            kind,
            target: target.to_string(),
        };
        info!(%kind, attempted = target, "blocked access recorded");
        self.attempts.push(attempt.clone());
        Event::AttemptRecorded { attempt }
    }

    /// Empty the attempt log on the user's request.
    pub fn clear_attempts(&mut self) -> Event {
        let count = self.attempts.len();
        self.attempts.clear();
        info!(count, "attempt log cleared");
        Event::AttemptsCleared {
            count,
            at: self.clock.now(),
        }
    }

    /// Lower the barrier early, spending one of today's emergency unlocks.
    ///
    /// The counter starts over when the last unlock happened on another
    /// day. Past the daily cap the unlock is refused and nothing changes.
    pub fn use_emergency_unlock(&mut self) -> Result<Event, EngineError> {
        let today = self.clock.today();
        let used = self.used_today(today);
        let limit = self.settings.emergency_unlocks_per_day;
        if used >= limit {
            warn!(used, limit, "emergency unlock refused");
            return Err(EngineError::UnlockLimitReached { used, limit });
        }

        self.emergency_unlocks_used_today = used + 1;
        self.last_emergency_unlock_date = Some(today);
        self.lower(DeactivationReason::EmergencyUnlock);
        Ok(Event::EmergencyUnlockUsed {
            used_today: self.emergency_unlocks_used_today,
            remaining_today: limit - self.emergency_unlocks_used_today,
            at: self.clock.now(),
        })
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn used_today(&self, today: NaiveDate) -> u32 {
        if self.last_emergency_unlock_date == Some(today) {
            self.emergency_unlocks_used_today
        } else {
            0
        }
    }

    fn lower(&mut self, reason: DeactivationReason) -> Event {
        self.is_active = false;
        self.remaining_secs = None;
        info!(?reason, "barrier deactivated");
        Event::BarrierDeactivated {
            reason,
            at: self.clock.now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_entries_are_active_with_unique_ids() {
        let mut barrier = BarrierEngine::default();
        let a = barrier.add_blocked_app("WeChat", "WeChat.exe");
        let b = barrier.add_blocked_app("QQ", "QQ.exe");
        assert_ne!(a, b);
        assert!(barrier.blocked_apps().all(|app| app.is_active));
        let names: Vec<_> = barrier.blocked_apps().map(|a| a.name.as_str()).collect();
        assert_eq!(names, ["WeChat", "QQ"]);
    }

    #[test]
    fn unknown_ids_are_ignored() {
        let mut barrier = BarrierEngine::default();
        barrier.add_blocked_website("Zhihu", "zhihu.com");
        let before = barrier.snapshot();
        assert!(!barrier.remove_blocked_app("missing"));
        assert!(!barrier.remove_blocked_website("missing"));
        assert_eq!(barrier.toggle_app_block("missing"), None);
        assert_eq!(barrier.toggle_website_block("missing"), None);
        assert_eq!(barrier.snapshot(), before);
    }

    #[test]
    fn toggle_and_remove() {
        let mut barrier = BarrierEngine::default();
        let id = barrier.add_blocked_website("Bilibili", "bilibili.com");
        assert_eq!(barrier.toggle_website_block(&id), Some(false));
        assert_eq!(barrier.toggle_website_block(&id), Some(true));
        assert!(barrier.remove_blocked_website(&id));
        assert_eq!(barrier.blocked_websites().count(), 0);
    }

    #[test]
    fn activation_is_idempotent() {
        let mut barrier = BarrierEngine::default();
        barrier.activate();
        barrier.activate();
        assert!(barrier.is_active());
        barrier.deactivate();
        barrier.deactivate();
        assert!(!barrier.is_active());
    }

    #[test]
    fn timed_session_expires() {
        let mut barrier = BarrierEngine::default();
        barrier.activate_for(1).unwrap();
        for _ in 0..59 {
            assert!(barrier.tick().is_none());
        }
        assert_eq!(barrier.remaining_secs(), Some(1));
        let event = barrier.tick().expect("expiry event");
        assert!(matches!(
            event,
            Event::BarrierDeactivated { reason: DeactivationReason::Expired, .. }
        ));
        assert!(!barrier.is_active());
        assert!(barrier.tick().is_none());
    }

    #[test]
    fn session_length_outside_range_is_rejected() {
        let mut barrier = BarrierEngine::default();
        for minutes in [0, SESSION_MINUTES_MAX + 1] {
            assert!(matches!(
                barrier.activate_for(minutes),
                Err(EngineError::ConfigOutOfRange { value, .. }) if value == minutes
            ));
        }
        assert!(!barrier.is_active());
        assert_eq!(barrier.remaining_secs(), None);
    }

    #[test]
    fn untimed_session_ignores_ticks() {
        let mut barrier = BarrierEngine::default();
        barrier.activate();
        for _ in 0..120 {
            assert!(barrier.tick().is_none());
        }
        assert!(barrier.is_active());
    }

    #[test]
    fn blocking_lookups_need_active_barrier_and_entry() {
        let mut barrier = BarrierEngine::default();
        let steam = barrier.add_blocked_app("Steam", "Steam.exe");
        barrier.add_blocked_website("Weibo", "weibo.com");
        assert!(barrier.blocking_app("steam.exe").is_none());

        barrier.activate();
        assert_eq!(barrier.blocking_app("steam.exe").map(|a| a.id.as_str()), Some(steam.as_str()));
        assert!(barrier.blocking_website("https://m.weibo.com/").is_some());

        barrier.toggle_app_block(&steam);
        assert!(barrier.blocking_app("steam.exe").is_none());
    }

    #[test]
    fn attempts_append_in_order() {
        let mut barrier = BarrierEngine::default();
        barrier.record_attempt(TargetKind::App, "QQ.exe");
        barrier.record_attempt(TargetKind::Website, "zhihu.com");
        let targets: Vec<_> = barrier.attempts().iter().map(|a| a.target.as_str()).collect();
        assert_eq!(targets, ["QQ.exe", "zhihu.com"]);
        assert_ne!(barrier.attempts()[0].id, barrier.attempts()[1].id);

        match barrier.clear_attempts() {
            Event::AttemptsCleared { count, .. } => assert_eq!(count, 2),
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(barrier.attempts().is_empty());
    }

    #[test]
    fn import_keeps_ids_and_replaces_duplicates() {
        let mut barrier = BarrierEngine::default();
        let app = |id: &str, name: &str| BlockedApp {
            id: id.into(),
            name: name.into(),
            process_name: format!("{name}.exe"),
            is_active: false,
        };
        let n = barrier.import_blocked_items(vec![app("1", "QQ"), app("2", "Steam")], vec![]);
        assert_eq!(n, 2);
        barrier.import_blocked_items(vec![app("1", "WeChat")], vec![]);
        let apps: Vec<_> = barrier.blocked_apps().map(|a| (a.id.as_str(), a.name.as_str())).collect();
        assert_eq!(apps, [("1", "WeChat"), ("2", "Steam")]);
        assert!(barrier.blocked_apps().all(|a| !a.is_active));
    }

    #[test]
    fn emergency_unlock_lowers_barrier() {
        let mut barrier = BarrierEngine::default();
        barrier.activate_for(30).unwrap();
        let event = barrier.use_emergency_unlock().unwrap();
        assert!(matches!(
            event,
            Event::EmergencyUnlockUsed { used_today: 1, remaining_today: 2, .. }
        ));
        assert!(!barrier.is_active());
        assert_eq!(barrier.remaining_secs(), None);
    }

    #[test]
    fn zero_allowance_refuses_without_side_effects() {
        let mut barrier = BarrierEngine::new(BarrierSettings {
            emergency_unlocks_per_day: 0,
        });
        barrier.activate();
        let err = barrier.use_emergency_unlock().unwrap_err();
        assert_eq!(err, EngineError::UnlockLimitReached { used: 0, limit: 0 });
        assert!(barrier.is_active());
        assert_eq!(barrier.last_emergency_unlock_date(), None);
    }

    #[test]
    fn settings_validation() {
        assert!(BarrierSettings::default().validate().is_ok());
        assert!(BarrierSettings {
            emergency_unlocks_per_day: 21
        }
        .validate()
        .is_err());
    }
}
