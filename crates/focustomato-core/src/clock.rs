//! Time source for the engines.
//!
//! Countdowns never read the clock: they advance only through `tick()`.
//! The clock is consulted for calendar questions (which day is it, when
//! was an attempt logged), and can be swapped for a [`ManualClock`] in
//! tests and simulations.

use std::fmt::Debug;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Local, NaiveDate, Utc};

pub trait Clock: Debug + Send + Sync {
    /// Current instant.
    fn now(&self) -> DateTime<Utc>;

    /// Calendar date used for daily counters.
    fn today(&self) -> NaiveDate;
}

pub type SharedClock = Arc<dyn Clock>;

/// Wall clock. Days roll over at local midnight.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

pub fn system_clock() -> SharedClock {
    Arc::new(SystemClock)
}

/// Manually advanced clock. Days roll over at UTC midnight.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn manual_clock_crosses_midnight() {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 3, 1, 23, 59, 0).unwrap());
        let before = clock.today();
        clock.advance(Duration::minutes(2));
        assert_eq!(clock.today(), before.succ_opt().unwrap());
    }
}
