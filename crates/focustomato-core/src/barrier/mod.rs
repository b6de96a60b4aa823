mod engine;
mod enforce;
mod target;

pub use engine::{
    BarrierEngine, BarrierSettings, BarrierSnapshot, SESSION_MINUTES_MAX, SESSION_MINUTES_MIN,
    UNLOCKS_PER_DAY_MAX,
};
pub use enforce::{Enforcer, LoggingEnforcer};
pub use target::{host_of, BarrierAttempt, BlockedApp, BlockedWebsite, TargetKind};
