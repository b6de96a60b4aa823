mod engine;
mod settings;

pub use engine::{Phase, TimerEngine, TimerSnapshot, TimerStatus};
pub use settings::{constraints, SettingsPatch, TimerSettings};

pub(crate) use settings::check_range;
