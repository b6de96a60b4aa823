pub mod blocklist;
pub mod config;
pub mod run;
