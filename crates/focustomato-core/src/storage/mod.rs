mod config;

pub use config::{BarrierConfig, Config};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns the configuration directory, creating it if needed.
///
/// `FOCUSTOMATO_HOME` overrides the location entirely. Otherwise the
/// directory is `~/.config/focustomato[-dev]/`, with FOCUSTOMATO_ENV=dev
/// selecting the development directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("FOCUSTOMATO_HOME") {
        Some(home) => PathBuf::from(home),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env =
                std::env::var("FOCUSTOMATO_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("focustomato-dev")
            } else {
                base_dir.join("focustomato")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DirUnavailable(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
