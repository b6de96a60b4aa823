//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Focus/break durations and auto-start rules
//! - Emergency unlock allowance and default barrier length
//! - The app and website blocklists
//!
//! Configuration is stored at `~/.config/focustomato/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::barrier::{
    BarrierEngine, BarrierSettings, BlockedApp, BlockedWebsite, SESSION_MINUTES_MAX,
    SESSION_MINUTES_MIN,
};
use crate::error::ConfigError;
use crate::timer::{check_range, TimerSettings};

/// Barrier configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BarrierConfig {
    #[serde(default = "default_unlocks_per_day")]
    pub emergency_unlocks_per_day: u32,
    /// Length of a barrier session when none is given.
    #[serde(default = "default_barrier_minutes")]
    pub default_minutes: u32,
    #[serde(default = "default_apps")]
    pub apps: Vec<BlockedApp>,
    #[serde(default = "default_websites")]
    pub websites: Vec<BlockedWebsite>,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/focustomato/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub timer: TimerSettings,
    #[serde(default)]
    pub barrier: BarrierConfig,
}

// Default functions
fn default_unlocks_per_day() -> u32 {
    BarrierSettings::default().emergency_unlocks_per_day
}
fn default_barrier_minutes() -> u32 {
    30
}
fn default_apps() -> Vec<BlockedApp> {
    [
        ("wechat", "WeChat", "WeChat.exe"),
        ("steam", "Steam", "Steam.exe"),
        ("qq", "QQ", "QQ.exe"),
    ]
    .into_iter()
    .map(|(id, name, process_name)| BlockedApp {
        id: id.into(),
        name: name.into(),
        process_name: process_name.into(),
        is_active: true,
    })
    .collect()
}
fn default_websites() -> Vec<BlockedWebsite> {
    [
        ("weibo", "Weibo", "weibo.com"),
        ("bilibili", "Bilibili", "bilibili.com"),
        ("zhihu", "Zhihu", "zhihu.com"),
    ]
    .into_iter()
    .map(|(id, name, url)| BlockedWebsite {
        id: id.into(),
        name: name.into(),
        url: url.into(),
        is_active: true,
    })
    .collect()
}

impl Default for BarrierConfig {
    fn default() -> Self {
        Self {
            emergency_unlocks_per_day: default_unlocks_per_day(),
            default_minutes: default_barrier_minutes(),
            apps: default_apps(),
            websites: default_websites(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|_| invalid(format!("cannot parse '{value}' as bool")))?,
                    ),
                    serde_json::Value::Number(_) => value
                        .parse::<u64>()
                        .map(|n| serde_json::Value::Number(n.into()))
                        .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?,
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, writing defaults when missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed or
    /// holds out-of-range values, or if the default config cannot be
    /// written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let load_failed = |message: String| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message,
        };
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config =
                    toml::from_str(&content).map_err(|e| load_failed(e.to_string()))?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(load_failed(e.to_string())),
        }
    }

    /// Persist to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Check every numeric option against its recognized range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.timer.validate()?;
        self.barrier_settings().validate()?;
        check_range(
            "default_minutes",
            self.barrier.default_minutes,
            SESSION_MINUTES_MIN,
            SESSION_MINUTES_MAX,
        )?;
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key without saving. The config is left
    /// untouched when the key is unknown or the result fails validation.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json =
            serde_json::to_value(&*self).map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config =
            serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Set a config value by key and persist it.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed
    /// or is out of range, or the config cannot be saved.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.set_value(key, value)?;
        self.save()
    }

    pub fn barrier_settings(&self) -> BarrierSettings {
        BarrierSettings {
            emergency_unlocks_per_day: self.barrier.emergency_unlocks_per_day,
        }
    }

    /// Barrier engine seeded with the configured blocklists.
    pub fn barrier_engine(&self) -> BarrierEngine {
        let mut engine = BarrierEngine::new(self.barrier_settings());
        engine.import_blocked_items(
            self.barrier.apps.iter().cloned(),
            self.barrier.websites.iter().cloned(),
        );
        engine
    }

    /// Replace the stored blocklists with the engine's current ones.
    pub fn store_blocklist(&mut self, engine: &BarrierEngine) {
        self.barrier.apps = engine.blocked_apps().cloned().collect();
        self.barrier.websites = engine.blocked_websites().cloned().collect();
    }
}
