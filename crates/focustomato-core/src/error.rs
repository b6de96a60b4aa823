//! Core error types for focustomato-core.
//!
//! This module defines the error hierarchy using thiserror. Engine errors
//! are local and never fatal: a rejected command leaves the engine state
//! exactly as it was.

use std::path::PathBuf;
use thiserror::Error;

use crate::barrier::TargetKind;

/// Errors raised by the timer and barrier engines.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The command is not valid in the current state.
    #[error("cannot {command}: {reason}")]
    InvalidTransition {
        command: &'static str,
        reason: String,
    },

    /// A settings value lies outside its recognized bounds.
    #[error("{field} must be between {min} and {max} (got {value})")]
    ConfigOutOfRange {
        field: &'static str,
        value: u32,
        min: u32,
        max: u32,
    },

    /// The daily emergency-unlock allowance is used up.
    #[error("emergency unlock limit reached ({used}/{limit} used today)")]
    UnlockLimitReached { used: u32, limit: u32 },
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("unknown config key: {0}")]
    UnknownKey(String),

    /// The home/config directory could not be determined or created
    #[error("Config directory unavailable: {0}")]
    DirUnavailable(String),
}

/// Failure reported by an [`Enforcer`](crate::barrier::Enforcer).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnforceError {
    /// The platform refused or failed the block.
    #[error("failed to block {kind} '{target}': {message}")]
    Failed {
        kind: TargetKind,
        target: String,
        message: String,
    },
}

impl From<EngineError> for ConfigError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::ConfigOutOfRange { field, .. } => ConfigError::InvalidValue {
                key: field.to_string(),
                message: err.to_string(),
            },
            other => ConfigError::InvalidValue {
                key: String::new(),
                message: other.to_string(),
            },
        }
    }
}
