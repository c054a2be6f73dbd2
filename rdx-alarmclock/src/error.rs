//! Error types for the alarm clock.
//!
//! Every error here is reported at the user action that caused it. None of them
//! stop the engine's tick loop or abort the process.

use crate::time::TimeOfDay;
use std::path::PathBuf;
use thiserror::Error;

/// A field of a time-of-day triple, used to point at the offending input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeField {
    Hour,
    Minute,
    Second,
}

impl TimeField {
    /// The largest value the field accepts.
    pub const fn max(self) -> u32 {
        match self {
            TimeField::Hour => 23,
            TimeField::Minute | TimeField::Second => 59,
        }
    }
}

impl std::fmt::Display for TimeField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TimeField::Hour => "hour",
            TimeField::Minute => "minute",
            TimeField::Second => "second",
        };
        f.write_str(name)
    }
}

/// Rejected hour/minute/second input at alarm creation time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must be a number, got '{input}'")]
    NotNumeric { field: TimeField, input: String },

    #[error("{field} must be between 0 and {}, got {value}", .field.max())]
    OutOfRange { field: TimeField, value: i64 },

    #[error("expected a time as HH:MM:SS, got '{0}'")]
    Malformed(String),
}

/// An enabled alarm already exists at the requested time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("an alarm for {time} already exists")]
pub struct DuplicateError {
    pub time: TimeOfDay,
}

/// A delete (or other per-alarm) action was requested without a valid selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("no alarm selected")]
    NothingSelected,

    #[error("no alarm at position {position} (there are {len})")]
    OutOfRange { position: usize, len: usize },
}

/// The configured sound clip could not be found. Recovered by falling back to the bell.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("alarm sound not found at {}", path.display())]
pub struct ResourceMissing {
    pub path: PathBuf,
}

/// Configuration could not be loaded or deserialized.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration error: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration value for '{field}': {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Any error surfaced by the alarm clock's public API.
#[derive(Debug, Error)]
pub enum AlarmError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Duplicate(#[from] DuplicateError),

    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error(transparent)]
    ResourceMissing(#[from] ResourceMissing),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
