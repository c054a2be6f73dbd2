//! Defines all configuration structures for the alarm clock.
//!
//! These structs are deserialized with `serde`, usually through
//! [`AlarmClockConfig::load`], which layers an optional TOML file under
//! `ALARMCLOCK_*` environment variables. Every field has a default, so an
//! empty or missing file yields a working configuration.

use crate::error::ConfigError;
use crate::time::ClockFormat;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default configuration file, looked up relative to the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "alarmclock.toml";

/// Prefix for environment overrides, e.g. `ALARMCLOCK_FORMAT=12h`.
pub const ENV_PREFIX: &str = "ALARMCLOCK";

/// The top-level configuration for the `AlarmClockEngine` and its front ends.
#[derive(Debug, Clone, Deserialize)]
pub struct AlarmClockConfig {
    /// How often the system clock samples the time and the matcher runs.
    #[serde(default)]
    pub resolution: ClockResolution,

    /// Initial display format for the readout and alarm list.
    #[serde(default)]
    pub format: ClockFormat,

    /// Sound clip played while an alarm rings. `None` always uses the bell.
    #[serde(default = "default_sound")]
    pub sound: Option<PathBuf>,

    /// Pause between bells when no clip can be played.
    #[serde(default = "default_beep_interval_ms")]
    pub beep_interval_ms: u64,

    /// Log filter used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Defines the operational speed of the `SystemClock`.
///
/// Alarms are compared against whole seconds, so anything faster than `Low`
/// only reduces how late within its second an alarm can fire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClockResolution {
    /// 4 ticks per second.
    High,
    /// 2 ticks per second.
    Medium,
    /// 1 tick per second.
    #[default]
    Low,
    /// A user-defined speed in ticks per second.
    Custom { ticks_per_second: u64 },
}

impl ClockResolution {
    pub fn ticks_per_second(&self) -> u64 {
        match self {
            ClockResolution::High => 4,
            ClockResolution::Medium => 2,
            ClockResolution::Low => 1,
            ClockResolution::Custom { ticks_per_second } => (*ticks_per_second).max(1),
        }
    }

    /// Time between two ticks.
    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(1000 / self.ticks_per_second().min(1000))
    }
}

impl AlarmClockConfig {
    /// Loads [`DEFAULT_CONFIG_FILE`] (if present) and environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Path::new(DEFAULT_CONFIG_FILE))
    }

    /// Loads the given file (if present) and environment overrides.
    ///
    /// Precedence, highest first: `ALARMCLOCK_*` variables, the file, defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;
        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Parses a TOML document directly, without consulting the environment.
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::from_str(contents, config::FileFormat::Toml))
            .build()?;
        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.beep_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "beep_interval_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        if let ClockResolution::Custom { ticks_per_second: 0 } = self.resolution {
            return Err(ConfigError::InvalidValue {
                field: "resolution",
                reason: "custom ticks_per_second must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    pub fn beep_interval(&self) -> Duration {
        Duration::from_millis(self.beep_interval_ms)
    }
}

// --- Default value functions for serde ---

fn default_sound() -> Option<PathBuf> {
    Some(PathBuf::from("alarm_sound.mp3"))
}

fn default_beep_interval_ms() -> u64 {
    500
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AlarmClockConfig {
    fn default() -> Self {
        Self {
            resolution: ClockResolution::default(),
            format: ClockFormat::default(),
            sound: default_sound(),
            beep_interval_ms: default_beep_interval_ms(),
            log_level: default_log_level(),
        }
    }
}
