//! Time-of-day values, display formatting and the ticking system clock.
//!
//! Matching is always done on [`TimeOfDay`], which is the 24-hour normalized
//! H:M:S form. [`ClockFormat`] only affects how a value is rendered.

use crate::common::SECONDS_PER_DAY;
use crate::config::ClockResolution;
use crate::error::{TimeField, ValidationError};
use chrono::{Local, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{info, trace};

/// A wall-clock instant within a day, with no date attached.
///
/// Values can only be built through validating constructors, so every
/// `TimeOfDay` held by the registry is in range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay {
    hour: u8,
    minute: u8,
    second: u8,
}

impl TimeOfDay {
    pub const MIDNIGHT: TimeOfDay = TimeOfDay {
        hour: 0,
        minute: 0,
        second: 0,
    };

    /// Builds a time of day, rejecting out-of-range fields.
    pub fn new(hour: u32, minute: u32, second: u32) -> Result<Self, ValidationError> {
        Ok(Self {
            hour: check_range(TimeField::Hour, i64::from(hour))?,
            minute: check_range(TimeField::Minute, i64::from(minute))?,
            second: check_range(TimeField::Second, i64::from(second))?,
        })
    }

    /// Validates raw user input for the three fields.
    ///
    /// Surrounding whitespace is ignored. Non-numeric input is reported before
    /// range problems, field by field in hour, minute, second order.
    pub fn parse_fields(hour: &str, minute: &str, second: &str) -> Result<Self, ValidationError> {
        Ok(Self {
            hour: parse_field(TimeField::Hour, hour)?,
            minute: parse_field(TimeField::Minute, minute)?,
            second: parse_field(TimeField::Second, second)?,
        })
    }

    /// Wraps a second count into the day.
    pub fn from_seconds(seconds: u32) -> Self {
        let seconds = seconds % SECONDS_PER_DAY;
        Self {
            hour: (seconds / 3600) as u8,
            minute: (seconds / 60 % 60) as u8,
            second: (seconds % 60) as u8,
        }
    }

    /// Drops the sub-second part of a chrono time.
    pub fn from_naive(time: NaiveTime) -> Self {
        Self::from_seconds(time.num_seconds_from_midnight())
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn minute(&self) -> u8 {
        self.minute
    }

    pub fn second(&self) -> u8 {
        self.second
    }

    pub fn as_seconds(&self) -> u32 {
        u32::from(self.hour) * 3600 + u32::from(self.minute) * 60 + u32::from(self.second)
    }

    /// The time `seconds` later, wrapping past midnight.
    pub fn plus_seconds(&self, seconds: u32) -> Self {
        Self::from_seconds(self.as_seconds() + seconds % SECONDS_PER_DAY)
    }

    /// Renders the time in the requested display format.
    ///
    /// `24h` gives `HH:MM:SS`; `12h` gives `hh:MM:SS AM|PM` with the hour in 01-12.
    pub fn format(&self, format: ClockFormat) -> String {
        match format {
            ClockFormat::TwentyFourHour => self.to_string(),
            ClockFormat::TwelveHour => {
                let suffix = if self.hour < 12 { "AM" } else { "PM" };
                let hour = match self.hour % 12 {
                    0 => 12,
                    h => h,
                };
                format!(
                    "{:02}:{:02}:{:02} {}",
                    hour, self.minute, self.second, suffix
                )
            }
        }
    }
}

fn check_range(field: TimeField, value: i64) -> Result<u8, ValidationError> {
    if (0..=i64::from(field.max())).contains(&value) {
        Ok(value as u8)
    } else {
        Err(ValidationError::OutOfRange { field, value })
    }
}

fn parse_field(field: TimeField, input: &str) -> Result<u8, ValidationError> {
    let value = input
        .trim()
        .parse::<i64>()
        .map_err(|_| ValidationError::NotNumeric {
            field,
            input: input.to_string(),
        })?;
    check_range(field, value)
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}:{:02}", self.hour, self.minute, self.second)
    }
}

impl FromStr for TimeOfDay {
    type Err = ValidationError;

    /// Parses the 24-hour `H:M:S` form. Fields need not be zero-padded.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split(':').collect();
        match parts.as_slice() {
            [h, m, sec] => Self::parse_fields(h, m, sec),
            _ => Err(ValidationError::Malformed(s.to_string())),
        }
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeOfDay> for String {
    fn from(value: TimeOfDay) -> Self {
        value.to_string()
    }
}

impl From<NaiveTime> for TimeOfDay {
    fn from(value: NaiveTime) -> Self {
        Self::from_naive(value)
    }
}

/// How a time of day is shown to the user. Never affects matching.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClockFormat {
    #[default]
    #[serde(rename = "24h")]
    TwentyFourHour,
    #[serde(rename = "12h")]
    TwelveHour,
}

impl ClockFormat {
    /// The other format.
    pub fn toggled(self) -> Self {
        match self {
            ClockFormat::TwentyFourHour => ClockFormat::TwelveHour,
            ClockFormat::TwelveHour => ClockFormat::TwentyFourHour,
        }
    }
}

impl fmt::Display for ClockFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClockFormat::TwentyFourHour => f.write_str("24h"),
            ClockFormat::TwelveHour => f.write_str("12h"),
        }
    }
}

impl FromStr for ClockFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "24h" | "24" => Ok(ClockFormat::TwentyFourHour),
            "12h" | "12" => Ok(ClockFormat::TwelveHour),
            other => Err(format!("unknown clock format '{other}', expected 12h or 24h")),
        }
    }
}

/// Supplies the current wall-clock time of day.
pub trait ClockSource: Send + Sync {
    fn now(&self) -> TimeOfDay;
}

/// Reads the local system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalClock;

impl ClockSource for LocalClock {
    fn now(&self) -> TimeOfDay {
        TimeOfDay::from_naive(Local::now().time())
    }
}

/// A clock that only moves when told to. Used for simulations and tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    seconds: AtomicU32,
}

impl ManualClock {
    pub fn new(start: TimeOfDay) -> Self {
        Self {
            seconds: AtomicU32::new(start.as_seconds()),
        }
    }

    pub fn set(&self, time: TimeOfDay) {
        self.seconds.store(time.as_seconds(), Ordering::SeqCst);
    }

    /// Moves the clock forward and returns the new time.
    pub fn advance(&self, seconds: u32) -> TimeOfDay {
        let next = self.now().plus_seconds(seconds);
        self.set(next);
        next
    }
}

impl ClockSource for ManualClock {
    fn now(&self) -> TimeOfDay {
        TimeOfDay::from_seconds(self.seconds.load(Ordering::SeqCst))
    }
}

/// One beat of the system clock.
#[derive(Debug, Clone)]
pub struct TickEvent {
    /// Monotonic count of ticks since the clock started.
    pub tick_count: u64,
    /// When the tick was produced.
    pub timestamp: Instant,
    /// The clock source's reading for this tick.
    pub time_of_day: TimeOfDay,
}

/// Periodic ticker that samples a [`ClockSource`] and broadcasts [`TickEvent`]s.
pub(crate) struct SystemClock {
    resolution: ClockResolution,
    source: Arc<dyn ClockSource>,
    tick_sender: broadcast::Sender<Arc<TickEvent>>,
}

impl SystemClock {
    pub(crate) fn new(
        resolution: ClockResolution,
        source: Arc<dyn ClockSource>,
        tick_sender: broadcast::Sender<Arc<TickEvent>>,
    ) -> Self {
        Self {
            resolution,
            source,
            tick_sender,
        }
    }

    /// Ticks until the shutdown channel fires or is dropped.
    pub(crate) async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) {
        let period = self.resolution.tick_period();
        let mut interval = tokio::time::interval(period);
        // A late tick is still a tick; bursts would only repeat the same second.
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!("SystemClock ticking every {:?}.", period);

        let mut tick_count: u64 = 0;
        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.recv() => break,
                instant = interval.tick() => {
                    tick_count += 1;
                    let event = TickEvent {
                        tick_count,
                        timestamp: instant,
                        time_of_day: self.source.now(),
                    };
                    trace!("Tick #{} at {}.", tick_count, event.time_of_day);
                    // No subscribers is fine; the dispatcher may not be up yet.
                    self.tick_sender.send(Arc::new(event)).ok();
                }
            }
        }
        info!("SystemClock stopped after {} ticks.", tick_count);
    }
}
