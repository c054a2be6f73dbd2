//! # Alarm Clock
//!
//! A tick-driven alarm clock engine for Rust.
//!
//! The engine keeps a registry of alarms set for a time of day, samples the
//! clock once per tick, and fires every enabled alarm whose time matches the
//! current second. Fired alarms are broadcast as events; a notification sink
//! attached to the engine rings and shows them until the user acknowledges.
//!
//! ## Core Concepts
//!
//! - **Clock Source**: supplies the current time of day (`LocalClock`, or a
//!   `ManualClock` for simulations).
//! - **Alarm Registry**: an insertion-ordered list of alarms. At most one enabled
//!   alarm exists per time of day.
//! - **Matcher**: on every tick, compares the clock against every enabled alarm.
//!   A match moves the alarm to `Fired` exactly once and emits an event.
//! - **Notification Sink**: receives fired events on its own task and is told
//!   when the user silences an alarm.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use alarmclock::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // 1. Load the configuration (file and environment are both optional).
//!     let config = AlarmClockConfig::load()?;
//!
//!     // 2. Create the engine and attach a sink that rings in the terminal.
//!     let engine = AlarmClockEngine::new(config);
//!     engine.attach_sink(Arc::new(TerminalSink::new(
//!         engine.config().sound.clone(),
//!         engine.beep_interval(),
//!     )));
//!
//!     // 3. Register an alarm.
//!     engine.set_alarm("7", "30", "0").await?;
//!
//!     // 4. Run the engine. It will shut down on Ctrl+C.
//!     engine.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub const ENGINE_NAME: &str = "Alarm Clock";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Declare all the modules in the crate.
pub mod common;
pub mod components;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod notify;
pub mod registry;
pub mod time;

/// A prelude module for easy importing of the most common alarm clock types.
pub mod prelude {
    pub use crate::common::AlarmId;
    pub use crate::config::{AlarmClockConfig, ClockResolution};
    pub use crate::engine::AlarmClockEngine;
    pub use crate::error::{
        AlarmError, ConfigError, DuplicateError, ResourceMissing, SelectionError,
        ValidationError,
    };
    pub use crate::events::{AlarmEvent, SystemEvent};
    pub use crate::notify::{NotificationSink, TerminalSink};
    pub use crate::registry::{AlarmEntry, AlarmFired, AlarmState};
    pub use crate::time::{ClockFormat, ClockSource, LocalClock, ManualClock, TickEvent, TimeOfDay};
}
