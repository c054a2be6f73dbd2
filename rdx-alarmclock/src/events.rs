//! Defines all public event types broadcast by the alarm clock engine.
//!
//! Front ends and notification sinks subscribe to these streams instead of
//! polling the registry.

use crate::common::AlarmId;
use crate::time::{ClockFormat, TimeOfDay};
use tokio::time::Instant;

/// Events related to the lifecycle of the engine itself.
#[derive(Debug, Clone)]
pub enum SystemEvent {
    /// Fired once when the engine's dispatcher loop begins.
    EngineStarted { timestamp: Instant },
    /// Fired once when the engine is about to exit.
    EngineShutdown,
    /// Fired when the display format changes.
    FormatChanged { format: ClockFormat },
}

/// Changes to the alarm registry and alarm lifecycle transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlarmEvent {
    /// A new enabled alarm was registered.
    Added { id: AlarmId, time_of_day: TimeOfDay },
    /// The user disabled an alarm before it fired.
    Disabled { id: AlarmId },
    /// The user re-armed an alarm.
    Enabled { id: AlarmId },
    /// An enabled alarm matched the clock. It is now disabled and ringing.
    Fired {
        id: AlarmId,
        time_of_day: TimeOfDay,
        /// The alarm time rendered in the display format active when it fired.
        display_time: String,
    },
    /// The user silenced a ringing alarm.
    Acknowledged { id: AlarmId },
    /// A single alarm was deleted.
    Removed { id: AlarmId },
    /// Every alarm was deleted.
    Cleared { ids: Vec<AlarmId> },
}
