//! Contains the building blocks the engine drives on each tick.
//!
//! The matcher decides which ticks are compared against the registry, and the
//! ringer makes noise for an alarm until it is acknowledged. The
//! `AlarmClockEngine` and the bundled notification sink combine these.

pub(crate) mod matcher;
pub mod ringer;
