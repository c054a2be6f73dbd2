//! Contains common, primitive types shared across the alarm clock.
//!
//! Alarm identities are slot-map keys: they are cheap to copy, never reused after
//! an alarm is deleted, and cannot be confused with list positions shown to the user.

use slotmap::new_key_type;

new_key_type! {
    /// Uniquely and safely identifies an alarm within the registry.
    ///
    /// This key is returned when an alarm is added. It stays valid until the alarm
    /// is deleted and is never handed out again afterwards, so a stale id held by
    /// a notification sink can only ever miss, never hit the wrong alarm.
    pub struct AlarmId;
}

/// Number of seconds in one calendar day.
pub const SECONDS_PER_DAY: u32 = 24 * 60 * 60;
