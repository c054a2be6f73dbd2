//! The alarm matcher: decides which ticks need a comparison against the registry.

use crate::registry::{AlarmFired, AlarmRegistry};
use crate::time::TimeOfDay;

/// Compares the clock against the registry once per distinct second.
///
/// At resolutions above one tick per second several ticks read the same
/// second. Only the first of them is compared, so an alarm re-armed during
/// its own second waits for the next day's occurrence instead of ringing again.
#[doc(hidden)]
#[derive(Debug, Default)]
pub(crate) struct AlarmMatcher {
    last_checked: Option<TimeOfDay>,
}

impl AlarmMatcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if `now` has not been compared yet, and records it.
    pub(crate) fn claim_second(&mut self, now: TimeOfDay) -> bool {
        if self.last_checked == Some(now) {
            return false;
        }
        self.last_checked = Some(now);
        true
    }

    /// Runs one comparison for `now` if this second is still unclaimed.
    pub(crate) fn process_tick(
        &mut self,
        registry: &mut AlarmRegistry,
        now: TimeOfDay,
    ) -> Vec<AlarmFired> {
        if self.claim_second(now) {
            registry.fire_due(now)
        } else {
            Vec::new()
        }
    }
}
