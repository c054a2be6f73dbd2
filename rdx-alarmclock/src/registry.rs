//! The alarm registry: an insertion-ordered collection of alarm entries.
//!
//! The registry is plain data with no locking of its own. The engine keeps it
//! behind a single lock so user mutations and the matcher's
//! read-compare-mutate step never interleave.

use crate::common::AlarmId;
use crate::error::{DuplicateError, SelectionError};
use crate::time::TimeOfDay;
use slotmap::SlotMap;
use std::fmt;
use tracing::debug;

/// Lifecycle of a single alarm.
///
/// `Enabled → Fired → Acknowledged` is the automatic path. `Disabled` is only
/// reached through an explicit user action, and `enable` re-arms from any state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlarmState {
    /// Eligible for matching on the next tick.
    Enabled,
    /// Turned off by the user before it fired.
    Disabled,
    /// Matched the clock and is ringing until acknowledged.
    Fired,
    /// Fired and silenced by the user.
    Acknowledged,
}

impl fmt::Display for AlarmState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AlarmState::Enabled => "ACTIVE",
            AlarmState::Disabled => "INACTIVE",
            AlarmState::Fired => "RINGING",
            AlarmState::Acknowledged => "SILENCED",
        };
        f.write_str(label)
    }
}

/// A single registered alarm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmEntry {
    pub id: AlarmId,
    pub time_of_day: TimeOfDay,
    pub state: AlarmState,
}

impl AlarmEntry {
    pub fn is_enabled(&self) -> bool {
        self.state == AlarmState::Enabled
    }

    pub fn is_ringing(&self) -> bool {
        self.state == AlarmState::Fired
    }
}

/// Produced when an enabled alarm matches the current time of day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmFired {
    pub id: AlarmId,
    pub time_of_day: TimeOfDay,
}

/// Insertion-ordered alarm storage.
#[derive(Debug, Default)]
pub struct AlarmRegistry {
    entries: SlotMap<AlarmId, AlarmEntry>,
    order: Vec<AlarmId>,
}

impl AlarmRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a new enabled alarm.
    ///
    /// Fails if an enabled alarm already exists at the same time of day.
    /// Disabled or already-fired alarms at that time do not block the add.
    pub fn add(&mut self, time_of_day: TimeOfDay) -> Result<AlarmId, DuplicateError> {
        self.ensure_unique(time_of_day, None)?;
        let id = self.entries.insert_with_key(|id| AlarmEntry {
            id,
            time_of_day,
            state: AlarmState::Enabled,
        });
        self.order.push(id);
        debug!("Alarm {:?} added for {}.", id, time_of_day);
        Ok(id)
    }

    /// Marks an enabled alarm as disabled.
    ///
    /// Returns `true` if the alarm changed. Unknown ids and alarms that are not
    /// enabled are left alone.
    pub fn disable(&mut self, id: AlarmId) -> bool {
        match self.entries.get_mut(id) {
            Some(entry) if entry.is_enabled() => {
                entry.state = AlarmState::Disabled;
                debug!("Alarm {:?} disabled.", id);
                true
            }
            _ => false,
        }
    }

    /// Re-arms an alarm that is not currently enabled.
    ///
    /// Returns `Ok(true)` if the alarm changed and `Ok(false)` for unknown ids
    /// or alarms that are already enabled.
    pub fn enable(&mut self, id: AlarmId) -> Result<bool, DuplicateError> {
        let time_of_day = match self.entries.get(id) {
            Some(entry) if !entry.is_enabled() => entry.time_of_day,
            _ => return Ok(false),
        };
        self.ensure_unique(time_of_day, Some(id))?;
        if let Some(entry) = self.entries.get_mut(id) {
            entry.state = AlarmState::Enabled;
        }
        debug!("Alarm {:?} re-armed for {}.", id, time_of_day);
        Ok(true)
    }

    /// Moves a ringing alarm to `Acknowledged`. Returns `true` if it was ringing.
    pub fn acknowledge(&mut self, id: AlarmId) -> bool {
        match self.entries.get_mut(id) {
            Some(entry) if entry.is_ringing() => {
                entry.state = AlarmState::Acknowledged;
                debug!("Alarm {:?} acknowledged.", id);
                true
            }
            _ => false,
        }
    }

    /// Deletes an alarm, returning it if it existed.
    pub fn remove(&mut self, id: AlarmId) -> Option<AlarmEntry> {
        let removed = self.entries.remove(id)?;
        self.order.retain(|other| *other != id);
        debug!("Alarm {:?} removed.", id);
        Some(removed)
    }

    /// Deletes the alarm shown at `selection` (0-based list position).
    pub fn remove_selected(
        &mut self,
        selection: Option<usize>,
    ) -> Result<AlarmEntry, SelectionError> {
        let position = selection.ok_or(SelectionError::NothingSelected)?;
        let id = self.id_at(position).ok_or(SelectionError::OutOfRange {
            position,
            len: self.len(),
        })?;
        self.remove(id).ok_or(SelectionError::OutOfRange {
            position,
            len: self.len(),
        })
    }

    /// Deletes every alarm and returns the ids that were removed, in order.
    pub fn remove_all(&mut self) -> Vec<AlarmId> {
        self.entries.clear();
        let removed = std::mem::take(&mut self.order);
        debug!("Removed all {} alarms.", removed.len());
        removed
    }

    pub fn get(&self, id: AlarmId) -> Option<&AlarmEntry> {
        self.entries.get(id)
    }

    /// The id of the alarm at a 0-based list position.
    pub fn id_at(&self, position: usize) -> Option<AlarmId> {
        self.order.get(position).copied()
    }

    /// Entries in insertion order. The iterator is cheap to clone, so it can
    /// be restarted from the beginning.
    pub fn list(&self) -> impl Iterator<Item = &AlarmEntry> + Clone + '_ {
        self.order.iter().filter_map(|id| self.entries.get(*id))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Ids of every alarm that is currently ringing, in list order.
    pub fn ringing(&self) -> Vec<AlarmId> {
        self.list()
            .filter(|entry| entry.is_ringing())
            .map(|entry| entry.id)
            .collect()
    }

    /// Fires every enabled alarm set for `now`.
    ///
    /// Each match is moved to `Fired` before it is reported, so a second call
    /// with the same time reports nothing.
    pub fn fire_due(&mut self, now: TimeOfDay) -> Vec<AlarmFired> {
        let mut fired = Vec::new();
        for id in &self.order {
            let Some(entry) = self.entries.get_mut(*id) else {
                continue;
            };
            if entry.is_enabled() && entry.time_of_day == now {
                entry.state = AlarmState::Fired;
                fired.push(AlarmFired {
                    id: *id,
                    time_of_day: entry.time_of_day,
                });
            }
        }
        fired
    }

    fn ensure_unique(
        &self,
        time_of_day: TimeOfDay,
        except: Option<AlarmId>,
    ) -> Result<(), DuplicateError> {
        let clash = self.entries.values().any(|entry| {
            entry.is_enabled() && entry.time_of_day == time_of_day && Some(entry.id) != except
        });
        if clash {
            Err(DuplicateError { time: time_of_day })
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn tod(s: &str) -> TimeOfDay {
        s.parse().unwrap()
    }

    #[test]
    fn add_then_list_shows_one_enabled_entry() {
        let mut registry = AlarmRegistry::new();
        let id = registry.add(tod("07:00:00")).unwrap();
        let entries: Vec<_> = registry.list().collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, id);
        assert_eq!(entries[0].time_of_day, tod("07:00:00"));
        assert!(entries[0].is_enabled());
    }

    #[test]
    fn duplicate_enabled_time_is_rejected() {
        let mut registry = AlarmRegistry::new();
        registry.add(tod("08:15:30")).unwrap();
        let err = registry.add(tod("08:15:30")).unwrap_err();
        assert_eq!(err.time, tod("08:15:30"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn disabled_time_can_be_added_again() {
        let mut registry = AlarmRegistry::new();
        let first = registry.add(tod("08:15:30")).unwrap();
        registry.disable(first);
        let second = registry.add(tod("08:15:30")).unwrap();
        assert_ne!(first, second);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn list_keeps_insertion_order_and_restarts() {
        let mut registry = AlarmRegistry::new();
        for time in ["09:00:00", "06:30:00", "12:00:00"] {
            registry.add(tod(time)).unwrap();
        }
        let list = registry.list();
        let first_pass: Vec<_> = list.clone().map(|e| e.time_of_day.to_string()).collect();
        let second_pass: Vec<_> = list.map(|e| e.time_of_day.to_string()).collect();
        assert_eq!(first_pass, vec!["09:00:00", "06:30:00", "12:00:00"]);
        assert_eq!(first_pass, second_pass);
    }

    #[test]
    fn disable_is_idempotent() {
        let mut registry = AlarmRegistry::new();
        let id = registry.add(tod("10:00:00")).unwrap();
        assert!(registry.disable(id));
        let once: Vec<_> = registry.list().cloned().collect();
        assert!(!registry.disable(id));
        let twice: Vec<_> = registry.list().cloned().collect();
        assert_eq!(once, twice);
        assert_eq!(twice[0].state, AlarmState::Disabled);
    }

    #[test]
    fn unknown_ids_are_ignored() {
        let mut registry = AlarmRegistry::new();
        let id = registry.add(tod("10:00:00")).unwrap();
        registry.remove(id);
        assert!(!registry.disable(id));
        assert!(registry.remove(id).is_none());
        assert_eq!(registry.enable(id), Ok(false));
        assert!(!registry.acknowledge(id));
    }

    #[test]
    fn enable_rearms_unless_duplicate() {
        let mut registry = AlarmRegistry::new();
        let first = registry.add(tod("10:00:00")).unwrap();
        registry.disable(first);
        let second = registry.add(tod("10:00:00")).unwrap();
        assert_eq!(
            registry.enable(first),
            Err(DuplicateError {
                time: tod("10:00:00")
            })
        );
        registry.remove(second);
        assert_eq!(registry.enable(first), Ok(true));
        assert_eq!(registry.enable(first), Ok(false));
    }

    #[test]
    fn fire_due_moves_matches_to_fired_once() {
        let mut registry = AlarmRegistry::new();
        let id = registry.add(tod("08:15:30")).unwrap();
        registry.add(tod("08:15:31")).unwrap();

        let fired = registry.fire_due(tod("08:15:30"));
        assert_eq!(
            fired,
            vec![AlarmFired {
                id,
                time_of_day: tod("08:15:30")
            }]
        );
        assert_eq!(registry.get(id).unwrap().state, AlarmState::Fired);
        assert!(registry.fire_due(tod("08:15:30")).is_empty());
        assert_eq!(registry.ringing(), vec![id]);
    }

    #[test]
    fn fire_due_without_match_changes_nothing() {
        let mut registry = AlarmRegistry::new();
        registry.add(tod("08:15:30")).unwrap();
        let before: Vec<_> = registry.list().cloned().collect();
        assert!(registry.fire_due(tod("08:15:29")).is_empty());
        let after: Vec<_> = registry.list().cloned().collect();
        assert_eq!(before, after);
    }

    #[test]
    fn disabled_alarms_do_not_fire() {
        let mut registry = AlarmRegistry::new();
        let id = registry.add(tod("08:15:30")).unwrap();
        registry.disable(id);
        assert!(registry.fire_due(tod("08:15:30")).is_empty());
    }

    #[test]
    fn acknowledge_only_affects_ringing_alarms() {
        let mut registry = AlarmRegistry::new();
        let id = registry.add(tod("08:15:30")).unwrap();
        assert!(!registry.acknowledge(id));
        registry.fire_due(tod("08:15:30"));
        assert!(registry.acknowledge(id));
        assert!(!registry.acknowledge(id));
        assert_eq!(registry.get(id).unwrap().state, AlarmState::Acknowledged);
    }

    #[test]
    fn remove_selected_reports_bad_selection() {
        let mut registry = AlarmRegistry::new();
        registry.add(tod("05:00:00")).unwrap();
        let second = registry.add(tod("06:00:00")).unwrap();

        assert_eq!(
            registry.remove_selected(None),
            Err(SelectionError::NothingSelected)
        );
        assert_eq!(
            registry.remove_selected(Some(2)),
            Err(SelectionError::OutOfRange {
                position: 2,
                len: 2
            })
        );
        let removed = registry.remove_selected(Some(1)).unwrap();
        assert_eq!(removed.id, second);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn remove_all_empties_the_registry() {
        let mut registry = AlarmRegistry::new();
        let a = registry.add(tod("05:00:00")).unwrap();
        let b = registry.add(tod("06:00:00")).unwrap();
        assert_eq!(registry.remove_all(), vec![a, b]);
        assert_eq!(registry.list().count(), 0);
        assert!(registry.is_empty());
    }

    proptest! {
        #[test]
        fn any_valid_time_lists_exactly_once(h in 0u32..24, m in 0u32..60, s in 0u32..60) {
            let time = TimeOfDay::new(h, m, s).unwrap();
            let mut registry = AlarmRegistry::new();
            registry.add(time).unwrap();
            let matching: Vec<_> = registry.list().filter(|e| e.time_of_day == time).collect();
            prop_assert_eq!(matching.len(), 1);
            prop_assert!(matching[0].is_enabled());
            prop_assert!(registry.add(time).is_err());
            prop_assert_eq!(registry.len(), 1);
        }
    }
}
