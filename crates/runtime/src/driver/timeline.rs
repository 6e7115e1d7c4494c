//! Wake-time ordered schedule of delayed casts.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::trace;

use spell_core::{CastId, EventScheduler, ObjectGuid};

type CastKey = (ObjectGuid, CastId);

#[derive(Debug, Default)]
struct State {
    now_ms: u64,
    /// Driver time of the first `schedule` call per cast.
    origins: HashMap<CastKey, u64>,
    /// Absolute wake time per cast; one pending wake each.
    wakes: HashMap<CastKey, u64>,
}

/// A delayed cast whose wake time has passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DueWake {
    pub caster: ObjectGuid,
    pub cast: CastId,
    /// Milliseconds since the cast's first `schedule` call.
    pub offset_ms: u64,
}

/// [`EventScheduler`] backed by the driver clock.
///
/// Offsets handed to `schedule` are relative to the first call made for the
/// cast; `due` converts them back when the clock has caught up.
#[derive(Debug, Default)]
pub struct Timeline {
    state: Mutex<State>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn now_ms(&self) -> u64 {
        self.state().now_ms
    }

    pub fn advance(&self, elapsed_ms: u64) -> u64 {
        let mut state = self.state();
        state.now_ms += elapsed_ms;
        state.now_ms
    }

    /// Removes and returns every wake at or before the current time, earliest
    /// first. Ties are ordered by caster and cast id.
    pub fn due(&self) -> Vec<DueWake> {
        let mut state = self.state();
        let now = state.now_ms;
        let mut due: Vec<(u64, CastKey)> = state
            .wakes
            .iter()
            .filter(|(_, wake_at)| **wake_at <= now)
            .map(|(key, wake_at)| (*wake_at, *key))
            .collect();
        due.sort();

        due.into_iter()
            .map(|(_, key)| {
                state.wakes.remove(&key);
                let origin = state.origins.get(&key).copied().unwrap_or(now);
                DueWake {
                    caster: key.0,
                    cast: key.1,
                    offset_ms: now - origin,
                }
            })
            .collect()
    }

    /// Earliest pending wake, in driver time.
    pub fn next_wake(&self) -> Option<u64> {
        self.state().wakes.values().min().copied()
    }

    pub fn pending(&self) -> usize {
        self.state().wakes.len()
    }

    /// Drops every trace of a cast that will not be woken again.
    pub fn forget(&self, caster: ObjectGuid, cast: CastId) {
        let mut state = self.state();
        state.wakes.remove(&(caster, cast));
        state.origins.remove(&(caster, cast));
    }
}

impl EventScheduler for Timeline {
    fn schedule(&self, caster: ObjectGuid, cast: CastId, wake_offset_ms: u64) {
        let mut state = self.state();
        let now = state.now_ms;
        let origin = *state.origins.entry((caster, cast)).or_insert(now);
        state.wakes.insert((caster, cast), origin + wake_offset_ms);
        trace!(
            target: "runtime::driver",
            %cast,
            %caster,
            wake_at = origin + wake_offset_ms,
            "wake scheduled"
        );
    }

    fn cancel(&self, caster: ObjectGuid, cast: CastId) {
        self.forget(caster, cast);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CASTER: ObjectGuid = ObjectGuid(1);

    #[test]
    fn offsets_are_relative_to_the_first_schedule() {
        let timeline = Timeline::new();
        timeline.advance(200);
        timeline.schedule(CASTER, CastId(1), 500);
        assert_eq!(timeline.next_wake(), Some(700));

        timeline.advance(400);
        assert!(timeline.due().is_empty());

        timeline.advance(150);
        let due = timeline.due();
        assert_eq!(
            due,
            vec![DueWake {
                caster: CASTER,
                cast: CastId(1),
                offset_ms: 550,
            }]
        );

        // rescheduling keeps the original origin
        timeline.schedule(CASTER, CastId(1), 900);
        assert_eq!(timeline.next_wake(), Some(1100));
    }

    #[test]
    fn due_wakes_come_out_earliest_first() {
        let timeline = Timeline::new();
        timeline.schedule(CASTER, CastId(1), 300);
        timeline.schedule(CASTER, CastId(2), 100);
        timeline.schedule(ObjectGuid(2), CastId(1), 200);
        timeline.advance(300);

        let order: Vec<CastKey> = timeline
            .due()
            .into_iter()
            .map(|wake| (wake.caster, wake.cast))
            .collect();
        assert_eq!(
            order,
            vec![
                (CASTER, CastId(2)),
                (ObjectGuid(2), CastId(1)),
                (CASTER, CastId(1)),
            ]
        );
        assert_eq!(timeline.pending(), 0);
    }

    #[test]
    fn cancel_forgets_the_cast() {
        let timeline = Timeline::new();
        timeline.schedule(CASTER, CastId(1), 100);
        timeline.cancel(CASTER, CastId(1));
        timeline.advance(1000);

        assert!(timeline.due().is_empty());
        assert_eq!(timeline.next_wake(), None);
    }
}
