//! Travel delays and time-ordered resolution waves for projectile spells.
//!
//! The scheduler never sleeps. The driver calls back with the elapsed offset
//! since the cast entered `Delayed`; [`DelayScheduler::poll`] answers with what
//! is due now and when to come back. Repeated calls before the returned wake
//! offset produce a `Sleep` and change nothing.

use crate::spell::{SpellAttributes, SpellDefinition};
use crate::types::ObjectGuid;

use super::registry::TargetRegistry;

/// Travel delay in whole milliseconds for a projectile covering `distance` yards.
///
/// `launch + (FIXED_DELAY ? speed : distance / speed)` seconds, floored. A
/// spell without speed resolves after its launch delay alone.
pub fn travel_delay(spell: &SpellDefinition, distance: f32) -> u64 {
    travel_leg(spell, distance, true)
}

/// Like [`travel_delay`], optionally leaving out the launch delay. Bouncing
/// missiles pay it only on their first leg.
pub fn travel_leg(spell: &SpellDefinition, distance: f32, include_launch: bool) -> u64 {
    let launch = if include_launch {
        f64::from(spell.launch_delay.max(0.0))
    } else {
        0.0
    };
    let travel = if spell.has_attribute(SpellAttributes::FIXED_DELAY) {
        f64::from(spell.speed.max(0.0))
    } else if spell.speed > 0.0 {
        f64::from(distance.max(0.0)) / f64::from(spell.speed)
    } else {
        0.0
    };
    ((launch + travel) * 1000.0).floor() as u64
}

/// Record kind and identity due for resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DueTarget {
    Unit(ObjectGuid),
    GameObject(ObjectGuid),
    Corpse(ObjectGuid),
}

/// Work for one `handle_delayed` call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Wave {
    /// Run the launch phase first.
    pub launch: bool,
    /// Run the immediate phase (destination and item effects) once.
    pub immediate: bool,
    /// Records to resolve, in ascending delay then registry order.
    pub due: Vec<DueTarget>,
    /// Offset of the next wake, 0 when nothing remains after this wave.
    pub next_wake: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DelayPoll {
    /// Nothing to do before this offset.
    Sleep(u64),
    Wave(Wave),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DelayScheduler {
    launch_ms: u64,
    delay_moment: u64,
    single_destination: bool,
    launched: bool,
    immediate_done: bool,
}

impl DelayScheduler {
    /// `delay_moment` is the destination travel delay for single-destination
    /// casts, otherwise the smallest non-zero record delay.
    pub fn new(launch_ms: u64, delay_moment: u64, single_destination: bool) -> Self {
        Self {
            launch_ms,
            delay_moment,
            single_destination,
            launched: false,
            immediate_done: false,
        }
    }

    /// Records that the launch phase ran (also used by immediate casts).
    pub fn mark_launched(&mut self) {
        self.launched = true;
    }

    pub fn mark_immediate(&mut self) {
        self.immediate_done = true;
    }

    /// First wake after entering `Delayed`.
    pub fn first_wake(&self) -> u64 {
        if self.launch_ms > 0 {
            self.launch_ms
        } else {
            self.delay_moment
        }
    }

    /// Decides what the call at `offset` must do. Pure; the instance applies the
    /// wave and then calls [`mark_launched`](Self::mark_launched) /
    /// [`mark_immediate`](Self::mark_immediate).
    pub fn poll(&self, registry: &TargetRegistry, offset: u64) -> DelayPoll {
        let mut launch = false;
        if !self.launched {
            if self.launch_ms > offset {
                return DelayPoll::Sleep(self.launch_ms);
            }
            launch = true;
        }

        if self.single_destination && offset < self.delay_moment {
            return if launch {
                DelayPoll::Wave(Wave {
                    launch,
                    immediate: false,
                    due: Vec::new(),
                    next_wake: self.delay_moment,
                })
            } else {
                DelayPoll::Sleep(self.delay_moment)
            };
        }

        let immediate = !self.immediate_done;
        let mut due: Vec<(u64, usize, DueTarget)> = Vec::new();
        let mut next_wake: Option<u64> = None;

        let pending = pending_records(registry);
        for (order, (delay, target)) in pending.into_iter().enumerate() {
            if self.single_destination || delay <= offset {
                due.push((delay, order, target));
            } else {
                next_wake = Some(next_wake.map_or(delay, |next| next.min(delay)));
            }
        }

        if !launch && !immediate && due.is_empty() {
            if let Some(next) = next_wake {
                return DelayPoll::Sleep(next);
            }
        }

        due.sort_by_key(|(delay, order, _)| (*delay, *order));
        DelayPoll::Wave(Wave {
            launch,
            immediate,
            due: due.into_iter().map(|(_, _, target)| target).collect(),
            next_wake: next_wake.unwrap_or(0),
        })
    }
}

/// Unprocessed units, game objects and corpses with their delays, in registry order.
fn pending_records(registry: &TargetRegistry) -> Vec<(u64, DueTarget)> {
    let units = registry
        .units()
        .iter()
        .filter(|unit| !unit.processed)
        .map(|unit| (unit.delay_ms, DueTarget::Unit(unit.guid)));
    let objects = registry
        .objects()
        .iter()
        .filter(|object| !object.processed)
        .map(|object| (object.delay_ms, DueTarget::GameObject(object.guid)));
    let corpses = registry
        .corpses()
        .iter()
        .filter(|corpse| !corpse.processed)
        .map(|corpse| (corpse.delay_ms, DueTarget::Corpse(corpse.guid)));
    units.chain(objects).chain(corpses).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cast::registry::UnitTarget;
    use crate::types::{EffectMask, SpellId};

    fn projectile(speed: f32, launch_delay: f32) -> SpellDefinition {
        let mut spell = SpellDefinition::new(SpellId(1), "bolt");
        spell.speed = speed;
        spell.launch_delay = launch_delay;
        spell
    }

    fn registry_with(delays: &[(u64, u64)]) -> TargetRegistry {
        let mut registry = TargetRegistry::new(EffectMask::from_bits(1));
        for &(guid, delay) in delays {
            let mut unit = UnitTarget::new(ObjectGuid(guid), EffectMask::from_bits(1), true);
            unit.delay_ms = delay;
            registry.insert_unit(unit);
        }
        registry
    }

    fn mark(registry: &mut TargetRegistry, due: &[DueTarget]) {
        for target in due {
            if let DueTarget::Unit(guid) = target
                && let Some(unit) = registry.unit_mut(*guid)
            {
                unit.processed = true;
            }
        }
    }

    #[test]
    fn ten_yards_at_ten_per_second_is_one_second() {
        assert_eq!(travel_delay(&projectile(10.0, 0.0), 10.0), 1000);
    }

    #[test]
    fn launch_delay_and_fixed_delay() {
        assert_eq!(travel_delay(&projectile(20.0, 0.5), 10.0), 1000);

        let mut fixed = projectile(1.5, 0.0);
        fixed.attributes |= SpellAttributes::FIXED_DELAY;
        assert_eq!(travel_delay(&fixed, 80.0), 1500);

        assert_eq!(travel_delay(&projectile(0.0, 0.0), 30.0), 0);
    }

    #[test]
    fn waves_resolve_in_ascending_delay() {
        let mut registry = registry_with(&[(1, 1200), (2, 400), (3, 800), (4, 400)]);
        let mut scheduler = DelayScheduler::new(0, registry.min_delay_ms(), false);
        let mut resolved = Vec::new();
        let mut offset = scheduler.first_wake();

        loop {
            let DelayPoll::Wave(wave) = scheduler.poll(&registry, offset) else {
                panic!("expected a wave at {offset}");
            };
            if wave.launch {
                scheduler.mark_launched();
            }
            if wave.immediate {
                scheduler.mark_immediate();
            }
            mark(&mut registry, &wave.due);
            resolved.extend(wave.due.iter().copied());
            if wave.next_wake == 0 {
                break;
            }
            offset = wave.next_wake;
        }

        assert_eq!(
            resolved,
            vec![
                DueTarget::Unit(ObjectGuid(2)),
                DueTarget::Unit(ObjectGuid(4)),
                DueTarget::Unit(ObjectGuid(3)),
                DueTarget::Unit(ObjectGuid(1)),
            ]
        );
    }

    #[test]
    fn early_reentry_sleeps_without_side_effects() {
        let registry = registry_with(&[(1, 900)]);
        let mut scheduler = DelayScheduler::new(0, 900, false);
        scheduler.mark_launched();
        scheduler.mark_immediate();

        assert_eq!(scheduler.poll(&registry, 300), DelayPoll::Sleep(900));
        assert_eq!(scheduler.poll(&registry, 899), DelayPoll::Sleep(900));
    }

    #[test]
    fn launch_threshold_is_respected() {
        let registry = registry_with(&[(1, 1250)]);
        let scheduler = DelayScheduler::new(250, 1250, false);

        assert_eq!(scheduler.poll(&registry, 100), DelayPoll::Sleep(250));
        let DelayPoll::Wave(wave) = scheduler.poll(&registry, 250) else {
            panic!("launch wave expected");
        };
        assert!(wave.launch);
        assert!(wave.due.is_empty());
        assert_eq!(wave.next_wake, 1250);
    }

    #[test]
    fn single_destination_resolves_everything_at_once() {
        let registry = registry_with(&[(1, 300), (2, 2000)]);
        let mut scheduler = DelayScheduler::new(0, 1000, true);

        let DelayPoll::Wave(first) = scheduler.poll(&registry, 0) else {
            panic!("launch wave expected");
        };
        assert!(first.launch && first.due.is_empty());
        scheduler.mark_launched();

        assert_eq!(scheduler.poll(&registry, 500), DelayPoll::Sleep(1000));

        let DelayPoll::Wave(wave) = scheduler.poll(&registry, 1000) else {
            panic!("impact wave expected");
        };
        assert_eq!(wave.due.len(), 2);
        assert_eq!(wave.next_wake, 0);
    }
}
