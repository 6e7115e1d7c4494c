//! Channel bookkeeping: who the channel is bound to, when it ends and how
//! damage pushes it back.

use tracing::{debug, trace};

use crate::env::CastEnv;
use crate::spell::{SpellAttributes, SpellDefinition, SpellDuration};
use crate::types::{EffectMask, Location, ObjectGuid};
use crate::world::UnitSnapshot;

use super::registry::TargetRegistry;

/// Objects and destination a running channel is bound to. Later casts of the
/// same caster resolve their channel-target descriptors against it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChannelLink {
    pub objects: Vec<ObjectGuid>,
    pub dst: Option<Location>,
}

impl ChannelLink {
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty() && self.dst.is_none()
    }
}

/// Remaining channel time; `None` while the channel runs until cancelled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ChannelTimer {
    Finite(u32),
    Infinite,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChannelController {
    /// Effects that must keep at least one eligible target.
    keep_alive: EffectMask,
    total_ms: Option<u32>,
    timer: ChannelTimer,
    link: ChannelLink,
    armed: bool,
}

impl Default for ChannelController {
    fn default() -> Self {
        Self {
            keep_alive: EffectMask::EMPTY,
            total_ms: None,
            timer: ChannelTimer::Finite(0),
            link: ChannelLink::default(),
            armed: false,
        }
    }
}

impl ChannelController {
    pub fn arm(&mut self, duration: SpellDuration) {
        self.armed = true;
        match duration {
            SpellDuration::Finite(ms) => {
                self.total_ms = Some(ms);
                self.timer = ChannelTimer::Finite(ms);
            }
            SpellDuration::Infinite => {
                self.total_ms = None;
                self.timer = ChannelTimer::Infinite;
            }
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Remaining milliseconds, `None` for an infinite channel.
    pub fn remaining_ms(&self) -> Option<u32> {
        match self.timer {
            ChannelTimer::Finite(ms) => Some(ms),
            ChannelTimer::Infinite => None,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.timer == ChannelTimer::Finite(0)
    }

    pub fn link(&self) -> &ChannelLink {
        &self.link
    }

    /// Records a target that was hit while alive.
    pub fn mark_target(&mut self, guid: ObjectGuid, mask: EffectMask) {
        self.keep_alive |= mask;
        if !self.link.objects.contains(&guid) {
            self.link.objects.push(guid);
        }
    }

    pub fn set_destination(&mut self, location: Option<Location>) {
        self.link.dst = location;
    }

    /// Counts the timer down; returns true once it reached zero.
    pub fn tick(&mut self, elapsed_ms: u32) -> bool {
        if let ChannelTimer::Finite(ms) = self.timer {
            self.timer = ChannelTimer::Finite(ms.saturating_sub(elapsed_ms));
        }
        self.is_expired()
    }

    pub fn disarm(&mut self) {
        self.armed = false;
        self.timer = ChannelTimer::Finite(0);
        self.link = ChannelLink::default();
    }

    /// Drops targets that died, left range or line of sight, or lost the
    /// channel aura; the channel aura is removed from dropped targets.
    ///
    /// Returns false once some keep-alive effect has no eligible target left;
    /// the channel then ends on this tick.
    pub fn prune(
        &mut self,
        env: &CastEnv<'_>,
        caster: &UnitSnapshot,
        spell: &SpellDefinition,
        registry: &mut TargetRegistry,
        ignore_line_of_sight: bool,
    ) -> bool {
        if self.keep_alive.is_empty() {
            return true;
        }

        let world = env.world();
        let auras = env.auras();
        let aura_mask = spell.aura_effects_mask() & self.keep_alive;
        let range = {
            let range = spell.max_range(spell.is_positive());
            range + env.config().channel_range_tolerance.min(range * 0.1)
        };

        let mut uncovered = self.keep_alive;
        for record in registry.units_mut() {
            if !record.is_hit() || !record.effect_mask.intersects(self.keep_alive) {
                continue;
            }
            let unit = if record.guid == caster.guid {
                Some(caster.clone())
            } else {
                world.unit(record.guid)
            };
            let Some(unit) = unit else {
                self.link.objects.retain(|guid| *guid != record.guid);
                continue;
            };
            if !spell.accepts_life_state(unit.alive) {
                if record.effect_mask.intersects(aura_mask) {
                    if let Some(handle) = record
                        .aura
                        .filter(|handle| auras.is_applied(*handle))
                        .or_else(|| auras.find(unit.guid, spell.id, caster.guid))
                    {
                        auras.remove(handle);
                    }
                    record.effect_mask = record.effect_mask.difference(aura_mask);
                    record.aura = None;
                }
                trace!(target: "spell::channel", unit = %unit.guid, "channel target died");
                self.link.objects.retain(|guid| *guid != unit.guid);
                continue;
            }

            if record.effect_mask.intersects(aura_mask) {
                let handle = record
                    .aura
                    .filter(|handle| auras.is_applied(*handle))
                    .or_else(|| auras.find(unit.guid, spell.id, caster.guid));
                let Some(handle) = handle else {
                    trace!(target: "spell::channel", unit = %unit.guid, "channel aura gone");
                    self.link.objects.retain(|guid| *guid != unit.guid);
                    continue;
                };

                let lost = unit.guid != caster.guid
                    && (!caster.position.is_within(&unit.position, range)
                        || (!ignore_line_of_sight
                            && !env
                                .spatial()
                                .line_of_sight(&caster.position, &unit.position)));
                if lost {
                    debug!(target: "spell::channel", unit = %unit.guid, "channel target lost");
                    record.effect_mask = record.effect_mask.difference(aura_mask);
                    record.aura = None;
                    auras.remove(handle);
                    self.link.objects.retain(|guid| *guid != unit.guid);
                    continue;
                }
            }

            uncovered = uncovered.difference(record.effect_mask);
        }

        uncovered.is_empty()
    }

    /// Damage pushback while channelling: shortens the remaining time by 25% of
    /// the full duration, reduced by the caster's resistance. Returns the time
    /// removed, if any.
    pub fn pushback(
        &mut self,
        env: &CastEnv<'_>,
        caster: ObjectGuid,
        spell: &SpellDefinition,
        registry: &TargetRegistry,
        reduction_pct: u32,
    ) -> Option<u32> {
        let (Some(total), ChannelTimer::Finite(remaining)) = (self.total_ms, self.timer) else {
            return None;
        };
        if reduction_pct >= 100 || spell.has_attribute(SpellAttributes::NO_PUSHBACK) {
            return None;
        }

        let pct = u64::from(env.config().channel_pushback_pct);
        let base = u64::from(total) * pct / 100;
        let delay = (base * u64::from(100 - reduction_pct) / 100) as u32;
        let delay = delay.min(remaining);
        self.timer = ChannelTimer::Finite(remaining - delay);

        let auras = env.auras();
        for record in registry.units().iter().filter(|record| record.is_hit()) {
            if let Some(handle) = record
                .aura
                .or_else(|| auras.find(record.guid, spell.id, caster))
            {
                auras.delay(handle, delay);
            }
        }
        Some(delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finite_timer_counts_down_to_expiry() {
        let mut channel = ChannelController::default();
        channel.arm(SpellDuration::Finite(1000));

        assert!(!channel.tick(400));
        assert_eq!(channel.remaining_ms(), Some(600));
        assert!(channel.tick(700));
        assert_eq!(channel.remaining_ms(), Some(0));
    }

    #[test]
    fn infinite_timer_never_expires() {
        let mut channel = ChannelController::default();
        channel.arm(SpellDuration::Infinite);

        assert!(!channel.tick(u32::MAX));
        assert_eq!(channel.remaining_ms(), None);
    }

    #[test]
    fn marking_targets_builds_the_link() {
        let mut channel = ChannelController::default();
        channel.mark_target(ObjectGuid(4), EffectMask::from_bits(0b01));
        channel.mark_target(ObjectGuid(4), EffectMask::from_bits(0b10));
        channel.mark_target(ObjectGuid(5), EffectMask::from_bits(0b01));

        assert_eq!(channel.keep_alive.bits(), 0b11);
        assert_eq!(channel.link().objects, vec![ObjectGuid(4), ObjectGuid(5)]);

        channel.disarm();
        assert!(channel.link().is_empty());
    }
}
