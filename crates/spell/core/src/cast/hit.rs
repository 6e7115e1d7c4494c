//! Per-target hit resolution.
//!
//! A [`HitResolver`] is built for one wave of records. Each unit goes through
//! the same pass: alive snapshot check, reflect redirection, evade/immunity
//! re-check for projectiles, diminishing returns, effect application, the
//! hit extension points and finally the proc coordinator.

use tracing::{debug, trace};

use crate::env::{
    AuraApplication, CastEnv, DiminishingLevel, MissResult, RollCursor, TriggeredCast,
};
use crate::spell::{EffectKind, SpellAttributes, SpellDefinition, SpellDuration};
use crate::types::{CastId, EffectIndex, EffectMask, Location, ObjectGuid, SpellId};
use crate::world::UnitSnapshot;

use super::hooks::{HitOutcome, HookContext, HookTable};
use super::procs::{ProcCoordinator, ProcTarget};
use super::registry::UnitTarget;
use super::{CastValues, SpellTargets};

/// What resolving one unit record produced for the owning instance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UnitHit {
    /// The record landed (possibly on the caster, for reflects).
    pub landed: bool,
    /// Whoever the effects were applied to.
    pub hit_target: Option<ObjectGuid>,
    /// Alive state of the hit target after resolution.
    pub alive: bool,
    pub combo_points: i32,
}

/// Channel duration after caster modifiers and haste; `None` for zero.
pub fn channel_duration(
    env: &CastEnv<'_>,
    caster: ObjectGuid,
    spell: &SpellDefinition,
    values: &CastValues,
) -> Option<SpellDuration> {
    match values.duration_override.unwrap_or(spell.duration) {
        SpellDuration::Infinite => Some(SpellDuration::Infinite),
        SpellDuration::Finite(ms) => {
            let ms = env.world().modify_duration(caster, spell, ms);
            let ms = hasted(ms, env.world().cast_speed(caster));
            (ms > 0).then_some(SpellDuration::Finite(ms))
        }
    }
}

fn hasted(ms: u32, cast_speed: f32) -> u32 {
    (ms as f32 * cast_speed.max(0.0)) as u32
}

/// Scales `duration` by a diminishing-returns `factor` and caps it at
/// `limit_ms` for players. Infinite durations are only affected by the limit.
pub fn diminish_duration(
    duration: SpellDuration,
    factor: f32,
    limit_ms: Option<u32>,
    is_player: bool,
) -> SpellDuration {
    let limit = limit_ms.filter(|limit| is_player && *limit > 0);
    match duration {
        SpellDuration::Infinite => limit.map_or(SpellDuration::Infinite, SpellDuration::Finite),
        SpellDuration::Finite(ms) => {
            let scaled = (ms as f32 * factor) as u32;
            SpellDuration::Finite(limit.map_or(scaled, |limit| scaled.min(limit)))
        }
    }
}

struct Applied {
    combo_points: i32,
    diminished_away: bool,
}

pub struct HitResolver<'r, 'e> {
    env: CastEnv<'e>,
    cast: CastId,
    caster: ObjectGuid,
    spell: &'r SpellDefinition,
    values: &'r CastValues,
    hooks: &'r HookTable,
    procs: &'r mut ProcCoordinator,
    rolls: &'r mut RollCursor,
}

impl<'r, 'e> HitResolver<'r, 'e> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        env: CastEnv<'e>,
        cast: CastId,
        caster: ObjectGuid,
        spell: &'r SpellDefinition,
        values: &'r CastValues,
        hooks: &'r HookTable,
        procs: &'r mut ProcCoordinator,
        rolls: &'r mut RollCursor,
    ) -> Self {
        Self {
            env,
            cast,
            caster,
            spell,
            values,
            hooks,
            procs,
            rolls,
        }
    }

    fn ctx(&self) -> HookContext<'r> {
        HookContext {
            cast: self.cast,
            caster: self.caster,
            spell: self.spell,
        }
    }

    // ===== launch / immediate =====

    /// Launch extension points for every real effect.
    pub fn launch(&self) {
        let ctx = self.ctx();
        for (index, effect) in self.spell.indexed_effects() {
            if effect.is_real() && self.hooks.effect_launch(&ctx, index) {
                trace!(target: "spell::cast", cast = %self.cast, effect = %index, "launch prevented");
            }
        }
    }

    /// Effects aimed at a destination slot.
    pub fn resolve_destination(&self, effect: EffectIndex, location: &Location) {
        if self.hooks.effect_hit(&self.ctx(), effect) {
            return;
        }
        let Some(spell_effect) = self.spell.effect(effect) else {
            return;
        };
        if spell_effect.kind.triggers()
            && let Some(triggered) = spell_effect.trigger_spell
        {
            self.trigger(triggered, SpellTargets::destination(location.position).with_dst(*location));
        }
    }

    /// Effects on game objects, items and corpses.
    pub fn resolve_object(&self, guid: ObjectGuid, mask: EffectMask) {
        let ctx = self.ctx();
        for index in mask.iter() {
            if self.hooks.effect_hit_target(&ctx, index, guid) {
                continue;
            }
            if let Some(effect) = self.spell.effect(index)
                && effect.kind == EffectKind::TriggerSpell
                && let Some(triggered) = effect.trigger_spell
            {
                self.trigger(triggered, SpellTargets::none().with_object(guid));
            }
        }
    }

    // ===== units =====

    /// Resolves one unit record. Marks it processed whatever the outcome.
    pub fn resolve_unit(&mut self, record: &mut UnitTarget) -> UnitHit {
        record.processed = true;
        let world = self.env.world();

        let Some(unit) = world.unit(record.guid) else {
            debug!(target: "spell::cast", cast = %self.cast, unit = %record.guid, "target vanished");
            return UnitHit::default();
        };
        if unit.alive != record.alive {
            trace!(target: "spell::cast", cast = %self.cast, unit = %unit.guid, "alive state changed");
            return UnitHit::default();
        }

        let (hit_target, mut miss) = match (record.miss, record.reflect) {
            (MissResult::None, _) => (Some(unit), MissResult::None),
            (MissResult::Reflect, MissResult::None) => match world.unit(self.caster) {
                Some(caster) => (Some(caster), MissResult::None),
                None => (None, MissResult::Evade),
            },
            (MissResult::Reflect, reflected) => (None, reflected),
            (missed, _) => (None, missed),
        };

        if let Some(target) = hit_target.as_ref() {
            miss = self.recheck(target, record.effect_mask);
        }
        let ctx = self.ctx();
        let target_guid = hit_target.as_ref().map_or(record.guid, |target| target.guid);
        self.hooks.before_hit(&ctx, target_guid, miss);

        let mut outcome = HitOutcome::default();
        let mut combo_points = 0;
        let mut alive = false;

        if let (Some(target), MissResult::None) = (hit_target.as_ref(), miss) {
            match self.diminishing(target) {
                Some(level) if level.is_immune() => {
                    miss = MissResult::Immune;
                }
                level => {
                    let applied = self.apply_effects(record, target, level, &mut outcome);
                    combo_points = applied.combo_points;
                    if applied.diminished_away {
                        miss = MissResult::Immune;
                    }
                }
            }
        }

        if miss == MissResult::None && let Some(target) = hit_target.as_ref() {
            self.hooks.on_hit(&ctx, target.guid, &mut outcome);
            if outcome.damage > 0 {
                self.env
                    .combat()
                    .deal_damage(self.caster, target.guid, self.spell.id, outcome.damage);
            }
            if outcome.healing > 0 {
                self.env
                    .combat()
                    .deal_healing(self.caster, target.guid, self.spell.id, outcome.healing);
            }
            record.damage = outcome.damage;
            record.healing = outcome.healing;
            alive = world.unit(target.guid).is_some_and(|unit| unit.alive);
        }

        self.procs.on_target_hit(
            &self.env,
            self.spell,
            &ProcTarget {
                target: target_guid,
                effect_mask: record.effect_mask,
                miss,
                crit: record.crit,
                damage: outcome.damage,
                healing: outcome.healing,
            },
            self.rolls,
        );

        if miss == MissResult::None {
            self.hooks.after_hit(&ctx, target_guid);
        }

        trace!(
            target: "spell::cast",
            cast = %self.cast,
            unit = %record.guid,
            miss = %miss,
            damage = outcome.damage,
            healing = outcome.healing,
            "unit resolved"
        );
        UnitHit {
            landed: miss == MissResult::None,
            hit_target: (miss == MissResult::None).then_some(target_guid),
            alive,
            combo_points,
        }
    }

    /// Evade, and for projectiles immunity gained while in flight.
    fn recheck(&self, target: &UnitSnapshot, mask: EffectMask) -> MissResult {
        let world = self.env.world();
        if target.guid != self.caster && world.is_evading(target.guid) {
            return MissResult::Evade;
        }
        if self.spell.has_hit_delay()
            && !mask.is_empty()
            && mask
                .iter()
                .all(|index| world.is_immune(target.guid, self.spell, index))
        {
            return MissResult::Immune;
        }
        MissResult::None
    }

    /// Current level for the spell's diminishing group, when it applies an aura.
    fn diminishing(&self, target: &UnitSnapshot) -> Option<DiminishingLevel> {
        let rule = self.spell.diminishing?;
        if self.spell.aura_effects_mask().is_empty() {
            return None;
        }
        Some(self.env.auras().diminishing_level(target.guid, rule.group))
    }

    /// Applies every effect of the record to `target`.
    fn apply_effects(
        &mut self,
        record: &mut UnitTarget,
        target: &UnitSnapshot,
        level: Option<DiminishingLevel>,
        outcome: &mut HitOutcome,
    ) -> Applied {
        let ctx = self.ctx();
        let combat = self.env.combat();
        let mut aura_mask = EffectMask::EMPTY;
        let mut combo_points = 0;

        for index in record.effect_mask.iter() {
            let Some(effect) = self.spell.effect(index) else {
                continue;
            };
            if self.hooks.effect_hit_target(&ctx, index, target.guid) {
                continue;
            }
            match effect.kind {
                kind if kind.deals_damage() => {
                    outcome.damage += combat.effect_damage(
                        self.caster,
                        target.guid,
                        self.spell,
                        index,
                        record.crit,
                    );
                }
                EffectKind::Heal => {
                    outcome.healing += combat.effect_healing(
                        self.caster,
                        target.guid,
                        self.spell,
                        index,
                        record.crit,
                    );
                }
                EffectKind::ApplyAura | EffectKind::PersistentAreaAura => aura_mask.insert(index),
                EffectKind::AddComboPoints => combo_points += effect.base_points,
                EffectKind::TriggerSpell => {
                    if let Some(triggered) = effect.trigger_spell {
                        self.trigger(triggered, SpellTargets::unit(target.guid));
                    }
                }
                EffectKind::TriggerMissile => {
                    if let Some(triggered) = effect.trigger_spell {
                        self.trigger(triggered, SpellTargets::destination(target.position));
                    }
                }
                _ => {}
            }
        }

        let diminished_away =
            !aura_mask.is_empty() && !self.apply_aura(record, target, aura_mask, level);
        Applied {
            combo_points,
            diminished_away,
        }
    }

    /// Returns false when diminishing returns reduced the duration to nothing.
    fn apply_aura(
        &mut self,
        record: &mut UnitTarget,
        target: &UnitSnapshot,
        mask: EffectMask,
        level: Option<DiminishingLevel>,
    ) -> bool {
        let world = self.env.world();
        let auras = self.env.auras();

        let mut duration = match self.values.duration_override.unwrap_or(self.spell.duration) {
            SpellDuration::Infinite => SpellDuration::Infinite,
            SpellDuration::Finite(ms) => {
                let mut ms = world.modify_duration(self.caster, self.spell, ms);
                if self.spell.is_channeled()
                    || self.spell.has_attribute(SpellAttributes::HASTE_AFFECTS_DURATION)
                {
                    ms = hasted(ms, world.cast_speed(self.caster));
                }
                SpellDuration::Finite(ms)
            }
        };

        if let (Some(rule), Some(level)) = (self.spell.diminishing, level) {
            let factor = level.factor().unwrap_or(0.0);
            duration = diminish_duration(duration, factor, rule.limit_ms, target.is_player);
            record.diminishing = Some((rule.group, level));
            auras.increment_diminishing(target.guid, rule.group);
            if duration.is_zero() {
                return false;
            }
        }

        record.aura = auras.create_or_refresh(&AuraApplication {
            cast: self.cast,
            spell: self.spell.id,
            caster: self.caster,
            target: target.guid,
            effect_mask: mask,
            duration,
        });
        true
    }

    fn trigger(&self, spell: SpellId, targets: SpellTargets) {
        self.env.procs().trigger_spell(TriggeredCast {
            caster: self.caster,
            spell,
            targets,
            triggered_by: self.spell.id,
            original_cast: self.cast,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diminishing_halves_then_quarters() {
        let base = SpellDuration::Finite(8000);
        assert_eq!(diminish_duration(base, 1.0, None, true), SpellDuration::Finite(8000));
        assert_eq!(diminish_duration(base, 0.5, None, true), SpellDuration::Finite(4000));
        assert_eq!(diminish_duration(base, 0.25, None, true), SpellDuration::Finite(2000));
        assert!(diminish_duration(base, 0.0, None, true).is_zero());
    }

    #[test]
    fn limit_only_binds_players() {
        let base = SpellDuration::Finite(12_000);
        assert_eq!(
            diminish_duration(base, 1.0, Some(10_000), true),
            SpellDuration::Finite(10_000)
        );
        assert_eq!(
            diminish_duration(base, 1.0, Some(10_000), false),
            SpellDuration::Finite(12_000)
        );
        assert_eq!(
            diminish_duration(SpellDuration::Infinite, 0.5, Some(10_000), true),
            SpellDuration::Finite(10_000)
        );
    }

    #[test]
    fn haste_scales_down() {
        assert_eq!(hasted(3000, 0.5), 1500);
        assert_eq!(hasted(3000, 1.0), 3000);
    }
}
