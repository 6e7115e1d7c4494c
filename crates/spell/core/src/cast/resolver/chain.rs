//! Chain jumps from a primary target.

use crate::config::CastConfig;
use crate::spell::{CheckType, DamageClass, ImplicitTarget, SpellAttributes, SpellDefinition};
use crate::types::{EffectIndex, EffectMask, Position};
use crate::world::WorldObject;

use super::TargetResolver;

/// Jump radius from one chain link to the next.
fn jump_radius(spell: &SpellDefinition, heal: bool) -> f32 {
    match spell.damage_class {
        DamageClass::Melee => CastConfig::CHAIN_JUMP_MELEE,
        DamageClass::Ranged => CastConfig::CHAIN_JUMP_RANGED,
        DamageClass::Magic | DamageClass::None if heal => CastConfig::CHAIN_JUMP_HEAL,
        DamageClass::Magic | DamageClass::None => CastConfig::CHAIN_JUMP_MAGIC,
    }
}

impl TargetResolver<'_, '_> {
    /// Adds up to `chain_targets - 1` extra units jumping from `primary`.
    ///
    /// Healing chains prefer the largest health deficit within jump range of
    /// the current link. Other chains take the closest candidate of the pool;
    /// only bouncing-far chains also require it within jump range. The
    /// primary is never selected twice.
    pub(super) fn select_chain(
        &mut self,
        index: EffectIndex,
        target: &ImplicitTarget,
        primary: &WorldObject,
        mask: EffectMask,
    ) {
        let spell = self.spell;
        let Some(effect) = spell.effect(index) else {
            return;
        };
        let max_targets = effect.chain_targets.min(CastConfig::MAX_CHAIN_TARGETS);
        if max_targets <= 1 {
            return;
        }
        let Some(primary_position) = primary.position() else {
            return;
        };

        let heal = effect.kind.heals() && target.check != CheckType::Enemy;
        let from_caster = spell.has_attribute(SpellAttributes::CHAIN_FROM_CASTER);
        let bouncing_far = spell.has_attribute(SpellAttributes::AREA_TARGET_CHAIN)
            || matches!(spell.damage_class, DamageClass::Magic | DamageClass::None);
        let extra = max_targets - 1;

        let (jump, mut source) = if from_caster {
            (spell.max_range(spell.is_positive()), self.caster.position)
        } else {
            (jump_radius(spell, heal), primary_position)
        };
        let search_radius = if bouncing_far && !from_caster {
            jump * extra as f32
        } else {
            jump
        };

        let primary_guid = primary.guid();
        let mut pool = {
            let check = self.candidate_check(index, target, self.caster);
            let accept =
                |object: &WorldObject| object.guid() != primary_guid && check.accepts(object);
            self.env.spatial().find_in_area(
                &source,
                search_radius,
                target.object.type_mask(),
                &accept,
            )
        };

        let mut chosen = Vec::new();
        for _ in 0..extra {
            let pick = if heal {
                self.neediest(&pool, &source, jump)
            } else {
                self.closest(&pool, &source, bouncing_far.then_some(jump))
            };
            let Some(pick) = pick else {
                break;
            };
            let next = pool.remove(pick);
            if !from_caster && let Some(position) = next.position() {
                source = position;
            }
            chosen.push(next);
        }

        self.hooks
            .filter_area_targets(&self.hook_context(), index, &mut chosen);

        let los_from = if from_caster {
            self.caster.position
        } else {
            primary_position
        };
        for object in &chosen {
            if let WorldObject::Unit(unit) = object {
                self.add_unit(unit, mask, false, Some(los_from));
            }
        }
    }

    fn reachable(&self, from: &Position, to: &Position, jump: Option<f32>) -> bool {
        jump.is_none_or(|jump| from.is_within(to, jump))
            && (self.ignores_line_of_sight() || self.env.spatial().line_of_sight(from, to))
    }

    /// Index of the reachable unit with the largest health deficit; ties keep the first.
    fn neediest(&self, pool: &[WorldObject], from: &Position, jump: f32) -> Option<usize> {
        let mut best: Option<(usize, u32)> = None;
        for (i, object) in pool.iter().enumerate() {
            let Some(unit) = object.as_unit() else {
                continue;
            };
            if !self.reachable(from, &unit.position, Some(jump)) {
                continue;
            }
            let deficit = unit.health_deficit();
            if best.is_none_or(|(_, most)| deficit > most) {
                best = Some((i, deficit));
            }
        }
        best.map(|(i, _)| i)
    }

    /// Index of the closest object in line of sight (and within `jump`, when
    /// given); ties keep the first.
    fn closest(&self, pool: &[WorldObject], from: &Position, jump: Option<f32>) -> Option<usize> {
        let mut best: Option<(usize, f32)> = None;
        for (i, object) in pool.iter().enumerate() {
            let Some(position) = object.position() else {
                continue;
            };
            if !self.reachable(from, &position, jump) {
                continue;
            }
            let distance = from.distance_sq(&position);
            if best.is_none_or(|(_, nearest)| distance < nearest) {
                best = Some((i, distance));
            }
        }
        best.map(|(i, _)| i)
    }
}
