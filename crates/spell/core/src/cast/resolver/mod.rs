//! Implicit target selection.
//!
//! [`TargetResolver`] walks every real effect of a spell, runs the selection
//! algorithm named by each of its two descriptors and commits the survivors to
//! the cast's [`TargetRegistry`]. Effects with identical targeting share a
//! single area/cone/line/nearby search.
//!
//! Selection never touches cast state; a failure is returned as the
//! [`CastFailure`] the caller reports.
mod area;
mod chain;
mod commit;
mod filter;
mod single;
mod trajectory;

use tracing::{debug, trace};

use crate::config::CastConfig;
use crate::env::{CastEnv, RollCursor};
use crate::spell::{
    EffectKind, ImplicitTarget, SelectionCategory, SpellAttributes, SpellDefinition, TargetObject,
};
use crate::types::{CastId, EffectIndex, EffectMask, Position};
use crate::world::{UnitSnapshot, WorldObject};

use super::{CastFailure, CastFlags, CastValues, ChannelLink, HookContext, HookTable, SpellTargets};
use super::delay::travel_delay;
use super::registry::TargetRegistry;

pub(crate) use filter::CandidateCheck;

/// Borrowed view of a cast used for one selection pass.
pub struct TargetResolver<'r, 'e> {
    env: CastEnv<'e>,
    cast: CastId,
    caster: &'r UnitSnapshot,
    spell: &'r SpellDefinition,
    flags: CastFlags,
    values: &'r CastValues,
    targets: &'r mut SpellTargets,
    registry: &'r mut TargetRegistry,
    rolls: &'r mut RollCursor,
    hooks: &'r HookTable,
    channel: Option<&'r ChannelLink>,
}

impl<'r, 'e> TargetResolver<'r, 'e> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        env: CastEnv<'e>,
        cast: CastId,
        caster: &'r UnitSnapshot,
        spell: &'r SpellDefinition,
        flags: CastFlags,
        values: &'r CastValues,
        targets: &'r mut SpellTargets,
        registry: &'r mut TargetRegistry,
        rolls: &'r mut RollCursor,
        hooks: &'r HookTable,
    ) -> Self {
        Self {
            env,
            cast,
            caster,
            spell,
            flags,
            values,
            targets,
            registry,
            rolls,
            hooks,
            channel: None,
        }
    }

    /// Targets of the caster's running channel, for channel-category descriptors.
    #[must_use]
    pub fn with_channel(mut self, channel: Option<&'r ChannelLink>) -> Self {
        self.channel = channel;
        self
    }

    /// Runs selection for every real effect.
    ///
    /// Returns the smallest travel delay to wait for (the destination travel
    /// time when a destination is set, otherwise the smallest record delay).
    ///
    /// # Errors
    ///
    /// Returns the failure to report when a descriptor cannot be satisfied.
    pub fn select_all(&mut self) -> Result<u64, CastFailure> {
        let spell = self.spell;
        let mut processed = EffectMask::EMPTY;

        for (index, effect) in spell.indexed_effects() {
            if !effect.is_real() {
                continue;
            }

            self.select_implicit(index, &effect.target_a, &mut processed)?;
            self.select_implicit(index, &effect.target_b, &mut processed)?;
            self.select_by_effect_kind(index);

            if let Some(dst) = self.targets.dst {
                self.registry.set_destination(index, dst);
            }

            if spell.has_attribute(SpellAttributes::REQUIRE_ALL_TARGETS)
                && (effect.target_a.is_unit() || effect.target_b.is_unit())
                && !self.registry.has_unit_for(index)
            {
                debug!(
                    target: "spell::targets",
                    cast = %self.cast,
                    spell = %spell.id,
                    effect = %index,
                    "unit effect selected nobody"
                );
                return Err(CastFailure::BadImplicitTargets);
            }
        }

        let delay_moment = match self.targets.dst {
            Some(dst) => {
                travel_delay(spell, self.caster.position.distance(&dst.position))
            }
            None => self.registry.min_delay_ms(),
        };

        trace!(
            target: "spell::targets",
            cast = %self.cast,
            units = self.registry.units().len(),
            objects = self.registry.objects().len(),
            delay_moment,
            "selection complete"
        );
        Ok(delay_moment)
    }

    /// Dispatches one descriptor of effect `index` to its selection algorithm.
    fn select_implicit(
        &mut self,
        index: EffectIndex,
        target: &ImplicitTarget,
        processed: &mut EffectMask,
    ) -> Result<(), CastFailure> {
        let mut mask = EffectMask::single(index);

        if target.selection.is_shared() {
            if processed.intersects(mask) {
                return Ok(());
            }
            if let Some(effect) = self.spell.effect(index) {
                for (other, candidate) in self.spell.indexed_effects().skip(index.as_usize() + 1) {
                    if candidate.is_real() && effect.shares_targeting_with(candidate) {
                        mask.insert(other);
                    }
                }
            }
            *processed |= mask;
        }

        match target.selection {
            SelectionCategory::None => Ok(()),
            SelectionCategory::Default => self.select_default(index, target, mask),
            SelectionCategory::Channel => {
                self.select_channel(index, target);
                Ok(())
            }
            SelectionCategory::Nearby => self.select_nearby(index, target, mask),
            SelectionCategory::Cone => {
                self.select_cone(index, target, mask);
                Ok(())
            }
            SelectionCategory::Area => {
                self.select_area(index, target, mask);
                Ok(())
            }
            SelectionCategory::Line => {
                self.select_line(index, target, mask);
                Ok(())
            }
            SelectionCategory::Trajectory => {
                self.select_trajectory(index, target);
                Ok(())
            }
        }
    }

    /// Fallback for effects whose descriptors name no target: the explicit
    /// target (or the caster) receives the effect.
    fn select_by_effect_kind(&mut self, index: EffectIndex) {
        let spell = self.spell;
        let Some(effect) = spell.effect(index) else {
            return;
        };
        if !effect.target_a.is_none() || !effect.target_b.is_none() {
            return;
        }
        if matches!(
            effect.kind,
            EffectKind::PersistentAreaAura
                | EffectKind::Summon
                | EffectKind::TriggerMissile
                | EffectKind::Teleport
        ) {
            return;
        }

        let mask = EffectMask::single(index);
        let mut chosen = match (self.targets.unit, self.targets.item) {
            (Some(unit), _) => self.env.world().object(unit),
            (None, Some(item)) => {
                self.add_item(item, mask);
                return;
            }
            (None, None) => Some(WorldObject::Unit(self.caster.clone())),
        };

        self.hooks
            .select_object_target(&self.hook_context(), index, &mut chosen);
        if let Some(object) = chosen {
            self.commit_object(&object, mask, false, None);
        }
    }

    // ===== shared helpers =====

    fn hook_context(&self) -> HookContext<'r> {
        HookContext {
            cast: self.cast,
            caster: self.caster.guid,
            spell: self.spell,
        }
    }

    fn config(&self) -> &'e CastConfig {
        self.env.config()
    }

    /// Effect radius scaled by the cast's radius modifier.
    fn radius(&self, index: EffectIndex) -> f32 {
        self.spell
            .effect(index)
            .map_or(0.0, |effect| effect.radius * self.values.radius_mod)
    }

    /// Target cap for capped selections, `None` when unlimited.
    fn max_targets(&self) -> Option<usize> {
        let cap = self
            .values
            .max_targets
            .unwrap_or(self.spell.max_affected_targets);
        (cap > 0).then_some(cap as usize)
    }

    fn ignores_line_of_sight(&self) -> bool {
        self.spell.has_attribute(SpellAttributes::IGNORE_LINE_OF_SIGHT)
            || self.flags.contains(CastFlags::IGNORE_LINE_OF_SIGHT)
    }

    /// Explicit object target as the descriptor's object kind sees it.
    fn explicit_object(&self, object: TargetObject) -> Option<WorldObject> {
        let guid = match object {
            TargetObject::Unit | TargetObject::UnitAndDest => self.targets.unit,
            TargetObject::GameObject | TargetObject::GameObjectItem => self.targets.object,
            TargetObject::Corpse | TargetObject::CorpseEnemy | TargetObject::CorpseAlly => {
                self.targets.corpse.or(self.targets.unit)
            }
            TargetObject::Item => None,
            TargetObject::None | TargetObject::Src | TargetObject::Dest => self
                .targets
                .unit
                .or(self.targets.object)
                .or(self.targets.corpse),
        }?;
        self.env.world().object(guid)
    }

    /// Drops random candidates until at most `cap` remain.
    fn random_resize(&mut self, candidates: &mut Vec<WorldObject>, cap: usize) {
        while candidates.len() > cap {
            let last = (candidates.len() - 1) as u32;
            let pick = self.env.rng().range(self.rolls.next_seed(), 0, last) as usize;
            candidates.remove(pick);
        }
    }

    /// Orders candidates by distance from `origin`, nearest first.
    fn sort_by_distance(candidates: &mut [WorldObject], origin: &Position) {
        candidates.sort_by(|a, b| {
            let da = a.position().map_or(f32::MAX, |p| p.distance_sq(origin));
            let db = b.position().map_or(f32::MAX, |p| p.distance_sq(origin));
            da.total_cmp(&db)
        });
    }
}
