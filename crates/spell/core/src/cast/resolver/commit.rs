//! Turning selected objects into registry records.

use tracing::trace;

use crate::env::{HitRoll, MissResult};
use crate::spell::{DamageClass, SpellAttributes};
use crate::types::{EffectMask, ObjectGuid, Position};
use crate::world::{UnitSnapshot, WorldObject};

use super::TargetResolver;
use crate::cast::delay::travel_leg;
use crate::cast::registry::{Upsert, UnitTarget};

impl TargetResolver<'_, '_> {
    /// Commits any selected object under `mask`.
    ///
    /// `validate` applies the spell's alive/dead policy to units; `los_from`
    /// overrides the point line of sight is checked from.
    pub(super) fn commit_object(
        &mut self,
        object: &WorldObject,
        mask: EffectMask,
        validate: bool,
        los_from: Option<Position>,
    ) {
        match object {
            WorldObject::Unit(unit) => self.add_unit(unit, mask, validate, los_from),
            WorldObject::GameObject(object) => self.add_placed(object.guid, object.position, mask, false),
            WorldObject::Corpse(corpse) => self.add_placed(corpse.guid, corpse.position, mask, true),
            WorldObject::Item(item) => self.add_item(item.guid, mask),
        }
    }

    /// Adds (or merges) a unit record.
    ///
    /// Effects failing line of sight or blocked by immunity are dropped from
    /// `mask` first. A unit already in the registry only gains the surviving
    /// bits; a new one gets its hit roll, travel delay and crit roll here.
    pub(super) fn add_unit(
        &mut self,
        unit: &UnitSnapshot,
        mask: EffectMask,
        validate: bool,
        los_from: Option<Position>,
    ) {
        let mut mask = self.registry.sanitize(mask);
        let is_self = unit.guid == self.caster.guid;

        if !is_self && !self.ignores_line_of_sight() {
            let from = los_from.unwrap_or(self.caster.position);
            if !self.env.spatial().line_of_sight(&from, &unit.position) {
                mask = EffectMask::EMPTY;
            }
        }
        if mask.is_empty() {
            return;
        }

        if validate && !self.spell.accepts_life_state(unit.alive) {
            return;
        }

        for index in mask.iter() {
            if self.env.world().is_immune(unit.guid, self.spell, index) {
                mask.remove(index);
            }
        }
        if mask.is_empty() {
            return;
        }

        if self.registry.merge_unit(unit.guid, mask) {
            return;
        }

        let mut record = UnitTarget::new(unit.guid, mask, unit.alive);
        record.miss = self.roll_miss(unit, is_self);
        record.delay_ms = if is_self { 0 } else { self.unit_delay(unit, mask) };

        if record.miss == MissResult::Reflect {
            record.reflect = self.env.combat().roll_hit(&HitRoll {
                caster: self.caster.guid,
                target: self.caster.guid,
                spell: self.spell,
                can_reflect: false,
                seed: self.rolls.next_seed(),
            });
            record.delay_ms += record.delay_ms / 2;
        }

        if record.miss == MissResult::None {
            record.crit = self.env.combat().roll_crit(
                self.caster.guid,
                unit.guid,
                self.spell,
                self.values.crit_chance,
                self.rolls.next_seed(),
            );
        }

        trace!(
            target: "spell::targets",
            cast = %self.cast,
            unit = %unit.guid,
            mask = %record.effect_mask,
            miss = %record.miss,
            delay_ms = record.delay_ms,
            "unit selected"
        );
        self.registry.insert_unit(record);
    }

    fn roll_miss(&mut self, unit: &UnitSnapshot, is_self: bool) -> MissResult {
        if is_self {
            return MissResult::None;
        }
        let positive = self.spell.is_positive();
        if positive && !self.env.world().is_hostile(self.caster.guid, unit.guid) {
            return MissResult::None;
        }
        let can_reflect = self.spell.damage_class == DamageClass::Magic
            && !self.spell.has_attribute(SpellAttributes::CANT_REFLECT)
            && !positive;
        self.env.combat().roll_hit(&HitRoll {
            caster: self.caster.guid,
            target: unit.guid,
            spell: self.spell,
            can_reflect,
            seed: self.rolls.next_seed(),
        })
    }

    /// Travel delay to `unit`; bouncing missiles continue from the previous
    /// unit selected for the same effects.
    fn unit_delay(&self, unit: &UnitSnapshot, mask: EffectMask) -> u64 {
        let min_distance = self.config().min_missile_distance;

        if self.spell.has_attribute(SpellAttributes::BOUNCY_CHAIN_MISSILES)
            && let Some(previous) = self.registry.last_unit_intersecting(mask)
        {
            let source = self
                .env
                .world()
                .object(previous.guid)
                .and_then(|object| object.position())
                .unwrap_or(self.caster.position);
            let distance = source.distance(&unit.position).max(min_distance);
            return previous.delay_ms + travel_leg(self.spell, distance, false);
        }

        let distance = self.caster.position.distance(&unit.position).max(min_distance);
        travel_leg(self.spell, distance, true)
    }

    /// Game objects and corpses: travel delay without bouncing.
    fn add_placed(&mut self, guid: ObjectGuid, position: Position, mask: EffectMask, corpse: bool) {
        let distance = self
            .caster
            .position
            .distance(&position)
            .max(self.config().min_missile_distance);
        let delay = travel_leg(self.spell, distance, true);
        let outcome = if corpse {
            self.registry.add_corpse(guid, mask, delay)
        } else {
            self.registry.add_object(guid, mask, delay)
        };
        if outcome == Upsert::Inserted {
            trace!(target: "spell::targets", cast = %self.cast, object = %guid, delay_ms = delay, "object selected");
        }
    }

    pub(super) fn add_item(&mut self, guid: ObjectGuid, mask: EffectMask) {
        self.registry.add_item(guid, mask);
    }
}
