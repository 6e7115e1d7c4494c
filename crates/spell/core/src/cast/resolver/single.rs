//! Single-object, location and channel selections.

use std::f32::consts::TAU;

use tracing::warn;

use crate::env::Relation;
use crate::spell::{ImplicitTarget, TargetDirection, TargetObject, TargetReference, TargetSpecial};
use crate::types::{EffectIndex, EffectMask, Location, Position};
use crate::world::WorldObject;

use super::TargetResolver;
use crate::cast::CastFailure;

impl TargetResolver<'_, '_> {
    pub(super) fn select_default(
        &mut self,
        index: EffectIndex,
        target: &ImplicitTarget,
        mask: EffectMask,
    ) -> Result<(), CastFailure> {
        match (target.object, target.reference) {
            (TargetObject::Src, TargetReference::Caster) => {
                self.targets.src = Some(Location::at(self.caster.position));
            }
            (TargetObject::Src, _) => {}
            (TargetObject::Dest, TargetReference::Caster) => self.dest_from_caster(index, target),
            (TargetObject::Dest, TargetReference::Target) => self.dest_from_target(index, target)?,
            (TargetObject::Dest, TargetReference::Dest) => self.dest_from_dest(index, target),
            (TargetObject::Dest, _) => {}
            (_, TargetReference::Caster) => self.caster_object(index, target, mask),
            (_, TargetReference::Target) => self.target_object(index, target, mask),
            _ => {}
        }
        Ok(())
    }

    /// The caster or one of its relations.
    fn caster_object(&mut self, index: EffectIndex, target: &ImplicitTarget, mask: EffectMask) {
        let world = self.env.world();
        let caster = self.caster.guid;
        let (guid, validate) = match target.special {
            TargetSpecial::Master => (world.related(caster, Relation::Master), true),
            TargetSpecial::Pet => (world.related(caster, Relation::Pet), true),
            TargetSpecial::Summoner => (world.related(caster, Relation::Summoner), true),
            TargetSpecial::VehicleBase => (world.related(caster, Relation::VehicleBase), true),
            TargetSpecial::Passenger(seat) => (world.passenger(caster, seat), true),
            _ => (Some(caster), false),
        };

        let mut chosen = match guid {
            Some(guid) if guid == caster => Some(WorldObject::Unit(self.caster.clone())),
            Some(guid) => world.object(guid),
            None => None,
        };
        self.hooks
            .select_object_target(&self.hook_context(), index, &mut chosen);

        if let Some(object) = chosen
            && matches!(object, WorldObject::Unit(_) | WorldObject::GameObject(_))
        {
            self.commit_object(&object, mask, validate, None);
        }
    }

    /// The explicit target, followed by its chain when the effect chains.
    fn target_object(&mut self, index: EffectIndex, target: &ImplicitTarget, mask: EffectMask) {
        let mut chosen = self.explicit_object(target.object);
        self.hooks
            .select_object_target(&self.hook_context(), index, &mut chosen);

        match chosen {
            Some(object) => {
                self.commit_object(&object, mask, true, None);
                self.select_chain(index, target, &object, mask);
            }
            None => {
                if let Some(item) = self.targets.item {
                    self.add_item(item, mask);
                }
            }
        }
    }

    // ===== destinations =====

    fn dest_from_caster(&mut self, index: EffectIndex, target: &ImplicitTarget) {
        let origin = self.caster.position;
        let mut location = Location::at(origin);

        if target.direction != TargetDirection::None {
            let radius = self.radius(index);
            let reach = self.caster.combat_reach;
            let (mut distance, angle) = match target.direction {
                TargetDirection::Random => {
                    let angle = self.random_angle();
                    let distance = if radius > reach {
                        reach + (radius - reach) * self.random_unit()
                    } else {
                        radius
                    };
                    (distance, angle)
                }
                direction => (radius, direction.fixed_angle().unwrap_or(0.0)),
            };
            distance = distance.max(reach);
            location.relocate(self.move_to_first_collision(&origin, distance, angle));
        }

        self.hooks
            .select_destination(&self.hook_context(), index, &mut location);
        self.targets.dst = Some(location);
    }

    fn dest_from_target(
        &mut self,
        index: EffectIndex,
        target: &ImplicitTarget,
    ) -> Result<(), CastFailure> {
        let origin = self
            .explicit_object(TargetObject::None)
            .and_then(|object| object.position())
            .ok_or(CastFailure::BadImplicitTargets)?;
        let mut location = Location::at(origin);

        if target.direction != TargetDirection::None {
            let (distance, angle) = self.offset_for(index, target.direction);
            location.relocate(self.move_to_first_collision(&origin, distance, angle));
        }

        self.hooks
            .select_destination(&self.hook_context(), index, &mut location);
        self.targets.dst = Some(location);
        Ok(())
    }

    /// Offsets the current destination (the caster's position when unset),
    /// measuring the direction from the caster's facing.
    fn dest_from_dest(&mut self, index: EffectIndex, target: &ImplicitTarget) {
        let mut location = self
            .targets
            .dst
            .unwrap_or_else(|| Location::at(self.caster.position));

        if target.direction != TargetDirection::None {
            let (distance, angle) = self.offset_for(index, target.direction);
            let origin = location
                .position
                .with_orientation(self.caster.position.orientation);
            location.relocate(self.move_to_first_collision(&origin, distance, angle));
        }

        self.hooks
            .select_destination(&self.hook_context(), index, &mut location);
        self.targets.dst = Some(location);
    }

    /// Distance and angle of a target- or destination-relative offset.
    fn offset_for(&mut self, index: EffectIndex, direction: TargetDirection) -> (f32, f32) {
        let radius = self.radius(index);
        match direction {
            TargetDirection::Random => {
                let angle = self.random_angle();
                (radius * self.random_unit(), angle)
            }
            direction => (radius, direction.fixed_angle().unwrap_or(0.0)),
        }
    }

    fn move_to_first_collision(&self, origin: &Position, distance: f32, angle: f32) -> Position {
        let wanted = origin.project(distance, angle);
        self.env.spatial().first_collision(origin, &wanted)
    }

    fn random_unit(&mut self) -> f32 {
        self.env.rng().unit_f32(self.rolls.next_seed())
    }

    fn random_angle(&mut self) -> f32 {
        self.random_unit() * TAU
    }

    // ===== channel =====

    /// Re-targets what the caster's running channel is bound to.
    pub(super) fn select_channel(&mut self, index: EffectIndex, target: &ImplicitTarget) {
        if target.reference != TargetReference::Caster {
            warn!(
                target: "spell::targets",
                spell = %self.spell.id,
                effect = %index,
                reference = %target.reference,
                "channel selection needs a caster reference"
            );
            return;
        }
        let Some(link) = self.channel else {
            return;
        };
        let world = self.env.world();

        if target.object.is_location() {
            let mut location = if target.special == TargetSpecial::ChannelCaster {
                Some(Location::at(self.caster.position))
            } else if let Some(dst) = link.dst {
                Some(dst)
            } else {
                let mut first = link.objects.first().and_then(|guid| world.object(*guid));
                self.hooks
                    .select_object_target(&self.hook_context(), index, &mut first);
                first.and_then(|object| object.position()).map(Location::at)
            };
            if let Some(location) = location.as_mut() {
                self.hooks
                    .select_destination(&self.hook_context(), index, location);
                self.targets.dst = Some(*location);
            }
            return;
        }

        for guid in &link.objects {
            let mut chosen = world.unit(*guid).map(WorldObject::Unit);
            self.hooks
                .select_object_target(&self.hook_context(), index, &mut chosen);
            if let Some(WorldObject::Unit(unit)) = chosen {
                self.add_unit(&unit, EffectMask::single(index), true, None);
            }
        }
    }
}
