//! Search-based selections: nearby, cone, area and line.

use std::f32::consts::PI;

use crate::config::CastConfig;
use crate::spell::{
    CheckType, ImplicitTarget, SpellAttributes, TargetCondition, TargetObject, TargetReference,
    TargetSpecial,
};
use crate::types::{EffectIndex, EffectMask, Location, Position};
use crate::world::{TypeMask, UnitSnapshot, WorldObject};

use super::{CandidateCheck, TargetResolver};
use crate::cast::CastFailure;

impl<'r, 'e> TargetResolver<'r, 'e> {
    pub(super) fn conditions(&self, index: EffectIndex) -> Option<&'r [TargetCondition]> {
        let spell = self.spell;
        spell
            .effect(index)
            .and_then(|effect| effect.conditions.as_deref())
    }

    pub(super) fn candidate_check(
        &self,
        index: EffectIndex,
        target: &ImplicitTarget,
        referer: &UnitSnapshot,
    ) -> CandidateCheck<'_> {
        CandidateCheck::new(
            self.env,
            self.caster.guid,
            self.spell,
            target.object,
            target.check,
        )
        .with_referer(Some(referer.clone()))
        .with_conditions(self.conditions(index))
    }

    fn search_types(object: TargetObject) -> TypeMask {
        match object {
            TargetObject::None | TargetObject::Src => TypeMask::WORLD,
            object => object.type_mask(),
        }
    }

    // ===== nearby =====

    /// Closest eligible object within the spell's range.
    pub(super) fn select_nearby(
        &mut self,
        index: EffectIndex,
        target: &ImplicitTarget,
        mask: EffectMask,
    ) -> Result<(), CastFailure> {
        let spell = self.spell;
        let conditions = self.conditions(index);

        if target.check == CheckType::Entry && conditions.is_none() {
            return self.select_spell_focus(index, target, mask);
        }

        let range = match target.check.uses_friendly_range() {
            Some(friendly) => spell.max_range(friendly),
            None => spell.max_range(spell.is_positive()),
        };
        let caster = self.caster.guid;
        let check = self.candidate_check(index, target, self.caster);
        let accept = |object: &WorldObject| object.guid() != caster && check.accepts(object);

        let mut chosen = self.env.spatial().find_nearby(
            &self.caster.position,
            range,
            Self::search_types(target.object),
            &accept,
        );
        self.hooks
            .select_object_target(&self.hook_context(), index, &mut chosen);
        let object = chosen.ok_or(CastFailure::NoValidTargets)?;

        match target.object {
            TargetObject::Unit | TargetObject::UnitAndDest => {
                let WorldObject::Unit(unit) = &object else {
                    return Err(CastFailure::BadImplicitTargets);
                };
                self.add_unit(unit, mask, true, None);
            }
            TargetObject::GameObject | TargetObject::GameObjectItem => {
                if !matches!(object, WorldObject::GameObject(_)) {
                    return Err(CastFailure::BadImplicitTargets);
                }
                self.commit_object(&object, mask, false, None);
            }
            TargetObject::Corpse | TargetObject::CorpseEnemy | TargetObject::CorpseAlly => {
                self.commit_object(&object, mask, true, None);
            }
            TargetObject::Dest => {
                let position = object.position().ok_or(CastFailure::BadImplicitTargets)?;
                self.set_destination(index, Location::at(position));
            }
            TargetObject::None | TargetObject::Src | TargetObject::Item => {}
        }

        self.select_chain(index, target, &object, mask);
        Ok(())
    }

    /// Entry checks without conditions can only resolve to the spell focus.
    fn select_spell_focus(
        &mut self,
        index: EffectIndex,
        target: &ImplicitTarget,
        mask: EffectMask,
    ) -> Result<(), CastFailure> {
        let Some(focus) = self.spell.required_focus else {
            return Err(CastFailure::BadImplicitTargets);
        };
        if !matches!(target.object, TargetObject::GameObject | TargetObject::Dest) {
            return Err(CastFailure::BadImplicitTargets);
        }

        let provides_focus = |object: &WorldObject| {
            object
                .as_game_object()
                .is_some_and(|go| go.spell_focus == Some(focus))
        };
        let object = self
            .env
            .spatial()
            .find_nearby(
                &self.caster.position,
                self.config().spell_focus_range,
                TypeMask::GAME_OBJECT,
                &provides_focus,
            )
            .ok_or(CastFailure::BadImplicitTargets)?;

        if target.object == TargetObject::GameObject {
            self.commit_object(&object, mask, false, None);
        } else if let Some(position) = object.position() {
            self.set_destination(index, Location::at(position));
        }
        Ok(())
    }

    pub(super) fn set_destination(&mut self, index: EffectIndex, mut location: Location) {
        self.hooks
            .select_destination(&self.hook_context(), index, &mut location);
        self.targets.dst = Some(location);
    }

    // ===== cone =====

    pub(super) fn select_cone(&mut self, index: EffectIndex, target: &ImplicitTarget, mask: EffectMask) {
        let spell = self.spell;
        let radius = self.radius(index);

        let mut angle = spell.cone_angle;
        if angle == 0.0 {
            angle = if target.special == TargetSpecial::FrontalCone {
                CastConfig::FRONTAL_CONE_ANGLE
            } else {
                self.config().default_cone_angle
            };
        }

        let mut origin = self.caster.position;
        if target.reference == TargetReference::Dest
            && let Some(dst) = self.targets.dst
            && origin.distance_2d(&dst.position) > 0.1
        {
            origin = origin.with_orientation(origin.angle_to(&dst.position));
        }

        let width = if spell.width > 0.0 {
            spell.width
        } else {
            self.caster.combat_reach
        };
        let check = self.candidate_check(index, target, self.caster);
        let accept = |object: &WorldObject| check.accepts(object);
        let types = Self::search_types(target.object);
        let spatial = self.env.spatial();

        let mut candidates = if spell.has_attribute(SpellAttributes::CONE_LINE) {
            spatial.find_along_line(&origin, radius, width, types, &accept)
        } else if spell.has_attribute(SpellAttributes::CONE_BACK) {
            let behind = origin.with_orientation(origin.orientation + PI);
            spatial.find_in_cone(&behind, radius, angle.to_radians(), types, &accept)
        } else {
            spatial.find_in_cone(&origin, radius, angle.to_radians(), types, &accept)
        };

        self.hooks
            .filter_area_targets(&self.hook_context(), index, &mut candidates);
        if let Some(cap) = self.max_targets() {
            self.random_resize(&mut candidates, cap);
        }
        for candidate in &candidates {
            self.commit_object(candidate, mask, false, None);
        }
    }

    // ===== area =====

    pub(super) fn select_area(&mut self, index: EffectIndex, target: &ImplicitTarget, mask: EffectMask) {
        let world = self.env.world();
        let referer = match target.reference {
            TargetReference::Src | TargetReference::Dest | TargetReference::Caster => {
                Some(self.caster.clone())
            }
            TargetReference::Target => self.targets.unit.and_then(|guid| world.unit(guid)),
            TargetReference::Last => match self.registry.last_unit_for(index) {
                Some(last) if last.guid == self.caster.guid => Some(self.caster.clone()),
                Some(last) => world.unit(last.guid),
                None => Some(self.caster.clone()),
            },
            TargetReference::None => None,
        };
        let Some(referer) = referer else {
            return;
        };

        let center = match target.reference {
            TargetReference::Src => self.targets.src.map(|src| src.position),
            TargetReference::Dest => self.targets.dst.map(|dst| dst.position),
            _ => Some(referer.position),
        };
        let Some(center) = center else {
            return;
        };
        let radius = self.radius(index);

        let mut candidates = match target.special {
            TargetSpecial::CasterAndPassengers => {
                let mut found = vec![WorldObject::Unit(self.caster.clone())];
                found.extend(
                    world
                        .passengers(self.caster.guid)
                        .into_iter()
                        .filter_map(|guid| world.object(guid)),
                );
                found
            }
            TargetSpecial::AllyOrRaid => match self.targets.unit.and_then(|guid| world.unit(guid)) {
                Some(unit) if !world.in_raid(self.caster.guid, unit.guid) => {
                    vec![WorldObject::Unit(unit)]
                }
                Some(unit) => self.search_area(index, target, &unit.position, radius, &referer),
                None => Vec::new(),
            },
            _ => self.search_area(index, target, &center, radius, &referer),
        };

        if target.object == TargetObject::UnitAndDest {
            let mut location = self.targets.dst.unwrap_or_else(|| Location::at(referer.position));
            location.relocate(referer.position);
            self.set_destination(index, location);
        }

        self.hooks
            .filter_area_targets(&self.hook_context(), index, &mut candidates);

        if let Some(cap) = self.max_targets() {
            if self.spell.has_attribute(SpellAttributes::PREFER_FURTHEST_TARGETS) {
                Self::sort_by_distance(&mut candidates, &center);
                candidates.reverse();
                candidates.truncate(cap);
            } else {
                self.random_resize(&mut candidates, cap);
            }
        }

        for candidate in &candidates {
            self.commit_object(candidate, mask, false, Some(center));
        }
    }

    fn search_area(
        &self,
        index: EffectIndex,
        target: &ImplicitTarget,
        center: &Position,
        radius: f32,
        referer: &UnitSnapshot,
    ) -> Vec<WorldObject> {
        let check = self.candidate_check(index, target, referer);
        let accept = |object: &WorldObject| check.accepts(object);
        self.env
            .spatial()
            .find_in_area(center, radius, Self::search_types(target.object), &accept)
    }

    // ===== line =====

    /// Objects along the ray from the caster towards the reference point.
    pub(super) fn select_line(&mut self, index: EffectIndex, target: &ImplicitTarget, mask: EffectMask) {
        let reference = match target.reference {
            TargetReference::Src => self.targets.src.map(|src| src.position),
            TargetReference::Dest => self.targets.dst.map(|dst| dst.position),
            TargetReference::Caster => Some(self.caster.position),
            TargetReference::Target => self
                .targets
                .unit
                .and_then(|guid| self.env.world().unit(guid))
                .map(|unit| unit.position),
            TargetReference::Last | TargetReference::None => None,
        };
        let Some(reference) = reference else {
            return;
        };

        let spell = self.spell;
        let mut origin = self.caster.position;
        if reference.x != origin.x || reference.y != origin.y {
            origin = origin.with_orientation(origin.angle_to(&reference));
        }
        let width = if spell.width > 0.0 {
            spell.width
        } else {
            self.caster.combat_reach
        };

        let check = self.candidate_check(index, target, self.caster);
        let accept = |object: &WorldObject| check.accepts(object);
        let mut candidates = self.env.spatial().find_along_line(
            &origin,
            self.radius(index),
            width,
            Self::search_types(target.object),
            &accept,
        );

        self.hooks
            .filter_area_targets(&self.hook_context(), index, &mut candidates);
        if let Some(cap) = self.max_targets()
            && candidates.len() > cap
        {
            Self::sort_by_distance(&mut candidates, &self.caster.position);
            candidates.truncate(cap);
        }

        for candidate in &candidates {
            self.commit_object(candidate, mask, false, None);
        }
    }
}
