use crate::spell::SpellDefinition;
use crate::types::{EffectIndex, ObjectGuid, SpellId};
use crate::world::{UnitSnapshot, WorldObject};

/// Relation of a unit that single-object selection can follow.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum Relation {
    Master,
    Pet,
    Summoner,
    VehicleBase,
}

/// Weapon slot whose swing timer a cast may reset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::AsRefStr)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum AttackType {
    MainHand,
    OffHand,
    Ranged,
}

/// Object accessor and relation queries.
///
/// Replaces global object lookups; every snapshot is a copy taken at call time.
pub trait WorldOracle: Send + Sync {
    fn object(&self, guid: ObjectGuid) -> Option<WorldObject>;

    fn unit(&self, guid: ObjectGuid) -> Option<UnitSnapshot> {
        match self.object(guid)? {
            WorldObject::Unit(unit) => Some(unit),
            _ => None,
        }
    }

    fn is_hostile(&self, source: ObjectGuid, target: ObjectGuid) -> bool;

    fn is_friendly(&self, source: ObjectGuid, target: ObjectGuid) -> bool;

    fn in_party(&self, source: ObjectGuid, target: ObjectGuid) -> bool;

    /// Raid membership; party members are also raid members.
    fn in_raid(&self, source: ObjectGuid, target: ObjectGuid) -> bool;

    fn related(&self, unit: ObjectGuid, relation: Relation) -> Option<ObjectGuid>;

    /// Passenger in `seat` of `vehicle`.
    fn passenger(&self, vehicle: ObjectGuid, seat: u8) -> Option<ObjectGuid> {
        self.passengers(vehicle).get(usize::from(seat)).copied()
    }

    fn passengers(&self, vehicle: ObjectGuid) -> Vec<ObjectGuid> {
        let _ = vehicle;
        Vec::new()
    }

    /// Whether `target` ignores effect `effect` of `spell`.
    fn is_immune(&self, target: ObjectGuid, spell: &SpellDefinition, effect: EffectIndex) -> bool;

    fn is_evading(&self, unit: ObjectGuid) -> bool {
        let _ = unit;
        false
    }

    /// Cast-time multiplier; values below 1.0 are haste.
    fn cast_speed(&self, caster: ObjectGuid) -> f32 {
        let _ = caster;
        1.0
    }

    /// Percent of pushback the caster resists for `spell`.
    fn pushback_reduction_pct(&self, caster: ObjectGuid, spell: SpellId) -> u32 {
        let _ = (caster, spell);
        0
    }

    /// Caster-side duration modifiers applied to a base aura duration.
    fn modify_duration(&self, caster: ObjectGuid, spell: &SpellDefinition, duration_ms: u32) -> u32 {
        let _ = (caster, spell);
        duration_ms
    }
}

/// Caster-side bookkeeping touched when a cast starts and finishes.
pub trait CasterUpkeep: Send + Sync {
    fn combo_points(&self, caster: ObjectGuid) -> u8;

    fn clear_combo_points(&self, caster: ObjectGuid);

    fn add_combo_points(&self, caster: ObjectGuid, target: ObjectGuid, amount: i32);

    fn reset_attack_timer(&self, caster: ObjectGuid, attack: AttackType);

    fn is_attack_ready(&self, caster: ObjectGuid, attack: AttackType) -> bool;

    fn trigger_global_cooldown(&self, caster: ObjectGuid, spell: &SpellDefinition);

    fn cancel_global_cooldown(&self, caster: ObjectGuid, spell: &SpellDefinition);
}
