use crate::spell::SpellDefinition;
use crate::types::{EffectIndex, ObjectGuid, SpellId};

/// Outcome of a hit roll.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Default, strum::Display, strum::AsRefStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum MissResult {
    #[default]
    None,
    Miss,
    Resist,
    Dodge,
    Parry,
    Block,
    Evade,
    Immune,
    Deflect,
    Absorb,
    Reflect,
}

impl MissResult {
    pub fn is_hit(self) -> bool {
        self == Self::None
    }
}

/// Inputs of a hit roll.
#[derive(Clone, Copy, Debug)]
pub struct HitRoll<'a> {
    pub caster: ObjectGuid,
    pub target: ObjectGuid,
    pub spell: &'a SpellDefinition,
    pub can_reflect: bool,
    pub seed: u64,
}

/// Combat formulas. The pipeline only decides when to call them.
pub trait CombatMath: Send + Sync {
    fn roll_hit(&self, roll: &HitRoll<'_>) -> MissResult;

    fn roll_crit(
        &self,
        caster: ObjectGuid,
        target: ObjectGuid,
        spell: &SpellDefinition,
        chance_override: Option<f32>,
        seed: u64,
    ) -> bool;

    fn effect_damage(
        &self,
        caster: ObjectGuid,
        target: ObjectGuid,
        spell: &SpellDefinition,
        effect: EffectIndex,
        crit: bool,
    ) -> u32;

    fn effect_healing(
        &self,
        caster: ObjectGuid,
        target: ObjectGuid,
        spell: &SpellDefinition,
        effect: EffectIndex,
        crit: bool,
    ) -> u32;

    fn deal_damage(&self, caster: ObjectGuid, target: ObjectGuid, spell: SpellId, amount: u32);

    fn deal_healing(&self, caster: ObjectGuid, target: ObjectGuid, spell: SpellId, amount: u32);
}
