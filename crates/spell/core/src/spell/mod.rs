//! Immutable spell definitions consumed by the cast pipeline.
//!
//! The catalog content is produced elsewhere (see `spell-content`); this module
//! only fixes the shape of a definition and the derived queries the pipeline
//! asks of it.
mod attributes;
mod target;

pub use attributes::SpellAttributes;
pub use target::{
    CheckType, ImplicitTarget, SelectionCategory, TargetDirection, TargetObject, TargetReference,
    TargetSpecial,
};

use crate::types::{EffectIndex, EffectMask, SpellId};

/// Damage class drives chain jump radius, proc flags and reflectability.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Default,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum DamageClass {
    #[default]
    None,
    Magic,
    Melee,
    Ranged,
}

/// What an effect does once it lands.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Default,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum EffectKind {
    /// Unused slot; never part of a target mask.
    #[default]
    None,
    Dummy,
    SchoolDamage,
    WeaponDamage,
    Heal,
    ApplyAura,
    PersistentAreaAura,
    TriggerSpell,
    TriggerMissile,
    AddComboPoints,
    Energize,
    Dispel,
    Summon,
    Teleport,
    Resurrect,
}

impl EffectKind {
    /// Real effects participate in target masks.
    pub fn is_real(self) -> bool {
        self != Self::None
    }

    pub fn applies_aura(self) -> bool {
        matches!(self, Self::ApplyAura | Self::PersistentAreaAura)
    }

    pub fn deals_damage(self) -> bool {
        matches!(self, Self::SchoolDamage | Self::WeaponDamage)
    }

    pub fn heals(self) -> bool {
        self == Self::Heal
    }

    pub fn triggers(self) -> bool {
        matches!(self, Self::TriggerSpell | Self::TriggerMissile)
    }
}

/// Diminishing-returns category shared by crowd-control spells.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum DiminishingGroup {
    Stun,
    Root,
    Fear,
    Incapacitate,
    Silence,
    Disorient,
    Taunt,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DiminishingRule {
    pub group: DiminishingGroup,
    /// Upper bound on aura duration against players, in milliseconds.
    #[cfg_attr(feature = "serde", serde(default))]
    pub limit_ms: Option<u32>,
}

/// Base duration of the spell's auras or channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SpellDuration {
    Finite(u32),
    Infinite,
}

impl SpellDuration {
    pub fn is_zero(self) -> bool {
        self == Self::Finite(0)
    }
}

impl Default for SpellDuration {
    fn default() -> Self {
        Self::Finite(0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SpellRange {
    pub min: f32,
    pub max_hostile: f32,
    pub max_friendly: f32,
}

impl SpellRange {
    pub const fn symmetric(max: f32) -> Self {
        Self {
            min: 0.0,
            max_hostile: max,
            max_friendly: max,
        }
    }

    pub fn max(&self, friendly: bool) -> f32 {
        if friendly {
            self.max_friendly
        } else {
            self.max_hostile
        }
    }
}

/// Extra predicate an implicit-target candidate must satisfy.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TargetCondition {
    Entry(u32),
    PlayersOnly,
    NonPlayers,
    HealthBelowPct(u32),
    HasAura(SpellId),
    LacksAura(SpellId),
}

/// One effect slot of a spell.
#[derive(Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SpellEffect {
    pub kind: EffectKind,
    pub target_a: ImplicitTarget,
    pub target_b: ImplicitTarget,
    pub radius: f32,
    pub chain_targets: u32,
    pub base_points: i32,
    pub amplitude_ms: u32,
    pub trigger_spell: Option<SpellId>,
    pub positive: bool,
    /// `None` means no condition list was supplied at all.
    pub conditions: Option<Vec<TargetCondition>>,
}

impl SpellEffect {
    pub fn new(kind: EffectKind, target_a: ImplicitTarget) -> Self {
        Self {
            kind,
            target_a,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_target_b(mut self, target_b: ImplicitTarget) -> Self {
        self.target_b = target_b;
        self
    }

    #[must_use]
    pub fn with_radius(mut self, radius: f32) -> Self {
        self.radius = radius;
        self
    }

    #[must_use]
    pub fn with_chain(mut self, chain_targets: u32) -> Self {
        self.chain_targets = chain_targets;
        self
    }

    #[must_use]
    pub fn with_base_points(mut self, base_points: i32) -> Self {
        self.base_points = base_points;
        self
    }

    #[must_use]
    pub fn with_trigger(mut self, trigger_spell: SpellId) -> Self {
        self.trigger_spell = Some(trigger_spell);
        self
    }

    #[must_use]
    pub fn positive(mut self) -> Self {
        self.positive = true;
        self
    }

    #[must_use]
    pub fn with_conditions(mut self, conditions: Vec<TargetCondition>) -> Self {
        self.conditions = Some(conditions);
        self
    }

    pub fn is_real(&self) -> bool {
        self.kind.is_real()
    }

    /// Effects selected together must agree on every targeting input.
    pub fn shares_targeting_with(&self, other: &SpellEffect) -> bool {
        self.target_a == other.target_a
            && self.target_b == other.target_b
            && self.conditions == other.conditions
            && self.radius == other.radius
    }
}

/// Immutable spell definition.
#[derive(Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SpellDefinition {
    pub id: SpellId,
    pub name: String,
    pub attributes: SpellAttributes,
    pub damage_class: DamageClass,
    pub cast_time_ms: u32,
    pub duration: SpellDuration,
    pub range: SpellRange,
    /// Projectile speed in yards per second (seconds with `FIXED_DELAY`).
    pub speed: f32,
    /// Seconds between the cast and the launch of the projectile.
    pub launch_delay: f32,
    /// Cone angle in degrees, zero for the configured default.
    pub cone_angle: f32,
    /// Line half-width in yards, zero for the caster's combat reach.
    pub width: f32,
    pub max_affected_targets: u32,
    pub required_focus: Option<u32>,
    pub diminishing: Option<DiminishingRule>,
    /// Global cooldown started by a successful prepare.
    pub start_recovery_ms: u32,
    pub effects: Vec<SpellEffect>,
}

impl SpellDefinition {
    pub fn new(id: SpellId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn effect(&self, index: EffectIndex) -> Option<&SpellEffect> {
        self.effects.get(index.as_usize())
    }

    /// Iterates `(index, effect)` pairs over every slot, real or not.
    pub fn indexed_effects(&self) -> impl Iterator<Item = (EffectIndex, &SpellEffect)> {
        self.effects
            .iter()
            .enumerate()
            .map(|(index, effect)| (EffectIndex(index as u8), effect))
    }

    /// Mask of every effect slot that exists and is real.
    pub fn real_effects_mask(&self) -> EffectMask {
        self.indexed_effects()
            .filter(|(_, effect)| effect.is_real())
            .map(|(index, _)| index)
            .collect()
    }

    pub fn aura_effects_mask(&self) -> EffectMask {
        self.indexed_effects()
            .filter(|(_, effect)| effect.kind.applies_aura())
            .map(|(index, _)| index)
            .collect()
    }

    pub fn has_attribute(&self, attribute: SpellAttributes) -> bool {
        self.attributes.contains(attribute)
    }

    pub fn is_channeled(&self) -> bool {
        self.has_attribute(SpellAttributes::CHANNELED)
    }

    pub fn is_auto_repeat(&self) -> bool {
        self.has_attribute(SpellAttributes::AUTO_REPEAT)
    }

    pub fn is_next_swing(&self) -> bool {
        self.has_attribute(SpellAttributes::ON_NEXT_SWING)
    }

    pub fn is_positive_effect(&self, index: EffectIndex) -> bool {
        self.effect(index).is_some_and(|effect| effect.positive)
    }

    /// A spell is positive when every real effect is.
    pub fn is_positive(&self) -> bool {
        self.effects
            .iter()
            .filter(|effect| effect.is_real())
            .all(|effect| effect.positive)
    }

    pub fn has_hit_delay(&self) -> bool {
        self.speed > 0.0 || self.launch_delay > 0.0
    }

    pub fn launch_delay_ms(&self) -> u64 {
        (f64::from(self.launch_delay) * 1000.0).floor().max(0.0) as u64
    }

    pub fn max_range(&self, friendly: bool) -> f32 {
        self.range.max(friendly)
    }

    pub fn allows_dead_target(&self) -> bool {
        self.attributes
            .intersects(SpellAttributes::ALLOW_DEAD_TARGET | SpellAttributes::REQUIRE_DEAD_TARGET)
    }

    pub fn requires_dead_target(&self) -> bool {
        self.has_attribute(SpellAttributes::REQUIRE_DEAD_TARGET)
    }

    /// Whether `alive` satisfies the spell's alive/dead policy.
    pub fn accepts_life_state(&self, alive: bool) -> bool {
        if alive {
            !self.requires_dead_target()
        } else {
            self.allows_dead_target()
        }
    }
}

/// When a table-driven linked spell fires.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LinkTrigger {
    Cast,
    Hit,
}

/// Entry of the linked-spell table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LinkedSpell {
    /// Cast the spell on the same target.
    Cast(SpellId),
    /// Remove the spell's aura from the same target.
    RemoveAura(SpellId),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SpellDefinition {
        let mut spell = SpellDefinition::new(SpellId(1), "sample");
        spell.effects = vec![
            SpellEffect::new(EffectKind::SchoolDamage, ImplicitTarget::target_enemy()),
            SpellEffect::default(),
            SpellEffect::new(EffectKind::ApplyAura, ImplicitTarget::target_enemy()),
        ];
        spell
    }

    #[test]
    fn real_mask_skips_empty_slots() {
        assert_eq!(sample().real_effects_mask().bits(), 0b101);
        assert_eq!(sample().aura_effects_mask().bits(), 0b100);
    }

    #[test]
    fn life_state_policy() {
        let mut spell = sample();
        assert!(spell.accepts_life_state(true));
        assert!(!spell.accepts_life_state(false));

        spell.attributes |= SpellAttributes::REQUIRE_DEAD_TARGET;
        assert!(!spell.accepts_life_state(true));
        assert!(spell.accepts_life_state(false));
    }

    #[test]
    fn launch_delay_rounds_down_to_ms() {
        let mut spell = sample();
        spell.launch_delay = 0.2505;
        assert_eq!(spell.launch_delay_ms(), 250);
    }
}
