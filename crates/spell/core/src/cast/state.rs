use bitflags::bitflags;

use crate::spell::{SpellDefinition, SpellDuration};

/// Lifecycle state of a cast instance.
///
/// `None → Preparing → {Casting | Delayed | Finished} → {Idle | Finished}`;
/// `Finished` is terminal and `Idle` is reachable by auto-repeat casts only.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Default, strum::Display, strum::AsRefStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum CastState {
    #[default]
    None,
    Preparing,
    /// Channel running.
    Casting,
    /// Projectiles in flight.
    Delayed,
    /// Auto-repeat waiting for the next shot.
    Idle,
    Finished,
}

impl CastState {
    pub fn is_finished(self) -> bool {
        self == Self::Finished
    }

    /// States in which the instance still owns a category slot.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            Self::Preparing | Self::Casting | Self::Delayed | Self::Idle
        )
    }
}

/// Per-caster slot category. Each caster has at most one current instance per category.
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
pub enum CastCategory {
    Generic,
    Melee,
    Channeled,
    AutoRepeat,
}

impl CastCategory {
    pub const ALL: [CastCategory; 4] = [
        CastCategory::Generic,
        CastCategory::Melee,
        CastCategory::Channeled,
        CastCategory::AutoRepeat,
    ];

    pub fn of(spell: &SpellDefinition) -> Self {
        if spell.is_next_swing() {
            Self::Melee
        } else if spell.is_auto_repeat() {
            Self::AutoRepeat
        } else if spell.is_channeled() {
            Self::Channeled
        } else {
            Self::Generic
        }
    }

    pub fn slot(self) -> usize {
        match self {
            Self::Generic => 0,
            Self::Melee => 1,
            Self::Channeled => 2,
            Self::AutoRepeat => 3,
        }
    }
}

bitflags! {
    /// Request-level switches that alter validation and timing.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    #[cfg_attr(feature = "serde", serde(transparent))]
    pub struct CastFlags: u32 {
        /// Cast started by another spell or a proc; no cast time, no GCD, no validation.
        const TRIGGERED               = 1 << 0;
        const IGNORE_COOLDOWNS        = 1 << 1;
        const IGNORE_LINE_OF_SIGHT    = 1 << 2;
        const FROM_CLIENT             = 1 << 3;
        /// Cast right away without occupying a category slot.
        const CAST_DIRECTLY           = 1 << 4;
        const IGNORE_CAST_IN_PROGRESS = 1 << 5;
        const IGNORE_GCD              = 1 << 6;
    }
}

impl CastFlags {
    pub fn is_triggered(self) -> bool {
        self.contains(Self::TRIGGERED)
    }
}

/// Per-cast numeric overrides.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CastValues {
    /// Multiplier applied to every effect radius.
    pub radius_mod: f32,
    pub max_targets: Option<u32>,
    pub duration_override: Option<SpellDuration>,
    /// Crit chance in percent replacing the combat roll's own chance.
    pub crit_chance: Option<f32>,
}

impl Default for CastValues {
    fn default() -> Self {
        Self {
            radius_mod: 1.0,
            max_targets: None,
            duration_override: None,
            crit_chance: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spell::SpellAttributes;
    use crate::types::SpellId;

    #[test]
    fn category_priority_follows_attributes() {
        let mut spell = SpellDefinition::new(SpellId(1), "probe");
        assert_eq!(CastCategory::of(&spell), CastCategory::Generic);

        spell.attributes = SpellAttributes::CHANNELED;
        assert_eq!(CastCategory::of(&spell), CastCategory::Channeled);

        spell.attributes |= SpellAttributes::AUTO_REPEAT;
        assert_eq!(CastCategory::of(&spell), CastCategory::AutoRepeat);

        spell.attributes |= SpellAttributes::ON_NEXT_SWING;
        assert_eq!(CastCategory::of(&spell), CastCategory::Melee);
    }

    #[test]
    fn finished_is_not_active() {
        assert!(CastState::Idle.is_active());
        assert!(!CastState::Finished.is_active());
        assert!(!CastState::None.is_active());
        assert_eq!(CastState::Delayed.to_string(), "delayed");
    }
}
