use crate::spell::{DiminishingGroup, SpellDuration};
use crate::types::{AuraHandle, CastId, EffectMask, ObjectGuid, SpellId};

/// Request to create or refresh the aura of `(spell, caster)` on `target`.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AuraApplication {
    pub cast: CastId,
    pub spell: SpellId,
    pub caster: ObjectGuid,
    pub target: ObjectGuid,
    pub effect_mask: EffectMask,
    pub duration: SpellDuration,
}

/// Diminishing-returns level of a unit for one group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DiminishingLevel(pub u8);

impl DiminishingLevel {
    pub const IMMUNE: Self = Self(3);

    /// Duration factor at this level; `None` once the unit is immune.
    pub fn factor(self) -> Option<f32> {
        match self.0 {
            0 => Some(1.0),
            1 => Some(0.5),
            2 => Some(0.25),
            _ => None,
        }
    }

    pub fn is_immune(self) -> bool {
        self >= Self::IMMUNE
    }
}

/// Aura storage engine. The pipeline tells it when to apply, refresh, delay
/// and remove auras, never how they are stored.
pub trait AuraStore: Send + Sync {
    /// Creates the aura, or refreshes the existing one for `(spell, caster)`.
    fn create_or_refresh(&self, application: &AuraApplication) -> Option<AuraHandle>;

    fn find(&self, target: ObjectGuid, spell: SpellId, caster: ObjectGuid) -> Option<AuraHandle>;

    fn is_applied(&self, handle: AuraHandle) -> bool;

    fn remove(&self, handle: AuraHandle);

    /// Removes every aura of `spell` from `target`, whoever cast it.
    fn remove_spell(&self, target: ObjectGuid, spell: SpellId);

    /// Shortens the remaining duration of `handle` by `delay_ms`.
    fn delay(&self, handle: AuraHandle, delay_ms: u32);

    fn has_aura(&self, target: ObjectGuid, spell: SpellId) -> bool;

    fn diminishing_level(&self, target: ObjectGuid, group: DiminishingGroup) -> DiminishingLevel;

    fn increment_diminishing(&self, target: ObjectGuid, group: DiminishingGroup);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diminishing_factors() {
        assert_eq!(DiminishingLevel(0).factor(), Some(1.0));
        assert_eq!(DiminishingLevel(1).factor(), Some(0.5));
        assert_eq!(DiminishingLevel(2).factor(), Some(0.25));
        assert_eq!(DiminishingLevel(3).factor(), None);
        assert!(DiminishingLevel(5).is_immune());
    }
}
