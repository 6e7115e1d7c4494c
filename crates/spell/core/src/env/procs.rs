use bitflags::bitflags;

use crate::cast::SpellTargets;
use crate::types::{CastId, ObjectGuid, SpellId};

bitflags! {
    /// Attacker/victim trigger flags of a proc event.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    #[cfg_attr(feature = "serde", serde(transparent))]
    pub struct ProcFlags: u32 {
        const DONE_MELEE_AUTO_ATTACK       = 1 << 0;
        const TAKEN_MELEE_AUTO_ATTACK      = 1 << 1;
        const DONE_SPELL_MELEE_DMG_CLASS   = 1 << 2;
        const TAKEN_SPELL_MELEE_DMG_CLASS  = 1 << 3;
        const DONE_RANGED_AUTO_ATTACK      = 1 << 4;
        const TAKEN_RANGED_AUTO_ATTACK     = 1 << 5;
        const DONE_SPELL_RANGED_DMG_CLASS  = 1 << 6;
        const TAKEN_SPELL_RANGED_DMG_CLASS = 1 << 7;
        const DONE_SPELL_NONE_DMG_CLASS_POS  = 1 << 8;
        const TAKEN_SPELL_NONE_DMG_CLASS_POS = 1 << 9;
        const DONE_SPELL_NONE_DMG_CLASS_NEG  = 1 << 10;
        const TAKEN_SPELL_NONE_DMG_CLASS_NEG = 1 << 11;
        const DONE_SPELL_MAGIC_DMG_CLASS_POS  = 1 << 12;
        const TAKEN_SPELL_MAGIC_DMG_CLASS_POS = 1 << 13;
        const DONE_SPELL_MAGIC_DMG_CLASS_NEG  = 1 << 14;
        const TAKEN_SPELL_MAGIC_DMG_CLASS_NEG = 1 << 15;
        const TAKEN_DAMAGE                 = 1 << 16;
        const DONE_MAINHAND_ATTACK         = 1 << 17;
        const DONE_OFFHAND_ATTACK          = 1 << 18;

        const DONE_SPELL_POS = Self::DONE_SPELL_NONE_DMG_CLASS_POS.bits()
            | Self::DONE_SPELL_MAGIC_DMG_CLASS_POS.bits();
        const DONE_SPELL_NEG = Self::DONE_SPELL_NONE_DMG_CLASS_NEG.bits()
            | Self::DONE_SPELL_MAGIC_DMG_CLASS_NEG.bits();
    }
}

bitflags! {
    /// How the spell landed on the target.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    #[cfg_attr(feature = "serde", serde(transparent))]
    pub struct ProcHitFlags: u32 {
        const NORMAL      = 1 << 0;
        const CRITICAL    = 1 << 1;
        const MISS        = 1 << 2;
        const FULL_RESIST = 1 << 3;
        const DODGE       = 1 << 4;
        const PARRY       = 1 << 5;
        const BLOCK       = 1 << 6;
        const EVADE       = 1 << 7;
        const IMMUNE      = 1 << 8;
        const DEFLECT     = 1 << 9;
        const ABSORB      = 1 << 10;
        const REFLECT     = 1 << 11;
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    #[cfg_attr(feature = "serde", serde(transparent))]
    pub struct ProcSpellType: u8 {
        const DAMAGE     = 1 << 0;
        const HEAL       = 1 << 1;
        const NO_DMG_HEAL = 1 << 2;
    }
}

/// Pipeline phase a proc event fires in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::AsRefStr)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum ProcPhase {
    Cast,
    Hit,
    Finish,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProcEvent {
    pub cast: CastId,
    pub spell: SpellId,
    pub actor: ObjectGuid,
    pub action_target: Option<ObjectGuid>,
    pub attacker_flags: ProcFlags,
    pub victim_flags: ProcFlags,
    pub spell_type: ProcSpellType,
    pub phase: ProcPhase,
    pub hit: ProcHitFlags,
    pub damage: u32,
    pub healing: u32,
}

/// Secondary spell fired on hit with an independent chance roll.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HitTrigger {
    pub spell: SpellId,
    pub chance_pct: f32,
}

/// Cast requested by the pipeline on behalf of a proc, trigger effect or link.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TriggeredCast {
    pub caster: ObjectGuid,
    pub spell: SpellId,
    pub targets: SpellTargets,
    pub triggered_by: SpellId,
    pub original_cast: CastId,
}

/// Proc and trigger collaborator.
pub trait ProcEvaluator: Send + Sync {
    fn process(&self, event: &ProcEvent);

    /// Spells that may fire when `spell` from `caster` hits.
    fn hit_triggers(&self, caster: ObjectGuid, spell: SpellId) -> Vec<HitTrigger> {
        let _ = (caster, spell);
        Vec::new()
    }

    /// Queues a triggered cast; the driver starts it once the current phase returns.
    fn trigger_spell(&self, cast: TriggeredCast);
}
