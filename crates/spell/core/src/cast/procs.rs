//! Trigger-flag aggregation and secondary spell firing.
//!
//! Everything here runs strictly after damage and healing were applied to the
//! target being processed.

use crate::env::{
    CastEnv, HitTrigger, MissResult, ProcEvent, ProcFlags, ProcHitFlags, ProcPhase, ProcSpellType,
    RollCursor, TriggeredCast,
};
use crate::spell::{DamageClass, LinkTrigger, LinkedSpell, SpellAttributes, SpellDefinition};
use crate::types::{CastId, EffectMask, ObjectGuid};

use super::SpellTargets;

/// Per-target data the coordinator needs once a target was resolved.
#[derive(Clone, Copy, Debug)]
pub struct ProcTarget {
    pub target: ObjectGuid,
    pub effect_mask: EffectMask,
    pub miss: MissResult,
    pub crit: bool,
    pub damage: u32,
    pub healing: u32,
}

/// Trigger bookkeeping for one cast.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProcCoordinator {
    cast: CastId,
    caster: ObjectGuid,
    attacker: ProcFlags,
    victim: ProcFlags,
    hit_mask: ProcHitFlags,
    hit_triggers: Vec<HitTrigger>,
    disabled: bool,
}

impl ProcCoordinator {
    /// Computes class-derived flags and caches hit triggers for the cast.
    pub fn prepare(env: &CastEnv<'_>, cast: CastId, caster: ObjectGuid, spell: &SpellDefinition) -> Self {
        let (attacker, victim) = class_flags(spell);
        Self {
            cast,
            caster,
            attacker,
            victim,
            hit_mask: ProcHitFlags::empty(),
            hit_triggers: env.procs().hit_triggers(caster, spell.id),
            disabled: spell.has_attribute(SpellAttributes::CANT_TRIGGER_PROC),
        }
    }

    pub fn attacker_flags(&self) -> ProcFlags {
        self.attacker
    }

    pub fn victim_flags(&self) -> ProcFlags {
        self.victim
    }

    pub fn hit_mask(&self) -> ProcHitFlags {
        self.hit_mask
    }

    /// Hit flags for one landed (or failed) target.
    pub fn hit_flags(miss: MissResult, crit: bool) -> ProcHitFlags {
        match miss {
            MissResult::None if crit => ProcHitFlags::CRITICAL,
            MissResult::None => ProcHitFlags::NORMAL,
            MissResult::Miss => ProcHitFlags::MISS,
            MissResult::Resist => ProcHitFlags::FULL_RESIST,
            MissResult::Dodge => ProcHitFlags::DODGE,
            MissResult::Parry => ProcHitFlags::PARRY,
            MissResult::Block => ProcHitFlags::BLOCK,
            MissResult::Evade => ProcHitFlags::EVADE,
            MissResult::Immune => ProcHitFlags::IMMUNE,
            MissResult::Deflect => ProcHitFlags::DEFLECT,
            MissResult::Absorb => ProcHitFlags::ABSORB,
            MissResult::Reflect => ProcHitFlags::REFLECT,
        }
    }

    /// Cast-phase proc, fired once after target selection.
    pub fn on_cast(&self, env: &CastEnv<'_>, spell: &SpellDefinition) {
        if self.disabled {
            return;
        }
        let attacker = self.attacker | spell_class_flags(spell, spell.is_positive(), true);
        env.procs().process(&ProcEvent {
            cast: self.cast,
            spell: spell.id,
            actor: self.caster,
            action_target: None,
            attacker_flags: attacker,
            victim_flags: ProcFlags::empty(),
            spell_type: ProcSpellType::all(),
            phase: ProcPhase::Cast,
            hit: self.hit_mask,
            damage: 0,
            healing: 0,
        });
    }

    /// Hit-phase procs, hit triggers and hit-linked spells for one target.
    pub fn on_target_hit(
        &mut self,
        env: &CastEnv<'_>,
        spell: &SpellDefinition,
        hit: &ProcTarget,
        rolls: &mut RollCursor,
    ) {
        let hit_flags = Self::hit_flags(hit.miss, hit.crit);
        self.hit_mask |= hit_flags;

        if !self.disabled {
            let positive = is_positive_hit(spell, hit);
            let attacker = self.attacker | spell_class_flags(spell, positive, true);
            let mut victim = self.victim | spell_class_flags(spell, positive, false);
            if hit.damage > 0 {
                victim |= ProcFlags::TAKEN_DAMAGE;
            }
            env.procs().process(&ProcEvent {
                cast: self.cast,
                spell: spell.id,
                actor: self.caster,
                action_target: Some(hit.target),
                attacker_flags: attacker,
                victim_flags: victim,
                spell_type: spell_type(hit),
                phase: ProcPhase::Hit,
                hit: hit_flags,
                damage: hit.damage,
                healing: hit.healing,
            });
        }

        if hit.miss != MissResult::None {
            return;
        }

        for trigger in &self.hit_triggers {
            if env.rng().roll_chance(rolls.next_seed(), trigger.chance_pct) {
                tracing::trace!(
                    target: "spell::cast",
                    cast = %self.cast,
                    trigger = %trigger.spell,
                    target_guid = %hit.target,
                    "hit trigger fired"
                );
                env.procs().trigger_spell(TriggeredCast {
                    caster: self.caster,
                    spell: trigger.spell,
                    targets: SpellTargets::unit(hit.target),
                    triggered_by: spell.id,
                    original_cast: self.cast,
                });
            }
        }

        for link in env.spells().linked_spells(spell.id, LinkTrigger::Hit) {
            match link {
                LinkedSpell::Cast(linked) => env.procs().trigger_spell(TriggeredCast {
                    caster: hit.target,
                    spell: linked,
                    targets: SpellTargets::unit(hit.target),
                    triggered_by: spell.id,
                    original_cast: self.cast,
                }),
                LinkedSpell::RemoveAura(linked) => env.auras().remove_spell(hit.target, linked),
            }
        }
    }

    /// Finish-phase proc. Skipped entirely for spells that cannot trigger procs.
    pub fn on_finish(&self, env: &CastEnv<'_>, spell: &SpellDefinition) {
        if self.disabled {
            return;
        }
        let attacker = self.attacker | spell_class_flags(spell, spell.is_positive(), true);
        env.procs().process(&ProcEvent {
            cast: self.cast,
            spell: spell.id,
            actor: self.caster,
            action_target: None,
            attacker_flags: attacker,
            victim_flags: ProcFlags::empty(),
            spell_type: ProcSpellType::all(),
            phase: ProcPhase::Finish,
            hit: self.hit_mask,
            damage: 0,
            healing: 0,
        });
    }

    /// Linked "on cast" spells; fired once after the cast phase.
    pub fn fire_cast_links(
        &self,
        env: &CastEnv<'_>,
        spell: &SpellDefinition,
        explicit_unit: Option<ObjectGuid>,
    ) {
        for link in env.spells().linked_spells(spell.id, LinkTrigger::Cast) {
            match link {
                LinkedSpell::Cast(linked) => env.procs().trigger_spell(TriggeredCast {
                    caster: self.caster,
                    spell: linked,
                    targets: SpellTargets::unit(explicit_unit.unwrap_or(self.caster)),
                    triggered_by: spell.id,
                    original_cast: self.cast,
                }),
                LinkedSpell::RemoveAura(linked) => env.auras().remove_spell(self.caster, linked),
            }
        }
    }
}

/// Flags fixed by damage class alone. Magic and classless spells get their
/// positive/negative flags per target.
fn class_flags(spell: &SpellDefinition) -> (ProcFlags, ProcFlags) {
    match spell.damage_class {
        DamageClass::Melee => (
            ProcFlags::DONE_SPELL_MELEE_DMG_CLASS,
            ProcFlags::TAKEN_SPELL_MELEE_DMG_CLASS,
        ),
        DamageClass::Ranged if spell.is_auto_repeat() => (
            ProcFlags::DONE_RANGED_AUTO_ATTACK,
            ProcFlags::TAKEN_RANGED_AUTO_ATTACK,
        ),
        DamageClass::Ranged => (
            ProcFlags::DONE_SPELL_RANGED_DMG_CLASS,
            ProcFlags::TAKEN_SPELL_RANGED_DMG_CLASS,
        ),
        DamageClass::Magic | DamageClass::None => (ProcFlags::empty(), ProcFlags::empty()),
    }
}

fn spell_class_flags(spell: &SpellDefinition, positive: bool, attacker: bool) -> ProcFlags {
    match (spell.damage_class, positive, attacker) {
        (DamageClass::Magic, true, true) => ProcFlags::DONE_SPELL_MAGIC_DMG_CLASS_POS,
        (DamageClass::Magic, true, false) => ProcFlags::TAKEN_SPELL_MAGIC_DMG_CLASS_POS,
        (DamageClass::Magic, false, true) => ProcFlags::DONE_SPELL_MAGIC_DMG_CLASS_NEG,
        (DamageClass::Magic, false, false) => ProcFlags::TAKEN_SPELL_MAGIC_DMG_CLASS_NEG,
        (DamageClass::None, true, true) => ProcFlags::DONE_SPELL_NONE_DMG_CLASS_POS,
        (DamageClass::None, true, false) => ProcFlags::TAKEN_SPELL_NONE_DMG_CLASS_POS,
        (DamageClass::None, false, true) => ProcFlags::DONE_SPELL_NONE_DMG_CLASS_NEG,
        (DamageClass::None, false, false) => ProcFlags::TAKEN_SPELL_NONE_DMG_CLASS_NEG,
        (DamageClass::Melee | DamageClass::Ranged, _, _) => ProcFlags::empty(),
    }
}

/// Damage makes a hit negative; otherwise healing or all-positive effects make it positive.
fn is_positive_hit(spell: &SpellDefinition, hit: &ProcTarget) -> bool {
    if hit.damage > 0 {
        return false;
    }
    if hit.healing > 0 {
        return true;
    }
    hit.effect_mask
        .iter()
        .all(|effect| spell.is_positive_effect(effect))
}

fn spell_type(hit: &ProcTarget) -> ProcSpellType {
    let mut kind = ProcSpellType::empty();
    if hit.damage > 0 {
        kind |= ProcSpellType::DAMAGE;
    }
    if hit.healing > 0 {
        kind |= ProcSpellType::HEAL;
    }
    if kind.is_empty() {
        kind = ProcSpellType::NO_DMG_HEAL;
    }
    kind
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spell::{EffectKind, ImplicitTarget, SpellEffect};
    use crate::types::{EffectIndex, SpellId};

    fn spell(class: DamageClass, positive: bool) -> SpellDefinition {
        let mut spell = SpellDefinition::new(SpellId(3), "probe");
        spell.damage_class = class;
        let mut effect = SpellEffect::new(EffectKind::ApplyAura, ImplicitTarget::target_any());
        effect.positive = positive;
        spell.effects = vec![effect];
        spell
    }

    fn hit(damage: u32, healing: u32) -> ProcTarget {
        ProcTarget {
            target: ObjectGuid(2),
            effect_mask: EffectMask::single(EffectIndex(0)),
            miss: MissResult::None,
            crit: false,
            damage,
            healing,
        }
    }

    #[test]
    fn damage_makes_a_positive_spell_negative() {
        let spell = spell(DamageClass::Magic, true);
        assert!(is_positive_hit(&spell, &hit(0, 0)));
        assert!(!is_positive_hit(&spell, &hit(10, 0)));
        assert!(is_positive_hit(&spell, &hit(0, 10)));
    }

    #[test]
    fn class_flags_for_physical_spells() {
        let (attacker, victim) = class_flags(&spell(DamageClass::Melee, false));
        assert_eq!(attacker, ProcFlags::DONE_SPELL_MELEE_DMG_CLASS);
        assert_eq!(victim, ProcFlags::TAKEN_SPELL_MELEE_DMG_CLASS);

        let mut shot = spell(DamageClass::Ranged, false);
        shot.attributes |= SpellAttributes::AUTO_REPEAT;
        assert_eq!(class_flags(&shot).0, ProcFlags::DONE_RANGED_AUTO_ATTACK);
    }

    #[test]
    fn hit_flags_map_miss_results() {
        assert_eq!(
            ProcCoordinator::hit_flags(MissResult::None, true),
            ProcHitFlags::CRITICAL
        );
        assert_eq!(
            ProcCoordinator::hit_flags(MissResult::Reflect, false),
            ProcHitFlags::REFLECT
        );
        assert_eq!(spell_type(&hit(0, 0)), ProcSpellType::NO_DMG_HEAL);
    }
}
