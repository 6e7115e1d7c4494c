//! Candidate eligibility shared by every search-based selection.

use crate::env::CastEnv;
use crate::spell::{CheckType, SpellDefinition, TargetCondition, TargetObject};
use crate::types::ObjectGuid;
use crate::world::{UnitSnapshot, WorldObject};

/// Eligibility test for one descriptor.
///
/// Corpses are judged through their owner: relation checks use the owning unit
/// and a corpse whose owner is gone is never eligible.
pub(crate) struct CandidateCheck<'a> {
    env: CastEnv<'a>,
    caster: ObjectGuid,
    /// Unit party/raid relations are measured from.
    referer: Option<UnitSnapshot>,
    spell: &'a SpellDefinition,
    object: TargetObject,
    check: CheckType,
    conditions: Option<&'a [TargetCondition]>,
}

impl<'a> CandidateCheck<'a> {
    pub fn new(
        env: CastEnv<'a>,
        caster: ObjectGuid,
        spell: &'a SpellDefinition,
        object: TargetObject,
        check: CheckType,
    ) -> Self {
        Self {
            env,
            caster,
            referer: None,
            spell,
            object,
            check,
            conditions: None,
        }
    }

    #[must_use]
    pub fn with_referer(mut self, referer: Option<UnitSnapshot>) -> Self {
        self.referer = referer;
        self
    }

    #[must_use]
    pub fn with_conditions(mut self, conditions: Option<&'a [TargetCondition]>) -> Self {
        self.conditions = conditions;
        self
    }

    pub fn accepts(&self, candidate: &WorldObject) -> bool {
        let unit = match candidate {
            WorldObject::Unit(unit) => {
                if !self.spell.accepts_life_state(unit.alive) {
                    return false;
                }
                if matches!(self.object, TargetObject::CorpseEnemy | TargetObject::CorpseAlly)
                    && unit.alive
                {
                    return false;
                }
                Some(unit.clone())
            }
            WorldObject::Corpse(corpse) => match self.env.world().unit(corpse.owner) {
                Some(owner) => Some(owner),
                None => return false,
            },
            WorldObject::GameObject(_) | WorldObject::Item(_) => None,
        };

        if let Some(unit) = unit.as_ref()
            && !self.relation_allows(unit)
        {
            return false;
        }

        self.conditions
            .is_none_or(|conditions| conditions.iter().all(|c| self.meets(candidate, c)))
    }

    fn relation_allows(&self, unit: &UnitSnapshot) -> bool {
        let world = self.env.world();
        let referer = self.referer.as_ref().map_or(self.caster, |r| r.guid);
        match self.check {
            CheckType::Default | CheckType::Entry => true,
            CheckType::Enemy => world.is_hostile(self.caster, unit.guid),
            CheckType::Ally => world.is_friendly(self.caster, unit.guid),
            CheckType::Party => {
                world.is_friendly(self.caster, unit.guid) && world.in_party(referer, unit.guid)
            }
            CheckType::Raid => {
                world.is_friendly(self.caster, unit.guid) && world.in_raid(referer, unit.guid)
            }
            CheckType::RaidClass => {
                self.referer
                    .as_ref()
                    .is_some_and(|r| r.class_id == unit.class_id)
                    && world.is_friendly(self.caster, unit.guid)
                    && world.in_raid(referer, unit.guid)
            }
            CheckType::Passenger => world.passengers(referer).contains(&unit.guid),
        }
    }

    fn meets(&self, candidate: &WorldObject, condition: &TargetCondition) -> bool {
        match condition {
            TargetCondition::Entry(entry) => match candidate {
                WorldObject::Unit(unit) => unit.entry == *entry,
                WorldObject::GameObject(object) => object.entry == *entry,
                WorldObject::Item(item) => item.entry == *entry,
                WorldObject::Corpse(_) => false,
            },
            TargetCondition::PlayersOnly => candidate.as_unit().is_some_and(|u| u.is_player),
            TargetCondition::NonPlayers => candidate.as_unit().is_some_and(|u| !u.is_player),
            TargetCondition::HealthBelowPct(pct) => {
                candidate.as_unit().is_some_and(|u| u.health_pct() < *pct)
            }
            TargetCondition::HasAura(spell) => {
                self.env.auras().has_aura(candidate.guid(), *spell)
            }
            TargetCondition::LacksAura(spell) => {
                !self.env.auras().has_aura(candidate.guid(), *spell)
            }
        }
    }
}
