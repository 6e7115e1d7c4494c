//! In-memory world for tests.
//!
//! [`Sandbox`] implements every collaborator trait on top of a single
//! mutex-guarded state so a test can build a [`CastEnv`] with
//! [`Sandbox::env`], drive casts and then inspect what the pipeline did.
//! Behaviour is plain: friendliness is faction equality, every
//! roll hits and never crits unless configured, damage and healing equal the
//! effect's base points.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::cast::{CastFailure, HookRegistry};
use crate::config::CastConfig;
use crate::env::{
    AttackType, AuraApplication, AuraStore, CastCheck, CastEnv, CastNotification, CastValidator,
    CasterUpkeep, CombatMath, DiminishingLevel, EventScheduler, HitRoll, HitTrigger, MissResult,
    NotificationSink, PcgRng, ProcEvaluator, ProcEvent, Relation, RngOracle, SpatialQuery,
    SpellOracle, TriggeredCast, WorldOracle,
};
use crate::spell::{DiminishingGroup, LinkTrigger, LinkedSpell, SpellDefinition};
use crate::types::{AuraHandle, CastId, EffectIndex, ObjectGuid, Position, SpellId};
use crate::world::{
    CorpseSnapshot, GameObjectSnapshot, ItemSnapshot, TypeMask, UnitSnapshot, WorldObject,
};

/// Builder for a sandbox unit.
#[derive(Clone, Debug)]
pub struct UnitBuilder {
    unit: UnitSnapshot,
    party: Option<u32>,
}

/// Alive hostile-to-nobody unit of faction 1 at `position`.
pub fn unit(id: u64, position: Position) -> UnitBuilder {
    UnitBuilder {
        unit: UnitSnapshot {
            guid: ObjectGuid(id),
            entry: 0,
            position,
            combat_reach: 1.5,
            object_size: 0.5,
            faction: 1,
            class_id: 0,
            is_player: false,
            alive: true,
            health: 100,
            max_health: 100,
        },
        party: None,
    }
}

impl UnitBuilder {
    pub fn faction(mut self, faction: u32) -> Self {
        self.unit.faction = faction;
        self
    }

    pub fn dead(mut self) -> Self {
        self.unit.alive = false;
        self.unit.health = 0;
        self
    }

    pub fn entry(mut self, entry: u32) -> Self {
        self.unit.entry = entry;
        self
    }

    pub fn health(mut self, health: u32, max_health: u32) -> Self {
        self.unit.health = health;
        self.unit.max_health = max_health;
        self
    }

    pub fn player(mut self) -> Self {
        self.unit.is_player = true;
        self
    }

    pub fn class(mut self, class_id: u8) -> Self {
        self.unit.class_id = class_id;
        self
    }

    pub fn facing(mut self, orientation: f32) -> Self {
        self.unit.position.orientation = orientation;
        self
    }

    pub fn party(mut self, party: u32) -> Self {
        self.party = Some(party);
        self
    }
}

#[derive(Clone, Debug)]
struct AuraEntry {
    application: AuraApplication,
    delayed_ms: u32,
}

#[derive(Default)]
struct State {
    spells: HashMap<SpellId, Arc<SpellDefinition>>,
    links: HashMap<(SpellId, LinkTrigger), Vec<LinkedSpell>>,
    objects: BTreeMap<ObjectGuid, WorldObject>,
    parties: HashMap<ObjectGuid, u32>,
    relations: HashMap<(ObjectGuid, Relation), ObjectGuid>,
    immunities: HashSet<(ObjectGuid, SpellId)>,
    evading: HashSet<ObjectGuid>,
    cast_speed: HashMap<ObjectGuid, f32>,
    pushback_resist: HashMap<ObjectGuid, u32>,
    blocked_sight: HashSet<ObjectGuid>,
    misses: HashMap<ObjectGuid, MissResult>,
    validation: Option<CastFailure>,
    auras: BTreeMap<u64, AuraEntry>,
    next_aura: u64,
    removed_auras: Vec<AuraHandle>,
    diminishing: HashMap<(ObjectGuid, DiminishingGroup), DiminishingLevel>,
    damage: HashMap<ObjectGuid, u32>,
    healing: HashMap<ObjectGuid, u32>,
    notifications: Vec<CastNotification>,
    scheduled: HashMap<(ObjectGuid, CastId), u64>,
    proc_events: Vec<ProcEvent>,
    hit_triggers: HashMap<SpellId, Vec<HitTrigger>>,
    triggered: Vec<TriggeredCast>,
    combo_points: HashMap<ObjectGuid, u8>,
    attack_ready: HashMap<(ObjectGuid, AttackType), bool>,
    attack_resets: HashMap<(ObjectGuid, AttackType), u32>,
    global_cooldowns: HashSet<ObjectGuid>,
}

#[derive(Default)]
pub struct Sandbox {
    state: Mutex<State>,
    hooks: Option<HookRegistry>,
}

impl Sandbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sandbox whose casts bind the hooks in `hooks`.
    pub fn with_hooks(hooks: HookRegistry) -> Self {
        Self {
            state: Mutex::default(),
            hooks: Some(hooks),
        }
    }

    /// Environment over this sandbox with the default configuration.
    pub fn env(&self) -> CastEnv<'_> {
        self.env_with(&CastConfig::DEFAULT)
    }

    pub fn env_with<'a>(&'a self, config: &'a CastConfig) -> CastEnv<'a> {
        let env = CastEnv::with_all(self, config);
        match self.hooks.as_ref() {
            Some(hooks) => env.with_hooks(hooks),
            None => env,
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ===== world setup =====

    pub fn register(&self, spell: SpellDefinition) -> Arc<SpellDefinition> {
        let spell = Arc::new(spell);
        self.state().spells.insert(spell.id, Arc::clone(&spell));
        spell
    }

    pub fn link(&self, spell: SpellId, trigger: LinkTrigger, linked: LinkedSpell) {
        self.state()
            .links
            .entry((spell, trigger))
            .or_default()
            .push(linked);
    }

    pub fn spawn(&self, builder: UnitBuilder) -> UnitSnapshot {
        let mut state = self.state();
        let unit = builder.unit;
        if let Some(party) = builder.party {
            state.parties.insert(unit.guid, party);
        }
        state.objects.insert(unit.guid, WorldObject::Unit(unit.clone()));
        unit
    }

    pub fn spawn_game_object(&self, object: GameObjectSnapshot) {
        self.state()
            .objects
            .insert(object.guid, WorldObject::GameObject(object));
    }

    pub fn spawn_item(&self, item: ItemSnapshot) {
        self.state().objects.insert(item.guid, WorldObject::Item(item));
    }

    pub fn spawn_corpse(&self, corpse: CorpseSnapshot) {
        self.state()
            .objects
            .insert(corpse.guid, WorldObject::Corpse(corpse));
    }

    pub fn despawn(&self, guid: ObjectGuid) {
        self.state().objects.remove(&guid);
    }

    pub fn move_to(&self, guid: ObjectGuid, position: Position) {
        let mut state = self.state();
        match state.objects.get_mut(&guid) {
            Some(WorldObject::Unit(unit)) => unit.position = position,
            Some(WorldObject::GameObject(object)) => object.position = position,
            Some(WorldObject::Corpse(corpse)) => corpse.position = position,
            Some(WorldObject::Item(_)) | None => {}
        }
    }

    pub fn kill(&self, guid: ObjectGuid) {
        if let Some(WorldObject::Unit(unit)) = self.state().objects.get_mut(&guid) {
            unit.alive = false;
            unit.health = 0;
        }
    }

    pub fn relate(&self, unit: ObjectGuid, relation: Relation, other: ObjectGuid) {
        self.state().relations.insert((unit, relation), other);
    }

    pub fn make_immune(&self, target: ObjectGuid, spell: SpellId) {
        self.state().immunities.insert((target, spell));
    }

    pub fn set_evading(&self, unit: ObjectGuid, evading: bool) {
        let mut state = self.state();
        if evading {
            state.evading.insert(unit);
        } else {
            state.evading.remove(&unit);
        }
    }

    pub fn set_cast_speed(&self, caster: ObjectGuid, speed: f32) {
        self.state().cast_speed.insert(caster, speed);
    }

    pub fn set_pushback_resist(&self, caster: ObjectGuid, pct: u32) {
        self.state().pushback_resist.insert(caster, pct);
    }

    /// Hides `target` from line of sight of everything.
    pub fn block_sight(&self, target: ObjectGuid) {
        self.state().blocked_sight.insert(target);
    }

    /// Forces the hit roll against `target`.
    pub fn force_miss(&self, target: ObjectGuid, miss: MissResult) {
        self.state().misses.insert(target, miss);
    }

    /// Makes every validation fail with `failure` (or pass again with `None`).
    pub fn fail_validation(&self, failure: Option<CastFailure>) {
        self.state().validation = failure;
    }

    pub fn add_hit_trigger(&self, spell: SpellId, trigger: HitTrigger) {
        self.state()
            .hit_triggers
            .entry(spell)
            .or_default()
            .push(trigger);
    }

    pub fn set_attack_ready(&self, caster: ObjectGuid, attack: AttackType, ready: bool) {
        self.state().attack_ready.insert((caster, attack), ready);
    }

    pub fn set_diminishing(&self, target: ObjectGuid, group: DiminishingGroup, level: DiminishingLevel) {
        self.state().diminishing.insert((target, group), level);
    }

    // ===== inspection =====

    pub fn notifications(&self) -> Vec<CastNotification> {
        self.state().notifications.clone()
    }

    pub fn damage_dealt(&self, target: ObjectGuid) -> u32 {
        self.state().damage.get(&target).copied().unwrap_or(0)
    }

    pub fn healing_done(&self, target: ObjectGuid) -> u32 {
        self.state().healing.get(&target).copied().unwrap_or(0)
    }

    /// Wake offset of the pending schedule entry for `cast`.
    pub fn scheduled(&self, cast: CastId) -> Option<u64> {
        self.state()
            .scheduled
            .iter()
            .find(|((_, id), _)| *id == cast)
            .map(|(_, offset)| *offset)
    }

    /// Auras currently applied to `target`.
    pub fn auras_on(&self, target: ObjectGuid) -> Vec<AuraApplication> {
        self.state()
            .auras
            .values()
            .filter(|entry| entry.application.target == target)
            .map(|entry| entry.application)
            .collect()
    }

    pub fn aura_delay(&self, handle: AuraHandle) -> Option<u32> {
        self.state().auras.get(&handle.0).map(|entry| entry.delayed_ms)
    }

    /// Every `remove` call in order, including repeated ones.
    pub fn removed_auras(&self) -> Vec<AuraHandle> {
        self.state().removed_auras.clone()
    }

    pub fn proc_events(&self) -> Vec<ProcEvent> {
        self.state().proc_events.clone()
    }

    /// Drains the triggered casts queued so far.
    pub fn take_triggered(&self) -> Vec<TriggeredCast> {
        std::mem::take(&mut self.state().triggered)
    }

    pub fn attack_resets(&self, caster: ObjectGuid, attack: AttackType) -> u32 {
        self.state()
            .attack_resets
            .get(&(caster, attack))
            .copied()
            .unwrap_or(0)
    }

    pub fn on_global_cooldown(&self, caster: ObjectGuid) -> bool {
        self.state().global_cooldowns.contains(&caster)
    }
}

impl SpellOracle for Sandbox {
    fn spell(&self, id: SpellId) -> Option<Arc<SpellDefinition>> {
        self.state().spells.get(&id).cloned()
    }

    fn linked_spells(&self, id: SpellId, trigger: LinkTrigger) -> Vec<LinkedSpell> {
        self.state()
            .links
            .get(&(id, trigger))
            .cloned()
            .unwrap_or_default()
    }
}

impl WorldOracle for Sandbox {
    fn object(&self, guid: ObjectGuid) -> Option<WorldObject> {
        self.state().objects.get(&guid).cloned()
    }

    fn is_hostile(&self, source: ObjectGuid, target: ObjectGuid) -> bool {
        match (self.unit(source), self.unit(target)) {
            (Some(source), Some(target)) => source.faction != target.faction,
            _ => false,
        }
    }

    fn is_friendly(&self, source: ObjectGuid, target: ObjectGuid) -> bool {
        match (self.unit(source), self.unit(target)) {
            (Some(source), Some(target)) => source.faction == target.faction,
            _ => false,
        }
    }

    fn in_party(&self, source: ObjectGuid, target: ObjectGuid) -> bool {
        if source == target {
            return true;
        }
        let state = self.state();
        matches!(
            (state.parties.get(&source), state.parties.get(&target)),
            (Some(a), Some(b)) if a == b
        )
    }

    fn in_raid(&self, source: ObjectGuid, target: ObjectGuid) -> bool {
        self.in_party(source, target)
    }

    fn related(&self, unit: ObjectGuid, relation: Relation) -> Option<ObjectGuid> {
        self.state().relations.get(&(unit, relation)).copied()
    }

    fn is_immune(&self, target: ObjectGuid, spell: &SpellDefinition, _effect: EffectIndex) -> bool {
        self.state().immunities.contains(&(target, spell.id))
    }

    fn is_evading(&self, unit: ObjectGuid) -> bool {
        self.state().evading.contains(&unit)
    }

    fn cast_speed(&self, caster: ObjectGuid) -> f32 {
        self.state().cast_speed.get(&caster).copied().unwrap_or(1.0)
    }

    fn pushback_reduction_pct(&self, caster: ObjectGuid, _spell: SpellId) -> u32 {
        self.state().pushback_resist.get(&caster).copied().unwrap_or(0)
    }
}

impl SpatialQuery for Sandbox {
    fn find_in_area(
        &self,
        center: &Position,
        radius: f32,
        types: TypeMask,
        filter: &dyn Fn(&WorldObject) -> bool,
    ) -> Vec<WorldObject> {
        // snapshot first; the filter calls back into the world
        let candidates: Vec<WorldObject> = self
            .state()
            .objects
            .values()
            .filter(|object| types.intersects(object.type_mask()))
            .filter(|object| {
                object
                    .position()
                    .is_some_and(|position| position.is_within(center, radius))
            })
            .cloned()
            .collect();
        candidates.into_iter().filter(|object| filter(object)).collect()
    }

    fn line_of_sight(&self, _from: &Position, to: &Position) -> bool {
        let state = self.state();
        !state.blocked_sight.iter().any(|guid| {
            state
                .objects
                .get(guid)
                .and_then(WorldObject::position)
                .is_some_and(|position| position == *to)
        })
    }
}

impl CombatMath for Sandbox {
    fn roll_hit(&self, roll: &HitRoll<'_>) -> MissResult {
        self.state()
            .misses
            .get(&roll.target)
            .copied()
            .unwrap_or(MissResult::None)
    }

    fn roll_crit(
        &self,
        _caster: ObjectGuid,
        _target: ObjectGuid,
        _spell: &SpellDefinition,
        chance_override: Option<f32>,
        _seed: u64,
    ) -> bool {
        chance_override.is_some_and(|chance| chance >= 100.0)
    }

    fn effect_damage(
        &self,
        _caster: ObjectGuid,
        _target: ObjectGuid,
        spell: &SpellDefinition,
        effect: EffectIndex,
        crit: bool,
    ) -> u32 {
        let base = spell
            .effect(effect)
            .map_or(0, |effect| effect.base_points.max(0) as u32);
        if crit { base * 2 } else { base }
    }

    fn effect_healing(
        &self,
        caster: ObjectGuid,
        target: ObjectGuid,
        spell: &SpellDefinition,
        effect: EffectIndex,
        crit: bool,
    ) -> u32 {
        self.effect_damage(caster, target, spell, effect, crit)
    }

    fn deal_damage(&self, _caster: ObjectGuid, target: ObjectGuid, _spell: SpellId, amount: u32) {
        let mut state = self.state();
        *state.damage.entry(target).or_default() += amount;
        if let Some(WorldObject::Unit(unit)) = state.objects.get_mut(&target) {
            unit.health = unit.health.saturating_sub(amount);
            if unit.health == 0 {
                unit.alive = false;
            }
        }
    }

    fn deal_healing(&self, _caster: ObjectGuid, target: ObjectGuid, _spell: SpellId, amount: u32) {
        let mut state = self.state();
        *state.healing.entry(target).or_default() += amount;
        if let Some(WorldObject::Unit(unit)) = state.objects.get_mut(&target) {
            unit.health = unit.health.saturating_add(amount).min(unit.max_health);
        }
    }
}

impl CastValidator for Sandbox {
    fn check_cast(&self, _check: &CastCheck<'_>) -> Result<(), CastFailure> {
        match self.state().validation {
            Some(failure) => Err(failure),
            None => Ok(()),
        }
    }
}

impl AuraStore for Sandbox {
    fn create_or_refresh(&self, application: &AuraApplication) -> Option<AuraHandle> {
        let mut state = self.state();
        let existing = state.auras.iter_mut().find(|(_, entry)| {
            entry.application.target == application.target
                && entry.application.spell == application.spell
                && entry.application.caster == application.caster
        });
        if let Some((handle, entry)) = existing {
            entry.application = *application;
            entry.delayed_ms = 0;
            return Some(AuraHandle(*handle));
        }
        state.next_aura += 1;
        let handle = state.next_aura;
        state.auras.insert(
            handle,
            AuraEntry {
                application: *application,
                delayed_ms: 0,
            },
        );
        Some(AuraHandle(handle))
    }

    fn find(&self, target: ObjectGuid, spell: SpellId, caster: ObjectGuid) -> Option<AuraHandle> {
        self.state()
            .auras
            .iter()
            .find(|(_, entry)| {
                entry.application.target == target
                    && entry.application.spell == spell
                    && entry.application.caster == caster
            })
            .map(|(handle, _)| AuraHandle(*handle))
    }

    fn is_applied(&self, handle: AuraHandle) -> bool {
        self.state().auras.contains_key(&handle.0)
    }

    fn remove(&self, handle: AuraHandle) {
        let mut state = self.state();
        state.removed_auras.push(handle);
        state.auras.remove(&handle.0);
    }

    fn remove_spell(&self, target: ObjectGuid, spell: SpellId) {
        self.state().auras.retain(|_, entry| {
            entry.application.target != target || entry.application.spell != spell
        });
    }

    fn delay(&self, handle: AuraHandle, delay_ms: u32) {
        if let Some(entry) = self.state().auras.get_mut(&handle.0) {
            entry.delayed_ms += delay_ms;
        }
    }

    fn has_aura(&self, target: ObjectGuid, spell: SpellId) -> bool {
        self.state()
            .auras
            .values()
            .any(|entry| entry.application.target == target && entry.application.spell == spell)
    }

    fn diminishing_level(&self, target: ObjectGuid, group: DiminishingGroup) -> DiminishingLevel {
        self.state()
            .diminishing
            .get(&(target, group))
            .copied()
            .unwrap_or_default()
    }

    fn increment_diminishing(&self, target: ObjectGuid, group: DiminishingGroup) {
        let mut state = self.state();
        let level = state.diminishing.entry((target, group)).or_default();
        *level = DiminishingLevel(level.0.saturating_add(1).min(DiminishingLevel::IMMUNE.0));
    }
}

impl NotificationSink for Sandbox {
    fn notify(&self, notification: CastNotification) {
        self.state().notifications.push(notification);
    }
}

impl EventScheduler for Sandbox {
    fn schedule(&self, caster: ObjectGuid, cast: CastId, wake_offset_ms: u64) {
        self.state().scheduled.insert((caster, cast), wake_offset_ms);
    }

    fn cancel(&self, caster: ObjectGuid, cast: CastId) {
        self.state().scheduled.remove(&(caster, cast));
    }
}

impl ProcEvaluator for Sandbox {
    fn process(&self, event: &ProcEvent) {
        self.state().proc_events.push(event.clone());
    }

    fn hit_triggers(&self, _caster: ObjectGuid, spell: SpellId) -> Vec<HitTrigger> {
        self.state()
            .hit_triggers
            .get(&spell)
            .cloned()
            .unwrap_or_default()
    }

    fn trigger_spell(&self, cast: TriggeredCast) {
        self.state().triggered.push(cast);
    }
}

impl CasterUpkeep for Sandbox {
    fn combo_points(&self, caster: ObjectGuid) -> u8 {
        self.state().combo_points.get(&caster).copied().unwrap_or(0)
    }

    fn clear_combo_points(&self, caster: ObjectGuid) {
        self.state().combo_points.remove(&caster);
    }

    fn add_combo_points(&self, caster: ObjectGuid, _target: ObjectGuid, amount: i32) {
        let mut state = self.state();
        let points = state.combo_points.entry(caster).or_default();
        *points = (i32::from(*points) + amount).clamp(0, 5) as u8;
    }

    /// A reset swing timer is not ready again until a test says so.
    fn reset_attack_timer(&self, caster: ObjectGuid, attack: AttackType) {
        let mut state = self.state();
        *state.attack_resets.entry((caster, attack)).or_default() += 1;
        state.attack_ready.insert((caster, attack), false);
    }

    fn is_attack_ready(&self, caster: ObjectGuid, attack: AttackType) -> bool {
        self.state()
            .attack_ready
            .get(&(caster, attack))
            .copied()
            .unwrap_or(true)
    }

    fn trigger_global_cooldown(&self, caster: ObjectGuid, _spell: &SpellDefinition) {
        self.state().global_cooldowns.insert(caster);
    }

    fn cancel_global_cooldown(&self, caster: ObjectGuid, _spell: &SpellDefinition) {
        self.state().global_cooldowns.remove(&caster);
    }
}

impl RngOracle for Sandbox {
    fn next_u32(&self, seed: u64) -> u32 {
        PcgRng.next_u32(seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factions_decide_friendliness() {
        let sandbox = Sandbox::new();
        let a = sandbox.spawn(unit(1, Position::ORIGIN));
        let b = sandbox.spawn(unit(2, Position::ORIGIN).faction(2));
        let c = sandbox.spawn(unit(3, Position::ORIGIN));

        assert!(sandbox.is_hostile(a.guid, b.guid));
        assert!(sandbox.is_friendly(a.guid, c.guid));
        assert!(!sandbox.in_party(a.guid, c.guid));
    }

    #[test]
    fn refresh_keeps_the_handle() {
        let sandbox = Sandbox::new();
        let application = AuraApplication {
            cast: CastId(1),
            spell: SpellId(5),
            caster: ObjectGuid(1),
            target: ObjectGuid(2),
            effect_mask: crate::types::EffectMask::from_bits(1),
            duration: crate::spell::SpellDuration::Finite(1000),
        };
        let first = sandbox.create_or_refresh(&application);
        let second = sandbox.create_or_refresh(&AuraApplication {
            cast: CastId(2),
            ..application
        });

        assert_eq!(first, second);
        assert_eq!(sandbox.auras_on(ObjectGuid(2)).len(), 1);
    }
}
