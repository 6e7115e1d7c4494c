//! Extension points invoked at fixed phases of a cast.
//!
//! Hooks are registered per spell in a [`HookRegistry`]. When an instance is
//! created, [`HookTableBuilder`] resolves the registered bindings into a
//! [`HookTable`] keyed by (hook point, effect slot). Bindings for "every
//! effect" are expanded over the spell's real effects, and each slot is sorted
//! by priority (lower values run first). The table is never modified afterwards.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::spell::SpellDefinition;
use crate::types::{CastId, EffectIndex, Location, ObjectGuid, SpellId};
use crate::world::WorldObject;

use super::CastFailure;
use crate::env::MissResult;

/// Phase a hook is bound to.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, strum::Display, strum::AsRefStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum HookPoint {
    CheckCast,
    BeforeCast,
    OnCast,
    AfterCast,
    ObjectAreaTargetSelect,
    ObjectTargetSelect,
    DestinationTargetSelect,
    EffectLaunch,
    EffectHit,
    EffectHitTarget,
    BeforeHit,
    OnHit,
    AfterHit,
}

impl HookPoint {
    /// Points dispatched once per effect slot rather than once per cast or target.
    pub fn is_effect_scoped(self) -> bool {
        matches!(
            self,
            Self::ObjectAreaTargetSelect
                | Self::ObjectTargetSelect
                | Self::DestinationTargetSelect
                | Self::EffectLaunch
                | Self::EffectHit
                | Self::EffectHitTarget
        )
    }
}

/// Whether the default handling of an effect should still run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum HookAction {
    #[default]
    Continue,
    PreventDefault,
}

#[derive(Clone, Copy, Debug)]
pub struct HookContext<'a> {
    pub cast: CastId,
    pub caster: ObjectGuid,
    pub spell: &'a SpellDefinition,
}

/// Damage and healing about to be dealt to one target; hooks may adjust it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HitOutcome {
    pub damage: u32,
    pub healing: u32,
}

/// Scripted behaviour attached to a spell.
///
/// Only the method matching the binding's [`HookPoint`] is ever called.
pub trait SpellHook: Send + Sync {
    /// Lower values execute first.
    fn priority(&self) -> i32 {
        0
    }

    fn check_cast(&self, ctx: &HookContext<'_>) -> Result<(), CastFailure> {
        let _ = ctx;
        Ok(())
    }

    fn before_cast(&self, _ctx: &HookContext<'_>) {}

    fn on_cast(&self, _ctx: &HookContext<'_>) {}

    fn after_cast(&self, _ctx: &HookContext<'_>) {}

    fn filter_area_targets(
        &self,
        _ctx: &HookContext<'_>,
        _effect: EffectIndex,
        _candidates: &mut Vec<WorldObject>,
    ) {
    }

    fn select_object_target(
        &self,
        _ctx: &HookContext<'_>,
        _effect: EffectIndex,
        _target: &mut Option<WorldObject>,
    ) {
    }

    fn select_destination(
        &self,
        _ctx: &HookContext<'_>,
        _effect: EffectIndex,
        _destination: &mut Location,
    ) {
    }

    fn effect_launch(&self, _ctx: &HookContext<'_>, _effect: EffectIndex) -> HookAction {
        HookAction::Continue
    }

    fn effect_hit(&self, _ctx: &HookContext<'_>, _effect: EffectIndex) -> HookAction {
        HookAction::Continue
    }

    fn effect_hit_target(
        &self,
        _ctx: &HookContext<'_>,
        _effect: EffectIndex,
        _target: ObjectGuid,
    ) -> HookAction {
        HookAction::Continue
    }

    fn before_hit(&self, _ctx: &HookContext<'_>, _target: ObjectGuid, _miss: MissResult) {}

    fn on_hit(&self, _ctx: &HookContext<'_>, _target: ObjectGuid, _outcome: &mut HitOutcome) {}

    fn after_hit(&self, _ctx: &HookContext<'_>, _target: ObjectGuid) {}
}

/// A hook bound to a point; `effect: None` on an effect-scoped point means every effect.
#[derive(Clone)]
pub struct HookBinding {
    pub point: HookPoint,
    pub effect: Option<EffectIndex>,
    pub hook: Arc<dyn SpellHook>,
}

impl HookBinding {
    pub fn new(point: HookPoint, hook: Arc<dyn SpellHook>) -> Self {
        Self {
            point,
            effect: None,
            hook,
        }
    }

    #[must_use]
    pub fn for_effect(mut self, effect: EffectIndex) -> Self {
        self.effect = Some(effect);
        self
    }
}

impl fmt::Debug for HookBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookBinding")
            .field("point", &self.point)
            .field("effect", &self.effect)
            .field("priority", &self.hook.priority())
            .finish()
    }
}

/// Hook bindings registered per spell.
#[derive(Clone, Debug, Default)]
pub struct HookRegistry {
    bindings: HashMap<SpellId, Vec<HookBinding>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, spell: SpellId, binding: HookBinding) {
        self.bindings.entry(spell).or_default().push(binding);
    }

    pub fn bindings_for(&self, spell: SpellId) -> &[HookBinding] {
        self.bindings
            .get(&spell)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

type HookKey = (HookPoint, Option<EffectIndex>);

/// Resolves bindings for one spell into a [`HookTable`].
pub struct HookTableBuilder<'a> {
    spell: &'a SpellDefinition,
    slots: HashMap<HookKey, Vec<Arc<dyn SpellHook>>>,
}

impl<'a> HookTableBuilder<'a> {
    pub fn new(spell: &'a SpellDefinition) -> Self {
        Self {
            spell,
            slots: HashMap::new(),
        }
    }

    /// Adds every binding `registry` holds for the spell.
    #[must_use]
    pub fn with_registry(mut self, registry: Option<&HookRegistry>) -> Self {
        if let Some(registry) = registry {
            for binding in registry.bindings_for(self.spell.id) {
                self.bind(binding);
            }
        }
        self
    }

    pub fn bind(&mut self, binding: &HookBinding) {
        if !binding.point.is_effect_scoped() {
            self.slots
                .entry((binding.point, None))
                .or_default()
                .push(Arc::clone(&binding.hook));
            return;
        }

        let real = self.spell.real_effects_mask();
        match binding.effect {
            Some(effect) if real.contains(effect) => {
                self.slots
                    .entry((binding.point, Some(effect)))
                    .or_default()
                    .push(Arc::clone(&binding.hook));
            }
            Some(effect) => {
                tracing::warn!(
                    target: "spell::cast",
                    spell = %self.spell.id,
                    point = %binding.point,
                    effect = %effect,
                    "hook bound to a non-existent effect ignored"
                );
            }
            None => {
                for effect in real.iter() {
                    self.slots
                        .entry((binding.point, Some(effect)))
                        .or_default()
                        .push(Arc::clone(&binding.hook));
                }
            }
        }
    }

    pub fn build(self) -> HookTable {
        let slots = self
            .slots
            .into_iter()
            .map(|(key, mut hooks)| {
                hooks.sort_by_key(|hook| hook.priority());
                (key, Arc::<[Arc<dyn SpellHook>]>::from(hooks))
            })
            .collect();
        HookTable { slots }
    }
}

/// Immutable (point, effect) → hooks table owned by a cast instance.
#[derive(Clone, Default)]
pub struct HookTable {
    slots: HashMap<HookKey, Arc<[Arc<dyn SpellHook>]>>,
}

impl HookTable {
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn hooks(&self, point: HookPoint, effect: Option<EffectIndex>) -> &[Arc<dyn SpellHook>] {
        match self.slots.get(&(point, effect)) {
            Some(hooks) => &hooks[..],
            None => &[],
        }
    }

    /// First refusal wins.
    pub fn check_cast(&self, ctx: &HookContext<'_>) -> Result<(), CastFailure> {
        self.hooks(HookPoint::CheckCast, None)
            .iter()
            .try_for_each(|hook| hook.check_cast(ctx))
    }

    pub fn before_cast(&self, ctx: &HookContext<'_>) {
        for hook in self.hooks(HookPoint::BeforeCast, None) {
            hook.before_cast(ctx);
        }
    }

    pub fn on_cast(&self, ctx: &HookContext<'_>) {
        for hook in self.hooks(HookPoint::OnCast, None) {
            hook.on_cast(ctx);
        }
    }

    pub fn after_cast(&self, ctx: &HookContext<'_>) {
        for hook in self.hooks(HookPoint::AfterCast, None) {
            hook.after_cast(ctx);
        }
    }

    pub fn filter_area_targets(
        &self,
        ctx: &HookContext<'_>,
        effect: EffectIndex,
        candidates: &mut Vec<WorldObject>,
    ) {
        for hook in self.hooks(HookPoint::ObjectAreaTargetSelect, Some(effect)) {
            hook.filter_area_targets(ctx, effect, candidates);
        }
    }

    pub fn select_object_target(
        &self,
        ctx: &HookContext<'_>,
        effect: EffectIndex,
        target: &mut Option<WorldObject>,
    ) {
        for hook in self.hooks(HookPoint::ObjectTargetSelect, Some(effect)) {
            hook.select_object_target(ctx, effect, target);
        }
    }

    pub fn select_destination(
        &self,
        ctx: &HookContext<'_>,
        effect: EffectIndex,
        destination: &mut Location,
    ) {
        for hook in self.hooks(HookPoint::DestinationTargetSelect, Some(effect)) {
            hook.select_destination(ctx, effect, destination);
        }
    }

    /// Returns true when a hook prevented the default launch handling.
    pub fn effect_launch(&self, ctx: &HookContext<'_>, effect: EffectIndex) -> bool {
        self.hooks(HookPoint::EffectLaunch, Some(effect))
            .iter()
            .fold(false, |prevented, hook| {
                hook.effect_launch(ctx, effect) == HookAction::PreventDefault || prevented
            })
    }

    pub fn effect_hit(&self, ctx: &HookContext<'_>, effect: EffectIndex) -> bool {
        self.hooks(HookPoint::EffectHit, Some(effect))
            .iter()
            .fold(false, |prevented, hook| {
                hook.effect_hit(ctx, effect) == HookAction::PreventDefault || prevented
            })
    }

    pub fn effect_hit_target(
        &self,
        ctx: &HookContext<'_>,
        effect: EffectIndex,
        target: ObjectGuid,
    ) -> bool {
        self.hooks(HookPoint::EffectHitTarget, Some(effect))
            .iter()
            .fold(false, |prevented, hook| {
                hook.effect_hit_target(ctx, effect, target) == HookAction::PreventDefault
                    || prevented
            })
    }

    pub fn before_hit(&self, ctx: &HookContext<'_>, target: ObjectGuid, miss: MissResult) {
        for hook in self.hooks(HookPoint::BeforeHit, None) {
            hook.before_hit(ctx, target, miss);
        }
    }

    pub fn on_hit(&self, ctx: &HookContext<'_>, target: ObjectGuid, outcome: &mut HitOutcome) {
        for hook in self.hooks(HookPoint::OnHit, None) {
            hook.on_hit(ctx, target, outcome);
        }
    }

    pub fn after_hit(&self, ctx: &HookContext<'_>, target: ObjectGuid) {
        for hook in self.hooks(HookPoint::AfterHit, None) {
            hook.after_hit(ctx, target);
        }
    }
}

impl fmt::Debug for HookTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self.slots.keys().copied().collect();
        keys.sort();
        f.debug_struct("HookTable").field("slots", &keys).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::spell::{EffectKind, ImplicitTarget, SpellEffect};

    struct Recorder {
        name: &'static str,
        priority: i32,
        log: Arc<Mutex<Vec<(&'static str, Option<EffectIndex>)>>>,
        verdict: Result<(), CastFailure>,
    }

    impl SpellHook for Recorder {
        fn priority(&self) -> i32 {
            self.priority
        }

        fn check_cast(&self, _ctx: &HookContext<'_>) -> Result<(), CastFailure> {
            self.log.lock().unwrap().push((self.name, None));
            self.verdict
        }

        fn effect_hit_target(
            &self,
            _ctx: &HookContext<'_>,
            effect: EffectIndex,
            _target: ObjectGuid,
        ) -> HookAction {
            self.log.lock().unwrap().push((self.name, Some(effect)));
            HookAction::PreventDefault
        }
    }

    fn spell() -> SpellDefinition {
        let mut spell = SpellDefinition::new(SpellId(9), "hooked");
        spell.effects = vec![
            SpellEffect::new(EffectKind::SchoolDamage, ImplicitTarget::target_enemy()),
            SpellEffect::default(),
            SpellEffect::new(EffectKind::Dummy, ImplicitTarget::target_enemy()),
        ];
        spell
    }

    fn recorder(
        name: &'static str,
        priority: i32,
        log: &Arc<Mutex<Vec<(&'static str, Option<EffectIndex>)>>>,
        verdict: Result<(), CastFailure>,
    ) -> Arc<dyn SpellHook> {
        Arc::new(Recorder {
            name,
            priority,
            log: Arc::clone(log),
            verdict,
        })
    }

    #[test]
    fn check_cast_runs_in_priority_order_and_stops_on_refusal() {
        let spell = spell();
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = HookRegistry::new();
        registry.register(
            spell.id,
            HookBinding::new(
                HookPoint::CheckCast,
                recorder("late", 5, &log, Ok(())),
            ),
        );
        registry.register(
            spell.id,
            HookBinding::new(
                HookPoint::CheckCast,
                recorder("early", -5, &log, Err(CastFailure::CasterState)),
            ),
        );

        let table = HookTableBuilder::new(&spell)
            .with_registry(Some(&registry))
            .build();
        let ctx = HookContext {
            cast: CastId(1),
            caster: ObjectGuid(1),
            spell: &spell,
        };

        assert_eq!(table.check_cast(&ctx), Err(CastFailure::CasterState));
        assert_eq!(*log.lock().unwrap(), vec![("early", None)]);
    }

    #[test]
    fn all_effect_binding_expands_over_real_effects() {
        let spell = spell();
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut builder = HookTableBuilder::new(&spell);
        builder.bind(&HookBinding::new(
            HookPoint::EffectHitTarget,
            recorder("all", 0, &log, Ok(())),
        ));
        builder.bind(
            &HookBinding::new(
                HookPoint::EffectHitTarget,
                recorder("missing", 0, &log, Ok(())),
            )
            .for_effect(EffectIndex(1)),
        );
        let table = builder.build();
        let ctx = HookContext {
            cast: CastId(1),
            caster: ObjectGuid(1),
            spell: &spell,
        };

        assert!(table.effect_hit_target(&ctx, EffectIndex(0), ObjectGuid(2)));
        assert!(!table.effect_hit_target(&ctx, EffectIndex(1), ObjectGuid(2)));
        assert!(table.effect_hit_target(&ctx, EffectIndex(2), ObjectGuid(2)));
        assert_eq!(
            *log.lock().unwrap(),
            vec![("all", Some(EffectIndex(0))), ("all", Some(EffectIndex(2)))]
        );
    }
}
