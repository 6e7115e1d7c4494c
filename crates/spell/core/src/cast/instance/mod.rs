//! One cast from request to reclaim.
//!
//! A [`CastInstance`] owns everything a single cast accumulates: the explicit
//! targets, the target registry, the hook table, proc bookkeeping, delay and
//! channel timers. Phases are advanced only by calls from its
//! [`CastController`](super::CastController); each public phase entry point is
//! wrapped in an "executing" guard so a phase can never re-enter itself.
mod lifecycle;
mod resolution;
mod selection;

use std::sync::Arc;

use crate::env::{CastEnv, RollCursor};
use crate::error::ErrorContext;
use crate::spell::{SpellAttributes, SpellDefinition};
use crate::types::{CastId, ObjectGuid};

use super::channel::{ChannelController, ChannelLink};
use super::delay::DelayScheduler;
use super::hooks::{HookContext, HookTable, HookTableBuilder};
use super::procs::ProcCoordinator;
use super::registry::TargetRegistry;
use super::{CastCategory, CastError, CastFlags, CastRequest, CastState, CastValues, SpellTargets};

#[derive(Debug)]
pub struct CastInstance {
    id: CastId,
    caster: ObjectGuid,
    spell: Arc<SpellDefinition>,
    category: CastCategory,
    state: CastState,
    flags: CastFlags,
    values: CastValues,
    /// Explicit targets as requested; restored before every auto-repeat shot.
    requested: SpellTargets,
    targets: SpellTargets,
    registry: TargetRegistry,
    hooks: HookTable,
    procs: ProcCoordinator,
    delay: DelayScheduler,
    channel: ChannelController,
    rolls: RollCursor,
    cast_time_ms: u32,
    /// Remaining cast time while preparing.
    timer_ms: u32,
    pushbacks: u8,
    combo_gain: i32,
    combo_target: Option<ObjectGuid>,
    consume_combo: bool,
    executing: bool,
    references: u32,
}

impl CastInstance {
    pub fn new(
        env: &CastEnv<'_>,
        id: CastId,
        request: CastRequest,
        spell: Arc<SpellDefinition>,
        seed: u64,
    ) -> Self {
        let hooks = HookTableBuilder::new(&spell)
            .with_registry(env.hooks())
            .build();
        Self {
            id,
            caster: request.caster,
            category: CastCategory::of(&spell),
            registry: TargetRegistry::new(spell.real_effects_mask()),
            spell,
            state: CastState::None,
            flags: request.flags,
            values: request.values,
            requested: request.targets.clone(),
            targets: request.targets,
            hooks,
            procs: ProcCoordinator::default(),
            delay: DelayScheduler::default(),
            channel: ChannelController::default(),
            rolls: RollCursor::new(seed, id.0, request.caster.low()),
            cast_time_ms: 0,
            timer_ms: 0,
            pushbacks: 0,
            combo_gain: 0,
            combo_target: None,
            consume_combo: true,
            executing: false,
            references: 0,
        }
    }

    pub fn id(&self) -> CastId {
        self.id
    }

    pub fn caster(&self) -> ObjectGuid {
        self.caster
    }

    pub fn spell(&self) -> &Arc<SpellDefinition> {
        &self.spell
    }

    pub fn category(&self) -> CastCategory {
        self.category
    }

    pub fn state(&self) -> CastState {
        self.state
    }

    pub fn flags(&self) -> CastFlags {
        self.flags
    }

    pub fn targets(&self) -> &SpellTargets {
        &self.targets
    }

    pub fn registry(&self) -> &TargetRegistry {
        &self.registry
    }

    pub fn cast_time_ms(&self) -> u32 {
        self.cast_time_ms
    }

    /// Remaining cast time while preparing, remaining channel time while casting.
    pub fn remaining_ms(&self) -> Option<u32> {
        match self.state {
            CastState::Preparing => Some(self.timer_ms),
            CastState::Casting => self.channel.remaining_ms(),
            _ => Some(0),
        }
    }

    pub fn pushbacks(&self) -> u8 {
        self.pushbacks
    }

    /// What the running channel is bound to.
    pub fn channel_link(&self) -> Option<&ChannelLink> {
        (self.state == CastState::Casting && self.channel.is_armed()).then(|| self.channel.link())
    }

    pub fn is_executing(&self) -> bool {
        self.executing
    }

    pub fn references(&self) -> u32 {
        self.references
    }

    pub fn acquire(&mut self) {
        self.references += 1;
    }

    pub fn release(&mut self) {
        self.references = self.references.saturating_sub(1);
    }

    pub fn is_reclaimable(&self) -> bool {
        self.state.is_finished() && !self.executing && self.references == 0
    }

    /// Drops every target record. Called right before the instance is discarded.
    pub fn reclaim(&mut self) {
        self.registry.clear();
        self.channel.disarm();
    }

    /// Casts straight out of `prepare` instead of waiting for the timer.
    pub fn casts_immediately(&self) -> bool {
        self.flags.contains(CastFlags::CAST_DIRECTLY)
            || (self.cast_time_ms == 0 && self.category == CastCategory::Generic)
    }

    pub fn is_interruptible(&self) -> bool {
        !self.spell.has_attribute(SpellAttributes::NOT_INTERRUPTIBLE)
    }

    /// Whether moving now interrupts this cast.
    pub fn interrupted_by_movement(&self) -> bool {
        if self.flags.is_triggered()
            || matches!(self.category, CastCategory::Melee | CastCategory::AutoRepeat)
            || self.spell.has_attribute(SpellAttributes::ALLOW_CAST_WHILE_MOVING)
        {
            return false;
        }
        match self.state {
            CastState::Preparing => self.cast_time_ms > 0,
            CastState::Casting => true,
            _ => false,
        }
    }

    fn context(&self) -> ErrorContext {
        ErrorContext::new()
            .with_caster(self.caster)
            .with_spell(self.spell.id)
            .with_cast(self.id)
    }

    fn hook_context<'a>(&self, spell: &'a SpellDefinition) -> HookContext<'a> {
        HookContext {
            cast: self.id,
            caster: self.caster,
            spell,
        }
    }

    fn ignores_line_of_sight(&self) -> bool {
        self.flags.contains(CastFlags::IGNORE_LINE_OF_SIGHT)
            || self.spell.has_attribute(SpellAttributes::IGNORE_LINE_OF_SIGHT)
    }

    /// Runs `phase` with the executing guard held.
    fn guarded<T>(
        &mut self,
        phase: impl FnOnce(&mut Self) -> Result<T, CastError>,
    ) -> Result<T, CastError> {
        if self.executing {
            return Err(CastError::Reentrant(self.id));
        }
        self.executing = true;
        let result = phase(self);
        self.executing = false;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CastConfig;
    use crate::env::CastNotification;
    use crate::spell::{EffectKind, ImplicitTarget, SpellDuration, SpellEffect, SpellRange};
    use crate::testkit::{Sandbox, unit};
    use crate::types::{Position, SpellId};

    fn bolt() -> SpellDefinition {
        let mut spell = SpellDefinition::new(SpellId(100), "bolt");
        spell.cast_time_ms = 1500;
        spell.range = SpellRange::symmetric(30.0);
        spell.effects = vec![
            SpellEffect::new(EffectKind::SchoolDamage, ImplicitTarget::target_enemy())
                .with_base_points(12),
        ];
        spell
    }

    fn instance(sandbox: &Sandbox, spell: SpellDefinition, target: ObjectGuid) -> CastInstance {
        let env = CastEnv::with_all(sandbox, &CastConfig::DEFAULT);
        let request = CastRequest::new(ObjectGuid(1), spell.id, SpellTargets::unit(target));
        CastInstance::new(&env, CastId(1), request, Arc::new(spell), 7)
    }

    #[test]
    fn reentrant_phases_are_rejected() {
        let sandbox = Sandbox::new();
        sandbox.spawn(unit(1, Position::ORIGIN));
        let target = sandbox.spawn(unit(2, Position::new(10.0, 0.0, 0.0)).faction(2));
        let env = CastEnv::with_all(&sandbox, &CastConfig::DEFAULT);

        let mut cast = instance(&sandbox, bolt(), target.guid);
        cast.prepare(&env).expect("prepare");
        cast.executing = true;

        assert_eq!(cast.cancel(&env), Err(CastError::Reentrant(CastId(1))));
        assert_eq!(cast.cast(&env, None), Err(CastError::Reentrant(CastId(1))));
        assert_eq!(cast.state(), CastState::Preparing);
    }

    #[test]
    fn prepare_arms_the_cast_timer() {
        let sandbox = Sandbox::new();
        sandbox.spawn(unit(1, Position::ORIGIN));
        let target = sandbox.spawn(unit(2, Position::new(10.0, 0.0, 0.0)).faction(2));
        let env = CastEnv::with_all(&sandbox, &CastConfig::DEFAULT);

        let mut cast = instance(&sandbox, bolt(), target.guid);
        cast.prepare(&env).expect("prepare");

        assert_eq!(cast.state(), CastState::Preparing);
        assert_eq!(cast.cast_time_ms(), 1500);
        assert_eq!(cast.remaining_ms(), Some(1500));
        assert!(!cast.casts_immediately());
        assert!(cast.interrupted_by_movement());
    }

    #[test]
    fn cast_pushback_is_clamped_and_limited() {
        let sandbox = Sandbox::new();
        sandbox.spawn(unit(1, Position::ORIGIN));
        let target = sandbox.spawn(unit(2, Position::new(10.0, 0.0, 0.0)).faction(2));
        let env = CastEnv::with_all(&sandbox, &CastConfig::DEFAULT);

        let mut cast = instance(&sandbox, bolt(), target.guid);
        cast.prepare(&env).expect("prepare");
        cast.update(&env, 300, None).expect("update");
        assert_eq!(cast.remaining_ms(), Some(1200));

        // clamped to the full cast time
        assert_eq!(cast.pushback(&env), Some(300));
        assert_eq!(cast.remaining_ms(), Some(1500));

        cast.update(&env, 1000, None).expect("update");
        assert_eq!(cast.pushback(&env), Some(500));
        assert_eq!(cast.remaining_ms(), Some(1000));
        assert_eq!(cast.pushback(&env), None);

        let delayed = sandbox
            .notifications()
            .into_iter()
            .filter(|n| matches!(n, CastNotification::CastDelayed { .. }))
            .count();
        assert_eq!(delayed, 2);
    }

    #[test]
    fn timer_expiry_casts_and_finishes() {
        let sandbox = Sandbox::new();
        sandbox.spawn(unit(1, Position::ORIGIN));
        let target = sandbox.spawn(unit(2, Position::new(10.0, 0.0, 0.0)).faction(2));
        let env = CastEnv::with_all(&sandbox, &CastConfig::DEFAULT);

        let mut cast = instance(&sandbox, bolt(), target.guid);
        cast.prepare(&env).expect("prepare");
        cast.update(&env, 1500, None).expect("update");

        assert_eq!(cast.state(), CastState::Finished);
        assert_eq!(cast.registry().units().len(), 1);
        assert!(cast.registry().units()[0].processed);
        assert_eq!(sandbox.damage_dealt(target.guid), 12);
    }

    #[test]
    fn finished_channel_cancel_is_a_no_op() {
        let sandbox = Sandbox::new();
        sandbox.spawn(unit(1, Position::ORIGIN));
        let target = sandbox.spawn(unit(2, Position::new(10.0, 0.0, 0.0)).faction(2));
        let env = CastEnv::with_all(&sandbox, &CastConfig::DEFAULT);

        let mut spell = bolt();
        spell.cast_time_ms = 0;
        spell.attributes |= SpellAttributes::CHANNELED;
        spell.duration = SpellDuration::Finite(3000);
        spell.effects[0].kind = EffectKind::ApplyAura;

        let mut cast = instance(&sandbox, spell, target.guid);
        cast.prepare(&env).expect("prepare");
        cast.cast(&env, None).expect("cast");
        assert_eq!(cast.state(), CastState::Casting);

        cast.update(&env, 3000, None).expect("update");
        assert_eq!(cast.state(), CastState::Finished);
        assert_eq!(cast.cancel(&env), Ok(()));
    }
}
