//! Per-caster ownership of cast instances.
//!
//! A caster has one slot per [`CastCategory`]. Placing a new instance in an
//! occupied category, or in a category whose occupants it outranks, interrupts
//! those occupants following a fixed priority table. Interrupted and displaced
//! instances move to a detached list where projectiles still in flight keep
//! resolving until they finish and are reclaimed.

use std::sync::Arc;

use tracing::{debug, error, trace, warn};

use crate::env::{AttackType, CastEnv};
use crate::error::ErrorContext;
use crate::spell::{SpellAttributes, SpellDefinition};
use crate::types::{CastId, ObjectGuid};

use super::channel::ChannelLink;
use super::instance::CastInstance;
use super::{CastCategory, CastError, CastFailure, CastFlags, CastRequest, CastState};

const SLOTS: usize = CastCategory::ALL.len();

#[derive(Debug)]
pub struct CastController {
    caster: ObjectGuid,
    seed: u64,
    next_cast: u64,
    slots: [Option<CastInstance>; SLOTS],
    /// Instances no longer current in any slot but not yet reclaimed.
    detached: Vec<CastInstance>,
}

impl CastController {
    pub fn new(caster: ObjectGuid, seed: u64) -> Self {
        Self {
            caster,
            seed,
            next_cast: 0,
            slots: Default::default(),
            detached: Vec::new(),
        }
    }

    pub fn caster(&self) -> ObjectGuid {
        self.caster
    }

    // ===== prepare =====

    /// Starts a cast. On success the instance holds its category slot (or, for
    /// cast-directly requests, has already been cast outside any slot).
    ///
    /// # Errors
    ///
    /// * `MissingDefinition` when the spell is unknown.
    /// * `Conflict` when a cast in progress or a non-interruptible occupant
    ///   blocks the request; nothing was mutated.
    /// * `Validation` / `Targeting` from the instance's own phases.
    pub fn prepare(&mut self, env: &CastEnv<'_>, request: CastRequest) -> Result<CastId, CastError> {
        let Some(spell) = env.spells().spell(request.spell) else {
            error!(
                target: "spell::cast",
                caster = %self.caster,
                spell = %request.spell,
                "spell definition missing"
            );
            return Err(CastError::MissingDefinition(request.spell));
        };

        let direct = request.flags.contains(CastFlags::CAST_DIRECTLY);
        if !direct {
            self.check_conflicts(&spell, request.flags)?;
        }

        self.next_cast += 1;
        let id = CastId(self.next_cast);
        let category = CastCategory::of(&spell);
        let mut instance = CastInstance::new(env, id, request, spell, self.seed);
        instance.prepare(env)?;

        let link = self.channel_link();
        if direct {
            instance.announce(env);
            let result = instance.cast(env, link.as_ref());
            self.detached.push(instance);
            return result.map(|()| id);
        }

        self.place(env, &instance);
        let slot = &mut self.slots[category.slot()];
        let instance = slot.insert(instance);
        instance.announce(env);
        debug!(
            target: "spell::cast",
            cast = %id,
            caster = %self.caster,
            spell = %instance.spell().id,
            category = %category,
            "cast started"
        );
        if instance.casts_immediately() {
            instance.cast(env, link.as_ref())?;
        }
        Ok(id)
    }

    fn check_conflicts(&self, spell: &SpellDefinition, flags: CastFlags) -> Result<(), CastError> {
        let context = || {
            ErrorContext::new()
                .with_caster(self.caster)
                .with_spell(spell.id)
        };

        if !flags.is_triggered()
            && !flags.contains(CastFlags::IGNORE_CAST_IN_PROGRESS)
            && self.cast_in_progress()
        {
            debug!(target: "spell::cast", caster = %self.caster, spell = %spell.id, "cast in progress");
            return Err(CastError::conflict(CastFailure::SpellInProgress, context()));
        }

        let category = CastCategory::of(spell);
        let blocked = self
            .slots
            .iter()
            .flatten()
            .filter(|occupant| occupant.state().is_active())
            .any(|occupant| {
                interrupts(category, spell, occupant) && !occupant.is_interruptible()
            });
        if blocked {
            debug!(target: "spell::cast", caster = %self.caster, spell = %spell.id, "occupant not interruptible");
            return Err(CastError::conflict(
                CastFailure::NotInterruptible,
                context().with_message("occupant cannot be interrupted"),
            ));
        }
        Ok(())
    }

    /// A generic cast still counting down, or a channel that blocks other actions.
    fn cast_in_progress(&self) -> bool {
        let generic = self
            .current(CastCategory::Generic)
            .is_some_and(|cast| cast.state() == CastState::Preparing);
        let channel = self.current(CastCategory::Channeled).is_some_and(|cast| {
            cast.state() == CastState::Casting
                && !cast
                    .spell()
                    .has_attribute(SpellAttributes::ALLOW_ACTIONS_DURING_CHANNEL)
        });
        generic || channel
    }

    /// Clears the way for `incoming`: interrupted occupants are cancelled, and
    /// whatever still sits in the incoming category's slot is detached.
    fn place(&mut self, env: &CastEnv<'_>, incoming: &CastInstance) {
        let category = incoming.category();
        let spell = Arc::clone(incoming.spell());

        for occupied in CastCategory::ALL {
            let slot = occupied.slot();
            let Some(occupant) = self.slots[slot].as_ref() else {
                continue;
            };
            let interrupt =
                occupant.state().is_active() && interrupts(category, &spell, occupant);
            if !interrupt && occupied != category {
                continue;
            }
            let Some(mut occupant) = self.slots[slot].take() else {
                continue;
            };
            if interrupt {
                trace!(
                    target: "spell::cast",
                    cast = %occupant.id(),
                    by = %incoming.id(),
                    "interrupted by a new cast"
                );
                if let Err(error) = occupant.cancel(env) {
                    warn!(target: "spell::cast", cast = %occupant.id(), %error, "interrupt failed");
                }
            }
            self.detached.push(occupant);
        }
    }

    // ===== driving =====

    /// Advances every instance by `elapsed_ms`, fires due auto-repeat shots and
    /// reclaims finished instances.
    ///
    /// # Errors
    ///
    /// The first error raised by any instance; the others are still advanced.
    pub fn update(&mut self, env: &CastEnv<'_>, elapsed_ms: u32) -> Result<(), CastError> {
        let link = self.channel_link();
        let mut first_error = None;

        for instance in self.slots.iter_mut().flatten().chain(self.detached.iter_mut()) {
            if let Err(error) = instance.update(env, elapsed_ms, link.as_ref()) {
                first_error.get_or_insert(error);
            }
        }
        if let Err(error) = self.drive_auto_repeat(env) {
            first_error.get_or_insert(error);
        }

        self.reclaim();
        first_error.map_or(Ok(()), Err)
    }

    fn drive_auto_repeat(&mut self, env: &CastEnv<'_>) -> Result<(), CastError> {
        let link = self.channel_link();
        let caster = self.caster;
        let Some(instance) = self.slots[CastCategory::AutoRepeat.slot()].as_mut() else {
            return Ok(());
        };
        if instance.state() != CastState::Idle
            || !env.upkeep().is_attack_ready(caster, AttackType::Ranged)
        {
            return Ok(());
        }
        if instance.refire(env)? {
            instance.announce(env);
            if instance.cast_time_ms() == 0 {
                instance.cast(env, link.as_ref())?;
            }
        }
        Ok(())
    }

    /// Resolves a delayed wave of `cast`. Returns the next wake offset, 0 once
    /// the instance is done.
    ///
    /// # Errors
    ///
    /// `UnknownCast` when the instance was already reclaimed.
    pub fn handle_delayed(
        &mut self,
        env: &CastEnv<'_>,
        cast: CastId,
        offset: u64,
    ) -> Result<u64, CastError> {
        let instance = self.instance_mut(cast).ok_or(CastError::UnknownCast(cast))?;
        instance.handle_delayed(env, offset)
    }

    /// The next melee swing releases a pending next-swing cast. Returns whether
    /// one was cast.
    pub fn on_melee_swing(&mut self, env: &CastEnv<'_>) -> Result<bool, CastError> {
        let link = self.channel_link();
        let Some(instance) = self.slots[CastCategory::Melee.slot()].as_mut() else {
            return Ok(false);
        };
        if instance.state() != CastState::Preparing {
            return Ok(false);
        }
        instance.cast(env, link.as_ref())?;
        Ok(true)
    }

    /// Cancels every current cast that moving interrupts. Returns how many
    /// were cancelled.
    pub fn on_caster_moved(&mut self, env: &CastEnv<'_>) -> usize {
        let mut cancelled = 0;
        for instance in self.slots.iter_mut().flatten() {
            if instance.interrupted_by_movement() && instance.cancel(env).is_ok() {
                cancelled += 1;
            }
        }
        cancelled
    }

    /// Applies damage pushback to the preparing generic cast and the running
    /// channel. Returns how many were pushed back.
    pub fn pushback(&mut self, env: &CastEnv<'_>) -> usize {
        let mut pushed = 0;
        for category in [CastCategory::Generic, CastCategory::Channeled] {
            if let Some(instance) = self.slots[category.slot()].as_mut()
                && instance.pushback(env).is_some()
            {
                pushed += 1;
            }
        }
        pushed
    }

    /// Cancels one instance, current or detached.
    ///
    /// # Errors
    ///
    /// `UnknownCast` for reclaimed instances, `Reentrant` from the instance.
    pub fn cancel(&mut self, env: &CastEnv<'_>, cast: CastId) -> Result<(), CastError> {
        let instance = self.instance_mut(cast).ok_or(CastError::UnknownCast(cast))?;
        instance.cancel(env)
    }

    /// Cancels the generic, channeled and auto-repeat casts. Delayed generic
    /// casts are only interrupted with `with_delayed`.
    pub fn interrupt_non_melee(&mut self, env: &CastEnv<'_>, with_delayed: bool) -> usize {
        let mut cancelled = 0;
        for category in [
            CastCategory::Generic,
            CastCategory::Channeled,
            CastCategory::AutoRepeat,
        ] {
            let Some(instance) = self.slots[category.slot()].as_mut() else {
                continue;
            };
            let state = instance.state();
            if !state.is_active() || (state == CastState::Delayed && !with_delayed) {
                continue;
            }
            if instance.cancel(env).is_ok() {
                cancelled += 1;
            }
        }
        cancelled
    }

    // ===== references =====

    /// Takes an external reference that keeps `cast` from being reclaimed.
    ///
    /// # Errors
    ///
    /// `UnknownCast` when the instance is gone.
    pub fn acquire(&mut self, cast: CastId) -> Result<(), CastError> {
        self.instance_mut(cast)
            .ok_or(CastError::UnknownCast(cast))
            .map(CastInstance::acquire)
    }

    /// # Errors
    ///
    /// `UnknownCast` when the instance is gone.
    pub fn release(&mut self, cast: CastId) -> Result<(), CastError> {
        self.instance_mut(cast)
            .ok_or(CastError::UnknownCast(cast))
            .map(CastInstance::release)
    }

    /// Drops finished, idle-of-work instances. Returns how many were dropped.
    pub fn reclaim(&mut self) -> usize {
        let mut reclaimed = 0;
        for slot in &mut self.slots {
            if slot.as_ref().is_some_and(CastInstance::is_reclaimable)
                && let Some(mut instance) = slot.take()
            {
                instance.reclaim();
                reclaimed += 1;
            }
        }
        self.detached.retain_mut(|instance| {
            if instance.is_reclaimable() {
                instance.reclaim();
                reclaimed += 1;
                false
            } else {
                true
            }
        });
        if reclaimed > 0 {
            trace!(target: "spell::cast", caster = %self.caster, reclaimed, "instances reclaimed");
        }
        reclaimed
    }

    // ===== queries =====

    /// What the running channel is bound to, cloned for other casts to read.
    pub fn channel_link(&self) -> Option<ChannelLink> {
        self.current(CastCategory::Channeled)
            .and_then(CastInstance::channel_link)
            .cloned()
    }

    pub fn current(&self, category: CastCategory) -> Option<&CastInstance> {
        self.slots[category.slot()].as_ref()
    }

    pub fn instance(&self, cast: CastId) -> Option<&CastInstance> {
        self.instances().find(|instance| instance.id() == cast)
    }

    fn instance_mut(&mut self, cast: CastId) -> Option<&mut CastInstance> {
        self.slots
            .iter_mut()
            .flatten()
            .chain(self.detached.iter_mut())
            .find(|instance| instance.id() == cast)
    }

    /// Current and detached instances.
    pub fn instances(&self) -> impl Iterator<Item = &CastInstance> {
        self.slots.iter().flatten().chain(self.detached.iter())
    }

    /// No instance is left, current or detached.
    pub fn is_empty(&self) -> bool {
        self.instances().next().is_none()
    }
}

/// Whether a new cast of `category` interrupts `occupant`.
fn interrupts(category: CastCategory, spell: &SpellDefinition, occupant: &CastInstance) -> bool {
    let delayed = occupant.state() == CastState::Delayed;
    let occupant_spell = occupant.spell();
    match (category, occupant.category()) {
        (CastCategory::Generic | CastCategory::Channeled, CastCategory::Generic) => !delayed,
        (CastCategory::Generic, CastCategory::Channeled) => {
            !delayed
                && !occupant_spell.has_attribute(SpellAttributes::ALLOW_ACTIONS_DURING_CHANNEL)
        }
        (CastCategory::Channeled, CastCategory::Channeled) => true,
        (CastCategory::Generic | CastCategory::Channeled, CastCategory::AutoRepeat) => {
            !occupant_spell.has_attribute(SpellAttributes::AUTO_SHOT)
        }
        (CastCategory::AutoRepeat, CastCategory::AutoRepeat) => true,
        (CastCategory::AutoRepeat, CastCategory::Generic | CastCategory::Channeled) => {
            !spell.has_attribute(SpellAttributes::AUTO_SHOT) && !delayed
        }
        (CastCategory::Melee, CastCategory::Melee) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cast::SpellTargets;
    use crate::env::CastNotification;
    use crate::spell::{DamageClass, EffectKind, ImplicitTarget, SpellEffect, SpellRange};
    use crate::testkit::{Sandbox, unit};
    use crate::types::{Position, SpellId};

    const CASTER: ObjectGuid = ObjectGuid(1);
    const FOE: ObjectGuid = ObjectGuid(2);

    fn damage_spell(id: u32, cast_time_ms: u32) -> SpellDefinition {
        let mut spell = SpellDefinition::new(SpellId(id), "strike");
        spell.cast_time_ms = cast_time_ms;
        spell.range = SpellRange::symmetric(30.0);
        spell.effects = vec![
            SpellEffect::new(EffectKind::SchoolDamage, ImplicitTarget::target_enemy())
                .with_base_points(7),
        ];
        spell
    }

    fn sandbox() -> Sandbox {
        let sandbox = Sandbox::new();
        sandbox.spawn(unit(CASTER.0, Position::ORIGIN));
        sandbox.spawn(unit(FOE.0, Position::new(10.0, 0.0, 0.0)).faction(2));
        sandbox
    }

    fn request(spell: u32) -> CastRequest {
        CastRequest::new(CASTER, SpellId(spell), SpellTargets::unit(FOE))
    }

    #[test]
    fn missing_definition_is_reported() {
        let sandbox = sandbox();
        let env = sandbox.env();
        let mut controller = CastController::new(CASTER, 1);

        assert_eq!(
            controller.prepare(&env, request(999)),
            Err(CastError::MissingDefinition(SpellId(999)))
        );
        assert!(controller.is_empty());
    }

    #[test]
    fn cast_in_progress_rejects_a_second_cast() {
        let sandbox = sandbox();
        sandbox.register(damage_spell(10, 2000));
        sandbox.register(damage_spell(11, 1000));
        let env = sandbox.env();
        let mut controller = CastController::new(CASTER, 1);

        let first = controller.prepare(&env, request(10)).expect("first cast");
        let second = controller.prepare(&env, request(11));

        assert_eq!(
            second.as_ref().err().and_then(CastError::failure),
            Some(CastFailure::SpellInProgress)
        );
        let current = controller.current(CastCategory::Generic).expect("slot");
        assert_eq!(current.id(), first);
        assert_eq!(current.state(), CastState::Preparing);
    }

    #[test]
    fn ignoring_cast_in_progress_interrupts_the_occupant() {
        let sandbox = sandbox();
        sandbox.register(damage_spell(10, 2000));
        sandbox.register(damage_spell(11, 1000));
        let env = sandbox.env();
        let mut controller = CastController::new(CASTER, 1);

        let first = controller.prepare(&env, request(10)).expect("first cast");
        let second = controller
            .prepare(&env, request(11).with_flags(CastFlags::IGNORE_CAST_IN_PROGRESS))
            .expect("second cast");

        assert_eq!(
            controller.instance(first).map(CastInstance::state),
            Some(CastState::Finished)
        );
        assert_eq!(controller.current(CastCategory::Generic).map(CastInstance::id), Some(second));
        assert!(sandbox.notifications().iter().any(|n| matches!(
            n,
            CastNotification::Interrupted { cast, .. } if *cast == first
        )));

        controller.update(&env, 0).expect("update");
        assert!(controller.instance(first).is_none());
    }

    #[test]
    fn non_interruptible_occupant_blocks_the_slot() {
        let sandbox = sandbox();
        let mut guarded = damage_spell(10, 2000);
        guarded.attributes |= SpellAttributes::NOT_INTERRUPTIBLE;
        sandbox.register(guarded);
        sandbox.register(damage_spell(11, 1000));
        let env = sandbox.env();
        let mut controller = CastController::new(CASTER, 1);

        controller.prepare(&env, request(10)).expect("first cast");
        let error = controller
            .prepare(&env, request(11).with_flags(CastFlags::IGNORE_CAST_IN_PROGRESS))
            .expect_err("blocked");

        assert_eq!(error.failure(), Some(CastFailure::NotInterruptible));
        assert_eq!(controller.instances().count(), 1);
    }

    #[test]
    fn delayed_projectile_survives_the_next_cast() {
        let sandbox = sandbox();
        let mut bolt = damage_spell(10, 0);
        bolt.speed = 10.0;
        sandbox.register(bolt);
        sandbox.register(damage_spell(11, 0));
        let env = sandbox.env();
        let mut controller = CastController::new(CASTER, 1);

        let bolt = controller.prepare(&env, request(10)).expect("bolt");
        assert_eq!(
            controller.instance(bolt).map(CastInstance::state),
            Some(CastState::Delayed)
        );
        controller.prepare(&env, request(11)).expect("instant");
        assert_eq!(sandbox.damage_dealt(FOE), 7);

        assert_eq!(controller.handle_delayed(&env, bolt, 1000), Ok(0));
        assert_eq!(sandbox.damage_dealt(FOE), 14);

        controller.update(&env, 0).expect("update");
        assert!(controller.is_empty());
    }

    #[test]
    fn next_swing_waits_for_the_swing() {
        let sandbox = sandbox();
        let mut strike = damage_spell(20, 0);
        strike.attributes |= SpellAttributes::ON_NEXT_SWING;
        strike.damage_class = DamageClass::Melee;
        strike.range = SpellRange::symmetric(15.0);
        sandbox.register(strike);
        let env = sandbox.env();
        let mut controller = CastController::new(CASTER, 1);

        let id = controller.prepare(&env, request(20)).expect("strike");
        controller.update(&env, 500).expect("update");
        assert_eq!(controller.instance(id).map(CastInstance::state), Some(CastState::Preparing));

        assert_eq!(controller.on_melee_swing(&env), Ok(true));
        assert_eq!(sandbox.damage_dealt(FOE), 7);
        assert_eq!(sandbox.attack_resets(CASTER, AttackType::MainHand), 1);
    }

    #[test]
    fn references_hold_off_reclaim() {
        let sandbox = sandbox();
        sandbox.register(damage_spell(11, 0));
        let env = sandbox.env();
        let mut controller = CastController::new(CASTER, 1);

        let id = controller.prepare(&env, request(11)).expect("instant");
        controller.acquire(id).expect("acquire");
        assert_eq!(controller.reclaim(), 0);

        controller.release(id).expect("release");
        assert_eq!(controller.reclaim(), 1);
        assert_eq!(controller.acquire(id), Err(CastError::UnknownCast(id)));
    }

    #[test]
    fn auto_repeat_refires_when_the_attack_is_ready() {
        let sandbox = sandbox();
        let mut shot = damage_spell(30, 0);
        shot.attributes |= SpellAttributes::AUTO_REPEAT;
        shot.damage_class = DamageClass::Ranged;
        sandbox.register(shot);
        let env = sandbox.env();
        let mut controller = CastController::new(CASTER, 1);

        let id = controller.prepare(&env, request(30)).expect("shot");
        controller.update(&env, 0).expect("first shot");
        assert_eq!(sandbox.damage_dealt(FOE), 7);
        assert_eq!(controller.instance(id).map(CastInstance::state), Some(CastState::Idle));

        sandbox.set_attack_ready(CASTER, AttackType::Ranged, false);
        controller.update(&env, 100).expect("waiting");
        assert_eq!(sandbox.damage_dealt(FOE), 7);

        sandbox.set_attack_ready(CASTER, AttackType::Ranged, true);
        controller.update(&env, 100).expect("second shot");
        assert_eq!(sandbox.damage_dealt(FOE), 14);

        assert_eq!(controller.interrupt_non_melee(&env, false), 1);
        controller.update(&env, 0).expect("reclaim");
        assert!(controller.is_empty());
    }

    #[test]
    fn moving_cancels_a_cast_in_progress() {
        let sandbox = sandbox();
        sandbox.register(damage_spell(10, 2000));
        let env = sandbox.env();
        let mut controller = CastController::new(CASTER, 1);

        let id = controller.prepare(&env, request(10)).expect("cast");
        assert_eq!(controller.on_caster_moved(&env), 1);
        assert_eq!(controller.instance(id).map(CastInstance::state), Some(CastState::Finished));
    }
}
