use std::sync::Arc;

use tracing::{debug, error, trace};

use crate::env::{AttackType, CastCheck, CastEnv, CastNotification, CheckStage, MissResult};
use crate::spell::{DamageClass, SpellAttributes};

use super::super::channel::ChannelLink;
use super::super::delay::DelayScheduler;
use super::super::procs::ProcCoordinator;
use super::super::{CastError, CastFailure, CastFlags, CastState};
use super::CastInstance;

impl CastInstance {
    // ===== prepare =====

    /// Validation, proc preparation and cast time. On success the instance is
    /// `Preparing`; slot placement and the start notification are up to the
    /// controller.
    ///
    /// # Errors
    ///
    /// `Validation` when the validator or a check-cast hook refuses; the
    /// instance is then `Finished` and one `CastFailed` was emitted.
    pub fn prepare(&mut self, env: &CastEnv<'_>) -> Result<(), CastError> {
        self.guarded(|this| this.prepare_phase(env))
    }

    fn prepare_phase(&mut self, env: &CastEnv<'_>) -> Result<(), CastError> {
        if self.state != CastState::None {
            return Err(self.invalid_state("prepare"));
        }
        if let Err(failure) = self.validate(env, CheckStage::Prepare) {
            return Err(self.reject(env, failure));
        }

        self.procs = ProcCoordinator::prepare(env, self.id, self.caster, &self.spell);
        self.cast_time_ms = if self.flags.is_triggered() {
            0
        } else {
            let speed = env.world().cast_speed(self.caster).max(0.0);
            (self.spell.cast_time_ms as f32 * speed) as u32
        };
        self.timer_ms = self.cast_time_ms;
        self.state = CastState::Preparing;

        trace!(
            target: "spell::cast",
            cast = %self.id,
            spell = %self.spell.id,
            cast_time = self.cast_time_ms,
            "prepared"
        );
        Ok(())
    }

    /// Start notification and global cooldown, once the cast holds its slot.
    pub fn announce(&self, env: &CastEnv<'_>) {
        env.notify(CastNotification::CastStart {
            cast: self.id,
            caster: self.caster,
            spell: self.spell.id,
            cast_time_ms: self.cast_time_ms,
        });
        if !self.flags.is_triggered()
            && !self.flags.contains(CastFlags::IGNORE_GCD)
            && self.spell.start_recovery_ms > 0
        {
            env.upkeep().trigger_global_cooldown(self.caster, &self.spell);
        }
    }

    fn validate(&self, env: &CastEnv<'_>, stage: CheckStage) -> Result<(), CastFailure> {
        if self.flags.is_triggered() && stage != CheckStage::AutoRepeat {
            return Ok(());
        }
        env.validator().check_cast(&CastCheck {
            caster: self.caster,
            spell: &self.spell,
            targets: &self.targets,
            flags: self.flags,
            stage,
        })?;
        self.hooks.check_cast(&self.hook_context(&self.spell))
    }

    /// Reports `failure`, ends the instance and builds the validation error.
    fn reject(&mut self, env: &CastEnv<'_>, failure: CastFailure) -> CastError {
        debug!(
            target: "spell::cast",
            cast = %self.id,
            spell = %self.spell.id,
            failure = %failure,
            "cast rejected"
        );
        self.notify_failed(env, failure);
        self.finish(env, false);
        CastError::validation(failure, self.context())
    }

    // ===== cast =====

    /// Re-validates, selects targets, then either resolves everything now,
    /// starts the channel or hands the projectiles to the delay scheduler.
    ///
    /// # Errors
    ///
    /// `Validation` or `Targeting` failures end the instance after one
    /// `CastFailed` notification; `CorruptEffectMask` aborts it.
    pub fn cast(
        &mut self,
        env: &CastEnv<'_>,
        channel: Option<&ChannelLink>,
    ) -> Result<(), CastError> {
        self.guarded(|this| this.cast_phase(env, channel))
    }

    pub(super) fn cast_phase(
        &mut self,
        env: &CastEnv<'_>,
        channel: Option<&ChannelLink>,
    ) -> Result<(), CastError> {
        if self.state != CastState::Preparing {
            return Err(self.invalid_state("cast"));
        }
        if let Err(failure) = self.validate(env, CheckStage::Cast) {
            return Err(self.reject(env, failure));
        }

        let spell = Arc::clone(&self.spell);
        let ctx = self.hook_context(&spell);
        self.hooks.before_cast(&ctx);

        let delay_moment = match self.select_targets(env, channel) {
            Ok(delay_moment) => delay_moment,
            Err(failure) => {
                debug!(
                    target: "spell::targets",
                    cast = %self.id,
                    spell = %spell.id,
                    failure = %failure,
                    "target selection failed"
                );
                self.registry.clear();
                self.notify_failed(env, failure);
                self.finish(env, false);
                return Err(CastError::targeting(failure, self.context()));
            }
        };

        if let Some(mask) = self.registry.corrupt_mask() {
            error!(
                target: "spell::cast",
                cast = %self.id,
                spell = %spell.id,
                mask = %mask,
                "record carries a non-existent effect"
            );
            self.registry.clear();
            self.finish(env, false);
            return Err(CastError::CorruptEffectMask {
                spell: spell.id,
                mask,
            });
        }

        self.hooks.on_cast(&ctx);
        self.notify_spell_go(env);
        self.procs.on_cast(env, &spell);

        if spell.has_hit_delay() && !spell.is_channeled() {
            self.state = CastState::Delayed;
            self.delay =
                DelayScheduler::new(spell.launch_delay_ms(), delay_moment, self.targets.has_dst());
            env.scheduler()
                .schedule(self.caster, self.id, self.delay.first_wake());
            trace!(
                target: "spell::cast",
                cast = %self.id,
                delay_moment,
                first_wake = self.delay.first_wake(),
                "projectiles launched"
            );
        } else {
            self.handle_immediate(env);
        }

        self.hooks.after_cast(&ctx);
        self.procs.fire_cast_links(env, &spell, self.targets.unit);
        Ok(())
    }

    // ===== update =====

    /// Advances the cast timer or the channel by `elapsed_ms`.
    ///
    /// # Errors
    ///
    /// Propagates the failure of a cast started by timer expiry.
    pub fn update(
        &mut self,
        env: &CastEnv<'_>,
        elapsed_ms: u32,
        channel: Option<&ChannelLink>,
    ) -> Result<(), CastError> {
        if !matches!(self.state, CastState::Preparing | CastState::Casting) {
            return Ok(());
        }
        self.guarded(|this| this.update_phase(env, elapsed_ms, channel))
    }

    fn update_phase(
        &mut self,
        env: &CastEnv<'_>,
        elapsed_ms: u32,
        channel: Option<&ChannelLink>,
    ) -> Result<(), CastError> {
        if let Some(unit) = self.targets.unit
            && unit != self.caster
            && env.world().object(unit).is_none()
        {
            debug!(target: "spell::cast", cast = %self.id, unit = %unit, "explicit target vanished");
            self.cancel_phase(env);
            return Ok(());
        }

        match self.state {
            CastState::Preparing => {
                self.timer_ms = self.timer_ms.saturating_sub(elapsed_ms);
                if self.timer_ms == 0 && !self.spell.is_next_swing() {
                    return self.cast_phase(env, channel);
                }
            }
            CastState::Casting => self.update_channel(env, elapsed_ms),
            _ => {}
        }
        Ok(())
    }

    fn update_channel(&mut self, env: &CastEnv<'_>, elapsed_ms: u32) {
        if !self.channel.is_expired() {
            let spell = Arc::clone(&self.spell);
            let ignore_los = self.ignores_line_of_sight();
            let alive = match env.world().unit(self.caster) {
                Some(caster) => {
                    self.channel
                        .prune(env, &caster, &spell, &mut self.registry, ignore_los)
                }
                None => false,
            };
            if !alive {
                debug!(target: "spell::channel", cast = %self.id, "no channel target left");
                self.notify_channel_update(env, 0);
                self.finish(env, true);
                return;
            }
            self.channel.tick(elapsed_ms);
        }
        if self.channel.is_expired() {
            self.notify_channel_update(env, 0);
            self.finish(env, true);
        }
    }

    // ===== pushback =====

    /// Damage pushback. Lengthens a cast in progress or shortens a running
    /// channel; returns the milliseconds applied.
    pub fn pushback(&mut self, env: &CastEnv<'_>) -> Option<u32> {
        if self.executing || self.spell.has_attribute(SpellAttributes::NO_PUSHBACK) {
            return None;
        }
        if !matches!(self.state, CastState::Preparing | CastState::Casting) {
            return None;
        }
        if self.pushbacks >= env.config().max_pushbacks {
            return None;
        }
        self.pushbacks += 1;

        let reduction = env
            .world()
            .pushback_reduction_pct(self.caster, self.spell.id);
        if reduction >= 100 {
            return None;
        }

        if self.state == CastState::Preparing {
            let mut delay = env.config().cast_pushback_ms * (100 - reduction) / 100;
            if self.timer_ms + delay > self.cast_time_ms {
                delay = self.cast_time_ms - self.timer_ms;
                self.timer_ms = self.cast_time_ms;
            } else {
                self.timer_ms += delay;
            }
            env.notify(CastNotification::CastDelayed {
                cast: self.id,
                caster: self.caster,
                spell: self.spell.id,
                delay_ms: delay,
            });
            return Some(delay);
        }

        let spell = Arc::clone(&self.spell);
        let delay = self
            .channel
            .pushback(env, self.caster, &spell, &self.registry, reduction)?;
        self.notify_channel_update(env, self.channel.remaining_ms().unwrap_or(0));
        Some(delay)
    }

    // ===== cancel =====

    /// Interrupts the cast from any state. Finished instances are left alone.
    ///
    /// # Errors
    ///
    /// `Reentrant` when called while one of the instance's phases is running.
    pub fn cancel(&mut self, env: &CastEnv<'_>) -> Result<(), CastError> {
        if self.state.is_finished() && !self.executing {
            return Ok(());
        }
        self.guarded(|this| {
            this.cancel_phase(env);
            Ok(())
        })
    }

    pub(super) fn cancel_phase(&mut self, env: &CastEnv<'_>) {
        match self.state {
            CastState::Preparing => {
                if !self.flags.is_triggered() {
                    env.upkeep().cancel_global_cooldown(self.caster, &self.spell);
                }
                self.notify_interrupted(env);
            }
            CastState::Delayed => self.notify_interrupted(env),
            CastState::Casting => {
                self.strip_auras(env);
                self.notify_channel_update(env, 0);
                self.notify_interrupted(env);
            }
            _ => {}
        }
        env.scheduler().cancel(self.caster, self.id);
        self.finish(env, false);
    }

    /// Removes the auras this instance applied to targets that are still alive.
    /// Each handle is taken out of its record, so it is removed at most once.
    fn strip_auras(&mut self, env: &CastEnv<'_>) {
        let world = env.world();
        let auras = env.auras();
        for record in self.registry.units_mut() {
            let holder = match (record.miss, record.reflect) {
                (MissResult::None, _) => record.guid,
                (MissResult::Reflect, MissResult::None) => self.caster,
                _ => continue,
            };
            let Some(handle) = record.aura.take() else {
                continue;
            };
            if world.unit(holder).is_some_and(|unit| unit.alive) {
                auras.remove(handle);
            }
        }
    }

    // ===== auto-repeat =====

    /// Starts the next auto-repeat shot from `Idle`. Returns false when the
    /// instance is not idle.
    ///
    /// # Errors
    ///
    /// `Validation` when the shot is no longer legal; the instance is then finished.
    pub fn refire(&mut self, env: &CastEnv<'_>) -> Result<bool, CastError> {
        if self.state != CastState::Idle {
            return Ok(false);
        }
        self.guarded(|this| {
            this.targets = this.requested.clone();
            if let Err(failure) = this.validate(env, CheckStage::AutoRepeat) {
                this.state = CastState::Preparing;
                return Err(this.reject(env, failure));
            }
            this.registry.clear();
            this.procs = ProcCoordinator::prepare(env, this.id, this.caster, &this.spell);
            this.delay = DelayScheduler::default();
            this.pushbacks = 0;
            this.combo_gain = 0;
            this.combo_target = None;
            this.consume_combo = true;
            this.timer_ms = this.cast_time_ms;
            this.state = CastState::Preparing;
            Ok(true)
        })
    }

    // ===== finish =====

    /// Terminal bookkeeping. A successful auto-repeat shot parks the instance
    /// in `Idle` instead of `Finished`.
    pub(super) fn finish(&mut self, env: &CastEnv<'_>, success: bool) {
        if self.state.is_finished() {
            return;
        }
        self.channel.disarm();
        if !success {
            self.state = CastState::Finished;
            return;
        }

        let spell = Arc::clone(&self.spell);
        let upkeep = env.upkeep();
        if spell.has_attribute(SpellAttributes::FINISHING_MOVE) && self.consume_combo {
            upkeep.clear_combo_points(self.caster);
        }
        if self.combo_gain != 0
            && let Some(target) = self.combo_target
        {
            upkeep.add_combo_points(self.caster, target, self.combo_gain);
        }

        self.procs.on_finish(env, &spell);

        if !spell.has_attribute(SpellAttributes::KEEP_SWING_TIMER) && !self.flags.is_triggered() {
            match spell.damage_class {
                DamageClass::Melee => {
                    upkeep.reset_attack_timer(self.caster, AttackType::MainHand);
                    upkeep.reset_attack_timer(self.caster, AttackType::OffHand);
                }
                DamageClass::Ranged => upkeep.reset_attack_timer(self.caster, AttackType::Ranged),
                DamageClass::Magic | DamageClass::None => {}
            }
        }

        self.state = if spell.is_auto_repeat() {
            CastState::Idle
        } else {
            CastState::Finished
        };
        trace!(target: "spell::cast", cast = %self.id, state = %self.state, "finished");
    }

    // ===== notifications =====

    fn notify_failed(&self, env: &CastEnv<'_>, reason: CastFailure) {
        env.notify(CastNotification::CastFailed {
            cast: self.id,
            caster: self.caster,
            spell: self.spell.id,
            reason,
        });
    }

    fn notify_interrupted(&self, env: &CastEnv<'_>) {
        env.notify(CastNotification::Interrupted {
            cast: self.id,
            caster: self.caster,
            spell: self.spell.id,
        });
        self.notify_failed(env, CastFailure::Interrupted);
    }

    pub(super) fn notify_channel_update(&self, env: &CastEnv<'_>, remaining_ms: u32) {
        env.notify(CastNotification::ChannelUpdate {
            cast: self.id,
            caster: self.caster,
            spell: self.spell.id,
            remaining_ms,
        });
    }

    fn invalid_state(&self, operation: &'static str) -> CastError {
        CastError::InvalidState {
            cast: self.id,
            state: self.state,
            operation,
        }
    }
}
