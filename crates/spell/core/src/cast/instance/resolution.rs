use std::sync::Arc;

use tracing::trace;

use crate::env::{CastEnv, CastNotification};
use crate::spell::SpellDefinition;
use crate::types::ObjectGuid;

use super::super::delay::{DelayPoll, DueTarget};
use super::super::hit::{HitResolver, channel_duration};
use super::super::{CastError, CastState};
use super::CastInstance;

impl CastInstance {
    // ===== immediate =====

    /// Resolves every record at once. Channeled spells start their channel
    /// first and stay `Casting`; everything else finishes.
    pub(super) fn handle_immediate(&mut self, env: &CastEnv<'_>) {
        let spell = Arc::clone(&self.spell);

        if spell.is_channeled()
            && let Some(duration) = channel_duration(env, self.caster, &spell, &self.values)
        {
            self.state = CastState::Casting;
            self.channel.arm(duration);
            self.channel.set_destination(self.targets.dst);
            env.notify(CastNotification::ChannelStart {
                cast: self.id,
                caster: self.caster,
                spell: spell.id,
                duration,
            });
        }

        self.run_launch(env, &spell);
        self.run_immediate(env, &spell);

        let units: Vec<ObjectGuid> = self.registry.units().iter().map(|unit| unit.guid).collect();
        for guid in units {
            self.resolve_unit(env, &spell, guid);
        }
        let objects: Vec<ObjectGuid> = self.registry.objects().iter().map(|object| object.guid).collect();
        for guid in objects {
            self.resolve_game_object(env, &spell, guid);
        }
        let corpses: Vec<ObjectGuid> = self.registry.corpses().iter().map(|corpse| corpse.guid).collect();
        for guid in corpses {
            self.resolve_corpse(env, &spell, guid);
        }

        if self.state != CastState::Casting {
            self.finish(env, true);
        }
    }

    // ===== delayed =====

    /// Processes whatever is due at `offset` milliseconds since the cast went
    /// off. Returns the next wake offset, or 0 once the cast is finished.
    /// Calling again before the returned offset is a no-op.
    ///
    /// # Errors
    ///
    /// `Reentrant` when called from inside one of the instance's own phases.
    pub fn handle_delayed(&mut self, env: &CastEnv<'_>, offset: u64) -> Result<u64, CastError> {
        if self.state != CastState::Delayed {
            return Ok(0);
        }
        self.guarded(|this| Ok(this.delayed_wave(env, offset)))
    }

    fn delayed_wave(&mut self, env: &CastEnv<'_>, offset: u64) -> u64 {
        let wave = match self.delay.poll(&self.registry, offset) {
            DelayPoll::Sleep(wake) => return wake,
            DelayPoll::Wave(wave) => wave,
        };
        let spell = Arc::clone(&self.spell);

        if wave.launch {
            self.run_launch(env, &spell);
        }
        if wave.immediate {
            self.run_immediate(env, &spell);
        }
        for due in &wave.due {
            match *due {
                DueTarget::Unit(guid) => self.resolve_unit(env, &spell, guid),
                DueTarget::GameObject(guid) => self.resolve_game_object(env, &spell, guid),
                DueTarget::Corpse(guid) => self.resolve_corpse(env, &spell, guid),
            }
        }
        trace!(
            target: "spell::cast",
            cast = %self.id,
            offset,
            resolved = wave.due.len(),
            next_wake = wave.next_wake,
            "delayed wave"
        );

        if wave.next_wake == 0 {
            self.finish(env, true);
            return 0;
        }
        env.scheduler().schedule(self.caster, self.id, wave.next_wake);
        wave.next_wake
    }

    // ===== phases =====

    fn run_launch(&mut self, env: &CastEnv<'_>, spell: &SpellDefinition) {
        HitResolver::new(
            *env,
            self.id,
            self.caster,
            spell,
            &self.values,
            &self.hooks,
            &mut self.procs,
            &mut self.rolls,
        )
        .launch();
        self.delay.mark_launched();
    }

    /// Destination and item effects; these never wait on travel time.
    fn run_immediate(&mut self, env: &CastEnv<'_>, spell: &SpellDefinition) {
        let resolver = HitResolver::new(
            *env,
            self.id,
            self.caster,
            spell,
            &self.values,
            &self.hooks,
            &mut self.procs,
            &mut self.rolls,
        );
        for slot in self.registry.destinations() {
            resolver.resolve_destination(slot.effect, &slot.location);
        }
        for item in self.registry.items_mut() {
            if !item.processed {
                item.processed = true;
                resolver.resolve_object(item.guid, item.effect_mask);
            }
        }
        self.delay.mark_immediate();
    }

    fn resolve_unit(&mut self, env: &CastEnv<'_>, spell: &SpellDefinition, guid: ObjectGuid) {
        let Some(record) = self.registry.unit_mut(guid) else {
            return;
        };
        if record.processed {
            return;
        }
        let hit = HitResolver::new(
            *env,
            self.id,
            self.caster,
            spell,
            &self.values,
            &self.hooks,
            &mut self.procs,
            &mut self.rolls,
        )
        .resolve_unit(record);
        let mask = record.effect_mask;

        if hit.combo_points != 0 {
            self.combo_gain += hit.combo_points;
            self.combo_target = hit.hit_target;
        }
        if self.targets.unit == Some(guid) && !hit.landed {
            self.consume_combo = false;
        }
        if spell.is_channeled()
            && hit.landed
            && hit.alive
            && let Some(target) = hit.hit_target
        {
            self.channel.mark_target(target, mask);
        }
    }

    fn resolve_game_object(&mut self, env: &CastEnv<'_>, spell: &SpellDefinition, guid: ObjectGuid) {
        let resolver = HitResolver::new(
            *env,
            self.id,
            self.caster,
            spell,
            &self.values,
            &self.hooks,
            &mut self.procs,
            &mut self.rolls,
        );
        if let Some(object) = self
            .registry
            .objects_mut()
            .iter_mut()
            .find(|object| object.guid == guid && !object.processed)
        {
            object.processed = true;
            resolver.resolve_object(object.guid, object.effect_mask);
        }
    }

    fn resolve_corpse(&mut self, env: &CastEnv<'_>, spell: &SpellDefinition, guid: ObjectGuid) {
        let resolver = HitResolver::new(
            *env,
            self.id,
            self.caster,
            spell,
            &self.values,
            &self.hooks,
            &mut self.procs,
            &mut self.rolls,
        );
        if let Some(corpse) = self
            .registry
            .corpses_mut()
            .iter_mut()
            .find(|corpse| corpse.guid == guid && !corpse.processed)
        {
            corpse.processed = true;
            resolver.resolve_object(corpse.guid, corpse.effect_mask);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cast::{CastRequest, SpellTargets};
    use crate::config::CastConfig;
    use crate::spell::{EffectKind, ImplicitTarget, SpellEffect, SpellRange};
    use crate::testkit::{Sandbox, unit};
    use crate::types::{CastId, Position, SpellId};

    fn missile(speed: f32) -> SpellDefinition {
        let mut spell = SpellDefinition::new(SpellId(200), "missile");
        spell.speed = speed;
        spell.range = SpellRange::symmetric(40.0);
        spell.effects = vec![
            SpellEffect::new(EffectKind::SchoolDamage, ImplicitTarget::target_enemy())
                .with_base_points(10),
        ];
        spell
    }

    #[test]
    fn projectile_lands_after_its_travel_time() {
        let sandbox = Sandbox::new();
        sandbox.spawn(unit(1, Position::ORIGIN));
        let target = sandbox.spawn(unit(2, Position::new(20.0, 0.0, 0.0)).faction(2));
        let env = CastEnv::with_all(&sandbox, &CastConfig::DEFAULT);

        // 20 yards at 20 yards per second
        let request = CastRequest::new(ObjectGuid(1), SpellId(200), SpellTargets::unit(target.guid));
        let mut cast = CastInstance::new(&env, CastId(3), request, Arc::new(missile(20.0)), 11);
        cast.prepare(&env).expect("prepare");
        cast.cast(&env, None).expect("cast");
        assert_eq!(cast.state(), CastState::Delayed);
        assert_eq!(sandbox.scheduled(CastId(3)), Some(1000));

        assert_eq!(cast.handle_delayed(&env, 400), Ok(1000));
        assert_eq!(sandbox.damage_dealt(target.guid), 0);

        assert_eq!(cast.handle_delayed(&env, 1000), Ok(0));
        assert_eq!(sandbox.damage_dealt(target.guid), 10);
        assert_eq!(cast.state(), CastState::Finished);
    }

    #[test]
    fn self_cast_projectile_has_no_delay() {
        let sandbox = Sandbox::new();
        sandbox.spawn(unit(1, Position::ORIGIN));
        let env = CastEnv::with_all(&sandbox, &CastConfig::DEFAULT);

        let mut spell = missile(20.0);
        spell.effects[0] = SpellEffect::new(EffectKind::Heal, ImplicitTarget::caster()).with_base_points(5);
        let request = CastRequest::new(ObjectGuid(1), SpellId(200), SpellTargets::none());
        let mut cast = CastInstance::new(&env, CastId(4), request, Arc::new(spell), 11);
        cast.prepare(&env).expect("prepare");
        cast.cast(&env, None).expect("cast");

        assert_eq!(cast.registry().units()[0].delay_ms, 0);
        assert_eq!(cast.handle_delayed(&env, 0), Ok(0));
        assert_eq!(sandbox.healing_done(ObjectGuid(1)), 5);
        assert_eq!(cast.state(), CastState::Finished);
    }
}
