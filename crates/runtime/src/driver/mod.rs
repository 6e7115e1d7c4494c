//! External tick driver for the cast pipeline.
//!
//! [`CastDriver`] owns one [`CastController`] per caster together with the
//! runtime-side collaborators: the [`Timeline`] that re-enters delayed casts,
//! the [`NotificationBus`] and the [`ProcRelay`] holding triggered casts until
//! the phase that requested them has returned. The world itself (units,
//! geometry, auras, combat math, validation, procs) is supplied by the embedder
//! as a single [`CastWorld`].
mod relay;
mod timeline;

pub use relay::ProcRelay;
pub use timeline::{DueWake, Timeline};

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, trace, warn};

use spell_core::env::compute_seed;
use spell_core::{
    AuraStore, CastCategory, CastConfig, CastController, CastEnv, CastFlags, CastId, CastRequest,
    CastState, CastValidator, CasterUpkeep, CombatMath, HookRegistry, ObjectGuid, OracleError,
    PcgRng, ProcEvaluator, SpatialQuery, SpellId, SpellOracle, WorldOracle,
};

use crate::api::{Result, RuntimeError};
use crate::events::NotificationBus;

/// Everything the embedder provides to the pipeline.
pub trait CastWorld:
    WorldOracle
    + SpatialQuery
    + CombatMath
    + CastValidator
    + AuraStore
    + CasterUpkeep
    + ProcEvaluator
    + 'static
{
}

impl<T> CastWorld for T where
    T: WorldOracle
        + SpatialQuery
        + CombatMath
        + CastValidator
        + AuraStore
        + CasterUpkeep
        + ProcEvaluator
        + 'static
{
}

/// What one `tick` did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    pub now_ms: u64,
    /// Delayed-cast wakes handled.
    pub waves: usize,
    pub triggered: usize,
    pub reclaimed: usize,
    /// Instances whose update or wake returned an error.
    pub errors: usize,
}

/// Read-only view of one live cast instance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CastSummary {
    pub cast: CastId,
    pub spell: SpellId,
    pub category: CastCategory,
    pub state: CastState,
    pub remaining_ms: Option<u32>,
}

struct Services<W: CastWorld> {
    spells: Arc<dyn SpellOracle>,
    world: Arc<W>,
    relay: ProcRelay<W>,
    timeline: Timeline,
    bus: NotificationBus,
    rng: PcgRng,
    config: CastConfig,
    hooks: Option<Arc<HookRegistry>>,
}

impl<W: CastWorld> Services<W> {
    fn env(&self) -> std::result::Result<CastEnv<'_>, OracleError> {
        let world: &W = &self.world;
        let mut builder = CastEnv::builder()
            .spells(self.spells.as_ref())
            .world(world)
            .spatial(world)
            .combat(world)
            .validator(world)
            .auras(world)
            .upkeep(world)
            .procs(&self.relay)
            .notifications(&self.bus)
            .scheduler(&self.timeline)
            .rng(&self.rng)
            .config(&self.config);
        if let Some(hooks) = self.hooks.as_deref() {
            builder = builder.hooks(hooks);
        }
        builder.build()
    }
}

/// Per-caster cast controllers driven by an external clock.
pub struct CastDriver<W: CastWorld> {
    services: Services<W>,
    controllers: BTreeMap<ObjectGuid, CastController>,
    seed: u64,
    trigger_limit: usize,
}

impl<W: CastWorld> CastDriver<W> {
    pub const DEFAULT_TRIGGER_LIMIT: usize = 64;

    pub fn new(
        spells: Arc<dyn SpellOracle>,
        world: Arc<W>,
        bus: NotificationBus,
        config: CastConfig,
    ) -> Self {
        Self {
            services: Services {
                spells,
                relay: ProcRelay::new(Arc::clone(&world)),
                world,
                timeline: Timeline::new(),
                bus,
                rng: PcgRng,
                config,
                hooks: None,
            },
            controllers: BTreeMap::new(),
            seed: 0,
            trigger_limit: Self::DEFAULT_TRIGGER_LIMIT,
        }
    }

    /// Base seed mixed into every caster's roll seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    #[must_use]
    pub fn with_hooks(mut self, hooks: Arc<HookRegistry>) -> Self {
        self.services.hooks = Some(hooks);
        self
    }

    /// Triggered casts started per drain before the rest are dropped.
    #[must_use]
    pub fn with_trigger_limit(mut self, limit: usize) -> Self {
        self.trigger_limit = limit;
        self
    }

    // ===== commands =====

    /// Starts a cast for `request.caster`, creating its controller on first use.
    pub fn prepare(&mut self, request: CastRequest) -> Result<CastId> {
        let env = self.services.env()?;
        let caster = request.caster;
        let seed = self.seed;
        let result = self
            .controllers
            .entry(caster)
            .or_insert_with(|| CastController::new(caster, caster_seed(seed, caster)))
            .prepare(&env, request);
        Self::drain_triggered(
            &env,
            &self.services.relay,
            &mut self.controllers,
            self.seed,
            self.trigger_limit,
        );
        Ok(result?)
    }

    pub fn cancel(&mut self, caster: ObjectGuid, cast: CastId) -> Result<()> {
        let env = self.services.env()?;
        let controller = self
            .controllers
            .get_mut(&caster)
            .ok_or(RuntimeError::UnknownCaster(caster))?;
        controller.cancel(&env, cast)?;
        self.services.timeline.forget(caster, cast);
        Ok(())
    }

    /// Damage pushback on every pushable cast of `caster`.
    pub fn pushback(&mut self, caster: ObjectGuid) -> Result<usize> {
        let env = self.services.env()?;
        Ok(self
            .controllers
            .get_mut(&caster)
            .map_or(0, |controller| controller.pushback(&env)))
    }

    /// The caster swung; a pending next-swing spell goes off. Returns whether
    /// one did.
    pub fn melee_swing(&mut self, caster: ObjectGuid) -> Result<bool> {
        let env = self.services.env()?;
        let Some(controller) = self.controllers.get_mut(&caster) else {
            return Ok(false);
        };
        let fired = controller.on_melee_swing(&env)?;
        Self::drain_triggered(
            &env,
            &self.services.relay,
            &mut self.controllers,
            self.seed,
            self.trigger_limit,
        );
        Ok(fired)
    }

    /// The caster moved; casts that cannot be cast while moving are cancelled.
    pub fn caster_moved(&mut self, caster: ObjectGuid) -> Result<usize> {
        let env = self.services.env()?;
        Ok(self
            .controllers
            .get_mut(&caster)
            .map_or(0, |controller| controller.on_caster_moved(&env)))
    }

    pub fn interrupt(&mut self, caster: ObjectGuid, with_delayed: bool) -> Result<usize> {
        let env = self.services.env()?;
        Ok(self
            .controllers
            .get_mut(&caster)
            .map_or(0, |controller| controller.interrupt_non_melee(&env, with_delayed)))
    }

    // ===== clock =====

    /// Advances the clock by `elapsed_ms`: updates every controller, wakes due
    /// delayed casts in wake order, starts triggered casts and reclaims
    /// finished instances.
    pub fn tick(&mut self, elapsed_ms: u32) -> Result<TickReport> {
        let now_ms = self.services.timeline.advance(u64::from(elapsed_ms));
        let env = self.services.env()?;
        let mut report = TickReport {
            now_ms,
            ..TickReport::default()
        };

        for (caster, controller) in &mut self.controllers {
            if let Err(error) = controller.update(&env, elapsed_ms) {
                warn!(target: "runtime::driver", %caster, %error, "update failed");
                report.errors += 1;
            }
        }
        report.triggered += Self::drain_triggered(
            &env,
            &self.services.relay,
            &mut self.controllers,
            self.seed,
            self.trigger_limit,
        );

        for wake in self.services.timeline.due() {
            report.waves += 1;
            let Some(controller) = self.controllers.get_mut(&wake.caster) else {
                self.services.timeline.forget(wake.caster, wake.cast);
                continue;
            };
            match controller.handle_delayed(&env, wake.cast, wake.offset_ms) {
                Ok(0) => self.services.timeline.forget(wake.caster, wake.cast),
                Ok(next) => {
                    trace!(target: "runtime::driver", cast = %wake.cast, next, "wave handled");
                }
                Err(error) => {
                    warn!(target: "runtime::driver", cast = %wake.cast, %error, "delayed wave failed");
                    self.services.timeline.forget(wake.caster, wake.cast);
                    report.errors += 1;
                }
            }
            report.triggered += Self::drain_triggered(
                &env,
                &self.services.relay,
                &mut self.controllers,
                self.seed,
                self.trigger_limit,
            );
        }

        report.reclaimed = self
            .controllers
            .values_mut()
            .map(CastController::reclaim)
            .sum();
        self.controllers.retain(|_, controller| !controller.is_empty());

        if report.waves > 0 || report.triggered > 0 || report.errors > 0 {
            debug!(
                target: "runtime::driver",
                now_ms,
                waves = report.waves,
                triggered = report.triggered,
                errors = report.errors,
                "tick"
            );
        }
        Ok(report)
    }

    /// Starts queued triggered casts in FIFO order. A triggered cast may queue
    /// further casts; past `limit` the remainder is dropped.
    fn drain_triggered(
        env: &CastEnv<'_>,
        relay: &ProcRelay<W>,
        controllers: &mut BTreeMap<ObjectGuid, CastController>,
        seed: u64,
        limit: usize,
    ) -> usize {
        let mut started = 0;
        while let Some(triggered) = relay.pop() {
            if started >= limit {
                let dropped = relay.clear() + 1;
                warn!(target: "runtime::driver", dropped, limit, "triggered cast limit reached");
                break;
            }
            started += 1;

            let caster = triggered.caster;
            let request = CastRequest::new(caster, triggered.spell, triggered.targets)
                .with_flags(CastFlags::TRIGGERED | CastFlags::CAST_DIRECTLY);
            let controller = controllers
                .entry(caster)
                .or_insert_with(|| CastController::new(caster, caster_seed(seed, caster)));
            if let Err(error) = controller.prepare(env, request) {
                debug!(
                    target: "runtime::driver",
                    %caster,
                    spell = %triggered.spell,
                    by = %triggered.triggered_by,
                    %error,
                    "triggered cast failed"
                );
            }
        }
        started
    }

    // ===== queries =====

    pub fn summary(&self, caster: ObjectGuid) -> Vec<CastSummary> {
        self.controllers
            .get(&caster)
            .map(|controller| {
                controller
                    .instances()
                    .map(|instance| CastSummary {
                        cast: instance.id(),
                        spell: instance.spell().id,
                        category: instance.category(),
                        state: instance.state(),
                        remaining_ms: instance.remaining_ms(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn controller(&self, caster: ObjectGuid) -> Option<&CastController> {
        self.controllers.get(&caster)
    }

    pub fn casters(&self) -> usize {
        self.controllers.len()
    }

    pub fn now_ms(&self) -> u64 {
        self.services.timeline.now_ms()
    }

    pub fn timeline(&self) -> &Timeline {
        &self.services.timeline
    }

    pub fn bus(&self) -> &NotificationBus {
        &self.services.bus
    }

    pub fn world(&self) -> &Arc<W> {
        &self.services.world
    }
}

fn caster_seed(seed: u64, caster: ObjectGuid) -> u64 {
    compute_seed(seed, caster.0, caster.low(), 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use spell_core::testkit::{Sandbox, unit};
    use spell_core::{
        EffectKind, ImplicitTarget, Position, SpellDefinition, SpellEffect, SpellRange,
        SpellTargets,
    };

    fn driver(sandbox: &Arc<Sandbox>) -> CastDriver<Sandbox> {
        CastDriver::new(
            Arc::clone(sandbox) as Arc<dyn SpellOracle>,
            Arc::clone(sandbox),
            NotificationBus::with_capacity(16),
            CastConfig::default(),
        )
    }

    fn bolt(id: u32, cast_time_ms: u32, speed: f32) -> SpellDefinition {
        let mut spell = SpellDefinition::new(SpellId(id), "bolt");
        spell.cast_time_ms = cast_time_ms;
        spell.speed = speed;
        spell.range = SpellRange::symmetric(40.0);
        spell.effects = vec![
            SpellEffect::new(EffectKind::SchoolDamage, ImplicitTarget::target_enemy())
                .with_base_points(5),
        ];
        spell
    }

    #[test]
    fn tick_walks_a_cast_through_its_delay() {
        let sandbox = Arc::new(Sandbox::new());
        sandbox.spawn(unit(1, Position::ORIGIN));
        let target = sandbox.spawn(unit(2, Position::new(10.0, 0.0, 0.0)).faction(2));
        sandbox.register(bolt(1, 1000, 10.0));

        let mut driver = driver(&sandbox);
        let cast = driver
            .prepare(CastRequest::new(
                ObjectGuid(1),
                SpellId(1),
                SpellTargets::unit(target.guid),
            ))
            .expect("prepare");

        driver.tick(1000).expect("tick");
        assert_eq!(driver.timeline().pending(), 1);
        assert_eq!(sandbox.damage_dealt(target.guid), 0);

        let report = driver.tick(999).expect("tick");
        assert_eq!(report.waves, 0);

        let report = driver.tick(1).expect("tick");
        assert_eq!(report.waves, 1);
        assert_eq!(sandbox.damage_dealt(target.guid), 5);
        assert_eq!(driver.timeline().pending(), 0);
        assert!(driver.summary(ObjectGuid(1)).iter().all(|s| s.cast != cast));
    }

    #[test]
    fn cancelling_an_unknown_caster_is_an_error() {
        let sandbox = Arc::new(Sandbox::new());
        let mut driver = driver(&sandbox);

        assert!(matches!(
            driver.cancel(ObjectGuid(9), CastId(1)),
            Err(RuntimeError::UnknownCaster(ObjectGuid(9)))
        ));
    }

    #[test]
    fn idle_controllers_are_dropped() {
        let sandbox = Arc::new(Sandbox::new());
        sandbox.spawn(unit(1, Position::ORIGIN));
        let target = sandbox.spawn(unit(2, Position::new(5.0, 0.0, 0.0)).faction(2));
        sandbox.register(bolt(1, 0, 0.0));

        let mut driver = driver(&sandbox);
        driver
            .prepare(CastRequest::new(
                ObjectGuid(1),
                SpellId(1),
                SpellTargets::unit(target.guid),
            ))
            .expect("prepare");
        assert_eq!(driver.casters(), 1);

        driver.tick(10).expect("tick");
        assert_eq!(driver.casters(), 0);
    }
}
