//! Traits describing the collaborators a cast talks to.
//!
//! Consumed services (spell catalog, world accessor, spatial queries, combat
//! math, validation, scheduling, RNG) and produced-into sinks (aura store,
//! notifications, procs, caster upkeep) are bundled by [`CastEnv`] so the
//! pipeline never reaches for globals.
mod auras;
mod combat;
mod error;
mod notify;
mod procs;
mod rng;
mod scheduler;
mod spatial;
mod spells;
mod validation;
mod world;

pub use auras::{AuraApplication, AuraStore, DiminishingLevel};
pub use combat::{CombatMath, HitRoll, MissResult};
pub use error::OracleError;
pub use notify::{CastNotification, NotificationSink};
pub use procs::{
    HitTrigger, ProcEvaluator, ProcEvent, ProcFlags, ProcHitFlags, ProcPhase, ProcSpellType,
    TriggeredCast,
};
pub use rng::{PcgRng, RngOracle, RollCursor, compute_seed};
pub use scheduler::EventScheduler;
pub use spatial::{CandidateFilter, SpatialQuery};
pub use spells::SpellOracle;
pub use validation::{CastCheck, CastValidator, CheckStage};
pub use world::{AttackType, CasterUpkeep, Relation, WorldOracle};

use crate::cast::HookRegistry;
use crate::config::CastConfig;

/// Aggregates every collaborator a cast needs for one call into the pipeline.
#[derive(Clone, Copy)]
pub struct CastEnv<'a> {
    spells: &'a dyn SpellOracle,
    world: &'a dyn WorldOracle,
    spatial: &'a dyn SpatialQuery,
    combat: &'a dyn CombatMath,
    validator: &'a dyn CastValidator,
    auras: &'a dyn AuraStore,
    notifications: &'a dyn NotificationSink,
    scheduler: &'a dyn EventScheduler,
    procs: &'a dyn ProcEvaluator,
    upkeep: &'a dyn CasterUpkeep,
    rng: &'a dyn RngOracle,
    config: &'a CastConfig,
    hooks: Option<&'a HookRegistry>,
}

impl<'a> CastEnv<'a> {
    pub fn builder() -> CastEnvBuilder<'a> {
        CastEnvBuilder::default()
    }

    /// Builds an environment from a single object implementing every collaborator.
    pub fn with_all<T>(services: &'a T, config: &'a CastConfig) -> Self
    where
        T: SpellOracle
            + WorldOracle
            + SpatialQuery
            + CombatMath
            + CastValidator
            + AuraStore
            + NotificationSink
            + EventScheduler
            + ProcEvaluator
            + CasterUpkeep
            + RngOracle,
    {
        Self {
            spells: services,
            world: services,
            spatial: services,
            combat: services,
            validator: services,
            auras: services,
            notifications: services,
            scheduler: services,
            procs: services,
            upkeep: services,
            rng: services,
            config,
            hooks: None,
        }
    }

    #[must_use]
    pub fn with_hooks(mut self, hooks: &'a HookRegistry) -> Self {
        self.hooks = Some(hooks);
        self
    }

    pub fn spells(&self) -> &'a dyn SpellOracle {
        self.spells
    }

    pub fn world(&self) -> &'a dyn WorldOracle {
        self.world
    }

    pub fn spatial(&self) -> &'a dyn SpatialQuery {
        self.spatial
    }

    pub fn combat(&self) -> &'a dyn CombatMath {
        self.combat
    }

    pub fn validator(&self) -> &'a dyn CastValidator {
        self.validator
    }

    pub fn auras(&self) -> &'a dyn AuraStore {
        self.auras
    }

    pub fn notifications(&self) -> &'a dyn NotificationSink {
        self.notifications
    }

    pub fn scheduler(&self) -> &'a dyn EventScheduler {
        self.scheduler
    }

    pub fn procs(&self) -> &'a dyn ProcEvaluator {
        self.procs
    }

    pub fn upkeep(&self) -> &'a dyn CasterUpkeep {
        self.upkeep
    }

    pub fn rng(&self) -> &'a dyn RngOracle {
        self.rng
    }

    pub fn config(&self) -> &'a CastConfig {
        self.config
    }

    pub fn hooks(&self) -> Option<&'a HookRegistry> {
        self.hooks
    }

    pub fn notify(&self, notification: CastNotification) {
        self.notifications.notify(notification);
    }
}

impl std::fmt::Debug for CastEnv<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CastEnv")
            .field("config", self.config)
            .field("hooks", &self.hooks.is_some())
            .finish_non_exhaustive()
    }
}

/// Collects collaborators one at a time; `build` reports the first missing one.
#[derive(Default)]
pub struct CastEnvBuilder<'a> {
    spells: Option<&'a dyn SpellOracle>,
    world: Option<&'a dyn WorldOracle>,
    spatial: Option<&'a dyn SpatialQuery>,
    combat: Option<&'a dyn CombatMath>,
    validator: Option<&'a dyn CastValidator>,
    auras: Option<&'a dyn AuraStore>,
    notifications: Option<&'a dyn NotificationSink>,
    scheduler: Option<&'a dyn EventScheduler>,
    procs: Option<&'a dyn ProcEvaluator>,
    upkeep: Option<&'a dyn CasterUpkeep>,
    rng: Option<&'a dyn RngOracle>,
    config: Option<&'a CastConfig>,
    hooks: Option<&'a HookRegistry>,
}

impl<'a> CastEnvBuilder<'a> {
    pub fn spells(mut self, spells: &'a dyn SpellOracle) -> Self {
        self.spells = Some(spells);
        self
    }

    pub fn world(mut self, world: &'a dyn WorldOracle) -> Self {
        self.world = Some(world);
        self
    }

    pub fn spatial(mut self, spatial: &'a dyn SpatialQuery) -> Self {
        self.spatial = Some(spatial);
        self
    }

    pub fn combat(mut self, combat: &'a dyn CombatMath) -> Self {
        self.combat = Some(combat);
        self
    }

    pub fn validator(mut self, validator: &'a dyn CastValidator) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn auras(mut self, auras: &'a dyn AuraStore) -> Self {
        self.auras = Some(auras);
        self
    }

    pub fn notifications(mut self, notifications: &'a dyn NotificationSink) -> Self {
        self.notifications = Some(notifications);
        self
    }

    pub fn scheduler(mut self, scheduler: &'a dyn EventScheduler) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    pub fn procs(mut self, procs: &'a dyn ProcEvaluator) -> Self {
        self.procs = Some(procs);
        self
    }

    pub fn upkeep(mut self, upkeep: &'a dyn CasterUpkeep) -> Self {
        self.upkeep = Some(upkeep);
        self
    }

    pub fn rng(mut self, rng: &'a dyn RngOracle) -> Self {
        self.rng = Some(rng);
        self
    }

    pub fn config(mut self, config: &'a CastConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn hooks(mut self, hooks: &'a HookRegistry) -> Self {
        self.hooks = Some(hooks);
        self
    }

    /// # Errors
    ///
    /// Returns the `OracleError` naming the first collaborator that was not supplied.
    /// A missing config falls back to [`CastConfig::DEFAULT`].
    pub fn build(self) -> Result<CastEnv<'a>, OracleError> {
        Ok(CastEnv {
            spells: self.spells.ok_or(OracleError::SpellsNotAvailable)?,
            world: self.world.ok_or(OracleError::WorldNotAvailable)?,
            spatial: self.spatial.ok_or(OracleError::SpatialNotAvailable)?,
            combat: self.combat.ok_or(OracleError::CombatNotAvailable)?,
            validator: self.validator.ok_or(OracleError::ValidatorNotAvailable)?,
            auras: self.auras.ok_or(OracleError::AurasNotAvailable)?,
            notifications: self
                .notifications
                .ok_or(OracleError::NotificationsNotAvailable)?,
            scheduler: self.scheduler.ok_or(OracleError::SchedulerNotAvailable)?,
            procs: self.procs.ok_or(OracleError::ProcsNotAvailable)?,
            upkeep: self.upkeep.ok_or(OracleError::UpkeepNotAvailable)?,
            rng: self.rng.ok_or(OracleError::RngNotAvailable)?,
            config: self.config.unwrap_or(&CastConfig::DEFAULT),
            hooks: self.hooks,
        })
    }
}
