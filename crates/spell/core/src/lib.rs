//! Deterministic spell-cast execution pipeline.
//!
//! `spell-core` turns a cast request into resolved target selections, timed
//! hit events and effect applications. Everything outside the pipeline (world
//! state, geometry, aura storage, combat math) is reached through the
//! collaborator traits bundled in [`env::CastEnv`]; all cast state lives in the
//! [`cast::CastController`] of each caster and advances only when a driver
//! calls into it.
pub mod cast;
pub mod config;
pub mod env;
pub mod error;
pub mod spell;
pub mod types;
pub mod world;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;

pub use cast::{
    CastCategory, CastController, CastError, CastFailure, CastFlags, CastInstance, CastRequest,
    CastState, CastValues, ChannelLink, HitOutcome, HookAction, HookBinding, HookContext,
    HookPoint, HookRegistry, SpellHook, SpellTargets, TargetRegistry,
};
pub use config::CastConfig;
pub use env::{
    AttackType, AuraApplication, AuraStore, CastCheck, CastEnv, CastNotification, CastValidator,
    CasterUpkeep, CheckStage, CombatMath, DiminishingLevel, EventScheduler, HitRoll, HitTrigger,
    MissResult, NotificationSink, OracleError, PcgRng, ProcEvaluator, ProcEvent, Relation, RngOracle,
    SpatialQuery, SpellOracle, TriggeredCast, WorldOracle,
};
pub use error::{ErrorContext, ErrorSeverity, SpellError};
pub use spell::{
    DamageClass, EffectKind, ImplicitTarget, LinkTrigger, LinkedSpell, SpellAttributes,
    SpellDefinition, SpellDuration, SpellEffect, SpellRange,
};
pub use types::{CastId, EffectIndex, EffectMask, Location, ObjectGuid, Position, SpellId};
pub use world::{ObjectKind, UnitSnapshot, WorldObject};
