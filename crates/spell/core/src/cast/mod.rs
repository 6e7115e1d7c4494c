//! The cast pipeline proper.
//!
//! [`CastController`] owns the instances of one caster; each [`CastInstance`]
//! walks `prepare → select → launch → hit/delay → finish`, with target
//! selection in `resolver`, per-target resolution in `hit`, projectile
//! timing in `delay` and channel upkeep in `channel`.
mod channel;
mod controller;
mod delay;
mod error;
mod hit;
mod hooks;
mod instance;
mod procs;
mod registry;
mod resolver;
mod state;
mod targets;

pub use channel::ChannelLink;
pub use controller::CastController;
pub use delay::{travel_delay, travel_leg};
pub use error::{CastError, CastFailure};
pub use hit::{channel_duration, diminish_duration};
pub use hooks::{
    HitOutcome, HookAction, HookBinding, HookContext, HookPoint, HookRegistry, HookTable,
    HookTableBuilder, SpellHook,
};
pub use instance::CastInstance;
pub use procs::{ProcCoordinator, ProcTarget};
pub use registry::{TargetRecord, TargetRegistry, UnitTarget};
pub use state::{CastCategory, CastFlags, CastState, CastValues};
pub use targets::{CastRequest, SpellTargets};
