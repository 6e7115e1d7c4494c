use crate::cast::{CastFailure, CastFlags, SpellTargets};
use crate::spell::SpellDefinition;
use crate::types::ObjectGuid;

/// Point in the lifecycle at which a legality check runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum CheckStage {
    Prepare,
    Cast,
    /// Re-validation before an auto-repeat shot.
    AutoRepeat,
}

#[derive(Clone, Copy, Debug)]
pub struct CastCheck<'a> {
    pub caster: ObjectGuid,
    pub spell: &'a SpellDefinition,
    pub targets: &'a SpellTargets,
    pub flags: CastFlags,
    pub stage: CheckStage,
}

/// Legality checks: range, power, reagents, cooldowns, caster state,
/// line of sight, shapeshift and crowd-control restrictions.
pub trait CastValidator: Send + Sync {
    fn check_cast(&self, check: &CastCheck<'_>) -> Result<(), CastFailure>;
}
