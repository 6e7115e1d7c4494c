//! Collaborator access errors.

use crate::error::{ErrorSeverity, SpellError};
use crate::types::SpellId;

/// Errors raised when the cast environment is missing a collaborator or the
/// catalog is missing a definition.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OracleError {
    #[error("SpellOracle not available")]
    SpellsNotAvailable,

    #[error("WorldOracle not available")]
    WorldNotAvailable,

    #[error("SpatialQuery not available")]
    SpatialNotAvailable,

    #[error("CombatMath not available")]
    CombatNotAvailable,

    #[error("CastValidator not available")]
    ValidatorNotAvailable,

    #[error("AuraStore not available")]
    AurasNotAvailable,

    #[error("NotificationSink not available")]
    NotificationsNotAvailable,

    #[error("EventScheduler not available")]
    SchedulerNotAvailable,

    #[error("ProcEvaluator not available")]
    ProcsNotAvailable,

    #[error("CasterUpkeep not available")]
    UpkeepNotAvailable,

    #[error("RngOracle not available")]
    RngNotAvailable,

    /// Spell definition was not found by id.
    #[error("spell definition {0} not found")]
    SpellNotFound(SpellId),
}

impl SpellError for OracleError {
    fn severity(&self) -> ErrorSeverity {
        use OracleError::*;
        match self {
            SpellNotFound(_) => ErrorSeverity::Internal,
            _ => ErrorSeverity::Fatal,
        }
    }

    fn error_code(&self) -> &'static str {
        use OracleError::*;
        match self {
            SpellsNotAvailable => "ORACLE_SPELLS_NOT_AVAILABLE",
            WorldNotAvailable => "ORACLE_WORLD_NOT_AVAILABLE",
            SpatialNotAvailable => "ORACLE_SPATIAL_NOT_AVAILABLE",
            CombatNotAvailable => "ORACLE_COMBAT_NOT_AVAILABLE",
            ValidatorNotAvailable => "ORACLE_VALIDATOR_NOT_AVAILABLE",
            AurasNotAvailable => "ORACLE_AURAS_NOT_AVAILABLE",
            NotificationsNotAvailable => "ORACLE_NOTIFICATIONS_NOT_AVAILABLE",
            SchedulerNotAvailable => "ORACLE_SCHEDULER_NOT_AVAILABLE",
            ProcsNotAvailable => "ORACLE_PROCS_NOT_AVAILABLE",
            UpkeepNotAvailable => "ORACLE_UPKEEP_NOT_AVAILABLE",
            RngNotAvailable => "ORACLE_RNG_NOT_AVAILABLE",
            SpellNotFound(_) => "ORACLE_SPELL_NOT_FOUND",
        }
    }
}
