//! Cast result codes and pipeline errors.

use crate::env::OracleError;
use crate::error::{ErrorContext, ErrorSeverity, SpellError};
use crate::types::{CastId, EffectMask, SpellId};

use super::CastState;

/// Result code reported to the caster when a cast is refused or ends early.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum CastFailure {
    // ===== validation =====
    OutOfRange,
    TooClose,
    LineOfSight,
    NoPower,
    Reagents,
    NotReady,
    CasterDead,
    CasterState,
    Moving,
    Silenced,
    Stunned,
    Shapeshifted,
    RequiresSpellFocus,
    BadTargets,
    TargetsDead,
    TargetFriendly,
    TargetEnemy,
    Immune,

    // ===== targeting =====
    BadImplicitTargets,
    NoValidTargets,

    // ===== concurrency =====
    SpellInProgress,
    NotInterruptible,

    // ===== runtime =====
    Interrupted,
    DontReport,
    Unknown,
}

impl CastFailure {
    pub fn error_code(self) -> &'static str {
        use CastFailure::*;
        match self {
            OutOfRange => "CAST_OUT_OF_RANGE",
            TooClose => "CAST_TOO_CLOSE",
            LineOfSight => "CAST_LINE_OF_SIGHT",
            NoPower => "CAST_NO_POWER",
            Reagents => "CAST_REAGENTS",
            NotReady => "CAST_NOT_READY",
            CasterDead => "CAST_CASTER_DEAD",
            CasterState => "CAST_CASTER_STATE",
            Moving => "CAST_MOVING",
            Silenced => "CAST_SILENCED",
            Stunned => "CAST_STUNNED",
            Shapeshifted => "CAST_SHAPESHIFTED",
            RequiresSpellFocus => "CAST_REQUIRES_SPELL_FOCUS",
            BadTargets => "CAST_BAD_TARGETS",
            TargetsDead => "CAST_TARGETS_DEAD",
            TargetFriendly => "CAST_TARGET_FRIENDLY",
            TargetEnemy => "CAST_TARGET_ENEMY",
            Immune => "CAST_IMMUNE",
            BadImplicitTargets => "CAST_BAD_IMPLICIT_TARGETS",
            NoValidTargets => "CAST_NO_VALID_TARGETS",
            SpellInProgress => "CAST_SPELL_IN_PROGRESS",
            NotInterruptible => "CAST_NOT_INTERRUPTIBLE",
            Interrupted => "CAST_INTERRUPTED",
            DontReport => "CAST_DONT_REPORT",
            Unknown => "CAST_UNKNOWN",
        }
    }
}

/// Errors returned by the cast pipeline.
///
/// `Validation`, `Targeting` and `Conflict` are ordinary outcomes of a request;
/// the remaining variants are invariant violations that abort the instance.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum CastError {
    /// Validation collaborator or a check-cast extension point refused the cast.
    #[error("cast rejected: {failure}")]
    Validation {
        failure: CastFailure,
        context: ErrorContext,
    },

    /// Implicit target selection found no legal candidate where one was required.
    #[error("implicit target selection failed: {failure}")]
    Targeting {
        failure: CastFailure,
        context: ErrorContext,
    },

    /// Category slot is occupied by a cast that cannot be interrupted.
    #[error("category slot busy: {failure}")]
    Conflict {
        failure: CastFailure,
        context: ErrorContext,
    },

    #[error("spell definition {0} is missing")]
    MissingDefinition(SpellId),

    #[error("effect mask {mask} of {spell} references a non-existent effect")]
    CorruptEffectMask { spell: SpellId, mask: EffectMask },

    /// A phase was re-entered while the same instance was executing.
    #[error("{0} is already executing")]
    Reentrant(CastId),

    #[error("{cast} cannot {operation} while {state}")]
    InvalidState {
        cast: CastId,
        state: CastState,
        operation: &'static str,
    },

    #[error("unknown cast {0}")]
    UnknownCast(CastId),

    #[error(transparent)]
    Oracle(#[from] OracleError),
}

impl CastError {
    pub fn validation(failure: CastFailure, context: ErrorContext) -> Self {
        Self::Validation { failure, context }
    }

    pub fn targeting(failure: CastFailure, context: ErrorContext) -> Self {
        Self::Targeting { failure, context }
    }

    pub fn conflict(failure: CastFailure, context: ErrorContext) -> Self {
        Self::Conflict { failure, context }
    }

    /// Result code to report for this error, if it corresponds to one.
    pub fn failure(&self) -> Option<CastFailure> {
        match self {
            Self::Validation { failure, .. }
            | Self::Targeting { failure, .. }
            | Self::Conflict { failure, .. } => Some(*failure),
            _ => None,
        }
    }
}

impl SpellError for CastError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Validation { .. } => ErrorSeverity::Validation,
            Self::Targeting { .. } | Self::Conflict { .. } => ErrorSeverity::Recoverable,
            Self::MissingDefinition(_)
            | Self::CorruptEffectMask { .. }
            | Self::Reentrant(_)
            | Self::InvalidState { .. }
            | Self::UnknownCast(_) => ErrorSeverity::Internal,
            Self::Oracle(error) => error.severity(),
        }
    }

    fn context(&self) -> Option<&ErrorContext> {
        match self {
            Self::Validation { context, .. }
            | Self::Targeting { context, .. }
            | Self::Conflict { context, .. } => Some(context),
            _ => None,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::Validation { failure, .. }
            | Self::Targeting { failure, .. }
            | Self::Conflict { failure, .. } => failure.error_code(),
            Self::MissingDefinition(_) => "CAST_MISSING_DEFINITION",
            Self::CorruptEffectMask { .. } => "CAST_CORRUPT_EFFECT_MASK",
            Self::Reentrant(_) => "CAST_REENTRANT",
            Self::InvalidState { .. } => "CAST_INVALID_STATE",
            Self::UnknownCast(_) => "CAST_UNKNOWN_INSTANCE",
            Self::Oracle(error) => error.error_code(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ObjectGuid;

    #[test]
    fn failure_is_exposed_for_result_codes() {
        let error = CastError::targeting(
            CastFailure::NoValidTargets,
            ErrorContext::new().with_caster(ObjectGuid(1)),
        );
        assert_eq!(error.failure(), Some(CastFailure::NoValidTargets));
        assert_eq!(error.error_code(), "CAST_NO_VALID_TARGETS");
        assert!(error.severity().is_recoverable());
        assert_eq!(error.context().and_then(|c| c.caster), Some(ObjectGuid(1)));
    }

    #[test]
    fn invariant_violations_are_internal() {
        let error = CastError::Reentrant(CastId(4));
        assert!(error.failure().is_none());
        assert!(error.severity().is_internal());
        assert_eq!(error.to_string(), "cast:4 is already executing");
    }

    #[test]
    fn failure_names_parse() {
        assert_eq!(
            "bad_implicit_targets".parse::<CastFailure>().ok(),
            Some(CastFailure::BadImplicitTargets)
        );
    }
}
