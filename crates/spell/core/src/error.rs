//! Common error infrastructure for spell-core.
//!
//! This module provides shared types and traits used across all error types in
//! the crate. Domain-specific errors (`CastError`, `OracleError`) live next to
//! the code that produces them.
//!
//! # Design Principles
//!
//! - **Values, not panics**: every failure a caller can trigger is returned
//! - **Rich Context**: errors carry caster, spell and cast identity for logs
//! - **Severity Classification**: errors are categorized for recovery strategies

use crate::types::{CastId, ObjectGuid, SpellId};

/// Severity level of an error, used for categorization and recovery strategies.
///
/// - **Recoverable**: the same request may succeed later (target moved, slot freed)
/// - **Validation**: the request is illegal as issued and should not be retried
/// - **Internal**: a pipeline invariant was violated; the instance is aborted
/// - **Fatal**: a required collaborator is missing and nothing can be cast
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorSeverity {
    /// Recoverable error - can retry with same or alternative request.
    ///
    /// Examples: spell in progress, no valid targets nearby
    Recoverable,

    /// Validation error - invalid input, should not retry without changes.
    ///
    /// Examples: out of range, not enough power, on cooldown
    Validation,

    /// Internal error - unexpected state inconsistency.
    ///
    /// Examples: corrupt effect mask, definition vanished mid-cast
    Internal,

    /// Fatal error - the pipeline cannot run.
    ///
    /// Examples: collaborator missing from the environment
    Fatal,
}

impl ErrorSeverity {
    /// Returns a human-readable description of this severity level.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Recoverable => "recoverable",
            Self::Validation => "validation",
            Self::Internal => "internal",
            Self::Fatal => "fatal",
        }
    }

    /// Returns true if this error is potentially recoverable.
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Recoverable)
    }

    /// Returns true if this error indicates an internal bug.
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal | Self::Fatal)
    }
}

/// Contextual information attached to errors for debugging and diagnostics.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ErrorContext {
    /// Unit that issued the cast (if known).
    pub caster: Option<ObjectGuid>,

    /// Spell being cast (if known).
    pub spell: Option<SpellId>,

    /// Cast instance identity (if one was created).
    pub cast: Option<CastId>,

    /// Optional static message providing additional context.
    pub message: Option<&'static str>,
}

impl ErrorContext {
    /// Creates an empty context.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            caster: None,
            spell: None,
            cast: None,
            message: None,
        }
    }

    /// Attaches a caster to this context (builder pattern).
    #[must_use]
    pub const fn with_caster(mut self, caster: ObjectGuid) -> Self {
        self.caster = Some(caster);
        self
    }

    /// Attaches a spell to this context (builder pattern).
    #[must_use]
    pub const fn with_spell(mut self, spell: SpellId) -> Self {
        self.spell = Some(spell);
        self
    }

    /// Attaches a cast identity to this context (builder pattern).
    #[must_use]
    pub const fn with_cast(mut self, cast: CastId) -> Self {
        self.cast = Some(cast);
        self
    }

    /// Attaches a static message to this context (builder pattern).
    #[must_use]
    pub const fn with_message(mut self, message: &'static str) -> Self {
        self.message = Some(message);
        self
    }
}

/// Common trait for all spell-core errors.
///
/// # Implementation Guidelines
///
/// - All error enums should implement this trait
/// - Use `#[derive(thiserror::Error)]` for Display/Error impl
/// - Classify severity based on recoverability, not impact
pub trait SpellError: core::fmt::Display + core::fmt::Debug {
    /// Returns the severity level of this error.
    fn severity(&self) -> ErrorSeverity;

    /// Returns the context information for this error, if available.
    fn context(&self) -> Option<&ErrorContext> {
        None
    }

    /// Returns a static string identifier for this error variant.
    ///
    /// Default implementation uses the error type name.
    fn error_code(&self) -> &'static str {
        core::any::type_name::<Self>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_classification() {
        assert!(ErrorSeverity::Recoverable.is_recoverable());
        assert!(!ErrorSeverity::Validation.is_recoverable());
        assert!(ErrorSeverity::Internal.is_internal());
        assert!(ErrorSeverity::Fatal.is_internal());
        assert_eq!(ErrorSeverity::Validation.as_str(), "validation");
    }

    #[test]
    fn context_builder_accumulates_fields() {
        let ctx = ErrorContext::new()
            .with_caster(ObjectGuid(7))
            .with_spell(SpellId(133))
            .with_cast(CastId(2))
            .with_message("range");

        assert_eq!(ctx.caster, Some(ObjectGuid(7)));
        assert_eq!(ctx.spell, Some(SpellId(133)));
        assert_eq!(ctx.cast, Some(CastId(2)));
        assert_eq!(ctx.message, Some("range"));
    }
}
