//! Data-driven spell content and loaders.
//!
//! This crate houses the spell catalog consumed by the cast pipeline and
//! provides loaders for its RON/TOML data files:
//! - Spell definitions and the linked-spell table (data-driven via RON)
//! - Cast pipeline tuning (data-driven via TOML)
//!
//! Content is read-only once loaded; the pipeline reaches it through
//! [`spell_core::SpellOracle`].

pub mod catalog;

#[cfg(feature = "loaders")]
pub mod loaders;

pub use catalog::SpellCatalog;

#[cfg(feature = "loaders")]
pub use loaders::{ConfigLoader, ContentFactory, LinkEntry, SpellCatalogFile, SpellLoader};
