//! Identities, effect masks and geometry shared by every pipeline stage.
mod geometry;
mod ids;
mod mask;

pub use geometry::{Location, Position, TransportOffset, normalize_orientation};
pub use ids::{AuraHandle, CastId, EffectIndex, ObjectGuid, SpellId};
pub use mask::EffectMask;
