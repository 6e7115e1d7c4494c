use crate::cast::CastFailure;
use crate::spell::SpellDuration;
use crate::types::{CastId, ObjectGuid, SpellId};

use super::MissResult;

/// Outbound cast notification for the presentation/network layer.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CastNotification {
    CastStart {
        cast: CastId,
        caster: ObjectGuid,
        spell: SpellId,
        cast_time_ms: u32,
    },
    CastDelayed {
        cast: CastId,
        caster: ObjectGuid,
        spell: SpellId,
        delay_ms: u32,
    },
    SpellGo {
        cast: CastId,
        caster: ObjectGuid,
        spell: SpellId,
        hits: Vec<ObjectGuid>,
        misses: Vec<(ObjectGuid, MissResult)>,
    },
    ChannelStart {
        cast: CastId,
        caster: ObjectGuid,
        spell: SpellId,
        duration: SpellDuration,
    },
    ChannelUpdate {
        cast: CastId,
        caster: ObjectGuid,
        spell: SpellId,
        remaining_ms: u32,
    },
    CastFailed {
        cast: CastId,
        caster: ObjectGuid,
        spell: SpellId,
        reason: CastFailure,
    },
    Interrupted {
        cast: CastId,
        caster: ObjectGuid,
        spell: SpellId,
    },
}

impl CastNotification {
    pub fn cast(&self) -> CastId {
        match self {
            Self::CastStart { cast, .. }
            | Self::CastDelayed { cast, .. }
            | Self::SpellGo { cast, .. }
            | Self::ChannelStart { cast, .. }
            | Self::ChannelUpdate { cast, .. }
            | Self::CastFailed { cast, .. }
            | Self::Interrupted { cast, .. } => *cast,
        }
    }

    pub fn caster(&self) -> ObjectGuid {
        match self {
            Self::CastStart { caster, .. }
            | Self::CastDelayed { caster, .. }
            | Self::SpellGo { caster, .. }
            | Self::ChannelStart { caster, .. }
            | Self::ChannelUpdate { caster, .. }
            | Self::CastFailed { caster, .. }
            | Self::Interrupted { caster, .. } => *caster,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::CastStart { .. } => "cast_start",
            Self::CastDelayed { .. } => "cast_delayed",
            Self::SpellGo { .. } => "spell_go",
            Self::ChannelStart { .. } => "channel_start",
            Self::ChannelUpdate { .. } => "channel_update",
            Self::CastFailed { .. } => "cast_failed",
            Self::Interrupted { .. } => "interrupted",
        }
    }
}

pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: CastNotification);
}
