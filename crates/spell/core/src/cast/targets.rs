//! Explicit targets supplied with a cast request.

use crate::types::{Location, ObjectGuid, Position, SpellId};

use super::{CastFlags, CastValues};

/// Explicit (client or caller supplied) targets plus the source/destination
/// locations filled in during implicit selection.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SpellTargets {
    pub unit: Option<ObjectGuid>,
    pub object: Option<ObjectGuid>,
    pub item: Option<ObjectGuid>,
    pub corpse: Option<ObjectGuid>,
    pub src: Option<Location>,
    pub dst: Option<Location>,
    /// Launch pitch for trajectory spells, radians.
    pub pitch: f32,
}

impl SpellTargets {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn unit(guid: ObjectGuid) -> Self {
        Self {
            unit: Some(guid),
            ..Self::default()
        }
    }

    pub fn destination(position: Position) -> Self {
        Self {
            dst: Some(Location::at(position)),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_unit(mut self, guid: ObjectGuid) -> Self {
        self.unit = Some(guid);
        self
    }

    #[must_use]
    pub fn with_object(mut self, guid: ObjectGuid) -> Self {
        self.object = Some(guid);
        self
    }

    #[must_use]
    pub fn with_item(mut self, guid: ObjectGuid) -> Self {
        self.item = Some(guid);
        self
    }

    #[must_use]
    pub fn with_corpse(mut self, guid: ObjectGuid) -> Self {
        self.corpse = Some(guid);
        self
    }

    #[must_use]
    pub fn with_src(mut self, location: Location) -> Self {
        self.src = Some(location);
        self
    }

    #[must_use]
    pub fn with_dst(mut self, location: Location) -> Self {
        self.dst = Some(location);
        self
    }

    #[must_use]
    pub fn with_pitch(mut self, pitch: f32) -> Self {
        self.pitch = pitch;
        self
    }

    pub fn has_dst(&self) -> bool {
        self.dst.is_some()
    }

    /// Moves the destination, keeping its transport offset consistent.
    pub fn relocate_dst(&mut self, position: Position) {
        match self.dst.as_mut() {
            Some(location) => location.relocate(position),
            None => self.dst = Some(Location::at(position)),
        }
    }
}

/// Everything needed to start a cast.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CastRequest {
    pub caster: ObjectGuid,
    pub spell: SpellId,
    #[cfg_attr(feature = "serde", serde(default))]
    pub targets: SpellTargets,
    #[cfg_attr(feature = "serde", serde(default))]
    pub flags: CastFlags,
    #[cfg_attr(feature = "serde", serde(default))]
    pub values: CastValues,
}

impl CastRequest {
    pub fn new(caster: ObjectGuid, spell: SpellId, targets: SpellTargets) -> Self {
        Self {
            caster,
            spell,
            targets,
            flags: CastFlags::empty(),
            values: CastValues::default(),
        }
    }

    #[must_use]
    pub fn with_flags(mut self, flags: CastFlags) -> Self {
        self.flags |= flags;
        self
    }

    #[must_use]
    pub fn with_values(mut self, values: CastValues) -> Self {
        self.values = values;
        self
    }

    #[must_use]
    pub fn triggered(self) -> Self {
        self.with_flags(CastFlags::TRIGGERED)
    }
}
