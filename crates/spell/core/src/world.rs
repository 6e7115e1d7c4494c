//! Snapshots of world objects as seen by the cast pipeline.
//!
//! The pipeline never holds live references into the world. Collaborators hand
//! out [`WorldObject`] snapshots, a closed tagged variant whose capability
//! accessors (`as_unit`, `as_game_object`, ...) replace downcasting.

use bitflags::bitflags;

use crate::types::{ObjectGuid, Position};

bitflags! {
    /// Object kinds a spatial query may return.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    #[cfg_attr(feature = "serde", serde(transparent))]
    pub struct TypeMask: u8 {
        const UNIT        = 1 << 0;
        const PLAYER      = 1 << 1;
        const GAME_OBJECT = 1 << 2;
        const ITEM        = 1 << 3;
        const CORPSE      = 1 << 4;

        const UNITS       = Self::UNIT.bits() | Self::PLAYER.bits();
        const WORLD       = Self::UNITS.bits() | Self::GAME_OBJECT.bits() | Self::CORPSE.bits();
    }
}

/// Discriminant of [`WorldObject`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum ObjectKind {
    Unit,
    GameObject,
    Item,
    Corpse,
}

/// Combat-relevant view of a unit.
#[derive(Clone, Debug, PartialEq)]
pub struct UnitSnapshot {
    pub guid: ObjectGuid,
    pub entry: u32,
    pub position: Position,
    /// Melee reach, also the default line width for line selections.
    pub combat_reach: f32,
    /// Bounding radius used by range checks and trajectory collision.
    pub object_size: f32,
    pub faction: u32,
    pub class_id: u8,
    pub is_player: bool,
    pub alive: bool,
    pub health: u32,
    pub max_health: u32,
}

impl UnitSnapshot {
    pub fn health_deficit(&self) -> u32 {
        self.max_health.saturating_sub(self.health)
    }

    pub fn health_pct(&self) -> u32 {
        if self.max_health == 0 {
            return 0;
        }
        (u64::from(self.health) * 100 / u64::from(self.max_health)) as u32
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct GameObjectSnapshot {
    pub guid: ObjectGuid,
    pub entry: u32,
    pub position: Position,
    pub object_size: f32,
    /// Spell focus category this object provides, if any.
    pub spell_focus: Option<u32>,
    pub owner: Option<ObjectGuid>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ItemSnapshot {
    pub guid: ObjectGuid,
    pub entry: u32,
    pub owner: ObjectGuid,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CorpseSnapshot {
    pub guid: ObjectGuid,
    pub owner: ObjectGuid,
    pub position: Position,
}

/// Any object a spell can select.
#[derive(Clone, Debug, PartialEq)]
pub enum WorldObject {
    Unit(UnitSnapshot),
    GameObject(GameObjectSnapshot),
    Item(ItemSnapshot),
    Corpse(CorpseSnapshot),
}

impl WorldObject {
    pub fn guid(&self) -> ObjectGuid {
        match self {
            Self::Unit(unit) => unit.guid,
            Self::GameObject(object) => object.guid,
            Self::Item(item) => item.guid,
            Self::Corpse(corpse) => corpse.guid,
        }
    }

    pub fn kind(&self) -> ObjectKind {
        match self {
            Self::Unit(_) => ObjectKind::Unit,
            Self::GameObject(_) => ObjectKind::GameObject,
            Self::Item(_) => ObjectKind::Item,
            Self::Corpse(_) => ObjectKind::Corpse,
        }
    }

    /// Type bits this object answers to in a spatial query.
    pub fn type_mask(&self) -> TypeMask {
        match self {
            Self::Unit(unit) if unit.is_player => TypeMask::PLAYER,
            Self::Unit(_) => TypeMask::UNIT,
            Self::GameObject(_) => TypeMask::GAME_OBJECT,
            Self::Item(_) => TypeMask::ITEM,
            Self::Corpse(_) => TypeMask::CORPSE,
        }
    }

    /// World position; items live in inventories and have none.
    pub fn position(&self) -> Option<Position> {
        match self {
            Self::Unit(unit) => Some(unit.position),
            Self::GameObject(object) => Some(object.position),
            Self::Item(_) => None,
            Self::Corpse(corpse) => Some(corpse.position),
        }
    }

    pub fn object_size(&self) -> f32 {
        match self {
            Self::Unit(unit) => unit.object_size,
            Self::GameObject(object) => object.object_size,
            Self::Item(_) | Self::Corpse(_) => 0.0,
        }
    }

    pub fn as_unit(&self) -> Option<&UnitSnapshot> {
        match self {
            Self::Unit(unit) => Some(unit),
            _ => None,
        }
    }

    pub fn as_game_object(&self) -> Option<&GameObjectSnapshot> {
        match self {
            Self::GameObject(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_item(&self) -> Option<&ItemSnapshot> {
        match self {
            Self::Item(item) => Some(item),
            _ => None,
        }
    }

    pub fn as_corpse(&self) -> Option<&CorpseSnapshot> {
        match self {
            Self::Corpse(corpse) => Some(corpse),
            _ => None,
        }
    }
}

impl From<UnitSnapshot> for WorldObject {
    fn from(unit: UnitSnapshot) -> Self {
        Self::Unit(unit)
    }
}

impl From<GameObjectSnapshot> for WorldObject {
    fn from(object: GameObjectSnapshot) -> Self {
        Self::GameObject(object)
    }
}
