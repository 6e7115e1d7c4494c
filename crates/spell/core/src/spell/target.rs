//! Implicit target descriptors.
//!
//! Every effect carries two descriptors (`target_a`, `target_b`). A descriptor
//! names what kind of object is wanted, which point the selection is anchored
//! to, which algorithm picks candidates and which relation filter applies.

use std::f32::consts::{FRAC_PI_2, FRAC_PI_4, PI};

use crate::world::TypeMask;

/// Kind of object the descriptor produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, strum::Display, strum::AsRefStr)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum TargetObject {
    #[default]
    None,
    Src,
    Dest,
    Unit,
    UnitAndDest,
    GameObject,
    GameObjectItem,
    Item,
    Corpse,
    CorpseEnemy,
    CorpseAlly,
}

impl TargetObject {
    /// Type bits a spatial query must return for this object kind.
    pub fn type_mask(self) -> TypeMask {
        match self {
            Self::Unit | Self::UnitAndDest => TypeMask::UNITS,
            Self::GameObject => TypeMask::GAME_OBJECT,
            Self::GameObjectItem => TypeMask::GAME_OBJECT | TypeMask::ITEM,
            Self::Item => TypeMask::ITEM,
            Self::Corpse => TypeMask::CORPSE,
            // owner substitution: a dead unit stands in for its corpse
            Self::CorpseEnemy | Self::CorpseAlly => TypeMask::CORPSE | TypeMask::UNITS,
            Self::Dest => TypeMask::WORLD,
            Self::None | Self::Src => TypeMask::empty(),
        }
    }

    pub fn is_location(self) -> bool {
        matches!(self, Self::Src | Self::Dest)
    }
}

/// Anchor the selection is measured from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, strum::Display, strum::AsRefStr)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum TargetReference {
    #[default]
    None,
    Caster,
    Target,
    /// Most recently selected unit for the same effect.
    Last,
    Src,
    Dest,
}

/// Selection algorithm.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, strum::Display, strum::AsRefStr)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum SelectionCategory {
    #[default]
    None,
    Default,
    Channel,
    Nearby,
    Cone,
    Area,
    Trajectory,
    Line,
}

impl SelectionCategory {
    /// Categories whose results can be shared between effects with identical targeting.
    pub fn is_shared(self) -> bool {
        matches!(self, Self::Nearby | Self::Cone | Self::Area | Self::Line)
    }
}

/// Relation filter applied to candidates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, strum::Display, strum::AsRefStr)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum CheckType {
    #[default]
    Default,
    Entry,
    Enemy,
    Ally,
    Party,
    Raid,
    RaidClass,
    Passenger,
}

impl CheckType {
    /// Whether range for this check comes from the friendly range band.
    pub fn uses_friendly_range(self) -> Option<bool> {
        match self {
            Self::Enemy => Some(false),
            Self::Ally | Self::Party | Self::Raid | Self::RaidClass => Some(true),
            Self::Default | Self::Entry | Self::Passenger => None,
        }
    }
}

/// Offset direction for destination math.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, strum::Display, strum::AsRefStr)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum TargetDirection {
    #[default]
    None,
    Front,
    Back,
    Right,
    Left,
    FrontRight,
    BackRight,
    BackLeft,
    FrontLeft,
    Random,
}

impl TargetDirection {
    /// Angle relative to the reference facing; `None` for random/no direction.
    pub fn fixed_angle(self) -> Option<f32> {
        match self {
            Self::Front => Some(0.0),
            Self::Back => Some(PI),
            Self::Right => Some(-FRAC_PI_2),
            Self::Left => Some(FRAC_PI_2),
            Self::FrontRight => Some(-FRAC_PI_4),
            Self::BackRight => Some(-3.0 * FRAC_PI_4),
            Self::BackLeft => Some(3.0 * FRAC_PI_4),
            Self::FrontLeft => Some(FRAC_PI_4),
            Self::None | Self::Random => None,
        }
    }
}

/// Named special cases that change how a category behaves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TargetSpecial {
    #[default]
    None,
    Master,
    Pet,
    Summoner,
    VehicleBase,
    Passenger(u8),
    CasterAndPassengers,
    AllyOrRaid,
    FrontalCone,
    ChannelCaster,
}

/// Full implicit target descriptor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ImplicitTarget {
    pub object: TargetObject,
    pub reference: TargetReference,
    pub selection: SelectionCategory,
    pub check: CheckType,
    pub direction: TargetDirection,
    pub special: TargetSpecial,
}

impl ImplicitTarget {
    pub const NONE: Self = Self::new(
        TargetObject::None,
        TargetReference::None,
        SelectionCategory::None,
        CheckType::Default,
    );

    pub const fn new(
        object: TargetObject,
        reference: TargetReference,
        selection: SelectionCategory,
        check: CheckType,
    ) -> Self {
        Self {
            object,
            reference,
            selection,
            check,
            direction: TargetDirection::None,
            special: TargetSpecial::None,
        }
    }

    #[must_use]
    pub const fn with_direction(mut self, direction: TargetDirection) -> Self {
        self.direction = direction;
        self
    }

    #[must_use]
    pub const fn with_special(mut self, special: TargetSpecial) -> Self {
        self.special = special;
        self
    }

    pub fn is_none(&self) -> bool {
        self.selection == SelectionCategory::None
    }

    pub fn is_unit(&self) -> bool {
        matches!(self.object, TargetObject::Unit | TargetObject::UnitAndDest)
    }

    // ===== single object =====

    pub const fn caster() -> Self {
        Self::new(
            TargetObject::Unit,
            TargetReference::Caster,
            SelectionCategory::Default,
            CheckType::Default,
        )
    }

    pub const fn caster_relation(special: TargetSpecial) -> Self {
        Self::caster().with_special(special)
    }

    pub const fn target_enemy() -> Self {
        Self::new(
            TargetObject::Unit,
            TargetReference::Target,
            SelectionCategory::Default,
            CheckType::Enemy,
        )
    }

    pub const fn target_ally() -> Self {
        Self::new(
            TargetObject::Unit,
            TargetReference::Target,
            SelectionCategory::Default,
            CheckType::Ally,
        )
    }

    pub const fn target_any() -> Self {
        Self::new(
            TargetObject::Unit,
            TargetReference::Target,
            SelectionCategory::Default,
            CheckType::Default,
        )
    }

    pub const fn game_object_target() -> Self {
        Self::new(
            TargetObject::GameObject,
            TargetReference::Target,
            SelectionCategory::Default,
            CheckType::Default,
        )
    }

    pub const fn item_target() -> Self {
        Self::new(
            TargetObject::GameObjectItem,
            TargetReference::Target,
            SelectionCategory::Default,
            CheckType::Default,
        )
    }

    pub const fn corpse_ally_target() -> Self {
        Self::new(
            TargetObject::CorpseAlly,
            TargetReference::Target,
            SelectionCategory::Default,
            CheckType::Ally,
        )
    }

    // ===== nearby =====

    pub const fn nearby(object: TargetObject, check: CheckType) -> Self {
        Self::new(
            object,
            TargetReference::Caster,
            SelectionCategory::Nearby,
            check,
        )
    }

    // ===== locations =====

    pub const fn src_caster() -> Self {
        Self::new(
            TargetObject::Src,
            TargetReference::Caster,
            SelectionCategory::Default,
            CheckType::Default,
        )
    }

    pub const fn dest_caster() -> Self {
        Self::new(
            TargetObject::Dest,
            TargetReference::Caster,
            SelectionCategory::Default,
            CheckType::Default,
        )
    }

    pub const fn dest_target() -> Self {
        Self::new(
            TargetObject::Dest,
            TargetReference::Target,
            SelectionCategory::Default,
            CheckType::Default,
        )
    }

    pub const fn dest_dest() -> Self {
        Self::new(
            TargetObject::Dest,
            TargetReference::Dest,
            SelectionCategory::Default,
            CheckType::Default,
        )
    }

    pub const fn dest_trajectory() -> Self {
        Self::new(
            TargetObject::Dest,
            TargetReference::Dest,
            SelectionCategory::Trajectory,
            CheckType::Default,
        )
    }

    // ===== areas =====

    pub const fn area(reference: TargetReference, check: CheckType) -> Self {
        Self::new(TargetObject::Unit, reference, SelectionCategory::Area, check)
    }

    pub const fn caster_and_passengers() -> Self {
        Self::area(TargetReference::Caster, CheckType::Default)
            .with_special(TargetSpecial::CasterAndPassengers)
    }

    pub const fn ally_or_raid() -> Self {
        Self::area(TargetReference::Target, CheckType::Raid).with_special(TargetSpecial::AllyOrRaid)
    }

    pub const fn cone(check: CheckType) -> Self {
        Self::new(
            TargetObject::Unit,
            TargetReference::Caster,
            SelectionCategory::Cone,
            check,
        )
    }

    pub const fn frontal_cone() -> Self {
        Self::cone(CheckType::Enemy).with_special(TargetSpecial::FrontalCone)
    }

    pub const fn line(reference: TargetReference, check: CheckType) -> Self {
        Self::new(TargetObject::Unit, reference, SelectionCategory::Line, check)
    }

    // ===== channel =====

    pub const fn channel_target() -> Self {
        Self::new(
            TargetObject::Unit,
            TargetReference::Caster,
            SelectionCategory::Channel,
            CheckType::Default,
        )
    }

    pub const fn channel_dest() -> Self {
        Self::new(
            TargetObject::Dest,
            TargetReference::Caster,
            SelectionCategory::Channel,
            CheckType::Default,
        )
    }

    pub const fn channel_caster_dest() -> Self {
        Self::channel_dest().with_special(TargetSpecial::ChannelCaster)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corpse_targets_also_match_units() {
        let mask = TargetObject::CorpseAlly.type_mask();
        assert!(mask.contains(TypeMask::CORPSE));
        assert!(mask.contains(TypeMask::PLAYER));
    }

    #[test]
    fn shared_categories() {
        assert!(SelectionCategory::Area.is_shared());
        assert!(!SelectionCategory::Default.is_shared());
        assert!(!SelectionCategory::Trajectory.is_shared());
    }

    #[test]
    fn none_descriptor_is_empty() {
        assert!(ImplicitTarget::NONE.is_none());
        assert!(!ImplicitTarget::caster().is_none());
        assert_eq!(
            ImplicitTarget::frontal_cone().special,
            TargetSpecial::FrontalCone
        );
    }
}
