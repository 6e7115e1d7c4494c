//! World-space positions and the angle helpers target selection relies on.
//!
//! All distances are in yards, all angles in radians. Orientation is measured
//! counter-clockwise from the positive x axis and normalized to `[0, 2π)`.

use std::f32::consts::{PI, TAU};

use super::ObjectGuid;

/// Normalizes an angle into `[0, 2π)`.
#[inline]
pub fn normalize_orientation(angle: f32) -> f32 {
    let wrapped = angle % TAU;
    if wrapped < 0.0 { wrapped + TAU } else { wrapped }
}

/// Point in world space plus a facing.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub orientation: f32,
}

impl Position {
    pub const ORIGIN: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        orientation: 0.0,
    };

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self {
            x,
            y,
            z,
            orientation: 0.0,
        }
    }

    #[must_use]
    pub fn with_orientation(mut self, orientation: f32) -> Self {
        self.orientation = normalize_orientation(orientation);
        self
    }

    pub fn distance(&self, other: &Position) -> f32 {
        self.distance_sq(other).sqrt()
    }

    pub fn distance_sq(&self, other: &Position) -> f32 {
        let (dx, dy, dz) = (other.x - self.x, other.y - self.y, other.z - self.z);
        dx * dx + dy * dy + dz * dz
    }

    pub fn distance_2d(&self, other: &Position) -> f32 {
        let (dx, dy) = (other.x - self.x, other.y - self.y);
        (dx * dx + dy * dy).sqrt()
    }

    /// True when `other` lies within `range` yards (3D).
    pub fn is_within(&self, other: &Position, range: f32) -> bool {
        self.distance_sq(other) <= range * range
    }

    /// Absolute angle from this point towards `other`.
    pub fn angle_to(&self, other: &Position) -> f32 {
        normalize_orientation((other.y - self.y).atan2(other.x - self.x))
    }

    /// Angle of `other` relative to this position's facing, in `(-π, π]`.
    pub fn relative_angle(&self, other: &Position) -> f32 {
        let angle = normalize_orientation(self.angle_to(other) - self.orientation);
        if angle > PI { angle - TAU } else { angle }
    }

    /// True when `other` lies inside the arc of width `arc` centered on the facing.
    pub fn has_in_arc(&self, arc: f32, other: &Position) -> bool {
        if self.x == other.x && self.y == other.y {
            return true;
        }
        let arc = arc.clamp(0.0, TAU);
        let angle = self.relative_angle(other);
        let border = arc / 2.0;
        (-border..=border).contains(&angle)
    }

    /// True when `other` (with bounding size `object_size`) is in front of this
    /// position and within `width` of the facing ray.
    pub fn has_in_line(&self, other: &Position, object_size: f32, width: f32) -> bool {
        if !self.has_in_arc(PI, other) {
            return false;
        }
        let width = width + object_size;
        let angle = self.relative_angle(other);
        angle.sin().abs() * self.distance_2d(other) < width
    }

    /// Point `distance` yards away along `angle` relative to the facing.
    pub fn project(&self, distance: f32, angle: f32) -> Position {
        let heading = normalize_orientation(self.orientation + angle);
        Position {
            x: self.x + distance * heading.cos(),
            y: self.y + distance * heading.sin(),
            z: self.z,
            orientation: self.orientation,
        }
    }
}

/// Transport-relative offset carried alongside a destination.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TransportOffset {
    pub transport: ObjectGuid,
    pub offset: Position,
}

/// World location used for source/destination targets.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Location {
    pub position: Position,
    #[cfg_attr(feature = "serde", serde(default))]
    pub transport: Option<TransportOffset>,
}

impl Location {
    pub const fn at(position: Position) -> Self {
        Self {
            position,
            transport: None,
        }
    }

    #[must_use]
    pub fn on_transport(mut self, transport: ObjectGuid, offset: Position) -> Self {
        self.transport = Some(TransportOffset { transport, offset });
        self
    }

    /// Moves the location, shifting the transport offset by the same amount.
    pub fn relocate(&mut self, position: Position) {
        if let Some(transport) = self.transport.as_mut() {
            transport.offset.x += position.x - self.position.x;
            transport.offset.y += position.y - self.position.y;
            transport.offset.z += position.z - self.position.z;
        }
        self.position = position;
    }
}

impl From<Position> for Location {
    fn from(position: Position) -> Self {
        Self::at(position)
    }
}

#[cfg(test)]
mod tests {
    use std::f32::consts::FRAC_PI_2;

    use super::*;

    #[test]
    fn relative_angle_is_signed() {
        let origin = Position::ORIGIN;
        let left = Position::new(0.0, 5.0, 0.0);
        let right = Position::new(0.0, -5.0, 0.0);

        assert!((origin.relative_angle(&left) - FRAC_PI_2).abs() < 1e-5);
        assert!((origin.relative_angle(&right) + FRAC_PI_2).abs() < 1e-5);
    }

    #[test]
    fn arc_includes_front_and_excludes_back() {
        let origin = Position::ORIGIN;
        assert!(origin.has_in_arc(FRAC_PI_2, &Position::new(5.0, 1.0, 0.0)));
        assert!(!origin.has_in_arc(FRAC_PI_2, &Position::new(-5.0, 0.0, 0.0)));
        assert!(!origin.has_in_arc(FRAC_PI_2, &Position::new(1.0, 5.0, 0.0)));
    }

    #[test]
    fn line_respects_width_and_size() {
        let origin = Position::ORIGIN;
        let near_axis = Position::new(10.0, 1.5, 0.0);

        assert!(!origin.has_in_line(&near_axis, 0.0, 1.0));
        assert!(origin.has_in_line(&near_axis, 1.0, 1.0));
        assert!(!origin.has_in_line(&Position::new(-10.0, 0.0, 0.0), 1.0, 1.0));
    }

    #[test]
    fn project_follows_facing() {
        let facing_north = Position::ORIGIN.with_orientation(FRAC_PI_2);
        let ahead = facing_north.project(10.0, 0.0);
        assert!(ahead.x.abs() < 1e-4);
        assert!((ahead.y - 10.0).abs() < 1e-4);
    }

    #[test]
    fn relocate_shifts_transport_offset() {
        let mut location = Location::at(Position::new(1.0, 1.0, 0.0))
            .on_transport(ObjectGuid(9), Position::ORIGIN);
        location.relocate(Position::new(3.0, 1.0, 0.0));

        let transport = location.transport.unwrap();
        assert!((transport.offset.x - 2.0).abs() < 1e-6);
    }
}
