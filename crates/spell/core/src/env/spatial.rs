use crate::types::Position;
use crate::world::{TypeMask, WorldObject};

/// Predicate applied by the spatial service before returning a candidate.
pub type CandidateFilter<'a> = &'a dyn Fn(&WorldObject) -> bool;

/// World geometry service.
///
/// An object is inside a shape of radius `r` when its distance to the center is
/// at most `r` plus its bounding size. Results must come back in a stable order
/// so that seeded down-selection is reproducible.
pub trait SpatialQuery: Send + Sync {
    fn find_in_area(
        &self,
        center: &Position,
        radius: f32,
        types: TypeMask,
        filter: CandidateFilter<'_>,
    ) -> Vec<WorldObject>;

    /// Closest matching object within `range`.
    fn find_nearby(
        &self,
        center: &Position,
        range: f32,
        types: TypeMask,
        filter: CandidateFilter<'_>,
    ) -> Option<WorldObject> {
        self.find_in_area(center, range, types, filter)
            .into_iter()
            .filter_map(|object| {
                let distance = object.position()?.distance(center);
                Some((distance, object))
            })
            .min_by(|(a, _), (b, _)| a.total_cmp(b))
            .map(|(_, object)| object)
    }

    /// Objects within `radius` and inside the `arc` centered on `origin`'s facing.
    fn find_in_cone(
        &self,
        origin: &Position,
        radius: f32,
        arc: f32,
        types: TypeMask,
        filter: CandidateFilter<'_>,
    ) -> Vec<WorldObject> {
        let in_cone = |object: &WorldObject| {
            object
                .position()
                .is_some_and(|position| origin.has_in_arc(arc, &position))
                && filter(object)
        };
        self.find_in_area(origin, radius, types, &in_cone)
    }

    /// Objects within `radius` and within `width` of `origin`'s facing ray.
    fn find_along_line(
        &self,
        origin: &Position,
        radius: f32,
        width: f32,
        types: TypeMask,
        filter: CandidateFilter<'_>,
    ) -> Vec<WorldObject> {
        let in_line = |object: &WorldObject| {
            object.position().is_some_and(|position| {
                origin.has_in_line(&position, object.object_size(), width)
            }) && filter(object)
        };
        self.find_in_area(origin, radius, types, &in_line)
    }

    fn line_of_sight(&self, from: &Position, to: &Position) -> bool {
        let _ = (from, to);
        true
    }

    /// Last reachable point on the segment `from → to`.
    fn first_collision(&self, from: &Position, to: &Position) -> Position {
        let _ = from;
        *to
    }
}
