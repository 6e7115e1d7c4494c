//! Ballistic destination adjustment.
//!
//! The projectile leaves the source along the caster's facing with the pitch
//! carried by the targets. The arc `h(d) = d * (a * d + b)` is fitted so it
//! lands on the requested destination; the destination is then pulled back to
//! the first object in the flight corridor that the arc passes through.

use crate::config::CastConfig;
use crate::spell::ImplicitTarget;
use crate::types::{EffectIndex, Position};
use crate::world::{TypeMask, WorldObject};

use super::TargetResolver;

impl TargetResolver<'_, '_> {
    pub(super) fn select_trajectory(&mut self, index: EffectIndex, target: &ImplicitTarget) {
        let (Some(src), Some(dst)) = (self.targets.src, self.targets.dst) else {
            return;
        };
        let dist2d = src.position.distance_2d(&dst.position);
        if dist2d <= f32::EPSILON {
            return;
        }

        let facing = self.caster.position.orientation;
        let origin = src.position.with_orientation(facing);
        let b = self.targets.pitch.tan();
        let mut a = (dst.position.z - origin.z - dist2d * b) / (dist2d * dist2d);
        if a > CastConfig::TRAJECTORY_FLAT_EPSILON {
            a = 0.0;
        }

        let spell = self.spell;
        let mut best = spell.max_range(false);
        if let Some(triggered) = spell
            .effect(index)
            .and_then(|effect| effect.trigger_spell)
            .and_then(|id| self.env.spells().spell(id))
        {
            best = best
                .max(triggered.max_range(false))
                .min(dist2d.min(CastConfig::TRAJECTORY_MAX_DISTANCE));
        }

        let mut candidates = {
            let caster = self.caster.guid;
            let check = self.candidate_check(index, target, self.caster);
            let accept = |object: &WorldObject| {
                object.guid() != caster
                    && object.position().is_some_and(|position| {
                        origin.has_in_line(
                            &position,
                            object.object_size(),
                            CastConfig::TRAJECTORY_MISSILE_SIZE,
                        )
                    })
                    && check.accepts(object)
            };
            self.env.spatial().find_in_area(
                &origin,
                dist2d,
                TypeMask::UNITS | TypeMask::GAME_OBJECT,
                &accept,
            )
        };
        Self::sort_by_distance(&mut candidates, &origin);

        for candidate in &candidates {
            let Some(position) = candidate.position() else {
                continue;
            };
            let size = (candidate.object_size() * 0.7).max(1.0);
            let along = origin.distance_2d(&position) * origin.relative_angle(&position).cos();
            let dz = position.z - origin.z;
            let distance = along - size;
            let height = distance * (a * distance + b);
            if distance < best && height < dz + size && height > dz - size {
                best = distance.max(0.0);
                break;
            }
        }

        if dist2d > best {
            let mut location = dst;
            location.relocate(Position {
                x: src.position.x + facing.cos() * best,
                y: src.position.y + facing.sin() * best,
                z: src.position.z + best * (a * best + b),
                orientation: facing,
            });
            self.set_destination(index, location);
        }
    }
}
