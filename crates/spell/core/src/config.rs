/// Cast pipeline constants and tunable parameters.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CastConfig {
    /// Default cone angle in degrees for cone selections whose spell leaves it unset.
    pub default_cone_angle: f32,
    /// Minimum distance (yards) used when computing missile travel time.
    pub min_missile_distance: f32,
    /// Flat cast-time pushback in milliseconds before resistance.
    pub cast_pushback_ms: u32,
    /// Percentage of the channel duration removed by a single pushback.
    pub channel_pushback_pct: u32,
    /// Maximum pushbacks a single cast absorbs.
    pub max_pushbacks: u8,
    /// Upper bound (yards) on the range extension granted to channel targets
    /// before they are pruned; the extension is otherwise 10% of max range.
    pub channel_range_tolerance: f32,
    /// Search radius used to locate a required spell focus object.
    pub spell_focus_range: f32,
}

impl CastConfig {
    // ===== compile-time constants used as type parameters =====
    /// Maximum number of effects a single spell may carry (one mask bit each).
    pub const MAX_EFFECTS: usize = 32;
    /// Maximum number of targets a chain may reach, including the primary.
    pub const MAX_CHAIN_TARGETS: u32 = 20;

    // ===== chain jump radii (yards) =====
    pub const CHAIN_JUMP_MELEE: f32 = 5.0;
    pub const CHAIN_JUMP_RANGED: f32 = 7.5;
    pub const CHAIN_JUMP_MAGIC: f32 = 10.0;
    pub const CHAIN_JUMP_HEAL: f32 = 12.5;

    // ===== trajectory =====
    /// Hard cap on trajectory travel distance.
    pub const TRAJECTORY_MAX_DISTANCE: f32 = 300.0;
    /// Quadratic coefficients above this value are treated as a flat arc.
    pub const TRAJECTORY_FLAT_EPSILON: f32 = -0.0001;
    /// Half-width (yards) of the corridor a trajectory missile sweeps.
    pub const TRAJECTORY_MISSILE_SIZE: f32 = 3.0;

    // ===== runtime-tunable defaults =====
    pub const DEFAULT_CONE_ANGLE: f32 = 90.0;
    pub const FRONTAL_CONE_ANGLE: f32 = 180.0;
    pub const DEFAULT_MIN_MISSILE_DISTANCE: f32 = 5.0;
    pub const DEFAULT_CAST_PUSHBACK_MS: u32 = 500;
    pub const DEFAULT_CHANNEL_PUSHBACK_PCT: u32 = 25;
    pub const DEFAULT_MAX_PUSHBACKS: u8 = 2;
    pub const DEFAULT_CHANNEL_RANGE_TOLERANCE: f32 = 3.0;
    pub const DEFAULT_SPELL_FOCUS_RANGE: f32 = 10.0;

    pub const DEFAULT: Self = Self::new();

    pub const fn new() -> Self {
        Self {
            default_cone_angle: Self::DEFAULT_CONE_ANGLE,
            min_missile_distance: Self::DEFAULT_MIN_MISSILE_DISTANCE,
            cast_pushback_ms: Self::DEFAULT_CAST_PUSHBACK_MS,
            channel_pushback_pct: Self::DEFAULT_CHANNEL_PUSHBACK_PCT,
            max_pushbacks: Self::DEFAULT_MAX_PUSHBACKS,
            channel_range_tolerance: Self::DEFAULT_CHANNEL_RANGE_TOLERANCE,
            spell_focus_range: Self::DEFAULT_SPELL_FOCUS_RANGE,
        }
    }
}

impl Default for CastConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_constants() {
        let config = CastConfig::default();
        assert_eq!(config, CastConfig::DEFAULT);
        assert_eq!(config.cast_pushback_ms, 500);
        assert_eq!(config.max_pushbacks, 2);
    }
}
