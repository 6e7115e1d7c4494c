use bitflags::bitflags;

bitflags! {
    /// Behaviour switches carried by a spell definition.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    #[cfg_attr(feature = "serde", serde(transparent))]
    pub struct SpellAttributes: u64 {
        // ===== cast category =====
        const CHANNELED                 = 1 << 0;
        const AUTO_REPEAT               = 1 << 1;
        /// Auto-repeat spell that never interrupts and is never interrupted by other slots.
        const AUTO_SHOT                 = 1 << 2;
        /// Replaces the caster's next melee swing.
        const ON_NEXT_SWING             = 1 << 3;

        // ===== interruption =====
        const NOT_INTERRUPTIBLE         = 1 << 4;
        const ALLOW_CAST_WHILE_MOVING   = 1 << 5;
        /// Channel that keeps running while the caster starts other casts.
        const ALLOW_ACTIONS_DURING_CHANNEL = 1 << 6;
        const NO_PUSHBACK               = 1 << 7;

        // ===== target selection =====
        const CONE_BACK                 = 1 << 8;
        const CONE_LINE                 = 1 << 9;
        const CHAIN_FROM_CASTER         = 1 << 10;
        const AREA_TARGET_CHAIN         = 1 << 11;
        /// Truncate capped selections by distance (furthest first) instead of randomly.
        const PREFER_FURTHEST_TARGETS   = 1 << 12;
        const IGNORE_LINE_OF_SIGHT      = 1 << 13;
        const ALLOW_DEAD_TARGET         = 1 << 14;
        const REQUIRE_DEAD_TARGET       = 1 << 15;
        /// Fail the cast when a unit-targeting effect selects nobody.
        const REQUIRE_ALL_TARGETS       = 1 << 16;

        // ===== travel =====
        const BOUNCY_CHAIN_MISSILES     = 1 << 17;
        /// `speed` is a fixed travel time in seconds rather than yards per second.
        const FIXED_DELAY               = 1 << 18;

        // ===== finish bookkeeping =====
        const FINISHING_MOVE            = 1 << 19;
        const KEEP_SWING_TIMER          = 1 << 20;
        const CANT_TRIGGER_PROC         = 1 << 21;
        const HASTE_AFFECTS_DURATION    = 1 << 22;
        const CANT_REFLECT              = 1 << 23;
    }
}
