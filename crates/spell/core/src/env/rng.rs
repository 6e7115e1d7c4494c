//! RNG oracle for deterministic random number generation.
//!
//! Every roll a cast makes (hit, crit, random down-selection, proc chance,
//! random destination) draws its seed from the instance's [`RollCursor`], so a
//! cast replayed with the same seed picks the same targets.

/// RNG oracle for deterministic random number generation.
///
/// Implementations must be deterministic and produce the same values
/// given the same seed.
pub trait RngOracle: Send + Sync {
    /// Generate a random u32 value from a seed.
    fn next_u32(&self, seed: u64) -> u32;

    /// Roll a d100 (1-100 inclusive).
    fn roll_d100(&self, seed: u64) -> u32 {
        (self.next_u32(seed) % 100) + 1
    }

    /// Generate a random value in range [min, max] inclusive.
    fn range(&self, seed: u64, min: u32, max: u32) -> u32 {
        if min >= max {
            return min;
        }
        let range = max - min + 1;
        min + (self.next_u32(seed) % range)
    }

    /// Uniform float in `[0, 1)`.
    fn unit_f32(&self, seed: u64) -> f32 {
        (self.next_u32(seed) >> 8) as f32 / (1u32 << 24) as f32
    }

    /// True with probability `chance_pct` percent.
    fn roll_chance(&self, seed: u64, chance_pct: f32) -> bool {
        if chance_pct <= 0.0 {
            return false;
        }
        if chance_pct >= 100.0 {
            return true;
        }
        self.unit_f32(seed) * 100.0 < chance_pct
    }
}

/// PCG random number generator (PCG-XSH-RR, 64-bit state, 32-bit output).
#[derive(Clone, Copy, Debug, Default)]
pub struct PcgRng;

impl PcgRng {
    const MULTIPLIER: u64 = 6364136223846793005;
    const INCREMENT: u64 = 1442695040888963407;

    #[inline]
    fn pcg_step(state: u64) -> u64 {
        state
            .wrapping_mul(Self::MULTIPLIER)
            .wrapping_add(Self::INCREMENT)
    }

    #[inline]
    fn pcg_output(state: u64) -> u32 {
        let xorshifted = (((state >> 18) ^ state) >> 27) as u32;
        let rot = (state >> 59) as u32;
        xorshifted.rotate_right(rot)
    }
}

impl RngOracle for PcgRng {
    fn next_u32(&self, seed: u64) -> u32 {
        Self::pcg_output(Self::pcg_step(seed))
    }
}

/// Compute a deterministic seed from cast identity components.
///
/// * `base_seed` - seed of the caster's controller
/// * `cast` - cast instance identity
/// * `actor` - low bits of the caster identity
/// * `context` - roll counter, distinct for every roll in the same cast
pub fn compute_seed(base_seed: u64, cast: u64, actor: u32, context: u32) -> u64 {
    let mut hash = base_seed;

    hash ^= cast.wrapping_mul(0x9e3779b97f4a7c15);
    hash ^= (actor as u64).wrapping_mul(0x517cc1b727220a95);
    hash ^= (context as u64).wrapping_mul(0x85ebca6b);

    // avalanche
    hash ^= hash >> 33;
    hash = hash.wrapping_mul(0xff51afd7ed558ccd);
    hash ^= hash >> 33;

    hash
}

/// Per-instance stream of roll seeds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RollCursor {
    base: u64,
    cast: u64,
    actor: u32,
    step: u32,
}

impl RollCursor {
    pub fn new(base: u64, cast: u64, actor: u32) -> Self {
        Self {
            base,
            cast,
            actor,
            step: 0,
        }
    }

    /// Returns the next seed and advances the cursor.
    pub fn next_seed(&mut self) -> u64 {
        let seed = compute_seed(self.base, self.cast, self.actor, self.step);
        self.step = self.step.wrapping_add(1);
        seed
    }

    pub fn rolls(&self) -> u32 {
        self.step
    }
}
