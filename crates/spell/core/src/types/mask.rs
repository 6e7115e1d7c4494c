use std::fmt;
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign};

use super::EffectIndex;
use crate::config::CastConfig;

/// Per-effect participation mask: bit *i* set means effect *i* applies.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EffectMask(u32);

impl EffectMask {
    pub const EMPTY: Self = Self(0);

    #[inline]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    #[inline]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Mask with a single effect bit set.
    #[inline]
    pub const fn single(index: EffectIndex) -> Self {
        Self(1 << index.0)
    }

    /// Mask with the first `count` effect bits set.
    pub const fn first(count: usize) -> Self {
        if count >= CastConfig::MAX_EFFECTS {
            Self(u32::MAX)
        } else {
            Self((1u32 << count) - 1)
        }
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn contains(self, index: EffectIndex) -> bool {
        index.0 < 32 && self.0 & (1 << index.0) != 0
    }

    #[inline]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    #[inline]
    pub const fn is_subset_of(self, other: Self) -> bool {
        self.0 & !other.0 == 0
    }

    #[inline]
    pub fn insert(&mut self, index: EffectIndex) {
        self.0 |= 1 << index.0;
    }

    #[inline]
    pub fn remove(&mut self, index: EffectIndex) {
        self.0 &= !(1 << index.0);
    }

    #[inline]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    #[inline]
    pub const fn intersection(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    #[inline]
    pub const fn difference(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    pub const fn count(self) -> u32 {
        self.0.count_ones()
    }

    /// Iterates set effect indices in ascending order.
    pub fn iter(self) -> impl Iterator<Item = EffectIndex> {
        (0..CastConfig::MAX_EFFECTS as u8)
            .filter(move |bit| self.0 & (1 << bit) != 0)
            .map(EffectIndex)
    }
}

impl BitOr for EffectMask {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl BitOrAssign for EffectMask {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for EffectMask {
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self {
        self.intersection(rhs)
    }
}

impl BitAndAssign for EffectMask {
    fn bitand_assign(&mut self, rhs: Self) {
        self.0 &= rhs.0;
    }
}

impl FromIterator<EffectIndex> for EffectMask {
    fn from_iter<I: IntoIterator<Item = EffectIndex>>(iter: I) -> Self {
        let mut mask = Self::EMPTY;
        for index in iter {
            mask.insert(index);
        }
        mask
    }
}

impl fmt::Debug for EffectMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EffectMask({:#b})", self.0)
    }
}

impl fmt::Display for EffectMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#b}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iter_yields_ascending_indices() {
        let mask = EffectMask::from_bits(0b1010_0001);
        let indices: Vec<u8> = mask.iter().map(|index| index.0).collect();
        assert_eq!(indices, vec![0, 5, 7]);
    }

    #[test]
    fn subset_and_difference() {
        let all = EffectMask::first(3);
        let some = EffectMask::single(EffectIndex(1));

        assert!(some.is_subset_of(all));
        assert!(!all.is_subset_of(some));
        assert_eq!(all.difference(some).bits(), 0b101);
    }

    #[test]
    fn first_saturates_at_max_effects() {
        assert_eq!(EffectMask::first(0), EffectMask::EMPTY);
        assert_eq!(EffectMask::first(32).bits(), u32::MAX);
    }
}
