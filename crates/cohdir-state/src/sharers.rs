//! Fixed-capacity sharer set.
//!
//! A `bitvec` bit vector over core ids `0..capacity`. The population count
//! is cached so `len()` is O(1), and iteration walks set bits in ascending
//! core-id order.

use std::fmt;

use bitvec::order::Lsb0;
use bitvec::slice::IterOnes;
use bitvec::vec::BitVec;

use crate::CoreId;

/// Set of cores holding a copy of a block.
#[derive(Clone, PartialEq, Eq)]
pub struct SharerSet {
    bits: BitVec<u64, Lsb0>,
    capacity: u32,
    len: u32,
}

impl SharerSet {
    /// Create an empty set able to hold core ids `0..capacity`.
    #[must_use]
    pub fn new(capacity: u32) -> Self {
        Self {
            bits: BitVec::repeat(false, capacity as usize),
            capacity,
            len: 0,
        }
    }

    /// Number of distinct core ids this set can hold.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Number of cores in the set.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> u32 {
        self.len
    }

    /// Whether the set has no members.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether `core` is a member. Ids beyond the capacity are never members.
    #[inline]
    #[must_use]
    pub fn contains(&self, core: CoreId) -> bool {
        self.bits.get(core as usize).is_some_and(|bit| *bit)
    }

    /// Add `core`, returning `true` if it was not already present.
    ///
    /// # Panics
    ///
    /// Panics if `core` is outside `0..capacity`.
    pub fn insert(&mut self, core: CoreId) -> bool {
        assert!(
            core < self.capacity,
            "core {core} out of range for sharer set of capacity {}",
            self.capacity
        );
        if self.bits.replace(core as usize, true) {
            return false;
        }
        self.len += 1;
        true
    }

    /// Remove `core`, returning `true` if it was present.
    pub fn remove(&mut self, core: CoreId) -> bool {
        if !self.contains(core) {
            return false;
        }
        self.bits.set(core as usize, false);
        self.len -= 1;
        true
    }

    /// Remove every member.
    pub fn clear(&mut self) {
        self.bits.fill(false);
        self.len = 0;
    }

    /// Lowest core id in the set.
    #[must_use]
    pub fn first(&self) -> Option<CoreId> {
        self.iter().next()
    }

    /// Iterate members in ascending core-id order.
    #[must_use]
    pub fn iter(&self) -> SharerIter<'_> {
        SharerIter {
            ones: self.bits.iter_ones(),
        }
    }

    /// Members as an ascending list.
    #[must_use]
    pub fn to_vec(&self) -> Vec<CoreId> {
        self.iter().collect()
    }
}

impl fmt::Debug for SharerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<'a> IntoIterator for &'a SharerSet {
    type Item = CoreId;
    type IntoIter = SharerIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Ascending iterator over the members of a [`SharerSet`].
pub struct SharerIter<'a> {
    ones: IterOnes<'a, u64, Lsb0>,
}

impl Iterator for SharerIter<'_> {
    type Item = CoreId;

    fn next(&mut self) -> Option<CoreId> {
        // Indices stay below `capacity`, which is a `CoreId`
        self.ones.next().and_then(|index| CoreId::try_from(index).ok())
    }
}
