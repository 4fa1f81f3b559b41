//! Probe index generation by double hashing.
//!
//! Dillinger & Manolios double hashing derives the `k` probe positions of an
//! item from two base seeds:
//!
//! ```text
//! gᵢ(x) = |(h₁(x) + i·h₂(x)) mod m|     for i in 0..k
//! ```
//!
//! Arithmetic is 32-bit two's complement with wrap-around, and `mod` is the
//! truncating remainder, so the magnitude is always below `m`. Saved filters
//! depend on these exact positions.
//!
//! # References
//!
//! - Dillinger, P. C., & Manolios, P. (2004). "Fast and Accurate Bitstate Verification for SPIN"
//! - Kirsch, A., & Mitzenmacher, M. (2006). "Less Hashing, Same Performance: Building a Better Bloom Filter"

#![allow(clippy::cast_possible_wrap)]

/// Probe index `i` for seeds `primary`/`secondary` over `bits` bits.
///
/// `bits` must be in `1..=i32::MAX`.
///
/// ```
/// use pwnedbloom::hash::strategies::probe_index;
///
/// assert_eq!(probe_index(10, 3, 0, 7), 3);
/// assert_eq!(probe_index(10, 3, 2, 7), 2);
/// assert_eq!(probe_index(-10, 0, 0, 7), 3);
/// ```
#[must_use]
#[inline]
pub fn probe_index(primary: i32, secondary: i32, i: u32, bits: u32) -> usize {
    debug_assert!(bits > 0 && bits <= i32::MAX as u32);
    let combined = primary.wrapping_add((i as i32).wrapping_mul(secondary));
    (combined % bits as i32).unsigned_abs() as usize
}

/// Iterator over the `k` probe indices of one item.
#[derive(Debug, Clone)]
pub struct DoubleHashing {
    primary: i32,
    secondary: i32,
    bits: u32,
    next: u32,
    count: u32,
}

impl DoubleHashing {
    /// Probes for seeds `primary`/`secondary`, `count` of them, over `bits` bits.
    #[must_use]
    pub fn new(primary: i32, secondary: i32, count: u32, bits: u32) -> Self {
        Self {
            primary,
            secondary,
            bits,
            next: 0,
            count,
        }
    }
}

impl Iterator for DoubleHashing {
    type Item = usize;

    #[inline]
    fn next(&mut self) -> Option<usize> {
        if self.next >= self.count {
            return None;
        }
        let index = probe_index(self.primary, self.secondary, self.next, self.bits);
        self.next += 1;
        Some(index)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.count - self.next) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for DoubleHashing {}
