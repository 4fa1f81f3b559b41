//! Shard selection from the trailing nibbles of a digest.
//!
//! A filter with `16ⁿ` shards reads the last `n` hex characters of the digest
//! as a base-16 number and uses it as the shard index:
//!
//! ```text
//! shards = 16  : ...7EE68FD[8]   -> shard 0x8  = 8
//! shards = 256 : ...7EE68F[D8]   -> shard 0xD8 = 216
//! ```
//!
//! The probe seeds come from characters `0..16`, so shard choice and in-shard
//! probing draw on disjoint parts of the digest.

use crate::hash::{Digest, DIGEST_HEX_LEN};

/// Number of trailing hex characters consumed for `shard_count` shards.
///
/// `shard_count` is a power of 16; any other value yields the characters for
/// the largest power of 16 below it.
#[must_use]
#[inline]
pub const fn selector_width(shard_count: u32) -> usize {
    if shard_count <= 1 {
        0
    } else {
        (shard_count.ilog2() / 4) as usize
    }
}

/// Index of the shard that owns `digest` in a filter of `shard_count` shards.
///
/// Pure: the same digest and shard count always give the same index.
///
/// ```
/// use pwnedbloom::core::shard::select_shard;
/// use pwnedbloom::hash::Digest;
///
/// let d = Digest::parse("5BAA61E4C9B93F3F0682250B6CF8331B7EE68FD8").unwrap();
/// assert_eq!(select_shard(&d, 1), 0);
/// assert_eq!(select_shard(&d, 16), 0x8);
/// assert_eq!(select_shard(&d, 256), 0xD8);
/// ```
#[must_use]
#[inline]
pub fn select_shard(digest: &Digest<'_>, shard_count: u32) -> usize {
    let width = selector_width(shard_count);
    if width == 0 || width > DIGEST_HEX_LEN {
        return 0;
    }
    (DIGEST_HEX_LEN - width..DIGEST_HEX_LEN)
        .fold(0usize, |shard, i| (shard << 4) + usize::from(digest.nibble(i)))
}
