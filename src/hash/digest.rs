//! Hash seeds sliced directly from hexadecimal SHA-1 digests.
//!
//! SHA-1 output is already uniformly distributed, so two independent 32-bit
//! seeds can be read straight from the digest text instead of hashing again:
//!
//! ```text
//! digest:    5BAA61E4 C9B93F3F 0682250B6CF8331B7EE68FD8
//!            ^^^^^^^^ ^^^^^^^^                       ^^
//!            primary  secondary          shard nibbles (from the end)
//! ```
//!
//! Each seed is the big-endian value of 8 hex characters, reinterpreted as a
//! signed 32-bit integer. This is only sound for real digests, so the input is
//! validated once by [`Digest::parse`] and every later step is infallible.

use crate::error::{PwnedBloomError, Result};
use std::fmt;

/// Length of a hex-encoded SHA-1 digest.
pub const DIGEST_HEX_LEN: usize = 40;

/// Hex characters consumed by each hash seed.
const SEED_HEX_LEN: usize = 8;

/// A validated, borrowed 40-character hexadecimal SHA-1 digest.
///
/// Parsing checks length and characters without copying the input.
/// Hex digits are case-insensitive: `5baa…` and `5BAA…` hash identically.
///
/// # Examples
///
/// ```
/// use pwnedbloom::hash::Digest;
///
/// let d = Digest::parse("5BAA61E4C9B93F3F0682250B6CF8331B7EE68FD8").unwrap();
/// assert_eq!(d.primary_hash(), 0x5BAA61E4);
/// assert!(Digest::parse("not a digest").is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Digest<'a> {
    hex: &'a str,
}

impl<'a> Digest<'a> {
    /// Validate `hex` as a SHA-1 digest.
    ///
    /// # Errors
    ///
    /// Returns [`PwnedBloomError::InvalidDigest`] if `hex` is not exactly 40
    /// characters from `[0-9a-fA-F]`.
    pub fn parse(hex: &'a str) -> Result<Self> {
        if hex.len() != DIGEST_HEX_LEN {
            return Err(PwnedBloomError::invalid_digest(
                hex,
                format!("expected {} hex characters, found {}", DIGEST_HEX_LEN, hex.len()),
            ));
        }
        if let Some(pos) = hex.bytes().position(|c| hex_value(c).is_none()) {
            return Err(PwnedBloomError::invalid_digest(
                hex,
                format!("non-hex character at position {}", pos),
            ));
        }
        Ok(Self { hex })
    }

    /// The digest text as given.
    #[must_use]
    pub const fn as_str(&self) -> &'a str {
        self.hex
    }

    /// Seed from hex characters `0..8`.
    #[must_use]
    #[inline]
    pub fn primary_hash(&self) -> i32 {
        self.seed_at(0)
    }

    /// Seed from hex characters `8..16`.
    #[must_use]
    #[inline]
    pub fn secondary_hash(&self) -> i32 {
        self.seed_at(SEED_HEX_LEN)
    }

    /// Value (0-15) of the hex character at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= 40`.
    #[must_use]
    #[inline]
    pub fn nibble(&self, index: usize) -> u8 {
        // Every character was checked in `parse`.
        hex_value(self.hex.as_bytes()[index]).unwrap_or_default()
    }

    fn seed_at(&self, start: usize) -> i32 {
        let value = (start..start + SEED_HEX_LEN)
            .fold(0u32, |acc, i| (acc << 4) | u32::from(self.nibble(i)));
        value as i32
    }
}

impl fmt::Display for Digest<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.hex)
    }
}

/// Value of one ASCII hex character, case-insensitive.
///
/// ```
/// use pwnedbloom::hash::hex_value;
///
/// assert_eq!(hex_value(b'7'), Some(7));
/// assert_eq!(hex_value(b'c'), Some(12));
/// assert_eq!(hex_value(b'F'), Some(15));
/// assert_eq!(hex_value(b'g'), None);
/// ```
#[must_use]
#[inline]
pub const fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}
