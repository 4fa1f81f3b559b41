//! Digest hashing and probe strategies.
//!
//! Items stored in a pwnedbloom filter are SHA-1 digests in hexadecimal form.
//! The digest is already the output of a cryptographic hash, so the filter
//! does not hash again: it slices its two probe seeds out of the digest text.
//!
//! # Module Structure
//!
//! ```text
//! hash/
//! ├── digest.rs      - Validated Digest view, hex parsing, seed extraction
//! ├── strategies.rs  - Double-hashing probe sequence
//! └── mod.rs         - This file (public API, password hashing)
//! ```
//!
//! # Quick Start
//!
//! ```
//! use pwnedbloom::hash::{sha1_hex, Digest};
//! use pwnedbloom::hash::strategies::DoubleHashing;
//!
//! let hex = sha1_hex("password");
//! let digest = Digest::parse(&hex).unwrap();
//!
//! // Seven probe positions in a 1000-bit shard
//! let probes: Vec<usize> =
//!     DoubleHashing::new(digest.primary_hash(), digest.secondary_hash(), 7, 1000).collect();
//! assert_eq!(probes.len(), 7);
//! ```

pub mod digest;
pub mod strategies;

pub use digest::{hex_value, Digest, DIGEST_HEX_LEN};
pub use strategies::DoubleHashing;

use sha1::{Digest as _, Sha1};

/// Upper-case hexadecimal SHA-1 of a UTF-8 password.
///
/// This is the conversion callers apply before looking a password up; the
/// filter itself only ever sees digests.
///
/// ```
/// use pwnedbloom::hash::sha1_hex;
///
/// assert_eq!(sha1_hex("password"), "5BAA61E4C9B93F3F0682250B6CF8331B7EE68FD8");
/// ```
#[must_use]
pub fn sha1_hex(password: &str) -> String {
    hex::encode_upper(Sha1::digest(password.as_bytes()))
}
