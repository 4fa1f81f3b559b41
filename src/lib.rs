//! pwnedbloom: sharded Bloom filters for breached-password lookups.
//!
//! Checks whether a password's SHA-1 digest appears in a breach corpus of
//! hundreds of millions of entries, in memory, with a tunable false positive
//! probability and no false negatives.
//!
//! # Quick Start
//!
//! ```
//! use pwnedbloom::ShardedBloomFilter;
//! use pwnedbloom::hash::sha1_hex;
//!
//! // 10,000 digests at 0.1% false positives
//! let mut filter = ShardedBloomFilter::new(10_000, 0.001).unwrap();
//!
//! filter.add_hex(&sha1_hex("password")).unwrap();
//!
//! assert!(filter.contains_hex(&sha1_hex("password")).unwrap());
//! assert!(!filter.contains_hex(&sha1_hex("tr0ub4dor&3")).unwrap());
//! ```
//!
//! # Building From a Corpus
//!
//! ```no_run
//! use pwnedbloom::corpus::{build_filter, verify_sources, BuildOptions};
//!
//! let sources = ["pwned-passwords-sha1-ordered-by-count.txt"];
//! let options = BuildOptions::default();
//!
//! let filter = build_filter(&sources, &options)?;
//! filter.save("pwned.bloom")?;
//!
//! let report = verify_sources(&filter, &sources, &options.corpus, options.expected_error_rate)?;
//! assert!(report.is_valid());
//! # Ok::<(), pwnedbloom::PwnedBloomError>(())
//! ```
//!
//! # Design
//!
//! - Items are 40-character hex SHA-1 digests. The two probe seeds are read
//!   from the digest text instead of hashing again.
//! - Probing uses double hashing: `|(h₁ + i·h₂) mod m|` for `i` in `0..k`.
//! - When the optimal bit count exceeds a positive 32-bit length, the bit
//!   space is split into 16 or 256 shards chosen by trailing digest nibbles.
//! - Filters persist to a fixed big-endian binary layout with a version tag.
//!
//! # Concurrency
//!
//! Everything is synchronous. A built filter is `Send + Sync`: share it behind
//! an `Arc` for concurrent lookups. Insertion takes `&mut self`.
//!
//! # Module Overview
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`core`] | `BloomFilter` trait, bit vector, shard selection, planning |
//! | [`hash`] | `Digest`, seed extraction, probe strategy, `sha1_hex` |
//! | [`filters`] | `ShardedBloomFilter` |
//! | [`builder`] | Type-state filter builder |
//! | [`serde_support`] | Binary format, header inspection |
//! | [`corpus`] | Corpus parsing, build and verify pipelines |
//! | [`client`] | Password lookup client |

#![warn(missing_docs)]
#![deny(unsafe_code)]

/// Core data structures and traits
pub mod core;

/// Error types and result aliases
pub mod error;

/// Filter implementations
pub mod filters;

/// Digest hashing and probe strategies
pub mod hash;

/// Type-safe filter builder
pub mod builder;

/// Binary persistence
pub mod serde_support;

/// Corpus build and verify pipelines
pub mod corpus;

/// Password lookup client
pub mod client;

pub use error::{PwnedBloomError, Result};

pub use crate::core::filter::BloomFilter;
pub use crate::core::params::FilterPlan;

pub use filters::{ShardStats, ShardedBloomFilter};

pub use builder::ShardedBloomFilterBuilder;

pub use hash::{sha1_hex, Digest};

pub use serde_support::{FilterInfo, FormatVersion};

pub use client::PwnedPasswordsClient;

/// Prelude module for convenient imports.
///
/// ```
/// use pwnedbloom::prelude::*;
///
/// let mut filter = ShardedBloomFilterBuilder::new().capacity(1_000).build().unwrap();
/// let hex = sha1_hex("hello");
/// let digest = Digest::parse(&hex).unwrap();
/// filter.insert(&digest);
/// assert!(filter.contains(&digest));
/// ```
pub mod prelude {
    pub use crate::builder::ShardedBloomFilterBuilder;
    pub use crate::core::filter::BloomFilter;
    pub use crate::corpus::{BuildOptions, CorpusOptions, VerificationReport, VerificationResult};
    pub use crate::error::{PwnedBloomError, Result};
    pub use crate::filters::ShardedBloomFilter;
    pub use crate::hash::{sha1_hex, Digest};
    pub use crate::serde_support::FormatVersion;
    pub use crate::PwnedPasswordsClient;
}
