//! Core filter trait.
//!
//! [`BloomFilter`] is the contract a digest filter offers its callers:
//!
//! 1. **No false negatives**: after `insert(d)`, `contains(d)` is `true` for
//!    the life of the filter and across save/load.
//! 2. **Bounded false positives**: for digests never inserted, `contains`
//!    returns `true` with roughly the configured probability once the filter
//!    holds its planned capacity.
//! 3. **Insert-only**: bits flip 0 → 1 and are never cleared.
//!
//! `insert` takes `&mut self`; `contains` takes `&self` and never mutates, so a
//! built filter can be shared across threads for lookups while writers are
//! serialized by ownership.
//!
//! # Examples
//!
//! ```
//! use pwnedbloom::core::BloomFilter;
//! use pwnedbloom::hash::Digest;
//! use pwnedbloom::ShardedBloomFilter;
//!
//! fn load_all<F: BloomFilter>(filter: &mut F, digests: &[&str]) {
//!     for hex in digests {
//!         if let Ok(d) = Digest::parse(hex) {
//!             filter.insert(&d);
//!         }
//!     }
//! }
//!
//! let mut filter = ShardedBloomFilter::new(100, 0.01).unwrap();
//! load_all(&mut filter, &["5BAA61E4C9B93F3F0682250B6CF8331B7EE68FD8"]);
//! let d = Digest::parse("5BAA61E4C9B93F3F0682250B6CF8331B7EE68FD8").unwrap();
//! assert!(filter.contains(&d));
//! ```

use crate::hash::Digest;

/// Membership filter over SHA-1 digests.
pub trait BloomFilter: Send + Sync {
    /// Record `item`. Inserting the same digest again changes nothing.
    fn insert(&mut self, item: &Digest<'_>);

    /// `true` if `item` may have been inserted, `false` if it definitely was not.
    #[must_use]
    fn contains(&self, item: &Digest<'_>) -> bool;
}
