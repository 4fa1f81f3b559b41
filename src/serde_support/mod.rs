//! Persistence for sharded filters.
//!
//! Filters are stored in a compact fixed-layout binary format: a short
//! big-endian header with the filter parameters, then each shard's bits
//! packed eight to a byte. See [`binary`] for the exact layout.
//!
//! Most callers use [`ShardedBloomFilter::save`](crate::ShardedBloomFilter::save)
//! and [`ShardedBloomFilter::load`](crate::ShardedBloomFilter::load); this
//! module exposes the encoder, decoder and header inspection directly.

pub mod binary;

pub use binary::{FileHeader, FilterInfo, FormatError, FormatVersion};
