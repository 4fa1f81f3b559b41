//! Filter implementations.
//!
//! [`ShardedBloomFilter`] is the only filter: a Bloom filter over SHA-1
//! digests whose bit space is split across 1, 16 or 256 shards so that each
//! shard stays within a 32-bit length.

pub mod sharded;

pub use sharded::{ShardStats, ShardedBloomFilter};
