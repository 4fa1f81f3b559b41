//! Core building blocks: the filter trait, bit storage, shard selection and
//! capacity planning.
//!
//! # Module Organization
//!
//! ```text
//! core/
//! ├── filter.rs    - BloomFilter trait
//! ├── bitvec.rs    - Fixed-length bit vector (one per shard)
//! ├── shard.rs     - Digest → shard index
//! ├── params.rs    - Bit count, probe count, error rate and shard planning
//! └── mod.rs       - This file (public API)
//! ```
//!
//! Everything here is synchronous and free of I/O. Planning and shard
//! selection are pure functions; `BitVec` is a plain value with no interior
//! mutability.

pub mod bitvec;
pub mod filter;
pub mod params;
pub mod shard;

pub use bitvec::BitVec;
pub use filter::BloomFilter;
pub use params::{FilterPlan, DEFAULT_ERROR_RATE, MAX_BITS_PER_SHARD, MAX_SHARDS};
pub use shard::select_shard;
