//! Sharded Bloom filter over SHA-1 digests.
//!
//! # Architecture
//!
//! ```text
//! ShardedBloomFilter  (k probes, m bits per shard, 1 / 16 / 256 shards)
//!
//!   digest "5BAA61E4 C9B93F3F 0682...7EE68FD8"
//!           ────┬─── ────┬───              ─┬
//!            primary  secondary         select_shard
//!               │        │                   │
//!               └── DoubleHashing ──┐        ▼
//!                                   │   ┌─────────┬─────────┬─────┬─────────┐
//!                                   └──►│ Shard 0 │ Shard 1 │ ... │ Shard N │
//!                                       │ BitVec  │ BitVec  │     │ BitVec  │
//!                                       └─────────┴─────────┴─────┴─────────┘
//! ```
//!
//! Each digest lives in exactly one shard. Within that shard its `k` probe
//! positions are `|(h₁ + i·h₂) mod m|`. Sharding only exists to keep `m`
//! within a positive 32-bit length; every shard has the same `m` and `k`.
//!
//! # Concurrency
//!
//! `add` needs `&mut self`. `contains` reads only, so an `Arc<ShardedBloomFilter>`
//! serves lookups from any number of threads once it is built.
//!
//! # Examples
//!
//! ```
//! use pwnedbloom::ShardedBloomFilter;
//!
//! let mut filter = ShardedBloomFilter::new(1_000, 0.001).unwrap();
//! filter.add_hex("5BAA61E4C9B93F3F0682250B6CF8331B7EE68FD8").unwrap();
//!
//! assert!(filter.contains_hex("5baa61e4c9b93f3f0682250b6cf8331b7ee68fd8").unwrap());
//! assert!(!filter.contains_hex("0000000000000000000000000000000000000000").unwrap());
//! ```

#![allow(clippy::cast_precision_loss)]

use crate::core::bitvec::BitVec;
use crate::core::filter::BloomFilter;
use crate::core::params::{self, FilterPlan, MAX_BITS_PER_SHARD};
use crate::core::shard::select_shard;
use crate::error::{PwnedBloomError, Result};
use crate::hash::{Digest, DoubleHashing};
use crate::serde_support::binary::{self, FormatVersion};
use serde::Serialize;
use std::io::{Read, Write};
use std::path::Path;

/// Fill statistics for one shard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShardStats {
    /// Shard index (0-based).
    pub shard_id: usize,
    /// Bits in the shard.
    pub bits: usize,
    /// Bits set to 1.
    pub ones: usize,
    /// `ones / bits`. Trends toward 0.5 for a well-planned filter at capacity.
    pub fill_ratio: f64,
}

/// Bloom filter whose bit space is split into 1, 16 or 256 equal shards.
#[derive(Debug, Clone, PartialEq)]
pub struct ShardedBloomFilter {
    hash_count: u32,
    bits_per_shard: u32,
    total_capacity: u64,
    expected_error_rate: f32,
    shards: Vec<BitVec>,
}

impl ShardedBloomFilter {
    /// Create an empty filter planned for `capacity` digests at `error_rate`.
    ///
    /// # Errors
    ///
    /// Any configuration error from [`params::plan`]; no partial filter is built.
    pub fn new(capacity: u64, error_rate: f32) -> Result<Self> {
        Self::from_plan(&params::plan(capacity, error_rate)?)
    }

    /// Create an empty filter with error rate `1 / capacity`.
    ///
    /// # Errors
    ///
    /// As [`params::plan_with_default_rate`].
    pub fn with_default_rate(capacity: u64) -> Result<Self> {
        Self::from_plan(&params::plan_with_default_rate(capacity)?)
    }

    /// Allocate empty shards for an already computed plan.
    ///
    /// # Errors
    ///
    /// [`PwnedBloomError::InvalidParameters`] if the plan breaks a filter invariant.
    pub fn from_plan(plan: &FilterPlan) -> Result<Self> {
        validate_layout(
            plan.hash_count,
            plan.bits_per_shard,
            plan.shard_count,
            plan.capacity,
            plan.error_rate,
        )?;
        let shards = (0..plan.shard_count)
            .map(|_| BitVec::new(plan.bits_per_shard as usize))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            hash_count: plan.hash_count,
            bits_per_shard: plan.bits_per_shard,
            total_capacity: plan.capacity,
            expected_error_rate: plan.error_rate,
            shards,
        })
    }

    /// Reassemble a filter from decoded header fields and shard bits.
    ///
    /// Parameters are taken as given, not re-planned.
    pub(crate) fn from_parts(
        hash_count: u32,
        bits_per_shard: u32,
        total_capacity: u64,
        expected_error_rate: f32,
        shards: Vec<BitVec>,
    ) -> Result<Self> {
        let shard_count = u32::try_from(shards.len())
            .map_err(|_| PwnedBloomError::invalid_parameters("too many shards"))?;
        validate_layout(
            hash_count,
            bits_per_shard,
            shard_count,
            total_capacity,
            expected_error_rate,
        )?;
        if let Some(bad) = shards
            .iter()
            .position(|s| s.len() != bits_per_shard as usize)
        {
            return Err(PwnedBloomError::internal_error(format!(
                "shard {} has {} bits, expected {}",
                bad,
                shards[bad].len(),
                bits_per_shard
            )));
        }

        Ok(Self {
            hash_count,
            bits_per_shard,
            total_capacity,
            expected_error_rate,
            shards,
        })
    }

    /// Record `digest`.
    #[inline]
    pub fn add(&mut self, digest: &Digest<'_>) {
        let (k, m) = (self.hash_count, self.bits_per_shard);
        let index = select_shard(digest, self.shard_count());
        let shard = &mut self.shards[index];
        for index in DoubleHashing::new(digest.primary_hash(), digest.secondary_hash(), k, m) {
            shard.set(index);
        }
    }

    /// `true` if every probe bit of `digest` is set in its shard.
    #[must_use]
    #[inline]
    pub fn contains(&self, digest: &Digest<'_>) -> bool {
        let shard = &self.shards[select_shard(digest, self.shard_count())];
        DoubleHashing::new(
            digest.primary_hash(),
            digest.secondary_hash(),
            self.hash_count,
            self.bits_per_shard,
        )
        .all(|index| shard.get(index))
    }

    /// Validate `hex` as a digest and record it.
    ///
    /// # Errors
    ///
    /// [`PwnedBloomError::InvalidDigest`] if `hex` is not a 40-character hex digest.
    pub fn add_hex(&mut self, hex: &str) -> Result<()> {
        let digest = Digest::parse(hex)?;
        self.add(&digest);
        Ok(())
    }

    /// Validate `hex` as a digest and look it up.
    ///
    /// # Errors
    ///
    /// [`PwnedBloomError::InvalidDigest`] if `hex` is not a 40-character hex digest.
    pub fn contains_hex(&self, hex: &str) -> Result<bool> {
        Ok(self.contains(&Digest::parse(hex)?))
    }

    /// Probes per digest (k).
    #[must_use]
    pub const fn hash_count(&self) -> u32 {
        self.hash_count
    }

    /// Bits in each shard (m).
    #[must_use]
    pub const fn bits_per_shard(&self) -> u32 {
        self.bits_per_shard
    }

    /// Number of shards.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn shard_count(&self) -> u32 {
        // Bounded by MAX_SHARDS at construction.
        self.shards.len() as u32
    }

    /// Planned number of digests.
    #[must_use]
    pub const fn total_capacity(&self) -> u64 {
        self.total_capacity
    }

    /// Target false positive probability.
    #[must_use]
    pub const fn expected_error_rate(&self) -> f32 {
        self.expected_error_rate
    }

    /// The filter's layout as a plan.
    #[must_use]
    pub fn plan(&self) -> FilterPlan {
        FilterPlan {
            hash_count: self.hash_count,
            bits_per_shard: self.bits_per_shard,
            shard_count: self.shard_count(),
            capacity: self.total_capacity,
            error_rate: self.expected_error_rate,
        }
    }

    /// Shard bit vectors in index order.
    #[must_use]
    pub fn shards(&self) -> &[BitVec] {
        &self.shards
    }

    /// Bits set to 1 across all shards.
    #[must_use]
    pub fn count_ones(&self) -> u64 {
        self.shards.iter().map(|s| s.count_ones() as u64).sum()
    }

    /// Fraction of all bits set to 1.
    #[must_use]
    pub fn fill_ratio(&self) -> f64 {
        self.count_ones() as f64 / self.plan().total_bits() as f64
    }

    /// Per-shard fill statistics.
    ///
    /// ```
    /// use pwnedbloom::ShardedBloomFilter;
    ///
    /// let mut filter = ShardedBloomFilter::new(1_000, 0.01).unwrap();
    /// filter.add_hex("5BAA61E4C9B93F3F0682250B6CF8331B7EE68FD8").unwrap();
    ///
    /// for stat in filter.shard_stats() {
    ///     println!("shard {}: {:.2}%", stat.shard_id, stat.fill_ratio * 100.0);
    /// }
    /// ```
    #[must_use]
    pub fn shard_stats(&self) -> Vec<ShardStats> {
        self.shards
            .iter()
            .enumerate()
            .map(|(shard_id, bits)| ShardStats {
                shard_id,
                bits: bits.len(),
                ones: bits.count_ones(),
                fill_ratio: bits.fill_ratio(),
            })
            .collect()
    }

    /// Bytes held by the filter, shards included.
    #[must_use]
    pub fn memory_usage(&self) -> usize {
        let shard_memory: usize = self.shards.iter().map(BitVec::memory_usage).sum();
        shard_memory + std::mem::size_of::<Self>()
    }

    /// Theoretical false positive probability with the planned capacity inserted.
    #[must_use]
    pub fn estimated_false_positive_rate(&self) -> f64 {
        self.plan().expected_fp_rate()
    }

    /// Encoded size in bytes for `version`.
    #[must_use]
    pub fn encoded_len(&self, version: FormatVersion) -> usize {
        binary::encoded_len(&self.plan(), version)
    }

    /// Encode in the current format.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        binary::encode(self, FormatVersion::CURRENT)
    }

    /// Decode from either supported format.
    ///
    /// # Errors
    ///
    /// [`PwnedBloomError::InvalidFileFormat`] on any header or length mismatch.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        binary::decode(bytes)
    }

    /// Stream the encoding into `writer`.
    ///
    /// # Errors
    ///
    /// Propagates I/O errors from `writer`.
    pub fn write_to<W: Write>(&self, writer: W, version: FormatVersion) -> Result<()> {
        binary::write_to(self, writer, version)
    }

    /// Read a filter from `reader`, which must hold exactly one encoded filter.
    ///
    /// # Errors
    ///
    /// I/O errors, or [`PwnedBloomError::InvalidFileFormat`].
    pub fn read_from<R: Read>(reader: R) -> Result<Self> {
        binary::read_from(reader)
    }

    /// Save to `path` in the current format, replacing any existing file.
    ///
    /// # Errors
    ///
    /// I/O errors creating or writing the file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        binary::save(self, path.as_ref(), FormatVersion::CURRENT)
    }

    /// Load from `path`.
    ///
    /// # Errors
    ///
    /// I/O errors, or [`PwnedBloomError::InvalidFileFormat`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        binary::load(path.as_ref())
    }
}

impl BloomFilter for ShardedBloomFilter {
    fn insert(&mut self, item: &Digest<'_>) {
        self.add(item);
    }

    fn contains(&self, item: &Digest<'_>) -> bool {
        ShardedBloomFilter::contains(self, item)
    }
}
