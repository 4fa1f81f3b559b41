//! Capacity planning for sharded digest filters.
//!
//! Given a target capacity `n` and false positive probability `ε`:
//!
//! - `m = ⌈n × ln(ε) / ln(1 / 2^ln2)⌉` bits (equivalently `-n × ln(ε) / (ln 2)²`)
//! - `k = round(ln 2 × m / n)` probes per item
//! - expected rate after `n` inserts: `p = (1 - e^(-kn/m))^k`
//!
//! A single shard is limited to [`MAX_BITS_PER_SHARD`] bits (a positive 32-bit
//! length). When `m` does not fit, [`plan`] splits the bit space into 16 or 256
//! equally sized shards, dividing the capacity accordingly. Shard counts are
//! powers of 16 because shard selection consumes whole hex nibbles of the digest.
//!
//! All functions here are pure: no I/O, no shared state.

#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_precision_loss)]

use crate::error::{PwnedBloomError, Result};
use serde::Serialize;
use std::f64::consts::LN_2;

/// Largest number of bits a single shard may hold.
pub const MAX_BITS_PER_SHARD: u32 = i32::MAX as u32;

/// Factor by which the shard count grows at each sharding step.
pub const SHARD_FACTOR: u32 = 16;

/// Maximum number of shards in one filter.
pub const MAX_SHARDS: u32 = 256;

/// Minimum number of probes per item.
pub const MIN_HASH_FUNCTIONS: u32 = 1;

/// Error rate used by the command-line tool when none is given (0.1%).
pub const DEFAULT_ERROR_RATE: f32 = 0.001;

/// Base of the logarithm in the bit-count formula: `1 / 2^ln2`.
fn bit_count_log_base() -> f64 {
    1.0 / 2f64.powf(LN_2)
}

fn validate(capacity: u64, error_rate: f32) -> Result<()> {
    if capacity == 0 {
        return Err(PwnedBloomError::invalid_item_count(0));
    }
    if capacity > i64::MAX as u64 {
        return Err(PwnedBloomError::invalid_parameters(format!(
            "capacity {} does not fit in a signed 64-bit header field",
            capacity
        )));
    }
    // Written this way round so NaN is rejected too.
    if !(error_rate > 0.0 && error_rate < 1.0) {
        return Err(PwnedBloomError::fp_rate_out_of_bounds(error_rate));
    }
    Ok(())
}

/// Unvalidated bit count in double precision.
fn raw_bit_count(capacity: u64, error_rate: f32) -> f64 {
    let m = capacity as f64 * f64::from(error_rate).ln() / bit_count_log_base().ln();
    m.ceil()
}

/// Optimal number of bits for `capacity` items at `error_rate`.
///
/// The result may exceed what one shard can hold; see [`plan`].
///
/// # Errors
///
/// - [`PwnedBloomError::InvalidItemCount`] if `capacity == 0`
/// - [`PwnedBloomError::FalsePositiveRateOutOfBounds`] if `error_rate` is not in (0, 1)
///
/// # Examples
///
/// ```
/// use pwnedbloom::core::params::best_m;
///
/// let bits = best_m(1000, 0.01).unwrap();
/// assert!((9585..=9586).contains(&bits));
/// ```
pub fn best_m(capacity: u64, error_rate: f32) -> Result<u64> {
    validate(capacity, error_rate)?;
    let m = raw_bit_count(capacity, error_rate);
    if m >= u64::MAX as f64 {
        return Err(PwnedBloomError::invalid_parameters(format!(
            "bit count {:.0} for capacity {} exceeds u64",
            m, capacity
        )));
    }
    Ok((m as u64).max(1))
}

/// Optimal number of probes for `capacity` items at `error_rate`.
///
/// Rounds half to even and never returns less than [`MIN_HASH_FUNCTIONS`].
///
/// # Examples
///
/// ```
/// use pwnedbloom::core::params::best_k;
///
/// assert_eq!(best_k(1000, 0.01).unwrap(), 7);
/// assert_eq!(best_k(1000, 0.001).unwrap(), 10);
/// ```
pub fn best_k(capacity: u64, error_rate: f32) -> Result<u32> {
    let m = best_m(capacity, error_rate)?;
    let k = (LN_2 * m as f64 / capacity as f64).round_ties_even();
    Ok((k as u32).max(MIN_HASH_FUNCTIONS))
}

/// Default error rate for a capacity: `1 / capacity`.
///
/// Falls back to `0.6185^(i32::MAX × SHARD_FACTOR / capacity)` if the reciprocal
/// underflows in single precision.
///
/// # Errors
///
/// [`PwnedBloomError::InvalidItemCount`] if `capacity == 0`.
pub fn best_error_rate(capacity: u64) -> Result<f32> {
    if capacity == 0 {
        return Err(PwnedBloomError::invalid_item_count(0));
    }
    let reciprocal = (1.0 / capacity as f64) as f32;
    if reciprocal != 0.0 {
        return Ok(reciprocal);
    }
    let exponent = f64::from(i32::MAX) * f64::from(SHARD_FACTOR) / capacity as f64;
    Ok(0.6185f64.powf(exponent) as f32)
}

/// Expected false positive probability for `n` items in `m` bits with `k` probes.
///
/// Returns `0.0` for an empty filter and is clamped to `[0, 1]`.
///
/// ```
/// use pwnedbloom::core::params::expected_fp_rate;
///
/// let fp = expected_fp_rate(9586, 1000, 7);
/// assert!((fp - 0.01).abs() < 0.001);
/// ```
#[must_use]
pub fn expected_fp_rate(m: u64, n: u64, k: u32) -> f64 {
    if m == 0 || n == 0 || k == 0 {
        return 0.0;
    }
    let exponent = -(f64::from(k) * n as f64) / m as f64;
    (1.0 - exponent.exp()).powf(f64::from(k)).clamp(0.0, 1.0)
}

/// The derived layout of a filter: probes, bits per shard and shard count.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FilterPlan {
    /// Probes per item (k).
    pub hash_count: u32,
    /// Bits in each shard (m).
    pub bits_per_shard: u32,
    /// Number of shards: 1, 16 or 256.
    pub shard_count: u32,
    /// Total anticipated items.
    pub capacity: u64,
    /// Target false positive probability.
    pub error_rate: f32,
}

impl FilterPlan {
    /// Bits across all shards.
    #[must_use]
    pub fn total_bits(&self) -> u64 {
        u64::from(self.bits_per_shard) * u64::from(self.shard_count)
    }

    /// Anticipated items per shard.
    #[must_use]
    pub fn capacity_per_shard(&self) -> u64 {
        self.capacity / u64::from(self.shard_count)
    }

    /// Packed bytes per shard in the persisted format.
    #[must_use]
    pub fn bytes_per_shard(&self) -> usize {
        (self.bits_per_shard as usize).div_ceil(8)
    }

    /// Theoretical false positive probability once `capacity` items are inserted.
    #[must_use]
    pub fn expected_fp_rate(&self) -> f64 {
        expected_fp_rate(
            u64::from(self.bits_per_shard),
            self.capacity_per_shard(),
            self.hash_count,
        )
    }
}

/// Plan a filter for `capacity` items at `error_rate`.
///
/// Starts with one shard; while the bit requirement exceeds
/// [`MAX_BITS_PER_SHARD`], divides the capacity by 16 and multiplies the shard
/// count by 16, up to [`MAX_SHARDS`]. `k` is computed from the original
/// capacity divided by the final shard count.
///
/// # Errors
///
/// - [`PwnedBloomError::InvalidItemCount`] if `capacity == 0`
/// - [`PwnedBloomError::FalsePositiveRateOutOfBounds`] if `error_rate` is not in (0, 1)
/// - [`PwnedBloomError::InfeasibleParameters`] if 256 shards are still not enough
///
/// # Examples
///
/// ```
/// use pwnedbloom::core::params::plan;
///
/// let small = plan(10_000, 0.001).unwrap();
/// assert_eq!(small.shard_count, 1);
///
/// let huge = plan(1 << 31, 0.001).unwrap();
/// assert_eq!(huge.shard_count, 16);
/// ```
pub fn plan(capacity: u64, error_rate: f32) -> Result<FilterPlan> {
    validate(capacity, error_rate)?;

    let mut shard_count = 1u32;
    let mut shard_capacity = capacity;
    let bits_per_shard = loop {
        let m = raw_bit_count(shard_capacity, error_rate);
        if m <= f64::from(MAX_BITS_PER_SHARD) {
            break (m as u32).max(1);
        }
        if shard_count >= MAX_SHARDS {
            return Err(PwnedBloomError::infeasible_parameters(
                capacity, error_rate, MAX_SHARDS,
            ));
        }
        shard_capacity = (shard_capacity / u64::from(SHARD_FACTOR)).max(1);
        shard_count *= SHARD_FACTOR;
    };

    let hash_count = best_k(capacity / u64::from(shard_count), error_rate)?;

    Ok(FilterPlan {
        hash_count,
        bits_per_shard,
        shard_count,
        capacity,
        error_rate,
    })
}

/// Plan a filter using [`best_error_rate`] for the capacity.
pub fn plan_with_default_rate(capacity: u64) -> Result<FilterPlan> {
    plan(capacity, best_error_rate(capacity)?)
}

/// True for the shard counts a filter may use: 1, 16 and 256.
#[must_use]
pub fn is_valid_shard_count(shard_count: u32) -> bool {
    matches!(shard_count, 1 | 16 | 256)
}
