//! Builder for sharded digest filters.
//!
//! # Type-State Pattern
//!
//! ```text
//! Initial → WithItems → Complete
//!     ↓         ↓           ↓
//!   .capacity()  .error_rate()  .build()
//!                  ↓
//!               .build()   (error rate 1 / capacity)
//! ```
//!
//! Capacity is required; the error rate is optional and defaults to
//! [`best_error_rate`](crate::core::params::best_error_rate).
//!
//! # Examples
//!
//! ```
//! use pwnedbloom::builder::ShardedBloomFilterBuilder;
//!
//! let filter = ShardedBloomFilterBuilder::new()
//!     .capacity(10_000)
//!     .error_rate(0.001)
//!     .build()
//!     .unwrap();
//! assert_eq!(filter.shard_count(), 1);
//!
//! // Default rate: 1 / 10_000
//! let filter = ShardedBloomFilterBuilder::new().capacity(10_000).build().unwrap();
//! assert!((filter.expected_error_rate() - 1.0e-4).abs() < 1e-9);
//! ```
//!
//! ## Error Handling
//!
//! ```
//! use pwnedbloom::builder::ShardedBloomFilterBuilder;
//!
//! let result = ShardedBloomFilterBuilder::new()
//!     .capacity(0)
//!     .error_rate(0.01)
//!     .build();
//! assert!(result.is_err());
//! ```

use crate::core::params::{self, FilterPlan};
use crate::error::Result;
use crate::filters::ShardedBloomFilter;
use std::marker::PhantomData;

/// Type-state marker: nothing set.
pub struct Initial;

/// Type-state marker: capacity set.
pub struct WithItems;

/// Type-state marker: capacity and error rate set.
pub struct Complete;

/// Builder for [`ShardedBloomFilter`] with type-state guarantees.
pub struct ShardedBloomFilterBuilder<State> {
    capacity: u64,
    error_rate: Option<f32>,
    _state: PhantomData<State>,
}

impl ShardedBloomFilterBuilder<Initial> {
    /// Start a new builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            capacity: 0,
            error_rate: None,
            _state: PhantomData,
        }
    }

    /// Set the planned number of digests. Required.
    #[must_use]
    pub fn capacity(self, capacity: u64) -> ShardedBloomFilterBuilder<WithItems> {
        ShardedBloomFilterBuilder {
            capacity,
            error_rate: self.error_rate,
            _state: PhantomData,
        }
    }
}

impl Default for ShardedBloomFilterBuilder<Initial> {
    fn default() -> Self {
        Self::new()
    }
}

impl ShardedBloomFilterBuilder<WithItems> {
    /// Set the target false positive probability, in (0, 1).
    #[must_use]
    pub fn error_rate(self, error_rate: f32) -> ShardedBloomFilterBuilder<Complete> {
        ShardedBloomFilterBuilder {
            capacity: self.capacity,
            error_rate: Some(error_rate),
            _state: PhantomData,
        }
    }

    /// Build with the default error rate for the capacity.
    ///
    /// # Errors
    ///
    /// Any configuration error from planning.
    pub fn build(self) -> Result<ShardedBloomFilter> {
        self.build_with_plan().map(|(filter, _)| filter)
    }

    /// Build and also return the derived plan.
    ///
    /// # Errors
    ///
    /// Any configuration error from planning.
    pub fn build_with_plan(self) -> Result<(ShardedBloomFilter, FilterPlan)> {
        finish(self.capacity, self.error_rate)
    }
}

impl ShardedBloomFilterBuilder<Complete> {
    /// Build the filter.
    ///
    /// # Errors
    ///
    /// - capacity is 0
    /// - error rate outside (0, 1)
    /// - capacity/error-rate pair needs more than 256 shards
    pub fn build(self) -> Result<ShardedBloomFilter> {
        self.build_with_plan().map(|(filter, _)| filter)
    }

    /// Build and also return the derived plan.
    ///
    /// ```
    /// use pwnedbloom::builder::ShardedBloomFilterBuilder;
    ///
    /// let (filter, plan) = ShardedBloomFilterBuilder::new()
    ///     .capacity(1_000)
    ///     .error_rate(0.01)
    ///     .build_with_plan()
    ///     .unwrap();
    /// assert_eq!(plan.hash_count, filter.hash_count());
    /// println!("{} bytes per shard", plan.bytes_per_shard());
    /// ```
    ///
    /// # Errors
    ///
    /// As [`build`](Self::build).
    pub fn build_with_plan(self) -> Result<(ShardedBloomFilter, FilterPlan)> {
        finish(self.capacity, self.error_rate)
    }
}

fn finish(capacity: u64, error_rate: Option<f32>) -> Result<(ShardedBloomFilter, FilterPlan)> {
    let plan = match error_rate {
        Some(rate) => params::plan(capacity, rate)?,
        None => params::plan_with_default_rate(capacity)?,
    };
    Ok((ShardedBloomFilter::from_plan(&plan)?, plan))
}
