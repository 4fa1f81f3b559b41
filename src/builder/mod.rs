//! Fluent construction of sharded filters.
//!
//! The builder uses the type-state pattern: a filter cannot be built before a
//! capacity is given, and invalid values are still reported at runtime.
//!
//! - **Compile-time errors**: missing capacity
//! - **Runtime errors**: capacity 0, error rate outside (0, 1), or more than 256 shards needed
//!
//! ```
//! use pwnedbloom::builder::ShardedBloomFilterBuilder;
//!
//! let filter = ShardedBloomFilterBuilder::new()
//!     .capacity(100_000)
//!     .error_rate(0.001)
//!     .build()
//!     .unwrap();
//! assert_eq!(filter.total_capacity(), 100_000);
//! ```

pub mod sharded;

pub use sharded::{Complete, Initial, ShardedBloomFilterBuilder, WithItems};
