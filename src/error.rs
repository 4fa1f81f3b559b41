//! Error types for pwnedbloom operations.
//!
//! Every fallible operation in the crate returns [`Result<T>`]. Errors fall into
//! four groups:
//!
//! - **Configuration**: capacity, error rate or prevalence out of range, or a
//!   capacity/error-rate pair that cannot be sharded to fit.
//! - **Input format**: malformed digests, corpus lines or persisted filters.
//! - **Consistency**: a build whose insert count disagrees with its count pass.
//! - **I/O**: failures reading corpora or reading/writing filter files.
//!
//! Statistical verification outcomes are not errors; see
//! [`VerificationReport`](crate::corpus::VerificationReport).
//!
//! # Error Propagation
//!
//! ```
//! use pwnedbloom::{Result, PwnedBloomError};
//! use pwnedbloom::core::params::plan;
//!
//! fn shard_count_for(capacity: u64, fp: f32) -> Result<u32> {
//!     let plan = plan(capacity, fp)?;
//!     Ok(plan.shard_count)
//! }
//! # assert_eq!(shard_count_for(1000, 0.01).unwrap(), 1);
//! # assert!(shard_count_for(0, 0.01).is_err());
//! ```

#![allow(clippy::module_name_repetitions)]

use std::fmt;

/// Result type alias for pwnedbloom operations.
pub type Result<T> = std::result::Result<T, PwnedBloomError>;

/// Errors that can occur while planning, building, persisting or querying a filter.
///
/// `Clone` + `PartialEq` so tests can compare errors directly; I/O errors are
/// captured as their [`std::io::ErrorKind`] and message for the same reason.
#[derive(Debug, Clone, PartialEq)]
pub enum PwnedBloomError {
    /// Invalid filter parameters that do not fit a more specific variant.
    InvalidParameters {
        /// Human-readable description of what's invalid.
        message: String,
    },

    /// Expected error rate outside the open interval (0, 1).
    FalsePositiveRateOutOfBounds {
        /// The rejected rate.
        fp_rate: f64,
    },

    /// Capacity below 1.
    InvalidItemCount {
        /// The rejected capacity.
        count: i64,
    },

    /// The bit requirement does not fit in a 32-bit shard even at the maximum shard count.
    InfeasibleParameters {
        /// Requested capacity.
        capacity: u64,
        /// Requested error rate.
        fp_rate: f64,
        /// Largest shard count that was tried.
        max_shards: u32,
    },

    /// Minimum prevalence below 1.
    InvalidPrevalence {
        /// The rejected threshold.
        value: i64,
    },

    /// A string that is not a 40-character hexadecimal SHA-1 digest.
    InvalidDigest {
        /// The offending input (truncated for display).
        digest: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A corpus line or persisted filter that does not have the expected layout.
    InvalidFileFormat {
        /// Description of the format violation.
        message: String,
    },

    /// A build inserted a different number of records than its count pass reported.
    InconsistentBuild {
        /// The corpus source being loaded.
        source: String,
        /// Records counted by the count pass (or supplied by the caller).
        expected: u64,
        /// Records actually inserted by the load pass.
        actual: u64,
    },

    /// Underlying I/O failure.
    Io {
        /// The I/O error kind.
        kind: std::io::ErrorKind,
        /// The I/O error message, with context where available.
        message: String,
    },

    /// Internal invariant violated. Indicates a bug in pwnedbloom.
    InternalError {
        /// Description of the invariant that was violated.
        message: String,
    },
}

impl fmt::Display for PwnedBloomError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidParameters { message } => {
                write!(f, "Invalid Bloom filter parameters: {}.", message)
            }
            Self::FalsePositiveRateOutOfBounds { fp_rate } => {
                write!(
                    f,
                    "Expected error rate {} is out of bounds. Must be in range (0, 1).",
                    fp_rate
                )
            }
            Self::InvalidItemCount { count } => {
                write!(
                    f,
                    "Invalid capacity: {}. Capacity must be greater than 0.",
                    count
                )
            }
            Self::InfeasibleParameters {
                capacity,
                fp_rate,
                max_shards,
            } => {
                write!(
                    f,
                    "Capacity {} with error rate {} needs more than {} shards of at most {} bits. \
                     Reduce the capacity or increase the error rate.",
                    capacity,
                    fp_rate,
                    max_shards,
                    i32::MAX
                )
            }
            Self::InvalidPrevalence { value } => {
                write!(
                    f,
                    "Invalid minimum prevalence: {}. Must be at least 1.",
                    value
                )
            }
            Self::InvalidDigest { digest, reason } => {
                write!(f, "Invalid SHA-1 digest <{}>: {}.", digest, reason)
            }
            Self::InvalidFileFormat { message } => {
                write!(f, "Invalid file format: {}", message)
            }
            Self::InconsistentBuild {
                source,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "Error reading passwords from '{}': number of passwords read <{}> did not match number expected <{}>",
                    source, actual, expected
                )
            }
            Self::Io { kind, message } => write!(f, "I/O error ({:?}): {}", kind, message),
            Self::InternalError { message } => {
                write!(
                    f,
                    "Internal error (this is a bug in pwnedbloom): {}.",
                    message
                )
            }
        }
    }
}

impl std::error::Error for PwnedBloomError {}

impl From<std::io::Error> for PwnedBloomError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl PwnedBloomError {
    /// Create an `InvalidParameters` error.
    #[must_use]
    pub fn invalid_parameters(message: impl Into<String>) -> Self {
        Self::InvalidParameters {
            message: message.into(),
        }
    }

    /// Create a `FalsePositiveRateOutOfBounds` error.
    #[must_use]
    pub fn fp_rate_out_of_bounds(fp_rate: impl Into<f64>) -> Self {
        Self::FalsePositiveRateOutOfBounds {
            fp_rate: fp_rate.into(),
        }
    }

    /// Create an `InvalidItemCount` error.
    #[must_use]
    pub fn invalid_item_count(count: i64) -> Self {
        Self::InvalidItemCount { count }
    }

    /// Create an `InfeasibleParameters` error.
    #[must_use]
    pub fn infeasible_parameters(capacity: u64, fp_rate: impl Into<f64>, max_shards: u32) -> Self {
        Self::InfeasibleParameters {
            capacity,
            fp_rate: fp_rate.into(),
            max_shards,
        }
    }

    /// Create an `InvalidPrevalence` error.
    #[must_use]
    pub fn invalid_prevalence(value: i64) -> Self {
        Self::InvalidPrevalence { value }
    }

    /// Create an `InvalidDigest` error. Long inputs are shortened for display.
    #[must_use]
    pub fn invalid_digest(digest: &str, reason: impl Into<String>) -> Self {
        let digest = if digest.chars().count() > 48 {
            let head: String = digest.chars().take(48).collect();
            format!("{head}...")
        } else {
            digest.to_string()
        };
        Self::InvalidDigest {
            digest,
            reason: reason.into(),
        }
    }

    /// Create an `InvalidFileFormat` error.
    #[must_use]
    pub fn invalid_file_format(message: impl Into<String>) -> Self {
        Self::InvalidFileFormat {
            message: message.into(),
        }
    }

    /// Create an `InconsistentBuild` error.
    #[must_use]
    pub fn inconsistent_build(source: impl Into<String>, expected: u64, actual: u64) -> Self {
        Self::InconsistentBuild {
            source: source.into(),
            expected,
            actual,
        }
    }

    /// Wrap an I/O error with the path or operation it came from.
    #[must_use]
    pub fn io_with_context(err: &std::io::Error, context: impl fmt::Display) -> Self {
        Self::Io {
            kind: err.kind(),
            message: format!("{context}: {err}"),
        }
    }

    /// Create an `InternalError`.
    #[must_use]
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::InternalError {
            message: message.into(),
        }
    }

    /// True for the configuration-error group (rejected before any filter exists).
    #[must_use]
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidParameters { .. }
                | Self::FalsePositiveRateOutOfBounds { .. }
                | Self::InvalidItemCount { .. }
                | Self::InfeasibleParameters { .. }
                | Self::InvalidPrevalence { .. }
        )
    }
}
