//! In-process lookup of passwords against a loaded filter.
//!
//! Once the filter is in memory, lookups touch neither disk nor network.
//!
//! ```
//! use pwnedbloom::{PwnedPasswordsClient, ShardedBloomFilter};
//! use pwnedbloom::hash::sha1_hex;
//!
//! let mut filter = ShardedBloomFilter::new(1_000, 0.001).unwrap();
//! filter.add_hex(&sha1_hex("password")).unwrap();
//!
//! let client = PwnedPasswordsClient::new(filter);
//! assert!(client.is_password_pwned("password"));
//! assert!(client.is_digest_pwned("5baa61e4c9b93f3f0682250b6cf8331b7ee68fd8").unwrap());
//! ```

use crate::error::Result;
use crate::filters::ShardedBloomFilter;
use crate::hash::{sha1_hex, Digest};
use std::path::Path;

/// Answers "has this password appeared in a breach" from a filter.
///
/// `Sync`: share one client across request handlers behind an `Arc`.
#[derive(Debug, Clone)]
pub struct PwnedPasswordsClient {
    filter: ShardedBloomFilter,
}

impl PwnedPasswordsClient {
    /// Serve lookups from `filter`.
    #[must_use]
    pub fn new(filter: ShardedBloomFilter) -> Self {
        Self { filter }
    }

    /// Load the filter saved at `path`.
    ///
    /// # Errors
    ///
    /// As [`ShardedBloomFilter::load`].
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        ShardedBloomFilter::load(path).map(Self::new)
    }

    /// Look up a hex SHA-1 digest, in either case.
    ///
    /// # Errors
    ///
    /// [`PwnedBloomError::InvalidDigest`](crate::PwnedBloomError::InvalidDigest)
    /// if `digest` is not 40 hex characters.
    pub fn is_digest_pwned(&self, digest: &str) -> Result<bool> {
        Ok(self.filter.contains(&Digest::parse(digest)?))
    }

    /// Hash `password` with SHA-1 and look it up.
    #[must_use]
    pub fn is_password_pwned(&self, password: &str) -> bool {
        let hex = sha1_hex(password);
        // sha1_hex always yields a well-formed digest
        Digest::parse(&hex).is_ok_and(|digest| self.filter.contains(&digest))
    }

    /// The underlying filter.
    #[must_use]
    pub fn filter(&self) -> &ShardedBloomFilter {
        &self.filter
    }

    /// Take back the filter.
    #[must_use]
    pub fn into_inner(self) -> ShardedBloomFilter {
        self.filter
    }
}

impl From<ShardedBloomFilter> for PwnedPasswordsClient {
    fn from(filter: ShardedBloomFilter) -> Self {
        Self::new(filter)
    }
}
