//! Building a filter from one or more corpus files.
//!
//! ```text
//! sources ──count pass──► capacities ──sum──► plan ──► empty filter
//!    │                                                     │
//!    └──────────────load pass (per source)─────────────────┘
//!                          │
//!              loaded == counted, else abort
//! ```
//!
//! The count pass can be skipped for a single source whose qualifying record
//! count is already known.

use super::{count_qualifying_file, load_qualifying_file, CorpusOptions};
use crate::core::params::{self, DEFAULT_ERROR_RATE};
use crate::error::{PwnedBloomError, Result};
use crate::filters::ShardedBloomFilter;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Settings for [`build_filter`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildOptions {
    /// Threshold and separator.
    pub corpus: CorpusOptions,
    /// Target false positive probability.
    pub expected_error_rate: f32,
    /// Known qualifying record count. Only valid with a single source.
    pub number_of_passwords: Option<u64>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            corpus: CorpusOptions::default(),
            expected_error_rate: DEFAULT_ERROR_RATE,
            number_of_passwords: None,
        }
    }
}

impl BuildOptions {
    /// Check the options against the number of sources.
    ///
    /// # Errors
    ///
    /// - no sources
    /// - invalid corpus options
    /// - `number_of_passwords` with more than one source, or set to 0
    pub fn validate(&self, source_count: usize) -> Result<()> {
        if source_count == 0 {
            return Err(PwnedBloomError::invalid_parameters(
                "at least one corpus source is required",
            ));
        }
        self.corpus.validate()?;
        match self.number_of_passwords {
            Some(_) if source_count != 1 => Err(PwnedBloomError::invalid_parameters(
                "number of passwords can only be given with a single source",
            )),
            Some(0) => Err(PwnedBloomError::invalid_item_count(0)),
            _ => Ok(()),
        }
    }
}

/// Count, plan, and load `sources` into a new filter.
///
/// The filter is returned only if every load pass inserted exactly as many
/// digests as its count pass (or `number_of_passwords`) predicted.
///
/// # Errors
///
/// - configuration errors from [`BuildOptions::validate`] or planning
/// - I/O and format errors from reading the sources
/// - [`PwnedBloomError::InconsistentBuild`] if a load pass disagrees with its count
pub fn build_filter<P: AsRef<Path>>(sources: &[P], options: &BuildOptions) -> Result<ShardedBloomFilter> {
    options.validate(sources.len())?;

    let capacities = match options.number_of_passwords {
        Some(known) => vec![known],
        None => sources
            .iter()
            .map(|source| count_qualifying_file(source.as_ref(), &options.corpus))
            .collect::<Result<Vec<_>>>()?,
    };
    let capacity: u64 = capacities.iter().sum();
    info!(
        capacity,
        error_rate = options.expected_error_rate,
        "Total required capacity"
    );

    let plan = params::plan(capacity, options.expected_error_rate)?;
    info!(
        hash_count = plan.hash_count,
        bits_per_shard = plan.bits_per_shard,
        shards = plan.shard_count,
        "Creating filter"
    );
    let mut filter = ShardedBloomFilter::from_plan(&plan)?;

    for (source, &expected) in sources.iter().zip(&capacities) {
        let source = source.as_ref();
        let loaded = load_qualifying_file(source, &mut filter, &options.corpus)?;
        if loaded != expected {
            return Err(PwnedBloomError::inconsistent_build(
                source.display().to_string(),
                expected,
                loaded,
            ));
        }
    }

    info!(
        fill_ratio = filter.fill_ratio(),
        "Filter built successfully"
    );
    Ok(filter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_corpus(dir: &tempfile::TempDir, name: &str, lines: &[(&str, i64)]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        for (digest, prevalence) in lines {
            writeln!(file, "{digest}:{prevalence}").unwrap();
        }
        path
    }

    const A: &str = "7C4A8D09CA3762AF61E59520943DC26494F8941B";
    const B: &str = "F7C3BC1D808E04732ADF679965CCC34CA7AE3441";
    const C: &str = "B1B3773A05C0ED0176787A4F1574FF0075F7521E";

    #[test]
    fn test_validate() {
        let opts = BuildOptions::default();
        assert!(opts.validate(0).is_err());
        assert!(opts.validate(2).is_ok());

        let known = BuildOptions {
            number_of_passwords: Some(10),
            ..BuildOptions::default()
        };
        assert!(known.validate(1).is_ok());
        assert!(known.validate(2).is_err());

        let zero = BuildOptions {
            number_of_passwords: Some(0),
            ..BuildOptions::default()
        };
        assert!(zero.validate(1).is_err());
    }

    #[test]
    fn test_build_from_two_sources() {
        let dir = tempfile::tempdir().unwrap();
        let first = write_corpus(&dir, "a.txt", &[(A, 9), (B, 3)]);
        let second = write_corpus(&dir, "b.txt", &[(C, 4)]);

        let filter = build_filter(&[first, second], &BuildOptions::default()).unwrap();
        assert_eq!(filter.total_capacity(), 3);
        for d in [A, B, C] {
            assert!(filter.contains_hex(d).unwrap());
        }
    }

    #[test]
    fn test_build_from_corpus_with_byte_order_mark() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bom.txt");
        std::fs::write(&path, format!("\u{FEFF}{A}:9\r\n{B}:3\r\n")).unwrap();

        let filter = build_filter(&[&path], &BuildOptions::default()).unwrap();
        assert_eq!(filter.total_capacity(), 2);
        assert!(filter.contains_hex(A).unwrap());
        assert!(filter.contains_hex(B).unwrap());
    }

    #[test]
    fn test_build_with_known_count() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_corpus(&dir, "a.txt", &[(A, 9), (B, 3)]);
        let opts = BuildOptions {
            number_of_passwords: Some(2),
            ..BuildOptions::default()
        };
        assert_eq!(build_filter(&[&path], &opts).unwrap().total_capacity(), 2);
    }

    #[test]
    fn test_build_with_wrong_known_count_is_inconsistent() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_corpus(&dir, "a.txt", &[(A, 9), (B, 3)]);
        let opts = BuildOptions {
            number_of_passwords: Some(5),
            ..BuildOptions::default()
        };
        assert!(matches!(
            build_filter(&[&path], &opts),
            Err(PwnedBloomError::InconsistentBuild {
                expected: 5,
                actual: 2,
                ..
            })
        ));
    }

    #[test]
    fn test_build_with_no_qualifying_records_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_corpus(&dir, "a.txt", &[(A, 1)]);
        let opts = BuildOptions {
            corpus: CorpusOptions::with_minimum_prevalence(5),
            ..BuildOptions::default()
        };
        assert!(matches!(
            build_filter(&[&path], &opts),
            Err(PwnedBloomError::InvalidItemCount { .. })
        ));
    }

    #[test]
    fn test_options_json() {
        let opts: BuildOptions =
            serde_json::from_str(r#"{"expected_error_rate": 0.01, "corpus": {"separator": " "}}"#)
                .unwrap();
        assert_eq!(opts.expected_error_rate, 0.01);
        assert_eq!(opts.corpus.separator, ' ');
        assert_eq!(opts.corpus.minimum_prevalence, 1);
        assert_eq!(opts.number_of_passwords, None);
    }
}
