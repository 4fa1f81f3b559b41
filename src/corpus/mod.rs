//! Streaming readers for breach corpora.
//!
//! A corpus is UTF-8 text with one record per line:
//!
//! ```text
//! 7C4A8D09CA3762AF61E59520943DC26494F8941B:24230577
//! F7C3BC1D808E04732ADF679965CCC34CA7AE3441:7016669
//! B1B3773A05C0ED0176787A4F1574FF0075F7521E:3645804
//! ```
//!
//! Each line is `<digest><separator><prevalence>`, sorted by descending
//! prevalence. Both passes read one line at a time, so memory use does not
//! depend on corpus size, and both stop at the first record whose prevalence
//! is below the threshold: the sort order guarantees no later record qualifies.
//!
//! # Module Structure
//!
//! ```text
//! corpus/
//! ├── mod.rs     - Options, record parsing, count and load passes
//! ├── build.rs   - Count → plan → load pipeline across several sources
//! └── verify.rs  - Re-checks a built filter against its sources
//! ```

pub mod build;
pub mod verify;

pub use build::{build_filter, BuildOptions};
pub use verify::{
    check_corpus, check_corpus_file, round_to_significant_digits, verify_sources,
    VerificationFailure, VerificationReport, VerificationResult,
};

use crate::core::filter::BloomFilter;
use crate::error::{PwnedBloomError, Result};
use crate::hash::Digest;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::ops::ControlFlow;
use std::path::Path;
use tracing::{debug, info, info_span};

/// Separator between digest and prevalence when none is configured.
pub const DEFAULT_SEPARATOR: char = ':';

/// UTF-8 byte order mark, skipped at the start of a corpus.
const BYTE_ORDER_MARK: char = '\u{FEFF}';

/// Records between progress messages during a load pass.
pub const PROGRESS_INTERVAL: u64 = 100_000;

/// How corpus lines are split and filtered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusOptions {
    /// Records with a lower prevalence are excluded. At least 1.
    pub minimum_prevalence: i64,
    /// Character between digest and prevalence.
    pub separator: char,
}

impl Default for CorpusOptions {
    fn default() -> Self {
        Self {
            minimum_prevalence: 1,
            separator: DEFAULT_SEPARATOR,
        }
    }
}

impl CorpusOptions {
    /// Options with the given threshold and the default separator.
    #[must_use]
    pub fn with_minimum_prevalence(minimum_prevalence: i64) -> Self {
        Self {
            minimum_prevalence,
            ..Self::default()
        }
    }

    /// Reject a threshold below 1.
    ///
    /// # Errors
    ///
    /// [`PwnedBloomError::InvalidPrevalence`].
    pub fn validate(&self) -> Result<()> {
        if self.minimum_prevalence < 1 {
            return Err(PwnedBloomError::invalid_prevalence(self.minimum_prevalence));
        }
        Ok(())
    }

    /// `true` if `record` meets the threshold.
    #[must_use]
    #[inline]
    pub fn qualifies(&self, record: &CorpusRecord<'_>) -> bool {
        record.prevalence >= self.minimum_prevalence
    }
}

/// One parsed corpus line, borrowing from the line buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorpusRecord<'a> {
    /// Everything before the last separator. Not yet validated as a digest.
    pub digest: &'a str,
    /// Occurrence count.
    pub prevalence: i64,
}

impl<'a> CorpusRecord<'a> {
    /// Validate the digest field.
    ///
    /// # Errors
    ///
    /// [`PwnedBloomError::InvalidDigest`].
    pub fn parse_digest(&self) -> Result<Digest<'a>> {
        Digest::parse(self.digest)
    }
}

/// Split `line` at its last `separator` and parse the prevalence.
///
/// ```
/// use pwnedbloom::corpus::parse_record;
///
/// let r = parse_record("5BAA61E4C9B93F3F0682250B6CF8331B7EE68FD8:9545824", ':').unwrap();
/// assert_eq!(r.digest, "5BAA61E4C9B93F3F0682250B6CF8331B7EE68FD8");
/// assert_eq!(r.prevalence, 9_545_824);
///
/// assert!(parse_record("no separator here", ':').is_err());
/// assert!(parse_record("ABC:lots", ':').is_err());
/// ```
///
/// # Errors
///
/// [`PwnedBloomError::InvalidFileFormat`] if there is no separator or the
/// prevalence is not an integer.
pub fn parse_record(line: &str, separator: char) -> Result<CorpusRecord<'_>> {
    let Some(at) = line.rfind(separator) else {
        return Err(PwnedBloomError::invalid_file_format(format!(
            "expected <digest>{separator}<prevalence>, found <{line}>"
        )));
    };
    let number = &line[at + separator.len_utf8()..];
    let prevalence = number.trim().parse::<i64>().map_err(|_| {
        PwnedBloomError::invalid_file_format(format!(
            "prevalence <{number}> is not a valid integer: line <{line}>"
        ))
    })?;

    Ok(CorpusRecord {
        digest: &line[..at],
        prevalence,
    })
}

/// Feed each parsed record to `visit` until it breaks or input ends.
///
/// Returns the number of lines read. Format errors carry the line number.
/// A byte order mark before the first record is ignored.
fn for_each_record<R, F>(mut reader: R, separator: char, mut visit: F) -> Result<u64>
where
    R: BufRead,
    F: FnMut(CorpusRecord<'_>) -> Result<ControlFlow<()>>,
{
    let mut line = String::new();
    let mut line_no = 0u64;
    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            return Ok(line_no);
        }
        line_no += 1;
        let mut text = line.trim_end_matches(['\n', '\r']);
        if line_no == 1 {
            text = text.strip_prefix(BYTE_ORDER_MARK).unwrap_or(text);
        }
        let record = parse_record(text, separator).map_err(|e| match e {
            PwnedBloomError::InvalidFileFormat { message } => {
                PwnedBloomError::invalid_file_format(format!("line {line_no}: {message}"))
            }
            other => other,
        })?;
        if visit(record)?.is_break() {
            return Ok(line_no);
        }
    }
}

/// Count the leading records that meet the threshold.
///
/// Stops at the first record below the threshold.
///
/// # Errors
///
/// Invalid options, I/O errors, or [`PwnedBloomError::InvalidFileFormat`] for a malformed line.
pub fn count_qualifying<R: BufRead>(reader: R, options: &CorpusOptions) -> Result<u64> {
    options.validate()?;
    let mut count = 0u64;
    for_each_record(reader, options.separator, |record| {
        if !options.qualifies(&record) {
            info!(
                prevalence = record.prevalence,
                minimum = options.minimum_prevalence,
                passwords = count,
                "Found password below minimum prevalence"
            );
            return Ok(ControlFlow::Break(()));
        }
        count += 1;
        Ok(ControlFlow::Continue(()))
    })?;
    debug!(passwords = count, "Count pass finished");
    Ok(count)
}

/// [`count_qualifying`] over the file at `path`.
///
/// # Errors
///
/// As [`count_qualifying`], with the path in I/O messages.
pub fn count_qualifying_file(path: &Path, options: &CorpusOptions) -> Result<u64> {
    let _span = info_span!("count", source = %path.display()).entered();
    info!("Counting lines in corpus");
    let count = count_qualifying(open(path)?, options)?;
    info!(passwords = count, "Counted qualifying passwords");
    Ok(count)
}

/// Insert the leading records that meet the threshold into `filter`.
///
/// The threshold is checked before inserting, so the first disqualifying
/// record is never inserted. Returns the number of insertions.
///
/// # Errors
///
/// Invalid options, I/O errors, [`PwnedBloomError::InvalidFileFormat`] for a
/// malformed line, or [`PwnedBloomError::InvalidDigest`] for a qualifying
/// record whose digest is not 40 hex characters.
pub fn load_qualifying<R, F>(reader: R, filter: &mut F, options: &CorpusOptions) -> Result<u64>
where
    R: BufRead,
    F: BloomFilter,
{
    options.validate()?;
    let mut loaded = 0u64;
    for_each_record(reader, options.separator, |record| {
        if !options.qualifies(&record) {
            info!(
                prevalence = record.prevalence,
                minimum = options.minimum_prevalence,
                passwords = loaded,
                "Found password below minimum prevalence"
            );
            return Ok(ControlFlow::Break(()));
        }
        filter.insert(&record.parse_digest()?);
        loaded += 1;
        if loaded % PROGRESS_INTERVAL == 0 {
            info!(passwords = loaded, "Loading passwords");
        }
        Ok(ControlFlow::Continue(()))
    })?;
    Ok(loaded)
}

/// [`load_qualifying`] from the file at `path`.
///
/// # Errors
///
/// As [`load_qualifying`], with the path in I/O messages.
pub fn load_qualifying_file<F>(path: &Path, filter: &mut F, options: &CorpusOptions) -> Result<u64>
where
    F: BloomFilter,
{
    let _span = info_span!("load", source = %path.display()).entered();
    info!("Reading passwords from corpus");
    let loaded = load_qualifying(open(path)?, filter, options)?;
    info!(passwords = loaded, "Loaded passwords");
    Ok(loaded)
}

pub(crate) fn open(path: &Path) -> Result<BufReader<File>> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|e| PwnedBloomError::io_with_context(&e, path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ShardedBloomFilter;

    const A: &str = "7C4A8D09CA3762AF61E59520943DC26494F8941B";
    const B: &str = "F7C3BC1D808E04732ADF679965CCC34CA7AE3441";
    const C: &str = "B1B3773A05C0ED0176787A4F1574FF0075F7521E";

    fn corpus() -> String {
        format!("{A}:30\n{B}:10\n{C}:5\n")
    }

    #[test]
    fn test_parse_uses_last_separator() {
        let r = parse_record("a:b:12", ':').unwrap();
        assert_eq!(r.digest, "a:b");
        assert_eq!(r.prevalence, 12);
    }

    #[test]
    fn test_parse_trims_prevalence() {
        let r = parse_record(&format!("{A}: 42 "), ':').unwrap();
        assert_eq!(r.prevalence, 42);
    }

    #[test]
    fn test_parse_custom_separator() {
        let r = parse_record(&format!("{A} 7"), ' ').unwrap();
        assert_eq!(r.digest, A);
        assert_eq!(r.prevalence, 7);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            parse_record(A, ':'),
            Err(PwnedBloomError::InvalidFileFormat { .. })
        ));
        assert!(matches!(
            parse_record(&format!("{A}:"), ':'),
            Err(PwnedBloomError::InvalidFileFormat { .. })
        ));
        assert!(parse_record(&format!("{A}:1.5"), ':').is_err());
    }

    #[test]
    fn test_options_validate() {
        assert!(CorpusOptions::default().validate().is_ok());
        assert_eq!(
            CorpusOptions::with_minimum_prevalence(0).validate(),
            Err(PwnedBloomError::InvalidPrevalence { value: 0 })
        );
    }

    #[test]
    fn test_options_deserialize_with_defaults() {
        let opts: CorpusOptions = serde_json::from_str(r#"{"minimum_prevalence": 3}"#).unwrap();
        assert_eq!(opts.minimum_prevalence, 3);
        assert_eq!(opts.separator, ':');
    }

    #[test]
    fn test_count_stops_at_threshold() {
        let text = corpus();
        let opts = CorpusOptions::with_minimum_prevalence(10);
        assert_eq!(count_qualifying(text.as_bytes(), &opts).unwrap(), 2);
        let all = CorpusOptions::default();
        assert_eq!(count_qualifying(text.as_bytes(), &all).unwrap(), 3);
    }

    #[test]
    fn test_count_stops_before_malformed_tail() {
        let text = format!("{A}:30\n{B}:2\ngarbage\n");
        let opts = CorpusOptions::with_minimum_prevalence(10);
        assert_eq!(count_qualifying(text.as_bytes(), &opts).unwrap(), 1);
    }

    #[test]
    fn test_count_reports_line_number() {
        let text = format!("{A}:30\ngarbage\n");
        let err = count_qualifying(text.as_bytes(), &CorpusOptions::default()).unwrap_err();
        assert!(err.to_string().contains("line 2"), "{err}");
    }

    #[test]
    fn test_crlf_lines() {
        let text = format!("{A}:30\r\n{B}:10\r\n");
        assert_eq!(
            count_qualifying(text.as_bytes(), &CorpusOptions::default()).unwrap(),
            2
        );
    }

    #[test]
    fn test_leading_byte_order_mark_is_skipped() {
        let text = format!("\u{FEFF}{A}:30\n{B}:10\n");
        let opts = CorpusOptions::default();
        assert_eq!(count_qualifying(text.as_bytes(), &opts).unwrap(), 2);

        let mut filter = ShardedBloomFilter::new(10, 0.0001).unwrap();
        assert_eq!(load_qualifying(text.as_bytes(), &mut filter, &opts).unwrap(), 2);
        assert!(filter.contains_hex(A).unwrap());
    }

    #[test]
    fn test_byte_order_mark_only_stripped_on_first_line() {
        let text = format!("{A}:30\n\u{FEFF}{B}:10\n");
        let mut filter = ShardedBloomFilter::new(10, 0.01).unwrap();
        assert!(matches!(
            load_qualifying(text.as_bytes(), &mut filter, &CorpusOptions::default()),
            Err(PwnedBloomError::InvalidDigest { .. })
        ));
    }

    #[test]
    fn test_load_does_not_insert_disqualifying_record() {
        let text = corpus();
        let mut filter = ShardedBloomFilter::new(1_000, 0.0001).unwrap();
        let opts = CorpusOptions::with_minimum_prevalence(10);
        assert_eq!(load_qualifying(text.as_bytes(), &mut filter, &opts).unwrap(), 2);
        assert!(filter.contains_hex(A).unwrap());
        assert!(filter.contains_hex(B).unwrap());
        assert!(!filter.contains_hex(C).unwrap());
    }

    #[test]
    fn test_load_rejects_bad_digest() {
        let text = "not-a-digest:100\n";
        let mut filter = ShardedBloomFilter::new(10, 0.01).unwrap();
        assert!(matches!(
            load_qualifying(text.as_bytes(), &mut filter, &CorpusOptions::default()),
            Err(PwnedBloomError::InvalidDigest { .. })
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = count_qualifying_file(Path::new("/nonexistent/pwned.txt"), &CorpusOptions::default())
            .unwrap_err();
        assert!(matches!(err, PwnedBloomError::Io { .. }));
        assert!(err.to_string().contains("pwned.txt"));
    }
}
