//! Checking a built filter against the corpora it was built from.
//!
//! Every record is looked up and tallied by outcome and by whether its
//! prevalence meets the threshold:
//!
//! ```text
//!                    in filter        not in filter
//! ≥ threshold   hits_above        misses_above   ← must be 0
//! < threshold   hits_below        misses_below
//!                   ↑
//!          false positives, at most 2 × expected
//! ```
//!
//! A failed check is a [`VerificationReport`] outcome, not an error.

#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

use super::{for_each_record, open, CorpusOptions};
use crate::core::filter::BloomFilter;
use crate::error::{PwnedBloomError, Result};
use serde::Serialize;
use std::fmt;
use std::io::BufRead;
use std::iter::Sum;
use std::ops::{Add, AddAssign, ControlFlow};
use std::path::Path;
use tracing::{info, info_span, warn};

/// Lookup tallies split by threshold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct VerificationResult {
    /// Records at or above the threshold found in the filter.
    pub hits_above_threshold: u64,
    /// Records below the threshold found in the filter.
    pub hits_below_threshold: u64,
    /// Records at or above the threshold missing from the filter.
    pub misses_above_threshold: u64,
    /// Records below the threshold missing from the filter.
    pub misses_below_threshold: u64,
}

impl VerificationResult {
    /// All counters zero.
    pub const EMPTY: Self = Self {
        hits_above_threshold: 0,
        hits_below_threshold: 0,
        misses_above_threshold: 0,
        misses_below_threshold: 0,
    };

    /// Records at or above the threshold.
    #[must_use]
    pub const fn passwords_above_threshold(&self) -> u64 {
        self.hits_above_threshold + self.misses_above_threshold
    }

    /// Records below the threshold.
    #[must_use]
    pub const fn passwords_below_threshold(&self) -> u64 {
        self.hits_below_threshold + self.misses_below_threshold
    }

    /// Tally one lookup.
    pub fn record(&mut self, above_threshold: bool, found: bool) {
        let counter = match (above_threshold, found) {
            (true, true) => &mut self.hits_above_threshold,
            (true, false) => &mut self.misses_above_threshold,
            (false, true) => &mut self.hits_below_threshold,
            (false, false) => &mut self.misses_below_threshold,
        };
        *counter += 1;
    }
}

impl Add for VerificationResult {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            hits_above_threshold: self.hits_above_threshold + other.hits_above_threshold,
            hits_below_threshold: self.hits_below_threshold + other.hits_below_threshold,
            misses_above_threshold: self.misses_above_threshold + other.misses_above_threshold,
            misses_below_threshold: self.misses_below_threshold + other.misses_below_threshold,
        }
    }
}

impl AddAssign for VerificationResult {
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

impl Sum for VerificationResult {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::EMPTY, Add::add)
    }
}

impl fmt::Display for VerificationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Above threshold: {} hits, {} misses. Below threshold: {} hits, {} misses",
            self.hits_above_threshold,
            self.misses_above_threshold,
            self.hits_below_threshold,
            self.misses_below_threshold
        )
    }
}

/// A check the filter did not pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VerificationFailure {
    /// Records at or above the threshold were not found.
    FalseNegatives {
        /// Records not found.
        missed: u64,
        /// Records checked.
        total: u64,
    },
    /// Too many records below the threshold were found.
    ExcessFalsePositives {
        /// Records below the threshold checked.
        below_threshold: u64,
        /// Configured error rate.
        expected_error_rate: f32,
        /// Expected false positives at that rate.
        expected: u64,
        /// False positives observed.
        actual: u64,
        /// Observed error rate.
        actual_error_rate: f64,
    },
}

impl fmt::Display for VerificationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FalseNegatives { missed, total } => write!(
                f,
                "The filter did not contain all the expected passwords. {missed}/{total} failed"
            ),
            Self::ExcessFalsePositives {
                below_threshold,
                expected_error_rate,
                expected,
                actual,
                actual_error_rate,
            } => write!(
                f,
                "The filter generated an unexpected number of false positives. For {below_threshold} \
                 passwords below threshold, with expected error rate of {expected_error_rate}, \
                 expected at most {expected} false positives. Actually had {actual} false positives \
                 ({actual_error_rate} error rate)"
            ),
        }
    }
}

/// Outcome of checking a filter against its corpora.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerificationReport {
    /// Combined tallies across all sources.
    pub totals: VerificationResult,
    /// Error rate the filter was checked against.
    pub expected_error_rate: f32,
    /// Expected false positives below the threshold.
    pub expected_false_positives: u64,
    /// Observed rate below the threshold, to two significant digits.
    /// `None` when no records fell below the threshold.
    pub achieved_error_rate: Option<f64>,
    /// Failed checks; empty when the filter is valid.
    pub failures: Vec<VerificationFailure>,
}

impl VerificationReport {
    /// Judge `totals` against `expected_error_rate`.
    ///
    /// Fails on any miss at or above the threshold, and on more than twice
    /// the expected false positives below it.
    ///
    /// ```
    /// use pwnedbloom::corpus::{VerificationReport, VerificationResult};
    ///
    /// let totals = VerificationResult {
    ///     hits_above_threshold: 100,
    ///     hits_below_threshold: 3,
    ///     misses_above_threshold: 0,
    ///     misses_below_threshold: 997,
    /// };
    /// let report = VerificationReport::evaluate(totals, 0.002);
    /// assert!(report.is_valid());
    /// let rate = report.achieved_error_rate.unwrap();
    /// assert!((rate - 0.003).abs() < 1e-12);
    /// ```
    #[must_use]
    pub fn evaluate(totals: VerificationResult, expected_error_rate: f32) -> Self {
        let mut failures = Vec::new();
        if totals.misses_above_threshold != 0 {
            failures.push(VerificationFailure::FalseNegatives {
                missed: totals.misses_above_threshold,
                total: totals.passwords_above_threshold(),
            });
        }

        let below = totals.passwords_below_threshold();
        let expected = (below as f64 * f64::from(expected_error_rate)) as u64;
        let actual_rate = if below > 0 {
            Some(totals.hits_below_threshold as f64 / below as f64)
        } else {
            None
        };
        if totals.hits_below_threshold > expected.saturating_mul(2) {
            failures.push(VerificationFailure::ExcessFalsePositives {
                below_threshold: below,
                expected_error_rate,
                expected,
                actual: totals.hits_below_threshold,
                actual_error_rate: actual_rate.unwrap_or_default(),
            });
        }

        Self {
            totals,
            expected_error_rate,
            expected_false_positives: expected,
            achieved_error_rate: actual_rate.map(|r| round_to_significant_digits(r, 2)),
            failures,
        }
    }

    /// `true` if every check passed.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.failures.is_empty()
    }
}

impl fmt::Display for VerificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.totals)?;
        for failure in &self.failures {
            write!(f, "\nERROR: {failure}")?;
        }
        if self.is_valid() {
            if let Some(rate) = self.achieved_error_rate {
                write!(f, "\nAchieved error rate of {rate}")?;
            }
        }
        Ok(())
    }
}

/// Round `value` to `digits` significant digits, ties to even.
///
/// ```
/// use pwnedbloom::corpus::round_to_significant_digits;
///
/// assert_eq!(round_to_significant_digits(0.0, 2), 0.0);
/// assert!((round_to_significant_digits(0.0012345, 2) - 0.0012).abs() < 1e-12);
/// assert!((round_to_significant_digits(98765.0, 2) - 99000.0).abs() < 1e-6);
/// ```
#[must_use]
pub fn round_to_significant_digits(value: f64, digits: u32) -> f64 {
    if value == 0.0 || !value.is_finite() {
        return value;
    }
    let scale = 10f64.powf(value.abs().log10().floor() + 1.0);
    let factor = 10f64.powi(digits as i32);
    scale * ((value / scale) * factor).round_ties_even() / factor
}

/// Look up every record of a corpus in `filter`.
///
/// Unlike the build passes, this reads to the end of input: records below
/// the threshold are the false-positive sample.
///
/// # Errors
///
/// Invalid options, I/O errors, or a malformed line or digest.
pub fn check_corpus<R, F>(reader: R, filter: &F, options: &CorpusOptions) -> Result<VerificationResult>
where
    R: BufRead,
    F: BloomFilter,
{
    options.validate()?;
    let mut result = VerificationResult::EMPTY;
    for_each_record(reader, options.separator, |record| {
        let found = filter.contains(&record.parse_digest()?);
        result.record(options.qualifies(&record), found);
        Ok(ControlFlow::Continue(()))
    })?;
    Ok(result)
}

/// [`check_corpus`] over the file at `path`.
///
/// # Errors
///
/// As [`check_corpus`], with the path in I/O messages.
pub fn check_corpus_file<F: BloomFilter>(
    path: &Path,
    filter: &F,
    options: &CorpusOptions,
) -> Result<VerificationResult> {
    let _span = info_span!("verify", source = %path.display()).entered();
    info!("Checking corpus against filter");
    let result = check_corpus(open(path)?, filter, options)?;
    info!(%result, "Checked corpus");
    Ok(result)
}

/// Check `filter` against every source and judge the combined tallies.
///
/// # Errors
///
/// [`PwnedBloomError::FalsePositiveRateOutOfBounds`] if `expected_error_rate`
/// is not in (0, 1), invalid options, or failures to read the sources. A
/// filter that fails its checks yields `Ok` with a report whose
/// [`is_valid`](VerificationReport::is_valid) is `false`.
pub fn verify_sources<P, F>(
    filter: &F,
    sources: &[P],
    options: &CorpusOptions,
    expected_error_rate: f32,
) -> Result<VerificationReport>
where
    P: AsRef<Path>,
    F: BloomFilter,
{
    if !(expected_error_rate > 0.0 && expected_error_rate < 1.0) {
        return Err(PwnedBloomError::fp_rate_out_of_bounds(expected_error_rate));
    }
    options.validate()?;

    let totals = sources
        .iter()
        .map(|source| check_corpus_file(source.as_ref(), filter, options))
        .sum::<Result<VerificationResult>>()?;

    let report = VerificationReport::evaluate(totals, expected_error_rate);
    for failure in &report.failures {
        warn!(%failure, "Verification failed");
    }
    if let Some(rate) = report.achieved_error_rate {
        info!(achieved_error_rate = rate, "Verification finished");
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ShardedBloomFilter;

    fn totals(ha: u64, hb: u64, ma: u64, mb: u64) -> VerificationResult {
        VerificationResult {
            hits_above_threshold: ha,
            hits_below_threshold: hb,
            misses_above_threshold: ma,
            misses_below_threshold: mb,
        }
    }

    #[test]
    fn test_result_arithmetic() {
        let a = totals(1, 2, 3, 4);
        let b = totals(10, 20, 30, 40);
        assert_eq!(a + b, totals(11, 22, 33, 44));

        let mut c = a;
        c += b;
        assert_eq!(c, a + b);

        let sum: VerificationResult = [a, b, a].into_iter().sum();
        assert_eq!(sum, totals(12, 24, 36, 48));
        assert_eq!(sum.passwords_above_threshold(), 48);
        assert_eq!(sum.passwords_below_threshold(), 72);
    }

    #[test]
    fn test_record_buckets() {
        let mut r = VerificationResult::EMPTY;
        r.record(true, true);
        r.record(true, false);
        r.record(false, true);
        r.record(false, false);
        r.record(false, false);
        assert_eq!(r, totals(1, 1, 1, 2));
    }

    #[test]
    fn test_any_false_negative_fails() {
        let report = VerificationReport::evaluate(totals(99, 0, 1, 0), 0.001);
        assert!(!report.is_valid());
        assert!(matches!(
            report.failures[0],
            VerificationFailure::FalseNegatives { missed: 1, total: 100 }
        ));
        assert!(report.to_string().contains("1/100 failed"));
    }

    #[test]
    fn test_false_positive_margin() {
        // 10_000 below threshold at 0.001: expected 10, limit 20
        assert!(VerificationReport::evaluate(totals(5, 20, 0, 9_980), 0.001).is_valid());
        let report = VerificationReport::evaluate(totals(5, 21, 0, 9_979), 0.001);
        assert!(!report.is_valid());
        assert_eq!(report.expected_false_positives, 10);
    }

    #[test]
    fn test_no_records_below_threshold() {
        let report = VerificationReport::evaluate(totals(5, 0, 0, 0), 0.001);
        assert!(report.is_valid());
        assert_eq!(report.achieved_error_rate, None);
    }

    #[test]
    fn test_report_serializes() {
        let report = VerificationReport::evaluate(totals(1, 0, 1, 0), 0.01);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["failures"][0]["kind"], "false_negatives");
        assert_eq!(json["totals"]["misses_above_threshold"], 1);
    }

    #[test]
    fn test_round_to_significant_digits() {
        assert_eq!(round_to_significant_digits(0.0, 2), 0.0);
        assert!((round_to_significant_digits(0.00104, 2) - 0.001).abs() < 1e-15);
        assert!((round_to_significant_digits(0.123, 2) - 0.12).abs() < 1e-15);
        assert!((round_to_significant_digits(-0.456, 2) + 0.46).abs() < 1e-15);
    }

    #[test]
    fn test_verify_sources_rejects_rate_out_of_bounds() {
        let filter = ShardedBloomFilter::new(10, 0.01).unwrap();
        let no_sources: [&Path; 0] = [];
        for rate in [0.0, -0.5, 1.0, 2.0, f32::NAN] {
            let err = verify_sources(&filter, &no_sources, &CorpusOptions::default(), rate)
                .unwrap_err();
            assert!(
                matches!(err, PwnedBloomError::FalsePositiveRateOutOfBounds { .. }),
                "rate {rate}: {err:?}"
            );
            assert!(err.is_configuration_error());
        }
    }

    #[test]
    fn test_check_corpus_counts_all_lines() {
        let a = "7C4A8D09CA3762AF61E59520943DC26494F8941B";
        let b = "F7C3BC1D808E04732ADF679965CCC34CA7AE3441";
        let mut filter = ShardedBloomFilter::new(100, 0.0001).unwrap();
        filter.add_hex(a).unwrap();

        let text = format!("{a}:10\n{b}:1\n");
        let result = check_corpus(
            text.as_bytes(),
            &filter,
            &CorpusOptions::with_minimum_prevalence(5),
        )
        .unwrap();
        assert_eq!(result, totals(1, 0, 0, 1));
    }
}
