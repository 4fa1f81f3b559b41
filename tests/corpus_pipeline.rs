//! End-to-end: corpus files -> build -> save -> load -> verify

use pwnedbloom::corpus::{self, BuildOptions, CorpusOptions};
use pwnedbloom::{sha1_hex, PwnedBloomError, ShardedBloomFilter};
use std::io::Write;
use std::path::PathBuf;
use tempfile::TempDir;

fn write_corpus(dir: &TempDir, name: &str, lines: &[(String, i64)]) -> PathBuf {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    for (digest, prevalence) in lines {
        writeln!(file, "{digest}:{prevalence}").unwrap();
    }
    path
}

/// `count` records with descending prevalence starting at `top`.
fn sorted_corpus(prefix: &str, count: usize, top: i64) -> Vec<(String, i64)> {
    (0..count)
        .map(|i| (sha1_hex(&format!("{prefix}-{i}")), top - i as i64))
        .collect()
}

fn options(minimum_prevalence: i64, rate: f32) -> BuildOptions {
    BuildOptions {
        corpus: CorpusOptions::with_minimum_prevalence(minimum_prevalence),
        expected_error_rate: rate,
        number_of_passwords: None,
    }
}

#[test]
fn test_threshold_excludes_low_prevalence_record() {
    let dir = TempDir::new().unwrap();
    let digest = "5BAA61E4C9B93F3F0682250B6CF8331B7EE68FD8".to_string();
    let path = write_corpus(&dir, "single.txt", &[(digest.clone(), 5)]);

    // Nothing qualifies at 10, so there is nothing to plan for.
    let err = corpus::build_filter(&[&path], &options(10, 0.001)).unwrap_err();
    assert!(matches!(err, PwnedBloomError::InvalidItemCount { count: 0 }));

    let filter = corpus::build_filter(&[&path], &options(1, 0.001)).unwrap();
    assert_eq!(filter.total_capacity(), 1);
    assert!(filter.contains_hex(&digest).unwrap());
}

#[test]
fn test_build_save_load_verify() {
    let dir = TempDir::new().unwrap();
    let first = write_corpus(&dir, "a.txt", &sorted_corpus("a", 2_000, 5_000));
    let second = write_corpus(&dir, "b.txt", &sorted_corpus("b", 1_000, 3_000));
    let sources = [first, second];
    let opts = options(1, 0.001);

    let filter = corpus::build_filter(&sources, &opts).unwrap();
    assert_eq!(filter.total_capacity(), 3_000);

    let out = dir.path().join("pwned.bloom");
    filter.save(&out).unwrap();
    let loaded = ShardedBloomFilter::load(&out).unwrap();
    assert_eq!(loaded, filter);

    let report = corpus::verify_sources(&loaded, &sources, &opts.corpus, 0.001).unwrap();
    assert!(report.is_valid(), "{report}");
    assert_eq!(report.totals.hits_above_threshold, 3_000);
    assert_eq!(report.totals.misses_above_threshold, 0);
    assert_eq!(report.totals.passwords_below_threshold(), 0);
}

#[test]
fn test_verify_below_threshold_false_positives() {
    let dir = TempDir::new().unwrap();
    // 1_000 records at prevalence >= 20, then 5_000 below it.
    let mut lines = sorted_corpus("hi", 1_000, 2_000);
    lines.extend((0..5_000).map(|i| (sha1_hex(&format!("lo-{i}")), 10)));
    let path = write_corpus(&dir, "mixed.txt", &lines);
    let opts = options(20, 0.01);

    let filter = corpus::build_filter(&[&path], &opts).unwrap();
    assert_eq!(filter.total_capacity(), 1_000);

    let report = corpus::verify_sources(&filter, &[&path], &opts.corpus, 0.01).unwrap();
    assert_eq!(report.totals.passwords_above_threshold(), 1_000);
    assert_eq!(report.totals.passwords_below_threshold(), 5_000);
    assert_eq!(report.expected_false_positives, 50);
    assert!(report.is_valid(), "{report}");
    assert!(report.achieved_error_rate.is_some());
}

#[test]
fn test_verify_detects_wrong_filter() {
    let dir = TempDir::new().unwrap();
    let path = write_corpus(&dir, "a.txt", &sorted_corpus("a", 100, 1_000));
    let other = write_corpus(&dir, "b.txt", &sorted_corpus("b", 100, 1_000));
    let opts = options(1, 0.001);

    let filter = corpus::build_filter(&[&other], &opts).unwrap();
    let report = corpus::verify_sources(&filter, &[&path], &opts.corpus, 0.001).unwrap();

    assert!(!report.is_valid());
    assert!(report.totals.misses_above_threshold > 0);
    assert!(report.to_string().contains("ERROR"));
}

#[test]
fn test_known_count_mismatch_is_inconsistent() {
    let dir = TempDir::new().unwrap();
    let path = write_corpus(&dir, "a.txt", &sorted_corpus("a", 10, 100));
    let mut opts = options(1, 0.01);
    opts.number_of_passwords = Some(11);

    let err = corpus::build_filter(&[&path], &opts).unwrap_err();
    assert!(matches!(
        err,
        PwnedBloomError::InconsistentBuild {
            expected: 11,
            actual: 10,
            ..
        }
    ));

    opts.number_of_passwords = Some(10);
    let filter = corpus::build_filter(&[&path], &opts).unwrap();
    assert_eq!(filter.total_capacity(), 10);
}

#[test]
fn test_malformed_line_reports_line_number() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.txt");
    std::fs::write(
        &path,
        "5BAA61E4C9B93F3F0682250B6CF8331B7EE68FD8:10\nnot a record\n",
    )
    .unwrap();

    let err = corpus::build_filter(&[&path], &options(1, 0.01)).unwrap_err();
    match err {
        PwnedBloomError::InvalidFileFormat { message } => assert!(message.contains("line 2")),
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn test_missing_source_is_io_error() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("missing.txt");
    let err = corpus::build_filter(&[&missing], &options(1, 0.01)).unwrap_err();
    assert!(matches!(err, PwnedBloomError::Io { .. }));
}
