//! Command-line behavior and exit codes of the `pwnedbloom` binary

use pwnedbloom::sha1_hex;
use std::ffi::OsStr;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

const SUCCESS: i32 = 0;
const VALIDATION_FAILURE: i32 = 1;
const ERROR: i32 = 2;

fn pwnedbloom<I, S>(args: I) -> Output
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    Command::new(env!("CARGO_BIN_EXE_pwnedbloom"))
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .unwrap()
}

fn exit_code(output: &Output) -> i32 {
    output.status.code().unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

/// `count` records with descending prevalence.
fn write_corpus(dir: &TempDir, name: &str, count: usize) -> PathBuf {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    for i in 0..count {
        writeln!(file, "{}:{}", sha1_hex(&format!("{name}-{i}")), 1_000 - i).unwrap();
    }
    path
}

fn create(dir: &TempDir, sources: &[&Path]) -> PathBuf {
    let out = dir.path().join("pwned.bloom");
    let mut args = vec![OsStr::new("create"), out.as_os_str()];
    args.extend(sources.iter().map(|s| s.as_os_str()));
    let output = pwnedbloom(&args);
    assert_eq!(exit_code(&output), SUCCESS, "{output:?}");
    out
}

#[test]
fn test_create_and_verify_succeed() {
    let dir = TempDir::new().unwrap();
    let corpus = write_corpus(&dir, "a.txt", 100);
    let filter = create(&dir, &[&corpus]);
    assert!(filter.exists());

    let output = pwnedbloom([OsStr::new("verify"), filter.as_os_str(), corpus.as_os_str()]);
    assert_eq!(exit_code(&output), SUCCESS, "{output:?}");
    assert!(stdout(&output).contains("Above threshold: 100 hits, 0 misses"));
}

#[test]
fn test_create_with_verify_flag() {
    let dir = TempDir::new().unwrap();
    let corpus = write_corpus(&dir, "a.txt", 50);
    let out = dir.path().join("checked.bloom");

    let output = pwnedbloom([
        OsStr::new("create"),
        out.as_os_str(),
        corpus.as_os_str(),
        OsStr::new("--verify"),
        OsStr::new("-e"),
        OsStr::new("0.01"),
    ]);
    assert_eq!(exit_code(&output), SUCCESS, "{output:?}");
    assert!(out.exists());
}

#[test]
fn test_verify_against_other_corpus_fails() {
    let dir = TempDir::new().unwrap();
    let built_from = write_corpus(&dir, "a.txt", 1);
    let other = write_corpus(&dir, "b.txt", 1);
    let filter = create(&dir, &[&built_from]);

    let output = pwnedbloom([OsStr::new("verify"), filter.as_os_str(), other.as_os_str()]);
    assert_eq!(exit_code(&output), VALIDATION_FAILURE, "{output:?}");
    let report = stdout(&output);
    assert!(report.contains("ERROR"), "{report}");
    assert!(report.contains("1/1 failed"), "{report}");
}

#[test]
fn test_verify_json_report() {
    let dir = TempDir::new().unwrap();
    let corpus = write_corpus(&dir, "a.txt", 20);
    let filter = create(&dir, &[&corpus]);

    let output = pwnedbloom([
        OsStr::new("verify"),
        filter.as_os_str(),
        corpus.as_os_str(),
        OsStr::new("--json"),
    ]);
    assert_eq!(exit_code(&output), SUCCESS, "{output:?}");
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["totals"]["hits_above_threshold"], 20);
    assert_eq!(report["failures"].as_array().map(Vec::len), Some(0));
}

#[test]
fn test_known_count_with_several_sources_is_rejected() {
    let dir = TempDir::new().unwrap();
    let a = write_corpus(&dir, "a.txt", 1);
    let b = write_corpus(&dir, "b.txt", 1);
    let out = dir.path().join("out.bloom");

    let output = pwnedbloom([
        OsStr::new("create"),
        out.as_os_str(),
        a.as_os_str(),
        b.as_os_str(),
        OsStr::new("-n"),
        OsStr::new("2"),
    ]);
    assert_eq!(exit_code(&output), VALIDATION_FAILURE, "{output:?}");
    assert!(!out.exists());
}

#[test]
fn test_configuration_errors_exit_with_validation_failure() {
    let dir = TempDir::new().unwrap();
    let corpus = write_corpus(&dir, "a.txt", 10);
    let out = dir.path().join("out.bloom");

    for args in [["-e", "0"], ["-e", "1.5"], ["-p", "0"]] {
        let output = pwnedbloom(
            [OsStr::new("create"), out.as_os_str(), corpus.as_os_str()]
                .into_iter()
                .chain(args.iter().map(OsStr::new)),
        );
        assert_eq!(exit_code(&output), VALIDATION_FAILURE, "{args:?}: {output:?}");
    }

    let filter = create(&dir, &[&corpus]);
    for rate in ["0", "2"] {
        let output = pwnedbloom([
            OsStr::new("verify"),
            filter.as_os_str(),
            corpus.as_os_str(),
            OsStr::new("-e"),
            OsStr::new(rate),
        ]);
        assert_eq!(exit_code(&output), VALIDATION_FAILURE, "rate {rate}: {output:?}");
        assert!(String::from_utf8_lossy(&output.stderr).contains("out of bounds"));
    }
}

#[test]
fn test_usage_errors() {
    assert_eq!(exit_code(&pwnedbloom(["create"])), VALIDATION_FAILURE);
    assert_eq!(exit_code(&pwnedbloom(["frobnicate"])), VALIDATION_FAILURE);
    assert_eq!(
        exit_code(&pwnedbloom(["verify", "filter.bloom", "a.txt", "-e", "lots"])),
        VALIDATION_FAILURE
    );
    assert_eq!(exit_code(&pwnedbloom(["--help"])), SUCCESS);
    assert_eq!(exit_code(&pwnedbloom(["--version"])), SUCCESS);
}

#[test]
fn test_io_format_and_consistency_errors() {
    let dir = TempDir::new().unwrap();
    let corpus = write_corpus(&dir, "a.txt", 3);
    let out = dir.path().join("out.bloom");

    let missing = dir.path().join("missing.txt");
    let output = pwnedbloom([OsStr::new("create"), out.as_os_str(), missing.as_os_str()]);
    assert_eq!(exit_code(&output), ERROR, "{output:?}");

    let malformed = dir.path().join("bad.txt");
    std::fs::write(&malformed, "no separator here\n").unwrap();
    let output = pwnedbloom([OsStr::new("create"), out.as_os_str(), malformed.as_os_str()]);
    assert_eq!(exit_code(&output), ERROR, "{output:?}");

    let output = pwnedbloom([
        OsStr::new("create"),
        out.as_os_str(),
        corpus.as_os_str(),
        OsStr::new("-n"),
        OsStr::new("4"),
    ]);
    assert_eq!(exit_code(&output), ERROR, "{output:?}");

    let junk = dir.path().join("junk.bloom");
    std::fs::write(&junk, [1u8, 2, 3, 4]).unwrap();
    assert_eq!(exit_code(&pwnedbloom([OsStr::new("info"), junk.as_os_str()])), ERROR);
    let output = pwnedbloom([OsStr::new("verify"), junk.as_os_str(), corpus.as_os_str()]);
    assert_eq!(exit_code(&output), ERROR);
}

#[test]
fn test_info_prints_header() {
    let dir = TempDir::new().unwrap();
    let corpus = write_corpus(&dir, "a.txt", 30);
    let filter = create(&dir, &[&corpus]);
    let before = std::fs::read(&filter).unwrap();

    let output = pwnedbloom([OsStr::new("info"), filter.as_os_str()]);
    assert_eq!(exit_code(&output), SUCCESS, "{output:?}");
    let text = stdout(&output);
    assert!(text.contains("Capacity:             30"), "{text}");
    assert!(text.contains("Shards:               1"), "{text}");

    let output = pwnedbloom([OsStr::new("info"), filter.as_os_str(), OsStr::new("--json")]);
    assert_eq!(exit_code(&output), SUCCESS, "{output:?}");
    let info: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(info["capacity"], 30);
    assert_eq!(info["format_version"], 2);
    assert_eq!(info["encoded_len"], before.len() as u64);
    assert!(info.get("shards").is_none());

    let output = pwnedbloom([
        OsStr::new("info"),
        filter.as_os_str(),
        OsStr::new("--json"),
        OsStr::new("--shards"),
    ]);
    assert_eq!(exit_code(&output), SUCCESS, "{output:?}");
    let detailed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(detailed["shards"].as_array().map(Vec::len), Some(1));
    assert_eq!(detailed["capacity"], 30);

    assert_eq!(std::fs::read(&filter).unwrap(), before);
}

#[test]
fn test_info_reads_only_the_header() {
    let dir = TempDir::new().unwrap();
    let corpus = write_corpus(&dir, "a.txt", 30);
    let filter = create(&dir, &[&corpus]);

    // Scramble the shard payload; the header and length stay valid.
    let mut bytes = std::fs::read(&filter).unwrap();
    for b in &mut bytes[32..] {
        *b = 0xFF;
    }
    std::fs::write(&filter, &bytes).unwrap();
    let output = pwnedbloom([OsStr::new("info"), filter.as_os_str()]);
    assert_eq!(exit_code(&output), SUCCESS, "{output:?}");

    // A header whose implied length disagrees with the file is still rejected.
    bytes.pop();
    std::fs::write(&filter, &bytes).unwrap();
    let output = pwnedbloom([OsStr::new("info"), filter.as_os_str()]);
    assert_eq!(exit_code(&output), ERROR, "{output:?}");
}
