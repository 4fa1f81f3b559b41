//! pwnedbloom: build, verify and inspect breached-password filters
//!
//! Exit codes: 0 success, 1 validation failure or usage error, 2 any other error.

use clap::{Parser, Subcommand};
use pwnedbloom::core::params::DEFAULT_ERROR_RATE;
use pwnedbloom::corpus::{self, BuildOptions, CorpusOptions, VerificationReport};
use pwnedbloom::serde_support::binary;
use pwnedbloom::{FilterInfo, FormatVersion, PwnedBloomError, ShardedBloomFilter};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, EnvFilter};

const EXIT_VALIDATION: u8 = 1;
const EXIT_ERROR: u8 = 2;

/// Sharded Bloom filters for breached-password corpora
#[derive(Parser, Debug)]
#[command(name = "pwnedbloom", version, about = "Generate and verify breached-password Bloom filters")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a filter file from corpus files sorted by prevalence
    Create {
        /// Path to write the filter to
        output: PathBuf,

        /// Corpus files, each sorted by descending prevalence
        #[arg(required = true)]
        sources: Vec<PathBuf>,

        /// Target false positive rate
        #[arg(short = 'e', long, default_value_t = DEFAULT_ERROR_RATE)]
        expected_error_rate: f32,

        /// Skip passwords seen fewer times than this
        #[arg(short = 'p', long, default_value_t = 1)]
        minimum_prevalence: i64,

        /// Known number of qualifying passwords; skips the count pass (single source only)
        #[arg(short = 'n', long)]
        number_of_passwords: Option<u64>,

        /// Separator between digest and prevalence
        #[arg(short = 's', long, default_value_t = corpus::DEFAULT_SEPARATOR)]
        separator: char,

        /// Write the untagged version 1 layout
        #[arg(long)]
        legacy_format: bool,

        /// Re-read the sources after saving and check the filter
        #[arg(long)]
        verify: bool,
    },

    /// Check a filter file against the corpus files it was built from
    Verify {
        /// Filter file to check
        filter: PathBuf,

        /// Corpus files used to build the filter
        #[arg(required = true)]
        sources: Vec<PathBuf>,

        /// Error rate the filter was built with
        #[arg(short = 'e', long, default_value_t = DEFAULT_ERROR_RATE)]
        expected_error_rate: f32,

        /// Threshold the filter was built with
        #[arg(short = 'p', long, default_value_t = 1)]
        minimum_prevalence: i64,

        /// Separator between digest and prevalence
        #[arg(short = 's', long, default_value_t = corpus::DEFAULT_SEPARATOR)]
        separator: char,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the parameters of a filter file
    Info {
        /// Filter file to inspect
        filter: PathBuf,

        /// Print as JSON
        #[arg(long)]
        json: bool,

        /// Load the whole filter and include per-shard fill statistics
        #[arg(long)]
        shards: bool,
    },
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::from(EXIT_VALIDATION)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    let filter = EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .from_env_lossy();
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(cli.command) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(EXIT_VALIDATION),
        Err(e) if e.is_configuration_error() => {
            error!("{}", e);
            ExitCode::from(EXIT_VALIDATION)
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

/// Run one subcommand. `Ok(false)` means a verification failed.
fn run(command: Commands) -> pwnedbloom::Result<bool> {
    match command {
        Commands::Create {
            output,
            sources,
            expected_error_rate,
            minimum_prevalence,
            number_of_passwords,
            separator,
            legacy_format,
            verify,
        } => {
            let options = BuildOptions {
                corpus: CorpusOptions {
                    minimum_prevalence,
                    separator,
                },
                expected_error_rate,
                number_of_passwords,
            };
            let version = if legacy_format {
                FormatVersion::Legacy
            } else {
                FormatVersion::CURRENT
            };
            create(&output, &sources, &options, version, verify)
        }
        Commands::Verify {
            filter,
            sources,
            expected_error_rate,
            minimum_prevalence,
            separator,
            json,
        } => {
            let options = CorpusOptions {
                minimum_prevalence,
                separator,
            };
            info!(path = %filter.display(), "Loading filter");
            let loaded = ShardedBloomFilter::load(&filter)?;
            info!("Filter loaded successfully, verifying passwords");
            verify(&loaded, &sources, &options, expected_error_rate, json)
        }
        Commands::Info {
            filter,
            json,
            shards,
        } => {
            show_info(&filter, json, shards)?;
            Ok(true)
        }
    }
}

fn create(
    output: &Path,
    sources: &[PathBuf],
    options: &BuildOptions,
    version: FormatVersion,
    verify_after: bool,
) -> pwnedbloom::Result<bool> {
    let started = Instant::now();
    let filter = corpus::build_filter(sources, options)?;
    info!(path = %output.display(), "Writing filter");
    binary::save(&filter, output, version)?;
    info!(duration = ?started.elapsed(), "Filter saved");

    if verify_after {
        return verify(
            &filter,
            sources,
            &options.corpus,
            options.expected_error_rate,
            false,
        );
    }
    Ok(true)
}

fn verify(
    filter: &ShardedBloomFilter,
    sources: &[PathBuf],
    options: &CorpusOptions,
    expected_error_rate: f32,
    json: bool,
) -> pwnedbloom::Result<bool> {
    let report = corpus::verify_sources(filter, sources, options, expected_error_rate)?;
    print_report(&report, json)?;
    Ok(report.is_valid())
}

fn print_report(report: &VerificationReport, json: bool) -> pwnedbloom::Result<()> {
    if json {
        println!("{}", to_json(report)?);
    } else {
        println!("{report}");
    }
    Ok(())
}

#[derive(Serialize)]
struct DetailedInfo<'a> {
    #[serde(flatten)]
    info: &'a FilterInfo,
    fill_ratio: f64,
    shards: Vec<pwnedbloom::ShardStats>,
}

fn show_info(path: &Path, json: bool, with_shards: bool) -> pwnedbloom::Result<()> {
    if !with_shards {
        let info = binary::inspect(path)?;
        if json {
            println!("{}", to_json(&info)?);
        } else {
            println!("{info}");
        }
        return Ok(());
    }

    let info = binary::inspect(path)?;
    let filter = ShardedBloomFilter::load(path)?;
    let detailed = DetailedInfo {
        info: &info,
        fill_ratio: filter.fill_ratio(),
        shards: filter.shard_stats(),
    };
    if json {
        println!("{}", to_json(&detailed)?);
    } else {
        println!("{info}");
        println!("Fill ratio:           {:.4}", detailed.fill_ratio);
        for stat in &detailed.shards {
            println!(
                "  shard {:>3}: {:>12} / {:>12} bits set ({:.4})",
                stat.shard_id, stat.ones, stat.bits, stat.fill_ratio
            );
        }
    }
    Ok(())
}

fn to_json<T: Serialize>(value: &T) -> pwnedbloom::Result<String> {
    serde_json::to_string_pretty(value).map_err(|e| PwnedBloomError::internal_error(e.to_string()))
}
