use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::error;

use movie_income::{config, run, RemoteConfig, RunOptions, RunReport, SourceSpec};

/// Fetch the box-office ranking, export CSV/JSON/XLSX and render charts
#[derive(Parser, Debug)]
#[command(name = "movie-income")]
#[command(version)]
struct Args {
    /// Local CSV to read instead of calling the remote API
    input: Option<PathBuf>,

    /// Read this CSV only if the remote fetch fails
    #[arg(long, conflicts_with = "input")]
    fallback: Option<PathBuf>,

    /// Number of ranked movies to request
    #[arg(long, default_value_t = config::DEFAULT_TOP, env = "MOVIE_INCOME_TOP")]
    top: u32,

    /// Timeout for the single remote request
    #[arg(long, default_value_t = config::DEFAULT_TIMEOUT_SECS, env = "MOVIE_INCOME_TIMEOUT_SECS")]
    timeout_secs: u64,

    #[arg(long, default_value = config::API_URL, env = "MOVIE_INCOME_API_URL")]
    api_url: String,

    /// Directory in which the timestamped output folder is created
    #[arg(short, long, default_value = ".", env = "MOVIE_INCOME_OUTPUT_ROOT")]
    output_root: PathBuf,
}

impl Args {
    fn source(&self) -> SourceSpec {
        match (&self.input, &self.fallback) {
            (Some(path), _) => SourceSpec::Local(path.clone()),
            (None, Some(path)) => SourceSpec::RemoteWithFallback(path.clone()),
            (None, None) => SourceSpec::Remote,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "movie_income=info".into()),
        )
        .init();

    let args = Args::parse();

    let options = RunOptions::new(args.source())
        .with_remote(
            RemoteConfig::default()
                .with_api_url(args.api_url.clone())
                .with_top(args.top)
                .with_timeout(Duration::from_secs(args.timeout_secs)),
        )
        .with_output_root(args.output_root.clone());

    let report = match run(&options) {
        Ok(report) => report,
        Err(e) => {
            error!("Run aborted: {}", e);
            eprintln!("❌ Could not complete the run: {}", e);
            eprintln!("   If the network is restricted, pass a local CSV: movie-income <file.csv>");
            return Err(e).context("movie-income run failed");
        }
    };

    print_summary(&report);
    Ok(())
}

fn print_summary(report: &RunReport) {
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("🎬 {} records → {}", report.record_count(), report.layout.dir.display());
    println!("🔍 {}", report.quality.summary());
    if report.quality.has_issues() {
        println!("⚠️  {} data issues, see the warn-level log for each row", report.quality.issues.len());
    }

    println!("\n✅ Exported files:");
    for outcome in &report.exports {
        match &outcome.result {
            Ok(()) => println!(" - {}: {}", outcome.kind, outcome.path.display()),
            Err(e) => println!(" - {}: ⚠️  skipped ({})", outcome.kind, e),
        }
    }

    println!("\n✅ Saved charts:");
    for outcome in &report.charts {
        match &outcome.result {
            Ok(()) => println!(" - {}", outcome.path.display()),
            Err(e) => println!(" - ⚠️  {}", e),
        }
    }
}
