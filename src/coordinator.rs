// 🎬 Run Coordinator
// token → load → normalize → output dir → export → charts

use crate::charts::{self, ChartOutcome};
use crate::config::{self, RemoteConfig};
use crate::data_quality::QualityReport;
use crate::error::{MovieIncomeError, Result};
use crate::export::{ExportOutcome, Exporter};
use crate::normalizer::{normalize, NormalizedSet};
use crate::source::{get_source, SourceSpec};
use chrono::{Local, NaiveDateTime};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

// ============================================================================
// RUN TOKEN + OUTPUT LAYOUT
// ============================================================================

/// Timestamp fixed at run start (YYYYMMDD_HHMMSS), shared by every artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunToken(String);

impl RunToken {
    pub fn now() -> Self {
        RunToken::at(Local::now().naive_local())
    }

    pub fn at(time: NaiveDateTime) -> Self {
        RunToken(time.format(config::TOKEN_FORMAT).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RunToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// `<root>/<prefix>_<token>/` holding `<prefix>_<token>.*` artifacts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    pub dir: PathBuf,
    pub stem: String,
}

impl OutputLayout {
    pub fn new(root: &Path, prefix: &str, token: &RunToken) -> Self {
        let stem = format!("{}_{}", prefix, token);
        OutputLayout {
            dir: root.join(&stem),
            stem,
        }
    }

    /// Create the run directory; an existing one (same token) is an error, never reused
    pub fn create(&self) -> Result<()> {
        let output_dir_error = |source: std::io::Error| MovieIncomeError::OutputDir {
            path: self.dir.clone(),
            source,
        };

        if let Some(root) = self.dir.parent() {
            fs::create_dir_all(root).map_err(output_dir_error)?;
        }
        fs::create_dir(&self.dir).map_err(output_dir_error)
    }
}

// ============================================================================
// RUN
// ============================================================================

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub source: SourceSpec,
    pub remote: RemoteConfig,
    pub output_root: PathBuf,
    pub prefix: String,
}

impl RunOptions {
    pub fn new(source: SourceSpec) -> Self {
        RunOptions {
            source,
            remote: RemoteConfig::default(),
            output_root: PathBuf::from("."),
            prefix: config::OUTPUT_PREFIX.to_string(),
        }
    }

    pub fn with_remote(mut self, remote: RemoteConfig) -> Self {
        self.remote = remote;
        self
    }

    pub fn with_output_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.output_root = root.into();
        self
    }
}

#[derive(Debug)]
pub struct RunReport {
    pub token: RunToken,
    pub layout: OutputLayout,
    pub data: NormalizedSet,
    pub quality: QualityReport,
    pub exports: Vec<ExportOutcome>,
    pub charts: Vec<ChartOutcome>,
}

impl RunReport {
    pub fn record_count(&self) -> usize {
        self.data.len()
    }

    /// Isolated failures (export or chart) that did not stop the run
    pub fn failure_count(&self) -> usize {
        self.exports.iter().filter(|o| !o.is_ok()).count()
            + self.charts.iter().filter(|o| !o.is_ok()).count()
    }
}

/// Full run with a token taken now
pub fn run(options: &RunOptions) -> Result<RunReport> {
    run_with_token(options, RunToken::now())
}

/// Full run with an explicit token.
///
/// Source and normalization happen before anything touches the filesystem, so a
/// fatal source error leaves no directory behind. Export and chart failures are
/// recorded in the report, never returned.
pub fn run_with_token(options: &RunOptions, token: RunToken) -> Result<RunReport> {
    info!(token = %token, source = ?options.source, "Starting run");

    // 1. Load
    let raw = get_source(&options.source, &options.remote).fetch()?;
    info!(rows = raw.len(), "Loaded raw records");

    // 2. Normalize
    let data = normalize(raw);
    let quality = QualityReport::from_set(&data);
    info!("{}", quality.summary());

    // 3. Output directory
    let layout = OutputLayout::new(&options.output_root, &options.prefix, &token);
    layout.create()?;
    info!(dir = %layout.dir.display(), "Output directory ready");

    // 4. Export
    let exports = Exporter::standard().export_all(&data.records, &layout.dir, &layout.stem);

    // 5. Charts
    let charts = charts::render_all(&data.records, &layout.dir, &layout.stem);

    let report = RunReport {
        token,
        layout,
        data,
        quality,
        exports,
        charts,
    };
    info!(
        records = report.record_count(),
        isolated_failures = report.failure_count(),
        "Run finished"
    );
    Ok(report)
}
