// Movie Income - Core Library
// Box-office ranking → normalized records → CSV/JSON/XLSX + charts

pub mod error;
pub mod config;
pub mod schema;       // Canonical fields + header aliases
pub mod source;       // Remote API / local CSV adapter
pub mod normalizer;   // Dates, years, numbers, rank order
pub mod summary;      // Yearly aggregation
pub mod data_quality; // Row warnings → quality report
pub mod export;       // CSV / JSON / XLSX
pub mod charts;       // Five PNG charts
pub mod coordinator;  // One run, end to end

// Re-export commonly used types
pub use error::{ChartRenderError, ExportError, MovieIncomeError, Result};
pub use config::RemoteConfig;
pub use schema::{ColumnMap, Field};
pub use source::{
    get_source, parse_api_payload,
    FallbackSource, LocalFileSource, RawRecord, RecordSource, RemoteSource, SourceSpec, SourceType,
};
pub use normalizer::{normalize, MovieRecord, NormalizedSet, RowWarning, WarningKind};
pub use summary::{yearly_summary, YearlySummary};
pub use data_quality::{QualityIssue, QualityReport, Severity};
pub use export::{
    CsvExport, ExportFormat, ExportKind, ExportOutcome, Exporter, JsonExport, XlsxExport,
};
pub use charts::{render_all, ChartKind, ChartOutcome};
pub use coordinator::{run, run_with_token, OutputLayout, RunOptions, RunReport, RunToken};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
