// 🚨 Error Taxonomy
// Fatal run errors vs. isolated export/chart failures

use std::path::PathBuf;

use crate::charts::ChartKind;
use crate::export::ExportKind;

// ============================================================================
// FATAL ERRORS (abort the run)
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum MovieIncomeError {
    /// Remote fetch failed (or local file unreadable) and nothing else to fall back on
    #[error("Data unavailable: {0}")]
    DataUnavailable(String),

    /// Local file lacks one or more required columns
    #[error("Schema mismatch in {path}: missing required columns [{}]", .missing.join(", "))]
    SchemaMismatch { path: String, missing: Vec<String> },

    #[error("Failed to create output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, MovieIncomeError>;

// ============================================================================
// ISOLATED ERRORS (logged, never abort the run)
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("{0} export is not available in this build")]
    Unavailable(ExportKind),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Spreadsheet error: {0}")]
    Xlsx(String),
}

#[cfg(feature = "xlsx")]
impl From<rust_xlsxwriter::XlsxError> for ExportError {
    fn from(err: rust_xlsxwriter::XlsxError) -> Self {
        ExportError::Xlsx(err.to_string())
    }
}

/// One chart failed to render; the others are still attempted
#[derive(Debug, thiserror::Error)]
#[error("Failed to render {chart} chart: {message}")]
pub struct ChartRenderError {
    pub chart: ChartKind,
    pub message: String,
}

impl ChartRenderError {
    pub fn new(chart: ChartKind, message: impl Into<String>) -> Self {
        ChartRenderError {
            chart,
            message: message.into(),
        }
    }
}
