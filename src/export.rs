// 💾 Exporter - CSV / JSON / XLSX
// Each format is attempted independently; one failing never blocks the others

use crate::error::ExportError;
use crate::normalizer::MovieRecord;
use crate::schema::Field;
use crate::summary::{yearly_summary, YearlySummary};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const DATA_SHEET: &str = "Data";
pub const SUMMARY_SHEET: &str = "YearlySummary";

pub const YEAR_HEADER: &str = "ReleaseYear";
pub const SUMMARY_HEADERS: [&str; 3] = ["Year", "TotalBoxOffice(10k RMB)", "FilmCount"];

// ============================================================================
// CORE TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportKind {
    Csv,
    Json,
    Xlsx,
}

impl ExportKind {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportKind::Csv => "csv",
            ExportKind::Json => "json",
            ExportKind::Xlsx => "xlsx",
        }
    }
}

impl std::fmt::Display for ExportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ExportKind::Csv => "CSV",
            ExportKind::Json => "JSON",
            ExportKind::Xlsx => "XLSX",
        })
    }
}

/// ExportRow - one record as written to CSV and JSON (canonical headers)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRow {
    #[serde(rename = "Rank")]
    pub rank: Option<u32>,

    #[serde(rename = "MovieName")]
    pub title: String,

    #[serde(rename = "ReleaseDate")]
    pub release_date: Option<String>,

    #[serde(rename = "TotalBoxOffice(10k RMB)")]
    pub box_office: Option<f64>,

    #[serde(rename = "AvgTicketPrice(RMB)")]
    pub avg_ticket_price: Option<f64>,

    #[serde(rename = "AvgAudienceCount")]
    pub avg_audience: Option<f64>,

    #[serde(rename = "ReleaseYear")]
    pub release_year: Option<i32>,
}

impl From<&MovieRecord> for ExportRow {
    fn from(record: &MovieRecord) -> Self {
        ExportRow {
            rank: record.rank,
            title: record.title.clone(),
            release_date: record.release_date.map(|d| d.format("%Y-%m-%d").to_string()),
            box_office: record.box_office,
            avg_ticket_price: record.avg_ticket_price,
            avg_audience: record.avg_audience,
            release_year: record.release_year,
        }
    }
}

/// Result of one format's attempt
#[derive(Debug)]
pub struct ExportOutcome {
    pub kind: ExportKind,
    pub path: PathBuf,
    pub result: Result<(), ExportError>,
}

impl ExportOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

// ============================================================================
// EXPORT FORMAT TRAIT
// ============================================================================

/// ExportFormat - one serialization of the normalized record set
pub trait ExportFormat {
    fn kind(&self) -> ExportKind;

    fn write(&self, records: &[MovieRecord], path: &Path) -> Result<(), ExportError>;
}

pub struct CsvExport;

impl ExportFormat for CsvExport {
    fn kind(&self) -> ExportKind {
        ExportKind::Csv
    }

    fn write(&self, records: &[MovieRecord], path: &Path) -> Result<(), ExportError> {
        let mut file = BufWriter::new(File::create(path)?);
        // BOM so spreadsheet tools pick UTF-8 for the localized titles
        file.write_all("\u{feff}".as_bytes())?;

        let mut writer = csv::Writer::from_writer(file);
        for record in records {
            writer.serialize(ExportRow::from(record))?;
        }
        writer.flush()?;
        Ok(())
    }
}

pub struct JsonExport;

impl ExportFormat for JsonExport {
    fn kind(&self) -> ExportKind {
        ExportKind::Json
    }

    fn write(&self, records: &[MovieRecord], path: &Path) -> Result<(), ExportError> {
        let rows: Vec<ExportRow> = records.iter().map(ExportRow::from).collect();
        let mut file = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut file, &rows)?;
        file.flush()?;
        Ok(())
    }
}

/// Spreadsheet with a "Data" sheet and a "YearlySummary" sheet
pub struct XlsxExport;

impl ExportFormat for XlsxExport {
    fn kind(&self) -> ExportKind {
        ExportKind::Xlsx
    }

    #[cfg(feature = "xlsx")]
    fn write(&self, records: &[MovieRecord], path: &Path) -> Result<(), ExportError> {
        let mut workbook = rust_xlsxwriter::Workbook::new();
        write_sheet(workbook.add_worksheet(), DATA_SHEET, &data_sheet(records))?;
        write_sheet(
            workbook.add_worksheet(),
            SUMMARY_SHEET,
            &summary_sheet(&yearly_summary(records)),
        )?;
        workbook.save(path)?;
        Ok(())
    }

    #[cfg(not(feature = "xlsx"))]
    fn write(&self, _records: &[MovieRecord], _path: &Path) -> Result<(), ExportError> {
        Err(ExportError::Unavailable(ExportKind::Xlsx))
    }
}

#[cfg(feature = "xlsx")]
fn write_sheet(
    sheet: &mut rust_xlsxwriter::Worksheet,
    name: &str,
    rows: &[Vec<SheetCell>],
) -> Result<(), ExportError> {
    sheet.set_name(name)?;
    for (r, row) in rows.iter().enumerate() {
        for (c, cell) in row.iter().enumerate() {
            let (r, c) = (r as u32, c as u16);
            match cell {
                SheetCell::Text(text) => {
                    sheet.write_string(r, c, text)?;
                }
                SheetCell::Number(value) => {
                    sheet.write_number(r, c, *value)?;
                }
                SheetCell::Empty => {}
            }
        }
    }
    Ok(())
}

// ============================================================================
// SHEET LAYOUT
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum SheetCell {
    Text(String),
    Number(f64),
    Empty,
}

fn number_cell(value: Option<f64>) -> SheetCell {
    value.map(SheetCell::Number).unwrap_or(SheetCell::Empty)
}

/// "Data" sheet: header row + one row per record, same columns as the CSV
pub fn data_sheet(records: &[MovieRecord]) -> Vec<Vec<SheetCell>> {
    let header: Vec<SheetCell> = Field::ALL
        .iter()
        .map(|f| f.canonical_name())
        .chain(std::iter::once(YEAR_HEADER))
        .map(|h| SheetCell::Text(h.to_string()))
        .collect();

    let rows = records.iter().map(|record| {
        vec![
            number_cell(record.rank.map(f64::from)),
            SheetCell::Text(record.title.clone()),
            record
                .release_date
                .map(|d| SheetCell::Text(d.format("%Y-%m-%d").to_string()))
                .unwrap_or(SheetCell::Empty),
            number_cell(record.box_office),
            number_cell(record.avg_ticket_price),
            number_cell(record.avg_audience),
            number_cell(record.release_year.map(f64::from)),
        ]
    });

    std::iter::once(header).chain(rows).collect()
}

/// "YearlySummary" sheet: Year, summed box office, film count
pub fn summary_sheet(summary: &[YearlySummary]) -> Vec<Vec<SheetCell>> {
    let header = SUMMARY_HEADERS
        .iter()
        .map(|h| SheetCell::Text(h.to_string()))
        .collect();

    let rows = summary.iter().map(|s| {
        vec![
            SheetCell::Number(f64::from(s.year)),
            SheetCell::Number(s.total_box_office),
            SheetCell::Number(s.film_count as f64),
        ]
    });

    std::iter::once(header).chain(rows).collect()
}

// ============================================================================
// EXPORTER
// ============================================================================

pub struct Exporter {
    formats: Vec<Box<dyn ExportFormat>>,
}

impl Exporter {
    pub fn new(formats: Vec<Box<dyn ExportFormat>>) -> Self {
        Exporter { formats }
    }

    /// CSV, JSON and XLSX
    pub fn standard() -> Self {
        Exporter::new(vec![Box::new(CsvExport), Box::new(JsonExport), Box::new(XlsxExport)])
    }

    /// Write every format to `<dir>/<stem>.<ext>`, collecting each outcome
    pub fn export_all(&self, records: &[MovieRecord], dir: &Path, stem: &str) -> Vec<ExportOutcome> {
        self.formats
            .iter()
            .map(|format| {
                let kind = format.kind();
                let path = dir.join(format!("{}.{}", stem, kind.extension()));
                let result = format.write(records, &path);

                match &result {
                    Ok(()) => debug!(format = %kind, path = %path.display(), "Exported"),
                    Err(err) => warn!(format = %kind, error = %err, "Export failed, continuing"),
                }

                ExportOutcome { kind, path, result }
            })
            .collect()
    }
}
