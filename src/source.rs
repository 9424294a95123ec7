// 🏗️ Data Source Adapter
// Remote ranking API or local CSV → RawRecord in canonical field order

use crate::config::{self, RemoteConfig};
use crate::error::{MovieIncomeError, Result};
use crate::schema::{ColumnMap, Field};
use csv::{ByteRecord, ReaderBuilder, StringRecord};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

// ============================================================================
// CORE TYPES
// ============================================================================

/// SourceType - where a batch of records came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceType {
    RemoteApi,
    LocalFile,
}

impl SourceType {
    pub fn name(&self) -> &str {
        match self {
            SourceType::RemoteApi => "Remote API",
            SourceType::LocalFile => "Local file",
        }
    }
}

/// RawRecord - canonical fields as text, before any parsing or coercion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    pub rank: String,
    pub title: String,
    pub release_date: String,
    pub box_office: String,
    pub avg_ticket_price: String,
    pub avg_audience: String,

    /// Fields whose source bytes were not valid UTF-8 (decoded lossily)
    pub invalid_encoding: Vec<Field>,

    // Provenance
    pub source_type: SourceType,
    pub line_number: usize, // 1-based data row (header excluded) or array position
}

impl RawRecord {
    pub fn new(source_type: SourceType, line_number: usize) -> Self {
        RawRecord {
            rank: String::new(),
            title: String::new(),
            release_date: String::new(),
            box_office: String::new(),
            avg_ticket_price: String::new(),
            avg_audience: String::new(),
            invalid_encoding: Vec::new(),
            source_type,
            line_number,
        }
    }

    /// Builder pattern: set one canonical field
    pub fn with(mut self, field: Field, value: impl Into<String>) -> Self {
        let value = value.into();
        match field {
            Field::Rank => self.rank = value,
            Field::Title => self.title = value,
            Field::ReleaseDate => self.release_date = value,
            Field::BoxOffice => self.box_office = value,
            Field::AvgTicketPrice => self.avg_ticket_price = value,
            Field::AvgAudience => self.avg_audience = value,
        }
        self
    }

    pub fn with_invalid_encoding(mut self, field: Field) -> Self {
        if !self.invalid_encoding.contains(&field) {
            self.invalid_encoding.push(field);
        }
        self
    }

    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::Rank => &self.rank,
            Field::Title => &self.title,
            Field::ReleaseDate => &self.release_date,
            Field::BoxOffice => &self.box_office,
            Field::AvgTicketPrice => &self.avg_ticket_price,
            Field::AvgAudience => &self.avg_audience,
        }
    }
}

// ============================================================================
// SOURCE TRAIT
// ============================================================================

/// RecordSource - one way of obtaining the raw ranking list
pub trait RecordSource {
    /// Fetch every raw record, in source order.
    ///
    /// An empty result is never returned; it is reported as `DataUnavailable`.
    fn fetch(&self) -> Result<Vec<RawRecord>>;

    fn source_type(&self) -> SourceType;
}

/// How the operator asked for data
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSpec {
    Remote,
    Local(PathBuf),
    /// Remote first; read the file only if the fetch fails
    RemoteWithFallback(PathBuf),
}

/// Build the source for the requested mode (factory, mirrors the CLI modes)
pub fn get_source(spec: &SourceSpec, remote: &RemoteConfig) -> Box<dyn RecordSource> {
    match spec {
        SourceSpec::Remote => Box::new(RemoteSource::new(remote.clone())),
        SourceSpec::Local(path) => Box::new(LocalFileSource::new(path)),
        SourceSpec::RemoteWithFallback(path) => Box::new(FallbackSource::new(
            Box::new(RemoteSource::new(remote.clone())),
            Box::new(LocalFileSource::new(path)),
        )),
    }
}

// ============================================================================
// REMOTE API
// ============================================================================

pub struct RemoteSource {
    config: RemoteConfig,
}

impl RemoteSource {
    pub fn new(config: RemoteConfig) -> Self {
        RemoteSource { config }
    }
}

impl RecordSource for RemoteSource {
    fn fetch(&self) -> Result<Vec<RawRecord>> {
        let unavailable = |what: &str, err: reqwest::Error| {
            MovieIncomeError::DataUnavailable(format!("{} {}: {}", what, self.config.api_url, err))
        };

        let client = Client::builder()
            .timeout(self.config.timeout)
            .build()
            .map_err(|e| unavailable("failed to build HTTP client for", e))?;

        // The API wants a random cache-buster in `r`
        let cache_buster = rand::random::<f64>().to_string();
        let top = self.config.top.to_string();

        info!(url = %self.config.api_url, top = self.config.top, "Fetching ranking from remote API");

        let response = client
            .post(&self.config.api_url)
            .header(reqwest::header::USER_AGENT, config::USER_AGENT)
            .header(reqwest::header::ACCEPT, config::ACCEPT)
            .form(&[("r", cache_buster.as_str()), ("top", top.as_str()), ("type", "0")])
            .send()
            .and_then(|resp| resp.error_for_status())
            .map_err(|e| unavailable("request failed for", e))?;

        let payload: Value = response
            .json()
            .map_err(|e| unavailable("undecodable payload from", e))?;

        parse_api_payload(&payload)
    }

    fn source_type(&self) -> SourceType {
        SourceType::RemoteApi
    }
}

/// Extract records from the API payload `{ "data": { "table0": [ {...}, ... ] } }`
///
/// Item keys: Irank, MovieName, ReleaseTime, BoxOffice, AvgBoxOffice, AvgAudienceCount.
/// Numbers and strings are both carried as text; absent/null values become empty.
pub fn parse_api_payload(payload: &Value) -> Result<Vec<RawRecord>> {
    let table = payload
        .get("data")
        .and_then(|d| d.get("table0"))
        .and_then(|t| t.as_array())
        .map(Vec::as_slice)
        .unwrap_or(&[]);

    if table.is_empty() {
        return Err(MovieIncomeError::DataUnavailable(
            "API returned an empty dataset".to_string(),
        ));
    }

    let records: Vec<RawRecord> = table
        .iter()
        .enumerate()
        .map(|(idx, item)| {
            RawRecord::new(SourceType::RemoteApi, idx + 1)
                .with(Field::Rank, value_text(item, "Irank"))
                .with(Field::Title, value_text(item, "MovieName"))
                .with(Field::ReleaseDate, value_text(item, "ReleaseTime"))
                .with(Field::BoxOffice, value_text(item, "BoxOffice"))
                .with(Field::AvgTicketPrice, value_text(item, "AvgBoxOffice"))
                .with(Field::AvgAudience, value_text(item, "AvgAudienceCount"))
        })
        .collect();

    debug!(count = records.len(), "Parsed API payload");
    Ok(records)
}

fn value_text(item: &Value, key: &str) -> String {
    match item.get(key) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

// ============================================================================
// LOCAL FILE
// ============================================================================

pub struct LocalFileSource {
    path: PathBuf,
}

impl LocalFileSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        LocalFileSource {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl RecordSource for LocalFileSource {
    fn fetch(&self) -> Result<Vec<RawRecord>> {
        let shown = self.path.display().to_string();

        let file = File::open(&self.path).map_err(|e| {
            MovieIncomeError::DataUnavailable(format!("Failed to open file {}: {}", shown, e))
        })?;

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(file);

        let (headers, _) = reader.byte_headers().map(decode_record).map_err(|e| {
            MovieIncomeError::DataUnavailable(format!("Failed to read header row of {}: {}", shown, e))
        })?;
        let columns = ColumnMap::resolve(&headers, &shown)?;

        info!(path = %shown, "Reading local input file");

        let mut records = Vec::new();
        for (idx, result) in reader.byte_records().enumerate() {
            let row = result.map_err(|e| {
                MovieIncomeError::DataUnavailable(format!(
                    "Failed to read CSV line {} in {}: {}",
                    idx + 2,
                    shown,
                    e
                ))
            })?;

            // Bad bytes in one cell stay a row-level problem
            let (row, invalid) = decode_record(&row);

            // Skip fully blank lines
            if row.iter().all(|cell| cell.trim().is_empty()) {
                continue;
            }

            let record = Field::ALL
                .iter()
                .fold(RawRecord::new(SourceType::LocalFile, idx + 1), |rec, field| {
                    let rec = rec.with(*field, columns.get(&row, *field));
                    match columns.position(*field) {
                        Some(pos) if invalid.contains(&pos) => rec.with_invalid_encoding(*field),
                        _ => rec,
                    }
                });
            records.push(record);
        }

        if records.is_empty() {
            return Err(MovieIncomeError::DataUnavailable(format!(
                "{} contains no data rows",
                shown
            )));
        }

        Ok(records)
    }

    fn source_type(&self) -> SourceType {
        SourceType::LocalFile
    }
}

/// Decode a CSV row lossily, returning the positions of cells that were not valid UTF-8
fn decode_record(row: &ByteRecord) -> (StringRecord, Vec<usize>) {
    let mut invalid = Vec::new();
    let cells: Vec<String> = row
        .iter()
        .enumerate()
        .map(|(pos, bytes)| match std::str::from_utf8(bytes) {
            Ok(text) => text.to_string(),
            Err(_) => {
                invalid.push(pos);
                String::from_utf8_lossy(bytes).into_owned()
            }
        })
        .collect();
    (StringRecord::from(cells), invalid)
}

// ============================================================================
// FALLBACK
// ============================================================================

/// Try `primary`; on any failure, log it and read `fallback` instead
pub struct FallbackSource {
    primary: Box<dyn RecordSource>,
    fallback: Box<dyn RecordSource>,
}

impl FallbackSource {
    pub fn new(primary: Box<dyn RecordSource>, fallback: Box<dyn RecordSource>) -> Self {
        FallbackSource { primary, fallback }
    }
}

impl RecordSource for FallbackSource {
    fn fetch(&self) -> Result<Vec<RawRecord>> {
        match self.primary.fetch() {
            Ok(records) => Ok(records),
            Err(err) => {
                warn!(
                    error = %err,
                    fallback = self.fallback.source_type().name(),
                    "Primary source failed, using operator-provided fallback"
                );
                self.fallback.fetch()
            }
        }
    }

    fn source_type(&self) -> SourceType {
        self.primary.source_type()
    }
}
