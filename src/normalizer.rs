// 🧹 Record Normalizer
// RawRecord → MovieRecord: date parsing, year derivation, numeric coercion, rank sort

use crate::schema::Field;
use crate::source::RawRecord;
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

// ============================================================================
// CORE TYPES
// ============================================================================

/// MovieRecord - one film, normalized
///
/// `None` in a numeric field means the source value was missing or not numeric;
/// the row is kept and the field is left out of aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieRecord {
    pub rank: Option<u32>,
    pub title: String,
    pub release_date: Option<NaiveDate>,
    pub release_year: Option<i32>,
    pub box_office: Option<f64>, // units of 10k RMB
    pub avg_ticket_price: Option<f64>,
    pub avg_audience: Option<f64>,

    /// Position in the source, kept for warnings
    pub line_number: usize,
}

impl MovieRecord {
    pub fn numeric(&self, field: Field) -> Option<f64> {
        match field {
            Field::BoxOffice => self.box_office,
            Field::AvgTicketPrice => self.avg_ticket_price,
            Field::AvgAudience => self.avg_audience,
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningKind {
    Missing,
    UnparseableDate,
    NotNumeric,
    InvalidRank,
    DuplicateRank,
    InvalidEncoding,
}

impl WarningKind {
    pub fn describe(&self) -> &str {
        match self {
            WarningKind::Missing => "value is missing",
            WarningKind::UnparseableDate => "not a recognizable date",
            WarningKind::NotNumeric => "not a number",
            WarningKind::InvalidRank => "not a valid rank",
            WarningKind::DuplicateRank => "rank already used by another row",
            WarningKind::InvalidEncoding => "contains bytes that are not valid UTF-8",
        }
    }
}

/// RowWarning - recoverable per-row problem; the row stays in the set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowWarning {
    pub line_number: usize,
    pub field: Field,
    pub value: String,
    pub kind: WarningKind,
}

impl std::fmt::Display for RowWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "line {}: {} {:?} {}",
            self.line_number,
            self.field,
            self.value,
            self.kind.describe()
        )
    }
}

/// Output of normalization: sorted records plus every warning raised on the way
#[derive(Debug, Clone, Default)]
pub struct NormalizedSet {
    pub records: Vec<MovieRecord>,
    pub warnings: Vec<RowWarning>,
}

impl NormalizedSet {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// ============================================================================
// NORMALIZATION
// ============================================================================

/// Accepted date layouts, tried in order
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%Y年%m月%d日",
    "%m/%d/%Y",
    "%Y%m%d",
];

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y/%m/%d %H:%M:%S"];

/// Normalize raw records into MovieRecords sorted by rank (stable).
///
/// Nothing here is fatal: malformed cells turn into `RowWarning`s.
pub fn normalize(raw: Vec<RawRecord>) -> NormalizedSet {
    let mut warnings = Vec::new();

    let mut records: Vec<MovieRecord> = raw
        .into_iter()
        .map(|row| normalize_row(&row, &mut warnings))
        .collect();

    // Stable: ties and unranked rows keep input order, unranked go last
    records.sort_by_key(|r| (r.rank.is_none(), r.rank.unwrap_or(0)));

    for pair in records.windows(2) {
        if let (Some(a), Some(b)) = (pair[0].rank, pair[1].rank) {
            if a == b {
                warnings.push(RowWarning {
                    line_number: pair[1].line_number,
                    field: Field::Rank,
                    value: b.to_string(),
                    kind: WarningKind::DuplicateRank,
                });
            }
        }
    }

    for warning in &warnings {
        warn!(%warning, "Row parse warning");
    }
    debug!(records = records.len(), warnings = warnings.len(), "Normalized records");

    NormalizedSet { records, warnings }
}

fn normalize_row(row: &RawRecord, warnings: &mut Vec<RowWarning>) -> MovieRecord {
    let line_number = row.line_number;
    let mut flag = |field: Field, value: &str, kind: WarningKind| {
        warnings.push(RowWarning {
            line_number,
            field,
            value: value.to_string(),
            kind,
        });
    };

    for field in &row.invalid_encoding {
        flag(*field, row.get(*field), WarningKind::InvalidEncoding);
    }

    let rank = match row.rank.trim() {
        "" => {
            flag(Field::Rank, "", WarningKind::Missing);
            None
        }
        text => {
            let parsed = parse_rank(text);
            if parsed.is_none() {
                flag(Field::Rank, text, WarningKind::InvalidRank);
            }
            parsed
        }
    };

    let release_date = match row.release_date.trim() {
        "" => {
            flag(Field::ReleaseDate, "", WarningKind::Missing);
            None
        }
        text => {
            let parsed = parse_date(text);
            if parsed.is_none() {
                flag(Field::ReleaseDate, text, WarningKind::UnparseableDate);
            }
            parsed
        }
    };

    let mut numeric = |field: Field| match row.get(field).trim() {
        "" => {
            flag(field, "", WarningKind::Missing);
            None
        }
        text => {
            let parsed = parse_number(text);
            if parsed.is_none() {
                flag(field, text, WarningKind::NotNumeric);
            }
            parsed
        }
    };

    let box_office = numeric(Field::BoxOffice);
    let avg_ticket_price = numeric(Field::AvgTicketPrice);
    let avg_audience = numeric(Field::AvgAudience);

    MovieRecord {
        rank,
        title: row.title.trim().to_string(),
        release_date,
        release_year: release_date.map(|d| d.year()),
        box_office,
        avg_ticket_price,
        avg_audience,
        line_number,
    }
}

/// Parse a release date in any accepted layout
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
                .map(|dt| dt.date())
        })
}

/// Parse a numeric cell; thousands separators allowed, non-finite rejected
pub fn parse_number(text: &str) -> Option<f64> {
    let cleaned: String = text.trim().chars().filter(|c| *c != ',').collect();
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse a rank; "3" and "3.0" are both rank 3
pub fn parse_rank(text: &str) -> Option<u32> {
    let text = text.trim();
    text.parse::<u32>().ok().or_else(|| {
        text.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && *v >= 0.0 && v.fract() == 0.0 && *v <= u32::MAX as f64)
            .map(|v| v as u32)
    })
}
