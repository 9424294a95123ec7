// 📐 Shape Layer - Canonical Schema
// Canonical field set + header resolution for local input files

use crate::config::HEADER_ALIASES;
use crate::error::{MovieIncomeError, Result};
use csv::StringRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// CANONICAL FIELDS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Field {
    Rank,
    Title,
    ReleaseDate,
    BoxOffice,
    AvgTicketPrice,
    AvgAudience,
}

impl Field {
    pub const ALL: [Field; 6] = [
        Field::Rank,
        Field::Title,
        Field::ReleaseDate,
        Field::BoxOffice,
        Field::AvgTicketPrice,
        Field::AvgAudience,
    ];

    /// Canonical (English) column header, also used by every export
    pub fn canonical_name(&self) -> &'static str {
        self.aliases().0
    }

    /// Localized column header accepted on input
    pub fn localized_name(&self) -> &'static str {
        self.aliases().1
    }

    /// Short key for logs and warnings
    pub fn key(&self) -> &'static str {
        match self {
            Field::Rank => "rank",
            Field::Title => "title",
            Field::ReleaseDate => "release_date",
            Field::BoxOffice => "box_office",
            Field::AvgTicketPrice => "avg_ticket_price",
            Field::AvgAudience => "avg_audience",
        }
    }

    fn aliases(&self) -> (&'static str, &'static str) {
        HEADER_ALIASES
            .iter()
            .find(|(field, _, _)| field == self)
            .map(|(_, english, localized)| (*english, *localized))
            .unwrap_or(("", ""))
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

// ============================================================================
// COLUMN MAP
// ============================================================================

/// Position of every canonical field inside a local file's header row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMap {
    positions: BTreeMap<Field, usize>,
}

impl ColumnMap {
    /// Resolve a header row against the alias table.
    ///
    /// A leading BOM and surrounding whitespace are ignored. When both the English
    /// and localized header are present, the localized column wins.
    /// Fails with `SchemaMismatch` listing every canonical column that is absent.
    pub fn resolve(headers: &StringRecord, source: &str) -> Result<Self> {
        let cleaned: Vec<&str> = headers
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim())
            .collect();

        let position_of = |name: &str| cleaned.iter().position(|h| *h == name);

        let mut positions = BTreeMap::new();
        let mut missing = Vec::new();

        for field in Field::ALL {
            match position_of(field.localized_name()).or_else(|| position_of(field.canonical_name())) {
                Some(pos) => {
                    positions.insert(field, pos);
                }
                None => missing.push(field.canonical_name().to_string()),
            }
        }

        if !missing.is_empty() {
            return Err(MovieIncomeError::SchemaMismatch {
                path: source.to_string(),
                missing,
            });
        }

        Ok(ColumnMap { positions })
    }

    pub fn position(&self, field: Field) -> Option<usize> {
        self.positions.get(&field).copied()
    }

    /// Cell for `field` in `record`, trimmed; empty when the row is short
    pub fn get<'a>(&self, record: &'a StringRecord, field: Field) -> &'a str {
        self.positions
            .get(&field)
            .and_then(|pos| record.get(*pos))
            .map(str::trim)
            .unwrap_or("")
    }
}
