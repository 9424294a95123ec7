// ✅ Data Quality Report
// Rolls row warnings up into a per-run quality summary

use crate::normalizer::{NormalizedSet, RowWarning, WarningKind};
use crate::schema::Field;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Critical, // Record breaks an invariant (rank) or loses its year
    Warning,  // A numeric/text cell is missing or malformed
}

impl Severity {
    pub fn of(warning: &RowWarning) -> Severity {
        match (warning.kind, warning.field) {
            (WarningKind::InvalidRank, _) | (WarningKind::DuplicateRank, _) => Severity::Critical,
            (WarningKind::UnparseableDate, _) => Severity::Critical,
            (WarningKind::Missing, Field::Rank) | (WarningKind::Missing, Field::ReleaseDate) => {
                Severity::Critical
            }
            _ => Severity::Warning,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityIssue {
    pub severity: Severity,
    pub line_number: usize,
    pub field: Field,
    pub issue: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub total_records: usize,
    pub undated_records: usize,
    /// Records with no warnings at all / total
    pub overall_quality: f64,
    pub issues_by_field: BTreeMap<Field, usize>,
    pub issues: Vec<QualityIssue>,
}

impl QualityReport {
    pub fn from_set(set: &NormalizedSet) -> Self {
        let mut issues_by_field = BTreeMap::new();
        let mut flagged_lines = BTreeSet::new();

        let mut issues: Vec<QualityIssue> = set
            .warnings
            .iter()
            .map(|w| {
                *issues_by_field.entry(w.field).or_insert(0) += 1;
                flagged_lines.insert(w.line_number);
                QualityIssue {
                    severity: Severity::of(w),
                    line_number: w.line_number,
                    field: w.field,
                    issue: w.to_string(),
                }
            })
            .collect();

        for record in set.records.iter().filter(|r| r.title.is_empty()) {
            *issues_by_field.entry(Field::Title).or_insert(0) += 1;
            flagged_lines.insert(record.line_number);
            issues.push(QualityIssue {
                severity: Severity::Warning,
                line_number: record.line_number,
                field: Field::Title,
                issue: format!("line {}: title is empty", record.line_number),
            });
        }

        let total_records = set.records.len();
        let clean = total_records.saturating_sub(flagged_lines.len());
        let overall_quality = if total_records == 0 {
            1.0
        } else {
            clean as f64 / total_records as f64
        };

        QualityReport {
            total_records,
            undated_records: set.records.iter().filter(|r| r.release_year.is_none()).count(),
            overall_quality,
            issues_by_field,
            issues,
        }
    }

    pub fn has_issues(&self) -> bool {
        !self.issues.is_empty()
    }

    pub fn critical_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Critical)
            .count()
    }

    pub fn summary(&self) -> String {
        format!(
            "Quality: {:.1}% clean rows, {} records, {} issues ({} critical), {} without release year",
            self.overall_quality * 100.0,
            self.total_records,
            self.issues.len(),
            self.critical_count(),
            self.undated_records
        )
    }
}
