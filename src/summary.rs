// 📊 Yearly Summary
// Box office aggregated per derived release year

use crate::normalizer::MovieRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearlySummary {
    pub year: i32,
    /// Sum of box office over the year's records that have one
    pub total_box_office: f64,
    /// Every record with this release year, box office or not
    pub film_count: usize,
}

/// One entry per distinct release year, ascending. Records without a year are skipped.
pub fn yearly_summary(records: &[MovieRecord]) -> Vec<YearlySummary> {
    let mut by_year: BTreeMap<i32, (f64, usize)> = BTreeMap::new();

    for record in records {
        if let Some(year) = record.release_year {
            let entry = by_year.entry(year).or_insert((0.0, 0));
            entry.0 += record.box_office.unwrap_or(0.0);
            entry.1 += 1;
        }
    }

    by_year
        .into_iter()
        .map(|(year, (total_box_office, film_count))| YearlySummary {
            year,
            total_box_office,
            film_count,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, NaiveDate};

    fn record(title: &str, date: Option<(i32, u32, u32)>, box_office: Option<f64>) -> MovieRecord {
        let release_date = date.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d));
        MovieRecord {
            rank: None,
            title: title.to_string(),
            release_date,
            release_year: release_date.map(|d| d.year()),
            box_office,
            avg_ticket_price: None,
            avg_audience: None,
            line_number: 0,
        }
    }

    #[test]
    fn test_yearly_summary_sums_and_counts() {
        let records = vec![
            record("A", Some((2021, 2, 12)), Some(541330.0)),
            record("B", Some((2019, 7, 26)), Some(501324.0)),
            record("C", Some((2021, 9, 30)), Some(577535.0)),
            record("D", Some((2019, 2, 5)), Some(468000.0)),
        ];

        let summary = yearly_summary(&records);
        assert_eq!(summary.len(), 2);

        assert_eq!(summary[0].year, 2019, "Years should be ascending");
        assert_eq!(summary[0].total_box_office, 969324.0);
        assert_eq!(summary[0].film_count, 2);

        assert_eq!(summary[1].year, 2021);
        assert_eq!(summary[1].total_box_office, 1118865.0);
        assert_eq!(summary[1].film_count, 2);
    }

    #[test]
    fn test_missing_box_office_counted_not_summed() {
        let records = vec![
            record("A", Some((2020, 1, 1)), Some(100.0)),
            record("B", Some((2020, 6, 1)), None),
        ];

        let summary = yearly_summary(&records);
        assert_eq!(summary[0].total_box_office, 100.0);
        assert_eq!(summary[0].film_count, 2);
    }

    #[test]
    fn test_records_without_year_skipped() {
        let records = vec![
            record("Dated", Some((2020, 1, 1)), Some(100.0)),
            record("Undated", None, Some(999.0)),
        ];

        let summary = yearly_summary(&records);
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].total_box_office, 100.0);
    }

    #[test]
    fn test_empty_input() {
        assert!(yearly_summary(&[]).is_empty());
    }
}
