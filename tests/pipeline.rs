//! End-to-end runs over the fixture CSVs: load → normalize → export → charts.

use chrono::{Datelike, NaiveDate};
use movie_income::charts::{top_n_by, ChartKind, TOP_N};
use movie_income::export::{data_sheet, SheetCell};
use movie_income::{
    run_with_token, ExportKind, Field, LocalFileSource, MovieIncomeError, RecordSource, RunOptions,
    RunReport, RunToken, SourceSpec, WarningKind,
};
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures").join(name)
}

fn token() -> RunToken {
    RunToken::at(
        NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(9, 7, 30)
            .unwrap(),
    )
}

fn run_fixture(name: &str, out: &Path) -> RunReport {
    let options = RunOptions::new(SourceSpec::Local(fixture(name))).with_output_root(out);
    run_with_token(&options, token()).expect("run should succeed")
}

fn export_path(report: &RunReport, kind: ExportKind) -> PathBuf {
    report
        .exports
        .iter()
        .find(|o| o.kind == kind)
        .map(|o| o.path.clone())
        .unwrap()
}

type Triple = (Option<u32>, String, Option<String>);

// ---------------------------------------------------------------------------
// Full run
// ---------------------------------------------------------------------------

#[test]
fn localized_run_produces_every_artifact() {
    let out = TempDir::new().unwrap();
    let report = run_fixture("ranking_localized.csv", out.path());

    let dir = out.path().join("movie_income_20240305_090730");
    assert_eq!(report.layout.dir, dir);
    assert!(dir.is_dir());

    assert_eq!(report.record_count(), 7);
    assert_eq!(report.exports.len(), 3);
    assert_eq!(report.charts.len(), 5);

    for outcome in &report.exports {
        if outcome.kind == ExportKind::Xlsx && !cfg!(feature = "xlsx") {
            assert!(!outcome.is_ok());
            continue;
        }
        assert!(outcome.is_ok(), "{} export failed: {:?}", outcome.kind, outcome.result);
        assert!(outcome.path.exists());
        assert!(outcome
            .path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("movie_income_20240305_090730."));
    }

    for outcome in &report.charts {
        assert!(outcome.path.starts_with(&dir));
        assert!(outcome.is_ok(), "{} chart failed: {:?}", outcome.kind, outcome.result);
        assert!(outcome.path.exists());
    }
}

#[test]
fn records_sorted_by_rank_with_derived_years() {
    let out = TempDir::new().unwrap();
    let report = run_fixture("ranking_localized.csv", out.path());

    let ranks: Vec<Option<u32>> = report.data.records.iter().map(|r| r.rank).collect();
    assert_eq!(ranks, (1..=7).map(Some).collect::<Vec<_>>());

    for record in &report.data.records {
        if let Some(date) = record.release_date {
            assert_eq!(record.release_year, Some(date.year()), "{}", record.title);
        }
    }
}

#[test]
fn malformed_date_row_retained_and_run_continues() {
    let out = TempDir::new().unwrap();
    let report = run_fixture("ranking_localized.csv", out.path());

    let undated = report
        .data
        .records
        .iter()
        .find(|r| r.title == "唐人街探案3")
        .expect("row with N/A date is kept");
    assert_eq!(undated.release_date, None);
    assert_eq!(undated.release_year, None);
    assert_eq!(undated.box_office, Some(452000.0));

    assert!(report
        .data
        .warnings
        .iter()
        .any(|w| w.field == Field::ReleaseDate && w.kind == WarningKind::UnparseableDate));
    assert!(report
        .data
        .warnings
        .iter()
        .any(|w| w.field == Field::AvgTicketPrice && w.kind == WarningKind::Missing));

    assert_eq!(report.quality.undated_records, 1);
    assert!(report.exports.iter().any(|o| o.kind == ExportKind::Csv && o.is_ok()));
}

// ---------------------------------------------------------------------------
// Round trip
// ---------------------------------------------------------------------------

#[test]
fn csv_json_and_data_sheet_agree() {
    let out = TempDir::new().unwrap();
    let report = run_fixture("ranking_localized.csv", out.path());

    let csv_triples: BTreeSet<Triple> = LocalFileSource::new(export_path(&report, ExportKind::Csv))
        .fetch()
        .unwrap()
        .iter()
        .map(|r| {
            (
                r.rank.parse().ok(),
                r.title.clone(),
                r.box_office.parse::<f64>().ok().map(|v| v.to_string()),
            )
        })
        .collect();

    let json: Vec<serde_json::Value> =
        serde_json::from_reader(File::open(export_path(&report, ExportKind::Json)).unwrap()).unwrap();
    let json_triples: BTreeSet<Triple> = json
        .iter()
        .map(|v| {
            (
                v["Rank"].as_u64().map(|r| r as u32),
                v["MovieName"].as_str().unwrap().to_string(),
                v["TotalBoxOffice(10k RMB)"].as_f64().map(|b| b.to_string()),
            )
        })
        .collect();

    let sheet_triples: BTreeSet<Triple> = data_sheet(&report.data.records)
        .into_iter()
        .skip(1)
        .map(|row| match (&row[0], &row[1], &row[3]) {
            (SheetCell::Number(rank), SheetCell::Text(title), SheetCell::Number(box_office)) => {
                (Some(*rank as u32), title.clone(), Some(box_office.to_string()))
            }
            other => panic!("Unexpected data row {:?}", other),
        })
        .collect();

    assert_eq!(csv_triples.len(), 7);
    assert_eq!(csv_triples, json_triples);
    assert_eq!(json_triples, sheet_triples);

    #[cfg(feature = "xlsx")]
    {
        let (workbook_triples, summary_rows) = read_workbook(&export_path(&report, ExportKind::Xlsx));
        assert_eq!(workbook_triples, csv_triples, "Saved Data sheet should match the CSV");
        assert_eq!(
            summary_rows,
            vec![
                (2017, 568945.0, 1),
                (2019, 969324.0, 2),
                (2021, 1118865.0, 2),
                (2023, 454400.0, 1),
            ]
        );
    }
}

/// Data-sheet triples and YearlySummary rows read back from a saved workbook
#[cfg(feature = "xlsx")]
fn read_workbook(path: &Path) -> (BTreeSet<Triple>, Vec<(i32, f64, usize)>) {
    use calamine::{open_workbook, DataType, Reader, Xlsx};

    let mut workbook: Xlsx<_> = open_workbook(path).unwrap();
    assert_eq!(workbook.sheet_names(), vec!["Data".to_string(), "YearlySummary".to_string()]);

    let data = workbook.worksheet_range("Data").unwrap();
    let triples = data
        .rows()
        .skip(1)
        .map(|row| {
            (
                row[0].get_float().map(|r| r as u32),
                row[1].get_string().unwrap_or("").to_string(),
                row[3].get_float().map(|b| b.to_string()),
            )
        })
        .collect();

    let summary = workbook.worksheet_range("YearlySummary").unwrap();
    let rows = summary
        .rows()
        .skip(1)
        .map(|row| {
            (
                row[0].get_float().unwrap() as i32,
                row[1].get_float().unwrap(),
                row[2].get_float().unwrap() as usize,
            )
        })
        .collect();

    (triples, rows)
}

#[test]
fn exported_csv_reloads_to_same_records() {
    let first_out = TempDir::new().unwrap();
    let first = run_fixture("ranking_english.csv", first_out.path());

    let second_out = TempDir::new().unwrap();
    let options = RunOptions::new(SourceSpec::Local(export_path(&first, ExportKind::Csv)))
        .with_output_root(second_out.path());
    let second = run_with_token(&options, token()).unwrap();

    let strip = |report: &RunReport| {
        report
            .data
            .records
            .iter()
            .map(|r| (r.rank, r.title.clone(), r.release_date, r.box_office, r.avg_ticket_price))
            .collect::<Vec<_>>()
    };
    assert_eq!(strip(&first), strip(&second));
}

// ---------------------------------------------------------------------------
// Input variants + failures
// ---------------------------------------------------------------------------

#[test]
fn english_headers_with_separators_and_slash_dates() {
    let out = TempDir::new().unwrap();
    let report = run_fixture("ranking_english.csv", out.path());

    assert!(report.data.warnings.is_empty(), "{:?}", report.data.warnings);
    let first = &report.data.records[1];
    assert_eq!(first.title, "Hi, Mom");
    assert_eq!(first.box_office, Some(541330.0));
    assert_eq!(first.release_year, Some(2021));
}

#[test]
fn missing_columns_abort_before_output() {
    let out = TempDir::new().unwrap();
    let options = RunOptions::new(SourceSpec::Local(fixture("ranking_missing_columns.csv")))
        .with_output_root(out.path());

    let err = run_with_token(&options, token()).unwrap_err();
    match err {
        MovieIncomeError::SchemaMismatch { missing, .. } => assert_eq!(missing.len(), 3),
        other => panic!("Expected SchemaMismatch, got {:?}", other),
    }
    assert_eq!(fs::read_dir(out.path()).unwrap().count(), 0);
}

#[test]
fn fewer_than_ten_rows_use_all_available() {
    let out = TempDir::new().unwrap();
    let report = run_fixture("ranking_localized.csv", out.path());

    let by_price = top_n_by(&report.data.records, Field::AvgTicketPrice, TOP_N);
    let by_audience = top_n_by(&report.data.records, Field::AvgAudience, TOP_N);
    assert_eq!(by_price.len(), 6, "One row has no ticket price");
    assert_eq!(by_audience.len(), 7);
    assert!(by_price.windows(2).all(|w| w[0].1 >= w[1].1));

    for kind in [ChartKind::BarTopAvgTicketPrice, ChartKind::BarTopAvgAudience] {
        let outcome = report.charts.iter().find(|o| o.kind == kind).unwrap();
        assert!(outcome.is_ok(), "{} should render with 7 rows: {:?}", kind, outcome.result);
        assert!(outcome.path.exists());
    }
}

#[test]
fn invalid_utf8_cell_flagged_and_run_completes() {
    let input = TempDir::new().unwrap();
    let path = input.path().join("ranking.csv");
    let mut file = File::create(&path).unwrap();
    file.write_all(
        b"Rank,MovieName,ReleaseDate,TotalBoxOffice(10k RMB),AvgTicketPrice(RMB),AvgAudienceCount\n\
          1,Good,2020-01-01,100,30,20\n\
          2,Bad\xff\xfe,2020-01-02,200,40,25\n",
    )
    .unwrap();
    drop(file);

    let out = TempDir::new().unwrap();
    let options = RunOptions::new(SourceSpec::Local(path)).with_output_root(out.path());
    let report = run_with_token(&options, token()).expect("one bad cell must not abort the run");

    assert_eq!(report.record_count(), 2);
    assert_eq!(report.data.records[1].box_office, Some(200.0));
    assert!(report
        .data
        .warnings
        .iter()
        .any(|w| w.line_number == 2 && w.field == Field::Title && w.kind == WarningKind::InvalidEncoding));
    assert!(report.exports.iter().any(|o| o.kind == ExportKind::Csv && o.is_ok()));
}

#[test]
fn second_run_with_same_token_does_not_reuse_directory() {
    let out = TempDir::new().unwrap();
    let first = run_fixture("ranking_english.csv", out.path());
    let csv_before = fs::read(export_path(&first, ExportKind::Csv)).unwrap();

    let options = RunOptions::new(SourceSpec::Local(fixture("ranking_localized.csv")))
        .with_output_root(out.path());
    let err = run_with_token(&options, token()).unwrap_err();

    assert!(matches!(err, MovieIncomeError::OutputDir { .. }));
    assert_eq!(fs::read(export_path(&first, ExportKind::Csv)).unwrap(), csv_before);
}
