// 📈 Chart Renderer
// Five PNG charts, each rendered independently with plotters

use crate::error::ChartRenderError;
use crate::normalizer::MovieRecord;
use crate::schema::Field;
use crate::summary::yearly_summary;
use anyhow::Result;
use chrono::{Datelike, NaiveDate};
use plotters::prelude::*;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::ops::Range;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Bars shown in each top-N chart
pub const TOP_N: usize = 10;
/// Points annotated in the scatter chart, per criterion
pub const NOTABLE_N: usize = 5;

const CHART_SIZE: (u32, u32) = (1000, 600);
const PIE_SIZE: (u32, u32) = (700, 700);
const FONT: &str = "sans-serif";

// ============================================================================
// CHART KINDS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChartKind {
    LineReleaseVsBoxOffice,
    PieShareByYear,
    BarTopAvgTicketPrice,
    BarTopAvgAudience,
    ScatterPriceVsBoxOffice,
}

impl ChartKind {
    pub const ALL: [ChartKind; 5] = [
        ChartKind::LineReleaseVsBoxOffice,
        ChartKind::PieShareByYear,
        ChartKind::BarTopAvgTicketPrice,
        ChartKind::BarTopAvgAudience,
        ChartKind::ScatterPriceVsBoxOffice,
    ];

    /// Appended to the run stem: `<stem>_<suffix>.png`
    pub fn file_suffix(&self) -> &'static str {
        match self {
            ChartKind::LineReleaseVsBoxOffice => "line_release_vs_boxoffice",
            ChartKind::PieShareByYear => "pie_share_by_year",
            ChartKind::BarTopAvgTicketPrice => "bar_top10_avg_ticket_price",
            ChartKind::BarTopAvgAudience => "bar_top10_avg_audience",
            ChartKind::ScatterPriceVsBoxOffice => "scatter_price_vs_boxoffice",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            ChartKind::LineReleaseVsBoxOffice => "Total Box Office by Release Date",
            ChartKind::PieShareByYear => "Box Office Share by Release Year",
            ChartKind::BarTopAvgTicketPrice => "Top 10 Movies by Average Ticket Price",
            ChartKind::BarTopAvgAudience => "Top 10 Movies by Average Audience per Showing",
            ChartKind::ScatterPriceVsBoxOffice => "Average Ticket Price vs. Total Box Office",
        }
    }

    pub fn file_name(&self, stem: &str) -> String {
        format!("{}_{}.png", stem, self.file_suffix())
    }
}

impl std::fmt::Display for ChartKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.file_suffix())
    }
}

// ============================================================================
// DATA PREPARATION
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct LinePoint<'a> {
    pub date: NaiveDate,
    pub box_office: f64,
    pub title: &'a str,
}

/// Records with both a date and a box office, in date order (stable)
pub fn line_points(records: &[MovieRecord]) -> Vec<LinePoint<'_>> {
    let mut points: Vec<LinePoint> = records
        .iter()
        .filter_map(|r| match (r.release_date, r.box_office) {
            (Some(date), Some(box_office)) => Some(LinePoint {
                date,
                box_office,
                title: r.title.as_str(),
            }),
            _ => None,
        })
        .collect();
    points.sort_by_key(|p| p.date);
    points
}

#[derive(Debug, Clone, PartialEq)]
pub struct YearShare {
    pub year: i32,
    pub total: f64,
    pub percentage: f64,
}

impl YearShare {
    pub fn label(&self) -> String {
        format!("{} ({:.2}%)", self.year, self.percentage)
    }
}

/// One slice per year with a positive box-office total, ascending by year
pub fn year_shares(records: &[MovieRecord]) -> Vec<YearShare> {
    let totals: Vec<(i32, f64)> = yearly_summary(records)
        .into_iter()
        .filter(|s| s.total_box_office > 0.0)
        .map(|s| (s.year, s.total_box_office))
        .collect();
    let grand_total: f64 = totals.iter().map(|(_, t)| t).sum();

    totals
        .into_iter()
        .map(|(year, total)| YearShare {
            year,
            total,
            percentage: total / grand_total * 100.0,
        })
        .collect()
}

/// Top `n` records by a numeric field, descending; ties keep rank order.
/// Records without the field are skipped, so fewer than `n` is normal.
pub fn top_n_by(records: &[MovieRecord], field: Field, n: usize) -> Vec<(&str, f64)> {
    let mut values: Vec<(&str, f64)> = records
        .iter()
        .filter_map(|r| r.numeric(field).map(|v| (r.title.as_str(), v)))
        .collect();
    values.sort_by(|a, b| b.1.total_cmp(&a.1));
    values.truncate(n);
    values
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScatterPoint<'a> {
    pub price: f64,
    pub box_office: f64,
    pub title: &'a str,
}

pub fn scatter_points(records: &[MovieRecord]) -> Vec<ScatterPoint<'_>> {
    records
        .iter()
        .filter_map(|r| match (r.avg_ticket_price, r.box_office) {
            (Some(price), Some(box_office)) => Some(ScatterPoint {
                price,
                box_office,
                title: r.title.as_str(),
            }),
            _ => None,
        })
        .collect()
}

/// Titles worth annotating: top `n` by box office, then top `n` by price, de-duplicated
pub fn notable_titles(records: &[MovieRecord], n: usize) -> Vec<&str> {
    let mut titles: Vec<&str> = Vec::new();
    for (title, _) in top_n_by(records, Field::BoxOffice, n)
        .into_iter()
        .chain(top_n_by(records, Field::AvgTicketPrice, n))
    {
        if !titles.contains(&title) {
            titles.push(title);
        }
    }
    titles
}

/// Axis range covering `values` with a little headroom; never empty
fn padded_range(values: impl Iterator<Item = f64>, from_zero: bool) -> Range<f64> {
    let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !min.is_finite() || !max.is_finite() {
        return 0.0..1.0;
    }

    let low = if from_zero { min.min(0.0) } else { min };
    let span = (max - low).abs();
    let pad = if span > 0.0 { span * 0.1 } else { max.abs().max(1.0) * 0.1 };
    let start = if from_zero && low >= 0.0 { low } else { low - pad };
    start..max + pad
}

// ============================================================================
// RENDERING
// ============================================================================

#[derive(Debug)]
pub struct ChartOutcome {
    pub kind: ChartKind,
    pub path: PathBuf,
    pub result: std::result::Result<(), ChartRenderError>,
}

impl ChartOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Render all five charts into `dir`; one failing never stops the rest
pub fn render_all(records: &[MovieRecord], dir: &Path, stem: &str) -> Vec<ChartOutcome> {
    ChartKind::ALL
        .iter()
        .map(|kind| {
            let path = dir.join(kind.file_name(stem));
            let result = render(*kind, records, &path);

            match &result {
                Ok(()) => debug!(chart = %kind, path = %path.display(), "Chart saved"),
                Err(err) => warn!(chart = %kind, error = %err, "Chart failed, continuing"),
            }

            ChartOutcome {
                kind: *kind,
                path,
                result,
            }
        })
        .collect()
}

/// Render one chart to `path`
pub fn render(
    kind: ChartKind,
    records: &[MovieRecord],
    path: &Path,
) -> std::result::Result<(), ChartRenderError> {
    // A panic inside the plotting backend only fails this chart
    let drawn = catch_unwind(AssertUnwindSafe(|| match kind {
        ChartKind::LineReleaseVsBoxOffice => draw_line(records, path),
        ChartKind::PieShareByYear => draw_pie(records, path),
        ChartKind::BarTopAvgTicketPrice => draw_top_bars(
            kind,
            &top_n_by(records, Field::AvgTicketPrice, TOP_N),
            "Average ticket price (RMB)",
            path,
        ),
        ChartKind::BarTopAvgAudience => draw_top_bars(
            kind,
            &top_n_by(records, Field::AvgAudience, TOP_N),
            "Average audience per showing",
            path,
        ),
        ChartKind::ScatterPriceVsBoxOffice => draw_scatter(records, path),
    }));

    match drawn {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(ChartRenderError::new(kind, format!("{:#}", err))),
        Err(_) => Err(ChartRenderError::new(kind, "plotting backend panicked")),
    }
}

fn draw_line(records: &[MovieRecord], path: &Path) -> Result<()> {
    let kind = ChartKind::LineReleaseVsBoxOffice;
    let points = line_points(records);

    let days: Vec<i32> = points.iter().map(|p| p.date.num_days_from_ce()).collect();
    let x_range = match (days.first(), days.last()) {
        (Some(first), Some(last)) => {
            let pad = ((last - first) / 20).max(15);
            (first - pad)..(last + pad)
        }
        _ => 0..1,
    };
    let y_range = padded_range(points.iter().map(|p| p.box_office), true);

    let root = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(kind.title(), (FONT, 24))
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(80)
        .build_cartesian_2d(x_range, y_range)?;

    chart
        .configure_mesh()
        .x_desc("Release date")
        .y_desc("Total box office (10k RMB)")
        .x_label_formatter(&|d| {
            NaiveDate::from_num_days_from_ce_opt(*d)
                .map(|date| date.format("%Y-%m-%d").to_string())
                .unwrap_or_default()
        })
        .draw()?;

    chart.draw_series(LineSeries::new(
        points.iter().map(|p| (p.date.num_days_from_ce(), p.box_office)),
        &BLUE,
    ))?;

    chart.draw_series(points.iter().map(|p| {
        EmptyElement::at((p.date.num_days_from_ce(), p.box_office))
            + Circle::new((0, 0), 3, BLUE.filled())
            + Text::new(p.title.to_string(), (5, -14), (FONT, 12).into_font())
    }))?;

    root.present()?;
    Ok(())
}

fn draw_pie(records: &[MovieRecord], path: &Path) -> Result<()> {
    let shares = year_shares(records);

    let root = BitMapBackend::new(path, PIE_SIZE).into_drawing_area();
    root.fill(&WHITE)?;
    let root = root.titled(ChartKind::PieShareByYear.title(), (FONT, 24))?;

    let (width, height) = root.dim_in_pixel();
    let center = (width as i32 / 2, height as i32 / 2);
    let radius = (width.min(height) as f64) * 0.35;

    // Clockwise from 12 o'clock
    let mut start = -PI / 2.0;
    for (idx, share) in shares.iter().enumerate() {
        let sweep = share.percentage / 100.0 * 2.0 * PI;
        let steps = ((sweep / (PI / 180.0)).ceil() as usize).max(1);

        let mut wedge = vec![center];
        wedge.extend((0..=steps).map(|i| {
            let angle = start + sweep * i as f64 / steps as f64;
            (
                center.0 + (radius * angle.cos()).round() as i32,
                center.1 + (radius * angle.sin()).round() as i32,
            )
        }));
        root.draw(&Polygon::new(wedge, Palette99::pick(idx).filled()))?;

        let mid = start + sweep / 2.0;
        let label_at = (
            center.0 + (radius * 1.12 * mid.cos()).round() as i32 - 30,
            center.1 + (radius * 1.12 * mid.sin()).round() as i32 - 8,
        );
        root.draw(&Text::new(share.label(), label_at, (FONT, 16).into_font()))?;

        start += sweep;
    }

    root.present()?;
    Ok(())
}

fn draw_top_bars(kind: ChartKind, bars: &[(&str, f64)], y_desc: &str, path: &Path) -> Result<()> {
    let slots = bars.len().max(1) as i32;
    let y_range = padded_range(bars.iter().map(|(_, v)| *v), true);

    let root = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(kind.title(), (FONT, 24))
        .margin(15)
        .x_label_area_size(60)
        .y_label_area_size(80)
        .build_cartesian_2d((0..slots).into_segmented(), y_range)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(bars.len().max(1))
        .x_label_formatter(&|v| match v {
            SegmentValue::CenterOf(i) | SegmentValue::Exact(i) => bars
                .get(*i as usize)
                .map(|(title, _)| title.to_string())
                .unwrap_or_default(),
            SegmentValue::Last => String::new(),
        })
        .x_desc("Movie")
        .y_desc(y_desc)
        .draw()?;

    chart.draw_series(bars.iter().enumerate().map(|(i, (_, value))| {
        let i = i as i32;
        let mut bar = Rectangle::new(
            [(SegmentValue::Exact(i), 0.0), (SegmentValue::Exact(i + 1), *value)],
            BLUE.filled(),
        );
        bar.set_margin(0, 0, 8, 8);
        bar
    }))?;

    root.present()?;
    Ok(())
}

fn draw_scatter(records: &[MovieRecord], path: &Path) -> Result<()> {
    let kind = ChartKind::ScatterPriceVsBoxOffice;
    let points = scatter_points(records);
    let notable = notable_titles(records, NOTABLE_N);

    let x_range = padded_range(points.iter().map(|p| p.price), false);
    let y_range = padded_range(points.iter().map(|p| p.box_office), true);

    let root = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(kind.title(), (FONT, 24))
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(80)
        .build_cartesian_2d(x_range, y_range)?;

    chart
        .configure_mesh()
        .x_desc("Average ticket price (RMB)")
        .y_desc("Total box office (10k RMB)")
        .draw()?;

    chart.draw_series(
        points
            .iter()
            .map(|p| Circle::new((p.price, p.box_office), 4, BLUE.filled())),
    )?;

    chart.draw_series(
        points
            .iter()
            .filter(|p| notable.contains(&p.title))
            .map(|p| {
                EmptyElement::at((p.price, p.box_office))
                    + Text::new(p.title.to_string(), (6, -14), (FONT, 12).into_font())
            }),
    )?;

    root.present()?;
    Ok(())
}
