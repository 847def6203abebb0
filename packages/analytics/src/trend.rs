//! Day-bucketed trend series, week-over-week change, and the helpers the
//! dashboard uses to draw them.

use std::collections::BTreeMap;

use chrono::{DateTime, Days, NaiveDate, Utc};
use residue_map_report_models::RawReport;
use serde::Serialize;

/// Length of each trailing window used by [`change_rate`].
pub const WINDOW_DAYS: u64 = 7;

/// Counts reports per UTC calendar day.
#[must_use]
pub fn trend_series(reports: &[RawReport]) -> BTreeMap<NaiveDate, u64> {
    let mut trend = BTreeMap::new();
    for report in reports {
        *trend.entry(report.observed_at.date_naive()).or_insert(0) += 1;
    }
    trend
}

/// Percentage change between the two trailing 7-day windows anchored at
/// `today`.
///
/// The recent window covers `today` and the six days before it; the
/// previous window covers the seven days before that. Days missing from
/// the series count as zero, so a short history simply yields partial
/// windows. Returns `0.0` if either window is empty.
#[must_use]
pub fn change_rate(trend: &BTreeMap<NaiveDate, u64>, today: NaiveDate) -> f64 {
    let recent = window_sum(trend, today, 0);
    let previous = window_sum(trend, today, WINDOW_DAYS);

    if recent == 0 || previous == 0 {
        return 0.0;
    }

    #[allow(clippy::cast_precision_loss)]
    let (recent, previous) = (recent as f64, previous as f64);
    (recent - previous) / previous * 100.0
}

/// Sums the [`WINDOW_DAYS`]-day window ending `offset_days` before `today`.
fn window_sum(trend: &BTreeMap<NaiveDate, u64>, today: NaiveDate, offset_days: u64) -> u64 {
    let Some(end) = today.checked_sub_days(Days::new(offset_days)) else {
        return 0;
    };
    let Some(start) = end.checked_sub_days(Days::new(WINDOW_DAYS - 1)) else {
        return 0;
    };
    trend.range(start..=end).map(|(_, count)| count).sum()
}

/// An SVG sparkline of a trend series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Sparkline {
    /// SVG path data (`M x y L x y ...`), empty for an empty series.
    pub path: String,
    /// SVG `viewBox` attribute value.
    pub view_box: String,
}

/// Vertical padding, in pixels, kept above and below the line.
const SPARKLINE_PADDING: f64 = 3.0;

/// Builds a sparkline for `trend` in a `width` x `height` box.
///
/// Points are spread evenly in date order and scaled between the series
/// minimum and maximum. A flat series is drawn along the bottom padding.
#[must_use]
pub fn sparkline(trend: &BTreeMap<NaiveDate, u64>, width: f64, height: f64) -> Sparkline {
    let view_box = format!("0 0 {width} {height}");
    if trend.is_empty() {
        return Sparkline {
            path: String::new(),
            view_box,
        };
    }

    #[allow(clippy::cast_precision_loss)]
    let values: Vec<f64> = trend.values().map(|v| *v as f64).collect();
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = if max - min > 0.0 { max - min } else { 1.0 };

    #[allow(clippy::cast_precision_loss)]
    let spacing = width / (values.len().saturating_sub(1).max(1) as f64);
    let usable = 2.0f64.mul_add(-SPARKLINE_PADDING, height);

    let mut path = String::new();
    for (i, value) in values.iter().enumerate() {
        #[allow(clippy::cast_precision_loss)]
        let x = i as f64 * spacing;
        let y = height - ((value - min) / range) * usable - SPARKLINE_PADDING;
        if i > 0 {
            path.push(' ');
        }
        let command = if i == 0 { 'M' } else { 'L' };
        path.push_str(&format!("{command} {x:.2} {y:.2}"));
    }

    Sparkline { path, view_box }
}

/// The span of observation times covered by a set of reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateRange {
    /// Exactly one report.
    Single(DateTime<Utc>),
    /// Two or more reports, first and last calendar day.
    Span(NaiveDate, NaiveDate),
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Single(at) => write!(f, "{}", at.format("%d/%m/%Y %H:%M:%S")),
            Self::Span(first, last) => {
                write!(f, "{} - {}", first.format("%d/%m/%Y"), last.format("%d/%m/%Y"))
            }
        }
    }
}

/// Returns the observation range of `reports`, or `None` if there are none.
#[must_use]
pub fn date_range(reports: &[RawReport]) -> Option<DateRange> {
    let first = reports.iter().map(|r| r.observed_at).min()?;
    let last = reports.iter().map(|r| r.observed_at).max()?;
    if reports.len() == 1 {
        return Some(DateRange::Single(first));
    }
    Some(DateRange::Span(first.date_naive(), last.date_naive()))
}
