//! Fleet-wide summary statistics.

use chrono::NaiveDate;
use residue_map_report_models::{FleetSummary, LocationAggregate, NO_DATA, RawReport};

use crate::trend::{change_rate, trend_series};

/// Folds per-location aggregates and the raw report stream into a
/// [`FleetSummary`].
///
/// Critical and cleanest areas are the locations with the most and fewest
/// reports; ties go to the location encountered first. An empty input
/// yields [`FleetSummary::empty`].
#[must_use]
pub fn summarize(
    locations: &[LocationAggregate],
    reports: &[RawReport],
    clean_category: &str,
    today: NaiveDate,
) -> FleetSummary {
    if reports.is_empty() && locations.is_empty() {
        return FleetSummary::empty();
    }

    let (critical_area, reports_in_critical_area) = extreme_area(locations, |a, b| a > b);
    let (cleanest_area, cleanest_area_reports) = extreme_area(locations, |a, b| a < b);

    let total_reports = reports.len() as u64;
    let dirty_count = reports.iter().filter(|r| r.is_dirty(clean_category)).count() as u64;
    let clean_count = total_reports - dirty_count;

    let trend = trend_series(reports);
    let change_rate = change_rate(&trend, today);

    FleetSummary {
        total_reports,
        total_locations: locations.len() as u64,
        critical_area,
        reports_in_critical_area,
        cleanest_area,
        cleanest_area_reports,
        residue_rate: residue_rate(dirty_count, total_reports),
        trend_series: trend,
        change_rate,
        clean_count,
        dirty_count,
    }
}

/// Percentage of `dirty` out of `total`, `0.0` when `total` is zero.
#[must_use]
pub fn residue_rate(dirty: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let rate = dirty as f64 / total as f64 * 100.0;
    rate
}

/// Formats a percentage with one decimal (e.g. `"42.9%"`).
#[must_use]
pub fn format_percent(value: f64) -> String {
    if value.is_finite() {
        format!("{value:.1}%")
    } else {
        NO_DATA.to_string()
    }
}

/// Returns the label and count of the location that `better` prefers,
/// keeping the earliest on ties.
fn extreme_area(
    locations: &[LocationAggregate],
    better: impl Fn(u64, u64) -> bool,
) -> (String, u64) {
    let mut best: Option<&LocationAggregate> = None;
    for location in locations {
        if best.is_none_or(|b| better(location.total_reports, b.total_reports)) {
            best = Some(location);
        }
    }
    best.map_or_else(
        || (NO_DATA.to_string(), 0),
        |b| (b.location_label.clone(), b.total_reports),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grouping::group_by_location;
    use chrono::{TimeZone, Utc};

    fn report(id: &str, location: &str, category: &str, day: u32) -> RawReport {
        RawReport {
            id: id.to_string(),
            lat: -23.0,
            lon: -46.0,
            category: category.to_string(),
            observed_at: Utc.with_ymd_and_hms(2025, 3, day, 9, 0, 0).unwrap(),
            location_label: location.to_string(),
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 14).unwrap()
    }

    #[test]
    fn empty_input_is_zero_state() {
        let summary = summarize(&[], &[], "none", today());
        assert_eq!(summary, FleetSummary::empty());
    }

    #[test]
    fn critical_and_cleanest_areas() {
        let reports = vec![
            report("1", "Santos", "Garrafas PET", 1),
            report("2", "Ubatuba", "none", 2),
            report("3", "Santos", "Redes de Pesca", 3),
            report("4", "Ilhabela", "Outros", 4),
        ];
        let locations = group_by_location(&reports);
        let summary = summarize(&locations, &reports, "none", today());

        assert_eq!(summary.total_reports, 4);
        assert_eq!(summary.total_locations, 3);
        assert_eq!(summary.critical_area, "Santos");
        assert_eq!(summary.reports_in_critical_area, 2);
        // Ubatuba and Ilhabela tie at 1; Ubatuba came first.
        assert_eq!(summary.cleanest_area, "Ubatuba");
        assert_eq!(summary.cleanest_area_reports, 1);
    }

    #[test]
    fn critical_tie_goes_to_first_location() {
        let reports = vec![
            report("1", "Ilhabela", "none", 1),
            report("2", "Santos", "none", 1),
        ];
        let locations = group_by_location(&reports);
        let summary = summarize(&locations, &reports, "none", today());
        assert_eq!(summary.critical_area, "Ilhabela");
        assert_eq!(summary.cleanest_area, "Ilhabela");
    }

    #[test]
    fn residue_rate_counts_non_clean_reports() {
        let reports = vec![
            report("1", "Santos", "Garrafas PET", 1),
            report("2", "Santos", "none", 1),
            report("3", "Santos", "Outros", 1),
            report("4", "Santos", "none", 1),
        ];
        let locations = group_by_location(&reports);
        let summary = summarize(&locations, &reports, "none", today());
        assert_eq!(summary.clean_count, 2);
        assert_eq!(summary.dirty_count, 2);
        assert!((summary.residue_rate - 50.0).abs() < 1e-9);
    }

    #[test]
    fn clean_category_is_configurable() {
        let reports = vec![report("1", "Santos", "clean", 1)];
        let locations = group_by_location(&reports);
        let summary = summarize(&locations, &reports, "clean", today());
        assert_eq!(summary.dirty_count, 0);
        assert!(summary.residue_rate.abs() < f64::EPSILON);
    }

    #[test]
    fn formats_percentages() {
        assert_eq!(format_percent(42.857), "42.9%");
        assert_eq!(format_percent(0.0), "0.0%");
        assert_eq!(format_percent(f64::NAN), NO_DATA);
    }
}
