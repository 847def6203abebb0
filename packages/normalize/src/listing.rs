//! Listing and summary endpoint normalization.
//!
//! Both endpoints return structured JSON. Individual listing records that
//! fail to decode are skipped with a warning rather than failing the
//! whole listing.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate};
use residue_map_report_models::{
    FleetSummary, LocationAggregate, LocationSnapshot, NO_DATA, SummarySnapshot,
};

use crate::{NormalizeError, json_kind};

/// Parses a listing body into wire records.
///
/// Accepts a bare array of records, or an object with a `locations` array.
///
/// # Errors
///
/// Returns [`NormalizeError::InvalidResponseShape`] if the body is not JSON
/// or contains no record array.
pub fn parse_location_snapshots(body: &str) -> Result<Vec<LocationSnapshot>, NormalizeError> {
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| NormalizeError::InvalidResponseShape {
            message: format!("location listing is not JSON: {e}"),
        })?;

    let records = match value {
        serde_json::Value::Array(records) => records,
        serde_json::Value::Object(mut map) => match map.remove("locations") {
            Some(serde_json::Value::Array(records)) => records,
            _ => {
                return Err(NormalizeError::InvalidResponseShape {
                    message: "location listing object has no 'locations' array".to_string(),
                });
            }
        },
        other => {
            return Err(NormalizeError::InvalidResponseShape {
                message: format!("location listing is {}", json_kind(&other)),
            });
        }
    };

    let total = records.len();
    let snapshots: Vec<LocationSnapshot> = records
        .into_iter()
        .enumerate()
        .filter_map(|(i, record)| match serde_json::from_value::<LocationSnapshot>(record) {
            Ok(snapshot) => {
                if !snapshot.has_coordinates() {
                    log::warn!(
                        "Location record {i} ({:?}) has no coordinate and will not be drawn",
                        snapshot.location_label
                    );
                }
                Some(snapshot)
            }
            Err(e) => {
                log::warn!("Skipping location record {i}: {e}");
                None
            }
        })
        .collect();

    if snapshots.len() < total {
        log::warn!(
            "Decoded {} of {total} location records",
            snapshots.len()
        );
    }

    Ok(snapshots)
}

/// Parses a listing body straight into [`LocationAggregate`]s, using the
/// service's own per-location figures.
///
/// # Errors
///
/// See [`parse_location_snapshots`].
pub fn normalize_locations(body: &str) -> Result<Vec<LocationAggregate>, NormalizeError> {
    Ok(parse_location_snapshots(body)?
        .into_iter()
        .map(LocationAggregate::from)
        .collect())
}

/// Parses a summary body into a [`FleetSummary`].
///
/// Missing fields default to zero and missing area labels to [`NO_DATA`].
/// Trend keys that are not readable dates are dropped.
///
/// # Errors
///
/// * [`NormalizeError::InvalidResponseShape`] if the body is not a JSON
///   object.
/// * [`NormalizeError::Json`] if a present field has the wrong type.
pub fn normalize_summary(body: &str) -> Result<FleetSummary, NormalizeError> {
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| NormalizeError::InvalidResponseShape {
            message: format!("summary is not JSON: {e}"),
        })?;

    if !value.is_object() {
        return Err(NormalizeError::InvalidResponseShape {
            message: format!("summary is {}", json_kind(&value)),
        });
    }

    let snapshot: SummarySnapshot = serde_json::from_value(value)?;
    Ok(summary_from_snapshot(snapshot))
}

/// Converts a wire summary into the canonical [`FleetSummary`].
#[must_use]
pub fn summary_from_snapshot(snapshot: SummarySnapshot) -> FleetSummary {
    FleetSummary {
        total_reports: snapshot.total_reports,
        total_locations: snapshot.total_locations,
        critical_area: area_or_sentinel(snapshot.critical_area),
        reports_in_critical_area: snapshot.reports_in_critical_area,
        cleanest_area: area_or_sentinel(snapshot.cleanest_area),
        cleanest_area_reports: snapshot.cleanest_area_reports,
        residue_rate: finite_or_zero(snapshot.residue_rate),
        trend_series: parse_trend(snapshot.trend_series),
        change_rate: finite_or_zero(snapshot.change_rate),
        clean_count: snapshot.clean_count,
        dirty_count: snapshot.dirty_count,
    }
}

fn area_or_sentinel(area: Option<String>) -> String {
    area.filter(|a| !a.trim().is_empty())
        .unwrap_or_else(|| NO_DATA.to_string())
}

const fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

/// Parses trend keys into calendar dates, summing keys that land on the
/// same day and dropping keys that cannot be read.
fn parse_trend(raw: BTreeMap<String, u64>) -> BTreeMap<NaiveDate, u64> {
    let mut trend = BTreeMap::new();
    for (key, count) in raw {
        match parse_trend_date(&key) {
            Some(date) => *trend.entry(date).or_insert(0) += count,
            None => log::warn!("Dropping unreadable trend key '{key}'"),
        }
    }
    trend
}

/// Reads `YYYY-MM-DD` or an RFC 3339 timestamp (taking its UTC date).
#[must_use]
pub fn parse_trend_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date);
    }
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.naive_utc().date())
}
