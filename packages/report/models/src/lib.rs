#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Pollution report types shared across the residue map workspace.
//!
//! Raw [`RawReport`] events come from the read APIs, are grouped into
//! [`LocationAggregate`]s by location label and rolled up into a single
//! [`FleetSummary`] per fetch cycle. On-demand image submissions produce a
//! [`ClassificationOutcome`].
//!
//! The `*Snapshot` types are the wire records of the listing and summary
//! endpoints. They accept both the canonical camelCase names and the legacy
//! names still emitted by older deployments.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Sentinel area label used when a snapshot has no reports.
pub const NO_DATA: &str = "N/A";

/// Category tag that marks a report as free of residue.
pub const DEFAULT_CLEAN_CATEGORY: &str = "none";

/// One observed pollution event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawReport {
    /// Opaque unique identifier.
    pub id: String,
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
    /// Category tag from an open set (e.g. `"Redes de Pesca"`, `"none"`).
    #[serde(alias = "type")]
    pub category: String,
    /// When the report was observed. See [`parse_timestamp`] for the
    /// accepted forms.
    #[serde(alias = "timestamp", deserialize_with = "deserialize_timestamp")]
    pub observed_at: DateTime<Utc>,
    /// Human location label, used as the grouping key.
    #[serde(alias = "location")]
    pub location_label: String,
}

/// Parses an ISO 8601 timestamp.
///
/// Timestamps with an offset are converted to UTC. Timestamps without one,
/// and bare dates, are taken as UTC.
#[must_use]
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = s.parse::<DateTime<Utc>>() {
        return Some(dt);
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_timestamp(&s)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{s}'")))
}

impl RawReport {
    /// Returns `true` if the coordinate lies within the WGS84 degree ranges.
    #[must_use]
    pub fn has_valid_coordinates(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }

    /// Returns `true` if this report's category indicates contamination.
    #[must_use]
    pub fn is_dirty(&self, clean_category: &str) -> bool {
        self.category != clean_category
    }
}

/// Per-location rollup of reports sharing a location label.
///
/// Invariant: the sum of `category_distribution` values equals
/// `total_reports`, and equals `member_reports.len()` whenever member
/// reports were available to the aggregator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationAggregate {
    /// Grouping key, unique within a snapshot.
    pub location_label: String,
    /// Latitude of the first report seen for this label.
    pub lat: f64,
    /// Longitude of the first report seen for this label.
    pub lon: f64,
    /// Number of reports at this location.
    pub total_reports: u64,
    /// Report count per category.
    pub category_distribution: BTreeMap<String, u64>,
    /// Most frequent category (first encountered wins ties).
    pub dominant_category: String,
    /// Reports at this location, in arrival order.
    pub member_reports: Vec<RawReport>,
}

/// Fleet-wide statistics for one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetSummary {
    /// Total reports across all locations.
    pub total_reports: u64,
    /// Number of distinct location labels.
    pub total_locations: u64,
    /// Location with the most reports, or [`NO_DATA`].
    pub critical_area: String,
    /// Report count of the critical area.
    pub reports_in_critical_area: u64,
    /// Location with the fewest reports, or [`NO_DATA`].
    pub cleanest_area: String,
    /// Report count of the cleanest area.
    pub cleanest_area_reports: u64,
    /// Percentage (0-100) of reports indicating contamination.
    pub residue_rate: f64,
    /// Reports per calendar day, chronologically ordered.
    pub trend_series: BTreeMap<NaiveDate, u64>,
    /// Percentage change between the last two trailing 7-day windows.
    pub change_rate: f64,
    /// Reports tagged with the clean category.
    pub clean_count: u64,
    /// Reports with any other category.
    pub dirty_count: u64,
}

impl FleetSummary {
    /// The zero-state summary: all counters 0 and sentinel areas.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            total_reports: 0,
            total_locations: 0,
            critical_area: NO_DATA.to_string(),
            reports_in_critical_area: 0,
            cleanest_area: NO_DATA.to_string(),
            cleanest_area_reports: 0,
            residue_rate: 0.0,
            trend_series: BTreeMap::new(),
            change_rate: 0.0,
            clean_count: 0,
            dirty_count: 0,
        }
    }

    /// Returns `true` if this summary describes an empty dataset.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.total_reports == 0
    }
}

impl Default for FleetSummary {
    fn default() -> Self {
        Self::empty()
    }
}

/// Whether an endpoint is the preferred service or a degraded-mode backup.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EndpointRole {
    /// The preferred endpoint.
    Primary,
    /// A backup endpoint, used only when earlier endpoints failed.
    Fallback,
}

/// Which endpoint ultimately served a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServedBy {
    /// Endpoint identifier from the registry.
    pub endpoint_id: String,
    /// URL that answered.
    pub url: String,
    /// Primary or fallback.
    pub role: EndpointRole,
    /// 0-based position in the attempted order.
    pub position: usize,
}

impl ServedBy {
    /// Returns `true` if the request was not served by the first endpoint.
    #[must_use]
    pub const fn is_degraded(&self) -> bool {
        self.position > 0 || matches!(self.role, EndpointRole::Fallback)
    }
}

/// Canonical result of one image classification request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationOutcome {
    /// `true` if contamination is present in the image.
    pub plastic_detected: bool,
    /// Confidence in `[0.0, 1.0]`.
    pub confidence_score: f64,
    /// Human label of the verdict as the service reported it.
    pub label: String,
    /// Location label echoed by the service, if any.
    pub location: Option<String>,
    /// Latitude echoed by the service, if parseable.
    pub lat: Option<f64>,
    /// Longitude echoed by the service, if parseable.
    pub lon: Option<f64>,
    /// The originating response, kept for audit and debugging.
    pub raw_diagnostic: serde_json::Value,
    /// Which endpoint answered.
    pub source_endpoint: ServedBy,
}

/// A listing-endpoint record as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationSnapshot {
    /// Location label.
    #[serde(alias = "location", default)]
    pub location_label: String,
    /// Latitude, if the service sent one.
    #[serde(default)]
    pub lat: Option<f64>,
    /// Longitude, if the service sent one.
    #[serde(default)]
    pub lon: Option<f64>,
    /// Report count.
    #[serde(default)]
    pub total_reports: u64,
    /// Member reports, when the service includes them.
    #[serde(alias = "reports", default)]
    pub member_reports: Option<Vec<RawReport>>,
    /// Dominant category as computed by the service.
    #[serde(alias = "mostCommonType", default)]
    pub dominant_category: Option<String>,
    /// Category distribution as computed by the service.
    #[serde(alias = "typeDistribution", default)]
    pub category_distribution: BTreeMap<String, u64>,
}

impl LocationSnapshot {
    /// Returns `true` if both coordinates are present.
    #[must_use]
    pub const fn has_coordinates(&self) -> bool {
        self.lat.is_some() && self.lon.is_some()
    }
}

/// A missing coordinate becomes NaN, which the globe treats as
/// unprojectable, so the location keeps its figures but gets no marker.
impl From<LocationSnapshot> for LocationAggregate {
    fn from(snapshot: LocationSnapshot) -> Self {
        let dominant_category = snapshot
            .dominant_category
            .unwrap_or_else(|| NO_DATA.to_string());
        Self {
            location_label: snapshot.location_label,
            lat: snapshot.lat.unwrap_or(f64::NAN),
            lon: snapshot.lon.unwrap_or(f64::NAN),
            total_reports: snapshot.total_reports,
            category_distribution: snapshot.category_distribution,
            dominant_category,
            member_reports: snapshot.member_reports.unwrap_or_default(),
        }
    }
}

/// A summary-endpoint record as it appears on the wire.
///
/// Trend keys are kept as raw strings; the normalizer parses them into
/// calendar dates and drops any it cannot read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SummarySnapshot {
    /// Total reports.
    pub total_reports: u64,
    /// Total locations.
    pub total_locations: u64,
    /// Critical area label.
    pub critical_area: Option<String>,
    /// Reports in the critical area.
    pub reports_in_critical_area: u64,
    /// Cleanest area label.
    pub cleanest_area: Option<String>,
    /// Reports in the cleanest area.
    pub cleanest_area_reports: u64,
    /// Residue rate percentage.
    pub residue_rate: f64,
    /// Raw trend series keyed by date string.
    #[serde(alias = "trendMap")]
    pub trend_series: BTreeMap<String, u64>,
    /// Week-over-week change percentage.
    pub change_rate: f64,
    /// Clean report count.
    #[serde(alias = "totalCleanReports")]
    pub clean_count: u64,
    /// Dirty report count.
    #[serde(alias = "totalDirtyReports")]
    pub dirty_count: u64,
}

/// Categories with a well-known marker colour on the globe.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum KnownCategory {
    /// PET bottles
    #[strum(serialize = "Garrafas PET")]
    #[serde(rename = "Garrafas PET")]
    PetBottles,
    /// Single-use plastics
    #[strum(serialize = "Plásticos Descartáveis")]
    #[serde(rename = "Plásticos Descartáveis")]
    DisposablePlastics,
    /// Fishing nets
    #[strum(serialize = "Redes de Pesca")]
    #[serde(rename = "Redes de Pesca")]
    FishingNets,
    /// Visible microplastics
    #[strum(serialize = "Microplásticos Visíveis")]
    #[serde(rename = "Microplásticos Visíveis")]
    VisibleMicroplastics,
    /// Anything else
    #[strum(serialize = "Outros")]
    #[serde(rename = "Outros")]
    Other,
}

impl KnownCategory {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::PetBottles,
            Self::DisposablePlastics,
            Self::FishingNets,
            Self::VisibleMicroplastics,
            Self::Other,
        ]
    }
}
