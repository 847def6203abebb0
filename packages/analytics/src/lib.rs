#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Report aggregation engine.
//!
//! Groups raw report events by location label and derives per-location
//! distributions plus fleet-wide statistics. Every call recomputes the
//! whole [`Snapshot`] from scratch; there is no incremental path.
//!
//! Aggregation is total: empty or odd input produces a zeroed summary,
//! never an error.

pub mod grouping;
pub mod summary;
pub mod trend;

use chrono::{DateTime, Utc};
use residue_map_report_models::{
    DEFAULT_CLEAN_CATEGORY, FleetSummary, LocationAggregate, RawReport,
};
use serde::Serialize;

/// The result of one aggregation pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Per-location rollups, in order of first appearance.
    pub locations: Vec<LocationAggregate>,
    /// Fleet-wide statistics.
    pub summary: FleetSummary,
}

impl Snapshot {
    /// A snapshot with no locations and a zero-state summary.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            locations: Vec::new(),
            summary: FleetSummary::empty(),
        }
    }

    /// Returns `true` if there is nothing to render.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }
}

/// Inputs to [`aggregate`] other than the reports themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateOptions {
    /// Category tag meaning "no residue".
    pub clean_category: String,
    /// Anchor for the week-over-week windows.
    pub now: DateTime<Utc>,
}

impl AggregateOptions {
    /// Options anchored at the current time with the default clean tag.
    #[must_use]
    pub fn now() -> Self {
        Self {
            clean_category: DEFAULT_CLEAN_CATEGORY.to_string(),
            now: Utc::now(),
        }
    }
}

/// Aggregates `reports` into per-location rollups and a fleet summary.
#[must_use]
pub fn aggregate(reports: &[RawReport], options: &AggregateOptions) -> Snapshot {
    let locations = grouping::group_by_location(reports);
    let summary = summary::summarize(
        &locations,
        reports,
        &options.clean_category,
        options.now.date_naive(),
    );

    log::debug!(
        "Aggregated {} report(s) into {} location(s)",
        summary.total_reports,
        locations.len()
    );

    Snapshot { locations, summary }
}
