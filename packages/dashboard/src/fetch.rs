//! One fetch cycle: listing plus summary, reconciled into a [`Snapshot`].

use std::sync::Arc;
use std::time::Duration;

use residue_map_analytics::{AggregateOptions, Snapshot, aggregate};
use residue_map_normalize::listing::{normalize_summary, parse_location_snapshots};
use residue_map_report_models::{FleetSummary, LocationAggregate, LocationSnapshot, RawReport};
use residue_map_transport::registry::{self, Endpoint, EndpointGroup};
use residue_map_transport::{RawResponse, RequestSpec, Transport, TransportError};

use crate::DashboardError;

/// Fetches and reconciles the location listing and fleet summary.
pub struct SnapshotSource {
    transport: Arc<Transport>,
    locations: Vec<Endpoint>,
    summary: Vec<Endpoint>,
    deadline: Option<Duration>,
}

impl SnapshotSource {
    /// Builds a source over the enabled endpoints of both groups.
    #[must_use]
    pub fn new(transport: Arc<Transport>, locations: &EndpointGroup, summary: &EndpointGroup) -> Self {
        Self {
            transport,
            locations: locations.enabled_endpoints(),
            summary: summary.enabled_endpoints(),
            deadline: None,
        }
    }

    /// Builds a source from the compiled-in registry with environment
    /// overrides applied.
    ///
    /// # Errors
    ///
    /// Returns [`DashboardError::Config`] if a required endpoint group is
    /// missing from the registry.
    pub fn from_env(transport: Arc<Transport>) -> Result<Self, DashboardError> {
        let locations = required_group(registry::LOCATIONS)?;
        let summary = required_group(registry::SUMMARY)?;
        Ok(Self::new(transport, &locations, &summary))
    }

    /// Bounds each request of a cycle by `deadline`, across all of its
    /// fallback attempts. `None` waits indefinitely.
    #[must_use]
    pub const fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Runs one fetch cycle.
    ///
    /// The listing and summary requests are issued concurrently. A failed
    /// summary request degrades to a zero-state summary; a failed listing
    /// fails the cycle.
    ///
    /// # Errors
    ///
    /// Returns [`DashboardError::Transport`] if the listing could not be
    /// fetched, or [`DashboardError::Normalize`] if it could not be read.
    pub async fn fetch(&self, options: &AggregateOptions) -> Result<Snapshot, DashboardError> {
        let (listing, summary) = tokio::join!(
            self.get(registry::LOCATIONS, &self.locations),
            self.get(registry::SUMMARY, &self.summary),
        );

        let listing = parse_location_snapshots(&listing?.body)?;

        let summary = match summary {
            Ok(response) => match normalize_summary(&response.body) {
                Ok(summary) => Some(summary),
                Err(e) => {
                    log::warn!("Unreadable summary response, using zero state: {e}");
                    None
                }
            },
            Err(e) => {
                log::warn!("Summary unavailable, using zero state: {e}");
                None
            }
        };

        Ok(reconcile(listing, summary, options))
    }

    async fn get(&self, label: &str, endpoints: &[Endpoint]) -> Result<RawResponse, TransportError> {
        let request = RequestSpec::get(label);
        match self.deadline {
            Some(deadline) => {
                self.transport
                    .fetch_with_deadline(&request, endpoints, deadline)
                    .await
            }
            None => self.transport.fetch_with_fallback(&request, endpoints).await,
        }
    }
}

pub(crate) fn required_group(id: &str) -> Result<EndpointGroup, DashboardError> {
    registry::group_from_env(id).ok_or_else(|| DashboardError::Config {
        message: format!("no '{id}' endpoint group is registered"),
    })
}

/// Combines listing records and the summary endpoint's record into one
/// snapshot.
///
/// When every listing record carries its complete member report list, the
/// reports are flattened and the whole snapshot is recomputed locally, and
/// the summary record is ignored. Otherwise the listing records are used
/// as-is and the summary record (or a zero-state summary if there is none)
/// supplies the fleet statistics.
#[must_use]
pub fn reconcile(
    listing: Vec<LocationSnapshot>,
    summary: Option<FleetSummary>,
    options: &AggregateOptions,
) -> Snapshot {
    let carries_reports = !listing.is_empty() && listing.iter().all(has_complete_reports);

    if carries_reports {
        let reports: Vec<RawReport> = listing
            .into_iter()
            .flat_map(|record| record.member_reports.unwrap_or_default())
            .collect();
        log::debug!("Recomputing snapshot from {} member report(s)", reports.len());
        return aggregate(&reports, options);
    }

    Snapshot {
        locations: listing.into_iter().map(LocationAggregate::from).collect(),
        summary: summary.unwrap_or_else(FleetSummary::empty),
    }
}

/// A record's member reports can stand in for its figures only if there
/// are some and, when the service states a count, they match it.
fn has_complete_reports(record: &LocationSnapshot) -> bool {
    record.member_reports.as_ref().is_some_and(|reports| {
        !reports.is_empty()
            && (record.total_reports == 0
                || u64::try_from(reports.len()).is_ok_and(|n| n == record.total_reports))
    })
}
