//! Cooperative frame loop.
//!
//! Frames are paced by a tokio interval on the calling task. A fetch cycle
//! runs concurrently on the same task: the loop keeps drawing the last
//! known snapshot while the fetch is in flight and applies the result on
//! the tick it resolves. Nothing here spawns threads.

use std::future::Future;

use residue_map_analytics::Snapshot;
use tokio::time::MissedTickBehavior;

use crate::DashboardError;
use crate::lifecycle::{Dashboard, FetchDisposition, Phase, RequestToken};
use crate::surface::RenderSurface;

/// Outcome of one loop run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopReport {
    /// Scheduler ticks elapsed.
    pub ticks: u64,
    /// Frames actually presented (only while rendering).
    pub presented: u64,
    /// What happened to the fetch result, or `None` if it had not resolved
    /// when the loop ended.
    pub fetch: Option<FetchDisposition>,
}

/// Runs `ticks` frame ticks with no fetch in flight.
pub async fn run_frames(
    dashboard: &mut Dashboard,
    surface: &mut dyn RenderSurface,
    ticks: u64,
) -> LoopReport {
    drive(dashboard, surface, None, std::future::pending(), ticks).await
}

/// Runs `ticks` frame ticks while `fetch` is in flight.
///
/// The loop stops early if the dashboard unmounts. A fetch still pending
/// when the loop ends is dropped.
pub async fn run_with_fetch<F>(
    dashboard: &mut Dashboard,
    surface: &mut dyn RenderSurface,
    fetch: F,
    ticks: u64,
) -> LoopReport
where
    F: Future<Output = Result<Snapshot, DashboardError>>,
{
    let token = dashboard.begin_fetch();
    drive(dashboard, surface, Some(token), fetch, ticks).await
}

async fn drive<F>(
    dashboard: &mut Dashboard,
    surface: &mut dyn RenderSurface,
    token: Option<RequestToken>,
    fetch: F,
    ticks: u64,
) -> LoopReport
where
    F: Future<Output = Result<Snapshot, DashboardError>>,
{
    let mut interval = tokio::time::interval(dashboard.config().frame_interval());
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tokio::pin!(fetch);

    let mut report = LoopReport {
        ticks: 0,
        presented: 0,
        fetch: None,
    };

    while report.ticks < ticks && dashboard.phase() != Phase::Unmounted {
        tokio::select! {
            result = &mut fetch, if token.is_some() && report.fetch.is_none() => {
                if let Some(token) = token {
                    report.fetch = Some(dashboard.complete_fetch(token, result));
                }
            }
            _ = interval.tick() => {
                report.ticks += 1;
                sync_size(dashboard, &*surface);
                if let Some(frame) = dashboard.frame() {
                    surface.present(&frame);
                    report.presented += 1;
                }
            }
        }
    }

    if token.is_some() && report.fetch.is_none() {
        log::debug!("Frame loop ended with fetch still in flight");
    }
    report
}

/// Forwards surface size changes to the dashboard as resize events.
fn sync_size(dashboard: &mut Dashboard, surface: &dyn RenderSurface) {
    let current = dashboard.viewport();
    let actual = surface.viewport();
    #[allow(clippy::float_cmp)]
    let changed = current.width != actual.width || current.height != actual.height;
    if changed {
        dashboard.resize(actual.width, actual.height);
    }
}
