//! Dashboard state machine.
//!
//! ```text
//! Uninitialized ──mount──▶ MountedNoData ──non-empty snapshot──▶ Rendering ◀─┐
//!       │                       │                                  │   └──────┘ new snapshot
//!       └───────────────────────┴──────────── unmount ─────────────┴──▶ Unmounted
//! ```
//!
//! The dashboard exclusively owns the render session and the current
//! snapshot. Fetch results come back through [`Dashboard::complete_fetch`]
//! tagged with the [`RequestToken`] issued when the fetch began, so a
//! result older than one already settled, or one that arrives after
//! unmount, is discarded.

use residue_map_analytics::Snapshot;
use residue_map_globe::Viewport;
use residue_map_report_models::LocationAggregate;
use strum_macros::{AsRefStr, Display};

use crate::DashboardError;
use crate::config::DashboardConfig;
use crate::session::RenderSession;
use crate::surface::{FrameView, Listener};

/// Where the dashboard is in its mount lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum Phase {
    /// Created but not attached to a surface.
    Uninitialized,
    /// Attached, waiting for the first snapshot.
    MountedNoData,
    /// Drawing frames from a snapshot.
    Rendering,
    /// Detached; every resource and listener released. Terminal.
    Unmounted,
}

/// Identifies one fetch cycle. Later cycles compare greater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(u64);

/// Issues monotonically increasing request tokens and remembers the
/// newest one that settled.
#[derive(Debug, Default)]
pub struct RequestSequencer {
    issued: u64,
    settled: u64,
}

impl RequestSequencer {
    pub const fn begin(&mut self) -> RequestToken {
        self.issued += 1;
        RequestToken(self.issued)
    }

    /// Marks `token` settled. Returns `false` if a newer or equal token
    /// has already settled, in which case the result must be dropped.
    pub const fn settle(&mut self, token: RequestToken) -> bool {
        if token.0 <= self.settled {
            return false;
        }
        self.settled = token.0;
        true
    }

    /// Returns `true` if a cycle newer than the last settled one is
    /// still running.
    #[must_use]
    pub const fn in_flight(&self) -> bool {
        self.issued > self.settled
    }
}

/// Progress of the most recent fetch cycle, as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchStatus {
    /// No cycle in flight and the last one succeeded (or none ran).
    Idle,
    /// A cycle is in flight.
    Loading,
    /// The last cycle failed. The previous snapshot is still shown.
    Failed {
        message: String,
    },
}

/// What happened to a completed fetch result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchDisposition {
    Applied,
    Failed,
    /// A newer cycle had already settled.
    Stale,
    /// The dashboard was unmounted while the fetch was in flight.
    Unmounted,
}

pub struct Dashboard {
    config: DashboardConfig,
    phase: Phase,
    viewport: Viewport,
    session: Option<RenderSession>,
    snapshot: Snapshot,
    selection: Option<LocationAggregate>,
    status: FetchStatus,
    listeners: Vec<Listener>,
    sequencer: RequestSequencer,
}

impl Dashboard {
    #[must_use]
    pub fn new(config: DashboardConfig) -> Self {
        Self {
            config,
            phase: Phase::Uninitialized,
            viewport: Viewport::new(0.0, 0.0),
            session: None,
            snapshot: Snapshot::empty(),
            selection: None,
            status: FetchStatus::Idle,
            listeners: Vec::new(),
            sequencer: RequestSequencer::default(),
        }
    }

    /// Attaches to a render surface of the given size.
    ///
    /// Only valid from [`Phase::Uninitialized`]; returns `false` otherwise.
    /// If a non-empty snapshot was applied before mounting, rendering
    /// starts immediately.
    pub fn mount(&mut self, viewport: Viewport) -> bool {
        if self.phase != Phase::Uninitialized {
            log::warn!("Ignoring mount while {}", self.phase);
            return false;
        }

        self.viewport = viewport;
        self.listeners = vec![Listener::PointerClick, Listener::WindowResize];
        self.transition(Phase::MountedNoData);

        if !self.snapshot.is_empty() {
            self.start_rendering();
        }
        true
    }

    /// Starts a fetch cycle and returns its token.
    pub fn begin_fetch(&mut self) -> RequestToken {
        let token = self.sequencer.begin();
        if self.phase != Phase::Unmounted {
            self.status = FetchStatus::Loading;
        }
        log::debug!("Fetch cycle {} started", token.0);
        token
    }

    /// Applies the result of the fetch cycle identified by `token`.
    ///
    /// A failure keeps the current snapshot on screen and records a
    /// user-facing message.
    pub fn complete_fetch(
        &mut self,
        token: RequestToken,
        result: Result<Snapshot, DashboardError>,
    ) -> FetchDisposition {
        if self.phase == Phase::Unmounted {
            log::debug!("Discarding fetch cycle {} after unmount", token.0);
            return FetchDisposition::Unmounted;
        }
        if !self.sequencer.settle(token) {
            log::debug!("Discarding stale fetch cycle {}", token.0);
            return FetchDisposition::Stale;
        }

        let disposition = match result {
            Ok(snapshot) => {
                self.apply_snapshot(snapshot);
                self.status = FetchStatus::Idle;
                FetchDisposition::Applied
            }
            Err(e) => {
                log::error!("Fetch cycle {} failed: {e}", token.0);
                self.status = FetchStatus::Failed {
                    message: e.user_message(),
                };
                FetchDisposition::Failed
            }
        };

        if self.sequencer.in_flight() {
            self.status = FetchStatus::Loading;
        }
        disposition
    }

    /// Replaces the current snapshot.
    ///
    /// While rendering, the old markers are disposed before the new ones
    /// are added. An empty snapshot before any rendering leaves the
    /// dashboard waiting for data.
    pub fn apply_snapshot(&mut self, snapshot: Snapshot) {
        if self.phase == Phase::Unmounted {
            return;
        }

        self.selection = self.selection.take().and_then(|selected| {
            snapshot
                .locations
                .iter()
                .find(|l| l.location_label == selected.location_label)
                .cloned()
        });
        self.snapshot = snapshot;

        match self.phase {
            Phase::MountedNoData if !self.snapshot.is_empty() => self.start_rendering(),
            Phase::Rendering => {
                if let Some(session) = &mut self.session {
                    session.replace_markers(&self.snapshot.locations);
                }
            }
            _ => {}
        }
    }

    fn start_rendering(&mut self) {
        self.session = Some(RenderSession::new(
            &self.config,
            self.viewport,
            &self.snapshot.locations,
        ));
        self.transition(Phase::Rendering);
    }

    /// Advances one frame. Returns `None` unless rendering.
    pub fn frame(&mut self) -> Option<FrameView<'_>> {
        if self.phase != Phase::Rendering {
            return None;
        }
        self.session.as_mut().map(RenderSession::advance)
    }

    /// Handles a surface resize. Snapshot and markers are unaffected.
    pub fn resize(&mut self, width: f64, height: f64) {
        if !self.listens(Listener::WindowResize) {
            return;
        }
        self.viewport.resize(width, height);
        if let Some(session) = &mut self.session {
            session.resize(width, height);
        }
    }

    /// Handles a pointer click. Selects and returns the location under the
    /// pointer; a miss leaves the current selection unchanged.
    pub fn click(&mut self, pointer_x: f64, pointer_y: f64) -> Option<&LocationAggregate> {
        if !self.listens(Listener::PointerClick) {
            return None;
        }
        let hit = self.session.as_ref()?.pick(pointer_x, pointer_y)?.clone();
        log::debug!("Selected {}", hit.location_label);
        self.selection = Some(hit);
        self.selection.as_ref()
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    pub fn orbit(&mut self, dx: f64, dy: f64) {
        if let Some(session) = &mut self.session {
            session.orbit(dx, dy);
        }
    }

    pub fn zoom(&mut self, scale: f64) {
        if let Some(session) = &mut self.session {
            session.zoom(scale);
        }
    }

    /// Stops the frame loop, detaches listeners and disposes the render
    /// session. Safe to call any number of times; returns `true` only for
    /// the call that tore things down.
    pub fn unmount(&mut self) -> bool {
        if self.phase == Phase::Unmounted {
            return false;
        }
        self.listeners.clear();
        if let Some(mut session) = self.session.take() {
            session.dispose();
        }
        self.selection = None;
        self.transition(Phase::Unmounted);
        true
    }

    fn transition(&mut self, next: Phase) {
        log::info!("Dashboard {} -> {next}", self.phase);
        self.phase = next;
    }

    fn listens(&self, listener: Listener) -> bool {
        self.listeners.contains(&listener)
    }

    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub const fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    #[must_use]
    pub const fn selection(&self) -> Option<&LocationAggregate> {
        self.selection.as_ref()
    }

    #[must_use]
    pub const fn status(&self) -> &FetchStatus {
        &self.status
    }

    #[must_use]
    pub fn listeners(&self) -> &[Listener] {
        &self.listeners
    }

    #[must_use]
    pub const fn session(&self) -> Option<&RenderSession> {
        self.session.as_ref()
    }

    #[must_use]
    pub const fn viewport(&self) -> Viewport {
        self.viewport
    }

    #[must_use]
    pub const fn config(&self) -> &DashboardConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use residue_map_report_models::{FleetSummary, NO_DATA};
    use residue_map_transport::TransportError;
    use std::collections::BTreeMap;

    fn location(label: &str, lat: f64, lon: f64) -> LocationAggregate {
        LocationAggregate {
            location_label: label.to_string(),
            lat,
            lon,
            total_reports: 3,
            category_distribution: BTreeMap::from([("Garrafas PET".to_string(), 3)]),
            dominant_category: "Garrafas PET".to_string(),
            member_reports: Vec::new(),
        }
    }

    fn snapshot(locations: Vec<LocationAggregate>) -> Snapshot {
        let mut summary = FleetSummary::empty();
        summary.total_locations = locations.len() as u64;
        summary.total_reports = locations.iter().map(|l| l.total_reports).sum();
        Snapshot { locations, summary }
    }

    fn facing() -> Snapshot {
        snapshot(vec![location("Santos", 0.0, -90.0)])
    }

    fn mounted() -> Dashboard {
        let mut dashboard = Dashboard::new(DashboardConfig::default());
        assert!(dashboard.mount(Viewport::new(800.0, 600.0)));
        dashboard
    }

    fn unavailable() -> DashboardError {
        DashboardError::Transport(TransportError::AllEndpointsUnavailable {
            request: "locations".to_string(),
            failures: Vec::new(),
        })
    }

    #[test]
    fn mount_without_data_creates_no_scene() {
        let mut dashboard = mounted();
        assert_eq!(dashboard.phase(), Phase::MountedNoData);
        assert!(dashboard.session().is_none());
        assert!(dashboard.frame().is_none());
        assert_eq!(
            dashboard.listeners(),
            &[Listener::PointerClick, Listener::WindowResize]
        );
        assert!(!dashboard.mount(Viewport::new(1.0, 1.0)));
    }

    #[test]
    fn empty_snapshot_keeps_waiting() {
        let mut dashboard = mounted();
        dashboard.apply_snapshot(Snapshot::empty());
        assert_eq!(dashboard.phase(), Phase::MountedNoData);
        assert_eq!(dashboard.snapshot().summary.critical_area, NO_DATA);
    }

    #[test]
    fn first_snapshot_starts_rendering() {
        let mut dashboard = mounted();
        dashboard.apply_snapshot(facing());
        assert_eq!(dashboard.phase(), Phase::Rendering);
        let frame = dashboard.frame().unwrap();
        assert_eq!(frame.index, 1);
        assert_eq!(frame.markers.len(), 1);
    }

    #[test]
    fn snapshot_before_mount_renders_on_mount() {
        let mut dashboard = Dashboard::new(DashboardConfig::default());
        dashboard.apply_snapshot(facing());
        assert_eq!(dashboard.phase(), Phase::Uninitialized);
        dashboard.mount(Viewport::new(800.0, 600.0));
        assert_eq!(dashboard.phase(), Phase::Rendering);
    }

    #[test]
    fn new_snapshot_replaces_markers_in_place() {
        let mut dashboard = mounted();
        dashboard.apply_snapshot(facing());
        dashboard.frame();
        dashboard.apply_snapshot(snapshot(vec![
            location("Ubatuba", 10.0, 10.0),
            location("Ilhabela", -10.0, 30.0),
        ]));

        let session = dashboard.session().unwrap();
        assert_eq!(dashboard.phase(), Phase::Rendering);
        assert_eq!(session.frame_index(), 1);
        assert_eq!(session.markers().len(), 2);
        let labels: Vec<&str> = session
            .markers()
            .markers()
            .iter()
            .map(|m| m.aggregate.location_label.as_str())
            .collect();
        assert_eq!(labels, vec!["Ubatuba", "Ilhabela"]);
    }

    #[test]
    fn click_selects_and_miss_keeps_selection() {
        let mut dashboard = mounted();
        dashboard.apply_snapshot(facing());

        let selected = dashboard.click(400.0, 300.0).unwrap();
        assert_eq!(selected.location_label, "Santos");

        assert!(dashboard.click(0.0, 0.0).is_none());
        assert_eq!(dashboard.selection().unwrap().location_label, "Santos");

        dashboard.clear_selection();
        assert!(dashboard.selection().is_none());
    }

    #[test]
    fn selection_follows_new_snapshot() {
        let mut dashboard = mounted();
        dashboard.apply_snapshot(facing());
        dashboard.click(400.0, 300.0);

        let mut updated = location("Santos", 0.0, -90.0);
        updated.total_reports = 9;
        dashboard.apply_snapshot(snapshot(vec![updated]));
        assert_eq!(dashboard.selection().unwrap().total_reports, 9);

        dashboard.apply_snapshot(snapshot(vec![location("Paraty", 5.0, 5.0)]));
        assert!(dashboard.selection().is_none());
    }

    #[test]
    fn resize_updates_camera_only() {
        let mut dashboard = mounted();
        dashboard.apply_snapshot(facing());
        dashboard.resize(1200.0, 600.0);

        let session = dashboard.session().unwrap();
        assert!((session.camera().aspect - 2.0).abs() < 1e-12);
        assert_eq!(session.markers().len(), 1);
        assert_eq!(dashboard.snapshot().locations.len(), 1);
    }

    #[test]
    fn stale_results_are_discarded() {
        let mut dashboard = mounted();
        let first = dashboard.begin_fetch();
        let second = dashboard.begin_fetch();

        assert_eq!(
            dashboard.complete_fetch(second, Ok(facing())),
            FetchDisposition::Applied
        );
        assert_eq!(
            dashboard.complete_fetch(first, Ok(Snapshot::empty())),
            FetchDisposition::Stale
        );
        assert_eq!(dashboard.snapshot().locations.len(), 1);
        assert_eq!(dashboard.status(), &FetchStatus::Idle);
    }

    #[test]
    fn in_order_results_both_apply() {
        let mut dashboard = mounted();
        let first = dashboard.begin_fetch();
        let second = dashboard.begin_fetch();

        assert_eq!(
            dashboard.complete_fetch(first, Ok(facing())),
            FetchDisposition::Applied
        );
        assert_eq!(dashboard.status(), &FetchStatus::Loading);
        assert_eq!(
            dashboard.complete_fetch(second, Ok(snapshot(Vec::new()))),
            FetchDisposition::Applied
        );
        assert_eq!(dashboard.status(), &FetchStatus::Idle);
        assert_eq!(dashboard.session().unwrap().markers().len(), 0);
    }

    #[test]
    fn failure_keeps_last_good_snapshot() {
        let mut dashboard = mounted();
        let token = dashboard.begin_fetch();
        dashboard.complete_fetch(token, Ok(facing()));

        let token = dashboard.begin_fetch();
        assert_eq!(
            dashboard.complete_fetch(token, Err(unavailable())),
            FetchDisposition::Failed
        );
        assert_eq!(dashboard.phase(), Phase::Rendering);
        assert_eq!(dashboard.snapshot().locations.len(), 1);
        assert!(matches!(dashboard.status(), FetchStatus::Failed { message } if message.contains("retry")));
        assert!(dashboard.frame().is_some());
    }

    #[test]
    fn results_after_unmount_are_discarded() {
        let mut dashboard = mounted();
        let token = dashboard.begin_fetch();
        dashboard.unmount();
        assert_eq!(
            dashboard.complete_fetch(token, Ok(facing())),
            FetchDisposition::Unmounted
        );
        assert!(dashboard.snapshot().is_empty());
        assert!(dashboard.session().is_none());
    }

    #[test]
    fn unmount_is_idempotent_and_detaches_everything() {
        let mut dashboard = mounted();
        dashboard.apply_snapshot(facing());
        dashboard.click(400.0, 300.0);

        assert!(dashboard.unmount());
        assert!(!dashboard.unmount());
        assert_eq!(dashboard.phase(), Phase::Unmounted);
        assert!(dashboard.listeners().is_empty());
        assert!(dashboard.session().is_none());
        assert!(dashboard.frame().is_none());
        assert!(dashboard.click(400.0, 300.0).is_none());
        assert!(!dashboard.mount(Viewport::new(800.0, 600.0)));
    }

    #[test]
    fn unmount_before_mount() {
        let mut dashboard = Dashboard::new(DashboardConfig::default());
        assert!(dashboard.unmount());
        assert_eq!(dashboard.phase(), Phase::Unmounted);
    }
}
