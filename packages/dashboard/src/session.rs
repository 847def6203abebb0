//! The render session: globe, lights, camera, controls and markers.
//!
//! A session exists only while the dashboard is rendering. It owns every
//! resource it creates and releases them all in [`RenderSession::dispose`];
//! nothing it allocates outlives it.

use residue_map_globe::{
    MarkerLayout, MarkerSet, OrbitControls, PerspectiveCamera, Viewport, pick,
};
use residue_map_report_models::LocationAggregate;

use crate::config::DashboardConfig;
use crate::resources::{ResourceId, ResourceKind, Resources};
use crate::surface::FrameView;

/// Everything drawn while the dashboard is rendering.
#[derive(Debug)]
pub struct RenderSession {
    resources: Resources,
    /// Globe sphere and lights, created once per session.
    scene: Vec<ResourceId>,
    /// One mesh per entry of `markers`, in the same order.
    marker_meshes: Vec<ResourceId>,
    markers: MarkerSet,
    layout: MarkerLayout,
    camera: PerspectiveCamera,
    controls: OrbitControls,
    viewport: Viewport,
    rotation_speed: f64,
    frame: u64,
    disposed: bool,
}

impl RenderSession {
    /// Builds the sphere, lighting, camera and the markers for `locations`.
    #[must_use]
    pub fn new(config: &DashboardConfig, viewport: Viewport, locations: &[LocationAggregate]) -> Self {
        let mut resources = Resources::new();
        let scene = vec![
            resources.alloc(ResourceKind::GlobeMesh),
            resources.alloc(ResourceKind::AmbientLight),
            resources.alloc(ResourceKind::DirectionalLight),
        ];

        let camera = PerspectiveCamera::new(&config.camera, viewport.aspect());
        let controls = OrbitControls::new(config.orbit, &camera);

        let mut session = Self {
            resources,
            scene,
            marker_meshes: Vec::new(),
            markers: MarkerSet::default(),
            layout: config.markers.into(),
            camera,
            controls,
            viewport,
            rotation_speed: config.rotation_speed,
            frame: 0,
            disposed: false,
        };
        session.replace_markers(locations);
        session
    }

    /// Detaches and disposes every current marker, then adds one for each
    /// of `locations`. Returns how many markers were disposed.
    ///
    /// The globe keeps its rotation, so new markers appear in place.
    pub fn replace_markers(&mut self, locations: &[LocationAggregate]) -> usize {
        if self.disposed {
            return 0;
        }

        let mut released = 0;
        for id in self.marker_meshes.drain(..) {
            if self.resources.dispose(id) {
                released += 1;
            }
        }

        let rotation = self.markers.rotation_y;
        self.markers = MarkerSet::from_aggregates(locations, &self.layout);
        self.markers.rotation_y = rotation;
        self.marker_meshes = (0..self.markers.len())
            .map(|_| self.resources.alloc(ResourceKind::MarkerMesh))
            .collect();

        log::debug!(
            "Replaced {released} marker(s) with {} for {} location(s)",
            self.markers.len(),
            locations.len()
        );
        released
    }

    /// Advances one frame: auto-rotates the globe and applies one damped
    /// orbit step.
    pub fn advance(&mut self) -> FrameView<'_> {
        if !self.disposed {
            self.markers.rotation_y += self.rotation_speed;
            self.controls.update(&mut self.camera);
            self.frame += 1;
        }
        self.view()
    }

    /// The current frame without advancing.
    #[must_use]
    pub const fn view(&self) -> FrameView<'_> {
        FrameView {
            index: self.frame,
            camera: &self.camera,
            viewport: self.viewport,
            globe_rotation: self.markers.rotation_y,
            markers: &self.markers,
        }
    }

    /// Updates the camera aspect and surface size. Markers are untouched.
    pub fn resize(&mut self, width: f64, height: f64) {
        self.viewport.resize(width, height);
        self.camera.set_aspect(self.viewport.aspect());
    }

    /// Resolves a pointer position to the aggregate under it.
    #[must_use]
    pub fn pick(&self, pointer_x: f64, pointer_y: f64) -> Option<&LocationAggregate> {
        pick(pointer_x, pointer_y, &self.viewport, &self.camera, &self.markers)
    }

    /// Queues an orbit drag.
    pub fn orbit(&mut self, dx: f64, dy: f64) {
        self.controls.rotate(dx, dy, self.viewport.height);
    }

    /// Queues a zoom step.
    pub fn zoom(&mut self, scale: f64) {
        self.controls.zoom(scale);
    }

    /// Releases every resource. Safe to call more than once.
    pub fn dispose(&mut self) -> usize {
        if self.disposed {
            return 0;
        }
        self.disposed = true;
        self.scene.clear();
        self.marker_meshes.clear();
        self.markers = MarkerSet::default();
        let released = self.resources.dispose_all();
        log::debug!("Render session disposed {released} resource(s)");
        released
    }

    /// Markers of the current snapshot.
    #[must_use]
    pub const fn markers(&self) -> &MarkerSet {
        &self.markers
    }

    #[must_use]
    pub const fn camera(&self) -> &PerspectiveCamera {
        &self.camera
    }

    /// Size the camera aspect was last derived from.
    #[must_use]
    pub const fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Live and released resources owned by this session.
    #[must_use]
    pub const fn resources(&self) -> &Resources {
        &self.resources
    }

    /// Frames advanced since the session was created.
    #[must_use]
    pub const fn frame_index(&self) -> u64 {
        self.frame
    }

    /// `true` once [`RenderSession::dispose`] has run.
    #[must_use]
    pub const fn is_disposed(&self) -> bool {
        self.disposed
    }
}
