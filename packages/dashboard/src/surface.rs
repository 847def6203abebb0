//! Render surfaces the frame loop draws to.

use residue_map_globe::{MarkerSet, PerspectiveCamera, Vec3, Viewport};

/// Host events the dashboard subscribes to while mounted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Listener {
    PointerClick,
    WindowResize,
}

/// Everything needed to draw one frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameView<'a> {
    /// Number of frames the session has advanced, counting this one; the
    /// first presented frame is 1.
    pub index: u64,
    pub camera: &'a PerspectiveCamera,
    pub viewport: Viewport,
    /// Rotation of the globe group around the Y axis, in radians.
    pub globe_rotation: f64,
    pub markers: &'a MarkerSet,
}

/// A target that presents frames.
pub trait RenderSurface {
    /// Current size of the surface.
    fn viewport(&self) -> Viewport;

    fn present(&mut self, frame: &FrameView<'_>);
}

/// What a [`HeadlessSurface`] saw in its most recent frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameStats {
    pub index: u64,
    pub marker_count: usize,
    pub globe_rotation: f64,
    pub camera_position: Vec3,
}

/// A surface that draws nothing and records frame statistics.
#[derive(Debug, Clone)]
pub struct HeadlessSurface {
    viewport: Viewport,
    presented: u64,
    last: Option<FrameStats>,
}

impl HeadlessSurface {
    #[must_use]
    pub const fn new(width: f64, height: f64) -> Self {
        Self {
            viewport: Viewport::new(width, height),
            presented: 0,
            last: None,
        }
    }

    pub const fn resize(&mut self, width: f64, height: f64) {
        self.viewport.resize(width, height);
    }

    #[must_use]
    pub const fn presented(&self) -> u64 {
        self.presented
    }

    #[must_use]
    pub const fn last_frame(&self) -> Option<FrameStats> {
        self.last
    }
}

impl RenderSurface for HeadlessSurface {
    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn present(&mut self, frame: &FrameView<'_>) {
        self.presented += 1;
        self.last = Some(FrameStats {
            index: frame.index,
            marker_count: frame.markers.len(),
            globe_rotation: frame.globe_rotation,
            camera_position: frame.camera.position,
        });
    }
}
