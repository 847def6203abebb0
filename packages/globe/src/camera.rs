//! Perspective camera, render-surface viewport, and damped orbit controls.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::math::{Vec3, unit};
use crate::picking::Ray;

/// Static camera parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CameraSettings {
    /// Vertical field of view in degrees.
    pub fov_deg: f64,
    pub near: f64,
    pub far: f64,
    /// Distance from the globe center on mount, along +Z.
    pub initial_distance: f64,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            fov_deg: 60.0,
            near: 0.1,
            far: 1000.0,
            initial_distance: 3.0,
        }
    }
}

/// A perspective camera looking at `target`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerspectiveCamera {
    pub fov_deg: f64,
    pub aspect: f64,
    pub near: f64,
    pub far: f64,
    pub position: Vec3,
    pub target: Vec3,
}

impl PerspectiveCamera {
    #[must_use]
    pub fn new(settings: &CameraSettings, aspect: f64) -> Self {
        Self {
            fov_deg: settings.fov_deg,
            aspect: sanitize_aspect(aspect),
            near: settings.near,
            far: settings.far,
            position: Vec3::new(0.0, 0.0, settings.initial_distance),
            target: Vec3::zeros(),
        }
    }

    pub fn set_aspect(&mut self, aspect: f64) {
        self.aspect = sanitize_aspect(aspect);
    }

    /// Camera distance from its target.
    #[must_use]
    pub fn distance(&self) -> f64 {
        (self.position - self.target).norm()
    }

    /// Builds the world-space ray through a point in normalized device
    /// coordinates (`-1..=1` on both axes, +Y up).
    ///
    /// Returns `None` if the camera is degenerate (position on the target).
    #[must_use]
    pub fn ray_from_ndc(&self, ndc_x: f64, ndc_y: f64) -> Option<Ray> {
        let forward = unit(self.target - self.position)?;
        let right = unit(forward.cross(&Vec3::y()))?;
        let up = right.cross(&forward);

        let half_height = (self.fov_deg.to_radians() / 2.0).tan();
        let half_width = half_height * self.aspect;

        let dir = forward + right * (ndc_x * half_width) + up * (ndc_y * half_height);
        Some(Ray::new(self.position, unit(dir)?))
    }
}

fn sanitize_aspect(aspect: f64) -> f64 {
    if aspect.is_finite() && aspect > 0.0 {
        aspect
    } else {
        1.0
    }
}

/// Placement and size of the render surface, in CSS pixels relative to
/// the page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    #[must_use]
    pub const fn new(width: f64, height: f64) -> Self {
        Self {
            left: 0.0,
            top: 0.0,
            width,
            height,
        }
    }

    #[must_use]
    pub fn aspect(&self) -> f64 {
        if self.height > 0.0 {
            self.width / self.height
        } else {
            1.0
        }
    }

    /// Converts a pointer position to normalized device coordinates.
    ///
    /// Returns `None` for a zero-sized surface.
    #[must_use]
    pub fn to_ndc(&self, pointer_x: f64, pointer_y: f64) -> Option<(f64, f64)> {
        if self.width <= 0.0 || self.height <= 0.0 {
            return None;
        }
        let x = ((pointer_x - self.left) / self.width).mul_add(2.0, -1.0);
        let y = (-(pointer_y - self.top) / self.height).mul_add(2.0, 1.0);
        Some((x, y))
    }

    /// Resizes the surface, keeping its page offset.
    pub const fn resize(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
    }
}

/// Orbit limits and damping.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OrbitSettings {
    /// Fraction of the pending motion applied each update.
    pub damping: f64,
    pub min_distance: f64,
    pub max_distance: f64,
}

impl Default for OrbitSettings {
    fn default() -> Self {
        Self {
            damping: 0.06,
            min_distance: 1.5,
            max_distance: 8.0,
        }
    }
}

/// Keeps the polar angle away from the poles so the view never flips.
const POLAR_EPS: f64 = 1e-6;

/// Damped orbit around the camera target. Panning is not supported.
///
/// Input accumulates pending rotation and zoom; every [`update`] applies a
/// `damping` fraction of it to the camera and keeps the rest, so motion
/// eases out over several frames.
///
/// [`update`]: OrbitControls::update
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitControls {
    pub settings: OrbitSettings,
    azimuth: f64,
    polar: f64,
    radius: f64,
    pending_azimuth: f64,
    pending_polar: f64,
    pending_zoom: f64,
}

impl OrbitControls {
    /// Creates controls matching the camera's current position.
    #[must_use]
    pub fn new(settings: OrbitSettings, camera: &PerspectiveCamera) -> Self {
        let offset = camera.position - camera.target;
        let radius = offset.norm();
        let polar = if radius > 0.0 {
            (offset.y / radius).clamp(-1.0, 1.0).acos()
        } else {
            PI / 2.0
        };
        Self {
            settings,
            azimuth: offset.x.atan2(offset.z),
            polar,
            radius: radius.clamp(settings.min_distance, settings.max_distance),
            pending_azimuth: 0.0,
            pending_polar: 0.0,
            pending_zoom: 1.0,
        }
    }

    /// Queues a drag of `dx`/`dy` pixels on a surface `height` pixels tall.
    pub fn rotate(&mut self, dx: f64, dy: f64, height: f64) {
        if height <= 0.0 {
            return;
        }
        self.pending_azimuth -= 2.0 * PI * dx / height;
        self.pending_polar -= 2.0 * PI * dy / height;
    }

    /// Queues a zoom. `scale > 1` moves the camera away.
    pub fn zoom(&mut self, scale: f64) {
        if scale.is_finite() && scale > 0.0 {
            self.pending_zoom *= scale;
        }
    }

    /// Applies one damped step and writes the result to `camera`.
    pub fn update(&mut self, camera: &mut PerspectiveCamera) {
        let damping = self.settings.damping.clamp(0.0, 1.0);

        self.azimuth = self.pending_azimuth.mul_add(damping, self.azimuth);
        self.polar = self
            .pending_polar
            .mul_add(damping, self.polar)
            .clamp(POLAR_EPS, PI - POLAR_EPS);
        self.radius = (self.radius * self.pending_zoom)
            .clamp(self.settings.min_distance, self.settings.max_distance);

        self.pending_azimuth *= 1.0 - damping;
        self.pending_polar *= 1.0 - damping;
        self.pending_zoom = 1.0;

        let (sin_polar, cos_polar) = self.polar.sin_cos();
        let (sin_azimuth, cos_azimuth) = self.azimuth.sin_cos();
        camera.position = camera.target
            + Vec3::new(
                self.radius * sin_polar * sin_azimuth,
                self.radius * cos_polar,
                self.radius * sin_polar * cos_azimuth,
            );
    }

    #[must_use]
    pub const fn radius(&self) -> f64 {
        self.radius
    }

    /// Returns `true` while queued rotation is still being applied.
    #[must_use]
    pub fn is_settling(&self) -> bool {
        self.pending_azimuth.abs() > 1e-9 || self.pending_polar.abs() > 1e-9
    }
}
