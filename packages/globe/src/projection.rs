//! Geographic to Cartesian projection and marker sizing.

use serde::{Deserialize, Serialize};

use crate::math::Vec3;

/// Projects a latitude/longitude pair onto a sphere of `radius`.
///
/// Longitude is offset by 180° so that the antimeridian sits on the
/// texture seam: `lon = -180` and `lon = 180` land on the same point.
#[must_use]
pub fn project(lat: f64, lon: f64, radius: f64) -> Vec3 {
    let phi = (90.0 - lat).to_radians();
    let theta = (lon + 180.0).to_radians();

    Vec3::new(
        -radius * phi.sin() * theta.cos(),
        radius * phi.cos(),
        radius * phi.sin() * theta.sin(),
    )
}

/// Returns `true` if `lat`/`lon` can be projected.
#[must_use]
pub fn is_projectable(lat: f64, lon: f64) -> bool {
    lat.is_finite() && lon.is_finite() && (-90.0..=90.0).contains(&lat)
}

/// Maps a location's report count to a marker radius.
///
/// The radius grows linearly from `base` by `slope` per report and is
/// clamped to `min..=max`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MarkerSizing {
    /// Radius of a marker with no reports.
    pub base: f64,
    /// Radius added per report.
    pub slope: f64,
    /// Smallest radius drawn.
    pub min: f64,
    /// Largest radius drawn.
    pub max: f64,
}

impl Default for MarkerSizing {
    fn default() -> Self {
        Self {
            base: 0.02,
            slope: 0.008,
            min: 0.02,
            max: 0.06,
        }
    }
}

impl MarkerSizing {
    #[must_use]
    pub fn radius(&self, total_reports: u64) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        let raw = self.slope.mul_add(total_reports as f64, self.base);
        raw.clamp(self.min, self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn close(a: Vec3, b: Vec3) -> bool {
        (a - b).norm() < EPS
    }

    #[test]
    fn north_pole_is_on_the_y_axis() {
        let p = project(90.0, 0.0, 1.0);
        assert!(close(p, Vec3::new(0.0, 1.0, 0.0)));
    }

    #[test]
    fn south_pole_is_below() {
        let p = project(-90.0, 123.0, 2.0);
        assert!(close(p, Vec3::new(0.0, -2.0, 0.0)));
    }

    #[test]
    fn antimeridian_is_continuous() {
        let west = project(0.0, -180.0, 1.0);
        let east = project(0.0, 180.0, 1.0);
        assert!(close(west, east));
    }

    #[test]
    fn prime_meridian_faces_positive_x() {
        // theta = 180° so x = -cos(pi) = 1.
        let p = project(0.0, 0.0, 1.0);
        assert!(close(p, Vec3::new(1.0, 0.0, 0.0)));
    }

    #[test]
    fn points_lie_on_the_sphere() {
        for (lat, lon) in [(-23.96, -46.33), (51.5, -0.12), (35.68, 139.69)] {
            let p = project(lat, lon, 1.02);
            assert!((p.norm() - 1.02).abs() < EPS);
        }
    }

    #[test]
    fn rejects_unprojectable_coordinates() {
        assert!(is_projectable(-23.0, -46.0));
        assert!(!is_projectable(f64::NAN, 0.0));
        assert!(!is_projectable(91.0, 0.0));
        assert!(!is_projectable(0.0, f64::INFINITY));
    }

    #[test]
    fn marker_radius_is_clamped_and_monotonic() {
        let sizing = MarkerSizing::default();
        assert!((sizing.radius(0) - 0.02).abs() < EPS);
        assert!((sizing.radius(1) - 0.028).abs() < EPS);
        assert!((sizing.radius(5) - 0.06).abs() < EPS);
        assert!((sizing.radius(10_000) - 0.06).abs() < EPS);

        let mut last = 0.0;
        for n in 0..20 {
            let r = sizing.radius(n);
            assert!(r >= last);
            last = r;
        }
    }
}
