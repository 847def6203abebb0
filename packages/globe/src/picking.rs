//! Marker set and screen-space ray picking.

use residue_map_report_models::LocationAggregate;

use crate::camera::{PerspectiveCamera, Viewport};
use crate::math::{Vec3, rotate_y, unit};
use crate::palette::category_color;
use crate::projection::{MarkerSizing, is_projectable, project};

/// A half-line in world space.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Direction; need not be unit length.
    pub dir: Vec3,
}

impl Ray {
    #[must_use]
    pub const fn new(origin: Vec3, dir: Vec3) -> Self {
        Self { origin, dir }
    }

    #[must_use]
    pub fn at(&self, t: f64) -> Vec3 {
        self.origin + self.dir * t
    }

    /// Distance along the ray to the first intersection with a sphere, if
    /// any. A ray starting inside the sphere hits its far side.
    #[must_use]
    pub fn intersect_sphere(&self, center: Vec3, radius: f64) -> Option<f64> {
        let dir = unit(self.dir)?;
        let oc = self.origin - center;
        let b = oc.dot(&dir);
        let c = radius.mul_add(-radius, oc.dot(&oc));
        let disc = b.mul_add(b, -c);
        if disc < 0.0 {
            return None;
        }
        let root = disc.sqrt();
        let near = -b - root;
        if near >= 0.0 {
            return Some(near);
        }
        let far = -b + root;
        (far >= 0.0).then_some(far)
    }
}

/// Where and how large markers are drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerLayout {
    /// Radius of the shell markers sit on, slightly above the globe.
    pub surface_radius: f64,
    pub sizing: MarkerSizing,
}

impl Default for MarkerLayout {
    fn default() -> Self {
        Self {
            surface_radius: 1.02,
            sizing: MarkerSizing::default(),
        }
    }
}

/// One rendered marker and the aggregate it stands for.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    /// Center in globe-local coordinates.
    pub center: Vec3,
    pub radius: f64,
    /// `0xRRGGBB`, from the dominant category.
    pub color: u32,
    pub aggregate: LocationAggregate,
}

/// The markers of one snapshot, attached to the rotating globe group.
///
/// A set is always built wholesale from one list of aggregates; replacing
/// the snapshot means building a new set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarkerSet {
    markers: Vec<Marker>,
    /// Rotation of the globe group around the world Y axis, in radians.
    pub rotation_y: f64,
}

impl MarkerSet {
    /// Builds one marker per aggregate with a projectable coordinate.
    #[must_use]
    pub fn from_aggregates(aggregates: &[LocationAggregate], layout: &MarkerLayout) -> Self {
        let markers = aggregates
            .iter()
            .filter_map(|aggregate| {
                if !is_projectable(aggregate.lat, aggregate.lon) {
                    log::warn!(
                        "Skipping marker for {:?}: invalid coordinate ({}, {})",
                        aggregate.location_label,
                        aggregate.lat,
                        aggregate.lon
                    );
                    return None;
                }
                Some(Marker {
                    center: project(aggregate.lat, aggregate.lon, layout.surface_radius),
                    radius: layout.sizing.radius(aggregate.total_reports),
                    color: category_color(&aggregate.dominant_category),
                    aggregate: aggregate.clone(),
                })
            })
            .collect();

        Self {
            markers,
            rotation_y: 0.0,
        }
    }

    #[must_use]
    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.markers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// World-space center of the marker at `index`.
    #[must_use]
    pub fn world_center(&self, index: usize) -> Option<Vec3> {
        self.markers
            .get(index)
            .map(|m| rotate_y(m.center, self.rotation_y))
    }

    /// Intersects `ray` against every marker.
    ///
    /// The nearest hit wins; equal distances go to the lower index.
    #[must_use]
    pub fn pick_ray(&self, ray: &Ray) -> Option<PickHit> {
        let mut best: Option<PickHit> = None;
        for (index, marker) in self.markers.iter().enumerate() {
            let center = rotate_y(marker.center, self.rotation_y);
            let Some(distance) = ray.intersect_sphere(center, marker.radius) else {
                continue;
            };
            if best.is_none_or(|b| distance < b.distance) {
                best = Some(PickHit {
                    index,
                    distance,
                    point: ray.at(distance),
                });
            }
        }
        best
    }
}

/// The marker a ray struck first.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PickHit {
    /// Index into [`MarkerSet::markers`].
    pub index: usize,
    /// Distance from the ray origin to the hit, in world units.
    pub distance: f64,
    /// World-space hit point.
    pub point: Vec3,
}

/// Resolves a pointer position to the aggregate behind the nearest marker
/// under it, or `None` if no marker is hit.
#[must_use]
pub fn pick<'a>(
    pointer_x: f64,
    pointer_y: f64,
    viewport: &Viewport,
    camera: &PerspectiveCamera,
    markers: &'a MarkerSet,
) -> Option<&'a LocationAggregate> {
    let (ndc_x, ndc_y) = viewport.to_ndc(pointer_x, pointer_y)?;
    let ray = camera.ray_from_ndc(ndc_x, ndc_y)?;
    let hit = markers.pick_ray(&ray)?;
    markers.markers.get(hit.index).map(|m| &m.aggregate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::CameraSettings;
    use chrono::{TimeZone, Utc};
    use residue_map_report_models::RawReport;
    use std::collections::BTreeMap;

    fn aggregate(label: &str, lat: f64, lon: f64, total: u64) -> LocationAggregate {
        let mut distribution = BTreeMap::new();
        distribution.insert("Garrafas PET".to_string(), total);
        LocationAggregate {
            location_label: label.to_string(),
            lat,
            lon,
            total_reports: total,
            category_distribution: distribution,
            dominant_category: "Garrafas PET".to_string(),
            member_reports: vec![RawReport {
                id: format!("{label}-1"),
                lat,
                lon,
                category: "Garrafas PET".to_string(),
                observed_at: Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap(),
                location_label: label.to_string(),
            }],
        }
    }

    fn viewport() -> Viewport {
        Viewport::new(800.0, 600.0)
    }

    fn camera() -> PerspectiveCamera {
        PerspectiveCamera::new(&CameraSettings::default(), viewport().aspect())
    }

    #[test]
    fn ray_sphere_from_outside_and_inside() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::new(0.0, 0.0, -1.0));
        let t = ray.intersect_sphere(Vec3::zeros(), 1.0).unwrap();
        assert!((t - 4.0).abs() < 1e-9);

        let inside = Ray::new(Vec3::zeros(), Vec3::new(1.0, 0.0, 0.0));
        let t = inside.intersect_sphere(Vec3::zeros(), 2.0).unwrap();
        assert!((t - 2.0).abs() < 1e-9);

        let behind = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::new(0.0, 0.0, 1.0));
        assert!(behind.intersect_sphere(Vec3::zeros(), 1.0).is_none());
    }

    #[test]
    fn miss_returns_none() {
        // lat 0, lon -90 faces the camera at +Z.
        let markers =
            MarkerSet::from_aggregates(&[aggregate("Front", 0.0, -90.0, 3)], &MarkerLayout::default());
        assert!(pick(0.0, 0.0, &viewport(), &camera(), &markers).is_none());
    }

    #[test]
    fn center_click_hits_facing_marker() {
        let markers =
            MarkerSet::from_aggregates(&[aggregate("Front", 0.0, -90.0, 3)], &MarkerLayout::default());
        let hit = pick(400.0, 300.0, &viewport(), &camera(), &markers).unwrap();
        assert_eq!(hit.location_label, "Front");
    }

    #[test]
    fn overlapping_markers_resolve_to_nearest() {
        // Both lie on the center ray; "Back" is listed first but farther.
        let aggregates = vec![
            aggregate("Back", 0.0, 90.0, 3),
            aggregate("Front", 0.0, -90.0, 3),
        ];
        let markers = MarkerSet::from_aggregates(&aggregates, &MarkerLayout::default());
        let ray = camera().ray_from_ndc(0.0, 0.0).unwrap();
        let hit = markers.pick_ray(&ray).unwrap();
        assert_eq!(hit.index, 1);
        assert!((hit.distance - (3.0 - 1.02 - 0.044)).abs() < 1e-9);

        let selected = pick(400.0, 300.0, &viewport(), &camera(), &markers).unwrap();
        assert_eq!(selected.location_label, "Front");
    }

    #[test]
    fn picking_follows_group_rotation() {
        let aggregates = vec![
            aggregate("Back", 0.0, 90.0, 3),
            aggregate("Front", 0.0, -90.0, 3),
        ];
        let mut markers = MarkerSet::from_aggregates(&aggregates, &MarkerLayout::default());
        markers.rotation_y = std::f64::consts::PI;
        let selected = pick(400.0, 300.0, &viewport(), &camera(), &markers).unwrap();
        assert_eq!(selected.location_label, "Back");
    }

    #[test]
    fn markers_mirror_aggregates() {
        let aggregates = vec![
            aggregate("Santos", -23.96, -46.33, 1),
            aggregate("Broken", f64::NAN, 0.0, 4),
            aggregate("Ubatuba", -23.43, -45.07, 10),
        ];
        let markers = MarkerSet::from_aggregates(&aggregates, &MarkerLayout::default());
        assert_eq!(markers.len(), 2);
        assert_eq!(markers.markers()[0].aggregate, aggregates[0]);
        assert!((markers.markers()[0].radius - 0.028).abs() < 1e-9);
        assert!((markers.markers()[1].radius - 0.06).abs() < 1e-9);
        assert_eq!(markers.markers()[1].color, 0x00ff_6b6b);
        for marker in markers.markers() {
            assert!((marker.center.norm() - 1.02).abs() < 1e-9);
        }
    }

    #[test]
    fn empty_set_never_hits() {
        let markers = MarkerSet::default();
        assert!(pick(400.0, 300.0, &viewport(), &camera(), &markers).is_none());
    }
}
