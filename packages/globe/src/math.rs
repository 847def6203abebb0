//! Vector helpers over [`nalgebra`] used by the projector, camera and
//! picker.

use nalgebra::Vector3;

/// World-space point or direction.
pub type Vec3 = Vector3<f64>;

/// Unit vector in the same direction, or `None` for a zero or non-finite
/// vector.
#[must_use]
pub fn unit(v: Vec3) -> Option<Vec3> {
    let len = v.norm();
    if len <= 0.0 || !len.is_finite() {
        return None;
    }
    Some(v / len)
}

/// Rotates `v` around the Y axis by `angle` radians (right-handed).
#[must_use]
pub fn rotate_y(v: Vec3, angle: f64) -> Vec3 {
    let (s, c) = angle.sin_cos();
    Vec3::new(v.x.mul_add(c, v.z * s), v.y, (-v.x).mul_add(s, v.z * c))
}
