#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geospatial projection and picking for the report globe.
//!
//! Locations are projected onto a unit sphere, drawn as markers on a
//! slightly larger shell, and resolved back from pointer positions by
//! casting a ray from the camera through the marker set.

pub mod camera;
pub mod math;
pub mod palette;
pub mod picking;
pub mod projection;

pub use camera::{CameraSettings, OrbitControls, OrbitSettings, PerspectiveCamera, Viewport};
pub use math::Vec3;
pub use picking::{Marker, MarkerLayout, MarkerSet, PickHit, Ray, pick};
pub use projection::{MarkerSizing, project};
