//! Dashboard settings.
//!
//! Every field has a default, so a settings file only needs the values it
//! changes. The fetch deadline comes from the environment.

use std::path::Path;
use std::time::Duration;

use residue_map_globe::{CameraSettings, MarkerLayout, MarkerSizing, OrbitSettings};
use residue_map_report_models::DEFAULT_CLEAN_CATEGORY;
use serde::{Deserialize, Serialize};

use crate::DashboardError;

/// Environment variable holding the fetch deadline in whole seconds.
pub const TIMEOUT_ENV: &str = "RESIDUE_MAP_TIMEOUT_SECS";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DashboardConfig {
    /// Category tag meaning "no residue".
    pub clean_category: String,
    /// Globe auto-rotation, in radians per frame.
    pub rotation_speed: f64,
    pub frame_rate_hz: f64,
    pub camera: CameraSettings,
    pub orbit: OrbitSettings,
    pub markers: MarkerConfig,
    /// Upper bound on one fetch cycle. `None` waits indefinitely.
    #[serde(skip)]
    pub fetch_deadline: Option<Duration>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            clean_category: DEFAULT_CLEAN_CATEGORY.to_string(),
            rotation_speed: 0.0006,
            frame_rate_hz: 60.0,
            camera: CameraSettings::default(),
            orbit: OrbitSettings::default(),
            markers: MarkerConfig::default(),
            fetch_deadline: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MarkerConfig {
    pub surface_radius: f64,
    pub sizing: MarkerSizing,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        let layout = MarkerLayout::default();
        Self {
            surface_radius: layout.surface_radius,
            sizing: layout.sizing,
        }
    }
}

impl From<MarkerConfig> for MarkerLayout {
    fn from(config: MarkerConfig) -> Self {
        Self {
            surface_radius: config.surface_radius,
            sizing: config.sizing,
        }
    }
}

impl DashboardConfig {
    /// Parses settings from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`DashboardError::Config`] if the text is not valid TOML or
    /// a value is out of range.
    pub fn from_toml(text: &str) -> Result<Self, DashboardError> {
        let config: Self = toml::from_str(text).map_err(|e| DashboardError::Config {
            message: format!("invalid dashboard settings: {e}"),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Loads settings from a TOML file, then applies environment
    /// overrides.
    ///
    /// # Errors
    ///
    /// Returns [`DashboardError::Config`] if the file cannot be read or
    /// parsed.
    pub fn load(path: &Path) -> Result<Self, DashboardError> {
        let text = std::fs::read_to_string(path).map_err(|e| DashboardError::Config {
            message: format!("failed to read {}: {e}", path.display()),
        })?;
        let mut config = Self::from_toml(&text)?;
        config.apply_env();
        Ok(config)
    }

    /// Default settings with environment overrides applied.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    fn apply_env(&mut self) {
        if let Ok(value) = std::env::var(TIMEOUT_ENV) {
            self.fetch_deadline = parse_deadline(&value);
            if self.fetch_deadline.is_none() {
                log::warn!("Ignoring {TIMEOUT_ENV}={value:?}: expected whole seconds");
            }
        }
    }

    /// Time between frames.
    #[must_use]
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.frame_rate_hz)
    }

    fn validate(&self) -> Result<(), DashboardError> {
        let invalid = |message: &str| -> Result<(), DashboardError> {
            Err(DashboardError::Config {
                message: message.to_string(),
            })
        };

        if !(self.frame_rate_hz.is_finite() && self.frame_rate_hz > 0.0) {
            return invalid("frameRateHz must be positive");
        }
        if self.orbit.min_distance > self.orbit.max_distance {
            return invalid("orbit minDistance exceeds maxDistance");
        }
        if !(0.0..=1.0).contains(&self.orbit.damping) {
            return invalid("orbit damping must be within 0..=1");
        }
        if self.markers.sizing.min > self.markers.sizing.max {
            return invalid("marker sizing min exceeds max");
        }
        Ok(())
    }
}

fn parse_deadline(value: &str) -> Option<Duration> {
    value
        .trim()
        .parse::<u64>()
        .ok()
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_dashboard() {
        let config = DashboardConfig::default();
        assert_eq!(config.clean_category, "none");
        assert!((config.rotation_speed - 0.0006).abs() < f64::EPSILON);
        assert!((config.orbit.damping - 0.06).abs() < f64::EPSILON);
        assert!((config.camera.fov_deg - 60.0).abs() < f64::EPSILON);
        assert!((config.markers.surface_radius - 1.02).abs() < f64::EPSILON);
        assert_eq!(config.frame_interval(), Duration::from_secs_f64(1.0 / 60.0));
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let config = DashboardConfig::from_toml(
            r#"
            cleanCategory = "clean"

            [orbit]
            maxDistance = 12.0
            "#,
        )
        .unwrap();
        assert_eq!(config.clean_category, "clean");
        assert!((config.orbit.max_distance - 12.0).abs() < f64::EPSILON);
        assert!((config.orbit.min_distance - 1.5).abs() < f64::EPSILON);
        assert!((config.rotation_speed - 0.0006).abs() < f64::EPSILON);
    }

    #[test]
    fn rejects_inverted_orbit_range() {
        let err = DashboardConfig::from_toml(
            r"
            [orbit]
            minDistance = 9.0
            maxDistance = 2.0
            ",
        )
        .unwrap_err();
        assert!(matches!(err, DashboardError::Config { .. }));
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(DashboardConfig::from_toml("frameRateHz = [").is_err());
        assert!(DashboardConfig::from_toml("frameRateHz = 0.0").is_err());
    }

    #[test]
    fn parses_deadline_seconds() {
        assert_eq!(parse_deadline("15"), Some(Duration::from_secs(15)));
        assert_eq!(parse_deadline(" 3 "), Some(Duration::from_secs(3)));
        assert_eq!(parse_deadline("0"), None);
        assert_eq!(parse_deadline("soon"), None);
    }
}
