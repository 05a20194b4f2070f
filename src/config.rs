//! Tunable constants for the capture guide, loadable from a RON file. Every
//! field has a default, so a config file only needs to mention what it
//! changes:
//!
//! ```text
//! (lock: (gain_per_tick: 5.0), sonar: (range_deg: 30.0))
//! ```

use serde::{Deserialize, Serialize};
use std::{borrow::Cow, fmt, fs, path::Path};

/// Top-level configuration, grouped by the component that consumes it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuideConfig {
    /// Heading smoothing and tilt correction
    pub filter: FilterConfig,
    /// Lock-on gate and integrator rates
    pub lock: LockConfig,
    /// Sonar cadence and pitch mapping
    pub sonar: SonarConfig,
    /// Guidance overlay projection
    pub overlay: OverlayConfig,
    /// Panoramic preview camera and surface
    pub preview: PreviewConfig,
    /// Session acquisition behaviour
    pub session: SessionConfig,
}

/// Heading filter settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Weight of each new sample in the exponential smoother
    pub alpha: f64,
    /// Subtracted from the raw pitch so that an upright phone reads 0°
    pub tilt_offset_deg: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            alpha: 0.15,
            tilt_offset_deg: 90.0,
        }
    }
}

/// Lock-on gate and integrator rates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockConfig {
    /// Largest angular error that still counts as on target
    pub tolerance_deg: f64,
    /// Largest heading change between samples that counts as steady
    pub steady_heading_delta_deg: f64,
    /// Largest tilt from upright that counts as steady
    pub steady_tilt_deg: f64,
    /// Lock progress added per on-target steady sample, in percent
    pub gain_per_tick: f64,
    /// Lock progress removed per sample otherwise, in percent
    pub decay_per_tick: f64,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            tolerance_deg: 3.5,
            steady_heading_delta_deg: 0.3,
            steady_tilt_deg: 15.0,
            gain_per_tick: 2.5,
            decay_per_tick: 5.0,
        }
    }
}

/// Sonar cadence and pitch mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SonarConfig {
    /// Beyond this angular error the sonar stays quiet
    pub range_deg: f64,
    /// Beep period when dead on target
    pub min_interval_ms: f64,
    /// Beep period at the edge of the range
    pub max_interval_ms: f64,
    /// Pitch at the edge of the range
    pub min_frequency_hz: f64,
    /// Pitch when dead on target
    pub max_frequency_hz: f64,
    /// Length of one beep
    pub beep_duration_s: f64,
}

impl Default for SonarConfig {
    fn default() -> Self {
        Self {
            range_deg: 40.0,
            min_interval_ms: 80.0,
            max_interval_ms: 600.0,
            min_frequency_hz: 400.0,
            max_frequency_hz: 1200.0,
            beep_duration_s: 0.05,
        }
    }
}

/// Guidance overlay projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Targets further than this from the aim point are not drawn
    pub visible_window_deg: f64,
    /// Horizontal screen percent per degree of angular error
    pub percent_per_deg: f64,
    /// Horizon shift in pixels per degree of tilt
    pub pixels_per_tilt_deg: f64,
    /// Beyond this error a turn arrow points at the active target
    pub turn_hint_deg: f64,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            visible_window_deg: 55.0,
            percent_per_deg: 1.5,
            pixels_per_tilt_deg: 4.0,
            turn_hint_deg: 15.0,
        }
    }
}

/// Panoramic preview camera and surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    /// Degrees of orbit per pixel of drag
    pub drag_sensitivity: f64,
    /// How far the view may look up or down
    pub latitude_limit_deg: f64,
    /// Vertical field of view when the preview opens
    pub field_of_view_deg: f64,
    /// Narrowest zoom
    pub min_field_of_view_deg: f64,
    /// Widest zoom
    pub max_field_of_view_deg: f64,
    /// Radius of the surface the tour is wrapped around
    pub cylinder_radius: f64,
    /// Height of that surface
    pub cylinder_height: f64,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            drag_sensitivity: 0.1,
            latitude_limit_deg: 85.0,
            field_of_view_deg: 75.0,
            min_field_of_view_deg: 30.0,
            max_field_of_view_deg: 110.0,
            cylinder_radius: 500.0,
            cylinder_height: 1000.0,
        }
    }
}

/// Session acquisition behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// How long `start()` waits for a first orientation sample
    pub sensor_timeout_ms: u64,
    /// Sleep between checks while waiting
    pub sensor_poll_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            sensor_timeout_ms: 2000,
            sensor_poll_ms: 10,
        }
    }
}

/// Returned when a config file cannot be read or parsed.
#[derive(Debug)]
pub enum ConfigError {
    /// The file could not be read
    IoError(std::io::Error),
    /// The file is not valid RON for a [`GuideConfig`]
    RonSpannedError(ron::de::SpannedError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let msg = match self {
            ConfigError::IoError(error) => Cow::from(format!("io error: {}", error)),
            ConfigError::RonSpannedError(error) => Cow::from(format!("config error: {}", error)),
        };
        write!(f, "{}", msg)
    }
}

impl std::error::Error for ConfigError {}

impl GuideConfig {
    /// Parse a config from RON text.
    pub fn from_ron(text: &str) -> Result<Self, ConfigError> {
        ron::from_str(text).map_err(ConfigError::RonSpannedError)
    }

    /// Read a config from the path provided.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(ConfigError::IoError)?;
        Self::from_ron(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_config_is_default() {
        let config = GuideConfig::from_ron("()").unwrap();
        assert_eq!(config, GuideConfig::default());
    }

    #[test]
    fn partial_override() {
        let config =
            GuideConfig::from_ron("(lock: (gain_per_tick: 5.0), sonar: (range_deg: 30.0))")
                .unwrap();
        assert_eq!(config.lock.gain_per_tick, 5.0);
        assert_eq!(config.lock.decay_per_tick, 5.0);
        assert_eq!(config.sonar.range_deg, 30.0);
        assert_eq!(config.filter.alpha, 0.15);
    }

    #[test]
    fn turn_hint_threshold_is_tunable() {
        assert_eq!(GuideConfig::default().overlay.turn_hint_deg, 15.0);
        let config = GuideConfig::from_ron("(overlay: (turn_hint_deg: 25.0))").unwrap();
        assert_eq!(config.overlay.turn_hint_deg, 25.0);
        assert_eq!(config.overlay.visible_window_deg, 55.0);
    }

    #[test]
    fn read_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "(filter: (alpha: 0.3))").unwrap();
        let config = GuideConfig::from_path(file.path()).unwrap();
        assert_eq!(config.filter.alpha, 0.3);
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(matches!(
            GuideConfig::from_ron("(filter: 12"),
            Err(ConfigError::RonSpannedError(_))
        ));
    }
}
