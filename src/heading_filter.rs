//! Exponential smoothing of the absolute heading.
//!
//! The smoother works on the wrapped *difference* between the new sample and
//! the previous estimate, never on raw angles, so a sequence that crosses the
//! ±180° seam moves the estimate a few degrees instead of sweeping it around
//! the circle.

use crate::angle_math::{angular_diff, normalize, Degree};
use crate::config::FilterConfig;
use crate::orientation_source::{Millis, SensorSample};

/// The filter's view of the device after one sample.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FilteredOrientation {
    /// Smoothed absolute heading
    pub smoothed_heading_deg: Degree,
    /// Smoothed heading relative to the calibration offset
    pub relative_heading_deg: Degree,
    /// Pitch corrected so that an upright device reads 0°
    pub tilt_deg: Degree,
    /// Innovation of this sample: how far the raw reading was from the
    /// previous estimate. Small values mean the device is holding still.
    pub heading_delta_deg: Degree,
    /// Smoothed heading change per second, 0 when time did not advance
    pub angular_velocity_dps: f64,
}

/// Holds the smoothed heading between samples.
#[derive(Debug, Clone)]
pub struct HeadingFilter {
    alpha: f64,
    tilt_offset: Degree,
    smoothed: Option<Degree>,
    last_timestamp: Millis,
}

impl HeadingFilter {
    /// Instantiate a filter that has not seen any samples yet.
    pub fn new(config: &FilterConfig) -> Self {
        Self {
            alpha: config.alpha,
            tilt_offset: config.tilt_offset_deg,
            smoothed: None,
            last_timestamp: 0.0,
        }
    }

    /// The current smoothed absolute heading, if any sample has arrived.
    pub fn heading(&self) -> Option<Degree> {
        self.smoothed
    }

    /// Forget the current estimate; the next sample seeds the filter again.
    pub fn reset(&mut self) {
        self.smoothed = None;
        self.last_timestamp = 0.0;
    }

    /// Fold one sample into the estimate. `calibration_offset` is the
    /// absolute heading that counts as 0° for the relative output.
    pub fn update(&mut self, sample: &SensorSample, calibration_offset: Degree) -> FilteredOrientation {
        let (smoothed, delta, step) = match self.smoothed {
            None => (normalize(sample.raw_heading_deg), 0.0, 0.0),
            Some(previous) => {
                let delta = angular_diff(sample.raw_heading_deg, previous);
                let step = delta * self.alpha;
                (normalize(previous + step), delta, step)
            }
        };

        let dt_s = (sample.timestamp_ms - self.last_timestamp) / 1000.0;
        let angular_velocity_dps = if self.smoothed.is_some() && dt_s > 0.0 {
            step / dt_s
        } else {
            0.0
        };

        self.smoothed = Some(smoothed);
        self.last_timestamp = sample.timestamp_ms;

        FilteredOrientation {
            smoothed_heading_deg: smoothed,
            relative_heading_deg: angular_diff(smoothed, calibration_offset),
            tilt_deg: sample.raw_tilt_deg - self.tilt_offset,
            heading_delta_deg: delta,
            angular_velocity_dps,
        }
    }
}
