//! The lock-on integrator decides when the user has held the device on
//! target long enough for a capture.
//!
//! Progress accrues while the device is both aligned and steady, and decays
//! twice as fast otherwise, so a shaky hand falls back quickly instead of
//! hovering just short of a capture. Accrual is counted in evaluation ticks
//! (one per sensor sample), not wall-clock time.

use crate::angle_math::Degree;
use crate::config::LockConfig;
use crate::heading_filter::FilteredOrientation;

/// Progress value at which a capture fires.
pub const FULL_LOCK: f64 = 100.0;

/// The stop-and-shoot predicate: the heading innovation and the tilt must
/// both be small at the same time.
pub fn is_steady(orientation: &FilteredOrientation, config: &LockConfig) -> bool {
    orientation.heading_delta_deg.abs() < config.steady_heading_delta_deg
        && orientation.tilt_deg.abs() < config.steady_tilt_deg
}

/// What one evaluation tick produced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LockTick {
    /// Progress after this tick, 0 to 100
    pub progress: f64,
    /// Whether this tick was inside the alignment gate
    pub gated: bool,
    /// Whether a capture should fire on this tick
    pub fired: bool,
}

/// Accumulates lock progress across ticks.
#[derive(Debug, Clone)]
pub struct LockOnIntegrator {
    config: LockConfig,
    progress: f64,
    steady: bool,
    // Set when progress saturates; cleared only once progress leaves 100.
    latched: bool,
}

impl LockOnIntegrator {
    /// Instantiate an integrator with no progress.
    pub fn new(config: &LockConfig) -> Self {
        Self {
            config: config.clone(),
            progress: 0.0,
            steady: false,
            latched: false,
        }
    }

    /// Current progress, 0 to 100.
    pub fn progress(&self) -> f64 {
        self.progress
    }

    /// The steadiness reported on the last tick.
    pub fn steady(&self) -> bool {
        self.steady
    }

    /// Run one tick. `angular_error` is the signed distance from the aim
    /// point to the target.
    pub fn tick(&mut self, angular_error: Degree, steady: bool) -> LockTick {
        self.steady = steady;
        let gated = angular_error.abs() < self.config.tolerance_deg && steady;

        self.progress = if gated {
            (self.progress + self.config.gain_per_tick).min(FULL_LOCK)
        } else {
            (self.progress - self.config.decay_per_tick).max(0.0)
        };

        let saturated = self.progress >= FULL_LOCK;
        let fired = saturated && !self.latched;
        self.latched = saturated;

        LockTick {
            progress: self.progress,
            gated,
            fired,
        }
    }

    /// Drop all progress and re-arm the trigger.
    pub fn reset(&mut self) {
        self.progress = 0.0;
        self.latched = false;
    }
}
