//! The seam between the platform's orientation sensors and the capture guide.
//!
//! Platforms disagree on where the absolute bearing lives: some expose a
//! compass heading, others only the `alpha` rotation. A [`BearingSelector`]
//! isolates that choice so the rest of the crate only ever sees one canonical
//! bearing per [`SensorSample`].

use crate::angle_math::Degree;

/// Milliseconds on the session's monotonic clock.
pub type Millis = f64;

/// A single reading from the orientation sensors, reduced to what the guide
/// needs. Consumed immediately by the heading filter and never retained.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorSample {
    /// Absolute bearing as reported by the platform
    pub raw_heading_deg: Degree,
    /// Pitch as reported by the platform; about 90° for an upright phone
    pub raw_tilt_deg: Degree,
    /// When the sample was taken
    pub timestamp_ms: Millis,
}

/// The orientation event as the platform delivers it. Any field may be
/// missing depending on the device.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OrientationEvent {
    /// Rotation about the z axis
    pub alpha: Option<Degree>,
    /// Rotation about the x axis (pitch)
    pub beta: Option<Degree>,
    /// Rotation about the y axis (roll)
    pub gamma: Option<Degree>,
    /// Magnetometer-backed heading, where the platform offers one
    pub compass_heading: Option<Degree>,
    /// When the event was taken
    pub timestamp_ms: Millis,
}

/// Picks the absolute bearing out of an [`OrientationEvent`].
pub trait BearingSelector {
    /// The canonical absolute bearing for this event.
    fn absolute_bearing(&self, event: &OrientationEvent) -> Degree;
}

/// Prefers the compass heading, falling back to `alpha`, then 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompassFirst;

impl BearingSelector for CompassFirst {
    fn absolute_bearing(&self, event: &OrientationEvent) -> Degree {
        event.compass_heading.or(event.alpha).unwrap_or(0.0)
    }
}

/// Uses `alpha` only, for platforms whose compass heading is unreliable.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlphaOnly;

impl BearingSelector for AlphaOnly {
    fn absolute_bearing(&self, event: &OrientationEvent) -> Degree {
        event.alpha.unwrap_or(0.0)
    }
}

impl OrientationEvent {
    /// Reduce the event to a [`SensorSample`] using the given selector. A
    /// missing pitch reads as 0.
    pub fn to_sample(&self, selector: &dyn BearingSelector) -> SensorSample {
        SensorSample {
            raw_heading_deg: selector.absolute_bearing(self),
            raw_tilt_deg: self.beta.unwrap_or(0.0),
            timestamp_ms: self.timestamp_ms,
        }
    }
}

/// `OrientationSource`
///
/// A clearable iterator that emits [`SensorSample`]s in arrival order when
/// iterated upon. `next()` returning `None` only means nothing is buffered
/// right now, not that the source is finished.
pub trait OrientationSource: Iterator<Item = SensorSample> {
    /// Drop every buffered sample.
    fn clear(&mut self);

    /// Unregister from the underlying sensor. After this no new samples are
    /// produced. Calling it more than once is harmless.
    fn release(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(alpha: Option<f64>, compass: Option<f64>) -> OrientationEvent {
        OrientationEvent {
            alpha,
            beta: Some(88.0),
            gamma: None,
            compass_heading: compass,
            timestamp_ms: 16.0,
        }
    }

    #[test]
    fn compass_wins_when_present() {
        let e = event(Some(10.0), Some(250.0));
        assert_eq!(CompassFirst.absolute_bearing(&e), 250.0);
        assert_eq!(AlphaOnly.absolute_bearing(&e), 10.0);
    }

    #[test]
    fn falls_back_to_alpha_then_zero() {
        assert_eq!(CompassFirst.absolute_bearing(&event(Some(10.0), None)), 10.0);
        assert_eq!(CompassFirst.absolute_bearing(&event(None, None)), 0.0);
        assert_eq!(AlphaOnly.absolute_bearing(&event(None, Some(5.0))), 0.0);
    }

    #[test]
    fn sample_carries_pitch_and_time() {
        let s = event(Some(42.0), None).to_sample(&CompassFirst);
        assert_eq!(
            s,
            SensorSample {
                raw_heading_deg: 42.0,
                raw_tilt_deg: 88.0,
                timestamp_ms: 16.0,
            }
        );
        let blank = OrientationEvent::default().to_sample(&AlphaOnly);
        assert_eq!(blank.raw_tilt_deg, 0.0);
    }
}
