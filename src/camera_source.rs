//! Camera acquisition and still capture.
//!
//! Opening a camera walks a capability ladder from the most specific request
//! to the least, and keeps the first that works. The acquired stream is owned
//! by a [`CameraSource`], which stops every track when it is released or
//! dropped, so no exit path can leave the camera running.

use log::{info, warn};
use std::fmt;

/// An 8-bit RGB pixel.
pub type Rgb = [u8; 3];

/// A decoded still frame, row-major RGB.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StillImage {
    /// Width in pixels
    pub width: usize,
    /// Height in pixels
    pub height: usize,
    /// `width * height` pixels, top row first
    pub pixels: Vec<Rgb>,
}

impl StillImage {
    /// Build an image by evaluating `f(x, y)` for every pixel.
    pub fn from_fn(width: usize, height: usize, f: impl Fn(usize, usize) -> Rgb) -> Self {
        let pixels = (0..height)
            .flat_map(|y| (0..width).map(move |x| (x, y)))
            .map(|(x, y)| f(x, y))
            .collect();
        Self {
            width,
            height,
            pixels,
        }
    }

    /// The pixel at `(x, y)`, clamped to the image bounds. An empty image
    /// reads as black.
    pub fn pixel(&self, x: usize, y: usize) -> Rgb {
        if self.width == 0 || self.height == 0 {
            return [0, 0, 0];
        }
        let x = x.min(self.width - 1);
        let y = y.min(self.height - 1);
        self.pixels[y * self.width + x]
    }
}

/// Which way the camera should face.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Facing {
    /// The camera on the back of the phone
    Rear,
    /// Whatever camera is available
    Any,
}

/// One rung of the capability ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CameraConstraints {
    /// Required facing
    pub facing: Facing,
    /// Preferred `(width, height)`, a hint rather than a requirement
    pub ideal_resolution: Option<(u32, u32)>,
}

impl fmt::Display for CameraConstraints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.facing, self.ideal_resolution) {
            (Facing::Rear, Some((w, h))) => write!(f, "rear camera at {}x{}", w, h),
            (Facing::Rear, None) => write!(f, "rear camera"),
            (Facing::Any, Some((w, h))) => write!(f, "any camera at {}x{}", w, h),
            (Facing::Any, None) => write!(f, "any camera"),
        }
    }
}

/// Most specific first.
pub const CAPABILITY_LADDER: [CameraConstraints; 3] = [
    CameraConstraints {
        facing: Facing::Rear,
        ideal_resolution: Some((1920, 1080)),
    },
    CameraConstraints {
        facing: Facing::Rear,
        ideal_resolution: None,
    },
    CameraConstraints {
        facing: Facing::Any,
        ideal_resolution: None,
    },
];

/// A live video feed from the platform.
pub trait CameraStream {
    /// Whether at least one frame has been buffered and can be decoded.
    fn has_frame(&self) -> bool;

    /// Decode the most recent frame. Only called after `has_frame()`.
    fn grab_frame(&mut self) -> Option<StillImage>;

    /// Stop every hardware track behind this stream.
    fn stop(&mut self);
}

/// The platform's camera service.
pub trait CameraBackend {
    /// Try to open a stream satisfying `constraints`.
    fn open(&mut self, constraints: &CameraConstraints) -> Result<Box<dyn CameraStream>, String>;
}

/// Result of asking for a still.
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureOutcome {
    /// A frame was sampled
    Captured(StillImage),
    /// The feed has not produced a decodable frame yet; try again later
    NotReady,
}

/// Anything that can be asked for a still frame. The capture sequencer only
/// depends on this, not on a concrete camera.
pub trait FrameGrabber {
    /// Sample the current frame into a still, if one is ready.
    fn capture(&mut self) -> CaptureOutcome;
}

/// Every rung of the ladder failed. Carries a description of each attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraUnavailable {
    /// One entry per rung tried, with the backend's reason
    pub attempts: Vec<String>,
}

impl fmt::Display for CameraUnavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no accessible camera ({})", self.attempts.join("; "))
    }
}

impl std::error::Error for CameraUnavailable {}

/// An acquired camera. Releasing is idempotent and also happens on drop.
pub struct CameraSource {
    stream: Option<Box<dyn CameraStream>>,
    constraints: CameraConstraints,
}

impl CameraSource {
    /// Walk [`CAPABILITY_LADDER`] and keep the first stream that opens.
    pub fn acquire(backend: &mut dyn CameraBackend) -> Result<Self, CameraUnavailable> {
        Self::acquire_with(backend, &CAPABILITY_LADDER)
    }

    /// Walk a custom ladder, most specific rung first.
    pub fn acquire_with(
        backend: &mut dyn CameraBackend,
        ladder: &[CameraConstraints],
    ) -> Result<Self, CameraUnavailable> {
        let mut attempts = Vec::new();
        for constraints in ladder {
            match backend.open(constraints) {
                Ok(stream) => {
                    info!("CameraSource : opened {}.", constraints);
                    return Ok(Self {
                        stream: Some(stream),
                        constraints: *constraints,
                    });
                }
                Err(why) => {
                    warn!("CameraSource : {} failed: {}.", constraints, why);
                    attempts.push(format!("{}: {}", constraints, why));
                }
            }
        }
        Err(CameraUnavailable { attempts })
    }

    /// The rung that succeeded.
    pub fn constraints(&self) -> CameraConstraints {
        self.constraints
    }

    /// Whether the stream is still held.
    pub fn is_live(&self) -> bool {
        self.stream.is_some()
    }

    /// Stop all tracks and let go of the stream.
    pub fn release(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.stop();
            info!("CameraSource : released.");
        }
    }
}

impl FrameGrabber for CameraSource {
    fn capture(&mut self) -> CaptureOutcome {
        match self.stream.as_mut() {
            Some(stream) if stream.has_frame() => match stream.grab_frame() {
                Some(image) => CaptureOutcome::Captured(image),
                None => CaptureOutcome::NotReady,
            },
            _ => CaptureOutcome::NotReady,
        }
    }
}

impl Drop for CameraSource {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic_camera::SyntheticCamera;

    #[test]
    fn first_rung_wins() {
        let mut backend = SyntheticCamera::builder().build();
        let camera = CameraSource::acquire(&mut backend).unwrap();
        assert_eq!(camera.constraints(), CAPABILITY_LADDER[0]);
        assert_eq!(backend.live_tracks(), 1);
    }

    #[test]
    fn falls_down_the_ladder() {
        let mut backend = SyntheticCamera::builder().reject_rungs(2).build();
        let camera = CameraSource::acquire(&mut backend).unwrap();
        assert_eq!(camera.constraints(), CAPABILITY_LADDER[2]);
    }

    #[test]
    fn unavailable_when_every_rung_fails() {
        let mut backend = SyntheticCamera::builder().reject_rungs(3).build();
        let err = CameraSource::acquire(&mut backend).err().unwrap();
        assert_eq!(err.attempts.len(), 3);
        assert_eq!(backend.live_tracks(), 0);
    }

    #[test]
    fn not_ready_until_a_frame_is_buffered() {
        let mut backend = SyntheticCamera::builder().warmup_grabs(2).build();
        let mut camera = CameraSource::acquire(&mut backend).unwrap();
        assert_eq!(camera.capture(), CaptureOutcome::NotReady);
        assert_eq!(camera.capture(), CaptureOutcome::NotReady);
        assert!(matches!(camera.capture(), CaptureOutcome::Captured(_)));
    }

    #[test]
    fn release_stops_tracks_once() {
        let mut backend = SyntheticCamera::builder().build();
        let mut camera = CameraSource::acquire(&mut backend).unwrap();
        camera.release();
        camera.release();
        assert!(!camera.is_live());
        assert_eq!(backend.live_tracks(), 0);
        assert_eq!(camera.capture(), CaptureOutcome::NotReady);
    }

    #[test]
    fn drop_releases() {
        let mut backend = SyntheticCamera::builder().build();
        {
            let _camera = CameraSource::acquire(&mut backend).unwrap();
            assert_eq!(backend.live_tracks(), 1);
        }
        assert_eq!(backend.live_tracks(), 0);
    }

    #[test]
    fn pixel_reads_are_clamped() {
        let img = StillImage::from_fn(2, 2, |x, y| [x as u8, y as u8, 0]);
        assert_eq!(img.pixel(1, 0), [1, 0, 0]);
        assert_eq!(img.pixel(9, 9), [1, 1, 0]);
        let empty = StillImage::from_fn(0, 0, |_, _| [9, 9, 9]);
        assert_eq!(empty.pixel(0, 0), [0, 0, 0]);
    }
}
