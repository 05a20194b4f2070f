//! A [`CameraBackend`] that renders procedural frames instead of talking to
//! hardware. The simulator and the tests use it to exercise the capability
//! ladder, the not-ready path and track release without a device.

use crate::camera_source::{
    CameraBackend, CameraConstraints, CameraStream, Rgb, StillImage, CAPABILITY_LADDER,
};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex, PoisonError,
};

/// Builder for [`SyntheticCamera`].
#[derive(Debug, Clone)]
pub struct SyntheticCameraBuilder {
    reject_rungs: usize,
    warmup_grabs: usize,
    resolution: (usize, usize),
}

impl SyntheticCameraBuilder {
    /// Refuse the first `n` rungs of the default capability ladder.
    pub fn reject_rungs(self, n: usize) -> Self {
        Self {
            reject_rungs: n,
            ..self
        }
    }

    /// Report "no frame yet" for the first `n` readiness checks of each
    /// stream.
    pub fn warmup_grabs(self, n: usize) -> Self {
        Self {
            warmup_grabs: n,
            ..self
        }
    }

    /// Size of the produced frames.
    pub fn resolution(self, width: usize, height: usize) -> Self {
        Self {
            resolution: (width, height),
            ..self
        }
    }

    /// Build the backend.
    pub fn build(self) -> SyntheticCamera {
        SyntheticCamera {
            reject_rungs: self.reject_rungs,
            warmup_grabs: self.warmup_grabs,
            resolution: self.resolution,
            live_tracks: Arc::new(AtomicUsize::new(0)),
            view_heading: Arc::new(Mutex::new(0.0)),
        }
    }
}

/// A fake camera looking at a procedural room. The room's colour bands are
/// fixed in world space, so frames taken at different headings differ.
pub struct SyntheticCamera {
    reject_rungs: usize,
    warmup_grabs: usize,
    resolution: (usize, usize),
    live_tracks: Arc<AtomicUsize>,
    view_heading: Arc<Mutex<f64>>,
}

impl SyntheticCamera {
    /// Start building a backend. Defaults: every rung accepted, frames ready
    /// immediately, 160x90 pixels.
    pub fn builder() -> SyntheticCameraBuilder {
        SyntheticCameraBuilder {
            reject_rungs: 0,
            warmup_grabs: 0,
            resolution: (160, 90),
        }
    }

    /// Number of streams opened and not yet stopped.
    pub fn live_tracks(&self) -> usize {
        self.live_tracks.load(Ordering::SeqCst)
    }

    /// Shared handle to the absolute heading the fake camera is looking at.
    pub fn view_heading(&self) -> Arc<Mutex<f64>> {
        Arc::clone(&self.view_heading)
    }
}

impl CameraBackend for SyntheticCamera {
    fn open(&mut self, constraints: &CameraConstraints) -> Result<Box<dyn CameraStream>, String> {
        if CAPABILITY_LADDER[..self.reject_rungs.min(CAPABILITY_LADDER.len())]
            .contains(constraints)
        {
            return Err("constraint not satisfiable".to_string());
        }
        if self.live_tracks() > 0 {
            return Err("device busy".to_string());
        }
        self.live_tracks.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(SyntheticStream {
            warmup_left: AtomicUsize::new(self.warmup_grabs),
            resolution: self.resolution,
            live_tracks: Arc::clone(&self.live_tracks),
            view_heading: Arc::clone(&self.view_heading),
            stopped: false,
        }))
    }
}

struct SyntheticStream {
    warmup_left: AtomicUsize,
    resolution: (usize, usize),
    live_tracks: Arc<AtomicUsize>,
    view_heading: Arc<Mutex<f64>>,
    stopped: bool,
}

impl CameraStream for SyntheticStream {
    fn has_frame(&self) -> bool {
        if self.stopped {
            return false;
        }
        // Each readiness check stands in for time passing on the feed.
        self.warmup_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_err()
    }

    fn grab_frame(&mut self) -> Option<StillImage> {
        if self.stopped {
            return None;
        }
        let heading = *self
            .view_heading
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let (width, height) = self.resolution;
        Some(render_room(width, height, heading))
    }

    fn stop(&mut self) {
        if !self.stopped {
            self.stopped = true;
            self.live_tracks.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

fn band_colour(world_deg: f64) -> Rgb {
    let band = (world_deg.rem_euclid(360.0) / 30.0) as usize;
    const PALETTE: [Rgb; 12] = [
        [200, 60, 60],
        [200, 120, 60],
        [200, 190, 60],
        [140, 200, 60],
        [60, 200, 90],
        [60, 200, 170],
        [60, 160, 200],
        [60, 90, 200],
        [120, 60, 200],
        [180, 60, 200],
        [200, 60, 150],
        [120, 120, 120],
    ];
    PALETTE[band % PALETTE.len()]
}

/// A 60° wide view of the room centred on `heading`: colour bands every 30°
/// with a floor in the bottom third.
fn render_room(width: usize, height: usize, heading: f64) -> StillImage {
    StillImage::from_fn(width, height, |x, y| {
        if y * 3 >= height * 2 {
            return [70, 55, 40];
        }
        let offset = (x as f64 / width.max(1) as f64 - 0.5) * 60.0;
        band_colour(heading + offset)
    })
}
