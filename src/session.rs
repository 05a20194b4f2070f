//! A capture session owns every device the guide touches: the orientation
//! source, the camera and the audio output. It acquires them with explicit
//! contracts and tears all of them down together, exactly once, whether the
//! session ends normally, fails to start, or is simply dropped.

use crate::audio_sonar::{AudioError, AudioSonar, ToneSink};
use crate::camera_source::{CameraBackend, CameraSource, CaptureOutcome, FrameGrabber};
use crate::capture_sequencer::{
    CaptureSequencer, GuidanceStatus, Phase, SequencerEvent, TourCapture,
};
use crate::config::GuideConfig;
use crate::error::GuideError;
use crate::orientation_source::OrientationSource;
use log::{debug, info, warn};
use std::time::{Duration, Instant};

impl FrameGrabber for Option<CameraSource> {
    fn capture(&mut self) -> CaptureOutcome {
        match self {
            Some(camera) => camera.capture(),
            None => CaptureOutcome::NotReady,
        }
    }
}

/// One run of the guide, from tutorial to review.
pub struct CaptureSession<O, B>
where
    O: OrientationSource,
    B: CameraBackend,
{
    config: GuideConfig,
    orientation: O,
    backend: B,
    camera: Option<CameraSource>,
    sonar: AudioSonar,
    sequencer: CaptureSequencer,
    closed: bool,
}

impl<O, B> CaptureSession<O, B>
where
    O: OrientationSource,
    B: CameraBackend,
{
    /// Wrap the devices for a new session. The orientation source should
    /// already be registered with the platform; the camera is only opened by
    /// [`CaptureSession::start`]. `audio` is the result of opening the
    /// output: a failure just means a silent session.
    pub fn new(
        config: &GuideConfig,
        orientation: O,
        backend: B,
        audio: Result<Box<dyn ToneSink>, AudioError>,
    ) -> Self {
        Self {
            config: config.clone(),
            orientation,
            backend,
            camera: None,
            sonar: AudioSonar::new(audio, &config.sonar),
            sequencer: CaptureSequencer::new(config),
            closed: false,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.sequencer.phase()
    }

    /// Live status for the guidance overlay.
    pub fn status(&self) -> GuidanceStatus {
        self.sequencer.status()
    }

    /// The underlying state machine, read-only.
    pub fn sequencer(&self) -> &CaptureSequencer {
        &self.sequencer
    }

    /// The orientation source, read-only.
    pub fn source(&self) -> &O {
        &self.orientation
    }

    /// The camera backend, read-only.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Whether the session has been torn down.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Whether the sonar still reaches a speaker.
    pub fn is_audible(&self) -> bool {
        self.sonar.is_audible()
    }

    /// Whether a camera stream is currently held.
    pub fn has_camera(&self) -> bool {
        self.camera.as_ref().is_some_and(CameraSource::is_live)
    }

    /// The finished tour, once in review.
    pub fn tour(&self) -> Option<TourCapture> {
        self.sequencer.tour()
    }

    /// Process every buffered sample, in arrival order.
    pub fn pump(&mut self) -> Vec<SequencerEvent> {
        self.pump_limited(usize::MAX)
    }

    /// Process at most `max` buffered samples, in arrival order. Each sample
    /// is handled to completion, capture and all, before the next.
    pub fn pump_limited(&mut self, max: usize) -> Vec<SequencerEvent> {
        let mut events = Vec::new();
        if self.closed {
            return events;
        }
        for sample in self.orientation.by_ref().take(max) {
            if let Some(event) =
                self.sequencer
                    .on_sample(&sample, &mut self.camera, &mut self.sonar)
            {
                debug!("CaptureSession : {:?}", event);
                events.push(event);
            }
        }
        if self.sequencer.phase() == Phase::Review && self.camera.is_some() {
            // Nothing left to photograph.
            self.release_camera();
        }
        events
    }

    /// Leave the tutorial. Waits for a first orientation sample if none has
    /// arrived yet, opens the camera, then calibrates and starts scanning.
    /// On failure everything acquired here is released and the session stays
    /// in the tutorial, ready for another attempt.
    pub fn start(&mut self) -> Result<(), GuideError> {
        if self.closed {
            return Err(GuideError::SessionClosed);
        }
        if self.sequencer.phase() != Phase::Tutorial {
            return Err(GuideError::WrongPhase(self.sequencer.phase()));
        }

        if !self.sequencer.has_heading() {
            self.await_first_sample()?;
        }

        let camera = CameraSource::acquire(&mut self.backend)?;
        self.camera = Some(camera);
        self.sequencer.start_session();
        Ok(())
    }

    fn await_first_sample(&mut self) -> Result<(), GuideError> {
        let timeout = Duration::from_millis(self.config.session.sensor_timeout_ms);
        let poll = Duration::from_millis(self.config.session.sensor_poll_ms);
        let started = Instant::now();
        loop {
            self.pump_limited(1);
            if self.sequencer.has_heading() {
                return Ok(());
            }
            if started.elapsed() >= timeout {
                warn!("CaptureSession : no orientation sample within {:?}.", timeout);
                return Err(GuideError::SensorUnavailable);
            }
            spin_sleep::sleep(poll);
        }
    }

    fn release_camera(&mut self) {
        if let Some(mut camera) = self.camera.take() {
            camera.release();
        }
    }

    /// Tear everything down: unregister from the sensor, stop the camera
    /// and silence the audio. Returns the finished tour if the session got
    /// that far. Calling it again does nothing.
    pub fn exit(&mut self) -> Option<TourCapture> {
        if self.closed {
            return None;
        }
        let tour = self.sequencer.tour();
        self.orientation.release();
        self.orientation.clear();
        self.release_camera();
        self.sonar.suspend();
        self.sequencer.restart();
        self.closed = true;
        info!("CaptureSession : closed.");
        tour
    }
}

impl<O, B> Drop for CaptureSession<O, B>
where
    O: OrientationSource,
    B: CameraBackend,
{
    fn drop(&mut self) {
        self.exit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio_sonar::tests::RecordingSink;
    use crate::capture_sequencer::TARGET_BEARINGS;
    use crate::orientation_source::SensorSample;
    use crate::sample_buffer::SampleBuffer;
    use crate::synthetic_camera::SyntheticCamera;

    fn quick_config() -> GuideConfig {
        let mut config = GuideConfig::default();
        config.session.sensor_timeout_ms = 30;
        config.session.sensor_poll_ms = 1;
        config
    }

    fn push_hold(buffer: &SampleBuffer, heading: f64, n: usize, t: &mut f64) {
        for _ in 0..n {
            *t += 16.0;
            buffer.add_sample(SensorSample {
                raw_heading_deg: heading,
                raw_tilt_deg: 90.0,
                timestamp_ms: *t,
            });
        }
    }

    #[test]
    fn silent_sensor_blocks_start() {
        let buffer = SampleBuffer::new();
        let camera = SyntheticCamera::builder().build();
        let mut session =
            CaptureSession::new(&quick_config(), buffer, camera, Err(AudioError::Unavailable("none".into())));
        assert_eq!(session.start(), Err(GuideError::SensorUnavailable));
        assert_eq!(session.phase(), Phase::Tutorial);
        assert_eq!(session.backend().live_tracks(), 0);
    }

    #[test]
    fn missing_camera_blocks_start_and_allows_retry() {
        let buffer = SampleBuffer::new();
        let mut t = 0.0;
        push_hold(&buffer, 10.0, 3, &mut t);
        let camera = SyntheticCamera::builder().reject_rungs(3).build();
        let mut session =
            CaptureSession::new(&quick_config(), buffer, camera, Err(AudioError::Unavailable("none".into())));
        session.pump();
        assert!(matches!(session.start(), Err(GuideError::CameraUnavailable(_))));
        assert_eq!(session.phase(), Phase::Tutorial);
        assert!(!session.has_camera());
    }

    #[test]
    fn full_session_then_exit() {
        let buffer = SampleBuffer::new();
        let feed = buffer.clone();
        let camera = SyntheticCamera::builder().warmup_grabs(1).build();
        let sink = RecordingSink::default();
        let mut session =
            CaptureSession::new(&quick_config(), buffer, camera, Ok(Box::new(sink.clone())));

        let mut t = 0.0;
        let zero = -35.0;
        push_hold(&feed, zero, 5, &mut t);
        session.pump();
        session.start().unwrap();
        assert!(session.has_camera());
        assert_eq!(session.backend().live_tracks(), 1);

        let mut completed = false;
        let mut deferred = 0;
        for bearing in TARGET_BEARINGS {
            push_hold(&feed, zero + bearing, 200, &mut t);
            for event in session.pump() {
                match event {
                    SequencerEvent::Completed => completed = true,
                    SequencerEvent::CaptureDeferred { .. } => deferred += 1,
                    SequencerEvent::Captured { .. } => {}
                }
            }
        }

        assert!(completed);
        // The first lock hit the camera's warm-up.
        assert_eq!(deferred, 1);
        assert_eq!(session.phase(), Phase::Review);
        assert_eq!(session.backend().live_tracks(), 0);
        assert!(!sink.played.lock().unwrap().is_empty());

        let tour = session.exit().unwrap();
        assert_eq!(tour.len(), 6);
        assert!(session.is_closed());
        assert!(*sink.suspended.lock().unwrap());
        assert!(feed.is_released());
        assert_eq!(session.exit(), None);
        assert_eq!(session.start(), Err(GuideError::SessionClosed));
    }

    #[test]
    fn exit_mid_scan_releases_everything() {
        let buffer = SampleBuffer::new();
        let feed = buffer.clone();
        let camera = SyntheticCamera::builder().build();
        let mut session =
            CaptureSession::new(&quick_config(), buffer, camera, Err(AudioError::Unavailable("none".into())));
        let mut t = 0.0;
        push_hold(&feed, 0.0, 2, &mut t);
        session.start().unwrap();
        assert_eq!(session.backend().live_tracks(), 1);

        assert_eq!(session.exit(), None);
        assert_eq!(session.backend().live_tracks(), 0);
        assert!(feed.is_released());
        push_hold(&feed, 0.0, 10, &mut t);
        assert!(session.pump().is_empty());
    }

    #[test]
    fn second_start_is_rejected() {
        let buffer = SampleBuffer::new();
        let mut t = 0.0;
        push_hold(&buffer, 0.0, 2, &mut t);
        let camera = SyntheticCamera::builder().build();
        let mut session =
            CaptureSession::new(&quick_config(), buffer, camera, Err(AudioError::Unavailable("none".into())));
        session.start().unwrap();
        assert_eq!(session.start(), Err(GuideError::WrongPhase(Phase::Scanning)));
    }
}
