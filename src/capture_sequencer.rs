//! The capture sequencer walks the user around six fixed bearings.
//!
//! ```text
//! Tutorial --start_session()--> Scanning --6th capture--> Review
//!     ^                                                     |
//!     +------------------------restart()--------------------+
//! ```
//!
//! Every sensor sample is processed to completion before the next one: the
//! filter runs, the sonar and lock-on integrator are driven, and if the lock
//! fires the camera is asked for a still and the active node advances, all
//! inside one call to [`CaptureSequencer::on_sample`].

use crate::angle_math::{angular_diff, Degree};
use crate::audio_sonar::AudioSonar;
use crate::camera_source::{CaptureOutcome, FrameGrabber, StillImage};
use crate::config::GuideConfig;
use crate::heading_filter::{FilteredOrientation, HeadingFilter};
use crate::lock_on::{is_steady, LockOnIntegrator};
use crate::orientation_source::SensorSample;
use log::{debug, info, warn};

/// Bearings of the six capture nodes, relative to the calibrated zero.
pub const TARGET_BEARINGS: [Degree; 6] = [0.0, 60.0, 120.0, 180.0, 240.0, 300.0];

/// Where the sequencer is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for the user to begin
    Tutorial,
    /// Guiding the user from node to node
    Scanning,
    /// All nodes captured
    Review,
}

/// One of the six capture positions.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureNode {
    /// Position in the sequence, 0 to 5
    pub index: usize,
    /// Target bearing relative to the calibrated zero
    pub target_bearing_deg: Degree,
    /// The still taken here, once captured
    pub captured_image: Option<StillImage>,
}

/// The finished set of stills, in target order.
#[derive(Debug, Clone, PartialEq)]
pub struct TourCapture {
    /// `(bearing, image)` pairs, bearing ascending from 0°
    pub frames: Vec<(Degree, StillImage)>,
}

impl TourCapture {
    /// Number of frames in the tour.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether the tour holds no frames.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// The stills, in target order.
    pub fn images(&self) -> impl Iterator<Item = &StillImage> {
        self.frames.iter().map(|(_, image)| image)
    }
}

/// The live tuple the guidance overlay renders from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GuidanceStatus {
    /// Current phase
    pub phase: Phase,
    /// Node currently being aimed at
    pub active_index: usize,
    /// Lock progress, 0 to 100
    pub lock_progress: f64,
    /// Whether the device is held still
    pub steady: bool,
    /// Smoothed heading relative to the calibrated zero
    pub relative_heading_deg: Degree,
    /// Corrected pitch
    pub tilt_deg: Degree,
    /// Signed distance from the aim point to the active target
    pub angular_error_deg: Degree,
}

/// Something worth telling the outside world about, produced by a sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SequencerEvent {
    /// A node was filled and the next one is now active
    Captured {
        /// The node that was just filled
        index: usize,
    },
    /// The lock fired but the camera had no frame; lock progress was reset
    CaptureDeferred {
        /// The node that is still active
        index: usize,
    },
    /// The last node was filled; the sequencer is now in review
    Completed,
}

/// The state machine behind a capture session.
pub struct CaptureSequencer {
    config: GuideConfig,
    phase: Phase,
    filter: HeadingFilter,
    lock: LockOnIntegrator,
    calibration_offset: Degree,
    nodes: Vec<CaptureNode>,
    active_index: usize,
    orientation: FilteredOrientation,
    angular_error: Degree,
}

fn empty_nodes() -> Vec<CaptureNode> {
    TARGET_BEARINGS
        .iter()
        .enumerate()
        .map(|(index, &target_bearing_deg)| CaptureNode {
            index,
            target_bearing_deg,
            captured_image: None,
        })
        .collect()
}

impl CaptureSequencer {
    /// Instantiate a sequencer in [`Phase::Tutorial`].
    pub fn new(config: &GuideConfig) -> Self {
        Self {
            config: config.clone(),
            phase: Phase::Tutorial,
            filter: HeadingFilter::new(&config.filter),
            lock: LockOnIntegrator::new(&config.lock),
            calibration_offset: 0.0,
            nodes: empty_nodes(),
            active_index: 0,
            orientation: FilteredOrientation::default(),
            angular_error: 0.0,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The absolute heading latched as zero when scanning began.
    pub fn calibration_offset(&self) -> Degree {
        self.calibration_offset
    }

    /// Whether any orientation sample has been seen.
    pub fn has_heading(&self) -> bool {
        self.filter.heading().is_some()
    }

    /// All six nodes, captured or not.
    pub fn nodes(&self) -> &[CaptureNode] {
        &self.nodes
    }

    /// The node being aimed at, while scanning.
    pub fn active_node(&self) -> Option<&CaptureNode> {
        match self.phase {
            Phase::Scanning => self.nodes.get(self.active_index),
            _ => None,
        }
    }

    /// Snapshot for the guidance overlay.
    pub fn status(&self) -> GuidanceStatus {
        GuidanceStatus {
            phase: self.phase,
            active_index: self.active_index,
            lock_progress: self.lock.progress(),
            steady: self.lock.steady(),
            relative_heading_deg: self.orientation.relative_heading_deg,
            tilt_deg: self.orientation.tilt_deg,
            angular_error_deg: self.angular_error,
        }
    }

    /// Leave the tutorial: latch the current heading as zero and arm the
    /// first node. Does nothing outside [`Phase::Tutorial`].
    pub fn start_session(&mut self) {
        if self.phase != Phase::Tutorial {
            warn!("CaptureSequencer : start requested while {:?}, ignoring.", self.phase);
            return;
        }
        self.calibration_offset = self.filter.heading().unwrap_or(0.0);
        self.nodes = empty_nodes();
        self.active_index = 0;
        self.lock.reset();
        self.angular_error = 0.0;
        self.phase = Phase::Scanning;
        info!(
            "CaptureSequencer : scanning, zero heading is {:.1}°.",
            self.calibration_offset
        );
    }

    /// Back to the tutorial, discarding every capture.
    pub fn restart(&mut self) {
        self.phase = Phase::Tutorial;
        self.nodes = empty_nodes();
        self.active_index = 0;
        self.lock.reset();
        self.calibration_offset = 0.0;
        self.angular_error = 0.0;
        info!("CaptureSequencer : restarted.");
    }

    /// The finished tour, once in review.
    pub fn tour(&self) -> Option<TourCapture> {
        if self.phase != Phase::Review {
            return None;
        }
        let frames = self
            .nodes
            .iter()
            .filter_map(|node| {
                node.captured_image
                    .as_ref()
                    .map(|image| (node.target_bearing_deg, image.clone()))
            })
            .collect();
        Some(TourCapture { frames })
    }

    /// Process one orientation sample end to end.
    pub fn on_sample(
        &mut self,
        sample: &SensorSample,
        camera: &mut dyn FrameGrabber,
        sonar: &mut AudioSonar,
    ) -> Option<SequencerEvent> {
        self.orientation = self.filter.update(sample, self.calibration_offset);
        if self.phase != Phase::Scanning {
            return None;
        }

        let target = TARGET_BEARINGS[self.active_index];
        self.angular_error = angular_diff(target, self.orientation.relative_heading_deg);
        sonar.update(self.angular_error, sample.timestamp_ms);

        let steady = is_steady(&self.orientation, &self.config.lock);
        let tick = self.lock.tick(self.angular_error, steady);
        if !tick.fired {
            return None;
        }

        let index = self.active_index;
        // Whatever the camera says, the next capture needs a fresh lock.
        self.lock.reset();
        match camera.capture() {
            CaptureOutcome::NotReady => {
                debug!("CaptureSequencer : node {} locked but no frame ready.", index);
                Some(SequencerEvent::CaptureDeferred { index })
            }
            CaptureOutcome::Captured(image) => {
                sonar.chime(sample.timestamp_ms);
                self.nodes[index].captured_image = Some(image);
                info!(
                    "CaptureSequencer : captured node {} at {:.1}°.",
                    index, self.orientation.relative_heading_deg
                );
                if index + 1 < TARGET_BEARINGS.len() {
                    self.active_index = index + 1;
                    Some(SequencerEvent::Captured { index })
                } else {
                    self.phase = Phase::Review;
                    info!("CaptureSequencer : all nodes captured.");
                    Some(SequencerEvent::Completed)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio_sonar::tests::RecordingSink;
    use crate::config::SonarConfig;

    /// Hands out numbered 1x1 frames, or refuses a set number of times first.
    struct MockCamera {
        refusals: usize,
        taken: u8,
    }

    impl FrameGrabber for MockCamera {
        fn capture(&mut self) -> CaptureOutcome {
            if self.refusals > 0 {
                self.refusals -= 1;
                return CaptureOutcome::NotReady;
            }
            self.taken += 1;
            CaptureOutcome::Captured(StillImage::from_fn(1, 1, |_, _| [self.taken, 0, 0]))
        }
    }

    struct Rig {
        seq: CaptureSequencer,
        camera: MockCamera,
        sonar: AudioSonar,
        t: f64,
    }

    impl Rig {
        fn new(refusals: usize) -> Self {
            Self {
                seq: CaptureSequencer::new(&GuideConfig::default()),
                camera: MockCamera { refusals, taken: 0 },
                sonar: AudioSonar::silent(&SonarConfig::default()),
                t: 0.0,
            }
        }

        fn feed(&mut self, heading: f64) -> Option<SequencerEvent> {
            self.t += 16.0;
            let sample = SensorSample {
                raw_heading_deg: heading,
                raw_tilt_deg: 90.0,
                timestamp_ms: self.t,
            };
            self.seq.on_sample(&sample, &mut self.camera, &mut self.sonar)
        }

        /// Hold `heading` until something happens, giving up after `limit`.
        fn hold(&mut self, heading: f64, limit: usize) -> (usize, Option<SequencerEvent>) {
            for n in 1..=limit {
                if let Some(event) = self.feed(heading) {
                    return (n, Some(event));
                }
            }
            (limit, None)
        }
    }

    #[test]
    fn tutorial_ignores_alignment() {
        let mut rig = Rig::new(0);
        let (_, event) = rig.hold(0.0, 200);
        assert_eq!(event, None);
        assert_eq!(rig.seq.phase(), Phase::Tutorial);
        assert!(rig.seq.has_heading());
    }

    #[test]
    fn calibration_latches_current_heading() {
        let mut rig = Rig::new(0);
        for _ in 0..10 {
            rig.feed(-150.0);
        }
        rig.seq.start_session();
        assert_eq!(rig.seq.phase(), Phase::Scanning);
        assert_eq!(rig.seq.calibration_offset(), -150.0);
        rig.feed(-150.0);
        assert!(rig.seq.status().relative_heading_deg.abs() < 1e-9);
    }

    #[test]
    fn full_tour_in_target_order() {
        let mut rig = Rig::new(0);
        let zero = 100.0;
        for _ in 0..5 {
            rig.feed(zero);
        }
        rig.seq.start_session();

        let mut events = Vec::new();
        for (k, bearing) in TARGET_BEARINGS.iter().enumerate() {
            assert_eq!(rig.seq.status().active_index, k);
            let (_, event) = rig.hold(zero + bearing, 400);
            events.push(event.expect("node should capture"));
            assert_eq!(rig.seq.status().lock_progress, 0.0);
        }

        assert_eq!(events.last(), Some(&SequencerEvent::Completed));
        for (k, event) in events[..5].iter().enumerate() {
            assert_eq!(*event, SequencerEvent::Captured { index: k });
        }
        assert_eq!(rig.seq.phase(), Phase::Review);

        let tour = rig.seq.tour().unwrap();
        assert_eq!(tour.len(), 6);
        let bearings: Vec<f64> = tour.frames.iter().map(|(b, _)| *b).collect();
        assert_eq!(bearings, TARGET_BEARINGS.to_vec());
        let order: Vec<u8> = tour.images().map(|img| img.pixels[0][0]).collect();
        assert_eq!(order, vec![1, 2, 3, 4, 5, 6]);

        // Review ignores further samples.
        assert_eq!(rig.hold(zero, 100).1, None);
    }

    #[test]
    fn lock_takes_forty_ticks_once_settled() {
        let mut rig = Rig::new(0);
        rig.feed(0.0);
        rig.seq.start_session();
        let (n, event) = rig.hold(0.0, 100);
        assert_eq!(event, Some(SequencerEvent::Captured { index: 0 }));
        assert_eq!(n, 40);
    }

    #[test]
    fn not_ready_resets_without_advancing() {
        let mut rig = Rig::new(1);
        rig.feed(0.0);
        rig.seq.start_session();

        let (n, event) = rig.hold(0.0, 100);
        assert_eq!(n, 40);
        assert_eq!(event, Some(SequencerEvent::CaptureDeferred { index: 0 }));
        assert_eq!(rig.seq.status().active_index, 0);
        assert_eq!(rig.seq.status().lock_progress, 0.0);
        assert!(rig.seq.nodes()[0].captured_image.is_none());

        // A full re-acquisition is needed before the retry.
        let (n, event) = rig.hold(0.0, 100);
        assert_eq!(n, 40);
        assert_eq!(event, Some(SequencerEvent::Captured { index: 0 }));
    }

    #[test]
    fn wrap_around_target_locks() {
        let mut rig = Rig::new(0);
        rig.feed(170.0);
        rig.seq.start_session();
        // Skip ahead to the 180° node by capturing the first three.
        for bearing in &TARGET_BEARINGS[..3] {
            rig.hold(170.0 + bearing, 400).1.unwrap();
        }
        assert_eq!(rig.seq.status().active_index, 3);
        // 170 + 180 = 350, which the sensor reports as -10.
        let (_, event) = rig.hold(-10.0, 400);
        assert_eq!(event, Some(SequencerEvent::Captured { index: 3 }));
    }

    #[test]
    fn shaking_never_captures() {
        let mut rig = Rig::new(0);
        rig.feed(0.0);
        rig.seq.start_session();
        for i in 0..500 {
            let jitter = if i % 2 == 0 { 1.5 } else { -1.5 };
            assert_eq!(rig.feed(jitter), None);
        }
        assert!(!rig.seq.status().steady);
    }

    #[test]
    fn tilted_phone_never_captures() {
        let mut rig = Rig::new(0);
        rig.feed(0.0);
        rig.seq.start_session();
        for _ in 0..200 {
            rig.t += 16.0;
            let sample = SensorSample {
                raw_heading_deg: 0.0,
                raw_tilt_deg: 60.0,
                timestamp_ms: rig.t,
            };
            assert_eq!(rig.seq.on_sample(&sample, &mut rig.camera, &mut rig.sonar), None);
        }
    }

    #[test]
    fn capture_plays_the_chime() {
        let sink = RecordingSink::default();
        let mut rig = Rig::new(0);
        rig.sonar = AudioSonar::new(Ok(Box::new(sink.clone())), &SonarConfig::default());
        rig.feed(0.0);
        rig.seq.start_session();
        rig.hold(0.0, 100).1.unwrap();
        let played = sink.played.lock().unwrap();
        let chimes = played
            .iter()
            .filter(|(tone, _)| tone.frequency_hz >= 1600.0)
            .count();
        assert_eq!(chimes, 2);
    }

    #[test]
    fn restart_discards_everything() {
        let mut rig = Rig::new(0);
        rig.feed(0.0);
        rig.seq.start_session();
        rig.hold(0.0, 100).1.unwrap();
        rig.seq.restart();
        assert_eq!(rig.seq.phase(), Phase::Tutorial);
        assert!(rig.seq.nodes().iter().all(|n| n.captured_image.is_none()));
        assert_eq!(rig.seq.tour(), None);
    }
}
