//! Sonar feedback: short beeps whose cadence and pitch encode how far the
//! device is from its target, so the user does not have to watch the screen.
//!
//! Closer alignment means faster, higher beeps. Beyond the sonar range the
//! speaker stays quiet. Audio is strictly best-effort: if the output cannot
//! be opened, or fails later, the sonar goes silent and capture carries on.

use crate::angle_math::Degree;
use crate::config::SonarConfig;
use crate::orientation_source::Millis;
use log::{debug, warn};
use std::{borrow::Cow, f32::consts::PI, fmt};

const BEEP_GAIN: f32 = 0.05;
const RAMP_FLOOR_GAIN: f32 = 0.001;

/// First tone of the success chime, played immediately.
pub const CHIME_FIRST: Tone = Tone {
    frequency_hz: 1600.0,
    duration_s: 0.1,
    gain: BEEP_GAIN,
};

/// Second, higher tone of the success chime.
pub const CHIME_SECOND: Tone = Tone {
    frequency_hz: 2000.0,
    duration_s: 0.2,
    gain: BEEP_GAIN,
};

/// Delay between the two chime tones.
pub const CHIME_GAP_MS: Millis = 100.0;

/// A sine burst with an exponential decay envelope.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tone {
    /// Pitch of the sine
    pub frequency_hz: f32,
    /// Length of the burst
    pub duration_s: f32,
    /// Starting amplitude, ramped down to 0.001 over the duration
    pub gain: f32,
}

impl Tone {
    /// Render the tone as mono `f32` samples. The envelope starts at `gain`
    /// and decays exponentially to 0.001, which keeps the cut-off click-free.
    pub fn synthesize(&self, sample_rate: u32) -> Vec<f32> {
        let n = (self.duration_s * sample_rate as f32).round() as usize;
        let ratio = RAMP_FLOOR_GAIN / self.gain;
        (0..n)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                let envelope = self.gain * ratio.powf(t / self.duration_s);
                envelope * (2.0 * PI * self.frequency_hz * t).sin()
            })
            .collect()
    }
}

/// Cadence and pitch for a given angular error.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SonarCue {
    /// Minimum gap between beeps
    pub interval_ms: Millis,
    /// Pitch of the beep
    pub frequency_hz: f64,
}

impl SonarCue {
    /// Linear mapping from angular error to cue. The error is clamped to
    /// the sonar range; whether a beep plays at all is decided by
    /// [`AudioSonar::update`].
    pub fn for_error(angular_error: Degree, config: &SonarConfig) -> Self {
        let fraction = (angular_error.abs() / config.range_deg).min(1.0);
        Self {
            interval_ms: config.min_interval_ms
                + fraction * (config.max_interval_ms - config.min_interval_ms),
            frequency_hz: config.max_frequency_hz
                - fraction * (config.max_frequency_hz - config.min_frequency_hz),
        }
    }
}

/// Returned when the audio output cannot be opened or stops working.
#[derive(Debug)]
pub enum AudioError {
    /// No output device, or the platform refused to start audio
    Unavailable(String),
    /// The device accepted a tone but failed while scheduling it
    Playback(String),
}

impl fmt::Display for AudioError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let msg = match self {
            AudioError::Unavailable(why) => Cow::from(format!("audio unavailable: {}", why)),
            AudioError::Playback(why) => Cow::from(format!("audio playback failed: {}", why)),
        };
        write!(f, "{}", msg)
    }
}

impl std::error::Error for AudioError {}

/// Anything that can schedule a [`Tone`] to start at a point on the
/// session clock.
pub trait ToneSink {
    /// Schedule `tone` to start at `at_ms`.
    fn play(&mut self, tone: &Tone, at_ms: Millis) -> Result<(), AudioError>;

    /// Stop producing sound and release the output device.
    fn suspend(&mut self);
}

/// Drives a [`ToneSink`] from the angular error, one call per sample.
pub struct AudioSonar {
    config: SonarConfig,
    sink: Option<Box<dyn ToneSink>>,
    last_played: Option<Millis>,
}

impl AudioSonar {
    /// Wrap the result of opening an audio output. A failed open leaves the
    /// sonar silent for its whole life.
    pub fn new(sink: Result<Box<dyn ToneSink>, AudioError>, config: &SonarConfig) -> Self {
        let sink = match sink {
            Ok(sink) => Some(sink),
            Err(error) => {
                warn!("AudioSonar : {}, continuing without sound.", error);
                None
            }
        };
        Self {
            config: config.clone(),
            sink,
            last_played: None,
        }
    }

    /// A sonar with no output at all.
    pub fn silent(config: &SonarConfig) -> Self {
        Self {
            config: config.clone(),
            sink: None,
            last_played: None,
        }
    }

    /// Whether tones still reach an output.
    pub fn is_audible(&self) -> bool {
        self.sink.is_some()
    }

    /// Consider a beep for the current angular error. Returns the cue when a
    /// beep was due, even if the sink is silent, so callers can mirror the
    /// cadence visually.
    pub fn update(&mut self, angular_error: Degree, now: Millis) -> Option<SonarCue> {
        if angular_error.abs() >= self.config.range_deg {
            return None;
        }

        let cue = SonarCue::for_error(angular_error, &self.config);
        let due = match self.last_played {
            None => true,
            Some(last) => now - last > cue.interval_ms,
        };
        if !due {
            return None;
        }

        self.last_played = Some(now);
        let tone = Tone {
            frequency_hz: cue.frequency_hz as f32,
            duration_s: self.config.beep_duration_s as f32,
            gain: BEEP_GAIN,
        };
        debug!(
            "AudioSonar : beep {:.0} Hz, next in {:.0} ms",
            cue.frequency_hz, cue.interval_ms
        );
        self.emit(&tone, now);
        Some(cue)
    }

    /// The two-tone success chime, independent of the sonar cadence.
    pub fn chime(&mut self, now: Millis) {
        self.emit(&CHIME_FIRST, now);
        self.emit(&CHIME_SECOND, now + CHIME_GAP_MS);
    }

    /// Silence the output and release it. Safe to call repeatedly.
    pub fn suspend(&mut self) {
        if let Some(mut sink) = self.sink.take() {
            sink.suspend();
        }
        self.last_played = None;
    }

    fn emit(&mut self, tone: &Tone, at: Millis) {
        if let Some(sink) = self.sink.as_mut() {
            if let Err(error) = sink.play(tone, at) {
                warn!("AudioSonar : {}, continuing without sound.", error);
                sink.suspend();
                self.sink = None;
            }
        }
    }
}
