//! A [`ToneSink`] that renders the sonar into a WAV file instead of a
//! speaker, so a simulated or replayed session can be listened to later.

use crate::audio_sonar::{AudioError, Tone, ToneSink};
use crate::orientation_source::Millis;
use hound::{Error as HoundError, SampleFormat, WavSpec, WavWriter};
use log::info;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Sample rate of the rendered file.
pub const SAMPLE_RATE: u32 = 44100;

#[derive(Default)]
struct Timeline {
    origin_ms: Option<Millis>,
    samples: Vec<f32>,
    accepting: bool,
}

/// Mixes scheduled tones into a mono timeline and writes it out as 16-bit
/// PCM on [`WavToneSink::finalize`]. Clones share the timeline: hand one
/// clone to the sonar and keep another to finalize once the session ends.
#[derive(Clone)]
pub struct WavToneSink {
    path: PathBuf,
    timeline: Arc<Mutex<Timeline>>,
}

impl WavToneSink {
    /// Prepare a sink that will write to `path`. Nothing touches the disk
    /// until [`WavToneSink::finalize`].
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            timeline: Arc::new(Mutex::new(Timeline {
                accepting: true,
                ..Default::default()
            })),
        }
    }

    fn timeline(&self) -> MutexGuard<'_, Timeline> {
        self.timeline.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Length of the mixed audio so far, in samples.
    pub fn len(&self) -> usize {
        self.timeline().samples.len()
    }

    /// Whether no tone has been mixed in yet.
    pub fn is_empty(&self) -> bool {
        self.timeline().samples.is_empty()
    }

    /// Write the timeline out. The first tone ever scheduled sits at the
    /// start of the file. Returns the number of samples written.
    pub fn finalize(&self) -> Result<usize, HoundError> {
        let spec = WavSpec {
            channels: 1,
            sample_rate: SAMPLE_RATE,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(&self.path, spec)?;

        let timeline = self.timeline();
        for sample in timeline.samples.iter() {
            let scaled = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
            writer.write_sample(scaled)?;
        }
        writer.finalize()?;

        info!(
            "WavToneSink : wrote {} samples to {}.",
            timeline.samples.len(),
            self.path.display()
        );
        Ok(timeline.samples.len())
    }
}

impl ToneSink for WavToneSink {
    fn play(&mut self, tone: &Tone, at_ms: Millis) -> Result<(), AudioError> {
        let mut timeline = self.timeline();
        if !timeline.accepting {
            return Err(AudioError::Playback("sink suspended".to_string()));
        }

        let origin = *timeline.origin_ms.get_or_insert(at_ms);
        if at_ms < origin {
            return Err(AudioError::Playback(format!(
                "tone at {} ms predates the recording",
                at_ms
            )));
        }

        let start = ((at_ms - origin) / 1000.0 * SAMPLE_RATE as f64).round() as usize;
        let rendered = tone.synthesize(SAMPLE_RATE);
        let end = start + rendered.len();
        if timeline.samples.len() < end {
            timeline.samples.resize(end, 0.0);
        }
        for (mixed, new) in timeline.samples[start..end].iter_mut().zip(rendered) {
            *mixed += new;
        }
        Ok(())
    }

    fn suspend(&mut self) {
        self.timeline().accepting = false;
    }
}
