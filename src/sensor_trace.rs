//! Recorded orientation traces, for replaying a capture session without a
//! device. A trace file has the following structure:
//!
//! - A header with some metadata, encoded using [serde] and [ron]:
//!
//!   ```text
//!   (nominal_rate_hz:A,n_samples:B)
//!   ```
//!
//!   where `A` is the rate the trace was recorded at, in samples per second,
//!   and `B` is the number of samples that follow.
//! - A single `0xFF` byte, which never appears in RON text.
//! - The samples, 16 bytes each, all big-endian: raw heading and raw tilt
//!   as `f32`, then the timestamp in milliseconds as `f64`. Device clocks can
//!   run far past what an `f32` holds to the millisecond.

use crate::orientation_source::{OrientationSource, SensorSample};
use serde::{Deserialize, Serialize};
use std::{
    borrow::Cow,
    collections::VecDeque,
    fmt,
    fs::File,
    io::{Read, Write},
    path::Path,
};

const DELIMITER: u8 = 0xFF;
const SAMPLE_BYTES: usize = 16;

/// A recorded sequence of [`SensorSample`]s.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorTrace {
    header: TraceHeader,
    samples: Vec<SensorSample>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
struct TraceHeader {
    nominal_rate_hz: u64,
    n_samples: u64,
}

/// Things that can go wrong while reading or writing a [`SensorTrace`].
#[derive(Debug)]
pub enum TraceError {
    /// The delimiter between header and samples is missing.
    NoDelimiter,

    /// The sample section is not a whole number of samples.
    TryInto,

    /// The header announces a different number of samples than follow it.
    SampleCountMismatch {
        /// Count from the header
        expected: u64,
        /// Count actually present
        found: u64,
    },

    /// Returned when io fails when reading or writing files.
    IoError(std::io::Error),

    /// Returned when serialization of the header fails.
    RonError(ron::Error),

    /// Returned when deserialization of the header fails.
    RonSpannedError(ron::de::SpannedError),
}

impl fmt::Display for TraceError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use TraceError as TE;
        let msg = match self {
            TE::NoDelimiter => Cow::from("no delimiter in trace"),
            TE::TryInto => Cow::from("truncated sample in trace"),
            TE::SampleCountMismatch { expected, found } => Cow::from(format!(
                "trace header promises {} samples but holds {}",
                expected, found
            )),
            TE::IoError(error) => Cow::from(format!("io error: {}", error)),
            TE::RonError(error) => Cow::from(format!("ron error: {}", error)),
            TE::RonSpannedError(error) => Cow::from(format!("ron spanning error: {}", error)),
        };

        write!(f, "{}", msg)
    }
}

impl std::error::Error for TraceError {}

impl SensorTrace {
    /// Wrap samples recorded at roughly `nominal_rate_hz`.
    pub fn new(nominal_rate_hz: u64, samples: Vec<SensorSample>) -> Self {
        Self {
            header: TraceHeader {
                nominal_rate_hz,
                n_samples: samples.len() as u64,
            },
            samples,
        }
    }

    /// The rate the trace was recorded at.
    pub fn nominal_rate_hz(&self) -> u64 {
        self.header.nominal_rate_hz
    }

    /// The recorded samples, in order.
    pub fn samples(&self) -> &[SensorSample] {
        &self.samples
    }

    /// Play the trace back as an [`OrientationSource`].
    pub fn replay(self) -> TraceReplay {
        TraceReplay {
            remaining: self.samples.into(),
            released: false,
        }
    }

    /// Write out the trace to the path provided.
    pub fn to_path(&self, path: impl AsRef<Path>) -> Result<(), TraceError> {
        let mut handle = File::create(path).map_err(TraceError::IoError)?;
        self.to_file(&mut handle)
    }

    /// Write out the trace to the [Write]able object provided.
    pub fn to_file(&self, file: &mut impl Write) -> Result<(), TraceError> {
        let h_str = ron::ser::to_string(&self.header).map_err(TraceError::RonError)?;

        file.write_all(h_str.as_bytes())
            .map_err(TraceError::IoError)?;
        file.write_all(&[DELIMITER]).map_err(TraceError::IoError)?;

        let mut s_buf: Vec<u8> = Vec::with_capacity(self.samples.len() * SAMPLE_BYTES);
        for s in self.samples.iter() {
            s_buf.extend_from_slice(&(s.raw_heading_deg as f32).to_be_bytes());
            s_buf.extend_from_slice(&(s.raw_tilt_deg as f32).to_be_bytes());
            s_buf.extend_from_slice(&s.timestamp_ms.to_be_bytes());
        }

        file.write_all(&s_buf).map_err(TraceError::IoError)
    }

    /// Read a trace from the path provided.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, TraceError> {
        let mut handle = File::open(path).map_err(TraceError::IoError)?;
        Self::from_file(&mut handle)
    }

    /// Read a trace from the [Read]able object provided.
    pub fn from_file(file: &mut impl Read) -> Result<Self, TraceError> {
        let mut raw = Vec::new();
        file.read_to_end(&mut raw).map_err(TraceError::IoError)?;

        let delim_idx = raw
            .iter()
            .position(|b| *b == DELIMITER)
            .ok_or(TraceError::NoDelimiter)?;

        let (header_buf, samples_buf) = raw.split_at(delim_idx);
        let samples_buf = &samples_buf[1..];

        let header = ron::de::from_bytes::<TraceHeader>(header_buf)
            .map_err(TraceError::RonSpannedError)?;

        if samples_buf.len() % SAMPLE_BYTES != 0 {
            return Err(TraceError::TryInto);
        }

        let samples: Vec<SensorSample> = samples_buf
            .chunks(SAMPLE_BYTES)
            .map(|bs| {
                let heading: [u8; 4] = bs[0..4].try_into().map_err(|_| TraceError::TryInto)?;
                let tilt: [u8; 4] = bs[4..8].try_into().map_err(|_| TraceError::TryInto)?;
                let timestamp: [u8; 8] = bs[8..16].try_into().map_err(|_| TraceError::TryInto)?;
                Ok(SensorSample {
                    raw_heading_deg: f32::from_be_bytes(heading) as f64,
                    raw_tilt_deg: f32::from_be_bytes(tilt) as f64,
                    timestamp_ms: f64::from_be_bytes(timestamp),
                })
            })
            .collect::<Result<Vec<SensorSample>, TraceError>>()?;

        if samples.len() as u64 != header.n_samples {
            return Err(TraceError::SampleCountMismatch {
                expected: header.n_samples,
                found: samples.len() as u64,
            });
        }

        Ok(SensorTrace { header, samples })
    }
}

/// A [`SensorTrace`] being played back. Every sample is available at once;
/// callers that want pacing pull them one at a time.
#[derive(Debug, Clone)]
pub struct TraceReplay {
    remaining: VecDeque<SensorSample>,
    released: bool,
}

impl TraceReplay {
    /// Samples not yet handed out.
    pub fn remaining(&self) -> usize {
        self.remaining.len()
    }
}

impl Iterator for TraceReplay {
    type Item = SensorSample;

    fn next(&mut self) -> Option<Self::Item> {
        if self.released {
            return None;
        }
        self.remaining.pop_front()
    }
}

impl OrientationSource for TraceReplay {
    fn clear(&mut self) {
        self.remaining.clear();
    }

    fn release(&mut self) {
        self.released = true;
    }
}
