//! Failures that a capture session surfaces to its caller. Transient
//! conditions (a camera frame not being ready yet, audio being blocked) never
//! show up here; the session absorbs them.

use crate::camera_source::CameraUnavailable;
use crate::capture_sequencer::Phase;
use std::{borrow::Cow, fmt};

/// A structural failure of a capture session.
#[derive(Debug, Clone, PartialEq)]
pub enum GuideError {
    /// No orientation sample arrived before the acquisition timeout
    SensorUnavailable,

    /// Every rung of the camera capability ladder failed
    CameraUnavailable(CameraUnavailable),

    /// The session has already been torn down
    SessionClosed,

    /// The request does not make sense in the current phase
    WrongPhase(Phase),
}

impl fmt::Display for GuideError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use GuideError as GE;
        let msg = match self {
            GE::SensorUnavailable => Cow::from("orientation sensor unavailable"),
            GE::CameraUnavailable(error) => Cow::from(format!("{}", error)),
            GE::SessionClosed => Cow::from("capture session already closed"),
            GE::WrongPhase(phase) => Cow::from(format!("not allowed while {:?}", phase)),
        };

        write!(f, "{}", msg)
    }
}

impl std::error::Error for GuideError {}

impl From<CameraUnavailable> for GuideError {
    fn from(value: CameraUnavailable) -> Self {
        Self::CameraUnavailable(value)
    }
}
