use std::{borrow::Cow, error::Error, fmt::Display, sync::mpsc};

/// Things that can go wrong while driving the terminal UI.
#[derive(Debug)]
pub enum GuideGuiError {
    /// The terminal could not be set up, drawn to, or read from
    IOError(std::io::Error),
    /// The worker thread hung up before taking a message
    MPSCSendError,
    /// The worker thread hung up before sending its result
    MPSCRecvError(mpsc::RecvError),
    /// The worker thread panicked
    JoinError,
    /// There is nothing to choose from
    NoDevices,
}

impl Display for GuideGuiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            GuideGuiError::IOError(error) => Cow::from(format!("terminal error: {}", error)),
            GuideGuiError::MPSCSendError => Cow::from("worker thread stopped listening"),
            GuideGuiError::MPSCRecvError(error) => Cow::from(format!("worker thread hung up: {}", error)),
            GuideGuiError::JoinError => Cow::from("worker thread panicked"),
            GuideGuiError::NoDevices => Cow::from("no serial devices found"),
        };
        write!(f, "{}", msg)
    }
}

impl Error for GuideGuiError {}

impl From<std::io::Error> for GuideGuiError {
    fn from(value: std::io::Error) -> Self {
        Self::IOError(value)
    }
}

impl<T> From<mpsc::SendError<T>> for GuideGuiError {
    fn from(_: mpsc::SendError<T>) -> Self {
        Self::MPSCSendError
    }
}

impl From<mpsc::RecvError> for GuideGuiError {
    fn from(value: mpsc::RecvError) -> Self {
        Self::MPSCRecvError(value)
    }
}
