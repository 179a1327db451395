use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InspectError {
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("IO error: {0}")]
    UnreadableSource(#[from] std::io::Error),

    #[error("no MPEG audio frame found")]
    NoAudioFrame,

    #[error("could not determine sample rate: {0}")]
    UnresolvedSampleRate(String),

    #[error("could not determine bitrate: {0}")]
    UnresolvedBitrate(String),

    #[error("indeterminate duration: {0}")]
    IndeterminateDuration(String),
}

impl InspectError {
    /// Wrap an open error, keeping "not found" distinct from other I/O failures.
    pub fn from_open(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            InspectError::FileNotFound(path.into())
        } else {
            InspectError::UnreadableSource(err)
        }
    }
}

#[cfg(feature = "python")]
mod python_errors {
    use super::InspectError;
    use pyo3::create_exception;
    use pyo3::exceptions::PyException;

    // Python exception types mirroring the error kinds
    create_exception!(mpeg_inspect, InspectPyError, PyException);
    create_exception!(mpeg_inspect, NoAudioFrameError, InspectPyError);
    create_exception!(mpeg_inspect, UnresolvedHeaderError, InspectPyError);
    create_exception!(mpeg_inspect, IndeterminateDurationError, InspectPyError);

    impl From<InspectError> for pyo3::PyErr {
        fn from(err: InspectError) -> pyo3::PyErr {
            match err {
                InspectError::FileNotFound(path) => {
                    pyo3::exceptions::PyFileNotFoundError::new_err(path.display().to_string())
                }
                InspectError::UnreadableSource(e) => {
                    pyo3::exceptions::PyIOError::new_err(e.to_string())
                }
                InspectError::NoAudioFrame => {
                    NoAudioFrameError::new_err("no MPEG audio frame found")
                }
                InspectError::UnresolvedSampleRate(msg) | InspectError::UnresolvedBitrate(msg) => {
                    UnresolvedHeaderError::new_err(msg)
                }
                InspectError::IndeterminateDuration(msg) => {
                    IndeterminateDurationError::new_err(msg)
                }
            }
        }
    }
}

#[cfg(feature = "python")]
pub use python_errors::{
    IndeterminateDurationError, InspectPyError, NoAudioFrameError, UnresolvedHeaderError,
};

pub type Result<T> = std::result::Result<T, InspectError>;
