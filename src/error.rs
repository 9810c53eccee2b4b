//! Error types returned by the processing pipeline.

use std::{fmt, path::PathBuf};

use crate::{
    frame::{ChannelOrder, Geometry},
    resolution::Resolution,
};

/// Type-erased error used as the underlying cause of decode and inference failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Everything that can go wrong while turning an image file into display buffers.
///
/// All variants except [`Error::EngineInit`] describe the failure of a single request. They are
/// returned to the caller and leave no partially written output behind. [`Error::EngineInit`] is
/// raised only while setting up the pose engine and means no request can ever succeed.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The image file is missing, unreadable, empty, corrupt, or of an unsupported format.
    #[error("failed to decode image '{}'", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    /// The pose model could not be loaded.
    #[error("failed to initialize pose engine")]
    EngineInit {
        #[source]
        source: BoxError,
    },

    /// A frame handed to the engine or to display conversion is malformed or empty.
    #[error("invalid frame: {reason}")]
    InvalidFrame { reason: String },

    /// The inference backend failed to process an otherwise valid frame.
    #[error("pose inference failed")]
    Inference {
        #[source]
        source: BoxError,
    },

    /// The engine returned a frame whose geometry or channel order does not match its input.
    #[error(
        "pose engine returned a {actual} {actual_order:?} frame for a {expected} {expected_order:?} input"
    )]
    PipelineContractViolation {
        expected: Geometry,
        actual: Geometry,
        expected_order: ChannelOrder,
        actual_order: ChannelOrder,
    },

    /// A display region with zero width or height was requested.
    #[error("invalid display region {region}")]
    InvalidDisplayRegion { region: Resolution },

    /// Display conversion only handles 3-channel frames.
    #[error("unsupported channel layout: {channels} channels (expected 3)")]
    UnsupportedChannelLayout { channels: usize },
}

impl Error {
    pub(crate) fn invalid_frame(reason: impl Into<String>) -> Self {
        Self::InvalidFrame {
            reason: reason.into(),
        }
    }

    pub(crate) fn inference(source: impl Into<BoxError>) -> Self {
        Self::Inference {
            source: source.into(),
        }
    }

    /// Returns the status message a UI should show for this error.
    pub fn status_message(&self) -> String {
        crate::status::failure(self)
    }

    /// Returns the [`ErrorKind`] of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Decode { .. } => ErrorKind::Decode,
            Error::EngineInit { .. } => ErrorKind::EngineInit,
            Error::InvalidFrame { .. } => ErrorKind::InvalidFrame,
            Error::Inference { .. } => ErrorKind::Inference,
            Error::PipelineContractViolation { .. } => ErrorKind::PipelineContractViolation,
            Error::InvalidDisplayRegion { .. } => ErrorKind::InvalidDisplayRegion,
            Error::UnsupportedChannelLayout { .. } => ErrorKind::UnsupportedChannelLayout,
        }
    }
}

/// Field-less discriminant of [`Error`], for matching and status reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Decode,
    EngineInit,
    InvalidFrame,
    Inference,
    PipelineContractViolation,
    InvalidDisplayRegion,
    UnsupportedChannelLayout,
}

impl ErrorKind {
    /// Returns whether this kind of error is fatal for the whole process rather than one request.
    pub fn is_fatal(self) -> bool {
        self == ErrorKind::EngineInit
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ErrorKind::Decode => "decode error",
            ErrorKind::EngineInit => "engine initialization error",
            ErrorKind::InvalidFrame => "invalid frame",
            ErrorKind::Inference => "inference error",
            ErrorKind::PipelineContractViolation => "pipeline contract violation",
            ErrorKind::InvalidDisplayRegion => "invalid display region",
            ErrorKind::UnsupportedChannelLayout => "unsupported channel layout",
        })
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn decode_error_keeps_cause() {
        let err = Error::Decode {
            path: "missing.png".into(),
            source: "no such file".into(),
        };
        assert_eq!(err.kind(), ErrorKind::Decode);
        assert_eq!(err.to_string(), "failed to decode image 'missing.png'");
        assert_eq!(err.source().unwrap().to_string(), "no such file");
    }

    #[test]
    fn only_engine_init_is_fatal() {
        assert!(ErrorKind::EngineInit.is_fatal());
        assert!(!ErrorKind::Decode.is_fatal());
        assert!(!ErrorKind::PipelineContractViolation.is_fatal());
    }
}
