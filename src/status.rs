//! Status bar messages.
//!
//! These are the texts a UI shows while a request moves through the pipeline, and after it fails.

use std::path::Path;

use crate::error::{Error, ErrorKind};

/// Shown once the engine is initialized and the UI is waiting for input.
pub const READY: &str = "Ready";

/// Shown while an image is being decoded and annotated.
pub const PROCESSING: &str = "Image loaded. Processing...";

/// Shown after both display buffers have been produced.
pub const DONE: &str = "Processing done";

/// Returns the heading shown after the user picked `path`.
///
/// Only the file name is shown, not the full path.
pub fn loaded(path: &Path) -> String {
    let name = path.file_name().unwrap_or(path.as_os_str());
    format!("Loaded: {}", name.to_string_lossy())
}

/// Returns the status message describing a failed request.
pub fn failure(error: &Error) -> String {
    match error {
        Error::Decode { path, .. } => {
            let name = path.file_name().unwrap_or(path.as_os_str());
            format!("Could not open image: {}", name.to_string_lossy())
        }
        _ => failure_kind(error.kind()).to_string(),
    }
}

fn failure_kind(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::Decode => "Could not open image",
        ErrorKind::EngineInit => "Pose model could not be loaded",
        ErrorKind::InvalidFrame => "Image cannot be processed",
        ErrorKind::Inference => "Pose estimation failed",
        ErrorKind::PipelineContractViolation => "Pose engine returned an invalid image",
        ErrorKind::InvalidDisplayRegion => "Display area is too small",
        ErrorKind::UnsupportedChannelLayout => "Image format cannot be displayed",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolution::Resolution;

    #[test]
    fn loaded_shows_file_name() {
        assert_eq!(loaded(Path::new("/home/me/pics/run.jpg")), "Loaded: run.jpg");
        assert_eq!(loaded(Path::new("run.jpg")), "Loaded: run.jpg");
    }

    #[test]
    fn failure_messages() {
        let err = Error::Decode {
            path: "/tmp/missing.png".into(),
            source: "not found".into(),
        };
        assert_eq!(failure(&err), "Could not open image: missing.png");

        let err = Error::InvalidDisplayRegion {
            region: Resolution::new(0, 0),
        };
        assert_eq!(err.status_message(), "Display area is too small");
    }
}
