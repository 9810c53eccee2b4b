//! Single-image body pose estimation.
//!
//! This crate implements the processing core of a small desktop tool: the user picks an image
//! file, a pose model annotates it, and both the original and the annotated image are shown side
//! by side. The window itself is not part of this crate. Instead, a UI layer calls
//! [`Pipeline::load_and_process`] and receives two [`DisplayBuffer`]s, or a typed [`Error`] it can
//! turn into a status message (see [`status`]).
//!
//! # Data flow
//!
//! ```text
//! path ──decode──▶ Frame ──PoseEngine::annotate──▶ AnnotatedFrame
//!                    │                                   │
//!                    └────────to_display_buffer──────────┴──▶ DisplayBuffer (x2)
//! ```
//!
//! Every frame-shaped value carries an explicit [`ChannelOrder`]. Decoded frames use the order
//! the pose model is fed with ([`ChannelOrder::NATIVE`], BGR), display buffers are always RGB.
//! Converting between the two is a named operation ([`Frame::to_channel_order`]) and never
//! implied.
//!
//! # Environment Variables
//!
//! * `POSEVIEW_MODEL_DIR`: Directory containing the RTMPose ONNX models (`rtmpose-s.onnx`,
//!   `rtmpose-m.onnx`, `rtmpose-x.onnx`). Defaults to `models`.
//! * `POSEVIEW_MODE`: Model tier used by the `poseview` binary. One of `lightweight`,
//!   `balanced` (the default) or `performance`.
//! * `POSEVIEW_JPEG_BACKEND`: Configures the JPEG decoder. Allowed values are:
//!   * `jpeg-decoder`: uses the [jpeg-decoder] crate (through `image`). This is the default.
//!   * `zune-jpeg`: uses the [zune-jpeg] crate.
//!
//! [jpeg-decoder]: https://github.com/image-rs/jpeg-decoder/
//! [zune-jpeg]: https://github.com/etemesi254/zune-jpeg

use log::LevelFilter;

pub mod color;
pub mod decode;
pub mod display;
pub mod draw;
pub mod engine;
pub mod error;
pub mod frame;
pub mod nn;
pub mod pipeline;
pub mod pose;
pub mod rect;
pub mod resolution;
pub mod status;
pub mod timer;

pub use decode::decode;
pub use display::{to_display_buffer, DisplayBuffer};
pub use engine::{Device, Engine, EngineOptions, ModelMode, PoseEngine};
pub use error::{Error, ErrorKind, Result};
pub use frame::{AnnotatedFrame, AsFrame, ChannelOrder, Frame};
pub use pipeline::{process, Pipeline, Processed};
pub use resolution::Resolution;

/// macro-use only, not part of public API.
#[doc(hidden)]
pub fn init_logger(calling_crate: &'static str) {
    let log_level = if cfg!(debug_assertions) {
        LevelFilter::Trace
    } else {
        LevelFilter::Debug
    };
    env_logger::Builder::new()
        .filter(Some(calling_crate), log_level)
        .filter(Some(env!("CARGO_CRATE_NAME")), log_level)
        .filter(Some("tract_core"), LevelFilter::Warn)
        .filter(Some("tract_onnx"), LevelFilter::Warn)
        .parse_default_env()
        .try_init()
        .ok();
}

/// Initializes logging to *stderr*.
///
/// If `cfg!(debug_assertions)` is enabled, the calling crate and this library will log at *trace*
/// level. Otherwise, they will log at *debug* level.
///
/// `tract` will always log at *warn* level.
///
/// If a global logger is already registered, this macro will do nothing.
#[macro_export]
macro_rules! init_logger {
    () => {
        $crate::init_logger(env!("CARGO_CRATE_NAME"))
    };
}
