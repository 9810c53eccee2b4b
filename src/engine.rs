//! The pose engine adapter.
//!
//! [`PoseEngine`] is the seam between the processing pipeline and whatever produces annotated
//! frames. [`Engine`] is the bundled implementation, which runs an RTMPose model on the CPU and
//! draws the estimated skeleton onto a copy of its input.

use std::{
    env, fmt,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::bail;

use crate::{
    draw::Canvas,
    error::{Error, Result},
    frame::{AnnotatedFrame, Frame},
    pose::{rtmpose::RtmPose, Pose},
    resolution::Resolution,
};

/// Quality/speed tier of the pose model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ModelMode {
    /// Fastest, least accurate (RTMPose-s).
    Lightweight,
    /// RTMPose-m.
    #[default]
    Balanced,
    /// Slowest, most accurate (RTMPose-x).
    Performance,
}

impl ModelMode {
    /// Returns the file name of the ONNX model used in this mode.
    pub fn model_file_name(self) -> &'static str {
        match self {
            ModelMode::Lightweight => "rtmpose-s.onnx",
            ModelMode::Balanced => "rtmpose-m.onnx",
            ModelMode::Performance => "rtmpose-x.onnx",
        }
    }
}

impl FromStr for ModelMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        Ok(match s {
            "lightweight" => ModelMode::Lightweight,
            "balanced" => ModelMode::Balanced,
            "performance" => ModelMode::Performance,
            _ => bail!(
                "invalid model mode '{s}' (expected 'lightweight', 'balanced' or 'performance')"
            ),
        })
    }
}

impl fmt::Display for ModelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ModelMode::Lightweight => "lightweight",
            ModelMode::Balanced => "balanced",
            ModelMode::Performance => "performance",
        })
    }
}

/// Compute target for inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum Device {
    #[default]
    Cpu,
}

impl FromStr for Device {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "cpu" => Ok(Device::Cpu),
            _ => bail!("unsupported device '{s}' (only 'cpu' is available)"),
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => f.write_str("cpu"),
        }
    }
}

/// Something that draws pose annotations onto frames.
///
/// Implementations must return a frame with the same resolution, channel count, and channel order
/// as their input, must not modify the input, and should return the same output for the same
/// input. [`process`][crate::pipeline::process] checks the geometry and rejects any result that
/// does not match.
pub trait PoseEngine {
    fn annotate(&self, frame: &Frame) -> Result<AnnotatedFrame>;
}

impl<E: PoseEngine + ?Sized> PoseEngine for &E {
    fn annotate(&self, frame: &Frame) -> Result<AnnotatedFrame> {
        (**self).annotate(frame)
    }
}

impl<E: PoseEngine + ?Sized> PoseEngine for Box<E> {
    fn annotate(&self, frame: &Frame) -> Result<AnnotatedFrame> {
        (**self).annotate(frame)
    }
}

const MODEL_DIR_VAR: &str = "POSEVIEW_MODEL_DIR";
const DEFAULT_MODEL_DIR: &str = "models";

/// Configuration of an [`Engine`].
#[derive(Debug, Clone)]
pub struct EngineOptions {
    mode: ModelMode,
    device: Device,
    model_dir: Option<PathBuf>,
    model_path: Option<PathBuf>,
    input_res: Option<Resolution>,
    keypoint_threshold: f32,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            mode: ModelMode::default(),
            device: Device::default(),
            model_dir: None,
            model_path: None,
            input_res: None,
            keypoint_threshold: 0.5,
        }
    }
}

impl EngineOptions {
    pub fn new(mode: ModelMode, device: Device) -> Self {
        Self {
            mode,
            device,
            ..Self::default()
        }
    }

    pub fn mode(mut self, mode: ModelMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn device(mut self, device: Device) -> Self {
        self.device = device;
        self
    }

    /// Sets the directory the model for the configured [`ModelMode`] is loaded from.
    ///
    /// If unset, the `POSEVIEW_MODEL_DIR` environment variable is used, falling back to `models`.
    pub fn model_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.model_dir = Some(dir.into());
        self
    }

    /// Loads the model from `path`, ignoring the model directory and mode.
    pub fn model_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.model_path = Some(path.into());
        self
    }

    /// Overrides the model's input resolution, for models exported with dynamic input axes.
    pub fn input_resolution(mut self, res: Resolution) -> Self {
        self.input_res = Some(res);
        self
    }

    /// Sets the minimum score a keypoint needs to be drawn. Defaults to 0.5.
    pub fn keypoint_threshold(mut self, threshold: f32) -> Self {
        self.keypoint_threshold = threshold;
        self
    }

    /// Returns the path of the model file these options select.
    pub fn resolved_model_path(&self) -> PathBuf {
        if let Some(path) = &self.model_path {
            return path.clone();
        }

        let dir = match &self.model_dir {
            Some(dir) => dir.clone(),
            None => env::var_os(MODEL_DIR_VAR)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_DIR)),
        };
        dir.join(self.mode.model_file_name())
    }
}

/// The bundled pose engine.
///
/// Created once per process with [`Engine::initialize`] and then used by shared reference. Each
/// call to [`PoseEngine::annotate`] runs one inference pass; no state is kept between calls.
pub struct Engine {
    model: RtmPose,
    mode: ModelMode,
    device: Device,
    keypoint_threshold: f32,
}

impl Engine {
    /// Loads the pose model for `mode` onto `device`.
    ///
    /// The model file is looked up as described in [`EngineOptions::model_dir`]. Any failure
    /// results in [`Error::EngineInit`]; no partially initialized engine is ever returned.
    pub fn initialize(mode: ModelMode, device: Device) -> Result<Self> {
        Self::with_options(EngineOptions::new(mode, device))
    }

    pub fn with_options(options: EngineOptions) -> Result<Self> {
        let path = options.resolved_model_path();
        log::info!(
            "initializing pose engine (mode: {}, device: {}, model: {})",
            options.mode,
            options.device,
            path.display()
        );

        let model = match options.device {
            Device::Cpu => load_model(&path, options.input_res),
        }
        .map_err(|e| {
            log::error!("pose engine initialization failed: {e:#}");
            Error::EngineInit { source: e.into() }
        })?;

        Ok(Self {
            model,
            mode: options.mode,
            device: options.device,
            keypoint_threshold: options.keypoint_threshold,
        })
    }

    pub fn mode(&self) -> ModelMode {
        self.mode
    }

    pub fn device(&self) -> Device {
        self.device
    }

    /// Estimates the pose in `frame` without drawing it.
    pub fn estimate(&self, frame: &Frame) -> Result<Pose> {
        check_frame(frame)?;
        self.model.estimate(frame).map_err(|e| {
            log::debug!("inference failed: {e:#}");
            Error::inference(e)
        })
    }
}

fn load_model(path: &Path, input_res: Option<Resolution>) -> anyhow::Result<RtmPose> {
    if !path.is_file() {
        bail!("model file '{}' does not exist", path.display());
    }
    RtmPose::load(path, input_res)
}

impl PoseEngine for Engine {
    fn annotate(&self, frame: &Frame) -> Result<AnnotatedFrame> {
        let pose = self.estimate(frame)?;
        log::trace!("estimated pose: {:?}", pose.keypoints());

        let mut canvas = Canvas::new(frame);
        pose.draw(&mut canvas, self.keypoint_threshold);
        Ok(canvas.finish())
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("mode", &self.mode)
            .field("device", &self.device)
            .field("input", &self.model.input_resolution())
            .finish()
    }
}

/// Checks that `frame` can be fed to a pose model.
fn check_frame(frame: &Frame) -> Result<()> {
    if frame.is_empty() {
        return Err(Error::invalid_frame(format!("{frame:?} has no pixels")));
    }
    if frame.channel_count() != 3 {
        return Err(Error::invalid_frame(format!(
            "{frame:?} has {} channels (expected 3)",
            frame.channel_count()
        )));
    }
    Ok(())
}
