//! Top-down body pose estimation with RTMPose.
//!
//! RTMPose is a SimCC model: instead of a 2D heatmap, it outputs one 1D classification vector per
//! axis and keypoint, at a resolution `split_ratio` times finer than the network input. The
//! keypoint location along each axis is the argmax of its vector.
//!
//! Since no person detector is run, the whole image is treated as the person bounding box. This
//! works best for images that show a single person filling most of the frame.

use std::path::Path;

use anyhow::{bail, Context};

use crate::{
    color::Color,
    frame::Frame,
    nn::{tensor::Tensor, Cnn, ColorMapper, NeuralNetwork, NodeInfo},
    resolution::Resolution,
};

use super::{Keypoint, Pose};

/// Bounding boxes are enlarged by this factor before cropping, to leave some context around the
/// person.
const BBOX_PADDING: f32 = 1.25;

const MEAN: [f32; 3] = [123.675, 116.28, 103.53];
const STD: [f32; 3] = [58.395, 57.12, 57.375];

/// An RTMPose body keypoint model.
#[derive(Clone)]
pub struct RtmPose {
    cnn: Cnn,
    layout: SimccLayout,
}

impl RtmPose {
    /// Loads an RTMPose model from an ONNX file.
    ///
    /// If `input_res` is given, it overrides the input resolution declared by the model, which is
    /// required for models exported with dynamic input axes.
    pub fn load(path: &Path, input_res: Option<Resolution>) -> anyhow::Result<Self> {
        let mut loader = NeuralNetwork::from_path(path)?;
        if let Some(res) = input_res {
            loader = loader.with_input_shape([
                1,
                3,
                res.height() as usize,
                res.width() as usize,
            ]);
        }
        let nn = loader
            .load()
            .with_context(|| format!("failed to load RTMPose model '{}'", path.display()))?;
        Self::from_network(nn)
    }

    /// Wraps a loaded network, checking that its inputs and outputs have the RTMPose layout.
    pub fn from_network(nn: NeuralNetwork) -> anyhow::Result<Self> {
        let outputs = nn.outputs().to_vec();
        let cnn = Cnn::new(nn, ColorMapper::standardize(MEAN, STD))?;
        let input_res = cnn.input_resolution();
        let layout = SimccLayout::new(&outputs, input_res)?;

        log::debug!(
            "RTMPose model: {input_res} input, {} keypoints, split ratio {}",
            layout.num_keypoints,
            layout.split_ratio,
        );

        Ok(Self { cnn, layout })
    }

    /// Returns the resolution of the network input.
    pub fn input_resolution(&self) -> Resolution {
        self.cnn.input_resolution()
    }

    pub fn num_keypoints(&self) -> usize {
        self.layout.num_keypoints
    }

    /// Estimates the pose of the person filling `frame`.
    ///
    /// Keypoints are returned in `frame`'s pixel coordinates.
    pub fn estimate(&self, frame: &Frame) -> anyhow::Result<Pose> {
        let input_res = self.input_resolution();
        let transform = BoxTransform::whole_image(frame.resolution(), input_res);
        log::trace!("RTMPose crop: {:?}", transform);

        let outputs = self
            .cnn
            .estimate(|x, y| transform.sample(frame, x, y))?;
        let layout = &self.layout;
        let keypoints = decode_simcc(
            &outputs[layout.x_output],
            &outputs[layout.y_output],
            layout.split_ratio,
        )?
        .into_iter()
        .map(|(loc, score)| {
            let [x, y] = transform.to_image(loc);
            Keypoint::new(x, y, score)
        })
        .collect();

        Ok(Pose::new(keypoints))
    }
}

/// Which network outputs hold the horizontal and vertical SimCC vectors, and their resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
struct SimccLayout {
    x_output: usize,
    y_output: usize,
    num_keypoints: usize,
    split_ratio: f32,
}

impl SimccLayout {
    fn new(outputs: &[NodeInfo], input_res: Resolution) -> anyhow::Result<Self> {
        let [a, b] = outputs else {
            bail!("RTMPose model must have 2 outputs, this one has {}", outputs.len());
        };
        // Exported models name their outputs `simcc_x` and `simcc_y`; fall back to output order.
        let (x_output, y_output) = if a.name().contains("_y") && b.name().contains("_x") {
            (1, 0)
        } else {
            (0, 1)
        };
        let (x_shape, y_shape) = (outputs[x_output].shape(), outputs[y_output].shape());

        let (&[1, kx, x_len], &[1, ky, y_len]) = (x_shape, y_shape) else {
            bail!("unexpected SimCC output shapes {x_shape:?} and {y_shape:?}");
        };
        if kx != ky || kx == 0 {
            bail!("SimCC outputs disagree on keypoint count: {kx} vs {ky}");
        }

        let x_ratio = x_len as f32 / input_res.width() as f32;
        let y_ratio = y_len as f32 / input_res.height() as f32;
        if (x_ratio - y_ratio).abs() > 1e-3 || x_ratio < 1.0 {
            bail!(
                "invalid SimCC split ratio ({x_ratio} horizontally, {y_ratio} vertically) for \
                 {input_res} input"
            );
        }

        Ok(Self {
            x_output,
            y_output,
            num_keypoints: kx,
            split_ratio: x_ratio,
        })
    }
}

/// Maps between image pixel coordinates and network input coordinates.
///
/// The network input shows the image region of size `scale` centered on `center`, scaled
/// uniformly.
#[derive(Debug, Clone, Copy, PartialEq)]
struct BoxTransform {
    center: [f32; 2],
    scale: [f32; 2],
    input_size: [f32; 2],
}

impl BoxTransform {
    /// Computes the crop for a bounding box covering the whole image.
    fn whole_image(image: Resolution, input: Resolution) -> Self {
        let (w, h) = (image.width() as f32, image.height() as f32);
        let input_size = [input.width() as f32, input.height() as f32];
        let aspect = input_size[0] / input_size[1];

        let (sw, sh) = (w * BBOX_PADDING, h * BBOX_PADDING);
        let scale = if sw > sh * aspect {
            [sw, sw / aspect]
        } else {
            [sh * aspect, sh]
        };

        Self {
            center: [w / 2.0, h / 2.0],
            scale,
            input_size,
        }
    }

    /// Maps a position in network input space to image space.
    fn to_image(&self, [x, y]: [f32; 2]) -> [f32; 2] {
        [
            x / self.input_size[0] * self.scale[0] + self.center[0] - self.scale[0] / 2.0,
            y / self.input_size[1] * self.scale[1] + self.center[1] - self.scale[1] / 2.0,
        ]
    }

    /// Computes the color of the network input pixel at `(x, y)`.
    fn sample(&self, frame: &Frame, x: u32, y: u32) -> Color {
        let [sx, sy] = self.to_image([x as f32, y as f32]);
        sample_bilinear(frame, sx, sy)
    }
}

/// Samples `frame` at a fractional position, treating everything outside the frame as black.
fn sample_bilinear(frame: &Frame, x: f32, y: f32) -> Color {
    let (x0, y0) = (x.floor(), y.floor());
    let (fx, fy) = (x - x0, y - y0);
    let (x0, y0) = (x0 as i64, y0 as i64);

    let fetch = |x: i64, y: i64| -> [f32; 3] {
        if x < 0 || y < 0 || x >= i64::from(frame.width()) || y >= i64::from(frame.height()) {
            return [0.0; 3];
        }
        let c = frame.color(x as u32, y as u32);
        [c.r(), c.g(), c.b()].map(f32::from)
    };

    let (tl, tr, bl, br) = (
        fetch(x0, y0),
        fetch(x0 + 1, y0),
        fetch(x0, y0 + 1),
        fetch(x0 + 1, y0 + 1),
    );
    let [r, g, b] = [0, 1, 2].map(|c| {
        let top = tl[c] * (1.0 - fx) + tr[c] * fx;
        let bottom = bl[c] * (1.0 - fx) + br[c] * fx;
        (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8
    });
    Color::from_rgb8(r, g, b)
}

/// Decodes SimCC outputs into keypoint locations (in network input space) and scores.
///
/// Keypoints whose score is not positive get the location `[-1, -1]`.
fn decode_simcc(
    simcc_x: &Tensor,
    simcc_y: &Tensor,
    split_ratio: f32,
) -> anyhow::Result<Vec<([f32; 2], f32)>> {
    let (&[1, k, _], &[1, ky, _]) = (simcc_x.shape(), simcc_y.shape()) else {
        bail!(
            "unexpected SimCC output shapes {:?} and {:?}",
            simcc_x.shape(),
            simcc_y.shape()
        );
    };
    if k != ky {
        bail!("SimCC outputs disagree on keypoint count: {k} vs {ky}");
    }

    let keypoints = (0..k)
        .map(|i| {
            let (ix, vx) = argmax(simcc_x.index([0, i]).as_slice());
            let (iy, vy) = argmax(simcc_y.index([0, i]).as_slice());
            let score = vx.min(vy);
            let loc = if score <= 0.0 {
                [-1.0, -1.0]
            } else {
                [ix as f32 / split_ratio, iy as f32 / split_ratio]
            };
            (loc, score)
        })
        .collect();
    Ok(keypoints)
}

/// Returns the index and value of the first maximum in `values`.
fn argmax(values: &[f32]) -> (usize, f32) {
    values
        .iter()
        .copied()
        .enumerate()
        .fold((0, f32::NEG_INFINITY), |(bi, bv), (i, v)| {
            if v > bv {
                (i, v)
            } else {
                (bi, bv)
            }
        })
}
