//! Neural Network inference.
//!
//! Models are loaded from ONNX files and executed on the CPU with [`tract_onnx`].

pub mod tensor;

use std::{ops::Index, path::Path, sync::Arc};

use anyhow::{bail, Context};
use tensor::Tensor;
use tract_onnx::prelude::{
    tvec, DatumExt, Framework, Graph, InferenceModelExt, SimplePlan, TValue, TVec, TypedFact,
    TypedOp,
};

use crate::{color::Color, resolution::Resolution};

type Model = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// A convolutional neural network (CNN) that operates on RGB image data.
///
/// The network has to take a single `[1, 3, H, W]` input. Like the underlying
/// [`NeuralNetwork`], this is a cheaply [`Clone`]able handle.
#[derive(Clone)]
pub struct Cnn {
    nn: NeuralNetwork,
    input_res: Resolution,
    color_mapper: Arc<ColorMapper>,
}

impl Cnn {
    /// Creates a CNN wrapper from a [`NeuralNetwork`].
    pub fn new(nn: NeuralNetwork, color_mapper: ColorMapper) -> anyhow::Result<Self> {
        let input_res = Self::get_input_res(&nn)?;
        Ok(Self {
            nn,
            input_res,
            color_mapper: Arc::new(color_mapper),
        })
    }

    fn get_input_res(nn: &NeuralNetwork) -> anyhow::Result<Resolution> {
        let [input_info] = nn.inputs() else {
            bail!(
                "CNN network has to take exactly 1 input, this one takes {}",
                nn.num_inputs(),
            );
        };

        let &[1, 3, h, w] = input_info.shape() else {
            bail!("invalid CNN input shape {:?} (expected [1, 3, H, W])", input_info.shape());
        };

        let (w, h): (u32, u32) = (w.try_into()?, h.try_into()?);
        Ok(Resolution::new(w, h))
    }

    /// Returns the expected input image size.
    #[inline]
    pub fn input_resolution(&self) -> Resolution {
        self.input_res
    }

    /// Runs the network on an input image, returning the estimated outputs.
    ///
    /// `sample` is called once for every pixel of the network input (with coordinates in
    /// [`Cnn::input_resolution`] space) and has to return the color at that position. This lets
    /// the caller decide how the source image is cropped, scaled, or warped into the input.
    pub fn estimate<S>(&self, mut sample: S) -> anyhow::Result<Outputs>
    where
        S: FnMut(u32, u32) -> Color,
    {
        let (w, h) = (self.input_res.width(), self.input_res.height());
        let mut pixels = Vec::with_capacity(self.input_res.num_pixels() as usize);
        for y in 0..h {
            for x in 0..w {
                pixels.push(self.color_mapper.map(sample(x, y)));
            }
        }

        let (w, h) = (w as usize, h as usize);
        let tensor =
            Tensor::from_array_shape_fn([1, 3, h, w], |[_, c, y, x]| pixels[y * w + x][c]);

        self.nn.estimate(&Inputs::from(tensor))
    }
}

/// Maps 8-bit RGB colors to the per-channel values a network expects, computing
/// `(value - mean) / std` for each channel.
pub struct ColorMapper {
    mean: [f32; 3],
    std: [f32; 3],
}

impl ColorMapper {
    /// `mean` and `std` are given in the `0..=255` range, as is customary for models trained with
    /// ImageNet statistics.
    pub fn standardize(mean: [f32; 3], std: [f32; 3]) -> Self {
        assert!(
            std.iter().all(|&s| s > 0.0),
            "standard deviation must be positive"
        );
        Self { mean, std }
    }

    fn map(&self, color: Color) -> [f32; 3] {
        let rgb = [color.r(), color.g(), color.b()];
        [0, 1, 2].map(|c| (rgb[c] as f32 - self.mean[c]) / self.std[c])
    }
}

/// Neural network loader.
pub struct Loader {
    model_data: Vec<u8>,
    input_shape: Option<Vec<usize>>,
}

impl Loader {
    /// Overrides the shape of the network's first input.
    ///
    /// Exported models frequently declare a symbolic batch dimension. Since inference always runs
    /// on a single image, such models need a concrete input shape before they can be optimized.
    pub fn with_input_shape<S>(mut self, shape: S) -> Self
    where
        S: Into<Vec<usize>>,
    {
        self.input_shape = Some(shape.into());
        self
    }

    /// Loads and optimizes the network.
    ///
    /// Returns an error if the network data is malformed or incomplete, if the network uses
    /// unimplemented operations, or if its input and output shapes are not fully known.
    pub fn load(self) -> anyhow::Result<NeuralNetwork> {
        let mut graph = tract_onnx::onnx().model_for_read(&mut &*self.model_data)?;
        if let Some(shape) = self.input_shape {
            graph = graph.with_input_fact(0, f32::fact(shape).into())?;
        }
        let graph = graph.into_optimized()?;
        let model = SimplePlan::new(graph)?;

        let inputs = (0..model.model().inputs.len())
            .map(|id| node_info(&model, Direction::Input, id))
            .collect::<anyhow::Result<Vec<_>>>()?;
        let outputs = (0..model.model().outputs.len())
            .map(|id| node_info(&model, Direction::Output, id))
            .collect::<anyhow::Result<Vec<_>>>()?;

        Ok(NeuralNetwork(Arc::new(NeuralNetworkImpl {
            inner: model,
            inputs,
            outputs,
        })))
    }
}

enum Direction {
    Input,
    Output,
}

fn node_info(model: &Model, dir: Direction, id: usize) -> anyhow::Result<NodeInfo> {
    let graph = model.model();
    let (fact, outlet) = match dir {
        Direction::Input => (graph.input_fact(id)?, graph.input_outlets()?[id]),
        Direction::Output => (graph.output_fact(id)?, graph.output_outlets()?[id]),
    };
    let name = graph.node(outlet.node).name.clone();
    let shape = match fact.shape.as_concrete() {
        Some(shape) => shape.to_vec(),
        None => bail!(
            "network node '{name}' has symbolic shape {:?}; an explicit input shape is needed",
            fact.shape
        ),
    };

    Ok(NodeInfo { name, shape })
}

/// A neural network that can be used for inference.
///
/// This is a cheaply [`Clone`]able handle to the underlying network structures.
#[derive(Clone)]
pub struct NeuralNetwork(Arc<NeuralNetworkImpl>);

struct NeuralNetworkImpl {
    inner: Model,
    inputs: Vec<NodeInfo>,
    outputs: Vec<NodeInfo>,
}

impl NeuralNetwork {
    /// Loads a pre-trained model from an ONNX file path.
    ///
    /// The path must have a `.onnx` extension.
    pub fn from_path<P: AsRef<Path>>(path: P) -> anyhow::Result<Loader> {
        Self::from_path_impl(path.as_ref())
    }

    fn from_path_impl(path: &Path) -> anyhow::Result<Loader> {
        match path.extension() {
            Some(ext) if ext == "onnx" => {}
            _ => bail!("neural network file must have `.onnx` extension"),
        }

        let model_data = std::fs::read(path)
            .with_context(|| format!("failed to read model file '{}'", path.display()))?;
        Ok(Loader {
            model_data,
            input_shape: None,
        })
    }

    pub fn num_inputs(&self) -> usize {
        self.0.inputs.len()
    }

    /// Returns the network's input node information.
    ///
    /// To perform inference, a matching input tensor has to be provided for each input.
    pub fn inputs(&self) -> &[NodeInfo] {
        &self.0.inputs
    }

    /// Returns the network's output node information.
    pub fn outputs(&self) -> &[NodeInfo] {
        &self.0.outputs
    }

    /// Runs the network on a set of [`Inputs`], returning the estimated [`Outputs`].
    #[doc(alias = "infer")]
    pub fn estimate(&self, inputs: &Inputs) -> anyhow::Result<Outputs> {
        if inputs.len() != self.num_inputs() {
            bail!(
                "network takes {} inputs, but {} were provided",
                self.num_inputs(),
                inputs.len()
            );
        }

        let values = inputs
            .iter()
            .map(|t| Ok(TValue::from_const(Arc::new(t.to_tract()?))))
            .collect::<anyhow::Result<TVec<_>>>()?;
        let outputs = self.0.inner.run(values)?;
        let outputs = outputs
            .iter()
            .map(|tract| Tensor::from_tract(tract))
            .collect::<anyhow::Result<TVec<_>>>()?;
        Ok(Outputs { inner: outputs })
    }
}

/// Name and shape of a neural network input or output node.
#[derive(Debug, Clone)]
pub struct NodeInfo {
    name: String,
    shape: Vec<usize>,
}

impl NodeInfo {
    #[inline]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[cfg(test)]
    pub(crate) fn new(name: &str, shape: &[usize]) -> Self {
        Self {
            name: name.to_string(),
            shape: shape.to_vec(),
        }
    }
}

/// The result of a neural network inference pass.
///
/// This is a list of tensors corresponding to the network's output nodes.
#[derive(Debug)]
pub struct Outputs {
    inner: TVec<Tensor>,
}

impl Outputs {
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl Index<usize> for Outputs {
    type Output = Tensor;

    fn index(&self, index: usize) -> &Tensor {
        &self.inner[index]
    }
}

/// List of input tensors for neural network inference.
#[derive(Debug)]
pub struct Inputs {
    inner: TVec<Tensor>,
}

impl Inputs {
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    fn iter(&self) -> impl Iterator<Item = &Tensor> {
        self.inner.iter()
    }
}

impl From<Tensor> for Inputs {
    fn from(t: Tensor) -> Self {
        Self { inner: tvec![t] }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn standardize() {
        let mapper = ColorMapper::standardize([100.0, 50.0, 0.0], [2.0, 5.0, 255.0]);
        let [r, g, b] = mapper.map(Color::from_rgb8(110, 40, 255));
        assert_relative_eq!(r, 5.0);
        assert_relative_eq!(g, -2.0);
        assert_relative_eq!(b, 1.0);
    }

    #[test]
    fn rejects_non_onnx_paths() {
        assert!(NeuralNetwork::from_path("model.tflite").is_err());
        assert!(NeuralNetwork::from_path("does/not/exist.onnx").is_err());
    }

    #[test]
    fn rejects_garbage_models() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.onnx");
        std::fs::write(&path, b"not a protobuf").unwrap();
        assert!(NeuralNetwork::from_path(&path).unwrap().load().is_err());
    }
}
