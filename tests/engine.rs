//! Runs the bundled [`Engine`] on a tiny RTMPose-shaped network.
//!
//! The network reshapes its `[1, 3, 17, 17]` input into two `[1, 17, 51]` SimCC outputs, which
//! is enough to drive the whole inference and drawing path without a real model file.

use std::path::{Path, PathBuf};

use poseview::{
    color::Color, process, ChannelOrder, Engine, EngineOptions, ErrorKind, Frame, PoseEngine,
    Resolution,
};

const INPUT: [i64; 4] = [1, 3, 17, 17];
const SIMCC: [i64; 3] = [1, 17, 51];

/// Minimal protobuf writer, enough to produce an ONNX model.
#[derive(Default)]
struct Proto(Vec<u8>);

impl Proto {
    fn varint(&mut self, mut v: u64) {
        loop {
            let byte = (v & 0x7f) as u8;
            v >>= 7;
            if v == 0 {
                self.0.push(byte);
                return;
            }
            self.0.push(byte | 0x80);
        }
    }

    fn int(mut self, field: u64, value: i64) -> Self {
        self.varint(field << 3);
        self.varint(value as u64);
        self
    }

    fn bytes(mut self, field: u64, data: &[u8]) -> Self {
        self.varint(field << 3 | 2);
        self.varint(data.len() as u64);
        self.0.extend_from_slice(data);
        self
    }

    fn string(self, field: u64, s: &str) -> Self {
        self.bytes(field, s.as_bytes())
    }

    fn message(self, field: u64, msg: Proto) -> Self {
        self.bytes(field, &msg.0)
    }
}

const FLOAT: i64 = 1;
const INT64: i64 = 7;

fn value_info(name: &str, dims: &[i64]) -> Proto {
    let shape = dims.iter().fold(Proto::default(), |shape, &dim| {
        shape.message(1, Proto::default().int(1, dim))
    });
    let tensor_type = Proto::default().int(1, FLOAT).message(2, shape);
    Proto::default()
        .string(1, name)
        .message(2, Proto::default().message(1, tensor_type))
}

fn reshape(name: &str) -> Proto {
    Proto::default()
        .string(1, "input")
        .string(1, "simcc_shape")
        .string(2, name)
        .string(3, name)
        .string(4, "Reshape")
}

/// Encodes the model. The outputs are listed `simcc_y` first, like some exporters do.
fn simcc_model() -> Vec<u8> {
    let shape = SIMCC.iter().fold(
        Proto::default()
            .int(1, SIMCC.len() as i64)
            .int(2, INT64)
            .string(8, "simcc_shape"),
        |tensor, &dim| tensor.int(7, dim),
    );
    let graph = Proto::default()
        .message(1, reshape("simcc_y"))
        .message(1, reshape("simcc_x"))
        .string(2, "simcc")
        .message(5, shape)
        .message(11, value_info("input", &INPUT))
        .message(12, value_info("simcc_y", &SIMCC))
        .message(12, value_info("simcc_x", &SIMCC));
    Proto::default()
        .int(1, 7)
        .message(7, graph)
        .message(8, Proto::default().int(2, 13))
        .0
}

fn write_model(dir: &Path) -> PathBuf {
    let path = dir.join("simcc.onnx");
    std::fs::write(&path, simcc_model()).unwrap();
    path
}

fn engine(dir: &Path) -> Engine {
    Engine::with_options(
        EngineOptions::default()
            .model_path(write_model(dir))
            .keypoint_threshold(f32::NEG_INFINITY),
    )
    .unwrap()
}

fn person(res: Resolution) -> Frame {
    Frame::from_fn(res, ChannelOrder::NATIVE, |x, y| {
        let (cx, cy) = (res.width() / 2, res.height() / 2);
        if x.abs_diff(cx) < res.width() / 6 && y.abs_diff(cy) < res.height() / 3 {
            Color::WHITE
        } else {
            Color::from_rgb8(40, 60, 90)
        }
    })
}

#[test]
fn estimates_one_keypoint_per_output_row() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine(dir.path());

    let pose = engine.estimate(&person(Resolution::new(60, 80))).unwrap();
    assert_eq!(pose.keypoints().len(), 17);
    assert!(pose.keypoints().iter().all(|kp| kp.score().is_finite()));
}

#[test]
fn annotation_keeps_geometry_and_input() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine(dir.path());

    for res in [
        Resolution::new(60, 80),
        Resolution::new(123, 45),
        Resolution::new(1, 1),
    ] {
        let frame = person(res);
        let before = frame.clone();

        let annotated = engine.annotate(&frame).unwrap();
        assert_eq!(annotated.frame().geometry(), frame.geometry(), "{res}");
        assert_eq!(annotated.frame().channel_order(), frame.channel_order());
        assert_eq!(frame, before, "input was modified");

        // Same input, same output.
        assert_eq!(engine.annotate(&frame).unwrap(), annotated);
        assert!(process(&frame, &engine).is_ok());
    }
}

#[test]
fn model_input_resolution_can_be_fixed() {
    let dir = tempfile::tempdir().unwrap();
    let options = EngineOptions::default()
        .model_path(write_model(dir.path()))
        .input_resolution(Resolution::new(17, 17));
    let engine = Engine::with_options(options).unwrap();
    assert!(engine.annotate(&person(Resolution::new(30, 30))).is_ok());
}

#[test]
fn rejects_unusable_frames() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine(dir.path());

    let empty = Frame::filled(Resolution::new(0, 4), ChannelOrder::NATIVE, Color::BLACK);
    assert_eq!(
        engine.annotate(&empty).unwrap_err().kind(),
        ErrorKind::InvalidFrame
    );
}
