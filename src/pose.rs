//! Body pose keypoints and their visualization.

pub mod rtmpose;

use std::fmt;

use crate::{color::Color, draw::Canvas};

/// Index of a keypoint in the COCO 17-point body layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeypointIdx {
    Nose = 0,
    LeftEye = 1,
    RightEye = 2,
    LeftEar = 3,
    RightEar = 4,
    LeftShoulder = 5,
    RightShoulder = 6,
    LeftElbow = 7,
    RightElbow = 8,
    LeftWrist = 9,
    RightWrist = 10,
    LeftHip = 11,
    RightHip = 12,
    LeftKnee = 13,
    RightKnee = 14,
    LeftAnkle = 15,
    RightAnkle = 16,
}

impl KeypointIdx {
    pub const COUNT: usize = 17;

    pub const ALL: [Self; Self::COUNT] = {
        use KeypointIdx::*;
        [
            Nose,
            LeftEye,
            RightEye,
            LeftEar,
            RightEar,
            LeftShoulder,
            RightShoulder,
            LeftElbow,
            RightElbow,
            LeftWrist,
            RightWrist,
            LeftHip,
            RightHip,
            LeftKnee,
            RightKnee,
            LeftAnkle,
            RightAnkle,
        ]
    };

    /// Returns which side of the body this keypoint is on.
    pub fn side(self) -> Side {
        match self {
            KeypointIdx::Nose => Side::Center,
            idx if (idx as usize) % 2 == 1 => Side::Left,
            _ => Side::Right,
        }
    }
}

/// Side of the body a keypoint or skeleton link belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
    Center,
}

impl Side {
    /// Returns the color annotations on this side are drawn in.
    pub fn color(self) -> Color {
        match self {
            Side::Left => Color::GREEN,
            Side::Right => Color::ORANGE,
            Side::Center => Color::from_rgb8(51, 153, 255),
        }
    }
}

/// Pairs of keypoints connected by a line when drawing a [`Pose`].
pub const SKELETON: &[(KeypointIdx, KeypointIdx)] = {
    use KeypointIdx::*;
    &[
        (LeftAnkle, LeftKnee),
        (LeftKnee, LeftHip),
        (RightAnkle, RightKnee),
        (RightKnee, RightHip),
        (LeftHip, RightHip),
        (LeftShoulder, LeftHip),
        (RightShoulder, RightHip),
        (LeftShoulder, RightShoulder),
        (LeftShoulder, LeftElbow),
        (RightShoulder, RightElbow),
        (LeftElbow, LeftWrist),
        (RightElbow, RightWrist),
        (LeftEye, RightEye),
        (Nose, LeftEye),
        (Nose, RightEye),
        (LeftEye, LeftEar),
        (RightEye, RightEar),
        (LeftEar, LeftShoulder),
        (RightEar, RightShoulder),
    ]
};

fn link_side(a: KeypointIdx, b: KeypointIdx) -> Side {
    match (a.side(), b.side()) {
        (Side::Left, Side::Left) => Side::Left,
        (Side::Right, Side::Right) => Side::Right,
        _ => Side::Center,
    }
}

/// A single estimated keypoint, in image pixel coordinates.
#[derive(Clone, Copy, PartialEq)]
pub struct Keypoint {
    x: f32,
    y: f32,
    score: f32,
}

impl Keypoint {
    pub fn new(x: f32, y: f32, score: f32) -> Self {
        Self { x, y, score }
    }

    #[inline]
    pub fn x(&self) -> f32 {
        self.x
    }

    #[inline]
    pub fn y(&self) -> f32 {
        self.y
    }

    /// Returns the model's confidence in this keypoint.
    ///
    /// Scores are not probabilities; they are only meaningful relative to a threshold. A score of
    /// 0 or less means the model did not locate the keypoint at all.
    #[inline]
    pub fn score(&self) -> f32 {
        self.score
    }

    fn pixel(&self) -> (i32, i32) {
        (self.x.round() as i32, self.y.round() as i32)
    }
}

impl fmt::Debug for Keypoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.1}, {:.1})@{:.3}", self.x, self.y, self.score)
    }
}

/// The estimated pose of one body.
#[derive(Debug, Clone, PartialEq)]
pub struct Pose {
    keypoints: Vec<Keypoint>,
}

impl Pose {
    /// Creates a pose from a list of keypoints in [`KeypointIdx`] order.
    ///
    /// Models may emit more than [`KeypointIdx::COUNT`] keypoints; any extra ones are kept but are
    /// not part of the [`SKELETON`].
    pub fn new(keypoints: Vec<Keypoint>) -> Self {
        Self { keypoints }
    }

    pub fn keypoints(&self) -> &[Keypoint] {
        &self.keypoints
    }

    /// Returns the keypoint at `idx`, or `None` if the model did not produce it.
    pub fn get(&self, idx: KeypointIdx) -> Option<Keypoint> {
        self.keypoints.get(idx as usize).copied()
    }

    /// Draws the skeleton and keypoints of this pose onto `canvas`.
    ///
    /// Only keypoints whose score exceeds `threshold` are drawn, and a link is only drawn if both
    /// of its endpoints are.
    pub fn draw(&self, canvas: &mut Canvas, threshold: f32) {
        let visible = |idx: KeypointIdx| self.get(idx).filter(|kp| kp.score() > threshold);

        for &(a, b) in SKELETON {
            if let (Some(start), Some(end)) = (visible(a), visible(b)) {
                let ((sx, sy), (ex, ey)) = (start.pixel(), end.pixel());
                canvas
                    .draw_line(sx, sy, ex, ey)
                    .color(link_side(a, b).color())
                    .stroke_width(2);
            }
        }

        for idx in KeypointIdx::ALL {
            if let Some(kp) = visible(idx) {
                let (x, y) = kp.pixel();
                canvas.draw_circle(x, y).color(idx.side().color()).diameter(5);
            }
        }
    }
}
