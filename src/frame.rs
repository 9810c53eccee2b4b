//! In-memory pixel frames.
//!
//! A [`Frame`] is an owned, immutable, row-major 8-bit pixel matrix with an explicit
//! [`ChannelOrder`]. Operations on frames never modify them in place; they return new frames
//! instead.

use std::fmt;

use crate::{
    color::Color,
    error::{Error, Result},
    resolution::Resolution,
};

/// Order in which the color components of a pixel are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelOrder {
    Rgb,
    Bgr,
    Rgba,
    Bgra,
}

impl ChannelOrder {
    /// The order frames are decoded into and handed to the pose engine.
    pub const NATIVE: Self = Self::Bgr;

    /// The order of every [`DisplayBuffer`][crate::display::DisplayBuffer].
    pub const DISPLAY: Self = Self::Rgb;

    /// Returns the number of bytes each pixel occupies.
    #[inline]
    pub fn channel_count(self) -> usize {
        match self {
            ChannelOrder::Rgb | ChannelOrder::Bgr => 3,
            ChannelOrder::Rgba | ChannelOrder::Bgra => 4,
        }
    }

    /// Returns the order with the red and blue channel exchanged.
    ///
    /// Applying this twice yields the original order.
    pub fn swap_red_blue(self) -> Self {
        match self {
            ChannelOrder::Rgb => ChannelOrder::Bgr,
            ChannelOrder::Bgr => ChannelOrder::Rgb,
            ChannelOrder::Rgba => ChannelOrder::Bgra,
            ChannelOrder::Bgra => ChannelOrder::Rgba,
        }
    }
}

/// Width, height, and channel count of a frame.
///
/// Two frames with the same geometry have buffers of identical size and layout (up to channel
/// order).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Geometry {
    pub resolution: Resolution,
    pub channels: usize,
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.resolution, self.channels)
    }
}

/// A decoded image held in memory.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    res: Resolution,
    order: ChannelOrder,
    data: Box<[u8]>,
}

impl Frame {
    /// Creates a frame from preexisting, tightly packed pixel data.
    ///
    /// `data` must contain exactly `width * height * channels` bytes, with rows stored top to
    /// bottom and no padding between them. Otherwise, [`Error::InvalidFrame`] is returned.
    pub fn from_raw(
        res: Resolution,
        order: ChannelOrder,
        data: impl Into<Box<[u8]>>,
    ) -> Result<Self> {
        let data = data.into();
        let expected = res.num_pixels() * order.channel_count() as u64;
        if data.len() as u64 != expected {
            return Err(Error::invalid_frame(format!(
                "incorrect buffer size {} for {} {:?} frame (expected {} bytes)",
                data.len(),
                res,
                order,
                expected,
            )));
        }

        Ok(Self { res, order, data })
    }

    /// Creates a frame by computing the color of every pixel.
    pub fn from_fn(
        res: Resolution,
        order: ChannelOrder,
        mut f: impl FnMut(u32, u32) -> Color,
    ) -> Self {
        let channels = order.channel_count();
        let mut data = vec![0; res.num_pixels() as usize * channels];
        if !res.is_empty() {
            for (i, pixel) in data.chunks_exact_mut(channels).enumerate() {
                let (x, y) = (i as u32 % res.width(), i as u32 / res.width());
                f(x, y).to_channels(order, pixel);
            }
        }

        Self {
            res,
            order,
            data: data.into(),
        }
    }

    /// Creates a frame where every pixel has the same color.
    pub fn filled(res: Resolution, order: ChannelOrder, color: Color) -> Self {
        Self::from_fn(res, order, |_, _| color)
    }

    /// Returns the width of this frame, in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.res.width()
    }

    /// Returns the height of this frame, in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.res.height()
    }

    #[inline]
    pub fn resolution(&self) -> Resolution {
        self.res
    }

    #[inline]
    pub fn channel_order(&self) -> ChannelOrder {
        self.order
    }

    #[inline]
    pub fn channel_count(&self) -> usize {
        self.order.channel_count()
    }

    /// Returns the number of bytes per row.
    #[inline]
    pub fn stride(&self) -> usize {
        self.width() as usize * self.channel_count()
    }

    #[inline]
    pub fn geometry(&self) -> Geometry {
        Geometry {
            resolution: self.res,
            channels: self.channel_count(),
        }
    }

    /// Returns `true` if this frame contains no pixels.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.res.is_empty()
    }

    /// Returns the raw pixel data.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Consumes this frame and returns its raw pixel data.
    pub fn into_data(self) -> Box<[u8]> {
        self.data
    }

    /// Returns the channels of the pixel at `(x, y)`.
    ///
    /// # Panics
    ///
    /// This will panic if `(x, y)` is outside the bounds of this frame.
    pub fn pixel(&self, x: u32, y: u32) -> &[u8] {
        let offset = self.offset(x, y);
        &self.data[offset..offset + self.channel_count()]
    }

    /// Returns the color of the pixel at `(x, y)`.
    ///
    /// # Panics
    ///
    /// This will panic if `(x, y)` is outside the bounds of this frame.
    pub fn color(&self, x: u32, y: u32) -> Color {
        Color::from_channels(self.order, self.pixel(x, y))
    }

    /// Converts this frame to a different channel order, returning a new frame.
    ///
    /// Converting between orders of equal channel count is a pure permutation of the channels and
    /// keeps any alpha values intact. Adding an alpha channel makes every pixel opaque, removing
    /// it discards the alpha values.
    pub fn to_channel_order(&self, order: ChannelOrder) -> Frame {
        if order == self.order {
            return self.clone();
        }

        let data: Box<[u8]> = if order.channel_count() == self.channel_count() {
            debug_assert_eq!(order, self.order.swap_red_blue());
            let mut data = self.data.clone();
            for pixel in data.chunks_exact_mut(self.channel_count()) {
                pixel.swap(0, 2);
            }
            data
        } else {
            let mut data = vec![0; self.res.num_pixels() as usize * order.channel_count()];
            for (src, dest) in self
                .data
                .chunks_exact(self.channel_count())
                .zip(data.chunks_exact_mut(order.channel_count()))
            {
                Color::from_channels(self.order, src).to_channels(order, dest);
            }
            data.into()
        };

        Frame {
            res: self.res,
            order,
            data,
        }
    }

    pub(crate) fn pixel_mut(&mut self, x: u32, y: u32) -> &mut [u8] {
        let offset = self.offset(x, y);
        let channels = self.channel_count();
        &mut self.data[offset..offset + channels]
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        assert!(
            x < self.width() && y < self.height(),
            "pixel ({x},{y}) out of bounds for {} frame",
            self.res
        );
        y as usize * self.stride() + x as usize * self.channel_count()
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:?} Frame", self.res, self.order)
    }
}

/// A [`Frame`] with pose annotations drawn onto it.
///
/// This is produced by a [`PoseEngine`][crate::engine::PoseEngine] from an input frame and is
/// expected to have the same geometry and channel order as that input.
#[derive(Clone, PartialEq, Eq)]
pub struct AnnotatedFrame(Frame);

impl AnnotatedFrame {
    /// Marks `frame` as the annotated output of a pose engine.
    pub fn new(frame: Frame) -> Self {
        Self(frame)
    }

    #[inline]
    pub fn frame(&self) -> &Frame {
        &self.0
    }

    pub fn into_frame(self) -> Frame {
        self.0
    }
}

impl fmt::Debug for AnnotatedFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:?} AnnotatedFrame", self.0.res, self.0.order)
    }
}

/// Trait for frame-shaped values.
///
/// This allows abstracting over [`Frame`] and [`AnnotatedFrame`] in code that only reads pixel
/// data, like display conversion.
pub trait AsFrame {
    fn as_frame(&self) -> &Frame;
}

impl AsFrame for Frame {
    fn as_frame(&self) -> &Frame {
        self
    }
}

impl AsFrame for AnnotatedFrame {
    fn as_frame(&self) -> &Frame {
        &self.0
    }
}

impl<'a, F: AsFrame> AsFrame for &'a F {
    fn as_frame(&self) -> &Frame {
        (*self).as_frame()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn random_frame(rng: &mut fastrand::Rng, res: Resolution, order: ChannelOrder) -> Frame {
        let data = std::iter::repeat_with(|| rng.u8(..))
            .take(res.num_pixels() as usize * order.channel_count())
            .collect::<Vec<_>>();
        Frame::from_raw(res, order, data).unwrap()
    }

    #[test]
    fn from_raw_checks_size() {
        let res = Resolution::new(4, 3);
        assert!(Frame::from_raw(res, ChannelOrder::Bgr, vec![0; 36]).is_ok());

        let err = Frame::from_raw(res, ChannelOrder::Bgr, vec![0; 35]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidFrame);
        let err = Frame::from_raw(res, ChannelOrder::Rgba, vec![0; 36]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidFrame);
    }

    #[test]
    fn empty_frame() {
        let frame = Frame::from_raw(Resolution::new(0, 5), ChannelOrder::Rgb, Vec::new()).unwrap();
        assert!(frame.is_empty());
        assert_eq!(frame.data().len(), 0);

        let frame = Frame::filled(Resolution::new(7, 0), ChannelOrder::Bgr, Color::RED);
        assert!(frame.is_empty());
    }

    #[test]
    fn layout() {
        let frame = Frame::from_fn(Resolution::new(2, 2), ChannelOrder::Bgr, |x, y| match (x, y) {
            (0, 0) => Color::RED,
            (1, 0) => Color::GREEN,
            (0, 1) => Color::BLUE,
            _ => Color::WHITE,
        });
        assert_eq!(frame.stride(), 6);
        #[rustfmt::skip]
        assert_eq!(frame.data(), &[
            0, 0, 255,    0, 255, 0,
            255, 0, 0,    255, 255, 255,
        ]);
        assert_eq!(frame.pixel(0, 1), &[255, 0, 0]);
        assert_eq!(frame.color(0, 0), Color::RED);
        assert_eq!(frame.color(0, 1), Color::BLUE);
    }

    #[test]
    fn channel_order_conversion_is_explicit() {
        let bgr = Frame::filled(Resolution::new(3, 1), ChannelOrder::Bgr, Color::RED);
        assert_eq!(bgr.pixel(0, 0), &[0, 0, 255]);

        let rgb = bgr.to_channel_order(ChannelOrder::Rgb);
        assert_eq!(rgb.channel_order(), ChannelOrder::Rgb);
        assert_eq!(rgb.pixel(0, 0), &[255, 0, 0]);
        assert_eq!(rgb.color(2, 0), Color::RED);
        // source is left untouched
        assert_eq!(bgr.pixel(0, 0), &[0, 0, 255]);
    }

    #[test]
    fn channel_swap_is_an_involution() {
        let mut rng = fastrand::Rng::with_seed(0x5EED);
        for order in [ChannelOrder::Bgr, ChannelOrder::Rgba] {
            let frame = random_frame(&mut rng, Resolution::new(17, 9), order);
            let swapped = frame.to_channel_order(order.swap_red_blue());
            assert_ne!(swapped.data(), frame.data());
            let back = swapped.to_channel_order(order);
            assert_eq!(back, frame);
            assert_eq!(order.swap_red_blue().swap_red_blue(), order);
        }
    }

    #[test]
    fn alpha_conversions() {
        let rgba = Frame::from_raw(
            Resolution::new(1, 1),
            ChannelOrder::Rgba,
            vec![1, 2, 3, 128],
        )
        .unwrap();
        assert_eq!(
            rgba.to_channel_order(ChannelOrder::Bgra).data(),
            &[3, 2, 1, 128]
        );
        assert_eq!(rgba.to_channel_order(ChannelOrder::Bgr).data(), &[3, 2, 1]);
        assert_eq!(
            rgba.to_channel_order(ChannelOrder::Bgr)
                .to_channel_order(ChannelOrder::Rgba)
                .data(),
            &[1, 2, 3, 255]
        );
    }

    #[test]
    fn geometry() {
        let frame = Frame::filled(Resolution::new(400, 300), ChannelOrder::NATIVE, Color::BLACK);
        let geometry = frame.geometry();
        assert_eq!(geometry.resolution, Resolution::new(400, 300));
        assert_eq!(geometry.channels, 3);
        assert_eq!(geometry.to_string(), "400x300x3");

        let annotated = AnnotatedFrame::new(frame.clone());
        assert_eq!(annotated.as_frame().geometry(), geometry);
        assert_eq!(format!("{annotated:?}"), "400x300 Bgr AnnotatedFrame");
    }
}
