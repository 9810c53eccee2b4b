//! Conversion of frames into display-ready RGB buffers.

use std::fmt;

use image::{imageops, imageops::FilterType, RgbImage};

use crate::{
    color::Color,
    error::{Error, Result},
    frame::{AsFrame, ChannelOrder, Frame},
    rect::Rect,
    resolution::Resolution,
};

/// Size of the two image views of the desktop UI.
pub const DISPLAY_REGION: Resolution = Resolution::new(400, 250);

/// RGB pixel data scaled to fit a display region.
///
/// The buffer holds only the scaled image itself (`width * 3` bytes per row, no padding). Its
/// [`placement`][Self::placement] describes where the image goes inside the region it was fitted
/// into, so a UI can center it; [`letterbox`][Self::letterbox] produces a buffer covering the
/// whole region instead.
#[derive(Clone, PartialEq, Eq)]
pub struct DisplayBuffer {
    region: Resolution,
    placement: Rect,
    data: Box<[u8]>,
}

impl DisplayBuffer {
    /// Returns the width of the scaled image, in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.placement.width()
    }

    /// Returns the height of the scaled image, in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.placement.height()
    }

    #[inline]
    pub fn resolution(&self) -> Resolution {
        self.placement.resolution()
    }

    /// Returns the number of bytes per row.
    #[inline]
    pub fn stride(&self) -> usize {
        self.width() as usize * 3
    }

    /// Returns the display region this buffer was fitted into.
    #[inline]
    pub fn region(&self) -> Resolution {
        self.region
    }

    /// Returns the centered position of the scaled image inside of [`region`][Self::region].
    #[inline]
    pub fn placement(&self) -> Rect {
        self.placement
    }

    /// Returns the RGB pixel data.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Box<[u8]> {
        self.data
    }

    /// Returns the color of the pixel at `(x, y)`.
    ///
    /// # Panics
    ///
    /// This will panic if `(x, y)` is outside the bounds of this buffer.
    pub fn color(&self, x: u32, y: u32) -> Color {
        assert!(x < self.width() && y < self.height());
        let offset = y as usize * self.stride() + x as usize * 3;
        Color::from_channels(ChannelOrder::DISPLAY, &self.data[offset..offset + 3])
    }

    /// Expands this buffer to the size of its display region, filling the bars around the image
    /// with `background`.
    pub fn letterbox(&self, background: Color) -> DisplayBuffer {
        let (rw, rh) = (self.region.width() as usize, self.region.height() as usize);
        let mut data = vec![0; rw * rh * 3];
        for pixel in data.chunks_exact_mut(3) {
            background.to_channels(ChannelOrder::DISPLAY, pixel);
        }

        let (px, py) = (self.placement.x() as usize, self.placement.y() as usize);
        for (y, row) in self.data.chunks_exact(self.stride()).enumerate() {
            let start = ((py + y) * rw + px) * 3;
            data[start..start + row.len()].copy_from_slice(row);
        }

        DisplayBuffer {
            region: self.region,
            placement: Rect::from_top_left(0, 0, self.region.width(), self.region.height()),
            data: data.into(),
        }
    }
}

impl fmt::Debug for DisplayBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} DisplayBuffer in {} region at {:?}",
            self.resolution(),
            self.region,
            self.placement
        )
    }
}

/// Converts a frame into an RGB [`DisplayBuffer`] that fits into `target`.
///
/// The frame's channels are reordered to RGB, then the image is scaled to the largest size that
/// fits into `target` without changing its aspect ratio. Nothing is cropped. The output is a pure
/// function of the arguments.
///
/// Returns [`Error::InvalidDisplayRegion`] if `target` has a zero dimension,
/// [`Error::UnsupportedChannelLayout`] if the frame does not have 3 channels, and
/// [`Error::InvalidFrame`] if it is empty.
pub fn to_display_buffer<F: AsFrame>(frame: &F, target: Resolution) -> Result<DisplayBuffer> {
    to_display_buffer_impl(frame.as_frame(), target)
}

fn to_display_buffer_impl(frame: &Frame, target: Resolution) -> Result<DisplayBuffer> {
    if target.is_empty() {
        return Err(Error::InvalidDisplayRegion { region: target });
    }
    if frame.channel_count() != 3 {
        return Err(Error::UnsupportedChannelLayout {
            channels: frame.channel_count(),
        });
    }
    let ratio = frame
        .resolution()
        .aspect_ratio()
        .ok_or_else(|| Error::invalid_frame(format!("cannot display empty {frame:?}")))?;

    let placement = target.fit_aspect_ratio(ratio);
    let rgb = frame.to_channel_order(ChannelOrder::DISPLAY);

    let data = if placement.resolution() == frame.resolution() {
        rgb.into_data()
    } else {
        let buf = RgbImage::from_raw(frame.width(), frame.height(), rgb.into_data().into_vec())
            .ok_or_else(|| Error::invalid_frame(format!("{frame:?} has inconsistent size")))?;
        let scaled = imageops::resize(
            &buf,
            placement.width(),
            placement.height(),
            FilterType::Triangle,
        );
        scaled.into_raw().into_boxed_slice()
    };

    log::trace!(
        "display conversion: {:?} -> {} at {:?} in {}",
        frame,
        placement.resolution(),
        placement,
        target
    );

    Ok(DisplayBuffer {
        region: target,
        placement,
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::ErrorKind, frame::AnnotatedFrame};

    fn quadrants(res: Resolution, order: ChannelOrder) -> Frame {
        Frame::from_fn(res, order, |x, y| {
            match (x < res.width() / 2, y < res.height() / 2) {
                (true, true) => Color::RED,
                (false, true) => Color::GREEN,
                (true, false) => Color::BLUE,
                (false, false) => Color::WHITE,
            }
        })
    }

    #[test]
    fn reorders_channels_to_rgb() {
        let frame = Frame::filled(Resolution::new(4, 4), ChannelOrder::Bgr, Color::RED);
        let buffer = to_display_buffer(&frame, Resolution::new(4, 4)).unwrap();
        assert_eq!(&buffer.data()[..3], &[255, 0, 0]);
        assert_eq!(buffer.color(3, 3), Color::RED);

        let frame = Frame::filled(Resolution::new(4, 4), ChannelOrder::Rgb, Color::RED);
        let buffer = to_display_buffer(&frame, Resolution::new(4, 4)).unwrap();
        assert_eq!(&buffer.data()[..3], &[255, 0, 0]);
    }

    #[test]
    fn same_size_is_lossless() {
        let frame = quadrants(Resolution::new(8, 6), ChannelOrder::Bgr);
        let buffer = to_display_buffer(&frame, Resolution::new(8, 6)).unwrap();
        assert_eq!(
            buffer.data(),
            frame.to_channel_order(ChannelOrder::Rgb).data()
        );
        assert_eq!(buffer.placement(), Rect::from_top_left(0, 0, 8, 6));
    }

    #[test]
    fn fits_preserving_aspect_ratio() {
        let frame = quadrants(Resolution::new(400, 300), ChannelOrder::Bgr);
        let buffer = to_display_buffer(&frame, DISPLAY_REGION).unwrap();
        assert_eq!(buffer.resolution(), Resolution::new(333, 250));
        assert_eq!(buffer.placement(), Rect::from_top_left(33, 0, 333, 250));
        assert_eq!(buffer.region(), DISPLAY_REGION);
        assert_eq!(buffer.data().len(), 333 * 250 * 3);
        assert_eq!(buffer.stride(), 333 * 3);

        // Quadrant colors survive scaling.
        assert_eq!(buffer.color(10, 10), Color::RED);
        assert_eq!(buffer.color(320, 10), Color::GREEN);
        assert_eq!(buffer.color(10, 240), Color::BLUE);
        assert_eq!(buffer.color(320, 240), Color::WHITE);
    }

    #[test]
    fn upscales_small_frames() {
        let frame = Frame::filled(Resolution::new(40, 10), ChannelOrder::Bgr, Color::CYAN);
        let buffer = to_display_buffer(&frame, DISPLAY_REGION).unwrap();
        assert_eq!(buffer.resolution(), Resolution::new(400, 100));
        assert_eq!(buffer.placement().y(), 75);
        assert_eq!(buffer.color(200, 50), Color::CYAN);
    }

    #[test]
    fn random_sizes_satisfy_fit_contract() {
        let mut rng = fastrand::Rng::with_seed(42);
        for _ in 0..50 {
            let res = Resolution::new(rng.u32(1..120), rng.u32(1..120));
            let target = Resolution::new(rng.u32(1..80), rng.u32(1..80));
            let frame = Frame::filled(res, ChannelOrder::Bgr, Color::MAGENTA);
            let buffer = to_display_buffer(&frame, target).unwrap();

            let (w, h) = (buffer.width(), buffer.height());
            assert!(w >= 1 && h >= 1);
            assert!(w <= target.width() && h <= target.height(), "{res} in {target}");
            // At least one dimension touches the region boundary.
            assert!(w == target.width() || h == target.height(), "{res} in {target}");
            // Aspect ratio deviates by less than one pixel of rounding.
            let expected_h = w as f32 * res.height() as f32 / res.width() as f32;
            let expected_w = h as f32 * res.width() as f32 / res.height() as f32;
            assert!(
                (h as f32 - expected_h).abs() < 1.0 || (w as f32 - expected_w).abs() < 1.0,
                "{res} -> {w}x{h}"
            );
            let placement = buffer.placement();
            assert!(placement.x() + w <= target.width());
            assert!(placement.y() + h <= target.height());
        }
    }

    #[test]
    fn conversion_is_idempotent() {
        let mut rng = fastrand::Rng::with_seed(7);
        let res = Resolution::new(123, 77);
        let data = std::iter::repeat_with(|| rng.u8(..))
            .take(res.num_pixels() as usize * 3)
            .collect::<Vec<_>>();
        let frame = Frame::from_raw(res, ChannelOrder::Bgr, data).unwrap();
        let a = to_display_buffer(&frame, DISPLAY_REGION).unwrap();
        let b = to_display_buffer(&frame, DISPLAY_REGION).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn annotated_frames_convert_like_raw_frames() {
        let frame = quadrants(Resolution::new(64, 48), ChannelOrder::Bgr);
        let annotated = AnnotatedFrame::new(frame.clone());
        assert_eq!(
            to_display_buffer(&frame, DISPLAY_REGION).unwrap(),
            to_display_buffer(&annotated, DISPLAY_REGION).unwrap()
        );
    }

    #[test]
    fn invalid_region() {
        let frame = Frame::filled(Resolution::new(4, 4), ChannelOrder::Bgr, Color::RED);
        for region in [
            Resolution::new(0, 0),
            Resolution::new(0, 250),
            Resolution::new(400, 0),
        ] {
            let err = to_display_buffer(&frame, region).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidDisplayRegion);
        }
    }

    #[test]
    fn unsupported_channel_layout() {
        let frame = Frame::filled(Resolution::new(4, 4), ChannelOrder::Bgra, Color::RED);
        let err = to_display_buffer(&frame, DISPLAY_REGION).unwrap_err();
        assert!(matches!(
            err,
            Error::UnsupportedChannelLayout { channels: 4 }
        ));
    }

    #[test]
    fn empty_frame() {
        let frame = Frame::filled(Resolution::new(0, 4), ChannelOrder::Bgr, Color::RED);
        let err = to_display_buffer(&frame, DISPLAY_REGION).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidFrame);
    }

    #[test]
    fn letterbox() {
        let frame = Frame::filled(Resolution::new(4, 2), ChannelOrder::Bgr, Color::RED);
        let buffer = to_display_buffer(&frame, Resolution::new(4, 4)).unwrap();
        assert_eq!(buffer.placement(), Rect::from_top_left(0, 1, 4, 2));

        let boxed = buffer.letterbox(Color::BLACK);
        assert_eq!(boxed.resolution(), Resolution::new(4, 4));
        assert_eq!(boxed.data().len(), 4 * 4 * 3);
        for x in 0..4 {
            assert_eq!(boxed.color(x, 0), Color::BLACK);
            assert_eq!(boxed.color(x, 1), Color::RED);
            assert_eq!(boxed.color(x, 2), Color::RED);
            assert_eq!(boxed.color(x, 3), Color::BLACK);
        }
    }
}
