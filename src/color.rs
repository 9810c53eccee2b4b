//! RGB colors.

use std::fmt;

use embedded_graphics::{pixelcolor::raw::RawU24, prelude::PixelColor};

use crate::frame::ChannelOrder;

/// An 8-bit RGB color.
///
/// Colors are always in the non-linear sRGB color space and stored in RGB order. Writing a
/// [`Color`] into a frame with a different [`ChannelOrder`] is done through
/// [`Color::to_channels`].
#[derive(PartialEq, Eq, Clone, Copy, Hash)]
pub struct Color(pub(crate) [u8; 3]);

impl Color {
    pub const BLACK: Self = Self([0, 0, 0]);
    pub const WHITE: Self = Self([255, 255, 255]);
    pub const RED: Self = Self([255, 0, 0]);
    pub const GREEN: Self = Self([0, 255, 0]);
    pub const BLUE: Self = Self([0, 0, 255]);
    pub const YELLOW: Self = Self([255, 255, 0]);
    pub const MAGENTA: Self = Self([255, 0, 255]);
    pub const CYAN: Self = Self([0, 255, 255]);
    pub const ORANGE: Self = Self([255, 128, 0]);

    #[inline]
    pub const fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self([r, g, b])
    }

    #[inline]
    pub fn r(&self) -> u8 {
        self.0[0]
    }

    #[inline]
    pub fn g(&self) -> u8 {
        self.0[1]
    }

    #[inline]
    pub fn b(&self) -> u8 {
        self.0[2]
    }

    /// Reads a color from the channels of a single pixel stored in `order`.
    ///
    /// Any alpha channel is ignored.
    pub fn from_channels(order: ChannelOrder, pixel: &[u8]) -> Self {
        match order {
            ChannelOrder::Rgb | ChannelOrder::Rgba => Self([pixel[0], pixel[1], pixel[2]]),
            ChannelOrder::Bgr | ChannelOrder::Bgra => Self([pixel[2], pixel[1], pixel[0]]),
        }
    }

    /// Writes this color into the channels of a single pixel stored in `order`.
    ///
    /// Alpha channels, if present, are set to fully opaque.
    pub fn to_channels(self, order: ChannelOrder, pixel: &mut [u8]) {
        let [r, g, b] = self.0;
        match order {
            ChannelOrder::Rgb => pixel.copy_from_slice(&[r, g, b]),
            ChannelOrder::Bgr => pixel.copy_from_slice(&[b, g, r]),
            ChannelOrder::Rgba => pixel.copy_from_slice(&[r, g, b, 255]),
            ChannelOrder::Bgra => pixel.copy_from_slice(&[b, g, r, 255]),
        }
    }
}

impl fmt::Debug for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r(), self.g(), self.b())
    }
}

// FIXME leaks `embedded-graphics` dependency
impl PixelColor for Color {
    type Raw = RawU24;
}
