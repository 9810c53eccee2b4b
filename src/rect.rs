//! Axis-aligned pixel rectangles.

use std::{fmt, ops::Range};

use crate::resolution::Resolution;

/// An axis-aligned rectangle with unsigned integer coordinates.
///
/// This is used to describe where a scaled image is placed inside of a display region, so it
/// never extends into negative coordinates. Rectangles are allowed to have zero height and/or
/// width.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rect {
    x: u32,
    y: u32,
    width: u32,
    height: u32,
}

impl Rect {
    /// Creates a rectangle extending downwards and right from a point.
    #[inline]
    pub fn from_top_left(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Constructs a [`Rect`] that spans a range of X and Y coordinates.
    ///
    /// # Panics
    ///
    /// Panics if either range is decreasing.
    pub fn from_ranges(x: Range<u32>, y: Range<u32>) -> Self {
        assert!(x.start <= x.end, "invalid X range {:?}", x);
        assert!(y.start <= y.end, "invalid Y range {:?}", y);
        Self::from_top_left(x.start, y.start, x.end - x.start, y.end - y.start)
    }

    #[inline]
    pub fn x(&self) -> u32 {
        self.x
    }

    #[inline]
    pub fn y(&self) -> u32 {
        self.y
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns the size of this rectangle.
    #[inline]
    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }
}

impl fmt::Debug for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Rect @ ({},{})/{}x{}",
            self.x, self.y, self.width, self.height
        )
    }
}
