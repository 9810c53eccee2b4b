//! Types for representing image resolutions.

use std::fmt;

use crate::rect::Rect;

/// Resolution (`width x height`) of a frame, model input, or display region.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Resolution {
    width: u32,
    height: u32,
}

impl Resolution {
    /// Creates a new [`Resolution`] of `width x height`.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Returns the width of this [`Resolution`].
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the height of this [`Resolution`].
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn num_pixels(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Returns `true` if this resolution covers no pixels.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Computes the [`AspectRatio`] of this [`Resolution`].
    ///
    /// If `self` has a width or height of 0, `None` is returned.
    pub fn aspect_ratio(&self) -> Option<AspectRatio> {
        AspectRatio::new(self.width(), self.height())
    }

    /// Computes a centered, maximally sized [`Rect`] that lies inside of `self` and has the given
    /// aspect ratio.
    ///
    /// The computation is done in integer arithmetic, so it yields the same result on every
    /// platform. Sizes are rounded down, but never below 1 pixel.
    pub fn fit_aspect_ratio(&self, ratio: AspectRatio) -> Rect {
        if self.is_empty() {
            return Rect::from_top_left(0, 0, self.width(), self.height());
        }

        let (rw, rh) = (u64::from(ratio.width), u64::from(ratio.height));
        let (w, h) = (u64::from(self.width), u64::from(self.height));

        let (fit_w, fit_h);
        if rw * h > rh * w {
            // Input has wider aspect ratio than output.
            // => Resulting size is limited by target width. Add Letterboxing.
            fit_w = w;
            fit_h = (w * rh / rw).max(1);
        } else {
            // Output has wider (or equal) aspect ratio than input.
            // => Resulting size is limited by target height. Add Pillarboxing.
            fit_w = (h * rw / rh).max(1);
            fit_h = h;
        }

        // Both fit into `u32`, since they're bounded by `w` and `h`.
        let (fit_w, fit_h) = (fit_w as u32, fit_h as u32);
        let rect = Rect::from_top_left(
            (self.width - fit_w) / 2,
            (self.height - fit_h) / 2,
            fit_w,
            fit_h,
        );
        log::trace!(
            "fit aspect ratio {} in resolution {} -> {:?}",
            ratio,
            self,
            rect
        );
        rect
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl fmt::Debug for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Ratio of a width to a height of an image.
#[derive(PartialEq, Eq, Clone, Copy)]
pub struct AspectRatio {
    // Invariant: `width` and `height` are nonzero and as small as possible (ie. their GCD is 1).
    width: u32,
    height: u32,
}

impl AspectRatio {
    /// Creates the aspect ratio representing `width:height`.
    ///
    /// If either `width` or `height` is `0`, returns `None`.
    pub fn new(width: u32, height: u32) -> Option<Self> {
        if width == 0 || height == 0 {
            return None;
        }

        let gcd = gcd(width, height);
        Some(Self {
            width: width / gcd,
            height: height / gcd,
        })
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.width, self.height)
    }
}

impl fmt::Debug for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

const fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b > 0 {
        let t = b;
        b = a % b;
        a = t;
    }

    a
}
