//! Drawing of pose annotations onto frames.
//!
//! Drawing happens on a [`Canvas`], which owns a copy of the frame being annotated. The source
//! frame is never touched. Every `draw_*` method returns a guard that performs the drawing when
//! dropped, so callers can customize color and size in a single statement:
//!
//! ```
//! # use poseview::{color::Color, draw::Canvas, frame::{ChannelOrder, Frame}, Resolution};
//! let frame = Frame::filled(Resolution::new(64, 64), ChannelOrder::Bgr, Color::BLACK);
//! let mut canvas = Canvas::new(&frame);
//! canvas.draw_line(0, 0, 63, 63).color(Color::GREEN).stroke_width(2);
//! canvas.draw_circle(32, 32).diameter(5);
//! let annotated = canvas.finish();
//! assert_eq!(annotated.frame().color(32, 32), Color::RED);
//! ```

use std::convert::Infallible;

use embedded_graphics::{
    draw_target::DrawTarget,
    prelude::*,
    primitives::{Circle, Line, PrimitiveStyle, Rectangle},
};

use crate::{
    color::Color,
    frame::{AnnotatedFrame, Frame},
};

/// A frame that annotations are being drawn onto.
pub struct Canvas {
    frame: Frame,
}

impl Canvas {
    /// Creates a canvas holding a copy of `frame`.
    pub fn new(frame: &Frame) -> Self {
        Self {
            frame: frame.clone(),
        }
    }

    /// Draws a line between two points.
    pub fn draw_line(&mut self, start_x: i32, start_y: i32, end_x: i32, end_y: i32) -> DrawLine<'_> {
        DrawLine {
            canvas: self,
            start: Point::new(start_x, start_y),
            end: Point::new(end_x, end_y),
            color: Color::BLUE,
            stroke_width: 1,
        }
    }

    /// Draws a filled circle centered on `(x, y)`.
    pub fn draw_circle(&mut self, x: i32, y: i32) -> DrawCircle<'_> {
        DrawCircle {
            canvas: self,
            center: Point::new(x, y),
            color: Color::RED,
            diameter: 3,
        }
    }

    /// Finishes drawing and returns the annotated frame.
    pub fn finish(self) -> AnnotatedFrame {
        AnnotatedFrame::new(self.frame)
    }

    fn draw<D: Drawable<Color = Color>>(&mut self, drawable: &D) {
        match drawable.draw(&mut Target(&mut self.frame)) {
            Ok(_) => {}
            Err(infallible) => match infallible {},
        }
    }
}

/// Guard returned by [`Canvas::draw_line`]; draws the line when dropped and allows customization.
pub struct DrawLine<'a> {
    canvas: &'a mut Canvas,
    start: Point,
    end: Point,
    color: Color,
    stroke_width: u32,
}

impl DrawLine<'_> {
    /// Sets the line's color.
    pub fn color(&mut self, color: Color) -> &mut Self {
        self.color = color;
        self
    }

    /// Sets the line's stroke width.
    ///
    /// By default, a stroke width of 1 is used.
    pub fn stroke_width(&mut self, width: u32) -> &mut Self {
        self.stroke_width = width;
        self
    }
}

impl Drop for DrawLine<'_> {
    fn drop(&mut self) {
        let line = Line::new(self.start, self.end)
            .into_styled(PrimitiveStyle::with_stroke(self.color, self.stroke_width));
        self.canvas.draw(&line);
    }
}

/// Guard returned by [`Canvas::draw_circle`]; draws the circle when dropped and allows
/// customization.
pub struct DrawCircle<'a> {
    canvas: &'a mut Canvas,
    center: Point,
    color: Color,
    diameter: u32,
}

impl DrawCircle<'_> {
    /// Sets the circle's fill color.
    pub fn color(&mut self, color: Color) -> &mut Self {
        self.color = color;
        self
    }

    /// Sets the circle's diameter in pixels. Defaults to 3.
    pub fn diameter(&mut self, diameter: u32) -> &mut Self {
        self.diameter = diameter;
        self
    }
}

impl Drop for DrawCircle<'_> {
    fn drop(&mut self) {
        let circle = Circle::with_center(self.center, self.diameter)
            .into_styled(PrimitiveStyle::with_fill(self.color));
        self.canvas.draw(&circle);
    }
}

struct Target<'a>(&'a mut Frame);

impl Dimensions for Target<'_> {
    fn bounding_box(&self) -> Rectangle {
        let (width, height) = (self.0.width(), self.0.height());

        Rectangle {
            top_left: Point { x: 0, y: 0 },
            size: Size { width, height },
        }
    }
}

impl DrawTarget for Target<'_> {
    type Color = Color;

    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = embedded_graphics::Pixel<Self::Color>>,
    {
        let order = self.0.channel_order();
        for Pixel(point, color) in pixels {
            if point.x >= 0
                && (point.x as u32) < self.0.width()
                && point.y >= 0
                && (point.y as u32) < self.0.height()
            {
                color.to_channels(order, self.0.pixel_mut(point.x as _, point.y as _));
            }
        }

        Ok(())
    }
}
