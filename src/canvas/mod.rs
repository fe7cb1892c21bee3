//! Drawing surfaces. Everything above this module works in data
//! coordinates and hands pixel-space primitives to a [`Canvas`].

mod font;
mod raster;
mod svg;

pub use raster::RasterCanvas;
pub use svg::SvgCanvas;

use crate::palette::Rgb;

/// Axis-aligned rectangle in pixels, origin at the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub color: Rgb,
    /// Glyph height in pixels.
    pub size: f64,
    pub italic: bool,
}

/// A 2D surface that accepts rectangles and text.
pub trait Canvas {
    fn fill_rect(&mut self, rect: &PixelRect, color: Rgb);
    /// Draw `text` with its top-left corner at `(x, y)`.
    fn draw_text(&mut self, x: f64, y: f64, text: &str, style: &TextStyle);

    /// Approximate advance of `text`, for right-aligning labels.
    fn text_width(&self, text: &str, style: &TextStyle) -> f64 {
        text.chars().count() as f64 * style.size * 0.6
    }
}

/// Maps data coordinates of one track onto a pixel panel.
///
/// Genomic positions grow to the right; track units grow upwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    pub xlim: (f64, f64),
    pub ylim: (f64, f64),
}

impl Viewport {
    pub fn x(&self, x: f64) -> f64 {
        let span = (self.xlim.1 - self.xlim.0).max(f64::EPSILON);
        self.left + (x - self.xlim.0) / span * self.width
    }

    pub fn y(&self, y: f64) -> f64 {
        let span = (self.ylim.1 - self.ylim.0).max(f64::EPSILON);
        self.top + (self.ylim.1 - y) / span * self.height
    }

    /// Project the data box `[x0, x1) x [y0, y0 + height]`, clipped to the
    /// panel horizontally. `None` when nothing of it is visible.
    pub fn project_rect(&self, x0: f64, x1: f64, y0: f64, height: f64) -> Option<PixelRect> {
        let left = self.x(x0).max(self.left);
        let right = self.x(x1).min(self.left + self.width);
        if right <= left {
            return None;
        }
        let top = self.y(y0 + height);
        let bottom = self.y(y0);
        Some(PixelRect {
            x: left,
            y: top,
            width: right - left,
            height: bottom - top,
        })
    }
}
