use super::font::FONT_5X8;
use super::{Canvas, PixelRect, TextStyle};
use crate::palette::{Rgb, WHITE};
use std::path::Path;

/// RGBA pixel buffer with a bitmap font, written out through `image`.
pub struct RasterCanvas {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl RasterCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        let mut canvas = RasterCanvas {
            width,
            height,
            pixels: vec![0u8; (width as usize) * (height as usize) * 4],
        };
        canvas.clear(WHITE);
        canvas
    }

    pub fn clear(&mut self, color: Rgb) {
        for px in self.pixels.chunks_mut(4) {
            px.copy_from_slice(&[color.r, color.g, color.b, 255]);
        }
    }

    #[cfg(test)]
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgb> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = ((y as usize) * (self.width as usize) + x as usize) * 4;
        Some(Rgb::new(self.pixels[idx], self.pixels[idx + 1], self.pixels[idx + 2]))
    }

    #[inline]
    fn put(&mut self, x: i64, y: i64, color: Rgb) {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return;
        }
        let idx = ((y as usize) * (self.width as usize) + x as usize) * 4;
        self.pixels[idx] = color.r;
        self.pixels[idx + 1] = color.g;
        self.pixels[idx + 2] = color.b;
        self.pixels[idx + 3] = 255;
    }

    /// Glyph scale for a requested text height; glyphs are 8 pixels tall.
    fn glyph_ratio(size: f64) -> i64 {
        ((size / 8.0).round() as i64).max(1)
    }

    fn write_char(&mut self, base_x: i64, base_y: i64, glyph: &[u8; 8], ratio: i64, style: &TextStyle) {
        for j in 0..8i64 {
            let row = glyph[j as usize];
            let y = base_y + j * ratio;
            let shear = if style.italic { (7 - j) * ratio / 4 } else { 0 };
            for z in (0..8i32).rev() {
                if (row >> z) & 1 == 1 {
                    let x = base_x + shear + (7 - z as i64) * ratio;
                    for rx in 0..ratio {
                        for ry in 0..ratio {
                            self.put(x + rx, y + ry, style.color);
                        }
                    }
                }
            }
        }
    }

    /// Save as an RGB image; the format follows the file extension.
    pub fn save(&self, path: &Path) -> image::ImageResult<()> {
        let mut rgb = Vec::with_capacity((self.width as usize) * (self.height as usize) * 3);
        for chunk in self.pixels.chunks(4) {
            rgb.extend_from_slice(&chunk[..3]);
        }
        image::save_buffer(path, &rgb, self.width, self.height, image::ExtendedColorType::Rgb8)
    }
}

impl Canvas for RasterCanvas {
    fn fill_rect(&mut self, rect: &PixelRect, color: Rgb) {
        let x0 = rect.x.floor() as i64;
        let y0 = rect.y.floor() as i64;
        // Anything that survived projection stays at least one pixel wide.
        let x1 = (rect.x + rect.width).ceil().max(rect.x.floor() + 1.0) as i64;
        let y1 = (rect.y + rect.height).ceil().max(rect.y.floor() + 1.0) as i64;

        let x0 = x0.max(0);
        let y0 = y0.max(0);
        let x1 = x1.min(self.width as i64);
        let y1 = y1.min(self.height as i64);
        for y in y0..y1 {
            for x in x0..x1 {
                self.put(x, y, color);
            }
        }
    }

    fn draw_text(&mut self, x: f64, y: f64, text: &str, style: &TextStyle) {
        let ratio = Self::glyph_ratio(style.size);
        let advance = 6 * ratio;
        let mut cx = x.round() as i64;
        let cy = y.round() as i64;
        for c in text.chars() {
            let code = if c.is_ascii() { c as usize } else { b'?' as usize };
            let glyph = FONT_5X8[code];
            self.write_char(cx, cy, &glyph, ratio, style);
            cx += advance;
        }
    }

    fn text_width(&self, text: &str, style: &TextStyle) -> f64 {
        (text.chars().count() as i64 * 6 * Self::glyph_ratio(style.size)) as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::palette::{BLACK, SKY_BLUE};

    #[test]
    fn starts_white() {
        let canvas = RasterCanvas::new(4, 3);
        assert_eq!(canvas.pixel(3, 2), Some(WHITE));
        assert_eq!(canvas.pixel(4, 0), None);
    }

    #[test]
    fn fills_clipped_rect() {
        let mut canvas = RasterCanvas::new(10, 10);
        canvas.fill_rect(&PixelRect { x: -5.0, y: 2.0, width: 8.0, height: 3.0 }, SKY_BLUE);
        assert_eq!(canvas.pixel(0, 2), Some(SKY_BLUE));
        assert_eq!(canvas.pixel(2, 4), Some(SKY_BLUE));
        assert_eq!(canvas.pixel(3, 2), Some(WHITE));
        assert_eq!(canvas.pixel(0, 5), Some(WHITE));
    }

    #[test]
    fn thin_rect_keeps_one_pixel() {
        let mut canvas = RasterCanvas::new(10, 10);
        canvas.fill_rect(&PixelRect { x: 4.2, y: 0.0, width: 0.1, height: 5.0 }, BLACK);
        assert_eq!(canvas.pixel(4, 1), Some(BLACK));
        assert_eq!(canvas.pixel(5, 1), Some(WHITE));
    }

    #[test]
    fn text_marks_pixels_and_ignores_offscreen_glyphs() {
        let mut canvas = RasterCanvas::new(40, 10);
        let style = TextStyle { color: BLACK, size: 8.0, italic: false };
        canvas.draw_text(-30.0, 0.0, "IIII", &style);
        canvas.draw_text(0.0, 0.0, "I", &style);
        // Top bar of 'I' is 0x70: columns 1..=3 of the first row.
        assert_eq!(canvas.pixel(1, 0), Some(BLACK));
        assert_eq!(canvas.pixel(0, 0), Some(WHITE));
        assert_eq!(canvas.text_width("abc", &style), 18.0);
    }

    #[test]
    fn saves_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.png");
        let mut canvas = RasterCanvas::new(16, 8);
        canvas.fill_rect(&PixelRect { x: 0.0, y: 0.0, width: 8.0, height: 8.0 }, SKY_BLUE);
        canvas.save(&path).unwrap();

        let img = image::open(&path).unwrap().to_rgb8();
        assert_eq!(img.dimensions(), (16, 8));
        assert_eq!(img.get_pixel(0, 0).0, [135, 206, 235]);
        assert_eq!(img.get_pixel(15, 0).0, [255, 255, 255]);
    }
}
