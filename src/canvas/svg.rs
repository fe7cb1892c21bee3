use super::{Canvas, PixelRect, TextStyle};
use crate::palette::Rgb;

/// Escape special XML characters
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Vector canvas that accumulates SVG elements.
pub struct SvgCanvas {
    width: u32,
    height: u32,
    body: String,
}

impl SvgCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        SvgCanvas { width, height, body: String::new() }
    }

    /// The complete document.
    pub fn finish(&self) -> String {
        let mut svg = String::with_capacity(self.body.len() + 256);
        svg.push_str(&format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">
<style>
  text {{ font-family: 'DejaVu Sans', Arial, sans-serif; }}
</style>
<rect width="100%" height="100%" fill="white"/>
"#,
            w = self.width,
            h = self.height
        ));
        svg.push_str(&self.body);
        svg.push_str("</svg>\n");
        svg
    }
}

impl Canvas for SvgCanvas {
    fn fill_rect(&mut self, rect: &PixelRect, color: Rgb) {
        // Keep hairline features visible, like the raster canvas does.
        let width = rect.width.max(1.0);
        self.body.push_str(&format!(
            r#"<rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" fill="{}"/>"#,
            rect.x, rect.y, width, rect.height, color
        ));
        self.body.push('\n');
    }

    fn draw_text(&mut self, x: f64, y: f64, text: &str, style: &TextStyle) {
        // SVG anchors text at the baseline.
        let baseline = y + style.size * 0.8;
        let font_style = if style.italic { "italic" } else { "normal" };
        self.body.push_str(&format!(
            r#"<text x="{:.2}" y="{:.2}" font-size="{}" font-style="{}" fill="{}">{}</text>"#,
            x,
            baseline,
            style.size,
            font_style,
            style.color,
            escape_xml(text)
        ));
        self.body.push('\n');
    }
}
