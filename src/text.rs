//! Text: glyph shape assembly from a pluggable font source, with italic
//! shear, word/character wrapping, line spacing and block alignment.

use crate::geom::{Matrix, Point};
use crate::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextWrap {
    #[default]
    None,
    Word,
    AnyChar,
}

/// A single glyph's outline and advance, in font units (typically 1000 or
/// 2048 units per em — the caller's `GlyphSource` defines the scale and
/// `font_size` below converts it to local space).
#[derive(Debug, Clone)]
pub struct Glyph {
    pub path: Path,
    pub advance: f32,
}

/// Supplies glyph outlines for a string. Kept as a trait (rather than a
/// concrete font-file parser) so the engine doesn't have to own a font
/// shaping stack; callers plug in whatever rasterized or vector font
/// backend they already have.
pub trait GlyphSource {
    fn units_per_em(&self) -> f32;
    /// Looks up the glyph for `ch`, or `None` for unsupported codepoints
    /// (callers typically substitute `.notdef` or skip it).
    fn glyph(&self, ch: char) -> Option<Glyph>;
}

#[derive(Debug, Clone)]
pub struct Text {
    pub content: String,
    pub font_size: f32,
    pub line_spacing: f32,
    pub italic_shear: f32,
    pub wrap: TextWrap,
    /// Block alignment anchor in `[0,1] x [0,1]`, `(0,0)` = top-left.
    pub align: (f32, f32),
    pub color: [u8; 4],
    /// Wrap box; `None` means unbounded (wrap mode has no effect).
    pub box_size: Option<(f32, f32)>,
}

impl Default for Text {
    fn default() -> Self {
        Text {
            content: String::new(),
            font_size: 16.0,
            line_spacing: 1.0,
            italic_shear: 0.0,
            wrap: TextWrap::None,
            align: (0.0, 0.0),
            color: [0, 0, 0, 255],
            box_size: None,
        }
    }
}

impl Text {
    /// Sets the italic shear, clamped to the source's `[0, 0.5]` range.
    pub fn set_italic(&mut self, shear: f32) {
        self.italic_shear = shear.clamp(0.0, 0.5);
    }

    /// Splits `content` into lines honoring `wrap`, breaking at the last
    /// opportunity that keeps a line's measured width within `box_w`
    /// (falls back to a hard break mid-word/char when no break point fits).
    fn wrap_lines<S: GlyphSource + ?Sized>(&self, source: &S, box_w: f32) -> Vec<String> {
        if self.wrap == TextWrap::None || self.box_size.is_none() {
            return self.content.lines().map(str::to_string).collect();
        }
        let scale = self.font_size / source.units_per_em();
        let mut lines = Vec::new();
        for raw_line in self.content.lines() {
            let mut current = String::new();
            let mut current_w = 0.0f32;
            let mut last_break: Option<(usize, f32)> = None;
            for (i, ch) in raw_line.char_indices() {
                let adv = source.glyph(ch).map_or(0.0, |g| g.advance) * scale;
                if ch == ' ' && self.wrap == TextWrap::Word {
                    last_break = Some((current.len(), current_w));
                }
                if current_w + adv > box_w && !current.is_empty() {
                    match (self.wrap, last_break) {
                        (TextWrap::Word, Some((break_at, break_w))) => {
                            lines.push(current[..break_at].to_string());
                            current = current[break_at..].trim_start().to_string();
                            current_w -= break_w;
                            last_break = None;
                        }
                        _ => {
                            lines.push(std::mem::take(&mut current));
                            current_w = 0.0;
                        }
                    }
                }
                current.push(ch);
                current_w += adv;
                let _ = i;
            }
            lines.push(current);
        }
        lines
    }

    /// Assembles every glyph outline for the laid-out text, already
    /// positioned (and, for non-zero `italic_shear`, sheared) in local
    /// space, with the whole block translated by `align`.
    pub fn layout<S: GlyphSource + ?Sized>(&self, source: &S) -> Vec<Path> {
        let scale = self.font_size / source.units_per_em();
        let line_height = self.font_size * self.line_spacing;
        let box_w = self.box_size.map_or(f32::INFINITY, |b| b.0);

        let lines = self.wrap_lines(source, box_w);

        let shear = Matrix {
            e11: 1.0,
            e12: self.italic_shear,
            e13: 0.0,
            e21: 0.0,
            e22: 1.0,
            e23: 0.0,
            e31: 0.0,
            e32: 0.0,
            e33: 1.0,
        };

        let mut line_widths = Vec::with_capacity(lines.len());
        let mut glyph_paths: Vec<Vec<(Path, f32, f32)>> = Vec::with_capacity(lines.len());
        for (row, line) in lines.iter().enumerate() {
            let mut x = 0.0f32;
            let mut row_glyphs = Vec::new();
            for ch in line.chars() {
                if let Some(glyph) = source.glyph(ch) {
                    let mut p = glyph.path.transform(&Matrix::scale(Point::new(scale, scale)));
                    p = p.transform(&shear);
                    row_glyphs.push((p, x, row as f32 * line_height));
                    x += glyph.advance * scale;
                }
            }
            line_widths.push(x);
            glyph_paths.push(row_glyphs);
        }

        let block_w = line_widths.iter().cloned().fold(0.0f32, f32::max);
        let block_h = lines.len() as f32 * line_height;
        let (ax, ay) = self.align;
        let origin_x = -block_w * ax;
        let origin_y = -block_h * ay;

        let mut out = Vec::new();
        for row_glyphs in glyph_paths {
            for (path, x, y) in row_glyphs {
                out.push(path.transform(&Matrix::translation(Point::new(origin_x + x, origin_y + y))));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedWidthFont;

    impl GlyphSource for FixedWidthFont {
        fn units_per_em(&self) -> f32 {
            1000.0
        }

        fn glyph(&self, ch: char) -> Option<Glyph> {
            if ch == ' ' {
                return Some(Glyph { path: Path::new(), advance: 500.0 });
            }
            let mut path = Path::new();
            path.append_rect(0.0, 0.0, 500.0, 700.0, 0.0, 0.0, true);
            Some(Glyph { path, advance: 600.0 })
        }
    }

    #[test]
    fn layout_produces_one_path_per_non_space_glyph() {
        let text = Text { content: "ab c".to_string(), font_size: 10.0, ..Default::default() };
        let paths = text.layout(&FixedWidthFont);
        assert_eq!(paths.len(), 3);
    }

    #[test]
    fn word_wrap_breaks_at_spaces_within_box() {
        let text = Text {
            content: "aa bb cc".to_string(),
            font_size: 10.0,
            wrap: TextWrap::Word,
            box_size: Some((15.0, 100.0)),
            ..Default::default()
        };
        let lines = text.wrap_lines(&FixedWidthFont, 15.0);
        assert!(lines.len() >= 2);
    }
}
