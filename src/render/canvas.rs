//! Per-page drawing operations.

use std::collections::BTreeSet;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, StringFormat};

use super::fonts::FontResources;
use super::make_stream;
use crate::error::{Error, Result};
use crate::font::ShapedGlyph;

/// Shear of synthetic italics (tan 12°).
const ITALIC_SHEAR: f32 = 0.2126;

/// Stroke width of synthetic bold, as a fraction of the font size.
const BOLD_STROKE: f32 = 0.03;

/// Shaped text ready to be drawn.
#[derive(Debug, Clone)]
pub struct GlyphRun<'a> {
    /// Font resource name (`F1`, `F2`, ...)
    pub font: &'a str,
    /// Font size in points
    pub size: f32,
    /// Units per em of the face
    pub units_per_em: u16,
    /// Pen start, PDF user space
    pub x: f32,
    /// Baseline, PDF user space
    pub y: f32,
    /// Shaped glyphs
    pub glyphs: &'a [ShapedGlyph],
    /// Default advances of the glyphs, in font units
    pub advances: &'a [u16],
    /// Fake bold with a fill+stroke render mode
    pub synthetic_bold: bool,
    /// Fake italic with a sheared text matrix
    pub synthetic_italic: bool,
}

/// Operation list of one page.
///
/// A canvas lives only while its page is drawn: it is flushed into the
/// document as a content stream plus page object and then dropped.
#[derive(Debug)]
pub struct PageCanvas {
    width: f32,
    height: f32,
    operations: Vec<Operation>,
    fonts: BTreeSet<String>,
}

impl PageCanvas {
    /// Create an empty canvas for a page of the given size.
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            operations: Vec::new(),
            fonts: BTreeSet::new(),
        }
    }

    /// Page height, for flipping top-down layout coordinates.
    pub fn height(&self) -> f32 {
        self.height
    }

    /// Check if nothing was drawn.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Draw a run of shaped glyphs.
    pub fn draw_glyphs(&mut self, run: &GlyphRun<'_>) {
        if run.glyphs.iter().all(|g| g.glyph_id == 0) {
            return;
        }
        self.fonts.insert(run.font.to_string());

        self.operations.push(Operation::new("q", vec![]));
        if run.synthetic_bold {
            self.operations
                .push(Operation::new("w", vec![(run.size * BOLD_STROKE).into()]));
        }
        self.operations.push(Operation::new("BT", vec![]));
        self.operations.push(Operation::new(
            "Tf",
            vec![Object::Name(run.font.as_bytes().to_vec()), run.size.into()],
        ));
        if run.synthetic_bold {
            self.operations.push(Operation::new("Tr", vec![2.into()]));
        }

        let shear = if run.synthetic_italic { ITALIC_SHEAR } else { 0.0 };
        self.operations.push(Operation::new(
            "Tm",
            vec![
                1.into(),
                0.into(),
                shear.into(),
                1.into(),
                run.x.into(),
                run.y.into(),
            ],
        ));

        self.show_glyphs(run);

        self.operations.push(Operation::new("ET", vec![]));
        self.operations.push(Operation::new("Q", vec![]));
    }

    /// Emit `TJ` arrays; glyphs with a vertical offset get their own array under `Ts`.
    fn show_glyphs(&mut self, run: &GlyphRun<'_>) {
        let scale = 1000.0 / f32::from(run.units_per_em.max(1));
        let rise_scale = run.size / f32::from(run.units_per_em.max(1));

        let mut array: Vec<Object> = Vec::new();
        let mut rise = 0.0;
        // positions in thousandths of the font size, relative to the run start
        let mut pen = 0.0;
        let mut text_pos = 0.0;

        for (glyph, advance) in run.glyphs.iter().zip(run.advances) {
            let shaped_advance = glyph.x_advance as f32 * scale;
            if glyph.glyph_id == 0 {
                pen += shaped_advance;
                continue;
            }

            let glyph_rise = glyph.y_offset as f32 * rise_scale;
            if (glyph_rise - rise).abs() > 0.001 {
                self.flush_array(&mut array);
                self.operations.push(Operation::new("Ts", vec![glyph_rise.into()]));
                rise = glyph_rise;
            }

            let target = pen + glyph.x_offset as f32 * scale;
            let delta = target - text_pos;
            if delta.abs() > 0.001 {
                array.push((-delta).into());
            }

            let [hi, lo] = glyph.glyph_id.to_be_bytes();
            match array.last_mut() {
                Some(Object::String(bytes, StringFormat::Hexadecimal)) => bytes.extend([hi, lo]),
                _ => array.push(Object::String(vec![hi, lo], StringFormat::Hexadecimal)),
            }

            text_pos = target + f32::from(*advance) * scale;
            pen += shaped_advance;
        }

        self.flush_array(&mut array);
    }

    fn flush_array(&mut self, array: &mut Vec<Object>) {
        if !array.is_empty() {
            self.operations
                .push(Operation::new("TJ", vec![Object::Array(std::mem::take(array))]));
        }
    }

    /// Write the content stream and page object; returns the page id.
    pub fn flush(
        self,
        doc: &mut Document,
        parent: ObjectId,
        fonts: &FontResources,
        compress: bool,
    ) -> Result<ObjectId> {
        let content = Content {
            operations: self.operations,
        };
        let data = content
            .encode()
            .map_err(|e| Error::Render(format!("cannot encode page content: {}", e)))?;
        let content_id = doc.add_object(make_stream(Dictionary::new(), data, compress)?);

        let mut font_dict = Dictionary::new();
        for name in &self.fonts {
            let id = fonts
                .get(name)
                .ok_or_else(|| Error::Render(format!("font {} was never registered", name)))?;
            font_dict.set(name.as_str(), Object::Reference(id));
        }

        let page = dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(parent),
            "MediaBox" => vec![0.into(), 0.into(), self.width.into(), self.height.into()],
            "Contents" => Object::Reference(content_id),
            "Resources" => dictionary! {
                "Font" => Object::Dictionary(font_dict),
            },
        };
        Ok(doc.add_object(page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn glyph(glyph_id: u16, x_advance: i32) -> ShapedGlyph {
        ShapedGlyph {
            glyph_id,
            cluster: 0,
            x_advance,
            x_offset: 0,
            y_offset: 0,
        }
    }

    fn run<'a>(glyphs: &'a [ShapedGlyph], advances: &'a [u16]) -> GlyphRun<'a> {
        GlyphRun {
            font: "F1",
            size: 12.0,
            units_per_em: 1000,
            x: 72.0,
            y: 700.0,
            glyphs,
            advances,
            synthetic_bold: false,
            synthetic_italic: false,
        }
    }

    fn operators(canvas: &PageCanvas) -> Vec<&str> {
        canvas.operations.iter().map(|op| op.operator.as_str()).collect()
    }

    #[test]
    fn test_plain_glyphs_share_one_string() {
        let glyphs = [glyph(10, 500), glyph(11, 500)];
        let mut canvas = PageCanvas::new(595.0, 842.0);
        canvas.draw_glyphs(&run(&glyphs, &[500, 500]));

        assert_eq!(operators(&canvas), vec!["q", "BT", "Tf", "Tm", "TJ", "ET", "Q"]);
        let Object::Array(items) = &canvas.operations[4].operands[0] else {
            panic!("expected TJ array");
        };
        assert!(matches!(&items[..], [Object::String(bytes, _)] if bytes == &[0, 10, 0, 11]));
    }

    #[test]
    fn test_shaped_advance_adjustment() {
        // second glyph is kerned 100 units closer than its default advance
        let glyphs = [glyph(10, 400), glyph(11, 500)];
        let mut canvas = PageCanvas::new(595.0, 842.0);
        canvas.draw_glyphs(&run(&glyphs, &[500, 500]));

        let Object::Array(items) = &canvas.operations[4].operands[0] else {
            panic!("expected TJ array");
        };
        assert_eq!(items.len(), 3);
        assert!(matches!(items[1], Object::Real(v) if (v - 100.0).abs() < 1e-3));
    }

    #[test]
    fn test_synthetic_styles() {
        let glyphs = [glyph(10, 500)];
        let mut canvas = PageCanvas::new(595.0, 842.0);
        let mut styled = run(&glyphs, &[500]);
        styled.synthetic_bold = true;
        styled.synthetic_italic = true;
        canvas.draw_glyphs(&styled);

        assert_eq!(operators(&canvas), vec!["q", "w", "BT", "Tf", "Tr", "Tm", "TJ", "ET", "Q"]);
        let tm = &canvas.operations[5].operands;
        assert!(matches!(tm[2], Object::Real(v) if (v - ITALIC_SHEAR).abs() < 1e-6));
    }

    #[test]
    fn test_vertical_offsets_use_rise() {
        let mut mark = glyph(12, 0);
        mark.y_offset = 100;
        let glyphs = [glyph(10, 500), mark];
        let mut canvas = PageCanvas::new(595.0, 842.0);
        canvas.draw_glyphs(&run(&glyphs, &[500, 0]));

        assert!(operators(&canvas).contains(&"Ts"));
        assert_eq!(operators(&canvas).iter().filter(|op| **op == "TJ").count(), 2);
    }

    #[test]
    fn test_notdef_only_draws_nothing() {
        let glyphs = [glyph(0, 500)];
        let mut canvas = PageCanvas::new(595.0, 842.0);
        canvas.draw_glyphs(&run(&glyphs, &[500]));
        assert!(canvas.is_empty());
    }
}
