//! Font faces and font selection.
//!
//! Every stage that needs glyph data goes through the [`FontFace`] trait:
//! the normalizer checks coverage, the layout engine measures shaped
//! advances and the renderer embeds the program and writes glyph ids.
//! A [`FontSet`] is built once at startup, wrapped in an `Arc` and shared
//! read-only between conversions.

mod truetype;
mod uniform;

pub use truetype::TrueTypeFace;
pub use uniform::UniformFace;

use crate::model::Script;
use std::fmt;
use std::sync::Arc;

/// Joiners that steer shaping but never need a glyph of their own.
pub const ZERO_WIDTH_JOINERS: [char; 2] = ['\u{200C}', '\u{200D}'];

/// Vertical font metrics in font units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerticalMetrics {
    /// Distance from baseline to the top of the line (positive)
    pub ascender: i16,
    /// Distance from baseline to the bottom of the line (negative)
    pub descender: i16,
    /// Extra gap between lines
    pub line_gap: i16,
    /// Glyph bounding box: x_min, y_min, x_max, y_max
    pub bbox: [i16; 4],
}

impl VerticalMetrics {
    /// Natural line height for a font size, in points.
    pub fn line_height(&self, size: f32, units_per_em: u16) -> f32 {
        let units = f32::from(self.ascender) - f32::from(self.descender) + f32::from(self.line_gap);
        units * size / f32::from(units_per_em.max(1))
    }

    /// Ascent for a font size, in points.
    pub fn ascent(&self, size: f32, units_per_em: u16) -> f32 {
        f32::from(self.ascender) * size / f32::from(units_per_em.max(1))
    }
}

/// One positioned glyph produced by shaping, values in font units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShapedGlyph {
    /// Glyph id (0 = .notdef)
    pub glyph_id: u16,
    /// Byte offset of the source cluster in the shaped text
    pub cluster: usize,
    /// Horizontal advance after shaping
    pub x_advance: i32,
    /// Horizontal placement offset
    pub x_offset: i32,
    /// Vertical placement offset
    pub y_offset: i32,
}

/// A single font face: glyph table, metrics and shaping.
pub trait FontFace: Send + Sync + fmt::Debug {
    /// Family name, as written into run descriptors.
    fn family(&self) -> &str;

    /// PostScript name used for the PDF `BaseFont`.
    fn postscript_name(&self) -> String {
        self.family()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
            .collect()
    }

    /// Design units per em.
    fn units_per_em(&self) -> u16;

    /// Vertical metrics in font units.
    fn metrics(&self) -> VerticalMetrics;

    /// Glyph id for a character, `None` when the face has no glyph for it.
    fn glyph_id(&self, ch: char) -> Option<u16>;

    /// Default horizontal advance of a glyph in font units.
    fn glyph_advance(&self, glyph_id: u16) -> u16;

    /// Check if the face has a glyph for a character.
    fn has_glyph(&self, ch: char) -> bool {
        self.glyph_id(ch).is_some()
    }

    /// Shape text into positioned glyphs.
    ///
    /// The default maps characters one-to-one through the glyph table.
    fn shape(&self, text: &str) -> Vec<ShapedGlyph> {
        map_glyphs(self, text)
    }

    /// Width of shaped text at a font size, in points.
    fn text_width(&self, text: &str, size: f32) -> f32 {
        let units: i32 = self.shape(text).iter().map(|g| g.x_advance).sum();
        units as f32 * size / f32::from(self.units_per_em().max(1))
    }

    /// Font program for embedding, if any.
    fn font_program(&self) -> Option<FontProgram<'_>> {
        None
    }
}

/// Glyph outline flavour of a font program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutlineFormat {
    /// `glyf` outlines, embedded as `FontFile2`
    TrueType,
    /// `CFF `/`CFF2` outlines, embedded as `FontFile3` of subtype `OpenType`
    Cff,
}

/// Raw font file bytes together with their outline flavour.
#[derive(Debug, Clone, Copy)]
pub struct FontProgram<'a> {
    /// Complete font file
    pub data: &'a [u8],
    /// Outline flavour
    pub format: OutlineFormat,
}

/// One-to-one glyph mapping without contextual shaping.
pub(crate) fn map_glyphs<F: FontFace + ?Sized>(face: &F, text: &str) -> Vec<ShapedGlyph> {
    text.char_indices()
        .filter(|(_, ch)| !ZERO_WIDTH_JOINERS.contains(ch))
        .map(|(cluster, ch)| {
            let glyph_id = face.glyph_id(ch).unwrap_or(0);
            ShapedGlyph {
                glyph_id,
                cluster,
                x_advance: i32::from(face.glyph_advance(glyph_id)),
                x_offset: 0,
                y_offset: 0,
            }
        })
        .collect()
}

/// Identity of a face instance, stable for the lifetime of the `Arc`.
pub fn face_key(face: &Arc<dyn FontFace>) -> usize {
    Arc::as_ptr(face) as *const () as usize
}

/// Regular face plus optional style variants of one family.
#[derive(Debug, Clone)]
pub struct FontFamily {
    /// Upright regular face (required)
    pub regular: Arc<dyn FontFace>,
    /// Bold face
    pub bold: Option<Arc<dyn FontFace>>,
    /// Italic face
    pub italic: Option<Arc<dyn FontFace>>,
    /// Bold italic face
    pub bold_italic: Option<Arc<dyn FontFace>>,
}

impl FontFamily {
    /// Create a family from its regular face.
    pub fn new(regular: Arc<dyn FontFace>) -> Self {
        Self {
            regular,
            bold: None,
            italic: None,
            bold_italic: None,
        }
    }

    /// Set the bold face.
    pub fn with_bold(mut self, face: Arc<dyn FontFace>) -> Self {
        self.bold = Some(face);
        self
    }

    /// Set the italic face.
    pub fn with_italic(mut self, face: Arc<dyn FontFace>) -> Self {
        self.italic = Some(face);
        self
    }

    /// Set the bold italic face.
    pub fn with_bold_italic(mut self, face: Arc<dyn FontFace>) -> Self {
        self.bold_italic = Some(face);
        self
    }

    /// Pick the closest face for a style; missing traits are synthesized.
    pub fn select(&self, bold: bool, italic: bool) -> ResolvedFace {
        let exact = match (bold, italic) {
            (false, false) => Some(&self.regular),
            (true, false) => self.bold.as_ref(),
            (false, true) => self.italic.as_ref(),
            (true, true) => self.bold_italic.as_ref(),
        };
        if let Some(face) = exact {
            return ResolvedFace::new(face.clone(), false, false);
        }

        if bold && italic {
            if let Some(face) = &self.bold {
                return ResolvedFace::new(face.clone(), false, true);
            }
            if let Some(face) = &self.italic {
                return ResolvedFace::new(face.clone(), true, false);
            }
        }

        ResolvedFace::new(self.regular.clone(), bold, italic)
    }

    /// All faces of the family.
    pub fn faces(&self) -> impl Iterator<Item = &Arc<dyn FontFace>> {
        std::iter::once(&self.regular)
            .chain(self.bold.iter())
            .chain(self.italic.iter())
            .chain(self.bold_italic.iter())
    }
}

/// A face chosen for a run, with the style traits it must fake.
#[derive(Debug, Clone)]
pub struct ResolvedFace {
    /// The selected face
    pub face: Arc<dyn FontFace>,
    /// Emulate bold by stroking outlines
    pub synthetic_bold: bool,
    /// Emulate italic by shearing
    pub synthetic_italic: bool,
}

impl ResolvedFace {
    fn new(face: Arc<dyn FontFace>, synthetic_bold: bool, synthetic_italic: bool) -> Self {
        Self {
            face,
            synthetic_bold,
            synthetic_italic,
        }
    }

    /// Family name of the selected face.
    pub fn family(&self) -> &str {
        self.face.family()
    }
}

/// The Gurmukhi and Latin families used for every conversion.
#[derive(Debug, Clone)]
pub struct FontSet {
    gurmukhi: FontFamily,
    latin: FontFamily,
}

impl FontSet {
    /// Create a font set from its two families.
    pub fn new(gurmukhi: FontFamily, latin: FontFamily) -> Self {
        Self { gurmukhi, latin }
    }

    /// Family used for a script.
    pub fn family(&self, script: Script) -> &FontFamily {
        match script {
            Script::Gurmukhi => &self.gurmukhi,
            Script::Latin => &self.latin,
        }
    }

    /// Face for a script and style.
    pub fn select(&self, script: Script, bold: bool, italic: bool) -> ResolvedFace {
        self.family(script).select(bold, italic)
    }

    /// Every face in the set, Gurmukhi family first.
    pub fn faces(&self) -> impl Iterator<Item = &Arc<dyn FontFace>> {
        self.gurmukhi.faces().chain(self.latin.faces())
    }
}
