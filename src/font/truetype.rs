//! TrueType/OpenType faces backed by ttf-parser and rustybuzz.

use super::{FontFace, FontProgram, OutlineFormat, ShapedGlyph, VerticalMetrics};
use crate::error::{Error, Result};
use std::fmt;
use std::path::Path;
use ttf_parser::{name_id, GlyphId, Tag};

/// A parsed TrueType or OpenType face.
///
/// The font bytes are parsed once and kept for the rest of the process,
/// so shaping reuses the same rustybuzz face. Faces are meant to be loaded
/// once at startup and shared through a [`FontSet`](super::FontSet).
pub struct TrueTypeFace {
    data: &'static [u8],
    face: rustybuzz::Face<'static>,
    index: u32,
    family: String,
    postscript_name: Option<String>,
    format: OutlineFormat,
    units_per_em: u16,
    metrics: VerticalMetrics,
    mapped_chars: usize,
}

impl TrueTypeFace {
    /// Load a face from font file bytes.
    ///
    /// `index` selects the face inside a collection (`0` for plain files).
    pub fn from_bytes(data: Vec<u8>, index: u32) -> Result<Self> {
        let (family, postscript_name, format, units_per_em, metrics, mapped_chars) = {
            let face = ttf_parser::Face::parse(&data, index)
                .map_err(|e| Error::Font(format!("cannot parse font face {}: {}", index, e)))?;

            let family = find_name(&face, name_id::TYPOGRAPHIC_FAMILY)
                .or_else(|| find_name(&face, name_id::FAMILY))
                .ok_or_else(|| Error::Font("font has no family name".to_string()))?;
            let postscript_name = find_name(&face, name_id::POST_SCRIPT_NAME);
            let format = outline_format(&face)
                .ok_or_else(|| Error::Font(format!("\"{}\" has no glyph outlines", family)))?;

            let rect = face.global_bounding_box();
            let metrics = VerticalMetrics {
                ascender: face.ascender(),
                descender: face.descender(),
                line_gap: face.line_gap(),
                bbox: [rect.x_min, rect.y_min, rect.x_max, rect.y_max],
            };
            let units_per_em = face.units_per_em();
            (family, postscript_name, format, units_per_em, metrics, count_mapped(&face))
        };

        let data: &'static [u8] = Box::leak(data.into_boxed_slice());
        let face = rustybuzz::Face::from_slice(data, index)
            .ok_or_else(|| Error::Font(format!("cannot load \"{}\" for shaping", family)))?;

        log::debug!(
            "Loaded font \"{}\" ({:?}): {} glyphs, {} mapped code points, upm {}",
            family,
            format,
            face.number_of_glyphs(),
            mapped_chars,
            units_per_em
        );

        Ok(Self {
            data,
            face,
            index,
            family,
            postscript_name,
            format,
            units_per_em,
            metrics,
            mapped_chars,
        })
    }

    /// Load a face from a font file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;
        Self::from_bytes(data, 0).map_err(|e| match e {
            Error::Font(msg) => Error::Font(format!("{}: {}", path.display(), msg)),
            other => other,
        })
    }

    /// Number of code points mapped by the face.
    pub fn mapped_chars(&self) -> usize {
        self.mapped_chars
    }

    /// Outline flavour of the font program.
    pub fn outline_format(&self) -> OutlineFormat {
        self.format
    }
}

fn outline_format(face: &ttf_parser::Face<'_>) -> Option<OutlineFormat> {
    let raw = face.raw_face();
    if raw.table(Tag::from_bytes(b"glyf")).is_some() {
        Some(OutlineFormat::TrueType)
    } else if raw.table(Tag::from_bytes(b"CFF ")).is_some()
        || raw.table(Tag::from_bytes(b"CFF2")).is_some()
    {
        Some(OutlineFormat::Cff)
    } else {
        None
    }
}

fn count_mapped(face: &ttf_parser::Face<'_>) -> usize {
    let mut mapped = std::collections::BTreeSet::new();
    if let Some(table) = face.tables().cmap {
        for subtable in table.subtables.into_iter().filter(|s| s.is_unicode()) {
            subtable.codepoints(|cp| {
                if subtable.glyph_index(cp).is_some_and(|gid| gid.0 != 0) {
                    mapped.insert(cp);
                }
            });
        }
    }
    mapped.len()
}

fn find_name(face: &ttf_parser::Face<'_>, id: u16) -> Option<String> {
    face.names()
        .into_iter()
        .filter(|name| name.name_id == id)
        .find_map(|name| name.to_string())
        .filter(|name| !name.trim().is_empty())
}

impl fmt::Debug for TrueTypeFace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrueTypeFace")
            .field("family", &self.family)
            .field("index", &self.index)
            .field("format", &self.format)
            .field("glyphs", &self.face.number_of_glyphs())
            .field("bytes", &self.data.len())
            .finish()
    }
}

impl FontFace for TrueTypeFace {
    fn family(&self) -> &str {
        &self.family
    }

    fn postscript_name(&self) -> String {
        match &self.postscript_name {
            Some(name) => name.clone(),
            None => self.family.chars().filter(|c| c.is_ascii_alphanumeric()).collect(),
        }
    }

    fn units_per_em(&self) -> u16 {
        self.units_per_em
    }

    fn metrics(&self) -> VerticalMetrics {
        self.metrics
    }

    fn glyph_id(&self, ch: char) -> Option<u16> {
        self.face.glyph_index(ch).map(|gid| gid.0).filter(|&gid| gid != 0)
    }

    fn glyph_advance(&self, glyph_id: u16) -> u16 {
        self.face.glyph_hor_advance(GlyphId(glyph_id)).unwrap_or(0)
    }

    fn shape(&self, text: &str) -> Vec<ShapedGlyph> {
        let mut buffer = rustybuzz::UnicodeBuffer::new();
        buffer.push_str(text);
        buffer.guess_segment_properties();

        let output = rustybuzz::shape(&self.face, &[], buffer);
        output
            .glyph_infos()
            .iter()
            .zip(output.glyph_positions())
            .map(|(info, pos)| ShapedGlyph {
                glyph_id: info.glyph_id as u16,
                cluster: info.cluster as usize,
                x_advance: pos.x_advance,
                x_offset: pos.x_offset,
                y_offset: pos.y_offset,
            })
            .collect()
    }

    fn font_program(&self) -> Option<FontProgram<'_>> {
        Some(FontProgram {
            data: self.data,
            format: self.format,
        })
    }
}
