//! Font registration and Type0 font objects with CID descendants.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;
use std::sync::Arc;

use lopdf::{dictionary, Dictionary, Document, Object, ObjectId};

use super::make_stream;
use crate::error::Result;
use crate::font::{face_key, FontFace, FontProgram, OutlineFormat, ShapedGlyph};

/// Resource name to font object id, for page resource dictionaries.
#[derive(Debug, Default)]
pub struct FontResources {
    ids: HashMap<String, ObjectId>,
}

impl FontResources {
    /// Object id of a font resource.
    pub fn get(&self, name: &str) -> Option<ObjectId> {
        self.ids.get(name).copied()
    }

    /// Number of registered fonts.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Check if no font was registered.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[derive(Debug)]
struct RegisteredFont {
    name: String,
    id: ObjectId,
    face: Arc<dyn FontFace>,
    /// Glyph id to the text it renders, for the ToUnicode map
    used: BTreeMap<u16, String>,
}

/// Fonts used by one document, registered once per face.
///
/// Object ids are reserved at registration so pages can reference a font
/// before its glyph usage (and so its widths) is complete.
#[derive(Debug, Default)]
pub struct FontRegistry {
    fonts: Vec<RegisteredFont>,
    by_face: HashMap<usize, usize>,
}

impl FontRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a face; returns its resource name. Registering twice is a no-op.
    pub fn register(&mut self, doc: &mut Document, face: &Arc<dyn FontFace>) -> &str {
        let key = face_key(face);
        let index = match self.by_face.get(&key) {
            Some(&index) => index,
            None => {
                let index = self.fonts.len();
                self.fonts.push(RegisteredFont {
                    name: format!("F{}", index + 1),
                    id: doc.new_object_id(),
                    face: face.clone(),
                    used: BTreeMap::new(),
                });
                self.by_face.insert(key, index);
                log::debug!("Registered font F{} for \"{}\"", index + 1, face.family());
                index
            }
        };
        &self.fonts[index].name
    }

    /// Number of registered fonts.
    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    /// Check if no font is registered.
    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }

    /// Resource names and reserved ids of the fonts registered so far.
    pub fn resources(&self) -> FontResources {
        FontResources {
            ids: self.fonts.iter().map(|f| (f.name.clone(), f.id)).collect(),
        }
    }

    /// Record the glyphs a shaped text uses, mapping each back to its source text.
    pub fn record_usage(&mut self, face: &Arc<dyn FontFace>, text: &str, glyphs: &[ShapedGlyph]) {
        let Some(&index) = self.by_face.get(&face_key(face)) else {
            return;
        };
        let used = &mut self.fonts[index].used;

        let mut boundaries: Vec<usize> = glyphs.iter().map(|g| g.cluster.min(text.len())).collect();
        boundaries.push(text.len());
        boundaries.sort_unstable();
        boundaries.dedup();

        for glyph in glyphs.iter().filter(|g| g.glyph_id != 0) {
            let start = glyph.cluster.min(text.len());
            let end = match boundaries.binary_search(&start) {
                Ok(i) => boundaries.get(i + 1).copied().unwrap_or(text.len()),
                Err(i) => boundaries.get(i).copied().unwrap_or(text.len()),
            };
            let source = text.get(start..end).unwrap_or_default();
            let entry = used.entry(glyph.glyph_id).or_default();
            // only the first glyph of a cluster carries its text
            if entry.is_empty() && !source.is_empty() && is_cluster_start(glyphs, glyph) {
                *entry = source.to_string();
            }
        }
    }

    /// Write every registered font into the document.
    pub fn finish(self, doc: &mut Document, compress: bool) -> Result<FontResources> {
        let mut resources = FontResources::default();
        for font in self.fonts {
            write_font(doc, &font, compress)?;
            resources.ids.insert(font.name, font.id);
        }
        Ok(resources)
    }
}

fn is_cluster_start(glyphs: &[ShapedGlyph], glyph: &ShapedGlyph) -> bool {
    glyphs
        .iter()
        .find(|g| g.cluster == glyph.cluster)
        .is_some_and(|first| std::ptr::eq(first, glyph))
}

/// Scale font units to PDF glyph space (1000 units per em).
fn to_glyph_space(value: f32, units_per_em: u16) -> i64 {
    (value * 1000.0 / f32::from(units_per_em.max(1))).round() as i64
}

fn write_font(doc: &mut Document, font: &RegisteredFont, compress: bool) -> Result<()> {
    let face = &font.face;
    let upm = face.units_per_em();
    let metrics = face.metrics();
    let base_font = sanitize_name(&face.postscript_name());

    let [x_min, y_min, x_max, y_max] = metrics.bbox;
    let mut descriptor = dictionary! {
        "Type" => "FontDescriptor",
        "FontName" => Object::Name(base_font.clone().into_bytes()),
        "Flags" => 32,
        "FontBBox" => vec![
            to_glyph_space(x_min.into(), upm).into(),
            to_glyph_space(y_min.into(), upm).into(),
            to_glyph_space(x_max.into(), upm).into(),
            to_glyph_space(y_max.into(), upm).into(),
        ],
        "ItalicAngle" => 0,
        "Ascent" => to_glyph_space(metrics.ascender.into(), upm),
        "Descent" => to_glyph_space(metrics.descender.into(), upm),
        "CapHeight" => to_glyph_space(metrics.ascender.into(), upm),
        "StemV" => 80,
    };
    let program = face.font_program();
    if let Some(program) = &program {
        let (key, stream) = program_stream(program, compress)?;
        descriptor.set(key, Object::Reference(doc.add_object(stream)));
    }
    let descriptor_id = doc.add_object(descriptor);
    let format = program.map_or(OutlineFormat::TrueType, |p| p.format);

    let widths: BTreeMap<u16, i64> = font
        .used
        .keys()
        .map(|&gid| (gid, to_glyph_space(face.glyph_advance(gid).into(), upm)))
        .collect();

    let mut cid_font = dictionary! {
        "Type" => "Font",
        "Subtype" => cid_subtype(format),
        "BaseFont" => Object::Name(base_font.clone().into_bytes()),
        "CIDSystemInfo" => dictionary! {
            "Registry" => Object::string_literal("Adobe"),
            "Ordering" => Object::string_literal("Identity"),
            "Supplement" => 0,
        },
        "FontDescriptor" => Object::Reference(descriptor_id),
        "W" => width_array(&widths),
    };
    // CFF programs are addressed by CID directly
    if format == OutlineFormat::TrueType {
        cid_font.set("CIDToGIDMap", "Identity");
    }
    let cid_font_id = doc.add_object(cid_font);

    let cmap = to_unicode_cmap(&font.used);
    let cmap_id = doc.add_object(make_stream(Dictionary::new(), cmap.into_bytes(), compress)?);

    doc.objects.insert(
        font.id,
        Object::Dictionary(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type0",
            "BaseFont" => Object::Name(base_font.into_bytes()),
            "Encoding" => "Identity-H",
            "DescendantFonts" => vec![Object::Reference(cid_font_id)],
            "ToUnicode" => Object::Reference(cmap_id),
        }),
    );

    log::debug!(
        "Wrote font {} ({}): {} glyphs, {:?} outlines, embedded: {}",
        font.name,
        face.family(),
        widths.len(),
        format,
        program.is_some()
    );
    Ok(())
}

fn cid_subtype(format: OutlineFormat) -> &'static str {
    match format {
        OutlineFormat::TrueType => "CIDFontType2",
        OutlineFormat::Cff => "CIDFontType0",
    }
}

/// Descriptor key and stream for an embedded font program.
fn program_stream(
    program: &FontProgram<'_>,
    compress: bool,
) -> Result<(&'static str, lopdf::Stream)> {
    match program.format {
        OutlineFormat::TrueType => {
            let dict = dictionary! { "Length1" => program.data.len() as i64 };
            Ok(("FontFile2", make_stream(dict, program.data.to_vec(), compress)?))
        }
        OutlineFormat::Cff => {
            let dict = dictionary! { "Subtype" => "OpenType" };
            Ok(("FontFile3", make_stream(dict, program.data.to_vec(), compress)?))
        }
    }
}

/// `/W` array grouping consecutive glyph ids: `[c [w1 w2 ...] ...]`.
fn width_array(widths: &BTreeMap<u16, i64>) -> Vec<Object> {
    let mut array = Vec::new();
    let mut start: Option<u16> = None;
    let mut previous = 0u16;
    let mut group: Vec<Object> = Vec::new();

    for (&gid, &width) in widths {
        match start {
            Some(_) if gid == previous.wrapping_add(1) => group.push(width.into()),
            _ => {
                if let Some(first) = start {
                    array.push(i64::from(first).into());
                    array.push(Object::Array(std::mem::take(&mut group)));
                }
                start = Some(gid);
                group.push(width.into());
            }
        }
        previous = gid;
    }
    if let Some(first) = start {
        array.push(i64::from(first).into());
        array.push(Object::Array(group));
    }
    array
}

/// ToUnicode CMap with one `bfchar` entry per used glyph.
fn to_unicode_cmap(used: &BTreeMap<u16, String>) -> String {
    let mut cmap = String::from(
        "/CIDInit /ProcSet findresource begin\n\
         12 dict begin\n\
         begincmap\n\
         /CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n\
         /CMapName /Adobe-Identity-UCS def\n\
         /CMapType 2 def\n\
         1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n",
    );

    let entries: Vec<(&u16, &String)> = used.iter().filter(|(_, text)| !text.is_empty()).collect();
    for chunk in entries.chunks(100) {
        let _ = writeln!(cmap, "{} beginbfchar", chunk.len());
        for (gid, text) in chunk {
            let hex: String = text.encode_utf16().map(|unit| format!("{:04X}", unit)).collect();
            let _ = writeln!(cmap, "<{:04X}> <{}>", gid, hex);
        }
        cmap.push_str("endbfchar\n");
    }

    cmap.push_str("endcmap\nCMapName currentdict /CMap defineresource pop\nend\nend\n");
    cmap
}

/// Keep a PostScript name within the characters a PDF name may hold unescaped.
fn sanitize_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| c.is_ascii_graphic() && !"()<>[]{}/%#".contains(*c))
        .collect();
    if cleaned.is_empty() {
        "Font".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::UniformFace;

    fn glyph(glyph_id: u16, cluster: usize) -> ShapedGlyph {
        ShapedGlyph {
            glyph_id,
            cluster,
            x_advance: 500,
            x_offset: 0,
            y_offset: 0,
        }
    }

    #[test]
    fn test_register_is_idempotent() {
        let mut doc = Document::with_version("1.7");
        let a: Arc<dyn FontFace> = Arc::new(UniformFace::new("A"));
        let b: Arc<dyn FontFace> = Arc::new(UniformFace::new("B"));

        let mut registry = FontRegistry::new();
        assert_eq!(registry.register(&mut doc, &a), "F1");
        assert_eq!(registry.register(&mut doc, &b), "F2");
        assert_eq!(registry.register(&mut doc, &a.clone()), "F1");
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_record_usage_maps_clusters() {
        let mut doc = Document::with_version("1.7");
        let face: Arc<dyn FontFace> = Arc::new(UniformFace::new("A"));
        let mut registry = FontRegistry::new();
        registry.register(&mut doc, &face);

        // "ਕਿ": two glyphs for two characters, the vowel sign reordered first
        let text = "ਕਿ";
        registry.record_usage(&face, text, &[glyph(0x0A3F, 3), glyph(0x0A15, 0)]);

        let used = &registry.fonts[0].used;
        assert_eq!(used.get(&0x0A15).map(String::as_str), Some("ਕ"));
        assert_eq!(used.get(&0x0A3F).map(String::as_str), Some("ਿ"));
    }

    #[test]
    fn test_width_array_groups_consecutive_ids() {
        let widths: BTreeMap<u16, i64> = [(3, 500), (4, 600), (9, 250)].into_iter().collect();
        let array = width_array(&widths);
        assert_eq!(array.len(), 4);
        assert!(matches!(array[0], Object::Integer(3)));
        assert!(matches!(&array[1], Object::Array(items) if items.len() == 2));
        assert!(matches!(array[2], Object::Integer(9)));
    }

    #[test]
    fn test_to_unicode_cmap() {
        let used: BTreeMap<u16, String> = [(0x0A2A, "ਪ".to_string()), (5, String::new())]
            .into_iter()
            .collect();
        let cmap = to_unicode_cmap(&used);
        assert!(cmap.contains("1 beginbfchar"));
        assert!(cmap.contains("<0A2A> <0A2A>"));
        assert!(cmap.contains("endcmap"));
    }

    #[test]
    fn test_finish_writes_type0_fonts() {
        let mut doc = Document::with_version("1.7");
        let face: Arc<dyn FontFace> = Arc::new(UniformFace::new("Noto Sans Gurmukhi"));
        let mut registry = FontRegistry::new();
        registry.register(&mut doc, &face);
        registry.record_usage(&face, "ਪ", &[glyph(0x0A2A, 0)]);

        let resources = registry.finish(&mut doc, false).unwrap();
        let id = resources.get("F1").unwrap();
        let font = doc.get_dictionary(id).unwrap();
        assert_eq!(font.get(b"Subtype").unwrap().as_name().unwrap(), b"Type0");
        assert_eq!(font.get(b"BaseFont").unwrap().as_name().unwrap(), b"NotoSansGurmukhi");
        assert_eq!(font.get(b"Encoding").unwrap().as_name().unwrap(), b"Identity-H");
    }

    /// Metrics-only face that claims an embeddable program.
    #[derive(Debug)]
    struct ProgramFace {
        inner: UniformFace,
        format: OutlineFormat,
    }

    impl FontFace for ProgramFace {
        fn family(&self) -> &str {
            self.inner.family()
        }
        fn units_per_em(&self) -> u16 {
            self.inner.units_per_em()
        }
        fn metrics(&self) -> crate::font::VerticalMetrics {
            self.inner.metrics()
        }
        fn glyph_id(&self, ch: char) -> Option<u16> {
            self.inner.glyph_id(ch)
        }
        fn glyph_advance(&self, glyph_id: u16) -> u16 {
            self.inner.glyph_advance(glyph_id)
        }
        fn font_program(&self) -> Option<FontProgram<'_>> {
            Some(FontProgram {
                data: b"OTTO font bytes",
                format: self.format,
            })
        }
    }

    fn written_font(format: OutlineFormat) -> (Document, Dictionary, Dictionary) {
        let mut doc = Document::with_version("1.7");
        let face: Arc<dyn FontFace> = Arc::new(ProgramFace {
            inner: UniformFace::new("Program"),
            format,
        });
        let mut registry = FontRegistry::new();
        registry.register(&mut doc, &face);
        registry.record_usage(&face, "a", &[glyph(0x61, 0)]);
        let id = registry.finish(&mut doc, false).unwrap().get("F1").unwrap();

        let descendants = doc.get_dictionary(id).unwrap().get(b"DescendantFonts").unwrap();
        let cid_id = descendants.as_array().unwrap()[0].as_reference().unwrap();
        let cid_font = doc.get_dictionary(cid_id).unwrap().clone();
        let descriptor_id = cid_font.get(b"FontDescriptor").unwrap().as_reference().unwrap();
        let descriptor = doc.get_dictionary(descriptor_id).unwrap().clone();
        (doc, cid_font, descriptor)
    }

    #[test]
    fn test_truetype_program_is_font_file2() {
        let (doc, cid_font, descriptor) = written_font(OutlineFormat::TrueType);
        assert_eq!(cid_font.get(b"Subtype").unwrap().as_name().unwrap(), b"CIDFontType2");
        assert_eq!(cid_font.get(b"CIDToGIDMap").unwrap().as_name().unwrap(), b"Identity");
        assert!(descriptor.get(b"FontFile3").is_err());

        let file_id = descriptor.get(b"FontFile2").unwrap().as_reference().unwrap();
        let stream = doc.get_object(file_id).unwrap().as_stream().unwrap();
        assert!(matches!(stream.dict.get(b"Length1"), Ok(Object::Integer(15))));
        assert_eq!(stream.content, b"OTTO font bytes");
    }

    #[test]
    fn test_cff_program_is_open_type_font_file3() {
        let (doc, cid_font, descriptor) = written_font(OutlineFormat::Cff);
        assert_eq!(cid_font.get(b"Subtype").unwrap().as_name().unwrap(), b"CIDFontType0");
        assert!(cid_font.get(b"CIDToGIDMap").is_err());
        assert!(descriptor.get(b"FontFile2").is_err());

        let file_id = descriptor.get(b"FontFile3").unwrap().as_reference().unwrap();
        let stream = doc.get_object(file_id).unwrap().as_stream().unwrap();
        assert_eq!(stream.dict.get(b"Subtype").unwrap().as_name().unwrap(), b"OpenType");
    }

    #[test]
    fn test_metrics_only_face_is_not_embedded() {
        let mut doc = Document::with_version("1.7");
        let face: Arc<dyn FontFace> = Arc::new(UniformFace::new("Plain"));
        let mut registry = FontRegistry::new();
        registry.register(&mut doc, &face);
        let id = registry.finish(&mut doc, false).unwrap().get("F1").unwrap();

        let descendants = doc.get_dictionary(id).unwrap().get(b"DescendantFonts").unwrap();
        let cid_id = descendants.as_array().unwrap()[0].as_reference().unwrap();
        let cid_font = doc.get_dictionary(cid_id).unwrap();
        assert_eq!(cid_font.get(b"Subtype").unwrap().as_name().unwrap(), b"CIDFontType2");
        let descriptor_id = cid_font.get(b"FontDescriptor").unwrap().as_reference().unwrap();
        let descriptor = doc.get_dictionary(descriptor_id).unwrap();
        assert!(descriptor.get(b"FontFile2").is_err());
        assert!(descriptor.get(b"FontFile3").is_err());
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("Noto(Sans)/Gurmukhi"), "NotoSansGurmukhi");
        assert_eq!(sanitize_name("   "), "Font");
    }
}
