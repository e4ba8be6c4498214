//! Layout to PDF bytes.

use std::time::Instant;

use chrono::{DateTime, Utc};
use lopdf::{dictionary, Dictionary, Document, Object, StringFormat};

use super::canvas::{GlyphRun, PageCanvas};
use super::fonts::FontRegistry;
use super::options::RenderOptions;
use crate::error::{Error, Result};
use crate::font::FontSet;
use crate::layout::{Layout, LayoutLine};
use crate::model::Metadata;

/// Writes a [`Layout`] as a PDF document.
///
/// # Example
///
/// ```no_run
/// use gurmukhi_pdf::layout::{LayoutEngine, PageGeometry};
/// use gurmukhi_pdf::render::{PdfRenderer, RenderOptions};
/// # fn run(fonts: &gurmukhi_pdf::font::FontSet, doc: &gurmukhi_pdf::Document) -> gurmukhi_pdf::Result<()> {
/// let layout = LayoutEngine::new(fonts, PageGeometry::a4()).layout(doc);
/// let pdf = PdfRenderer::new(fonts, RenderOptions::default()).render(&layout, &doc.metadata)?;
/// std::fs::write("out.pdf", pdf)?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct PdfRenderer<'a> {
    fonts: &'a FontSet,
    options: RenderOptions,
}

impl<'a> PdfRenderer<'a> {
    /// Create a renderer for the given fonts.
    pub fn new(fonts: &'a FontSet, options: RenderOptions) -> Self {
        Self { fonts, options }
    }

    /// Render options in use.
    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Render a layout into PDF bytes.
    pub fn render(&self, layout: &Layout, metadata: &Metadata) -> Result<Vec<u8>> {
        let start = Instant::now();
        let geometry = &layout.geometry;
        let compress = self.options.compress;

        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let mut registry = FontRegistry::new();
        let mut kids: Vec<Object> = Vec::with_capacity(layout.page_count.max(1));

        let mut lines = layout.lines.iter().peekable();
        for page in 0..layout.page_count.max(1) {
            let mut canvas = PageCanvas::new(geometry.width, geometry.height);
            while let Some(line) = lines.next_if(|line| line.page == page) {
                self.draw_line(&mut doc, &mut registry, &mut canvas, line);
            }
            let page_id = canvas.flush(&mut doc, pages_id, &registry.resources(), compress)?;
            kids.push(Object::Reference(page_id));
        }
        if let Some(line) = lines.next() {
            return Err(Error::Render(format!(
                "line on page {} is outside the {} laid-out pages",
                line.page, layout.page_count
            )));
        }

        let fonts = registry.finish(&mut doc, compress)?;
        let page_count = kids.len();
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => page_count as i64,
            }),
        );

        let mut catalog = dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(pages_id),
        };
        if let Some(language) = &self.options.language {
            catalog.set("Lang", Object::string_literal(language.as_str()));
        }
        let catalog_id = doc.add_object(catalog);
        let info_id = doc.add_object(self.info_dictionary(metadata));
        doc.trailer.set("Root", Object::Reference(catalog_id));
        doc.trailer.set("Info", Object::Reference(info_id));

        let mut output = Vec::new();
        doc.save_to(&mut output)
            .map_err(|e| Error::Render(format!("cannot write PDF: {}", e)))?;

        log::debug!(
            "Rendered {} pages with {} fonts ({} bytes) in {:?}",
            page_count,
            fonts.len(),
            output.len(),
            start.elapsed()
        );
        Ok(output)
    }

    fn draw_line(
        &self,
        doc: &mut Document,
        registry: &mut FontRegistry,
        canvas: &mut PageCanvas,
        line: &LayoutLine,
    ) {
        let y = canvas.height() - line.baseline;
        for fragment in &line.fragments {
            if fragment.text.is_empty() {
                continue;
            }
            let resolved =
                self.fonts
                    .select(fragment.script, fragment.format.bold, fragment.format.italic);
            let face = &resolved.face;
            let name = registry.register(doc, face).to_string();

            let glyphs = face.shape(&fragment.text);
            registry.record_usage(face, &fragment.text, &glyphs);
            let advances: Vec<u16> = glyphs.iter().map(|g| face.glyph_advance(g.glyph_id)).collect();

            canvas.draw_glyphs(&GlyphRun {
                font: &name,
                size: fragment.format.size,
                units_per_em: face.units_per_em(),
                x: fragment.x,
                y,
                glyphs: &glyphs,
                advances: &advances,
                synthetic_bold: resolved.synthetic_bold,
                synthetic_italic: resolved.synthetic_italic,
            });
        }
    }

    fn info_dictionary(&self, metadata: &Metadata) -> Dictionary {
        let mut info = dictionary! {
            "Producer" => text_string(&self.options.producer),
        };
        let entries = [
            ("Title", &metadata.title),
            ("Subject", &metadata.subject),
            ("Author", &metadata.creator),
            ("Keywords", &metadata.keywords),
        ];
        for (key, value) in entries {
            if let Some(value) = value.as_deref().filter(|v| !v.trim().is_empty()) {
                info.set(key, text_string(value));
            }
        }
        if let Some(created) = &metadata.created {
            info.set("CreationDate", Object::string_literal(format_pdf_date(created)));
        }
        if let Some(modified) = metadata.modified.as_ref().or(metadata.created.as_ref()) {
            info.set("ModDate", Object::string_literal(format_pdf_date(modified)));
        }
        info
    }
}

/// Format a timestamp as a PDF date string (`D:YYYYMMDDHHmmSSZ`).
pub fn format_pdf_date(date: &DateTime<Utc>) -> String {
    date.format("D:%Y%m%d%H%M%SZ").to_string()
}

/// PDF text string: literal for ASCII, UTF-16BE with a byte order mark otherwise.
fn text_string(value: &str) -> Object {
    if value.is_ascii() {
        return Object::string_literal(value);
    }
    let mut bytes = vec![0xFE, 0xFF];
    bytes.extend(value.encode_utf16().flat_map(u16::to_be_bytes));
    Object::String(bytes, StringFormat::Hexadecimal)
}
