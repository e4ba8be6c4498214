//! Shared helpers for integration tests: in-memory DOCX packages and test fonts.

#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::sync::Arc;

use gurmukhi_pdf::{FontFamily, FontSet, TrueTypeFace, UniformFace};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

const DOCUMENT_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml";

/// Builds a minimal WordprocessingML package in memory.
#[derive(Debug, Clone)]
pub struct DocxBuilder {
    body: String,
    styles: Option<String>,
    core: Option<String>,
    content_type: String,
    include_document: bool,
}

impl Default for DocxBuilder {
    fn default() -> Self {
        Self {
            body: String::new(),
            styles: None,
            core: None,
            content_type: DOCUMENT_CONTENT_TYPE.to_string(),
            include_document: true,
        }
    }
}

impl DocxBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append raw body XML (`<w:p>`, `<w:tbl>`, `<w:sectPr>`, ...).
    pub fn raw(mut self, xml: &str) -> Self {
        self.body.push_str(xml);
        self
    }

    /// Append a paragraph with one plain run.
    pub fn paragraph(self, text: &str) -> Self {
        let xml = format!(
            r#"<w:p><w:r><w:t xml:space="preserve">{}</w:t></w:r></w:p>"#,
            escape(text)
        );
        self.raw(&xml)
    }

    /// Append a paragraph with one run carrying the given `w:rPr` content.
    pub fn styled_paragraph(self, run_properties: &str, text: &str) -> Self {
        let xml = format!(
            r#"<w:p><w:r><w:rPr>{}</w:rPr><w:t xml:space="preserve">{}</w:t></w:r></w:p>"#,
            run_properties,
            escape(text)
        );
        self.raw(&xml)
    }

    /// Set the `word/styles.xml` body (content of `<w:styles>`).
    pub fn styles(mut self, xml: &str) -> Self {
        self.styles = Some(format!(r#"<w:styles xmlns:w="{}">{}</w:styles>"#, W_NS, xml));
        self
    }

    /// Set core properties.
    pub fn core(mut self, title: &str, creator: &str, created: &str) -> Self {
        self.core = Some(format!(
            r#"<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"><dc:title>{}</dc:title><dc:creator>{}</dc:creator><dcterms:created xsi:type="dcterms:W3CDTF">{}</dcterms:created></cp:coreProperties>"#,
            escape(title),
            escape(creator),
            created
        ));
        self
    }

    /// Override the main part content type (e.g. to fake a spreadsheet).
    pub fn content_type(mut self, content_type: &str) -> Self {
        self.content_type = content_type.to_string();
        self
    }

    /// Leave out `word/document.xml`.
    pub fn without_document(mut self) -> Self {
        self.include_document = false;
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        let mut add = |name: &str, content: &str| {
            writer.start_file(name, options).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        };

        add(
            "[Content_Types].xml",
            &format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="{}"/></Types>"#,
                self.content_type
            ),
        );
        add(
            "_rels/.rels",
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/></Relationships>"#,
        );
        add(
            "word/_rels/document.xml.rels",
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#,
        );
        if self.include_document {
            add(
                "word/document.xml",
                &format!(
                    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="{}"><w:body>{}</w:body></w:document>"#,
                    W_NS, self.body
                ),
            );
        }
        if let Some(styles) = &self.styles {
            add("word/styles.xml", styles);
        }
        if let Some(core) = &self.core {
            add("docProps/core.xml", core);
        }

        writer.finish().unwrap().into_inner()
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Gurmukhi face: the Gurmukhi block plus ASCII space, digits and punctuation.
pub fn gurmukhi_face() -> UniformFace {
    UniformFace::new("Test Gurmukhi").with_coverage(vec![
        '\u{0A00}'..='\u{0A7F}',
        ' '..='@',
        '\u{0964}'..='\u{0965}',
    ])
}

/// Latin face: printable ASCII and Latin-1.
pub fn latin_face() -> UniformFace {
    UniformFace::new("Test Latin").with_coverage(vec![' '..='~', '\u{00A0}'..='\u{00FF}'])
}

/// Regular-only families for both scripts.
pub fn test_fonts() -> Arc<FontSet> {
    Arc::new(FontSet::new(
        FontFamily::new(Arc::new(gurmukhi_face())),
        FontFamily::new(Arc::new(latin_face())),
    ))
}

/// Path of the generated TrueType fixture.
pub fn fixture_font_path() -> std::path::PathBuf {
    std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/FixtureSans-Regular.ttf")
}

/// Both families backed by separately loaded copies of the TrueType fixture.
pub fn truetype_fonts() -> Arc<FontSet> {
    let load = || Arc::new(TrueTypeFace::from_file(fixture_font_path()).unwrap());
    Arc::new(FontSet::new(FontFamily::new(load()), FontFamily::new(load())))
}
