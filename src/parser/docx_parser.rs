//! DOCX document parser using zip and quick-xml.

use std::io::{Cursor, Read};
use std::path::Path;

use chrono::{DateTime, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use zip::result::ZipError;
use zip::ZipArchive;

use crate::detect::{detect_package, docx_flavor, DocxFlavor};
use crate::error::{Error, Result};
use crate::model::{contains_gurmukhi, Document, Metadata, PageSetup, Paragraph, Run};

use super::options::ParseOptions;
use super::styles::{ParagraphProperties, RunProperties, StyleSheet};
use super::xml::{get_attr, get_twips};

const REL_OFFICE_DOCUMENT: &str = "/officeDocument";
const REL_STYLES: &str = "/styles";
const REL_CORE_PROPERTIES: &str = "/core-properties";

/// Elements whose whole subtree carries no body text.
const SKIPPED_ELEMENTS: &[&[u8]] = &[
    b"drawing",
    b"pict",
    b"object",
    b"txbxContent",
    b"AlternateContent",
    b"oMath",
    b"oMathPara",
    b"delText",
    b"instrText",
    b"del",
    b"moveFrom",
    b"rPrChange",
    b"pPrChange",
    b"sectPrChange",
    b"footnoteReference",
    b"endnoteReference",
    b"commentReference",
];

/// DOCX document parser.
///
/// All package parts needed for conversion are read up front, so parsing
/// works on owned XML text and never touches the archive again.
#[derive(Debug)]
pub struct DocxParser {
    flavor: DocxFlavor,
    main_part: String,
    document_xml: String,
    styles_xml: Option<String>,
    core_xml: Option<String>,
    options: ParseOptions,
}

impl DocxParser {
    /// Open a DOCX file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_options(path, ParseOptions::default())
    }

    /// Open a DOCX file with custom options.
    pub fn open_with_options<P: AsRef<Path>>(path: P, options: ParseOptions) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::from_bytes_with_options(&data, options)
    }

    /// Parse a DOCX package from bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::from_bytes_with_options(data, ParseOptions::default())
    }

    /// Parse a DOCX package from bytes with custom options.
    pub fn from_bytes_with_options(data: &[u8], options: ParseOptions) -> Result<Self> {
        detect_package(data)?;

        let mut archive = ZipArchive::new(Cursor::new(data))?;
        let limit = options.max_part_size;

        let content_types = read_part(&mut archive, "[Content_Types].xml", limit)?.ok_or_else(|| {
            Error::MalformedDocument("package has no [Content_Types].xml".to_string())
        })?;
        let flavor = docx_flavor(&content_types).ok_or_else(|| {
            Error::UnsupportedFormat("package contains no WordprocessingML document".to_string())
        })?;

        let package_rels = read_part(&mut archive, "_rels/.rels", limit)?;
        let main_part = match &package_rels {
            Some(rels) => find_relationship(rels, REL_OFFICE_DOCUMENT)?
                .map(|target| resolve_target("", &target)),
            None => None,
        }
        .unwrap_or_else(|| "word/document.xml".to_string());

        let document_xml = read_part(&mut archive, &main_part, limit)?.ok_or_else(|| {
            Error::MalformedDocument(format!("main document part {} is missing", main_part))
        })?;

        let (base_dir, part_rels) = match main_part.rsplit_once('/') {
            Some((dir, file)) => (dir.to_string(), format!("{}/_rels/{}.rels", dir, file)),
            None => (String::new(), format!("_rels/{}.rels", main_part)),
        };
        let styles_part = match read_part(&mut archive, &part_rels, limit)? {
            Some(rels) => find_relationship(&rels, REL_STYLES)?
                .map(|target| resolve_target(&base_dir, &target)),
            None => None,
        }
        .unwrap_or_else(|| "word/styles.xml".to_string());
        let styles_xml = read_part(&mut archive, &styles_part, limit)?;

        let core_part = match &package_rels {
            Some(rels) => find_relationship(rels, REL_CORE_PROPERTIES)?
                .map(|target| resolve_target("", &target)),
            None => None,
        }
        .unwrap_or_else(|| "docProps/core.xml".to_string());
        let core_xml = read_part(&mut archive, &core_part, limit)?;

        log::debug!(
            "Opened {} ({} bytes), main part {}, styles: {}",
            flavor,
            data.len(),
            main_part,
            styles_xml.is_some()
        );

        Ok(Self {
            flavor,
            main_part,
            document_xml,
            styles_xml,
            core_xml,
            options,
        })
    }

    /// Parse a DOCX package from a reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Self::from_reader_with_options(reader, ParseOptions::default())
    }

    /// Parse a DOCX package from a reader with custom options.
    pub fn from_reader_with_options<R: Read>(mut reader: R, options: ParseOptions) -> Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::from_bytes_with_options(&data, options)
    }

    /// Parse the document into the intermediate model.
    pub fn parse(&self) -> Result<Document> {
        let styles = match &self.styles_xml {
            Some(xml) => StyleSheet::parse(xml)?,
            None => StyleSheet::default(),
        };

        let mut walker = BodyWalker::new(&styles, &self.options);
        walker.walk(&self.document_xml)?;

        let metadata = match &self.core_xml {
            Some(xml) => parse_core_properties(xml),
            None => Metadata::default(),
        };

        let document = Document {
            metadata,
            page_setup: walker.page_setup,
            paragraphs: walker.paragraphs,
        };

        log::debug!(
            "Parsed {}: {} paragraphs, {} runs",
            self.main_part,
            document.paragraph_count(),
            document.run_count()
        );
        Ok(document)
    }

    /// Word flavour declared by the package.
    pub fn flavor(&self) -> DocxFlavor {
        self.flavor
    }

    /// Path of the main document part inside the package.
    pub fn main_part(&self) -> &str {
        &self.main_part
    }
}

/// Read a package part as UTF-8 text; `None` when the part does not exist.
fn read_part<R: Read + std::io::Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
    limit: u64,
) -> Result<Option<String>> {
    let file = match archive.by_name(name) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let mut bytes = Vec::new();
    file.take(limit.saturating_add(1))
        .read_to_end(&mut bytes)
        .map_err(|e| Error::MalformedDocument(format!("cannot read part {}: {}", name, e)))?;
    if bytes.len() as u64 > limit {
        return Err(Error::MalformedDocument(format!(
            "part {} expands beyond {} bytes",
            name, limit
        )));
    }

    let text = String::from_utf8(bytes)
        .map_err(|_| Error::MalformedDocument(format!("part {} is not valid UTF-8", name)))?;
    Ok(Some(match text.strip_prefix('\u{FEFF}') {
        Some(stripped) => stripped.to_string(),
        None => text,
    }))
}

/// Target of the first relationship whose type ends with `type_suffix`.
fn find_relationship(rels_xml: &str, type_suffix: &str) -> Result<Option<String>> {
    let mut reader = Reader::from_str(rels_xml);
    reader.trim_text(true);

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                let is_match = get_attr(&e, b"Type").is_some_and(|t| t.ends_with(type_suffix));
                let external = get_attr(&e, b"TargetMode").is_some_and(|m| m == "External");
                if is_match && !external {
                    return Ok(get_attr(&e, b"Target"));
                }
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}

/// Resolve a relationship target against the directory of its source part.
fn resolve_target(base_dir: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }

    let mut segments: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// Read `docProps/core.xml`. Damaged core properties are not fatal.
fn parse_core_properties(xml: &str) -> Metadata {
    let mut metadata = Metadata::default();
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut field: Option<Vec<u8>> = None;
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => field = Some(e.local_name().as_ref().to_vec()),
            Ok(Event::Text(e)) => {
                let Some(name) = field.as_deref() else {
                    continue;
                };
                let Ok(text) = e.unescape() else {
                    continue;
                };
                let value = text.trim().to_string();
                if value.is_empty() {
                    continue;
                }
                match name {
                    b"title" => metadata.title = Some(value),
                    b"subject" => metadata.subject = Some(value),
                    b"creator" => metadata.creator = Some(value),
                    b"keywords" => metadata.keywords = Some(value),
                    b"created" => metadata.created = parse_datetime(&value),
                    b"modified" => metadata.modified = parse_datetime(&value),
                    _ => {}
                }
            }
            Ok(Event::End(_)) => field = None,
            Ok(Event::Eof) => break,
            Err(e) => {
                log::warn!("Ignoring damaged core properties: {}", e);
                break;
            }
            _ => {}
        }
    }

    metadata
}

/// Parse a W3CDTF timestamp such as `2024-01-15T10:30:00Z`.
fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

struct ParagraphState {
    style_id: Option<String>,
    direct: ParagraphProperties,
    mark: RunProperties,
    runs: Vec<Run>,
}

struct RunState {
    style_id: Option<String>,
    direct: RunProperties,
    text: String,
}

#[derive(Default)]
struct SectionState {
    width: Option<f32>,
    height: Option<f32>,
    margins: Option<[f32; 4]>,
}

/// Streaming walk over the main document part.
struct BodyWalker<'a> {
    styles: &'a StyleSheet,
    options: &'a ParseOptions,
    paragraphs: Vec<Paragraph>,
    page_setup: Option<PageSetup>,
    paragraph: Option<ParagraphState>,
    run: Option<RunState>,
    section: Option<SectionState>,
    in_ppr: bool,
    in_rpr: bool,
    in_text: bool,
    skipped: usize,
}

impl<'a> BodyWalker<'a> {
    fn new(styles: &'a StyleSheet, options: &'a ParseOptions) -> Self {
        Self {
            styles,
            options,
            paragraphs: Vec::new(),
            page_setup: None,
            paragraph: None,
            run: None,
            section: None,
            in_ppr: false,
            in_rpr: false,
            in_text: false,
            skipped: 0,
        }
    }

    fn walk(&mut self, xml: &str) -> Result<()> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(false);

        loop {
            match reader.read_event()? {
                Event::Start(e) => {
                    if SKIPPED_ELEMENTS.contains(&e.local_name().as_ref()) {
                        reader.read_to_end(e.name())?;
                        self.skipped += 1;
                        continue;
                    }
                    self.start_element(&e, false);
                }
                Event::Empty(e) => self.start_element(&e, true),
                Event::Text(e) => {
                    if self.in_text {
                        let text = e.unescape()?;
                        if let Some(run) = self.run.as_mut() {
                            run.text.push_str(&text);
                        }
                    }
                }
                Event::CData(e) => {
                    if self.in_text {
                        if let Some(run) = self.run.as_mut() {
                            run.text.push_str(&String::from_utf8_lossy(&e));
                        }
                    }
                }
                Event::End(e) => self.end_element(e.local_name().as_ref()),
                Event::Eof => break,
                _ => {}
            }
        }

        if self.skipped > 0 {
            log::debug!("Skipped {} non-text subtrees", self.skipped);
        }
        Ok(())
    }

    fn start_element(&mut self, e: &BytesStart<'_>, is_empty: bool) {
        let name = e.local_name();
        match name.as_ref() {
            b"p" => {
                self.paragraph = Some(ParagraphState {
                    style_id: None,
                    direct: ParagraphProperties::default(),
                    mark: RunProperties::default(),
                    runs: Vec::new(),
                });
                if is_empty {
                    self.end_paragraph();
                }
            }
            b"r" if self.paragraph.is_some() && !is_empty => {
                self.run = Some(RunState {
                    style_id: None,
                    direct: RunProperties::default(),
                    text: String::new(),
                });
            }
            b"pPr" if self.paragraph.is_some() => self.in_ppr = !is_empty,
            b"rPr" => self.in_rpr = !is_empty,
            b"sectPr" if self.page_setup.is_none() && self.section.is_none() => {
                self.section = Some(SectionState::default());
                if is_empty {
                    self.end_section();
                }
            }
            b"pgSz" => {
                if let Some(section) = self.section.as_mut() {
                    section.width = get_twips(e, b"w");
                    section.height = get_twips(e, b"h");
                }
            }
            b"pgMar" => {
                if let Some(section) = self.section.as_mut() {
                    let margin = |key: &[u8]| get_twips(e, key).map(f32::abs).unwrap_or(72.0);
                    section.margins = Some([
                        margin(b"top"),
                        margin(b"bottom"),
                        margin(b"left"),
                        margin(b"right"),
                    ]);
                }
            }
            b"pStyle" if self.in_ppr => {
                if let Some(paragraph) = self.paragraph.as_mut() {
                    paragraph.style_id = get_attr(e, b"val");
                }
            }
            b"rStyle" if self.in_rpr => {
                if let Some(run) = self.run.as_mut() {
                    run.style_id = get_attr(e, b"val");
                }
            }
            b"t" if self.run.is_some() => self.in_text = !is_empty,
            _ if self.in_rpr => {
                if let Some(run) = self.run.as_mut() {
                    run.direct.apply(e);
                } else if self.in_ppr {
                    if let Some(paragraph) = self.paragraph.as_mut() {
                        paragraph.mark.apply(e);
                    }
                }
            }
            _ if self.in_ppr => {
                if let Some(paragraph) = self.paragraph.as_mut() {
                    paragraph.direct.apply(e);
                }
            }
            other => {
                if let Some(run) = self.run.as_mut() {
                    if let Some(ch) = run_content_char(other, e) {
                        run.text.push(ch);
                    }
                }
            }
        }
    }

    fn end_element(&mut self, name: &[u8]) {
        match name {
            b"t" => self.in_text = false,
            b"rPr" => self.in_rpr = false,
            b"pPr" => self.in_ppr = false,
            b"r" => self.end_run(),
            b"p" => self.end_paragraph(),
            b"sectPr" => self.end_section(),
            _ => {}
        }
    }

    fn end_run(&mut self) {
        let Some(state) = self.run.take() else {
            return;
        };
        let Some(paragraph) = self.paragraph.as_mut() else {
            return;
        };
        if state.text.is_empty() {
            return;
        }

        let (_, mut props) = self.styles.paragraph(paragraph.style_id.as_deref());
        props.merge(&self.styles.character(state.style_id.as_deref()));
        props.merge(&state.direct);

        let format = props.resolve(contains_gurmukhi(&state.text), self.options);
        paragraph.runs.push(Run::new(state.text, format));
    }

    fn end_paragraph(&mut self) {
        self.run = None;
        self.in_ppr = false;
        self.in_rpr = false;
        self.in_text = false;

        let Some(state) = self.paragraph.take() else {
            return;
        };

        let (mut props, mut mark) = self.styles.paragraph(state.style_id.as_deref());
        props.merge(&state.direct);
        mark.merge(&state.mark);

        let complex = state.runs.iter().any(|run| contains_gurmukhi(&run.text));
        let mark_size = mark
            .effective_size(complex)
            .filter(|size| *size > 0.0)
            .unwrap_or(self.options.default_size);

        self.paragraphs.push(Paragraph {
            runs: state.runs,
            style: props.resolve(mark_size),
        });
    }

    fn end_section(&mut self) {
        let Some(section) = self.section.take() else {
            return;
        };
        let (Some(width), Some(height)) = (section.width, section.height) else {
            return;
        };
        if width <= 0.0 || height <= 0.0 {
            return;
        }

        let [top, bottom, left, right] = section.margins.unwrap_or([72.0; 4]);
        self.page_setup = Some(PageSetup {
            width,
            height,
            margin_top: top,
            margin_bottom: bottom,
            margin_left: left,
            margin_right: right,
        });
    }
}

/// Character produced by a run content element other than `w:t`.
fn run_content_char(name: &[u8], e: &BytesStart<'_>) -> Option<char> {
    match name {
        b"tab" | b"ptab" => Some('\t'),
        b"br" => match get_attr(e, b"type").as_deref() {
            Some("page") => Some('\u{000C}'),
            _ => Some('\n'),
        },
        b"cr" => Some('\n'),
        b"noBreakHyphen" => Some('\u{2011}'),
        b"softHyphen" => Some('\u{00AD}'),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn walk(body: &str) -> (Vec<Paragraph>, Option<PageSetup>) {
        let xml = format!(
            r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}</w:body></w:document>"#,
            body
        );
        let styles = StyleSheet::default();
        let options = ParseOptions::default();
        let mut walker = BodyWalker::new(&styles, &options);
        walker.walk(&xml).unwrap();
        (walker.paragraphs, walker.page_setup)
    }

    #[test]
    fn test_runs_and_formatting() {
        let (paragraphs, _) = walk(
            r#"<w:p><w:pPr><w:jc w:val="center"/></w:pPr>
               <w:r><w:rPr><w:b/><w:sz w:val="28"/></w:rPr><w:t>ਪੰਜਾਬੀ</w:t></w:r>
               <w:r><w:t xml:space="preserve"> text</w:t></w:r></w:p>"#,
        );

        assert_eq!(paragraphs.len(), 1);
        let p = &paragraphs[0];
        assert_eq!(p.style.alignment, crate::model::Alignment::Center);
        assert_eq!(p.runs.len(), 2);
        assert_eq!(p.runs[0].text, "ਪੰਜਾਬੀ");
        assert!(p.runs[0].format.bold);
        assert_eq!(p.runs[0].format.size, 14.0);
        assert_eq!(p.runs[1].text, " text");
        assert!(!p.runs[1].format.bold);
        assert_eq!(p.runs[1].format.size, 12.0);
    }

    #[test]
    fn test_run_content_elements() {
        let (paragraphs, _) = walk(
            r#"<w:p><w:r><w:t>a</w:t><w:tab/><w:t>b</w:t><w:br/><w:t>c</w:t><w:br w:type="page"/><w:noBreakHyphen/></w:r></w:p>"#,
        );
        assert_eq!(paragraphs[0].runs[0].text, "a\tb\nc\u{000C}\u{2011}");
    }

    #[test]
    fn test_skips_non_text_content() {
        let (paragraphs, _) = walk(
            r#"<w:p>
                 <w:r><w:t>keep</w:t></w:r>
                 <w:del><w:r><w:delText>gone</w:delText></w:r></w:del>
                 <w:r><w:instrText>PAGE</w:instrText></w:r>
                 <w:r><w:drawing><w:p><w:r><w:t>inside</w:t></w:r></w:p></w:drawing></w:r>
               </w:p>"#,
        );
        assert_eq!(paragraphs.len(), 1);
        assert_eq!(paragraphs[0].plain_text(), "keep");
    }

    #[test]
    fn test_empty_paragraphs_and_runs() {
        let (paragraphs, _) = walk(r#"<w:p/><w:p><w:r><w:t></w:t></w:r><w:r/></w:p>"#);
        assert_eq!(paragraphs.len(), 2);
        assert!(paragraphs[0].is_empty());
        assert!(paragraphs[1].is_empty());
    }

    #[test]
    fn test_table_cells_are_linearized() {
        let (paragraphs, _) = walk(
            r#"<w:tbl><w:tr>
                 <w:tc><w:p><w:r><w:t>ਇੱਕ</w:t></w:r></w:p></w:tc>
                 <w:tc><w:p><w:r><w:t>ਦੋ</w:t></w:r></w:p></w:tc>
               </w:tr></w:tbl>"#,
        );
        let texts: Vec<_> = paragraphs.iter().map(|p| p.plain_text()).collect();
        assert_eq!(texts, vec!["ਇੱਕ", "ਦੋ"]);
    }

    #[test]
    fn test_mark_size_and_page_setup() {
        let (paragraphs, setup) = walk(
            r#"<w:p><w:pPr><w:rPr><w:sz w:val="40"/></w:rPr></w:pPr></w:p>
               <w:sectPr><w:pgSz w:w="12240" w:h="15840"/>
                 <w:pgMar w:top="1440" w:bottom="1440" w:left="1800" w:right="1800"/></w:sectPr>"#,
        );
        assert_eq!(paragraphs[0].style.mark_size, 20.0);

        let setup = setup.unwrap();
        assert_eq!(setup.width, 612.0);
        assert_eq!(setup.height, 792.0);
        assert_eq!(setup.margin_left, 90.0);
        assert_eq!(setup.margin_top, 72.0);
    }

    #[test]
    fn test_tab_stops_are_not_text() {
        let (paragraphs, _) = walk(
            r#"<w:p><w:pPr><w:tabs><w:tab w:val="left" w:pos="720"/></w:tabs></w:pPr><w:r><w:t>x</w:t></w:r></w:p>"#,
        );
        assert_eq!(paragraphs[0].plain_text(), "x");
    }

    #[test]
    fn test_resolve_target() {
        assert_eq!(resolve_target("", "word/document.xml"), "word/document.xml");
        assert_eq!(resolve_target("", "/word/document.xml"), "word/document.xml");
        assert_eq!(resolve_target("word", "styles.xml"), "word/styles.xml");
        assert_eq!(resolve_target("word/sub", "../styles.xml"), "word/styles.xml");
    }

    #[test]
    fn test_find_relationship() {
        let rels = r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
            <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/>
            <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document2.xml"/>
        </Relationships>"#;
        assert_eq!(
            find_relationship(rels, REL_OFFICE_DOCUMENT).unwrap().as_deref(),
            Some("word/document2.xml")
        );
        assert_eq!(
            find_relationship(rels, REL_CORE_PROPERTIES).unwrap().as_deref(),
            Some("docProps/core.xml")
        );
        assert_eq!(find_relationship(rels, REL_STYLES).unwrap(), None);
    }

    #[test]
    fn test_core_properties() {
        let xml = r#"<cp:coreProperties xmlns:cp="x" xmlns:dc="y" xmlns:dcterms="z">
            <dc:title>ਪੰਜਾਬੀ ਲੇਖ</dc:title>
            <dc:creator>Author</dc:creator>
            <dcterms:created>2024-01-15T10:30:00Z</dcterms:created>
        </cp:coreProperties>"#;
        let metadata = parse_core_properties(xml);
        assert_eq!(metadata.title.as_deref(), Some("ਪੰਜਾਬੀ ਲੇਖ"));
        assert_eq!(metadata.creator.as_deref(), Some("Author"));
        assert_eq!(metadata.created.unwrap().to_rfc3339(), "2024-01-15T10:30:00+00:00");
        assert!(metadata.modified.is_none());
    }
}
