//! # gurmukhi-pdf
//!
//! Convert Word (`.docx`) documents containing Gurmukhi (Punjabi) text to PDF.
//!
//! The conversion is a synchronous pipeline of four stages, sequenced by
//! [`Converter`]:
//!
//! 1. [`parser`]: reads the WordprocessingML package into a [`Document`]
//!    of paragraphs and formatted runs.
//! 2. [`normalize`]: cleans run text, splits runs by script, resolves fonts
//!    and verifies glyph coverage.
//! 3. [`layout`]: breaks lines, applies alignment and spacing, paginates.
//! 4. [`render`]: shapes text and writes PDF pages with embedded fonts.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use gurmukhi_pdf::{Converter, FontFamily, FontSet, TrueTypeFace};
//!
//! fn main() -> gurmukhi_pdf::Result<()> {
//!     let fonts = FontSet::new(
//!         FontFamily::new(Arc::new(TrueTypeFace::from_file("NotoSansGurmukhi-Regular.ttf")?)),
//!         FontFamily::new(Arc::new(TrueTypeFace::from_file("NotoSerif-Regular.ttf")?)),
//!     );
//!
//!     let converter = Converter::new(Arc::new(fonts));
//!     let pdf = converter.convert_file("document.docx")?;
//!     std::fs::write("document.pdf", pdf)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Run formatting**: font, bold, italic and size survive into the PDF
//! - **Script-aware fonts**: Gurmukhi and Latin text use separate families
//! - **Complex shaping**: TrueType faces are shaped with rustybuzz
//! - **Fail-fast coverage check**: characters without a glyph are reported, never dropped
//! - **Deterministic output**: identical input produces identical bytes
//! - **Parallel batches**: independent conversions run on Rayon

pub mod convert;
pub mod detect;
pub mod error;
pub mod font;
pub mod layout;
pub mod model;
pub mod normalize;
pub mod parser;
pub mod render;

// Re-export commonly used types
pub use convert::{ConversionStats, ConvertOptions, ConvertResult, Converter};
pub use detect::{detect_package, detect_package_from_path, DocxFlavor, PackageKind};
pub use error::{Error, ErrorKind, Result};
pub use font::{
    FontFace, FontFamily, FontProgram, FontSet, OutlineFormat, TrueTypeFace, UniformFace,
};
pub use layout::{Layout, LayoutEngine, LayoutLine, PageGeometry};
pub use model::{
    Alignment, Document, FormattingDescriptor, Metadata, PageSetup, Paragraph, ParagraphStyle,
    Run, Script,
};
pub use normalize::Normalizer;
pub use parser::{DocxParser, ParseOptions};
pub use render::{PdfRenderer, RenderOptions};

use std::io::Read;
use std::path::Path;
use std::sync::Arc;

/// Parse a DOCX file into the document model.
///
/// # Example
///
/// ```no_run
/// use gurmukhi_pdf::parse_file;
///
/// let doc = parse_file("document.docx").unwrap();
/// println!("Paragraphs: {}", doc.paragraph_count());
/// ```
pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Document> {
    let parser = DocxParser::open(path)?;
    parser.parse()
}

/// Parse a DOCX file with custom options.
pub fn parse_file_with_options<P: AsRef<Path>>(path: P, options: ParseOptions) -> Result<Document> {
    let parser = DocxParser::open_with_options(path, options)?;
    parser.parse()
}

/// Parse a DOCX package from bytes.
pub fn parse_bytes(data: &[u8]) -> Result<Document> {
    let parser = DocxParser::from_bytes(data)?;
    parser.parse()
}

/// Parse a DOCX package from a reader.
pub fn parse_reader<R: Read>(reader: R) -> Result<Document> {
    let parser = DocxParser::from_reader(reader)?;
    parser.parse()
}

/// Convert DOCX bytes to PDF bytes with default options.
///
/// Builds a one-off [`Converter`]; keep a converter around when converting
/// many documents with the same fonts.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use gurmukhi_pdf::{convert, FontFamily, FontSet, UniformFace};
///
/// let fonts = Arc::new(FontSet::new(
///     FontFamily::new(Arc::new(UniformFace::new("Gurmukhi"))),
///     FontFamily::new(Arc::new(UniformFace::new("Latin"))),
/// ));
/// let data = std::fs::read("document.docx").unwrap();
/// let pdf = convert(fonts, &data).unwrap();
/// ```
pub fn convert(fonts: Arc<FontSet>, data: &[u8]) -> Result<Vec<u8>> {
    Converter::new(fonts).convert(data)
}

/// Convert a DOCX file to PDF bytes with default options.
pub fn convert_file<P: AsRef<Path>>(fonts: Arc<FontSet>, path: P) -> Result<Vec<u8>> {
    Converter::new(fonts).convert_file(path)
}
