//! Conversion orchestrator: DOCX bytes in, PDF bytes out.
//!
//! The [`Converter`] runs the pipeline stages in order (parse, normalize,
//! lay out, render) and hands any stage error back unchanged. It holds the
//! shared, read-only [`FontSet`] and can be used from several threads.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use gurmukhi_pdf::convert::Converter;
//! use gurmukhi_pdf::font::{FontFamily, FontSet, TrueTypeFace};
//!
//! fn main() -> gurmukhi_pdf::Result<()> {
//!     let gurmukhi = TrueTypeFace::from_file("NotoSansGurmukhi-Regular.ttf")?;
//!     let latin = TrueTypeFace::from_file("NotoSerif-Regular.ttf")?;
//!     let fonts = FontSet::new(
//!         FontFamily::new(Arc::new(gurmukhi)),
//!         FontFamily::new(Arc::new(latin)),
//!     );
//!
//!     let converter = Converter::new(Arc::new(fonts));
//!     let pdf = converter.convert(&std::fs::read("input.docx")?)?;
//!     std::fs::write("output.pdf", pdf)?;
//!     Ok(())
//! }
//! ```

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::font::FontSet;
use crate::layout::{LayoutEngine, PageGeometry};
use crate::model::Document;
use crate::normalize::Normalizer;
use crate::parser::{DocxParser, ParseOptions};
use crate::render::{PdfRenderer, RenderOptions};

/// Default upper bound on input size (16 MiB).
pub const DEFAULT_MAX_INPUT_SIZE: u64 = 16 * 1024 * 1024;

/// Options for document conversion.
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Largest accepted input, in bytes
    pub max_input_size: u64,

    /// Page geometry; `None` uses the document's page setup, then A4
    pub geometry: Option<PageGeometry>,

    /// Parsing options
    pub parse: ParseOptions,

    /// Rendering options
    pub render: RenderOptions,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            max_input_size: DEFAULT_MAX_INPUT_SIZE,
            geometry: None,
            parse: ParseOptions::default(),
            render: RenderOptions::default(),
        }
    }
}

impl ConvertOptions {
    /// Create new conversion options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the input size limit in bytes.
    pub fn with_max_input_size(mut self, bytes: u64) -> Self {
        self.max_input_size = bytes;
        self
    }

    /// Force a page geometry for every document.
    pub fn with_geometry(mut self, geometry: PageGeometry) -> Self {
        self.geometry = Some(geometry);
        self
    }

    /// Set parsing options.
    pub fn with_parse_options(mut self, options: ParseOptions) -> Self {
        self.parse = options;
        self
    }

    /// Set rendering options.
    pub fn with_render_options(mut self, options: RenderOptions) -> Self {
        self.render = options;
        self
    }
}

/// Counts collected during one conversion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionStats {
    /// Paragraphs in the document
    pub paragraphs: usize,
    /// Runs produced by the parser
    pub runs_parsed: usize,
    /// Runs after normalization (split by script, merged)
    pub runs_normalized: usize,
    /// Laid-out lines
    pub lines: usize,
    /// Pages in the output
    pub pages: usize,
    /// Size of the PDF in bytes
    pub output_bytes: usize,
}

/// PDF output together with conversion statistics.
#[derive(Debug, Clone)]
pub struct ConvertResult {
    /// The PDF document
    pub pdf: Vec<u8>,
    /// Statistics
    pub stats: ConversionStats,
}

/// Converts DOCX documents to PDF with a shared font set.
#[derive(Debug, Clone)]
pub struct Converter {
    fonts: Arc<FontSet>,
    options: ConvertOptions,
}

impl Converter {
    /// Create a converter with default options.
    pub fn new(fonts: Arc<FontSet>) -> Self {
        Self::with_options(fonts, ConvertOptions::default())
    }

    /// Create a converter with custom options.
    pub fn with_options(fonts: Arc<FontSet>, options: ConvertOptions) -> Self {
        Self { fonts, options }
    }

    /// Conversion options in use.
    pub fn options(&self) -> &ConvertOptions {
        &self.options
    }

    /// Fonts in use.
    pub fn fonts(&self) -> &FontSet {
        &self.fonts
    }

    /// Convert DOCX bytes to PDF bytes.
    pub fn convert(&self, data: &[u8]) -> Result<Vec<u8>> {
        self.convert_with_stats(data).map(|result| result.pdf)
    }

    /// Convert DOCX bytes to PDF bytes and report statistics.
    pub fn convert_with_stats(&self, data: &[u8]) -> Result<ConvertResult> {
        self.check_size(data.len() as u64)?;
        let start = Instant::now();

        let parser = DocxParser::from_bytes_with_options(data, self.options.parse.clone())?;
        let parsed = parser.parse()?;
        log::debug!("Parse finished in {:?}", start.elapsed());

        let normalized = self.normalize(&parsed)?;

        let geometry = self.geometry_for(&normalized);
        let layout = LayoutEngine::new(&self.fonts, geometry).layout(&normalized);
        log::debug!(
            "Layout finished in {:?}: {} lines on {} pages",
            start.elapsed(),
            layout.lines.len(),
            layout.page_count
        );

        let pdf = PdfRenderer::new(&self.fonts, self.options.render.clone())
            .render(&layout, &normalized.metadata)?;

        let stats = ConversionStats {
            paragraphs: normalized.paragraph_count(),
            runs_parsed: parsed.run_count(),
            runs_normalized: normalized.run_count(),
            lines: layout.lines.len(),
            pages: layout.page_count,
            output_bytes: pdf.len(),
        };
        log::debug!("Converted {} bytes into {} bytes in {:?}", data.len(), pdf.len(), start.elapsed());

        Ok(ConvertResult { pdf, stats })
    }

    /// Convert from a reader, reading at most one byte past the size limit.
    pub fn convert_reader<R: Read>(&self, reader: R) -> Result<Vec<u8>> {
        let limit = self.options.max_input_size;
        let mut data = Vec::new();
        reader.take(limit.saturating_add(1)).read_to_end(&mut data)?;
        self.convert(&data)
    }

    /// Convert a file, checking its length before reading it.
    pub fn convert_file<P: AsRef<Path>>(&self, path: P) -> Result<Vec<u8>> {
        let file = File::open(path.as_ref())?;
        self.check_size(file.metadata()?.len())?;
        self.convert_reader(file)
    }

    /// Convert independent inputs in parallel; results keep the input order.
    pub fn convert_batch<D>(&self, inputs: &[D]) -> Vec<Result<Vec<u8>>>
    where
        D: AsRef<[u8]> + Sync,
    {
        inputs
            .par_iter()
            .map(|data| self.convert(data.as_ref()))
            .collect()
    }

    /// Parse and normalize without laying out, for inspection.
    pub fn prepare(&self, data: &[u8]) -> Result<Document> {
        self.check_size(data.len() as u64)?;
        let parsed = DocxParser::from_bytes_with_options(data, self.options.parse.clone())?.parse()?;
        self.normalize(&parsed)
    }

    fn normalize(&self, document: &Document) -> Result<Document> {
        let start = Instant::now();
        let normalized = Normalizer::new(&self.fonts).normalize(document)?;
        log::debug!("Normalize finished in {:?}", start.elapsed());
        Ok(normalized)
    }

    fn geometry_for(&self, document: &Document) -> PageGeometry {
        match (&self.options.geometry, &document.page_setup) {
            (Some(geometry), _) => *geometry,
            (None, Some(setup)) => PageGeometry::from_page_setup(setup),
            (None, None) => PageGeometry::default(),
        }
    }

    fn check_size(&self, size: u64) -> Result<()> {
        let limit = self.options.max_input_size;
        if size > limit {
            log::warn!("Rejecting input of {} bytes (limit {})", size, limit);
            return Err(Error::PayloadTooLarge { size, limit });
        }
        Ok(())
    }
}
