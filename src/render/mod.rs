//! PDF rendering of laid-out documents.
//!
//! The renderer walks a [`Layout`](crate::layout::Layout) page by page,
//! shapes every fragment with its resolved font face and writes glyph
//! drawing operations into a short-lived [`PageCanvas`]. Fonts are
//! registered once per face and written as Type0/CIDFontType2 fonts after
//! the last page, when the set of used glyphs is known.

mod canvas;
mod fonts;
mod options;
mod pdf_renderer;

pub use canvas::{GlyphRun, PageCanvas};
pub use fonts::{FontRegistry, FontResources};
pub use options::RenderOptions;
pub use pdf_renderer::{format_pdf_date, PdfRenderer};

use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::{Dictionary, Stream};

use crate::error::{Error, Result};

/// Build a stream object, Flate-compressed when requested.
pub(crate) fn make_stream(mut dict: Dictionary, data: Vec<u8>, compress: bool) -> Result<Stream> {
    if !compress {
        return Ok(Stream::new(dict, data));
    }

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(&data)
        .map_err(|e| Error::Render(format!("cannot compress stream: {}", e)))?;
    let compressed = encoder
        .finish()
        .map_err(|e| Error::Render(format!("cannot compress stream: {}", e)))?;

    dict.set("Filter", "FlateDecode");
    // lopdf must not compress it a second time
    let mut stream = Stream::new(dict, compressed);
    stream.allows_compression = false;
    Ok(stream)
}
