//! Error types for gurmukhi-pdf.

use std::fmt;
use std::io;
use thiserror::Error;

/// Result type alias for gurmukhi-pdf operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur during conversion.
///
/// Every pipeline stage fails fast with one of these variants and the
/// orchestrator hands it to the caller unchanged.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading input files or fonts.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The input is not a WordprocessingML package.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// The package is damaged or a required part is missing.
    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    /// A character has no glyph in the font selected for its run.
    #[error(
        "Unsupported glyph {ch:?} ({}) in paragraph {paragraph}, run {run}: not covered by font \"{font}\"",
        codepoint(.ch)
    )]
    UnsupportedGlyph {
        /// The offending character
        ch: char,
        /// Paragraph index (0-based)
        paragraph: usize,
        /// Run index within the normalized paragraph (0-based)
        run: usize,
        /// Family name of the font that lacks the glyph
        font: String,
    },

    /// The input exceeds the configured size limit.
    #[error("Payload too large: {size} bytes exceeds the limit of {limit} bytes")]
    PayloadTooLarge {
        /// Input size in bytes (a lower bound when read from a stream)
        size: u64,
        /// Configured limit in bytes
        limit: u64,
    },

    /// Error while producing the PDF.
    #[error("Rendering error: {0}")]
    Render(String),

    /// A font file could not be loaded.
    #[error("Font error: {0}")]
    Font(String),
}

fn codepoint(ch: &char) -> String {
    format!("U+{:04X}", u32::from(*ch))
}

impl Error {
    /// Get the taxonomy entry of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Io(_) => ErrorKind::Io,
            Error::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            Error::MalformedDocument(_) => ErrorKind::MalformedDocument,
            Error::UnsupportedGlyph { .. } => ErrorKind::UnsupportedGlyph,
            Error::PayloadTooLarge { .. } => ErrorKind::PayloadTooLarge,
            Error::Render(_) => ErrorKind::Render,
            Error::Font(_) => ErrorKind::Font,
        }
    }

    /// Whether the failure is caused by the submitted content rather than the system.
    pub fn is_content_error(&self) -> bool {
        self.kind().is_content_error()
    }
}

/// Error category, used to map failures to distinct caller-facing responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// File or stream access failed
    Io,
    /// Not a `.docx` package
    UnsupportedFormat,
    /// Damaged package
    MalformedDocument,
    /// Text not representable by the registered fonts
    UnsupportedGlyph,
    /// Input over the size limit
    PayloadTooLarge,
    /// PDF generation failed
    Render,
    /// Font loading failed
    Font,
}

impl ErrorKind {
    /// Stable identifier for logs and API responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Io => "io",
            ErrorKind::UnsupportedFormat => "unsupported_format",
            ErrorKind::MalformedDocument => "malformed_document",
            ErrorKind::UnsupportedGlyph => "unsupported_glyph",
            ErrorKind::PayloadTooLarge => "payload_too_large",
            ErrorKind::Render => "render_error",
            ErrorKind::Font => "font_error",
        }
    }

    /// Whether the caller can fix this by changing the input.
    pub fn is_content_error(&self) -> bool {
        matches!(
            self,
            ErrorKind::UnsupportedFormat
                | ErrorKind::MalformedDocument
                | ErrorKind::UnsupportedGlyph
                | ErrorKind::PayloadTooLarge
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::Io(e) => Error::MalformedDocument(e.to_string()),
            zip::result::ZipError::FileNotFound => {
                Error::MalformedDocument("missing package part".to_string())
            }
            _ => Error::MalformedDocument(err.to_string()),
        }
    }
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::MalformedDocument(format!("XML error: {}", err))
    }
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        Error::Render(err.to_string())
    }
}
