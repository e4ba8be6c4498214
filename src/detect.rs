//! DOCX package detection and validation.

use crate::error::{Error, Result};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Package container kind, from magic bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageKind {
    /// ZIP container (OOXML, ODF, EPUB, ...)
    Zip,
    /// Legacy OLE2 compound file (`.doc`)
    Ole2,
}

/// Word document flavour, from the package content types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocxFlavor {
    /// Regular document (`.docx`)
    Document,
    /// Macro-enabled document (`.docm`)
    MacroEnabled,
    /// Template (`.dotx`, `.dotm`)
    Template,
}

impl std::fmt::Display for DocxFlavor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocxFlavor::Document => write!(f, "Word document"),
            DocxFlavor::MacroEnabled => write!(f, "macro-enabled Word document"),
            DocxFlavor::Template => write!(f, "Word template"),
        }
    }
}

/// ZIP local file header magic: PK\x03\x04
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
/// OLE2 compound document magic
const OLE2_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

const CT_DOCUMENT: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml";
const CT_MACRO: &str = "application/vnd.ms-word.document.macroEnabled.main+xml";
const CT_TEMPLATE: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.template.main+xml";
const CT_MACRO_TEMPLATE: &str = "application/vnd.ms-word.template.macroEnabledTemplate.main+xml";

/// Detect the container kind from the first bytes of a file.
///
/// # Returns
/// * `Ok(PackageKind::Zip)` for a ZIP container
/// * `Err(Error::UnsupportedFormat)` for anything else, including legacy `.doc`
pub fn detect_package(data: &[u8]) -> Result<PackageKind> {
    if data.starts_with(ZIP_MAGIC) {
        return Ok(PackageKind::Zip);
    }

    if data.starts_with(OLE2_MAGIC) {
        return Err(Error::UnsupportedFormat(
            "legacy binary Word document (.doc); save it as .docx".to_string(),
        ));
    }

    if data.starts_with(b"%PDF-") {
        return Err(Error::UnsupportedFormat(
            "input is already a PDF document".to_string(),
        ));
    }

    Err(Error::UnsupportedFormat(
        "not a .docx package (missing ZIP signature)".to_string(),
    ))
}

/// Detect the container kind of a file on disk.
pub fn detect_package_from_path<P: AsRef<Path>>(path: P) -> Result<PackageKind> {
    let mut header = Vec::with_capacity(8);
    File::open(path)?.take(8).read_to_end(&mut header)?;
    detect_package(&header)
}

/// Determine the Word flavour declared by `[Content_Types].xml`.
///
/// Returns `None` when the package declares no WordprocessingML main part,
/// e.g. spreadsheets, presentations or EPUB files.
pub fn docx_flavor(content_types: &str) -> Option<DocxFlavor> {
    if content_types.contains(CT_DOCUMENT) {
        Some(DocxFlavor::Document)
    } else if content_types.contains(CT_MACRO) {
        Some(DocxFlavor::MacroEnabled)
    } else if content_types.contains(CT_TEMPLATE) || content_types.contains(CT_MACRO_TEMPLATE) {
        Some(DocxFlavor::Template)
    } else {
        None
    }
}

/// Check if bytes start like a ZIP package.
pub fn is_zip_bytes(data: &[u8]) -> bool {
    detect_package(data).is_ok()
}
