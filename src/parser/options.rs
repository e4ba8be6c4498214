//! Parsing options and configuration.

/// Options for parsing DOCX documents.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Font family used when neither styles nor runs name one
    pub default_font: String,

    /// Font size in points used when neither styles nor runs set one
    pub default_size: f32,

    /// Largest accepted decompressed size of a single package part, in bytes
    pub max_part_size: u64,
}

impl ParseOptions {
    /// Create new parse options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the fallback font family.
    pub fn with_default_font(mut self, font: impl Into<String>) -> Self {
        self.default_font = font.into();
        self
    }

    /// Set the fallback font size in points.
    pub fn with_default_size(mut self, size: f32) -> Self {
        self.default_size = size;
        self
    }

    /// Set the decompressed size limit per package part.
    pub fn with_max_part_size(mut self, bytes: u64) -> Self {
        self.max_part_size = bytes;
        self
    }
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            default_font: "Times New Roman".to_string(),
            default_size: 12.0,
            max_part_size: 256 * 1024 * 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ParseOptions::default();
        assert_eq!(options.default_font, "Times New Roman");
        assert_eq!(options.default_size, 12.0);
    }

    #[test]
    fn test_builder() {
        let options = ParseOptions::new()
            .with_default_font("Raavi")
            .with_default_size(14.0)
            .with_max_part_size(1024);
        assert_eq!(options.default_font, "Raavi");
        assert_eq!(options.default_size, 14.0);
        assert_eq!(options.max_part_size, 1024);
    }
}
