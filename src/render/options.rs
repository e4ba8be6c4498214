//! Rendering options.

/// Options for writing PDF output.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Flate-compress content streams and embedded font programs
    pub compress: bool,

    /// Value of the `Producer` entry in the document information dictionary
    pub producer: String,

    /// Natural language of the text (`Lang` in the catalog), e.g. `pa-IN`
    pub language: Option<String>,
}

impl RenderOptions {
    /// Create new render options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable stream compression.
    pub fn with_compression(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    /// Disable stream compression (readable content streams).
    pub fn uncompressed(mut self) -> Self {
        self.compress = false;
        self
    }

    /// Set the producer string.
    pub fn with_producer(mut self, producer: impl Into<String>) -> Self {
        self.producer = producer.into();
        self
    }

    /// Set the document language tag.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            compress: true,
            producer: format!("gurmukhi-pdf {}", env!("CARGO_PKG_VERSION")),
            language: None,
        }
    }
}
