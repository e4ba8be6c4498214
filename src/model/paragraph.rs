//! Paragraph and run-level types.

use serde::{Deserialize, Serialize};

/// A paragraph of text content.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Paragraph {
    /// Formatted runs, in reading order
    pub runs: Vec<Run>,

    /// Paragraph style
    pub style: ParagraphStyle,
}

impl Paragraph {
    /// Create a new empty paragraph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a paragraph with the given runs.
    pub fn with_runs(runs: Vec<Run>) -> Self {
        Self {
            runs,
            style: ParagraphStyle::default(),
        }
    }

    /// Set the alignment.
    pub fn aligned(mut self, alignment: Alignment) -> Self {
        self.style.alignment = alignment;
        self
    }

    /// Add a run.
    pub fn add_run(&mut self, run: Run) {
        self.runs.push(run);
    }

    /// Get plain text content of the paragraph.
    pub fn plain_text(&self) -> String {
        self.runs.iter().map(|run| run.text.as_str()).collect()
    }

    /// Check if the paragraph has no runs (renders as a blank line).
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }
}

/// A contiguous span of text with a single formatting descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    /// The text content
    pub text: String,

    /// Font, weight, slant and size
    pub format: FormattingDescriptor,

    /// Writing system, selects the rendering font
    pub script: Script,
}

impl Run {
    /// Create a new run.
    pub fn new(text: impl Into<String>, format: FormattingDescriptor) -> Self {
        Self {
            text: text.into(),
            format,
            script: Script::Latin,
        }
    }

    /// Set the script tag.
    pub fn with_script(mut self, script: Script) -> Self {
        self.script = script;
        self
    }

    /// Check if this run is empty.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Whether this run can be merged with `other` without a visible change.
    pub fn same_style(&self, other: &Run) -> bool {
        self.format == other.format && self.script == other.script
    }
}

/// Run formatting. Two descriptors are equal iff every field matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormattingDescriptor {
    /// Font family name
    pub font: String,

    /// Bold text
    pub bold: bool,

    /// Italic text
    pub italic: bool,

    /// Font size in points
    pub size: f32,
}

impl FormattingDescriptor {
    /// Create a regular (non-bold, upright) descriptor.
    pub fn new(font: impl Into<String>, size: f32) -> Self {
        Self {
            font: font.into(),
            bold: false,
            italic: false,
            size,
        }
    }

    /// Set the bold flag.
    pub fn bold(mut self, bold: bool) -> Self {
        self.bold = bold;
        self
    }

    /// Set the italic flag.
    pub fn italic(mut self, italic: bool) -> Self {
        self.italic = italic;
        self
    }
}

/// Writing system of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Script {
    /// Latin and every other non-Gurmukhi script
    #[default]
    Latin,
    /// Gurmukhi (U+0A00..U+0A7F)
    Gurmukhi,
}

impl Script {
    /// Strong script of a character, or `None` for neutral characters
    /// (whitespace, digits, punctuation, dandas, joiners).
    pub fn of(ch: char) -> Option<Script> {
        if is_gurmukhi(ch) {
            Some(Script::Gurmukhi)
        } else if ch.is_alphabetic() {
            Some(Script::Latin)
        } else {
            None
        }
    }

    /// The other script.
    pub fn other(self) -> Script {
        match self {
            Script::Latin => Script::Gurmukhi,
            Script::Gurmukhi => Script::Latin,
        }
    }

    /// Tag name ("latin" or "gurmukhi").
    pub fn tag(&self) -> &'static str {
        match self {
            Script::Latin => "latin",
            Script::Gurmukhi => "gurmukhi",
        }
    }
}

impl std::fmt::Display for Script {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// Check if a character is in the Gurmukhi block.
pub fn is_gurmukhi(ch: char) -> bool {
    ('\u{0A00}'..='\u{0A7F}').contains(&ch)
}

/// Check if text contains any Gurmukhi character.
pub fn contains_gurmukhi(text: &str) -> bool {
    text.chars().any(is_gurmukhi)
}

/// Paragraph styling properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParagraphStyle {
    /// Text alignment
    pub alignment: Alignment,

    /// Space before paragraph in points
    pub space_before: f32,

    /// Space after paragraph in points
    pub space_after: f32,

    /// Line spacing rule
    pub line_spacing: LineSpacing,

    /// Left indent in points
    pub indent_left: f32,

    /// Right indent in points
    pub indent_right: f32,

    /// Additional indent of the first line in points (negative = hanging)
    pub first_line_indent: f32,

    /// Start the paragraph on a new page
    pub page_break_before: bool,

    /// Font size of the paragraph mark, sets the height of a blank paragraph
    pub mark_size: f32,
}

impl Default for ParagraphStyle {
    fn default() -> Self {
        Self {
            alignment: Alignment::Left,
            space_before: 0.0,
            space_after: 0.0,
            line_spacing: LineSpacing::default(),
            indent_left: 0.0,
            indent_right: 0.0,
            first_line_indent: 0.0,
            page_break_before: false,
            mark_size: 12.0,
        }
    }
}

/// Text alignment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    /// Left alignment (default)
    #[default]
    Left,
    /// Center alignment
    Center,
    /// Right alignment
    Right,
    /// Justified alignment
    Justify,
}

impl Alignment {
    /// Parse a WordprocessingML `w:jc` value.
    pub fn from_ooxml(value: &str) -> Option<Self> {
        match value {
            "left" | "start" => Some(Alignment::Left),
            "center" => Some(Alignment::Center),
            "right" | "end" => Some(Alignment::Right),
            "both" | "distribute" | "thaiDistribute" | "lowKashida" | "mediumKashida"
            | "highKashida" => Some(Alignment::Justify),
            _ => None,
        }
    }
}

/// Line spacing rule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", content = "value", rename_all = "snake_case")]
pub enum LineSpacing {
    /// Multiple of the natural line height (1.0 = single)
    Auto(f32),
    /// Exact line height in points
    Exact(f32),
    /// Minimum line height in points
    AtLeast(f32),
}

impl Default for LineSpacing {
    fn default() -> Self {
        LineSpacing::Auto(1.0)
    }
}

impl LineSpacing {
    /// Resolve the line height for a line whose natural height is `natural`.
    pub fn apply(&self, natural: f32) -> f32 {
        match *self {
            LineSpacing::Auto(multiple) => natural * multiple,
            LineSpacing::Exact(points) => points,
            LineSpacing::AtLeast(points) => natural.max(points),
        }
    }
}
