//! Run normalization: cleanup, script tagging and glyph validation.
//!
//! The normalizer turns parsed runs into runs the layout engine can trust:
//! every run carries exactly one script, names the family of the face that
//! will draw it, and contains only characters that face can render.

use crate::error::{Error, Result};
use crate::font::{FontSet, ZERO_WIDTH_JOINERS};
use crate::model::{Document, Paragraph, Run, Script};

/// Spaces substituted for a tab character.
pub const TAB_WIDTH: usize = 4;

/// Format characters removed from run text.
const STRIPPED_CHARS: [char; 4] = ['\u{FEFF}', '\u{200B}', '\u{2060}', '\u{00AD}'];

/// Normalizes runs against a font set.
#[derive(Debug, Clone, Copy)]
pub struct Normalizer<'a> {
    fonts: &'a FontSet,
}

impl<'a> Normalizer<'a> {
    /// Create a normalizer for the given fonts.
    pub fn new(fonts: &'a FontSet) -> Self {
        Self { fonts }
    }

    /// Normalize every paragraph of a document.
    ///
    /// Fails with [`Error::UnsupportedGlyph`] on the first character the
    /// selected face cannot render. Normalizing twice yields the same result.
    pub fn normalize(&self, document: &Document) -> Result<Document> {
        let paragraphs = document
            .paragraphs
            .iter()
            .enumerate()
            .map(|(index, paragraph)| self.normalize_paragraph(index, paragraph))
            .collect::<Result<Vec<_>>>()?;

        let normalized = Document {
            metadata: document.metadata.clone(),
            page_setup: document.page_setup,
            paragraphs,
        };

        log::debug!(
            "Normalized {} runs into {} runs",
            document.run_count(),
            normalized.run_count()
        );
        Ok(normalized)
    }

    fn normalize_paragraph(&self, index: usize, paragraph: &Paragraph) -> Result<Paragraph> {
        let mut runs: Vec<Run> = Vec::with_capacity(paragraph.runs.len());

        for run in &paragraph.runs {
            let text = clean_text(&run.text);
            if text.is_empty() {
                continue;
            }

            for (script, piece) in self.split_by_script(&text, run) {
                let mut format = run.format.clone();
                format.font = self
                    .fonts
                    .select(script, format.bold, format.italic)
                    .family()
                    .to_string();
                push_merged(&mut runs, Run { text: piece, format, script });
            }
        }

        self.validate(index, &runs)?;

        Ok(Paragraph {
            runs,
            style: paragraph.style.clone(),
        })
    }

    /// Split text into maximal pieces of a single script.
    fn split_by_script(&self, text: &str, run: &Run) -> Vec<(Script, String)> {
        let (bold, italic) = (run.format.bold, run.format.italic);
        let covers = |script: Script, ch: char| self.fonts.select(script, bold, italic).face.has_glyph(ch);

        let mut current = text.chars().find_map(Script::of).unwrap_or(run.script);
        let mut pieces: Vec<(Script, String)> = Vec::new();

        for ch in text.chars() {
            let script = match Script::of(ch) {
                Some(strong) => {
                    current = strong;
                    strong
                }
                None if !needs_glyph(ch) || covers(current, ch) => current,
                None if covers(current.other(), ch) => current.other(),
                None => current,
            };

            match pieces.last_mut() {
                Some((last, piece)) if *last == script => piece.push(ch),
                _ => pieces.push((script, ch.to_string())),
            }
        }

        pieces
    }

    fn validate(&self, paragraph: usize, runs: &[Run]) -> Result<()> {
        for (index, run) in runs.iter().enumerate() {
            let resolved = self.fonts.select(run.script, run.format.bold, run.format.italic);
            let missing = run
                .text
                .chars()
                .find(|ch| needs_glyph(*ch) && !resolved.face.has_glyph(*ch));

            if let Some(ch) = missing {
                return Err(Error::UnsupportedGlyph {
                    ch,
                    paragraph,
                    run: index,
                    font: resolved.family().to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Remove control artifacts and expand tabs.
///
/// Line breaks (`\n`) and page breaks (`\u{000C}`) survive as structure.
pub fn clean_text(text: &str) -> String {
    let mut cleaned = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\t' => cleaned.extend(std::iter::repeat(' ').take(TAB_WIDTH)),
            '\n' | '\u{000C}' => cleaned.push(ch),
            _ if ch.is_control() || STRIPPED_CHARS.contains(&ch) => {}
            _ => cleaned.push(ch),
        }
    }
    cleaned
}

/// Whether a character must be present in the face's glyph table.
pub fn needs_glyph(ch: char) -> bool {
    !matches!(ch, '\n' | '\u{000C}') && !ZERO_WIDTH_JOINERS.contains(&ch)
}

fn push_merged(runs: &mut Vec<Run>, run: Run) {
    match runs.last_mut() {
        Some(last) if last.same_style(&run) => last.text.push_str(&run.text),
        _ => runs.push(run),
    }
}
