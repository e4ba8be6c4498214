//! Word segmentation across run boundaries.

use std::sync::OnceLock;

use regex::Regex;

use crate::model::Paragraph;

/// Spaces that glue words together instead of separating them.
const NO_BREAK_SPACES: [char; 3] = ['\u{00A0}', '\u{2007}', '\u{202F}'];

/// A word (with its trailing spaces) or whitespace run; break opportunity after it.
fn token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?:[^\s]|[\x{00A0}\x{2007}\x{202F}])+[\s&&[^\x{00A0}\x{2007}\x{202F}]]*|[\s&&[^\x{00A0}\x{2007}\x{202F}]]+",
        )
        .unwrap()
    })
}

/// Check if a character is a line-break opportunity.
pub fn is_break_space(ch: char) -> bool {
    ch.is_whitespace() && !NO_BREAK_SPACES.contains(&ch)
}

/// Part of a word that comes from a single run.
#[derive(Debug, Clone, PartialEq)]
pub struct Piece {
    /// Index of the source run in the paragraph
    pub run: usize,
    /// Text, trailing spaces included
    pub text: String,
}

/// Paragraph content as layout sees it.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// Unbreakable unit, possibly spanning runs
    Word(Vec<Piece>),
    /// Forced line break (`\n`)
    LineBreak,
    /// Forced page break (`\u{000C}`)
    PageBreak,
}

/// Split a paragraph into words and breaks.
///
/// A word continues into the next run when neither side of the run
/// boundary is whitespace; spaces opening a run belong to the previous word.
pub fn segment_paragraph(paragraph: &Paragraph) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut open = false;

    for (index, run) in paragraph.runs.iter().enumerate() {
        for chunk in run.text.split_inclusive(|c: char| c == '\n' || c == '\u{000C}') {
            let (body, brk) = match chunk.chars().last() {
                Some('\n') => (&chunk[..chunk.len() - 1], Some(Segment::LineBreak)),
                Some('\u{000C}') => (&chunk[..chunk.len() - 1], Some(Segment::PageBreak)),
                _ => (chunk, None),
            };

            for token in token_regex().find_iter(body) {
                let text = token.as_str();
                let piece = Piece {
                    run: index,
                    text: text.to_string(),
                };

                // leading spaces of a run trail the word before it
                let spaces_only = text.chars().all(is_break_space);
                match segments.last_mut() {
                    Some(Segment::Word(pieces)) if open || spaces_only => pieces.push(piece),
                    _ => segments.push(Segment::Word(vec![piece])),
                }
                open = !text.ends_with(is_break_space);
            }

            if let Some(brk) = brk {
                segments.push(brk);
                open = false;
            }
        }
    }

    segments
}
