//! Document model types.
//!
//! This module defines the typed intermediate representation that flows
//! from the DOCX parser through the normalizer into the layout engine.
//! It is populated eagerly during parsing and never mutated afterwards;
//! later stages build new values instead.

mod document;
mod paragraph;

pub use document::{Document, Metadata, PageSetup};
pub use paragraph::{
    contains_gurmukhi, is_gurmukhi, Alignment, FormattingDescriptor, LineSpacing, Paragraph,
    ParagraphStyle, Run, Script,
};
