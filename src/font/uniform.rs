//! Metrics-only face with a fixed advance for every glyph.

use super::{FontFace, VerticalMetrics};
use std::ops::RangeInclusive;

/// A face without outlines: every covered BMP character maps to a glyph id
/// equal to its code point and advances by the same amount.
///
/// Useful for dry runs, benchmarks and tests where layout must be
/// predictable. PDFs rendered with it reference the font unembedded.
#[derive(Debug, Clone)]
pub struct UniformFace {
    family: String,
    coverage: Vec<RangeInclusive<char>>,
    excluded: Vec<char>,
    advance: u16,
    units_per_em: u16,
    metrics: VerticalMetrics,
}

impl UniformFace {
    /// Create a face covering every printable BMP character.
    pub fn new(family: impl Into<String>) -> Self {
        Self {
            family: family.into(),
            coverage: vec![' '..='\u{FFFF}'],
            excluded: Vec::new(),
            advance: 500,
            units_per_em: 1000,
            metrics: VerticalMetrics {
                ascender: 800,
                descender: -200,
                line_gap: 0,
                bbox: [0, -200, 1000, 800],
            },
        }
    }

    /// Restrict coverage to the given character ranges.
    pub fn with_coverage(mut self, ranges: Vec<RangeInclusive<char>>) -> Self {
        self.coverage = ranges;
        self
    }

    /// Remove a single character from the coverage.
    pub fn excluding(mut self, ch: char) -> Self {
        self.excluded.push(ch);
        self
    }

    /// Set the advance of every glyph, in font units.
    pub fn with_advance(mut self, advance: u16) -> Self {
        self.advance = advance;
        self
    }

    /// Set units per em.
    pub fn with_units_per_em(mut self, units_per_em: u16) -> Self {
        self.units_per_em = units_per_em.max(1);
        self
    }

    /// Set vertical metrics.
    pub fn with_metrics(mut self, metrics: VerticalMetrics) -> Self {
        self.metrics = metrics;
        self
    }
}

impl FontFace for UniformFace {
    fn family(&self) -> &str {
        &self.family
    }

    fn units_per_em(&self) -> u16 {
        self.units_per_em
    }

    fn metrics(&self) -> VerticalMetrics {
        self.metrics
    }

    fn glyph_id(&self, ch: char) -> Option<u16> {
        if ch.is_control() || self.excluded.contains(&ch) {
            return None;
        }
        if !self.coverage.iter().any(|range| range.contains(&ch)) {
            return None;
        }
        u16::try_from(u32::from(ch)).ok()
    }

    fn glyph_advance(&self, _glyph_id: u16) -> u16 {
        self.advance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_coverage() {
        let face = UniformFace::new("Any");
        assert_eq!(face.glyph_id('A'), Some(0x41));
        assert_eq!(face.glyph_id('ਪ'), Some(0x0A2A));
        assert_eq!(face.glyph_id('\n'), None);
        assert_eq!(face.glyph_id('😀'), None);
    }

    #[test]
    fn test_restricted_coverage() {
        let face = UniformFace::new("Gurmukhi")
            .with_coverage(vec!['\u{0A00}'..='\u{0A7F}', ' '..=' '])
            .excluding('\u{0A74}');
        assert!(face.has_glyph('ਕ'));
        assert!(face.has_glyph(' '));
        assert!(!face.has_glyph('a'));
        assert!(!face.has_glyph('\u{0A74}'));
    }

    #[test]
    fn test_uniform_width() {
        let face = UniformFace::new("Any").with_advance(600);
        assert_eq!(face.text_width("abcd", 10.0), 24.0);
        // joiners take no space
        assert_eq!(face.text_width("ਕ\u{200D}ਖ", 10.0), 12.0);
    }
}
