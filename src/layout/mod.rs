//! Line breaking and pagination.
//!
//! The layout engine turns normalized paragraphs into positioned lines.
//! Words are measured with the shaped advances of the face that will
//! render them, filled greedily into lines, aligned, and stacked onto
//! pages top to bottom. Coordinates are points from the top-left corner
//! of the page.

mod tokenize;

pub use tokenize::{is_break_space, segment_paragraph, Piece, Segment};

use serde::{Deserialize, Serialize};

use crate::font::FontSet;
use crate::model::{
    Alignment, Document, FormattingDescriptor, PageSetup, Paragraph, ParagraphStyle, Script,
};

/// Page size and margins in points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageGeometry {
    /// Page width
    pub width: f32,
    /// Page height
    pub height: f32,
    /// Top margin
    pub margin_top: f32,
    /// Bottom margin
    pub margin_bottom: f32,
    /// Left margin
    pub margin_left: f32,
    /// Right margin
    pub margin_right: f32,
}

impl PageGeometry {
    /// ISO A4 portrait with one-inch margins.
    pub fn a4() -> Self {
        Self::with_size(595.28, 841.89)
    }

    /// US Letter portrait with one-inch margins.
    pub fn letter() -> Self {
        Self::with_size(612.0, 792.0)
    }

    fn with_size(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            margin_top: 72.0,
            margin_bottom: 72.0,
            margin_left: 72.0,
            margin_right: 72.0,
        }
    }

    /// Geometry declared by a document section.
    pub fn from_page_setup(setup: &PageSetup) -> Self {
        Self {
            width: setup.width,
            height: setup.height,
            margin_top: setup.margin_top,
            margin_bottom: setup.margin_bottom,
            margin_left: setup.margin_left,
            margin_right: setup.margin_right,
        }
    }

    /// Set all four margins.
    pub fn with_margins(mut self, margin: f32) -> Self {
        self.margin_top = margin;
        self.margin_bottom = margin;
        self.margin_left = margin;
        self.margin_right = margin;
        self
    }

    /// Width between the side margins.
    pub fn content_width(&self) -> f32 {
        (self.width - self.margin_left - self.margin_right).max(0.0)
    }

    /// Distance from the top edge to the bottom margin.
    pub fn content_bottom(&self) -> f32 {
        self.height - self.margin_bottom
    }
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self::a4()
    }
}

/// Part of a run placed on a line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    /// Text to draw
    pub text: String,
    /// Descriptor of the source run
    pub format: FormattingDescriptor,
    /// Script of the source run
    pub script: Script,
    /// Left edge, from the left edge of the page
    pub x: f32,
    /// Measured width
    pub width: f32,
}

/// One laid-out line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutLine {
    /// Index of the source paragraph
    pub paragraph: usize,
    /// Page index (0-based)
    pub page: usize,
    /// Top of the line box, from the top edge of the page
    pub top: f32,
    /// Baseline, from the top edge of the page
    pub baseline: f32,
    /// Line box height
    pub height: f32,
    /// Fragments, left to right
    pub fragments: Vec<Fragment>,
}

impl LayoutLine {
    /// Concatenated fragment text.
    pub fn text(&self) -> String {
        self.fragments.iter().map(|f| f.text.as_str()).collect()
    }

    /// Right edge of the last fragment.
    pub fn right(&self) -> f32 {
        self.fragments.last().map(|f| f.x + f.width).unwrap_or(0.0)
    }
}

/// Result of laying out a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    /// Lines in reading order
    pub lines: Vec<LayoutLine>,
    /// Number of pages (at least one)
    pub page_count: usize,
    /// Geometry used for every page
    pub geometry: PageGeometry,
}

impl Layout {
    /// Lines placed on a page.
    pub fn lines_on_page(&self, page: usize) -> impl Iterator<Item = &LayoutLine> {
        self.lines.iter().filter(move |line| line.page == page)
    }
}

/// A measured word.
struct Unit {
    pieces: Vec<MeasuredPiece>,
    width: f32,
    trailing: f32,
}

struct MeasuredPiece {
    run: usize,
    text: String,
    width: f32,
}

impl Unit {
    fn trimmed_width(&self) -> f32 {
        self.width - self.trailing
    }
}

/// Why a line ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineEnd {
    Wrap,
    Hard,
    Last,
}

/// Greedy line breaker and paginator.
#[derive(Debug, Clone, Copy)]
pub struct LayoutEngine<'a> {
    fonts: &'a FontSet,
    geometry: PageGeometry,
}

impl<'a> LayoutEngine<'a> {
    /// Create a layout engine for the given fonts and page geometry.
    pub fn new(fonts: &'a FontSet, geometry: PageGeometry) -> Self {
        Self { fonts, geometry }
    }

    /// Page geometry in use.
    pub fn geometry(&self) -> &PageGeometry {
        &self.geometry
    }

    /// Lay out a normalized document.
    pub fn layout(&self, document: &Document) -> Layout {
        let mut cursor = Cursor::new(self.geometry);
        let mut lines = Vec::new();

        for (index, paragraph) in document.paragraphs.iter().enumerate() {
            self.layout_paragraph(index, paragraph, &mut cursor, &mut lines);
        }

        let layout = Layout {
            lines,
            page_count: cursor.page + 1,
            geometry: self.geometry,
        };

        log::debug!(
            "Laid out {} paragraphs into {} lines on {} pages",
            document.paragraph_count(),
            layout.lines.len(),
            layout.page_count
        );
        layout
    }

    fn layout_paragraph(
        &self,
        index: usize,
        paragraph: &Paragraph,
        cursor: &mut Cursor,
        lines: &mut Vec<LayoutLine>,
    ) {
        let style = &paragraph.style;

        if style.page_break_before && cursor.has_content {
            cursor.new_page();
        }
        if cursor.has_content {
            cursor.y += style.space_before;
        }

        if paragraph.is_empty() {
            cursor.advance_blank(self.blank_height(style));
            cursor.y += style.space_after;
            return;
        }

        let mut line: Vec<Unit> = Vec::new();
        let mut line_width = 0.0;
        let mut first_line = true;
        let mut after_hard_break = false;

        for segment in segment_paragraph(paragraph) {
            match segment {
                Segment::Word(pieces) => {
                    let unit = self.measure(paragraph, pieces);
                    let available = self.available_width(style, first_line);

                    if !line.is_empty() && line_width + unit.trimmed_width() > available {
                        let done = std::mem::take(&mut line);
                        self.place_line(index, paragraph, done, LineEnd::Wrap, first_line, cursor, lines);
                        first_line = false;
                        line_width = 0.0;
                    }

                    if line.is_empty() && unit.trimmed_width() > self.available_width(style, first_line) {
                        log::warn!(
                            "Word wider than the line in paragraph {} ({:.1}pt), it will overflow the margin",
                            index,
                            unit.trimmed_width()
                        );
                    }

                    line_width += unit.width;
                    line.push(unit);
                    after_hard_break = false;
                }
                Segment::LineBreak => {
                    let done = std::mem::take(&mut line);
                    self.place_line(index, paragraph, done, LineEnd::Hard, first_line, cursor, lines);
                    first_line = false;
                    line_width = 0.0;
                    after_hard_break = true;
                }
                Segment::PageBreak => {
                    if !line.is_empty() {
                        let done = std::mem::take(&mut line);
                        self.place_line(index, paragraph, done, LineEnd::Hard, first_line, cursor, lines);
                        first_line = false;
                        line_width = 0.0;
                    }
                    cursor.new_page();
                    after_hard_break = false;
                }
            }
        }

        if !line.is_empty() || after_hard_break {
            self.place_line(index, paragraph, line, LineEnd::Last, first_line, cursor, lines);
        }

        cursor.y += style.space_after;
    }

    /// Width available to a line of a paragraph.
    fn available_width(&self, style: &ParagraphStyle, first_line: bool) -> f32 {
        let indent = if first_line { style.first_line_indent } else { 0.0 };
        (self.geometry.content_width() - style.indent_left - style.indent_right - indent).max(0.0)
    }

    /// Height of a line with no text, from the paragraph mark size.
    fn blank_height(&self, style: &ParagraphStyle) -> f32 {
        let face = &self.fonts.family(Script::Latin).regular;
        let natural = face.metrics().line_height(style.mark_size, face.units_per_em());
        style.line_spacing.apply(natural)
    }

    fn measure(&self, paragraph: &Paragraph, pieces: Vec<Piece>) -> Unit {
        let measured: Vec<MeasuredPiece> = pieces
            .into_iter()
            .map(|piece| {
                let width = self.text_width(paragraph, piece.run, &piece.text);
                MeasuredPiece {
                    run: piece.run,
                    text: piece.text,
                    width,
                }
            })
            .collect();

        let width = measured.iter().map(|p| p.width).sum();

        let mut trailing = 0.0;
        for piece in measured.iter().rev() {
            let trimmed = piece.text.trim_end_matches(is_break_space);
            if trimmed.is_empty() {
                trailing += piece.width;
                continue;
            }
            if trimmed.len() < piece.text.len() {
                trailing += piece.width - self.text_width(paragraph, piece.run, trimmed);
            }
            break;
        }

        Unit {
            pieces: measured,
            width,
            trailing,
        }
    }

    fn text_width(&self, paragraph: &Paragraph, run: usize, text: &str) -> f32 {
        let run = &paragraph.runs[run];
        let resolved = self.fonts.select(run.script, run.format.bold, run.format.italic);
        resolved.face.text_width(text, run.format.size)
    }

    fn line_metrics(&self, paragraph: &Paragraph, units: &[Unit]) -> (f32, f32) {
        let mut natural: f32 = 0.0;
        let mut ascent: f32 = 0.0;

        for piece in units.iter().flat_map(|u| u.pieces.iter()) {
            let run = &paragraph.runs[piece.run];
            let face = self.fonts.select(run.script, run.format.bold, run.format.italic).face;
            let metrics = face.metrics();
            natural = natural.max(metrics.line_height(run.format.size, face.units_per_em()));
            ascent = ascent.max(metrics.ascent(run.format.size, face.units_per_em()));
        }

        (natural, ascent)
    }

    #[allow(clippy::too_many_arguments)]
    fn place_line(
        &self,
        index: usize,
        paragraph: &Paragraph,
        mut units: Vec<Unit>,
        end: LineEnd,
        first_line: bool,
        cursor: &mut Cursor,
        lines: &mut Vec<LayoutLine>,
    ) {
        let style = &paragraph.style;

        if units.is_empty() {
            cursor.advance_blank(self.blank_height(style));
            return;
        }

        // trailing spaces at the end of a line are not drawn
        if let Some(last) = units.last_mut() {
            self.trim_trailing(paragraph, last);
        }

        let (natural, ascent) = self.line_metrics(paragraph, &units);
        let height = style.line_spacing.apply(natural);
        let baseline_offset = if natural > 0.0 {
            ascent * (height / natural).min(1.0)
        } else {
            0.0
        };

        let top = cursor.place(height);
        let indent = if first_line { style.first_line_indent } else { 0.0 };
        let origin = self.geometry.margin_left + style.indent_left + indent;
        let available = self.available_width(style, first_line);
        let fragments = self.position(paragraph, &units, origin, available, end);

        lines.push(LayoutLine {
            paragraph: index,
            page: cursor.page,
            top,
            baseline: top + baseline_offset,
            height,
            fragments,
        });
    }

    fn trim_trailing(&self, paragraph: &Paragraph, unit: &mut Unit) {
        loop {
            let count = unit.pieces.len();
            let Some(piece) = unit.pieces.last_mut() else {
                break;
            };
            let trimmed_len = piece.text.trim_end_matches(is_break_space).len();
            if trimmed_len == piece.text.len() {
                break;
            }
            if trimmed_len == 0 && count > 1 {
                unit.pieces.pop();
                continue;
            }
            piece.text.truncate(trimmed_len);
            piece.width = self.text_width(paragraph, piece.run, &piece.text);
            break;
        }
        unit.width = unit.pieces.iter().map(|p| p.width).sum();
        unit.trailing = 0.0;
    }

    /// Horizontal placement of the units of one line.
    fn position(
        &self,
        paragraph: &Paragraph,
        units: &[Unit],
        origin: f32,
        available: f32,
        end: LineEnd,
    ) -> Vec<Fragment> {
        let natural: f32 = units.iter().map(|u| u.width).sum();
        let slack = (available - natural).max(0.0);

        // inter-word gaps are the trailing spaces of every unit but the last
        let gaps: Vec<f32> = units[..units.len() - 1].iter().map(|u| u.trailing).collect();
        let justify = paragraph.style.alignment == Alignment::Justify
            && end == LineEnd::Wrap
            && !gaps.is_empty();

        let start = match paragraph.style.alignment {
            Alignment::Center => origin + slack / 2.0,
            Alignment::Right => origin + slack,
            Alignment::Left | Alignment::Justify => origin,
        };

        let mut fragments: Vec<Fragment> = Vec::new();
        let mut x = start;

        if justify {
            let total_gap: f32 = gaps.iter().sum();
            for (i, unit) in units.iter().enumerate() {
                for piece in &unit.pieces {
                    fragments.push(self.fragment(paragraph, piece, x));
                    x += piece.width;
                }
                if let Some(gap) = gaps.get(i) {
                    x += if total_gap > 0.0 {
                        slack * gap / total_gap
                    } else {
                        slack / gaps.len() as f32
                    };
                }
            }
            return fragments;
        }

        for piece in units.iter().flat_map(|u| u.pieces.iter()) {
            match fragments.last_mut() {
                Some(last) if self.same_run(paragraph, last, piece.run) => {
                    last.text.push_str(&piece.text);
                    last.width += piece.width;
                }
                _ => fragments.push(self.fragment(paragraph, piece, x)),
            }
            x += piece.width;
        }
        fragments
    }

    fn same_run(&self, paragraph: &Paragraph, fragment: &Fragment, run: usize) -> bool {
        let run = &paragraph.runs[run];
        fragment.format == run.format && fragment.script == run.script
    }

    fn fragment(&self, paragraph: &Paragraph, piece: &MeasuredPiece, x: f32) -> Fragment {
        let run = &paragraph.runs[piece.run];
        Fragment {
            text: piece.text.clone(),
            format: run.format.clone(),
            script: run.script,
            x,
            width: piece.width,
        }
    }
}

/// Vertical position while stacking lines.
struct Cursor {
    geometry: PageGeometry,
    page: usize,
    y: f32,
    has_content: bool,
}

impl Cursor {
    fn new(geometry: PageGeometry) -> Self {
        Self {
            geometry,
            page: 0,
            y: geometry.margin_top,
            has_content: false,
        }
    }

    fn new_page(&mut self) {
        self.page += 1;
        self.y = self.geometry.margin_top;
        self.has_content = false;
    }

    /// Reserve a line box, moving to the next page when it would cross the bottom margin.
    fn place(&mut self, height: f32) -> f32 {
        if self.has_content && self.y + height > self.geometry.content_bottom() {
            self.new_page();
        }
        let top = self.y;
        self.y += height;
        self.has_content = true;
        top
    }

    fn advance_blank(&mut self, height: f32) {
        self.place(height);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::{FontFamily, UniformFace};
    use crate::model::Run;
    use std::sync::Arc;

    /// Every glyph 500 units wide: 6pt at size 12, so 10 characters = 60pt.
    fn fonts() -> FontSet {
        FontSet::new(
            FontFamily::new(Arc::new(UniformFace::new("G"))),
            FontFamily::new(Arc::new(UniformFace::new("L"))),
        )
    }

    /// 100pt wide content area, 200pt tall.
    fn geometry() -> PageGeometry {
        PageGeometry {
            width: 120.0,
            height: 220.0,
            margin_top: 10.0,
            margin_bottom: 10.0,
            margin_left: 10.0,
            margin_right: 10.0,
        }
    }

    fn paragraph(text: &str) -> Paragraph {
        Paragraph::with_runs(vec![Run::new(text, FormattingDescriptor::new("L", 12.0))])
    }

    fn layout(paragraphs: Vec<Paragraph>) -> Layout {
        let fonts = fonts();
        LayoutEngine::new(&fonts, geometry()).layout(&Document::with_paragraphs(paragraphs))
    }

    #[test]
    fn test_single_line() {
        let layout = layout(vec![paragraph("abc def")]);
        assert_eq!(layout.page_count, 1);
        assert_eq!(layout.lines.len(), 1);

        let line = &layout.lines[0];
        assert_eq!(line.top, 10.0);
        assert_eq!(line.height, 12.0);
        assert!((line.baseline - 19.6).abs() < 1e-4);
        assert_eq!(line.text(), "abc def");
        assert_eq!(line.fragments[0].x, 10.0);
        assert!((line.right() - 52.0).abs() < 1e-4);
    }

    #[test]
    fn test_wraps_at_word_boundary() {
        // 42pt + 48pt, then "ccccc" (30pt) no longer fits in 100pt
        let layout = layout(vec![paragraph("aaaaaa bbbbbbb ccccc")]);
        let texts: Vec<_> = layout.lines.iter().map(|l| l.text()).collect();
        assert_eq!(texts, vec!["aaaaaa bbbbbbb", "ccccc"]);
        assert_eq!(layout.lines[1].top, 22.0);
    }

    #[test]
    fn test_trailing_space_fits_at_margin() {
        // "aaaaaaaa " (9 chars) + "bbbbbbb" (7) = 16 chars without the final space = 96pt
        let layout = layout(vec![paragraph("aaaaaaaa bbbbbbb")]);
        assert_eq!(layout.lines.len(), 1);
    }

    #[test]
    fn test_trailing_space_run_is_dropped() {
        let format = FormattingDescriptor::new("L", 12.0);
        let paragraph = Paragraph::with_runs(vec![
            Run::new("abcd", format.clone()),
            Run::new("   ", format.bold(true)),
        ])
        .aligned(Alignment::Right);

        let layout = layout(vec![paragraph]);
        let line = &layout.lines[0];
        assert_eq!(line.text(), "abcd");
        assert_eq!(line.fragments.len(), 1);
        assert!((line.right() - 110.0).abs() < 1e-4);
    }

    #[test]
    fn test_overlong_word_overflows() {
        let layout = layout(vec![paragraph("ab cccccccccccccccccccc d")]);
        let texts: Vec<_> = layout.lines.iter().map(|l| l.text()).collect();
        assert_eq!(texts, vec!["ab", "cccccccccccccccccccc", "d"]);
        assert!(layout.lines[1].right() > 110.0);
    }

    #[test]
    fn test_center_and_right() {
        let layout = layout(vec![
            paragraph("abcd").aligned(Alignment::Center),
            paragraph("abcd").aligned(Alignment::Right),
        ]);
        assert!((layout.lines[0].fragments[0].x - 48.0).abs() < 1e-4);
        assert!((layout.lines[1].right() - 110.0).abs() < 1e-4);
    }

    #[test]
    fn test_justify_fills_line() {
        let layout = layout(vec![paragraph("aa bb cc dddddddddddd").aligned(Alignment::Justify)]);
        assert_eq!(layout.lines.len(), 2);

        let first = &layout.lines[0];
        assert_eq!(first.fragments.len(), 3);
        assert!((first.right() - 110.0).abs() < 1e-3);
        assert_eq!(first.fragments[0].x, 10.0);

        // last line keeps left alignment
        assert_eq!(layout.lines[1].fragments[0].x, 10.0);
    }

    #[test]
    fn test_hard_break_and_blank_paragraph() {
        let layout = layout(vec![paragraph("one\ntwo"), Paragraph::new(), paragraph("three")]);
        let tops: Vec<_> = layout.lines.iter().map(|l| l.top).collect();
        assert_eq!(tops, vec![10.0, 22.0, 46.0]);
        assert_eq!(layout.lines[2].paragraph, 2);
    }

    #[test]
    fn test_paginates() {
        // 200pt of content height holds 16 lines of 12pt
        let paragraphs: Vec<_> = (0..20).map(|i| paragraph(&format!("line {}", i))).collect();
        let layout = layout(paragraphs);

        assert_eq!(layout.page_count, 2);
        assert_eq!(layout.lines_on_page(0).count(), 16);
        assert_eq!(layout.lines[16].page, 1);
        assert_eq!(layout.lines[16].top, 10.0);
        assert!(layout.lines.windows(2).all(|w| w[0].page <= w[1].page));
    }

    #[test]
    fn test_page_break() {
        let mut second = paragraph("b");
        second.style.page_break_before = true;
        let layout = layout(vec![paragraph("a\u{000C}x"), second]);

        let pages: Vec<_> = layout.lines.iter().map(|l| l.page).collect();
        assert_eq!(pages, vec![0, 1, 2]);
        assert_eq!(layout.page_count, 3);
    }

    #[test]
    fn test_spacing_and_indent() {
        let mut first = paragraph("a");
        first.style.space_before = 20.0;
        first.style.space_after = 6.0;
        let mut second = paragraph("b");
        second.style.space_before = 4.0;
        second.style.indent_left = 15.0;
        second.style.first_line_indent = 5.0;

        let layout = layout(vec![first, second]);
        // space before is suppressed at the top of the page
        assert_eq!(layout.lines[0].top, 10.0);
        assert_eq!(layout.lines[1].top, 32.0);
        assert_eq!(layout.lines[1].fragments[0].x, 30.0);
    }

    #[test]
    fn test_empty_document_has_one_page() {
        let layout = layout(Vec::new());
        assert_eq!(layout.page_count, 1);
        assert!(layout.lines.is_empty());
    }

    #[test]
    fn test_geometry_presets() {
        let a4 = PageGeometry::a4();
        assert_eq!(a4.width, 595.28);
        assert!((a4.content_width() - 451.28).abs() < 1e-3);
        assert_eq!(PageGeometry::letter().height, 792.0);
        assert_eq!(PageGeometry::default(), a4);
    }
}
