//! Style sheet (`word/styles.xml`) and property inheritance.

use std::collections::{HashMap, HashSet};

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::xml::{get_attr, get_attr_f32, get_twips, toggle};
use super::ParseOptions;
use crate::error::Result;
use crate::model::{Alignment, FormattingDescriptor, LineSpacing, ParagraphStyle};

/// Longest `basedOn` chain that is followed.
const MAX_STYLE_DEPTH: usize = 16;

/// Run properties; `None` means inherited.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunProperties {
    /// `w:rFonts/@w:ascii` (or `@w:hAnsi`)
    pub font: Option<String>,
    /// `w:rFonts/@w:cs`
    pub font_cs: Option<String>,
    /// `w:b`
    pub bold: Option<bool>,
    /// `w:bCs`
    pub bold_cs: Option<bool>,
    /// `w:i`
    pub italic: Option<bool>,
    /// `w:iCs`
    pub italic_cs: Option<bool>,
    /// `w:sz` in points
    pub size: Option<f32>,
    /// `w:szCs` in points
    pub size_cs: Option<f32>,
}

impl RunProperties {
    /// Overlay `other` on top of these properties.
    pub fn merge(&mut self, other: &RunProperties) {
        merge_field(&mut self.font, &other.font);
        merge_field(&mut self.font_cs, &other.font_cs);
        merge_field(&mut self.bold, &other.bold);
        merge_field(&mut self.bold_cs, &other.bold_cs);
        merge_field(&mut self.italic, &other.italic);
        merge_field(&mut self.italic_cs, &other.italic_cs);
        merge_field(&mut self.size, &other.size);
        merge_field(&mut self.size_cs, &other.size_cs);
    }

    /// Apply one `w:rPr` child element.
    pub fn apply(&mut self, e: &BytesStart<'_>) {
        match e.local_name().as_ref() {
            b"rFonts" => {
                if let Some(font) = get_attr(e, b"ascii").or_else(|| get_attr(e, b"hAnsi")) {
                    self.font = Some(font);
                }
                if let Some(font) = get_attr(e, b"cs") {
                    self.font_cs = Some(font);
                }
            }
            b"b" => self.bold = Some(toggle(e)),
            b"bCs" => self.bold_cs = Some(toggle(e)),
            b"i" => self.italic = Some(toggle(e)),
            b"iCs" => self.italic_cs = Some(toggle(e)),
            b"sz" => {
                if let Some(half_points) = get_attr_f32(e, b"val") {
                    self.size = Some(half_points / 2.0);
                }
            }
            b"szCs" => {
                if let Some(half_points) = get_attr_f32(e, b"val") {
                    self.size_cs = Some(half_points / 2.0);
                }
            }
            _ => {}
        }
    }

    /// Effective font size for text of the given kind.
    pub fn effective_size(&self, complex: bool) -> Option<f32> {
        if complex {
            self.size_cs.or(self.size)
        } else {
            self.size
        }
    }

    /// Build the final descriptor.
    ///
    /// `complex` selects the complex-script properties, which Word applies
    /// to Gurmukhi text.
    pub fn resolve(&self, complex: bool, options: &ParseOptions) -> FormattingDescriptor {
        let (font, bold, italic) = if complex {
            (
                self.font_cs.as_ref().or(self.font.as_ref()),
                self.bold_cs.or(self.bold),
                self.italic_cs.or(self.italic),
            )
        } else {
            (self.font.as_ref(), self.bold, self.italic)
        };

        let size = self
            .effective_size(complex)
            .filter(|size| *size > 0.0)
            .unwrap_or(options.default_size);

        FormattingDescriptor {
            font: font.cloned().unwrap_or_else(|| options.default_font.clone()),
            bold: bold.unwrap_or(false),
            italic: italic.unwrap_or(false),
            size,
        }
    }
}

/// Paragraph properties; `None` means inherited.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParagraphProperties {
    /// `w:jc`
    pub alignment: Option<Alignment>,
    /// `w:spacing/@w:before`
    pub space_before: Option<f32>,
    /// `w:spacing/@w:after`
    pub space_after: Option<f32>,
    /// `w:spacing/@w:line` with `@w:lineRule`
    pub line_spacing: Option<LineSpacing>,
    /// `w:ind/@w:left`
    pub indent_left: Option<f32>,
    /// `w:ind/@w:right`
    pub indent_right: Option<f32>,
    /// `w:ind/@w:firstLine`, or the negated `@w:hanging`
    pub first_line_indent: Option<f32>,
    /// `w:pageBreakBefore`
    pub page_break_before: Option<bool>,
}

impl ParagraphProperties {
    /// Overlay `other` on top of these properties.
    pub fn merge(&mut self, other: &ParagraphProperties) {
        merge_field(&mut self.alignment, &other.alignment);
        merge_field(&mut self.space_before, &other.space_before);
        merge_field(&mut self.space_after, &other.space_after);
        merge_field(&mut self.line_spacing, &other.line_spacing);
        merge_field(&mut self.indent_left, &other.indent_left);
        merge_field(&mut self.indent_right, &other.indent_right);
        merge_field(&mut self.first_line_indent, &other.first_line_indent);
        merge_field(&mut self.page_break_before, &other.page_break_before);
    }

    /// Apply one `w:pPr` child element.
    pub fn apply(&mut self, e: &BytesStart<'_>) {
        match e.local_name().as_ref() {
            b"jc" => {
                if let Some(alignment) = get_attr(e, b"val").and_then(|v| Alignment::from_ooxml(&v)) {
                    self.alignment = Some(alignment);
                }
            }
            b"spacing" => {
                if let Some(before) = get_twips(e, b"before") {
                    self.space_before = Some(before);
                }
                if let Some(after) = get_twips(e, b"after") {
                    self.space_after = Some(after);
                }
                if let Some(line) = get_attr_f32(e, b"line") {
                    self.line_spacing = match get_attr(e, b"lineRule").as_deref() {
                        Some("exact") => Some(LineSpacing::Exact(line / 20.0)),
                        Some("atLeast") => Some(LineSpacing::AtLeast(line / 20.0)),
                        _ if line > 0.0 => Some(LineSpacing::Auto(line / 240.0)),
                        _ => self.line_spacing,
                    };
                }
            }
            b"ind" => {
                if let Some(left) = get_twips(e, b"left").or_else(|| get_twips(e, b"start")) {
                    self.indent_left = Some(left);
                }
                if let Some(right) = get_twips(e, b"right").or_else(|| get_twips(e, b"end")) {
                    self.indent_right = Some(right);
                }
                if let Some(hanging) = get_twips(e, b"hanging") {
                    self.first_line_indent = Some(-hanging);
                } else if let Some(first) = get_twips(e, b"firstLine") {
                    self.first_line_indent = Some(first);
                }
            }
            b"pageBreakBefore" => self.page_break_before = Some(toggle(e)),
            _ => {}
        }
    }

    /// Build the final style; `mark_size` is the paragraph mark font size.
    pub fn resolve(&self, mark_size: f32) -> ParagraphStyle {
        ParagraphStyle {
            alignment: self.alignment.unwrap_or_default(),
            space_before: self.space_before.unwrap_or(0.0).max(0.0),
            space_after: self.space_after.unwrap_or(0.0).max(0.0),
            line_spacing: self.line_spacing.unwrap_or_default(),
            indent_left: self.indent_left.unwrap_or(0.0),
            indent_right: self.indent_right.unwrap_or(0.0),
            first_line_indent: self.first_line_indent.unwrap_or(0.0),
            page_break_before: self.page_break_before.unwrap_or(false),
            mark_size,
        }
    }
}

fn merge_field<T: Clone>(target: &mut Option<T>, source: &Option<T>) {
    if source.is_some() {
        target.clone_from(source);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StyleKind {
    Paragraph,
    Character,
    Other,
}

#[derive(Debug, Clone)]
struct StyleDef {
    kind: StyleKind,
    based_on: Option<String>,
    run: RunProperties,
    paragraph: ParagraphProperties,
}

/// Parsed style definitions with document defaults.
#[derive(Debug, Clone, Default)]
pub struct StyleSheet {
    default_run: RunProperties,
    default_paragraph: ParagraphProperties,
    default_paragraph_style: Option<String>,
    styles: HashMap<String, StyleDef>,
}

impl StyleSheet {
    /// Parse the content of `word/styles.xml`.
    pub fn parse(xml: &str) -> Result<Self> {
        let mut sheet = StyleSheet::default();
        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);

        let mut current: Option<(String, StyleDef)> = None;
        let mut in_run_default = false;
        let mut in_paragraph_default = false;
        let mut in_rpr = false;
        let mut in_ppr = false;

        loop {
            let event = reader.read_event()?;
            let is_empty = matches!(event, Event::Empty(_));
            match event {
                Event::Start(e) | Event::Empty(e) => match e.local_name().as_ref() {
                    b"rPrDefault" => in_run_default = !is_empty,
                    b"pPrDefault" => in_paragraph_default = !is_empty,
                    b"style" => {
                        let kind = match get_attr(&e, b"type").as_deref() {
                            Some("paragraph") => StyleKind::Paragraph,
                            Some("character") => StyleKind::Character,
                            _ => StyleKind::Other,
                        };
                        let id = get_attr(&e, b"styleId").unwrap_or_default();
                        let is_default = get_attr(&e, b"default")
                            .is_some_and(|v| v == "1" || v == "true");
                        if kind == StyleKind::Paragraph && is_default {
                            sheet.default_paragraph_style = Some(id.clone());
                        }
                        let def = StyleDef {
                            kind,
                            based_on: None,
                            run: RunProperties::default(),
                            paragraph: ParagraphProperties::default(),
                        };
                        if is_empty {
                            sheet.styles.insert(id, def);
                        } else {
                            current = Some((id, def));
                        }
                    }
                    b"basedOn" => {
                        if let Some((_, def)) = current.as_mut() {
                            def.based_on = get_attr(&e, b"val");
                        }
                    }
                    b"rPrChange" | b"pPrChange" => {
                        if !is_empty {
                            reader.read_to_end(e.name())?;
                        }
                    }
                    b"rPr" => in_rpr = !is_empty,
                    b"pPr" => in_ppr = !is_empty,
                    _ if in_rpr => {
                        if let Some((_, def)) = current.as_mut() {
                            def.run.apply(&e);
                        } else if in_run_default {
                            sheet.default_run.apply(&e);
                        }
                    }
                    _ if in_ppr => {
                        if let Some((_, def)) = current.as_mut() {
                            def.paragraph.apply(&e);
                        } else if in_paragraph_default {
                            sheet.default_paragraph.apply(&e);
                        }
                    }
                    _ => {}
                },
                Event::End(e) => match e.local_name().as_ref() {
                    b"rPrDefault" => in_run_default = false,
                    b"pPrDefault" => in_paragraph_default = false,
                    b"rPr" => in_rpr = false,
                    b"pPr" => in_ppr = false,
                    b"style" => {
                        if let Some((id, def)) = current.take() {
                            sheet.styles.insert(id, def);
                        }
                    }
                    _ => {}
                },
                Event::Eof => break,
                _ => {}
            }
        }

        log::debug!(
            "Parsed {} styles (default paragraph style: {:?})",
            sheet.styles.len(),
            sheet.default_paragraph_style
        );
        Ok(sheet)
    }

    /// Number of style definitions.
    pub fn len(&self) -> usize {
        self.styles.len()
    }

    /// Check if no style is defined.
    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }

    /// Effective properties of a paragraph style, on top of the document defaults.
    ///
    /// Without a style id the default paragraph style applies.
    pub fn paragraph(&self, style_id: Option<&str>) -> (ParagraphProperties, RunProperties) {
        let mut paragraph = self.default_paragraph.clone();
        let mut run = self.default_run.clone();

        let style_id = style_id.or(self.default_paragraph_style.as_deref());
        for def in self.chain(style_id, StyleKind::Paragraph) {
            paragraph.merge(&def.paragraph);
            run.merge(&def.run);
        }
        (paragraph, run)
    }

    /// Run properties contributed by a character style chain.
    pub fn character(&self, style_id: Option<&str>) -> RunProperties {
        let mut run = RunProperties::default();
        for def in self.chain(style_id, StyleKind::Character) {
            run.merge(&def.run);
        }
        run
    }

    /// Style definitions from the root of the `basedOn` chain down to `style_id`.
    fn chain(&self, style_id: Option<&str>, kind: StyleKind) -> Vec<&StyleDef> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut next = style_id;

        while let Some(id) = next {
            if chain.len() >= MAX_STYLE_DEPTH || !seen.insert(id) {
                log::warn!("Style chain through \"{}\" is cyclic or too deep", id);
                break;
            }
            let Some(def) = self.styles.get(id) else {
                break;
            };
            if def.kind != kind {
                break;
            }
            chain.push(def);
            next = def.based_on.as_deref();
        }

        chain.reverse();
        chain
    }
}
