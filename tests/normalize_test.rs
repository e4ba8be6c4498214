//! Parser and normalizer behavior on real packages.

mod common;

use common::{test_fonts, DocxBuilder};
use gurmukhi_pdf::{parse_bytes, Alignment, Normalizer, Script};

#[test]
fn test_mixed_run_splits_by_script() {
    let docx = DocxBuilder::new()
        .paragraph("ਸਤਿ ਸ੍ਰੀ ਅਕਾਲ hello")
        .build();
    let fonts = test_fonts();
    let parsed = parse_bytes(&docx).unwrap();
    assert_eq!(parsed.paragraphs[0].runs.len(), 1);

    let doc = Normalizer::new(&fonts).normalize(&parsed).unwrap();
    let runs = &doc.paragraphs[0].runs;
    assert_eq!(runs.len(), 2);
    assert_eq!(runs[0].text, "ਸਤਿ ਸ੍ਰੀ ਅਕਾਲ ");
    assert_eq!(runs[0].script, Script::Gurmukhi);
    assert_eq!(runs[0].format.font, "Test Gurmukhi");
    assert_eq!(runs[1].text, "hello");
    assert_eq!(runs[1].script, Script::Latin);
    assert_eq!(runs[1].format.font, "Test Latin");
}

#[test]
fn test_uncovered_neutral_fails() {
    // a Devanagari digit has no glyph in either family
    let docx = DocxBuilder::new().paragraph("१ ਪਹਿਲਾ").build();
    let fonts = test_fonts();
    let err = Normalizer::new(&fonts)
        .normalize(&parse_bytes(&docx).unwrap())
        .unwrap_err();
    assert!(matches!(err, gurmukhi_pdf::Error::UnsupportedGlyph { ch: '१', paragraph: 0, .. }));
}

#[test]
fn test_normalize_is_idempotent() {
    let docx = DocxBuilder::new()
        .paragraph("ਪਹਿਲਾ 12, second ਦੂਜਾ")
        .paragraph("  ਸ਼ੁਰੂ\tend ")
        .build();
    let fonts = test_fonts();
    let normalizer = Normalizer::new(&fonts);

    let once = normalizer.normalize(&parse_bytes(&docx).unwrap()).unwrap();
    let twice = normalizer.normalize(&once).unwrap();
    assert_eq!(once, twice);
    assert_eq!(once.paragraphs[0].runs.len(), 3);
}

#[test]
fn test_complex_script_properties_apply_to_gurmukhi() {
    let rpr = r#"<w:b w:val="0"/><w:bCs/><w:sz w:val="24"/><w:szCs w:val="32"/>"#;
    let docx = DocxBuilder::new()
        .styled_paragraph(rpr, "ਗੁਰਮੁਖੀ")
        .styled_paragraph(rpr, "latin")
        .build();
    let doc = parse_bytes(&docx).unwrap();

    let gurmukhi = &doc.paragraphs[0].runs[0].format;
    assert!(gurmukhi.bold);
    assert_eq!(gurmukhi.size, 16.0);

    let latin = &doc.paragraphs[1].runs[0].format;
    assert!(!latin.bold);
    assert_eq!(latin.size, 12.0);
}

#[test]
fn test_style_inheritance() {
    let styles = r#"
        <w:docDefaults><w:rPrDefault><w:rPr><w:sz w:val="22"/></w:rPr></w:rPrDefault></w:docDefaults>
        <w:style w:type="paragraph" w:styleId="Base">
          <w:pPr><w:jc w:val="center"/></w:pPr>
          <w:rPr><w:i/></w:rPr>
        </w:style>
        <w:style w:type="paragraph" w:styleId="Heading">
          <w:basedOn w:val="Base"/>
          <w:rPr><w:b/><w:sz w:val="32"/></w:rPr>
        </w:style>"#;
    let docx = DocxBuilder::new()
        .styles(styles)
        .raw(r#"<w:p><w:pPr><w:pStyle w:val="Heading"/></w:pPr><w:r><w:t>Title</w:t></w:r></w:p>"#)
        .paragraph("body")
        .build();
    let doc = parse_bytes(&docx).unwrap();

    let heading = &doc.paragraphs[0];
    assert_eq!(heading.style.alignment, Alignment::Center);
    assert!(heading.runs[0].format.bold);
    assert!(heading.runs[0].format.italic);
    assert_eq!(heading.runs[0].format.size, 16.0);

    let body = &doc.paragraphs[1];
    assert_eq!(body.style.alignment, Alignment::Left);
    assert_eq!(body.runs[0].format.size, 11.0);
}

#[test]
fn test_control_artifacts_removed() {
    let docx = DocxBuilder::new()
        .paragraph("ਕ\u{200B}ਖ\u{FEFF}ਗ")
        .build();
    let fonts = test_fonts();
    let doc = Normalizer::new(&fonts)
        .normalize(&parse_bytes(&docx).unwrap())
        .unwrap();
    assert_eq!(doc.paragraphs[0].plain_text(), "ਕਖਗ");
}

#[test]
fn test_joiners_do_not_need_glyphs() {
    let docx = DocxBuilder::new().paragraph("ਕ\u{200D}ਖ").build();
    let fonts = test_fonts();
    let doc = Normalizer::new(&fonts)
        .normalize(&parse_bytes(&docx).unwrap())
        .unwrap();
    assert_eq!(doc.paragraphs[0].runs.len(), 1);
    assert!(doc.paragraphs[0].runs[0].text.contains('\u{200D}'));
}

#[test]
fn test_tables_are_linearized() {
    let docx = DocxBuilder::new()
        .raw(
            r#"<w:tbl><w:tr>
                 <w:tc><w:p><w:r><w:t>ਇੱਕ</w:t></w:r></w:p></w:tc>
                 <w:tc><w:p><w:r><w:t>two</w:t></w:r></w:p></w:tc>
               </w:tr></w:tbl>"#,
        )
        .build();
    let doc = parse_bytes(&docx).unwrap();
    assert_eq!(doc.paragraphs.len(), 2);
    assert_eq!(doc.paragraphs[0].plain_text(), "ਇੱਕ");
    assert_eq!(doc.paragraphs[1].plain_text(), "two");
}
