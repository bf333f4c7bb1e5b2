//! OOXML package writer
//!
//! Serialises a [`Document`] into a `.docx` zip. XML parts are assembled
//! as strings; every piece of user text goes through `xml_text`.

use super::model::*;
use super::{to_half_points, to_twips, CONTENT_TYPES_PART, CORE_PART, DOCUMENT_PART, STYLES_PART};
use crate::error::DocxError;
use quick_xml::escape::escape;
use std::borrow::Cow;
use std::fmt::Write as _;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const R_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/><Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/><Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/></Types>"#;

const PACKAGE_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/></Relationships>"#;

const DOCUMENT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#;

/// Build the complete `.docx` package
pub fn write_docx(doc: &Document) -> Result<Vec<u8>, DocxError> {
    let parts: [(&str, String); 6] = [
        (CONTENT_TYPES_PART, CONTENT_TYPES_XML.to_string()),
        ("_rels/.rels", PACKAGE_RELS_XML.to_string()),
        (DOCUMENT_PART, document_xml(doc)),
        ("word/_rels/document.xml.rels", DOCUMENT_RELS_XML.to_string()),
        (STYLES_PART, styles_xml(doc)),
        (CORE_PART, core_xml(doc)),
    ];

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for (name, content) in parts {
        zip.start_file(name, options)?;
        zip.write_all(content.as_bytes())?;
    }
    Ok(zip.finish()?.into_inner())
}

/// `word/document.xml`
pub fn document_xml(doc: &Document) -> String {
    let mut xml = String::with_capacity(16 * 1024);
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push('\n');
    let _ = write!(xml, r#"<w:document xmlns:w="{}" xmlns:r="{}"><w:body>"#, W_NS, R_NS);

    for block in &doc.blocks {
        match block {
            Block::Paragraph(p) => write_paragraph(&mut xml, p),
            Block::Table(t) => write_table(&mut xml, t),
        }
    }

    write_section(&mut xml, &doc.page);
    xml.push_str("</w:body></w:document>");
    xml
}

fn write_paragraph(xml: &mut String, p: &Paragraph) {
    xml.push_str("<w:p><w:pPr>");
    if p.keep_with_next {
        xml.push_str("<w:keepNext/>");
    }
    if !p.tab_stops.is_empty() {
        xml.push_str("<w:tabs>");
        for tab in &p.tab_stops {
            let val = match tab.alignment {
                TabAlignment::Left => "left",
                TabAlignment::Center => "center",
                TabAlignment::Right => "right",
            };
            let _ = write!(
                xml,
                r#"<w:tab w:val="{}" w:pos="{}"/>"#,
                val,
                to_twips(tab.position_pt)
            );
        }
        xml.push_str("</w:tabs>");
    }
    let _ = write!(
        xml,
        r#"<w:spacing w:before="{}" w:after="{}" w:line="{}" w:lineRule="auto"/>"#,
        to_twips(p.spacing_before_pt),
        to_twips(p.spacing_after_pt),
        (p.line_spacing * 240.0).round() as i64
    );
    if p.first_line_indent_pt != 0.0 || p.left_indent_pt != 0.0 {
        let _ = write!(xml, r#"<w:ind w:left="{}""#, to_twips(p.left_indent_pt));
        if p.first_line_indent_pt >= 0.0 {
            let _ = write!(xml, r#" w:firstLine="{}""#, to_twips(p.first_line_indent_pt));
        } else {
            let _ = write!(xml, r#" w:hanging="{}""#, to_twips(-p.first_line_indent_pt));
        }
        xml.push_str("/>");
    }
    let _ = write!(xml, r#"<w:jc w:val="{}"/>"#, p.alignment.as_ooxml());
    xml.push_str("</w:pPr>");

    for run in &p.runs {
        write_run(xml, run);
    }
    xml.push_str("</w:p>");
}

fn write_run(xml: &mut String, run: &Run) {
    xml.push_str("<w:r>");

    let has_props = run.font.is_some()
        || run.bold
        || run.italic
        || run.size_pt.is_some()
        || run.underline;
    if has_props {
        xml.push_str("<w:rPr>");
        if let Some(font) = &run.font {
            let font = xml_text(font);
            let _ = write!(
                xml,
                r#"<w:rFonts w:ascii="{0}" w:hAnsi="{0}" w:cs="{0}"/>"#,
                font
            );
        }
        if run.bold {
            xml.push_str("<w:b/><w:bCs/>");
        }
        if run.italic {
            xml.push_str("<w:i/><w:iCs/>");
        }
        if let Some(size) = run.size_pt {
            let _ = write!(
                xml,
                r#"<w:sz w:val="{0}"/><w:szCs w:val="{0}"/>"#,
                to_half_points(size)
            );
        }
        if run.underline {
            xml.push_str(r#"<w:u w:val="single"/>"#);
        }
        xml.push_str("</w:rPr>");
    }

    let mut segment = String::new();
    for ch in run.text.chars() {
        match ch {
            '\t' | '\n' => {
                flush_text(xml, &mut segment);
                xml.push_str(if ch == '\t' { "<w:tab/>" } else { "<w:br/>" });
            }
            '\r' => {}
            _ => segment.push(ch),
        }
    }
    flush_text(xml, &mut segment);
    xml.push_str("</w:r>");
}

/// Escape text for XML 1.0, dropping characters outside its `Char` range
fn xml_text(text: &str) -> Cow<'_, str> {
    if text.chars().all(is_xml_char) {
        escape(text)
    } else {
        let clean: String = text.chars().filter(|c| is_xml_char(*c)).collect();
        Cow::Owned(escape(clean.as_str()).into_owned())
    }
}

fn is_xml_char(c: char) -> bool {
    matches!(
        c,
        '\t' | '\n' | '\r' | '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..
    )
}

fn flush_text(xml: &mut String, segment: &mut String) {
    if !segment.is_empty() {
        let _ = write!(
            xml,
            r#"<w:t xml:space="preserve">{}</w:t>"#,
            xml_text(segment)
        );
        segment.clear();
    }
}

fn write_table(xml: &mut String, table: &Table) {
    let columns = table.column_count();
    let widths: Vec<i64> = (0..columns)
        .map(|i| to_twips(table.column_widths_pt.get(i).copied().unwrap_or(72.0)))
        .collect();
    let border = if table.borders { "single" } else { "nil" };

    let _ = write!(
        xml,
        r#"<w:tbl><w:tblPr><w:tblW w:w="{}" w:type="dxa"/><w:tblBorders>"#,
        widths.iter().sum::<i64>()
    );
    for side in ["top", "left", "bottom", "right", "insideH", "insideV"] {
        if table.borders {
            let _ = write!(
                xml,
                r#"<w:{} w:val="{}" w:sz="4" w:space="0" w:color="000000"/>"#,
                side, border
            );
        } else {
            let _ = write!(xml, r#"<w:{} w:val="{}"/>"#, side, border);
        }
    }
    xml.push_str(r#"</w:tblBorders><w:tblLayout w:type="fixed"/></w:tblPr><w:tblGrid>"#);
    for width in &widths {
        let _ = write!(xml, r#"<w:gridCol w:w="{}"/>"#, width);
    }
    xml.push_str("</w:tblGrid>");

    for (row_index, row) in table.rows.iter().enumerate() {
        xml.push_str("<w:tr>");
        if row_index < table.header_rows {
            xml.push_str("<w:trPr><w:tblHeader/></w:trPr>");
        }
        for col in 0..columns {
            let _ = write!(
                xml,
                r#"<w:tc><w:tcPr><w:tcW w:w="{}" w:type="dxa"/></w:tcPr>"#,
                widths[col]
            );
            match row.get(col) {
                Some(cell) if !cell.paragraphs.is_empty() => {
                    for p in &cell.paragraphs {
                        write_paragraph(xml, p);
                    }
                }
                // A cell must hold at least one paragraph
                _ => xml.push_str("<w:p/>"),
            }
            xml.push_str("</w:tc>");
        }
        xml.push_str("</w:tr>");
    }
    xml.push_str("</w:tbl>");
}

fn write_section(xml: &mut String, page: &PageSetup) {
    let _ = write!(
        xml,
        r#"<w:sectPr><w:pgSz w:w="{}" w:h="{}"/><w:pgMar w:top="{}" w:right="{}" w:bottom="{}" w:left="{}" w:header="708" w:footer="708" w:gutter="0"/></w:sectPr>"#,
        to_twips(mm_to_pt(page.width_mm)),
        to_twips(mm_to_pt(page.height_mm)),
        to_twips(mm_to_pt(page.margin_top_mm)),
        to_twips(mm_to_pt(page.margin_right_mm)),
        to_twips(mm_to_pt(page.margin_bottom_mm)),
        to_twips(mm_to_pt(page.margin_left_mm)),
    );
}

/// `word/styles.xml` with the document defaults
pub fn styles_xml(doc: &Document) -> String {
    let font = xml_text(&doc.default_font);
    let size = to_half_points(doc.default_size_pt);
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="{ns}"><w:docDefaults><w:rPrDefault><w:rPr><w:rFonts w:ascii="{font}" w:eastAsia="{font}" w:hAnsi="{font}" w:cs="{font}"/><w:sz w:val="{size}"/><w:szCs w:val="{size}"/><w:lang w:val="ru-RU" w:eastAsia="en-US" w:bidi="ar-SA"/></w:rPr></w:rPrDefault><w:pPrDefault><w:pPr><w:spacing w:after="0" w:line="240" w:lineRule="auto"/></w:pPr></w:pPrDefault></w:docDefaults><w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/><w:qFormat/></w:style><w:style w:type="table" w:default="1" w:styleId="TableNormal"><w:name w:val="Normal Table"/><w:tblPr><w:tblInd w:w="0" w:type="dxa"/><w:tblCellMar><w:top w:w="0" w:type="dxa"/><w:left w:w="108" w:type="dxa"/><w:bottom w:w="0" w:type="dxa"/><w:right w:w="108" w:type="dxa"/></w:tblCellMar></w:tblPr></w:style></w:styles>"#,
        ns = W_NS,
        font = font,
        size = size
    )
}

/// `docProps/core.xml`
pub fn core_xml(doc: &Document) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">"#,
    );
    if let Some(title) = &doc.title {
        let _ = write!(xml, "<dc:title>{}</dc:title>", xml_text(title));
    }
    let creator = doc.author.as_deref().unwrap_or("site-office");
    let _ = write!(xml, "<dc:creator>{}</dc:creator>", xml_text(creator));
    xml.push_str("</cp:coreProperties>");
    xml
}
