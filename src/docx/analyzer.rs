//! DOCX structure analyzer
//!
//! Heuristic extraction of what a business document looks like: paragraphs
//! with their indents and alignment, run-level formatting, tables with cell
//! text, likely headings, and a keyword-based guess of the template type.

use super::{twips_to_pt, DOCUMENT_PART};
use crate::error::DocxError;
use office_types::TemplateType;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use serde::{Deserialize, Serialize};
use std::io::{Cursor, Read};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunInfo {
    pub text: String,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub font: Option<String>,
    pub size_pt: Option<f32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParagraphInfo {
    pub text: String,
    pub style: Option<String>,
    pub alignment: Option<String>,
    pub first_line_indent_pt: Option<f32>,
    pub left_indent_pt: Option<f32>,
    pub is_heading: bool,
    pub runs: Vec<RunInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableInfo {
    pub rows: usize,
    pub columns: usize,
    /// Cell text, paragraphs joined with '\n'
    pub cells: Vec<Vec<String>>,
}

impl TableInfo {
    pub fn header(&self) -> Option<&[String]> {
        self.cells.first().map(Vec::as_slice)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentStructure {
    pub paragraph_count: usize,
    pub table_count: usize,
    pub word_count: usize,
    pub paragraphs: Vec<ParagraphInfo>,
    pub tables: Vec<TableInfo>,
    pub headings: Vec<String>,
    /// Classification keywords found in the text
    pub keywords: Vec<String>,
    pub detected_type: Option<TemplateType>,
}

/// Largest `word/document.xml` accepted after decompression
pub const MAX_DOCUMENT_XML_BYTES: u64 = 64 * 1024 * 1024;

/// Open a `.docx` package and analyze `word/document.xml`
pub fn analyze_docx(bytes: &[u8]) -> Result<DocumentStructure, DocxError> {
    analyze_docx_with_limit(bytes, MAX_DOCUMENT_XML_BYTES)
}

fn analyze_docx_with_limit(bytes: &[u8], limit: u64) -> Result<DocumentStructure, DocxError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    let part = match archive.by_name(DOCUMENT_PART) {
        Ok(part) => part,
        Err(zip::result::ZipError::FileNotFound) => {
            return Err(DocxError::MissingPart {
                part: DOCUMENT_PART.to_string(),
            })
        }
        Err(e) => return Err(e.into()),
    };

    let too_large = || DocxError::PartTooLarge {
        part: DOCUMENT_PART.to_string(),
        limit,
    };
    if part.size() > limit {
        return Err(too_large());
    }
    // The declared size can lie, so the read itself is bounded too
    let mut raw = Vec::new();
    part.take(limit + 1).read_to_end(&mut raw)?;
    if raw.len() as u64 > limit {
        return Err(too_large());
    }

    let xml = String::from_utf8(raw).map_err(|e| DocxError::Xml {
        part: DOCUMENT_PART.to_string(),
        message: e.to_string(),
    })?;
    analyze_document_xml(&xml)
}

// =============================================================================
// XML WALK
// =============================================================================

#[derive(Default)]
struct TableBuilder {
    rows: Vec<Vec<String>>,
    current_row: Option<Vec<String>>,
    current_cell: Option<Vec<String>>,
}

#[derive(Default)]
struct Walker {
    paragraphs: Vec<ParagraphInfo>,
    tables: Vec<TableInfo>,
    table_stack: Vec<TableBuilder>,
    paragraph: Option<ParagraphInfo>,
    run: Option<RunInfo>,
    in_text: bool,
}

/// Analyze the main document part
pub fn analyze_document_xml(xml: &str) -> Result<DocumentStructure, DocxError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);
    let mut walker = Walker::default();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => walker.start(e, false),
            Ok(Event::Empty(ref e)) => walker.start(e, true),
            Ok(Event::End(ref e)) => walker.end(e.name().as_ref()),
            Ok(Event::Text(ref t)) => {
                if walker.in_text {
                    let text = t.unescape().map_err(|e| xml_error(&reader, e))?;
                    walker.push_text(&text);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(&reader, e)),
            _ => {}
        }
    }

    Ok(walker.finish())
}

fn xml_error(reader: &Reader<&[u8]>, error: quick_xml::Error) -> DocxError {
    DocxError::Xml {
        part: DOCUMENT_PART.to_string(),
        message: format!("at byte {}: {}", reader.buffer_position(), error),
    }
}

fn attr(e: &BytesStart, name: &str) -> Option<String> {
    e.try_get_attribute(name)
        .ok()
        .flatten()
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

/// `<w:b/>`, `<w:b w:val="1"/>` are on; `w:val="0"`/`"false"` is off
fn toggle_on(e: &BytesStart) -> bool {
    !matches!(attr(e, "w:val").as_deref(), Some("0") | Some("false") | Some("none"))
}

fn twips_attr(e: &BytesStart, name: &str) -> Option<f32> {
    attr(e, name)
        .and_then(|v| v.parse::<i64>().ok())
        .map(twips_to_pt)
}

impl Walker {
    fn start(&mut self, e: &BytesStart, empty: bool) {
        match e.name().as_ref() {
            b"w:tbl" if !empty => self.table_stack.push(TableBuilder::default()),
            b"w:tr" if !empty => {
                if let Some(table) = self.table_stack.last_mut() {
                    table.current_row = Some(Vec::new());
                }
            }
            b"w:tc" if !empty => {
                if let Some(table) = self.table_stack.last_mut() {
                    table.current_cell = Some(Vec::new());
                }
            }
            b"w:p" => {
                self.paragraph = Some(ParagraphInfo::default());
                if empty {
                    self.end(b"w:p");
                }
            }
            b"w:r" if !empty => self.run = Some(RunInfo::default()),
            b"w:t" if !empty => self.in_text = true,
            b"w:tab" if self.run.is_some() => self.push_text("\t"),
            b"w:br" | b"w:cr" if self.run.is_some() => self.push_text("\n"),
            name => self.property(name, e),
        }
    }

    fn property(&mut self, name: &[u8], e: &BytesStart) {
        if let Some(run) = self.run.as_mut() {
            match name {
                b"w:b" => run.bold = toggle_on(e),
                b"w:i" => run.italic = toggle_on(e),
                b"w:u" => run.underline = toggle_on(e),
                b"w:rFonts" => {
                    run.font = attr(e, "w:ascii")
                        .or_else(|| attr(e, "w:hAnsi"))
                        .or_else(|| attr(e, "w:cs"))
                }
                b"w:sz" => {
                    run.size_pt = attr(e, "w:val")
                        .and_then(|v| v.parse::<f32>().ok())
                        .map(|half_points| half_points / 2.0)
                }
                _ => {}
            }
        } else if let Some(paragraph) = self.paragraph.as_mut() {
            match name {
                b"w:pStyle" => paragraph.style = attr(e, "w:val"),
                b"w:jc" => paragraph.alignment = attr(e, "w:val"),
                b"w:ind" => {
                    paragraph.left_indent_pt =
                        twips_attr(e, "w:left").or_else(|| twips_attr(e, "w:start"));
                    paragraph.first_line_indent_pt = twips_attr(e, "w:firstLine")
                        .or_else(|| twips_attr(e, "w:hanging").map(|h| -h));
                }
                _ => {}
            }
        }
    }

    fn end(&mut self, name: &[u8]) {
        match name {
            b"w:t" => self.in_text = false,
            b"w:r" => {
                if let (Some(run), Some(paragraph)) = (self.run.take(), self.paragraph.as_mut()) {
                    paragraph.text.push_str(&run.text);
                    paragraph.runs.push(run);
                }
            }
            b"w:p" => {
                if let Some(mut paragraph) = self.paragraph.take() {
                    match self
                        .table_stack
                        .last_mut()
                        .and_then(|t| t.current_cell.as_mut())
                    {
                        Some(cell) => cell.push(paragraph.text),
                        None => {
                            paragraph.is_heading = looks_like_heading(&paragraph);
                            self.paragraphs.push(paragraph);
                        }
                    }
                }
            }
            b"w:tc" => {
                if let Some(table) = self.table_stack.last_mut() {
                    if let Some(cell) = table.current_cell.take() {
                        table
                            .current_row
                            .get_or_insert_with(Vec::new)
                            .push(cell.join("\n"));
                    }
                }
            }
            b"w:tr" => {
                if let Some(table) = self.table_stack.last_mut() {
                    if let Some(row) = table.current_row.take() {
                        table.rows.push(row);
                    }
                }
            }
            b"w:tbl" => {
                if let Some(table) = self.table_stack.pop() {
                    let columns = table.rows.iter().map(Vec::len).max().unwrap_or(0);
                    self.tables.push(TableInfo {
                        rows: table.rows.len(),
                        columns,
                        cells: table.rows,
                    });
                }
            }
            _ => {}
        }
    }

    fn push_text(&mut self, text: &str) {
        if let Some(run) = self.run.as_mut() {
            run.text.push_str(text);
        }
    }

    fn finish(self) -> DocumentStructure {
        let headings: Vec<String> = self
            .paragraphs
            .iter()
            .filter(|p| p.is_heading)
            .map(|p| p.text.trim().to_string())
            .collect();

        let body: String = self
            .paragraphs
            .iter()
            .map(|p| p.text.as_str())
            .chain(self.tables.iter().flat_map(|t| t.cells.iter().flatten().map(String::as_str)))
            .collect::<Vec<_>>()
            .join("\n");

        let (detected_type, keywords) = classify(&headings.join("\n"), &body);
        let word_count = body.split_whitespace().count();

        DocumentStructure {
            paragraph_count: self.paragraphs.len(),
            table_count: self.tables.len(),
            word_count,
            paragraphs: self.paragraphs,
            tables: self.tables,
            headings,
            keywords,
            detected_type,
        }
    }
}

// =============================================================================
// HEURISTICS
// =============================================================================

fn looks_like_heading(p: &ParagraphInfo) -> bool {
    let text = p.text.trim();
    if text.is_empty() || text.chars().count() > 120 {
        return false;
    }

    if let Some(style) = &p.style {
        let style = style.to_lowercase();
        if style.contains("heading") || style.contains("title") || style.contains("заголовок") {
            return true;
        }
    }

    let text_runs: Vec<&RunInfo> = p.runs.iter().filter(|r| !r.text.trim().is_empty()).collect();
    if !text_runs.is_empty() && text_runs.iter().all(|r| r.bold) {
        return true;
    }

    let centered = p.alignment.as_deref() == Some("center");
    let first_word_caps = text
        .split_whitespace()
        .next()
        .map(|w| w.chars().count() >= 3 && w.chars().all(|c| !c.is_lowercase()))
        .unwrap_or(false);
    centered && first_word_caps
}

const CLASSIFICATION_KEYWORDS: &[(TemplateType, &[&str])] = &[
    (
        TemplateType::HandoverAct,
        &["приема-передачи", "приёма-передачи", "передал", "принял", "ключи"],
    ),
    (
        TemplateType::DefectReport,
        &["дефект", "недостат", "осмотр", "устранени"],
    ),
    (
        TemplateType::WorkReport,
        &["выполненных работ", "отчет", "отчёт", "объем", "ед. изм"],
    ),
    (
        TemplateType::Letter,
        &["уважаем", "исх", "с уважением", "просим", "сообщаем"],
    ),
];

/// Headings weigh three times as much as body text. Ties go to the
/// earlier entry in the keyword table.
fn classify(headings: &str, body: &str) -> (Option<TemplateType>, Vec<String>) {
    let headings = headings.to_lowercase();
    let body = body.to_lowercase();
    let mut keywords = Vec::new();
    let mut best: Option<(TemplateType, usize)> = None;

    for (template, words) in CLASSIFICATION_KEYWORDS {
        let mut score = 0;
        for word in *words {
            let heading_hits = headings.matches(word).count();
            let body_hits = body.matches(word).count();
            if body_hits > 0 {
                keywords.push(word.to_string());
            }
            score += heading_hits * 3 + body_hits;
        }
        if score > 0 && best.map_or(true, |(_, s)| score > s) {
            best = Some((*template, score));
        }
    }

    (best.map(|(t, _)| t), keywords)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>
<w:p><w:pPr><w:jc w:val="center"/></w:pPr><w:r><w:rPr><w:b/><w:sz w:val="28"/></w:rPr><w:t>АКТ осмотра квартиры</w:t></w:r></w:p>
<w:p><w:pPr><w:ind w:left="0" w:firstLine="709"/><w:jc w:val="both"/></w:pPr><w:r><w:t xml:space="preserve">Выявлены </w:t></w:r><w:r><w:rPr><w:u w:val="single"/><w:rFonts w:ascii="Times New Roman"/></w:rPr><w:t>дефекты</w:t></w:r><w:r><w:tab/><w:t>&amp; прочее</w:t></w:r></w:p>
<w:p/>
<w:tbl><w:tr><w:tc><w:p><w:r><w:t>№</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>Описание дефекта</w:t></w:r></w:p></w:tc></w:tr>
<w:tr><w:tc><w:p><w:r><w:t>1</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>Скол</w:t></w:r></w:p><w:p><w:r><w:t>плитки</w:t></w:r></w:p></w:tc></w:tr></w:tbl>
<w:sectPr/></w:body></w:document>"#;

    #[test]
    fn test_paragraphs_and_runs() {
        let structure = analyze_document_xml(SAMPLE).unwrap();
        assert_eq!(structure.paragraph_count, 3);

        let title = &structure.paragraphs[0];
        assert_eq!(title.text, "АКТ осмотра квартиры");
        assert_eq!(title.alignment.as_deref(), Some("center"));
        assert!(title.runs[0].bold);
        assert_eq!(title.runs[0].size_pt, Some(14.0));
        assert!(title.is_heading);

        let body = &structure.paragraphs[1];
        assert_eq!(body.text, "Выявлены дефекты\t& прочее");
        assert_eq!(body.first_line_indent_pt, Some(35.45));
        assert_eq!(body.left_indent_pt, Some(0.0));
        assert!(body.runs[1].underline);
        assert_eq!(body.runs[1].font.as_deref(), Some("Times New Roman"));
        assert!(!body.is_heading);

        assert!(structure.paragraphs[2].text.is_empty());
    }

    #[test]
    fn test_tables() {
        let structure = analyze_document_xml(SAMPLE).unwrap();
        assert_eq!(structure.table_count, 1);
        let table = &structure.tables[0];
        assert_eq!(table.rows, 2);
        assert_eq!(table.columns, 2);
        assert_eq!(table.header().unwrap()[1], "Описание дефекта");
        assert_eq!(table.cells[1][1], "Скол\nплитки");
    }

    #[test]
    fn test_classification() {
        let structure = analyze_document_xml(SAMPLE).unwrap();
        assert_eq!(structure.detected_type, Some(TemplateType::DefectReport));
        assert!(structure.keywords.contains(&"дефект".to_string()));
        assert_eq!(structure.headings, vec!["АКТ осмотра квартиры".to_string()]);
    }

    #[test]
    fn test_bold_off_toggle() {
        let xml = r#"<w:document xmlns:w="x"><w:body><w:p><w:r><w:rPr><w:b w:val="0"/></w:rPr><w:t>plain</w:t></w:r></w:p></w:body></w:document>"#;
        let structure = analyze_document_xml(xml).unwrap();
        assert!(!structure.paragraphs[0].runs[0].bold);
        assert!(structure.detected_type.is_none());
    }

    #[test]
    fn test_not_a_zip() {
        let err = analyze_docx(b"definitely not a zip").unwrap_err();
        assert!(matches!(err, DocxError::Zip(_)));
    }

    fn zipped_document(xml: &str) -> Vec<u8> {
        use std::io::Write;
        use zip::write::SimpleFileOptions;

        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
        zip.start_file(DOCUMENT_PART, options).unwrap();
        zip.write_all(xml.as_bytes()).unwrap();
        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn test_document_size_limit() {
        let xml = format!(
            r#"<w:document xmlns:w="x"><w:body><w:p><w:r><w:t>{}</w:t></w:r></w:p></w:body></w:document>"#,
            "а".repeat(4096)
        );
        let bytes = zipped_document(&xml);
        // highly repetitive text compresses far below the limit
        assert!((bytes.len() as u64) < 1024);

        let err = analyze_docx_with_limit(&bytes, 1024).unwrap_err();
        assert!(matches!(err, DocxError::PartTooLarge { limit: 1024, .. }));

        let structure = analyze_docx_with_limit(&bytes, xml.len() as u64).unwrap();
        assert_eq!(structure.paragraph_count, 1);
    }

    #[test]
    fn test_missing_document_part() {
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file("other.xml", zip::write::SimpleFileOptions::default())
            .unwrap();
        let bytes = zip.finish().unwrap().into_inner();
        assert!(matches!(
            analyze_docx(&bytes).unwrap_err(),
            DocxError::MissingPart { .. }
        ));
    }

    #[test]
    fn test_malformed_xml() {
        let err = analyze_document_xml("<w:document><w:body></w:p></w:body>").unwrap_err();
        assert!(matches!(err, DocxError::Xml { .. }));
    }
}
