//! DOCX support: document model, package writer and structure analyzer

pub mod analyzer;
pub mod model;
pub mod writer;

pub use analyzer::{
    analyze_document_xml, analyze_docx, DocumentStructure, ParagraphInfo, RunInfo, TableInfo,
};
pub use model::{Alignment, Block, Cell, Document, PageSetup, Paragraph, Run, TabAlignment, Table};
pub use writer::write_docx;

pub const CONTENT_TYPES_PART: &str = "[Content_Types].xml";
pub const DOCUMENT_PART: &str = "word/document.xml";
pub const STYLES_PART: &str = "word/styles.xml";
pub const CORE_PART: &str = "docProps/core.xml";

/// Points to twentieths of a point
pub fn to_twips(pt: f32) -> i64 {
    (pt * 20.0).round() as i64
}

/// Points to half-points (run font size unit)
pub fn to_half_points(pt: f32) -> i64 {
    (pt * 2.0).round() as i64
}

pub fn twips_to_pt(twips: i64) -> f32 {
    twips as f32 / 20.0
}
