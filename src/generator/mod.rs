//! Document generators
//!
//! One builder per [`TemplateType`]. Each builder turns `DocumentParams`
//! into a [`Document`] model; [`DocumentGenerator::generate`] packages it
//! as `.docx` bytes with a suggested file name and a short summary.
//!
//! Fixed phrases come from [`snippets`], letter formatting from
//! [`style::LetterStyle`]. A learning example (see [`crate::learning`])
//! may reshape the main table: its header row replaces the default one
//! when the column counts agree, and empty numbered rows are appended up
//! to the example's row count.

mod acts;
mod letter;
mod report;
pub mod snippets;
pub mod style;

use chrono::{Local, NaiveDate};
use office_types::{DocumentParams, TemplateType};
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::docx::{write_docx, Alignment, Cell, Document, Paragraph, Run, TabAlignment, Table};
use crate::error::GenerateError;
use crate::learning::StructureProfile;

pub use snippets::Snippets;
pub use style::LetterStyle;

use style::{FIRST_LINE_INDENT_PT, TITLE_SIZE_PT};

/// Empty numbered rows added to a table when no items were given
pub const MIN_BLANK_ROWS: usize = 3;
/// Upper bound for rows padded from a learning example
pub const MAX_PADDED_ROWS: usize = 50;

const MONTHS_GENITIVE: [&str; 12] = [
    "января",
    "февраля",
    "марта",
    "апреля",
    "мая",
    "июня",
    "июля",
    "августа",
    "сентября",
    "октября",
    "ноября",
    "декабря",
];

/// A packaged document
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedDocument {
    pub template_type: TemplateType,
    pub file_name: String,
    #[serde(skip)]
    pub bytes: Vec<u8>,
    pub size: usize,
    pub paragraph_count: usize,
    pub table_count: usize,
    /// Hex SHA-256 of `bytes`
    pub sha256: String,
    /// Learning example the layout followed
    pub profile_source: Option<String>,
}

/// Everything a builder needs
pub(crate) struct BuildContext<'a> {
    pub params: &'a DocumentParams,
    pub date: NaiveDate,
    pub snippets: &'a Snippets,
    pub profile: Option<&'a StructureProfile>,
    values: Value,
}

impl BuildContext<'_> {
    pub fn render(&self, snippet: &str) -> Result<String, GenerateError> {
        self.snippets.render(snippet, &self.values)
    }

    /// Render a snippet against an extra set of fields
    pub fn render_with(&self, snippet: &str, values: &Value) -> Result<String, GenerateError> {
        self.snippets.render(snippet, values)
    }

    pub fn date_short(&self) -> String {
        self.date.format("%d.%m.%Y").to_string()
    }

    pub fn date_long(&self) -> String {
        format_long_date(self.date)
    }

    /// `г. Москва` on the left, long date flush right
    pub fn city_date_line(&self) -> Result<Paragraph, GenerateError> {
        let text_width = Document::new().page.text_width_pt();
        Ok(Paragraph::new()
            .tab_stop(text_width, TabAlignment::Right)
            .spacing(0.0, 12.0)
            .run(Run::text(format!("{}\t{}", self.render("city_line")?, self.date_long()))))
    }

    /// Free-form remarks from `params.body`
    pub fn remarks(&self) -> impl Iterator<Item = Paragraph> + '_ {
        self.params
            .body
            .iter()
            .map(|line| line.trim())
            .filter(|line| !line.is_empty())
            .map(body_paragraph)
    }

    /// Default header unless the learning example has one of equal width
    pub fn headers(&self, defaults: &[&str]) -> Vec<String> {
        match self.profile {
            Some(profile) if profile.table_headers.len() == defaults.len() => {
                debug!(source = %profile.source_file, "Using table headers from learning example");
                profile.table_headers.clone()
            }
            _ => defaults.iter().map(|h| h.to_string()).collect(),
        }
    }

    /// Numbered data table: `items` (or `defaults` when empty) become rows
    /// behind a running number, then empty rows pad to the example's size
    pub fn numbered_table(
        &self,
        widths: &[f32],
        default_headers: &[&str],
        defaults: &[Vec<String>],
    ) -> Table {
        let columns = default_headers.len();
        let text_width = Document::new().page.text_width_pt();
        let mut table = Table::new(widths.iter().map(|w| w * text_width).collect())
            .header(self.headers(default_headers).as_slice());

        let rows: &[Vec<String>] = if self.params.items.is_empty() {
            defaults
        } else {
            &self.params.items
        };

        let mut count = 0;
        for item in rows {
            count += 1;
            table = table.row(numbered_row(count, item, columns));
        }

        let target = self
            .profile
            .map(|p| p.table_rows.min(MAX_PADDED_ROWS))
            .unwrap_or(0)
            .max(if count == 0 { MIN_BLANK_ROWS } else { 0 });
        while count < target {
            count += 1;
            table = table.row(numbered_row(count, &[], columns));
        }
        table
    }
}

/// Bold centered title line
pub(crate) fn title(text: impl Into<String>) -> Paragraph {
    Paragraph::new()
        .align(Alignment::Center)
        .keep_with_next()
        .run(Run::text(text).bold().size(TITLE_SIZE_PT))
}

/// Justified paragraph with the standard first-line indent
pub(crate) fn body_paragraph(text: impl Into<String>) -> Paragraph {
    Paragraph::new()
        .align(Alignment::Both)
        .first_line_indent(FIRST_LINE_INDENT_PT)
        .spacing(0.0, 6.0)
        .run(Run::text(text))
}

fn numbered_row(number: usize, values: &[String], columns: usize) -> Vec<Cell> {
    std::iter::once(number.to_string())
        .chain(values.iter().cloned())
        .chain(std::iter::repeat(String::new()))
        .take(columns)
        .map(Cell::text)
        .collect()
}

pub struct DocumentGenerator {
    snippets: Snippets,
}

impl DocumentGenerator {
    pub fn new() -> Result<Self, GenerateError> {
        Ok(Self {
            snippets: Snippets::new()?,
        })
    }

    /// Build the document model without packaging it
    pub fn build(
        &self,
        template_type: TemplateType,
        params: &DocumentParams,
        profile: Option<&StructureProfile>,
    ) -> Result<Document, GenerateError> {
        let date = resolve_date(params.date.as_deref())?;
        let ctx = BuildContext {
            params,
            date,
            snippets: &self.snippets,
            profile,
            values: render_values(params, date),
        };

        let mut doc = match template_type {
            TemplateType::HandoverAct => acts::handover_act(&ctx)?,
            TemplateType::DefectReport => acts::defect_report(&ctx)?,
            TemplateType::WorkReport => report::work_report(&ctx)?,
            TemplateType::Letter => letter::letter(&ctx)?,
        };
        if doc.author.is_none() {
            doc.author = params.sender_organization.clone();
        }
        Ok(doc)
    }

    pub fn generate(
        &self,
        template_type: TemplateType,
        params: &DocumentParams,
        profile: Option<&StructureProfile>,
    ) -> Result<GeneratedDocument, GenerateError> {
        let doc = self.build(template_type, params, profile)?;
        let bytes = write_docx(&doc)?;
        let file_name = file_name_for(template_type, params)?;

        info!(
            template_type = %template_type,
            file = %file_name,
            bytes = bytes.len(),
            profile = profile.map(|p| p.source_file.as_str()),
            "Generated document"
        );

        Ok(GeneratedDocument {
            template_type,
            sha256: hex::encode(Sha256::digest(&bytes)),
            size: bytes.len(),
            paragraph_count: doc.paragraph_count(),
            table_count: doc.tables().count(),
            profile_source: profile.map(|p| p.source_file.clone()),
            file_name,
            bytes,
        })
    }
}

/// `dd.mm.yyyy` (or ISO `yyyy-mm-dd`); today when absent
pub fn resolve_date(date: Option<&str>) -> Result<NaiveDate, GenerateError> {
    match date.map(str::trim).filter(|d| !d.is_empty()) {
        None => Ok(Local::now().date_naive()),
        Some(d) => NaiveDate::parse_from_str(d, "%d.%m.%Y")
            .or_else(|_| NaiveDate::parse_from_str(d, "%Y-%m-%d"))
            .map_err(|_| GenerateError::InvalidDate(d.to_string())),
    }
}

/// «03» июля 2024 г.
pub fn format_long_date(date: NaiveDate) -> String {
    use chrono::Datelike;
    format!(
        "«{:02}» {} {} г.",
        date.day(),
        MONTHS_GENITIVE[date.month0() as usize],
        date.year()
    )
}

fn render_values(params: &DocumentParams, date: NaiveDate) -> Value {
    let mut values =
        serde_json::to_value(params).unwrap_or_else(|_| Value::Object(Default::default()));
    if let Value::Object(map) = &mut values {
        map.insert("date".into(), date.format("%d.%m.%Y").to_string().into());
        map.insert("date_long".into(), format_long_date(date).into());
        let city = params
            .city
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or("Москва");
        map.insert("city".into(), city.into());
    }
    values
}

/// Suggested `.docx` file name: `output_name` when given, otherwise
/// template, apartment (or outgoing number) and date
pub fn file_name_for(
    template_type: TemplateType,
    params: &DocumentParams,
) -> Result<String, GenerateError> {
    let stem = match params.output_name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => name.trim_end_matches(".docx").to_string(),
        _ => {
            let date = resolve_date(params.date.as_deref())?.format("%d.%m.%Y");
            let mut parts = vec![template_type.name().to_string()];
            if let Some(apartment) = non_empty(&params.apartment) {
                parts.push(format!("kv{}", apartment));
            } else if let Some(number) = non_empty(&params.outgoing_number) {
                parts.push(format!("no{}", number));
            }
            parts.push(date.to_string());
            parts.join("_")
        }
    };
    Ok(format!("{}.docx", sanitize_file_stem(&stem)))
}

pub(crate) fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn sanitize_file_stem(stem: &str) -> String {
    let safe: String = stem
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let trimmed = safe.trim_matches(['.', '_']);
    if trimmed.is_empty() {
        "document".to_string()
    } else {
        trimmed.to_string()
    }
}
