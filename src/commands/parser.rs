//! Free-text command parser
//!
//! Turns requests typed by site staff ("создай акт приема-передачи кв. 45",
//! "print out/act_45.docx 2 copies") into a [`CommandAction`]. Keyword
//! matching first, Jaro-Winkler against template aliases as a fallback.
//!
//! Free-form fields are given as `label: value` segments separated by `;`:
//! `кому:`/`to:` (recipient), `тема:`/`subject:`, `текст:`/`body:` and
//! `адрес:`/`address:` (object address).

use crate::error::ParseError;
use office_types::{CommandAction, DocumentParams, TemplateType};
use regex::Regex;
use std::sync::LazyLock;

// =============================================================================
// PATTERNS
// =============================================================================

static APARTMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:квартир[а-я]*|кв\.?|apartment|apt\.?|flat)\s*№?\s*(\d+[а-яa-z]?)\b").unwrap()
});

static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,2})\.(\d{1,2})\.(\d{4})\b").unwrap());

static COPIES_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:(\d+)\s*(?:копи[а-я]*|экз[а-я]*\.?|copies|copy)|\bx\s*(\d+)\b)").unwrap()
});

static DOCX_PATH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([\w./\\:-]+\.docx)\b").unwrap());

static DISK_PATH_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(disk:/\S*)").unwrap());

static WORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\p{L}-]{4,}").unwrap());

static FIELD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(кому|to|тема|subject|текст|body|адрес|address)\s*:\s*([^;\n]+)").unwrap()
});

const PRINT_WORDS: &[&str] = &["распечат", "напечат", "печать", "print"];
const UPLOAD_WORDS: &[&str] = &["загрузи", "загрузить", "выгрузи", "upload"];
const CREATE_WORDS: &[&str] = &[
    "созда", "сформир", "сделай", "подготов", "create", "make", "generate", "draft",
];

/// Checked in order: "defect report" must not fall through to "report"
const TEMPLATE_KEYWORDS: &[(TemplateType, &[&str])] = &[
    (
        TemplateType::HandoverAct,
        &["приема-передачи", "приема передачи", "передачи квартиры", "handover"],
    ),
    (
        TemplateType::DefectReport,
        &["дефект", "defect", "осмотр", "inspection"],
    ),
    (
        TemplateType::WorkReport,
        &["отчет", "выполненных работ", "report"],
    ),
    (TemplateType::Letter, &["письм", "letter"]),
    (TemplateType::HandoverAct, &["акт", "act"]),
];

pub const FUZZY_THRESHOLD: f64 = 0.85;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verb {
    Create,
    Print,
    Upload,
}

/// Parse free text into a command action
pub fn parse_command_text(text: &str) -> Result<CommandAction, ParseError> {
    if text.trim().is_empty() {
        return Err(ParseError::Empty);
    }
    // Field values are free text and must not steer verb or template detection
    let fields = FIELD_RE.replace_all(text, " ");
    let normalized = fields.trim().to_lowercase().replace('ё', "е");

    let template = detect_template(&normalized);
    let verb = detect_verb(&normalized).or(template.map(|_| Verb::Create));

    match verb {
        Some(Verb::Print) => {
            let file_path =
                extract_docx_path(text).ok_or_else(|| ParseError::MissingFilePath(text.into()))?;
            Ok(CommandAction::PrintDocument {
                file_path,
                copies: extract_copies(&normalized).unwrap_or(1),
            })
        }
        Some(Verb::Upload) => {
            let file_path =
                extract_docx_path(text).ok_or_else(|| ParseError::MissingFilePath(text.into()))?;
            Ok(CommandAction::UploadDocument {
                file_path,
                disk_path: DISK_PATH_RE
                    .captures(text)
                    .map(|c| c[1].trim_end_matches(['.', ',']).to_string()),
            })
        }
        Some(Verb::Create) => {
            let template_type =
                template.ok_or_else(|| ParseError::MissingTemplate(text.to_string()))?;
            let mut params = extract_params(&normalized, template_type);
            apply_fields(text, &mut params);

            let missing = missing_fields(template_type, &params);
            if !missing.is_empty() {
                return Err(ParseError::MissingFields {
                    template: template_type,
                    fields: missing,
                });
            }
            Ok(CommandAction::CreateDocument {
                template_type,
                params,
            })
        }
        None => Err(ParseError::UnrecognizedCommand(text.to_string())),
    }
}

fn detect_verb(normalized: &str) -> Option<Verb> {
    let has_any = |words: &[&str]| words.iter().any(|w| contains_keyword(normalized, w));
    if has_any(PRINT_WORDS) {
        Some(Verb::Print)
    } else if has_any(UPLOAD_WORDS) {
        Some(Verb::Upload)
    } else if has_any(CREATE_WORDS) {
        Some(Verb::Create)
    } else {
        None
    }
}

/// Keyword match, then fuzzy match of each word against template aliases
pub fn detect_template(normalized: &str) -> Option<TemplateType> {
    for (template, keywords) in TEMPLATE_KEYWORDS {
        if keywords.iter().any(|k| contains_keyword(normalized, k)) {
            return Some(*template);
        }
    }

    let mut best: Option<(TemplateType, f64)> = None;
    for word in WORD_RE.find_iter(normalized) {
        let word = word.as_str().replace('-', "");
        for template in TemplateType::all() {
            for alias in template.aliases() {
                let score = strsim::jaro_winkler(&word, alias);
                if score >= FUZZY_THRESHOLD && best.map_or(true, |(_, s)| score > s) {
                    best = Some((*template, score));
                }
            }
        }
    }
    best.map(|(template, _)| template)
}

/// `keyword` occurs at the start of a word ("акт" matches "акта", not
/// "контакт"). Russian keywords are stems; English ones must end the word,
/// allowing a plural `s` ("acts", not "actual").
fn contains_keyword(haystack: &str, keyword: &str) -> bool {
    let whole_word = keyword.is_ascii();
    haystack.match_indices(keyword).any(|(idx, _)| {
        let starts_word = haystack[..idx]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric());
        if !starts_word {
            return false;
        }
        if !whole_word {
            return true;
        }
        let rest = &haystack[idx + keyword.len()..];
        let rest = rest.strip_prefix('s').unwrap_or(rest);
        rest.chars().next().map_or(true, |c| !c.is_alphanumeric())
    })
}

/// Copy `label: value` segments of the original text into `params`
fn apply_fields(text: &str, params: &mut DocumentParams) {
    for caps in FIELD_RE.captures_iter(text) {
        let value = caps[2].trim().to_string();
        if value.is_empty() {
            continue;
        }
        match caps[1].to_lowercase().as_str() {
            "кому" | "to" => params.recipient = Some(value),
            "тема" | "subject" => params.subject = Some(value),
            "текст" | "body" => params.body.push(value),
            _ => params.object_address = Some(value),
        }
    }
}

/// Fields the generator for `template` cannot do without
fn missing_fields(template: TemplateType, params: &DocumentParams) -> Vec<&'static str> {
    let absent = |v: &Option<String>| v.as_deref().map_or(true, |s| s.trim().is_empty());
    let mut missing = Vec::new();
    match template {
        TemplateType::HandoverAct | TemplateType::DefectReport => {
            if absent(&params.apartment) {
                missing.push("apartment");
            }
        }
        TemplateType::WorkReport => {
            if absent(&params.object_address) {
                missing.push("object_address");
            }
        }
        TemplateType::Letter => {
            if absent(&params.recipient) {
                missing.push("recipient");
            }
            if params.body.is_empty() {
                missing.push("body");
            }
        }
    }
    missing
}

fn extract_params(normalized: &str, template_type: TemplateType) -> DocumentParams {
    let mut params = DocumentParams {
        apartment: APARTMENT_RE.captures(normalized).map(|c| c[1].to_uppercase()),
        date: DATE_RE
            .captures(normalized)
            .map(|c| format!("{:0>2}.{:0>2}.{}", &c[1], &c[2], &c[3])),
        ..Default::default()
    };

    if template_type == TemplateType::Letter {
        params.style = if normalized.contains("подчерк") || normalized.contains("underlin") {
            Some("underlined".to_string())
        } else if normalized.contains("компакт") || normalized.contains("compact") {
            Some("compact".to_string())
        } else if normalized.contains("официальн") || normalized.contains("formal") {
            Some("formal".to_string())
        } else {
            None
        };
    }
    params
}

fn extract_copies(normalized: &str) -> Option<u32> {
    COPIES_RE.captures(normalized).and_then(|c| {
        c.get(1)
            .or_else(|| c.get(2))
            .and_then(|m| m.as_str().parse::<u32>().ok())
            .filter(|n| *n > 0)
    })
}

fn extract_docx_path(text: &str) -> Option<String> {
    DOCX_PATH_RE
        .captures_iter(text)
        .map(|c| c[1].to_string())
        .find(|p| !p.starts_with("disk:"))
}
