//! Error types for the site office service
//!
//! Each subsystem has its own thiserror enum; [`OfficeError`] wraps them
//! for callers that cross subsystem boundaries (CLI, agent).

use office_types::TemplateType;
use thiserror::Error;

/// Top-level error type
#[derive(Error, Debug)]
pub enum OfficeError {
    #[error("Command parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("DOCX error: {0}")]
    Docx(#[from] DocxError),

    #[error("Generation error: {0}")]
    Generate(#[from] GenerateError),

    #[error("Yandex Disk error: {0}")]
    Disk(#[from] DiskError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors from turning free text into a command action
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Command text is empty")]
    Empty,

    #[error("Unrecognized command: '{0}'")]
    UnrecognizedCommand(String),

    #[error("No document type found in '{0}'")]
    MissingTemplate(String),

    #[error("No file path found in '{0}'")]
    MissingFilePath(String),

    #[error(
        "A {template} needs {} (write them as 'кому: ...', 'текст: ...', 'адрес: ...')",
        .fields.join(", ")
    )]
    MissingFields {
        template: TemplateType,
        fields: Vec<&'static str>,
    },
}

/// Errors reading or writing DOCX packages
#[derive(Error, Debug)]
pub enum DocxError {
    #[error("Not a valid DOCX package: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("DOCX package is missing part '{part}'")]
    MissingPart { part: String },

    #[error("Malformed XML in '{part}': {message}")]
    Xml { part: String, message: String },

    #[error("DOCX part '{part}' is larger than {limit} bytes")]
    PartTooLarge { part: String, limit: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the document generators
#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("Template '{template}' requires field '{field}'")]
    MissingField {
        template: &'static str,
        field: &'static str,
    },

    #[error("Text template error: {0}")]
    Template(String),

    #[error("Invalid date '{0}', expected dd.mm.yyyy")]
    InvalidDate(String),

    #[error(transparent)]
    Docx(#[from] DocxError),
}

impl From<handlebars::RenderError> for GenerateError {
    fn from(error: handlebars::RenderError) -> Self {
        GenerateError::Template(error.to_string())
    }
}

impl From<handlebars::TemplateError> for GenerateError {
    fn from(error: handlebars::TemplateError) -> Self {
        GenerateError::Template(error.to_string())
    }
}

/// Errors from the Yandex Disk REST API
#[derive(Error, Debug)]
pub enum DiskError {
    #[error("Yandex Disk is not configured (set YANDEX_DISK_TOKEN)")]
    NotConfigured,

    #[error("Yandex Disk rejected the OAuth token")]
    Unauthorized,

    #[error("Resource not found: {path}")]
    NotFound { path: String },

    #[error("Yandex Disk API error {status} ({error}): {message}")]
    Api {
        status: u16,
        error: String,
        message: String,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl DiskError {
    /// HTTP status that best describes this error to API callers
    pub fn status_code(&self) -> u16 {
        match self {
            DiskError::NotConfigured => 503,
            DiskError::Unauthorized => 401,
            DiskError::NotFound { .. } => 404,
            DiskError::Api { status, .. } if *status >= 400 && *status < 500 => *status,
            _ => 502,
        }
    }
}

/// Configuration loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse YAML config: {0}")]
    Parse(String),

    #[error("Invalid value '{value}' for {key}")]
    InvalidValue { key: String, value: String },
}

pub type OfficeResult<T> = Result<T, OfficeError>;
