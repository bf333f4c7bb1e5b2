//! Office Types - shared data structures for the site office service
//!
//! Plain serde types used by the REST API, the command store, the polling
//! agent and any external client. No business logic lives here beyond
//! constructors, string conversions and simple predicates.
//!
//! ## Contents
//!
//! - Command lifecycle: [`Command`], [`CommandStatus`], [`NewCommand`]
//! - What a command asks for: [`CommandAction`], [`DocumentParams`]
//! - Document kinds: [`TemplateType`]
//! - What the agent writes back: [`CommandResult`]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// COMMAND STATUS
// ============================================================================

/// Lifecycle state of a command row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandStatus {
    /// Waiting to be claimed by the agent
    Pending,
    /// Claimed by the agent, work in progress
    Processing,
    /// Finished successfully, result recorded
    Completed,
    /// Finished with an error, error text recorded
    Failed,
}

impl CommandStatus {
    pub fn all() -> &'static [CommandStatus] {
        &[
            CommandStatus::Pending,
            CommandStatus::Processing,
            CommandStatus::Completed,
            CommandStatus::Failed,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CommandStatus::Pending => "pending",
            CommandStatus::Processing => "processing",
            CommandStatus::Completed => "completed",
            CommandStatus::Failed => "failed",
        }
    }

    /// Completed and failed commands are never picked up again
    pub fn is_terminal(&self) -> bool {
        matches!(self, CommandStatus::Completed | CommandStatus::Failed)
    }
}

impl fmt::Display for CommandStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommandStatus {
    type Err = TypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(CommandStatus::Pending),
            "processing" => Ok(CommandStatus::Processing),
            "completed" | "done" => Ok(CommandStatus::Completed),
            "failed" | "error" => Ok(CommandStatus::Failed),
            other => Err(TypeParseError::UnknownStatus(other.to_string())),
        }
    }
}

// ============================================================================
// TEMPLATE TYPES
// ============================================================================

/// Which document generator a command selects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateType {
    /// Apartment handover act (акт приема-передачи)
    HandoverAct,
    /// Inspection act with a list of defects (ведомость дефектов)
    DefectReport,
    /// Report on completed works (отчет о выполненных работах)
    WorkReport,
    /// Business letter
    Letter,
}

impl TemplateType {
    pub fn all() -> &'static [TemplateType] {
        &[
            TemplateType::HandoverAct,
            TemplateType::DefectReport,
            TemplateType::WorkReport,
            TemplateType::Letter,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            TemplateType::HandoverAct => "handover_act",
            TemplateType::DefectReport => "defect_report",
            TemplateType::WorkReport => "work_report",
            TemplateType::Letter => "letter",
        }
    }

    /// Russian document title used in generated files
    pub fn title_ru(&self) -> &'static str {
        match self {
            TemplateType::HandoverAct => "Акт приема-передачи",
            TemplateType::DefectReport => "Ведомость дефектов",
            TemplateType::WorkReport => "Отчет о выполненных работах",
            TemplateType::Letter => "Письмо",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            TemplateType::HandoverAct => {
                "Apartment handover act with handed-over items table and signatures"
            }
            TemplateType::DefectReport => {
                "Apartment inspection act listing defects and remediation deadlines"
            }
            TemplateType::WorkReport => "Report on completed works with volumes table",
            TemplateType::Letter => "Business letter with configurable underline/spacing style",
        }
    }

    /// Aliases accepted by [`TemplateType::parse`], also used for fuzzy matching
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            TemplateType::HandoverAct => &[
                "handoveract",
                "handover",
                "act",
                "акт",
                "актприемапередачи",
                "приемапередачи",
            ],
            TemplateType::DefectReport => &[
                "defectreport",
                "defects",
                "defect",
                "дефекты",
                "ведомостьдефектов",
                "актосмотра",
            ],
            TemplateType::WorkReport => &[
                "workreport",
                "report",
                "works",
                "отчет",
                "отчёт",
                "отчетоработах",
            ],
            TemplateType::Letter => &["letter", "письмо", "mail"],
        }
    }

    /// Lenient lookup: case, dashes, underscores and spaces are ignored
    pub fn parse(s: &str) -> Option<Self> {
        let key: String = s
            .to_lowercase()
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .collect();
        Self::all()
            .iter()
            .copied()
            .find(|t| t.aliases().iter().any(|alias| *alias == key))
    }
}

impl fmt::Display for TemplateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TemplateType {
    type Err = TypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| TypeParseError::UnknownTemplateType(s.to_string()))
    }
}

// ============================================================================
// COMMAND PAYLOADS
// ============================================================================

/// Inputs for document generation. Every field is optional on the wire;
/// each generator checks the fields it needs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentParams {
    /// Apartment number, e.g. "45" or "12A"
    pub apartment: Option<String>,
    /// Building / construction object address
    pub object_address: Option<String>,
    pub city: Option<String>,
    /// Document date as dd.mm.yyyy; today when absent
    pub date: Option<String>,
    /// Apartment owner / buyer for acts
    pub owner: Option<String>,
    pub recipient: Option<String>,
    pub recipient_position: Option<String>,
    pub recipient_organization: Option<String>,
    pub subject: Option<String>,
    /// Letter salutation, e.g. "Уважаемый Иван Петрович!"
    pub greeting: Option<String>,
    /// Body paragraphs for letters, remarks for acts
    pub body: Vec<String>,
    pub sender_organization: Option<String>,
    pub outgoing_number: Option<String>,
    pub signer: Option<String>,
    pub signer_position: Option<String>,
    /// Table rows (without the header row and without the number column)
    pub items: Vec<Vec<String>>,
    /// Letter style preset name
    pub style: Option<String>,
    /// Output file name without extension
    pub output_name: Option<String>,
}

/// What a command asks the agent to do
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CommandAction {
    CreateDocument {
        template_type: TemplateType,
        #[serde(default)]
        params: DocumentParams,
    },
    PrintDocument {
        file_path: String,
        #[serde(default = "default_copies")]
        copies: u32,
    },
    UploadDocument {
        file_path: String,
        disk_path: Option<String>,
    },
}

fn default_copies() -> u32 {
    1
}

impl CommandAction {
    /// Short name used in logs and the `action_type` column
    pub fn kind(&self) -> &'static str {
        match self {
            CommandAction::CreateDocument { .. } => "create_document",
            CommandAction::PrintDocument { .. } => "print_document",
            CommandAction::UploadDocument { .. } => "upload_document",
        }
    }

    pub fn template_type(&self) -> Option<TemplateType> {
        match self {
            CommandAction::CreateDocument { template_type, .. } => Some(*template_type),
            _ => None,
        }
    }
}

/// A row of the `commands` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub id: Uuid,
    /// Original free text, when the command was created from text
    pub text: Option<String>,
    pub action: CommandAction,
    pub status: CommandStatus,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request body for creating a command: free text, an explicit action, or both
/// (the explicit action wins, the text is kept for reference)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewCommand {
    pub text: Option<String>,
    pub action: Option<CommandAction>,
}

/// Request body for a manual status change
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub status: CommandStatus,
    pub error: Option<String>,
}

/// Result the agent stores on a completed command
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_type: Option<TemplateType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypeParseError {
    #[error("Unknown command status '{0}'")]
    UnknownStatus(String),

    #[error("Unknown template type '{0}'")]
    UnknownTemplateType(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip_strings() {
        for status in CommandStatus::all() {
            assert_eq!(status.as_str().parse::<CommandStatus>().unwrap(), *status);
        }
        assert_eq!("DONE".parse::<CommandStatus>().unwrap(), CommandStatus::Completed);
        assert!("sleeping".parse::<CommandStatus>().is_err());
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!CommandStatus::Pending.is_terminal());
        assert!(!CommandStatus::Processing.is_terminal());
        assert!(CommandStatus::Completed.is_terminal());
        assert!(CommandStatus::Failed.is_terminal());
    }

    #[test]
    fn test_template_type_aliases() {
        assert_eq!(TemplateType::parse("handover_act"), Some(TemplateType::HandoverAct));
        assert_eq!(TemplateType::parse("Handover-Act"), Some(TemplateType::HandoverAct));
        assert_eq!(TemplateType::parse("письмо"), Some(TemplateType::Letter));
        assert_eq!(TemplateType::parse("Отчет"), Some(TemplateType::WorkReport));
        assert_eq!(TemplateType::parse("defects"), Some(TemplateType::DefectReport));
        assert_eq!(TemplateType::parse("invoice"), None);
    }

    #[test]
    fn test_action_wire_format() {
        let action = CommandAction::CreateDocument {
            template_type: TemplateType::HandoverAct,
            params: DocumentParams {
                apartment: Some("45".into()),
                ..Default::default()
            },
        };
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["type"], "create_document");
        assert_eq!(json["template_type"], "handover_act");
        assert_eq!(json["params"]["apartment"], "45");

        let print: CommandAction =
            serde_json::from_str(r#"{"type":"print_document","file_path":"a.docx"}"#).unwrap();
        assert_eq!(
            print,
            CommandAction::PrintDocument {
                file_path: "a.docx".into(),
                copies: 1
            }
        );
    }

    #[test]
    fn test_command_result_skips_empty_fields() {
        let result = CommandResult {
            file_path: Some("out/act.docx".into()),
            ..Default::default()
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json, serde_json::json!({"file_path": "out/act.docx"}));
    }
}
