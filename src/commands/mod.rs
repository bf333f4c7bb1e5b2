//! Command intake: turning API requests into store drafts

pub mod parser;

pub use parser::{detect_template, parse_command_text};

use crate::error::ParseError;
use crate::store::CommandDraft;
use office_types::NewCommand;

/// Resolve a create request into a draft. An explicit action wins over the
/// text; the text is kept either way.
pub fn resolve_new_command(request: NewCommand) -> Result<CommandDraft, ParseError> {
    let text = request
        .text
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());

    let action = match (request.action, text.as_deref()) {
        (Some(action), _) => action,
        (None, Some(text)) => parse_command_text(text)?,
        (None, None) => return Err(ParseError::Empty),
    };

    Ok(CommandDraft { text, action })
}
