//! Formatting conventions for generated documents
//!
//! Letter variants differ only in underline and spacing, so they are
//! presets of one [`LetterStyle`] rather than separate generators.

use serde::Serialize;
use tracing::warn;

pub const BODY_FONT: &str = "Times New Roman";
/// 1.25 cm paragraph indent
pub const FIRST_LINE_INDENT_PT: f32 = 35.45;
pub const BODY_SIZE_PT: f32 = 12.0;
pub const TITLE_SIZE_PT: f32 = 14.0;
/// Recipient block starts ~9 cm from the left margin
pub const RECIPIENT_INDENT_PT: f32 = 255.0;
/// Blank to be filled in by hand
pub const BLANK: &str = "____________";

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LetterStyle {
    pub name: &'static str,
    pub font_size_pt: f32,
    pub line_spacing: f32,
    pub spacing_after_pt: f32,
    pub first_line_indent_pt: f32,
    pub underline_recipient: bool,
    pub underline_subject: bool,
    /// Underline the outgoing number and date values
    pub underline_blanks: bool,
}

impl LetterStyle {
    pub const STANDARD: LetterStyle = LetterStyle {
        name: "standard",
        font_size_pt: BODY_SIZE_PT,
        line_spacing: 1.0,
        spacing_after_pt: 6.0,
        first_line_indent_pt: FIRST_LINE_INDENT_PT,
        underline_recipient: false,
        underline_subject: false,
        underline_blanks: true,
    };

    pub const UNDERLINED: LetterStyle = LetterStyle {
        name: "underlined",
        underline_recipient: true,
        underline_subject: true,
        ..Self::STANDARD
    };

    pub const COMPACT: LetterStyle = LetterStyle {
        name: "compact",
        spacing_after_pt: 0.0,
        underline_blanks: false,
        ..Self::STANDARD
    };

    pub const FORMAL: LetterStyle = LetterStyle {
        name: "formal",
        font_size_pt: TITLE_SIZE_PT,
        line_spacing: 1.5,
        ..Self::STANDARD
    };

    pub fn all() -> &'static [LetterStyle] {
        &[Self::STANDARD, Self::UNDERLINED, Self::COMPACT, Self::FORMAL]
    }

    pub fn by_name(name: &str) -> Option<LetterStyle> {
        let name = name.trim().to_lowercase();
        Self::all().iter().copied().find(|s| s.name == name)
    }

    /// Named preset, or `standard` when absent or unknown
    pub fn resolve(name: Option<&str>) -> LetterStyle {
        match name {
            None => Self::STANDARD,
            Some(name) => Self::by_name(name).unwrap_or_else(|| {
                warn!(style = name, "Unknown letter style, using standard");
                Self::STANDARD
            }),
        }
    }
}

impl Default for LetterStyle {
    fn default() -> Self {
        Self::STANDARD
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_differ_only_in_formatting() {
        assert!(LetterStyle::UNDERLINED.underline_recipient);
        assert!(!LetterStyle::STANDARD.underline_recipient);
        assert_eq!(LetterStyle::COMPACT.spacing_after_pt, 0.0);
        assert_eq!(LetterStyle::FORMAL.line_spacing, 1.5);
        assert_eq!(LetterStyle::FORMAL.first_line_indent_pt, FIRST_LINE_INDENT_PT);
    }

    #[test]
    fn test_resolve() {
        assert_eq!(LetterStyle::resolve(None), LetterStyle::STANDARD);
        assert_eq!(LetterStyle::resolve(Some(" Compact ")), LetterStyle::COMPACT);
        assert_eq!(LetterStyle::resolve(Some("fancy")), LetterStyle::STANDARD);
    }
}
