//! Business letter
//!
//! Layout: optional sender header, outgoing number/date line, recipient
//! block on the right, bold subject, centered greeting, indented body,
//! closing and signature line. [`LetterStyle`] decides underlining and
//! spacing.

use super::style::{LetterStyle, BLANK, RECIPIENT_INDENT_PT};
use super::{non_empty, BuildContext};
use crate::docx::{Alignment, Document, Paragraph, Run, TabAlignment};
use crate::error::GenerateError;

pub(super) fn letter(ctx: &BuildContext) -> Result<Document, GenerateError> {
    let params = ctx.params;
    let recipient = non_empty(&params.recipient).ok_or(GenerateError::MissingField {
        template: "letter",
        field: "recipient",
    })?;
    let body: Vec<&str> = params
        .body
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect();
    if body.is_empty() {
        return Err(GenerateError::MissingField {
            template: "letter",
            field: "body",
        });
    }

    let style = LetterStyle::resolve(params.style.as_deref());
    let mut doc = Document::new();
    doc.default_size_pt = style.font_size_pt;
    doc.title = non_empty(&params.subject).map(subject_line);
    let text_width = doc.page.text_width_pt();

    if let Some(sender) = non_empty(&params.sender_organization) {
        doc.push_paragraph(
            Paragraph::new()
                .align(Alignment::Center)
                .spacing(0.0, 12.0)
                .run(Run::text(sender).bold()),
        );
    }

    let number = non_empty(&params.outgoing_number).unwrap_or(BLANK);
    doc.push_paragraph(
        Paragraph::new()
            .run(Run::text(ctx.render("letter_outgoing")?))
            .run(Run::text(number).underline_if(style.underline_blanks))
            .run(Run::text(" от "))
            .run(Run::text(ctx.date_short()).underline_if(style.underline_blanks)),
    );
    doc.empty_line();

    let recipient_lines = [
        non_empty(&params.recipient_position),
        non_empty(&params.recipient_organization),
    ];
    for line in recipient_lines.into_iter().flatten() {
        doc.push_paragraph(Paragraph::new().left_indent(RECIPIENT_INDENT_PT).run(Run::text(line)));
    }
    doc.push_paragraph(
        Paragraph::new()
            .left_indent(RECIPIENT_INDENT_PT)
            .run(Run::text(recipient).underline_if(style.underline_recipient)),
    );
    doc.empty_line();

    if let Some(subject) = non_empty(&params.subject) {
        doc.push_paragraph(
            Paragraph::new()
                .spacing(0.0, 12.0)
                .run(Run::text(subject_line(subject)).bold().underline_if(style.underline_subject)),
        );
    }

    doc.push_paragraph(
        Paragraph::new()
            .align(Alignment::Center)
            .spacing(0.0, 12.0)
            .run(Run::text(ctx.render("letter_greeting")?)),
    );

    for text in body {
        doc.push_paragraph(
            Paragraph::new()
                .align(Alignment::Both)
                .first_line_indent(style.first_line_indent_pt)
                .line_spacing(style.line_spacing)
                .spacing(0.0, style.spacing_after_pt)
                .run(Run::text(text)),
        );
    }
    doc.empty_line();

    doc.push_paragraph(Paragraph::plain(ctx.render("letter_closing")?));
    let position = non_empty(&params.signer_position).unwrap_or("");
    let signer = non_empty(&params.signer).unwrap_or(BLANK);
    doc.push_paragraph(
        Paragraph::new()
            .tab_stop(text_width, TabAlignment::Right)
            .run(Run::text(format!("{}\t{}", position, signer))),
    );

    Ok(doc)
}

/// "О ..." unless the subject already starts with a preposition
fn subject_line(subject: &str) -> String {
    let lower = subject.to_lowercase();
    if ["о ", "об ", "обо "].iter().any(|p| lower.starts_with(p)) {
        subject.to_string()
    } else {
        format!("О {}", subject)
    }
}
