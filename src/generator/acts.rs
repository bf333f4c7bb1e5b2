//! Handover act and defect report

use serde_json::json;

use super::{body_paragraph, non_empty, title, BuildContext};
use crate::docx::{Alignment, Cell, Document, Paragraph, Run, Table};
use crate::error::GenerateError;

const HANDOVER_HEADERS: [&str; 4] = ["№", "Наименование", "Ед.", "Количество / показания"];
const HANDOVER_WIDTHS: [f32; 4] = [0.07, 0.53, 0.15, 0.25];

const DEFECT_HEADERS: [&str; 4] = ["№", "Помещение", "Описание дефекта", "Срок устранения"];
const DEFECT_WIDTHS: [f32; 4] = [0.07, 0.25, 0.46, 0.22];

/// Handed-over items when the command lists none
fn handover_defaults() -> Vec<Vec<String>> {
    [
        ["Ключи от квартиры", "компл.", "2"],
        ["Показания счетчика электроэнергии", "кВт·ч", ""],
        ["Показания счетчика холодной воды", "м³", ""],
        ["Показания счетчика горячей воды", "м³", ""],
    ]
    .iter()
    .map(|row| row.iter().map(|c| c.to_string()).collect())
    .collect()
}

pub(super) fn handover_act(ctx: &BuildContext) -> Result<Document, GenerateError> {
    require_apartment(ctx, "handover_act")?;

    let mut doc = Document::new();
    doc.title = Some(ctx.render("handover_title")?);
    doc.push_paragraph(title(ctx.render("handover_title")?).spacing(0.0, 12.0));
    doc.push_paragraph(ctx.city_date_line()?);
    doc.push_paragraph(body_paragraph(ctx.render("handover_parties")?));
    doc.push_paragraph(body_paragraph(ctx.render("handover_statement")?));
    doc.push_table(ctx.numbered_table(&HANDOVER_WIDTHS, &HANDOVER_HEADERS, &handover_defaults()));
    doc.empty_line();
    for remark in ctx.remarks() {
        doc.push_paragraph(remark);
    }
    doc.push_paragraph(body_paragraph(ctx.render("handover_claims")?));
    doc.empty_line();
    doc.push_table(signature_table(
        ctx,
        ("Застройщик:", non_empty(&ctx.params.sender_organization), non_empty(&ctx.params.signer)),
        ("Участник:", None, non_empty(&ctx.params.owner)),
    )?);
    Ok(doc)
}

pub(super) fn defect_report(ctx: &BuildContext) -> Result<Document, GenerateError> {
    require_apartment(ctx, "defect_report")?;

    let mut doc = Document::new();
    doc.title = Some(ctx.render("defect_title")?);
    doc.push_paragraph(title(ctx.render("defect_title")?));
    doc.push_paragraph(title("(ведомость дефектов)").spacing(0.0, 12.0));
    doc.push_paragraph(ctx.city_date_line()?);
    doc.push_paragraph(body_paragraph(ctx.render("defect_intro")?));
    doc.push_table(ctx.numbered_table(&DEFECT_WIDTHS, &DEFECT_HEADERS, &[]));
    doc.empty_line();
    for remark in ctx.remarks() {
        doc.push_paragraph(remark);
    }
    doc.push_paragraph(body_paragraph(ctx.render("defect_outro")?));
    doc.empty_line();
    doc.push_table(signature_table(
        ctx,
        (
            "Представитель Застройщика:",
            non_empty(&ctx.params.signer_position),
            non_empty(&ctx.params.signer),
        ),
        ("Собственник:", None, non_empty(&ctx.params.owner)),
    )?);
    Ok(doc)
}

fn require_apartment(ctx: &BuildContext, template: &'static str) -> Result<(), GenerateError> {
    non_empty(&ctx.params.apartment)
        .map(|_| ())
        .ok_or(GenerateError::MissingField {
            template,
            field: "apartment",
        })
}

/// Role, optional second line, name
type Party<'a> = (&'a str, Option<&'a str>, Option<&'a str>);

/// Two signature columns in a borderless table
fn signature_table(ctx: &BuildContext, left: Party, right: Party) -> Result<Table, GenerateError> {
    let half = Document::new().page.text_width_pt() / 2.0;
    let mut cells = Vec::with_capacity(2);
    for (role, detail, name) in [left, right] {
        let mut paragraphs = vec![Paragraph::new().run(Run::text(role).bold())];
        if let Some(detail) = detail {
            paragraphs.push(Paragraph::plain(detail));
        }
        paragraphs.push(
            Paragraph::new()
                .align(Alignment::Left)
                .spacing(12.0, 0.0)
                .run(Run::text(ctx.render_with("signature_line", &json!({ "name": name }))?)),
        );
        cells.push(Cell { paragraphs });
    }
    Ok(Table::layout(vec![half, half]).row(cells))
}
