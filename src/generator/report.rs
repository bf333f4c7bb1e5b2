use super::{body_paragraph, non_empty, title, BuildContext};
use crate::docx::{Document, Paragraph, Run, TabAlignment};
use crate::error::GenerateError;
use serde_json::json;

const WORK_HEADERS: [&str; 4] = ["№", "Наименование работ", "Ед. изм.", "Объем"];
const WORK_WIDTHS: [f32; 4] = [0.07, 0.58, 0.15, 0.20];

pub(super) fn work_report(ctx: &BuildContext) -> Result<Document, GenerateError> {
    if non_empty(&ctx.params.object_address).is_none() {
        return Err(GenerateError::MissingField {
            template: "work_report",
            field: "object_address",
        });
    }

    let mut doc = Document::new();
    doc.title = Some("Отчет о выполненных работах".to_string());
    doc.push_paragraph(title("ОТЧЕТ"));
    doc.push_paragraph(title("о выполненных работах").spacing(0.0, 12.0));
    doc.push_paragraph(ctx.city_date_line()?);
    doc.push_paragraph(body_paragraph(ctx.render("work_intro")?));
    doc.push_table(ctx.numbered_table(&WORK_WIDTHS, &WORK_HEADERS, &[]));
    doc.empty_line();
    for remark in ctx.remarks() {
        doc.push_paragraph(remark);
    }
    doc.empty_line();

    // Составил: position <tab> ____ / name /
    let text_width = doc.page.text_width_pt();
    let position = non_empty(&ctx.params.signer_position).unwrap_or("");
    let signature = ctx.render_with("signature_line", &json!({ "name": ctx.params.signer }))?;
    doc.push_paragraph(
        Paragraph::new()
            .tab_stop(text_width, TabAlignment::Right)
            .run(Run::text("Составил: ").bold())
            .run(Run::text(format!("{}\t{}", position, signature))),
    );
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use crate::error::GenerateError;
    use crate::generator::DocumentGenerator;
    use office_types::{DocumentParams, TemplateType};

    #[test]
    fn test_work_report_table() {
        let generator = DocumentGenerator::new().unwrap();
        let params = DocumentParams {
            object_address: Some("ЖК «Северный», корпус 2".into()),
            date: Some("31.05.2025".into()),
            signer: Some("Кузнецов Д.А.".into()),
            signer_position: Some("Прораб".into()),
            items: vec![
                vec!["Штукатурка стен".into(), "м²".into(), "120".into()],
                vec!["Монтаж электропроводки".into(), "м".into(), "340".into()],
            ],
            ..Default::default()
        };
        let doc = generator.build(TemplateType::WorkReport, &params, None).unwrap();

        let table = doc.tables().next().unwrap();
        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.rows[0][3].paragraphs[0].text(), "Объем");
        assert_eq!(table.rows[2][0].paragraphs[0].text(), "2");
        assert_eq!(table.rows[2][3].paragraphs[0].text(), "340");

        let last = match doc.blocks.last().unwrap() {
            crate::docx::Block::Paragraph(p) => p.text(),
            crate::docx::Block::Table(_) => panic!("expected signature paragraph"),
        };
        assert_eq!(last, "Составил: Прораб\t________________ / Кузнецов Д.А. /");
    }

    #[test]
    fn test_intro_mentions_apartment_when_given() {
        let generator = DocumentGenerator::new().unwrap();
        let params = DocumentParams {
            object_address: Some("ул. Лесная, 3".into()),
            apartment: Some("8".into()),
            date: Some("01.06.2025".into()),
            ..Default::default()
        };
        let doc = generator.build(TemplateType::WorkReport, &params, None).unwrap();
        let intro = match &doc.blocks[3] {
            crate::docx::Block::Paragraph(p) => p.text(),
            crate::docx::Block::Table(_) => panic!("expected intro paragraph"),
        };
        assert_eq!(
            intro,
            "Объект: ул. Лесная, 3, квартира № 8. По состоянию на «01» июня 2025 г. выполнены следующие работы:"
        );
    }

    #[test]
    fn test_work_report_requires_address() {
        let generator = DocumentGenerator::new().unwrap();
        let err = generator
            .build(TemplateType::WorkReport, &DocumentParams::default(), None)
            .unwrap_err();
        assert!(matches!(
            err,
            GenerateError::MissingField {
                field: "object_address",
                ..
            }
        ));
    }
}
