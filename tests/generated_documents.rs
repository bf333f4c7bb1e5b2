//! Generated documents read back through the analyzer, with and without a
//! learning example shaping the layout.

use std::io::{Cursor, Read};

use office_types::{DocumentParams, TemplateType};
use quick_xml::events::Event;
use quick_xml::Reader;
use site_office::docx::{
    analyze_docx, write_docx, Document, Paragraph, Table, CORE_PART, DOCUMENT_PART,
};
use site_office::{DocumentGenerator, LearningLibrary};

fn defect_params() -> DocumentParams {
    DocumentParams {
        apartment: Some("118".into()),
        date: Some("15.10.2024".into()),
        owner: Some("Сидорова А.В.".into()),
        items: vec![
            vec!["Кухня".into(), "Скол плитки у мойки".into(), "10 дней".into()],
            vec!["Санузел".into(), "Нет герметика по ванне".into(), "5 дней".into()],
        ],
        ..Default::default()
    }
}

/// Example with a differently worded header and a longer table
fn example_docx() -> Vec<u8> {
    let mut doc = Document::new();
    doc.push_paragraph(Paragraph::plain("АКТ ОСМОТРА КВАРТИРЫ"));
    let mut table = Table::new(vec![40.0, 120.0, 200.0, 100.0])
        .header(&["п/п", "Место", "Выявленный недостаток", "Устранить до"]);
    for i in 1..=8 {
        table = table.text_row(&[i.to_string(), String::new(), String::new(), String::new()]);
    }
    doc.push_table(table);
    write_docx(&doc).unwrap()
}

#[test]
fn defect_report_without_examples() {
    let generator = DocumentGenerator::new().unwrap();
    let generated = generator
        .generate(TemplateType::DefectReport, &defect_params(), None)
        .unwrap();
    assert_eq!(generated.file_name, "defect_report_kv118_15.10.2024.docx");
    assert!(generated.profile_source.is_none());

    let structure = analyze_docx(&generated.bytes).unwrap();
    assert_eq!(structure.detected_type, Some(TemplateType::DefectReport));
    assert_eq!(structure.table_count, generated.table_count);

    let items = &structure.tables[0];
    assert_eq!(
        items.header().unwrap(),
        ["№", "Помещение", "Описание дефекта", "Срок устранения"]
    );
    // header + two defects
    assert_eq!(items.rows, 3);
    assert_eq!(items.cells[2][2], "Нет герметика по ванне");
}

#[test]
fn learning_example_shapes_the_table() {
    let dir = tempfile::tempdir().unwrap();
    let library = LearningLibrary::new(dir.path());
    let profile = library
        .add_example("ведомость_дефектов_образец", &example_docx())
        .unwrap();
    assert_eq!(profile.template_type, Some(TemplateType::DefectReport));
    assert_eq!(profile.table_rows, 8);

    // A fresh library sees the stored file
    let reloaded = LearningLibrary::load_dir(dir.path()).unwrap();
    assert_eq!(reloaded.len(), 1);

    let generator = DocumentGenerator::new().unwrap();
    let profile = reloaded.profile_for(TemplateType::DefectReport);
    let generated = generator
        .generate(TemplateType::DefectReport, &defect_params(), profile.as_ref())
        .unwrap();
    assert_eq!(
        generated.profile_source.as_deref(),
        Some("ведомость_дефектов_образец.docx")
    );

    let structure = analyze_docx(&generated.bytes).unwrap();
    let items = &structure.tables[0];
    assert_eq!(
        items.header().unwrap(),
        ["п/п", "Место", "Выявленный недостаток", "Устранить до"]
    );
    // padded to the example's eight data rows
    assert_eq!(items.rows, 9);
    assert_eq!(items.cells[1][1], "Кухня");
    assert_eq!(items.cells[8][0], "8");
    assert_eq!(items.cells[8][1], "");
}

#[test]
fn letter_styles_share_content() {
    let generator = DocumentGenerator::new().unwrap();
    let mut params = DocumentParams {
        recipient: Some("Петрову П.П.".into()),
        recipient_position: Some("Генеральному директору".into()),
        recipient_organization: Some("ООО «Подрядчик»".into()),
        subject: Some("графике поставки материалов".into()),
        body: vec!["Просим согласовать график поставки до 01.11.2024.".into()],
        signer: Some("Смирнов С.С.".into()),
        date: Some("20.10.2024".into()),
        ..Default::default()
    };

    let mut texts = Vec::new();
    for style in ["standard", "underlined", "compact", "formal"] {
        params.style = Some(style.into());
        let generated = generator
            .generate(TemplateType::Letter, &params, None)
            .unwrap();
        let structure = analyze_docx(&generated.bytes).unwrap();
        assert_eq!(structure.detected_type, Some(TemplateType::Letter), "{}", style);

        let subject = structure
            .paragraphs
            .iter()
            .find(|p| p.text.contains("графике поставки"))
            .unwrap();
        let underlined = subject.runs.iter().any(|r| r.underline);
        assert_eq!(underlined, style == "underlined", "{}", style);

        let text: Vec<String> = structure.paragraphs.into_iter().map(|p| p.text).collect();
        texts.push(text);
    }
    assert!(texts.windows(2).all(|w| w[0] == w[1]));
}

fn read_part(bytes: &[u8], name: &str) -> String {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut xml = String::new();
    archive
        .by_name(name)
        .unwrap()
        .read_to_string(&mut xml)
        .unwrap();
    xml
}

fn assert_well_formed(xml: &str) {
    assert!(
        !xml.chars().any(|c| c < ' ' && !matches!(c, '\t' | '\n' | '\r')),
        "control character in XML"
    );
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => panic!("XML error at {}: {}", reader.buffer_position(), e),
        }
    }
}

#[test]
fn pasted_control_characters_are_dropped() {
    let generator = DocumentGenerator::new().unwrap();
    let mut params = defect_params();
    params.items[0][1] = "Замечание\u{1}\u{b} скол".into();
    let generated = generator
        .generate(TemplateType::DefectReport, &params, None)
        .unwrap();

    assert_well_formed(&read_part(&generated.bytes, DOCUMENT_PART));
    assert_well_formed(&read_part(&generated.bytes, CORE_PART));
    let structure = analyze_docx(&generated.bytes).unwrap();
    assert_eq!(structure.tables[0].cells[1][2], "Замечание скол");

    let letter = DocumentParams {
        recipient: Some("Петрову\u{c} П.П.".into()),
        subject: Some("поставке\u{1f} бетона".into()),
        body: vec!["Просим\u{0} ответить.".into()],
        date: Some("20.10.2024".into()),
        ..Default::default()
    };
    let generated = generator
        .generate(TemplateType::Letter, &letter, None)
        .unwrap();
    let core = read_part(&generated.bytes, CORE_PART);
    assert_well_formed(&core);
    assert!(core.contains("поставке бетона"));
    assert_well_formed(&read_part(&generated.bytes, DOCUMENT_PART));
}
