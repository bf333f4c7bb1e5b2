//! Fixed phrases of the generated documents as handlebars templates
//!
//! Rendered against the JSON form of `DocumentParams` plus a few derived
//! fields (`date`, `date_long`, `city`). Escaping is left to the DOCX
//! writer, so the registry renders raw text.

use handlebars::Handlebars;
use serde_json::Value;

use super::style::BLANK;
use crate::error::GenerateError;

const SNIPPETS: &[(&str, &str)] = &[
    ("handover_title", "АКТ приема-передачи квартиры № {{apartment}}"),
    (
        "handover_parties",
        "{{or_blank sender_organization}}, именуемое в дальнейшем «Застройщик», \
         в лице {{or_blank signer_position}} {{or_blank signer}}, с одной стороны, \
         и {{or_blank owner}}, именуемый(ая) в дальнейшем «Участник», с другой стороны, \
         составили настоящий акт о том, что Застройщик передал, а Участник принял \
         квартиру № {{apartment}}, расположенную по адресу: {{or_blank object_address}}.",
    ),
    (
        "handover_statement",
        "Участник осмотрел квартиру. Квартира передана в состоянии, соответствующем \
         условиям договора. Ключи и показания приборов учета переданы согласно таблице.",
    ),
    ("handover_claims", "Стороны претензий друг к другу не имеют."),
    ("defect_title", "АКТ осмотра квартиры № {{apartment}}"),
    (
        "defect_intro",
        "Комиссия в составе представителя Застройщика {{or_blank sender_organization}} \
         {{or_blank signer}} и собственника {{or_blank owner}} провела осмотр квартиры \
         № {{apartment}} по адресу: {{or_blank object_address}} и установила следующие дефекты:",
    ),
    (
        "defect_outro",
        "Застройщик обязуется устранить выявленные дефекты в сроки, указанные в ведомости.",
    ),
    (
        "work_intro",
        "Объект: {{object_address}}{{#if apartment}}, квартира № {{apartment}}{{/if}}. \
         По состоянию на {{date_long}} выполнены следующие работы:",
    ),
    ("letter_outgoing", "Исх. № "),
    ("letter_greeting", "{{#if greeting}}{{greeting}}{{else}}Уважаемые господа!{{/if}}"),
    ("letter_closing", "С уважением,"),
    ("city_line", "г. {{city}}"),
    ("signature_line", "________________ / {{or_blank name}} /"),
];

pub struct Snippets {
    handlebars: Handlebars<'static>,
}

impl Snippets {
    pub fn new() -> Result<Self, GenerateError> {
        let mut handlebars = Handlebars::new();
        handlebars.register_escape_fn(handlebars::no_escape);
        handlebars.register_helper("or_blank", Box::new(or_blank_helper));

        for (name, template) in SNIPPETS {
            handlebars.register_template_string(name, template)?;
        }

        Ok(Self { handlebars })
    }

    pub fn render(&self, name: &str, context: &Value) -> Result<String, GenerateError> {
        Ok(self.handlebars.render(name, context)?)
    }

    pub fn names(&self) -> Vec<&'static str> {
        SNIPPETS.iter().map(|(name, _)| *name).collect()
    }
}

/// `{{or_blank field}}`: the value, or a line to fill in by hand
fn or_blank_helper(
    h: &handlebars::Helper,
    _: &Handlebars,
    _: &handlebars::Context,
    _: &mut handlebars::RenderContext,
    out: &mut dyn handlebars::Output,
) -> handlebars::HelperResult {
    let value = h
        .param(0)
        .and_then(|v| v.value().as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(BLANK);
    out.write(value)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_fills_blanks() {
        let snippets = Snippets::new().unwrap();
        let text = snippets
            .render(
                "handover_parties",
                &json!({"apartment": "45", "owner": "Петров П.П.", "signer": "  "}),
            )
            .unwrap();
        assert!(text.contains("квартиру № 45"));
        assert!(text.contains("и Петров П.П., именуемый(ая)"));
        assert!(text.contains(BLANK));
    }

    #[test]
    fn test_no_xml_escaping() {
        let snippets = Snippets::new().unwrap();
        let text = snippets
            .render("defect_title", &json!({"apartment": "5 <A>"}))
            .unwrap();
        assert_eq!(text, "АКТ осмотра квартиры № 5 <A>");
    }

    #[test]
    fn test_greeting_default() {
        let snippets = Snippets::new().unwrap();
        assert_eq!(
            snippets.render("letter_greeting", &json!({})).unwrap(),
            "Уважаемые господа!"
        );
        assert_eq!(
            snippets
                .render("letter_greeting", &json!({"greeting": "Уважаемый Иван Петрович!"}))
                .unwrap(),
            "Уважаемый Иван Петрович!"
        );
    }

    #[test]
    fn test_unknown_snippet_is_template_error() {
        let snippets = Snippets::new().unwrap();
        assert!(matches!(
            snippets.render("nope", &json!({})),
            Err(GenerateError::Template(_))
        ));
    }
}
