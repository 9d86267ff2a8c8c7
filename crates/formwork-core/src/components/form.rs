use async_trait::async_trait;

use super::apply_base;
use super::format::{display_value, humanize};
use crate::render::{ComponentRenderer, Element, Output, RenderContext, RenderError, RenderResult};
use crate::schema::{FormField, SchemaNode};

/// `form`: one labelled control per field, nested groups as fieldsets,
/// then the `children` slot and a submit button
pub struct FormRenderer;

#[async_trait]
impl ComponentRenderer for FormRenderer {
    async fn render(&self, node: &SchemaNode, ctx: &RenderContext) -> RenderResult<Output> {
        let SchemaNode::Form(form) = node else {
            return Err(RenderError::mismatch("form", node));
        };

        let mut root = apply_base(Element::new("form").class("formwork-form"), node);
        if let Some(object) = &form.object_name {
            root = root.attr("data-object", object.clone());
        }

        for field in form.fields.iter().flatten() {
            root = root.child(render_field(field, ""));
        }

        root = root.child(ctx.render_slot(form.children.as_ref()).await);

        let submit = match &form.submit_label {
            Some(label) => label.clone(),
            None => ctx.t("form.submit", "Submit"),
        };
        root = root.child(
            Element::new("button")
                .class("formwork-submit")
                .attr("type", "submit")
                .text(submit)
                .into(),
        );
        Ok(root.into())
    }
}

fn render_field(field: &FormField, prefix: &str) -> Output {
    let name = if prefix.is_empty() {
        field.name.clone()
    } else {
        format!("{}.{}", prefix, field.name)
    };
    let label = field.label.clone().unwrap_or_else(|| humanize(&field.name));

    if let Some(group) = &field.fields {
        return Element::new("fieldset")
            .class("formwork-fieldset")
            .attr("data-group", name.clone())
            .child(Element::new("legend").text(label).into())
            .children(group.iter().map(|child| render_field(child, &name)))
            .into();
    }

    let required = field.required.unwrap_or(false);
    let mut label_el = Element::new("label").attr("for", name.clone()).text(label);
    if required {
        label_el = label_el.child(Element::new("span").class("required").text("*").into());
    }

    let field_type = field.field_type.as_deref().unwrap_or("text");
    let mut control = match (field_type, &field.options) {
        (_, Some(options)) => Element::new("select").children(options.iter().map(|option| {
            Output::from(
                Element::new("option")
                    .attr("value", display_value(&option.value).unwrap_or_default())
                    .text(option.label.clone()),
            )
        })),
        ("textarea", None) => Element::new("textarea"),
        (input_type, None) => Element::new("input").attr("type", input_type),
    };
    control = control.attr("id", name.clone()).attr("name", name);
    if required {
        control = control.attr("required", "required");
    }

    Element::new("div")
        .class("formwork-field")
        .attr("data-field-type", field_type)
        .child(label_el.into())
        .child(control.into())
        .into()
}

#[cfg(test)]
mod tests {
    use super::super::register_builtin_components;
    use crate::registry::ComponentRegistry;
    use crate::render::{render, RenderContext, StaticTranslator};
    use crate::schema::Schema;
    use serde_json::json;
    use std::sync::Arc;

    fn ctx() -> RenderContext {
        let registry = ComponentRegistry::new();
        register_builtin_components(&registry);
        RenderContext::new(Arc::new(registry))
    }

    #[tokio::test]
    async fn test_fields_groups_and_options() {
        let schema = Schema::from_value(json!({
            "type": "form",
            "objectName": "contact",
            "fields": [
                {"name": "email", "type": "email", "required": true},
                {"name": "address", "fields": [{"name": "city"}]},
                {"name": "tier", "label": "Tier", "options": [{"label": "Gold", "value": 1}]}
            ],
            "children": [{"type": "text", "content": "Fine print"}]
        }))
        .unwrap();
        let out = render(&schema, &ctx()).await;

        let inputs = out.find_by_tag("input");
        assert_eq!(inputs.len(), 2);
        assert_eq!(inputs[0].attr_value("type"), Some("email"));
        assert_eq!(inputs[0].attr_value("required"), Some("required"));
        assert_eq!(inputs[1].attr_value("name"), Some("address.city"));

        let legend = out.find_by_tag("legend");
        assert_eq!(legend[0].children, vec![crate::render::Output::text("Address")]);

        let options = out.find_by_tag("option");
        assert_eq!(options[0].attr_value("value"), Some("1"));

        let text = out.to_text();
        assert!(text.contains("Fine print"));
        assert!(text.ends_with("Submit"));
    }

    #[tokio::test]
    async fn test_submit_label_is_translated() {
        let translator = StaticTranslator::new("de", "en").with("de", "form.submit", "Absenden");
        let ctx = ctx().with_translator(Arc::new(translator));
        let schema = Schema::from_value(json!({"type": "form"})).unwrap();
        let out = render(&schema, &ctx).await;
        assert!(out.to_html().contains(">Absenden</button>"));
    }
}
