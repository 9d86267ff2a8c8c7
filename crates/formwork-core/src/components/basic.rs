use async_trait::async_trait;

use super::apply_base;
use crate::render::{ComponentRenderer, Element, Output, RenderContext, RenderError, RenderResult};
use crate::schema::SchemaNode;

/// `text`: bare text, or a `span` when the node carries an id, class or style
pub struct TextRenderer;

#[async_trait]
impl ComponentRenderer for TextRenderer {
    async fn render(&self, node: &SchemaNode, _ctx: &RenderContext) -> RenderResult<Output> {
        let SchemaNode::Text(text) = node else {
            return Err(RenderError::mismatch("text", node));
        };
        let content = text.display_text();
        let base = &text.base;
        if base.id.is_none()
            && base.class_name.is_none()
            && base.designer_id.is_none()
            && base.style.is_none()
        {
            return Ok(Output::text(content));
        }
        Ok(apply_base(Element::new("span"), node).text(content).into())
    }
}

pub struct PageRenderer;

#[async_trait]
impl ComponentRenderer for PageRenderer {
    async fn render(&self, node: &SchemaNode, ctx: &RenderContext) -> RenderResult<Output> {
        let SchemaNode::Page(page) = node else {
            return Err(RenderError::mismatch("page", node));
        };

        let mut root = apply_base(Element::new("div").class("formwork-page"), node)
            .attr("data-theme", ctx.theme().mode.as_str());

        if page.title.is_some() || page.description.is_some() {
            let mut header = Element::new("header");
            if let Some(title) = &page.title {
                header = header.child(Element::new("h1").text(title).into());
            }
            if let Some(description) = &page.description {
                header = header.child(
                    Element::new("p")
                        .class("formwork-page-description")
                        .text(description)
                        .into(),
                );
            }
            root = root.child(header.into());
        }

        let body = ctx.render_slot(page.children.as_ref()).await;
        root = root.child(Element::new("main").child(body).into());
        Ok(root.into())
    }
}

pub struct ContainerRenderer;

#[async_trait]
impl ComponentRenderer for ContainerRenderer {
    async fn render(&self, node: &SchemaNode, ctx: &RenderContext) -> RenderResult<Output> {
        let SchemaNode::Container(container) = node else {
            return Err(RenderError::mismatch("container", node));
        };
        let body = ctx.render_slot(container.children.as_ref()).await;
        Ok(apply_base(Element::new("div").class("formwork-container"), node)
            .child(body)
            .into())
    }
}

/// `button`: the action travels as JSON in `data-action` for the host to
/// dispatch through the action runner
pub struct ButtonRenderer;

#[async_trait]
impl ComponentRenderer for ButtonRenderer {
    async fn render(&self, node: &SchemaNode, ctx: &RenderContext) -> RenderResult<Output> {
        let SchemaNode::Button(button) = node else {
            return Err(RenderError::mismatch("button", node));
        };

        let label = match &button.label {
            Some(label) => label.clone(),
            None => ctx.t("button.label", "Button"),
        };

        let mut element = apply_base(Element::new("button").class("formwork-button"), node)
            .attr("type", "button");
        if let Some(action) = &button.action {
            let encoded = serde_json::to_string(action)
                .map_err(|e| RenderError::invalid("button", e.to_string()))?;
            element = element
                .attr("data-action", encoded)
                .attr("data-action-type", action.action_type.clone());
            if let Some(confirm) = &action.confirm_text {
                element = element.attr("data-confirm", confirm.clone());
            }
        }
        Ok(element.text(label).into())
    }
}

#[cfg(test)]
mod tests {
    use super::super::register_builtin_components;
    use crate::registry::ComponentRegistry;
    use crate::render::{render, RenderContext, Theme, ThemeMode};
    use crate::schema::Schema;
    use serde_json::json;
    use std::sync::Arc;

    fn ctx() -> RenderContext {
        let registry = ComponentRegistry::new();
        register_builtin_components(&registry);
        RenderContext::new(Arc::new(registry))
    }

    async fn html(value: serde_json::Value, ctx: &RenderContext) -> String {
        render(&Schema::from_value(value).unwrap(), ctx).await.to_html()
    }

    #[tokio::test]
    async fn test_text_bare_and_wrapped() {
        let ctx = ctx();
        assert_eq!(
            html(json!({"type": "text", "content": "a < b", "value": "old"}), &ctx).await,
            "a &lt; b"
        );
        assert_eq!(
            html(json!({"type": "text", "value": "legacy", "className": "muted"}), &ctx).await,
            "<span class=\"muted\">legacy</span>"
        );
    }

    #[tokio::test]
    async fn test_page_with_nested_children() {
        let ctx = ctx().with_theme(Theme::new(ThemeMode::Dark));
        let out = html(
            json!({
                "type": "page",
                "title": "Orders",
                "children": [
                    {"type": "container", "children": [{"type": "text", "content": "inner"}]},
                    "tail"
                ]
            }),
            &ctx,
        )
        .await;
        assert_eq!(
            out,
            "<div class=\"formwork-page\" data-theme=\"dark\"><header><h1>Orders</h1></header>\
             <main><div class=\"formwork-container\">inner</div>tail</main></div>"
        );
    }

    #[tokio::test]
    async fn test_button_carries_action() {
        let ctx = ctx();
        let out = html(
            json!({
                "type": "button",
                "label": "Delete",
                "action": {"type": "delete", "params": {"id": "1"}, "confirmText": "Sure?"}
            }),
            &ctx,
        )
        .await;
        assert!(out.contains("data-action-type=\"delete\""));
        assert!(out.contains("data-confirm=\"Sure?\""));
        assert!(out.contains("&quot;confirmText&quot;:&quot;Sure?&quot;"));
        assert!(out.ends_with(">Delete</button>"));
    }

    #[tokio::test]
    async fn test_button_default_label() {
        let ctx = ctx();
        let out = html(json!({"type": "button"}), &ctx).await;
        assert_eq!(
            out,
            "<button class=\"formwork-button\" type=\"button\">Button</button>"
        );
    }
}
