use async_trait::async_trait;

use super::apply_base;
use crate::render::{ComponentRenderer, Element, Output, RenderContext, RenderError, RenderResult};
use crate::schema::SchemaNode;

/// `dashboard`: a grid of widget sections, each rendering its component
///
/// Widgets without an id get a generated one before rendering, so the
/// `data-widget-id` attributes are stable across renders.
pub struct DashboardRenderer;

#[async_trait]
impl ComponentRenderer for DashboardRenderer {
    async fn render(&self, node: &SchemaNode, ctx: &RenderContext) -> RenderResult<Output> {
        let SchemaNode::Dashboard(dashboard) = node else {
            return Err(RenderError::mismatch("dashboard", node));
        };
        let normalized = dashboard.with_widget_ids();
        let dashboard = normalized.as_ref().unwrap_or(dashboard);

        let mut root = apply_base(Element::new("div").class("formwork-dashboard"), node);
        if let Some(columns) = dashboard.columns {
            root = root.attr("data-columns", columns.to_string());
        }
        if let Some(title) = &dashboard.title {
            root = root.child(Element::new("h2").text(title).into());
        }

        for widget in dashboard.widgets.iter().flatten() {
            let mut section = Element::new("section").class("formwork-widget");
            if let Some(id) = &widget.id {
                section = section.attr("data-widget-id", id.clone());
            }
            if let Some(title) = &widget.title {
                section = section.child(
                    Element::new("h3")
                        .class("formwork-widget-title")
                        .text(title)
                        .into(),
                );
            }
            section = section.child(ctx.render_slot(widget.component.as_ref()).await);
            root = root.child(section.into());
        }

        Ok(root.into())
    }
}

#[cfg(test)]
mod tests {
    use super::super::register_builtin_components;
    use crate::registry::ComponentRegistry;
    use crate::render::{render, RenderContext};
    use crate::schema::Schema;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_widgets_get_ids_and_failures_stay_local() {
        let registry = ComponentRegistry::new();
        register_builtin_components(&registry);
        let ctx = RenderContext::new(Arc::new(registry));

        let schema = Schema::from_value(json!({
            "type": "dashboard",
            "title": "Ops",
            "columns": 2,
            "widgets": [
                {"title": "Revenue", "component": {"type": "text", "content": "42k"}},
                {"id": "custom", "title": "Broken", "component": {"type": "grid"}},
                {"title": "Later", "component": {"type": "text", "content": "ok"}}
            ]
        }))
        .unwrap();

        let out = render(&schema, &ctx).await;
        let ids: Vec<_> = out
            .find_by_class("formwork-widget")
            .iter()
            .filter_map(|w| w.attr_value("data-widget-id"))
            .collect();
        assert_eq!(ids, vec!["widget-0", "custom", "widget-2"]);

        // The grid has neither data nor a data source
        let errors = out.errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].0, "grid");

        let text = out.to_text();
        assert!(text.contains("42k"));
        assert!(text.contains("ok"));
    }
}
