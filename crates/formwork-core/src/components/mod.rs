//! Built-in components
//!
//! A small set of renderers covering the node kinds the schema model types:
//! layout (`page`, `container`), content (`text`, `button`), input (`form`)
//! and data views (`dashboard`, `grid`, `kanban`, `gallery`).
//!
//! Register them with [`register_builtin_components`]; hosts can override
//! any of them by registering the same type afterwards.

mod basic;
mod dashboard;
pub mod format;
mod form;
mod gallery;
mod grid;
mod kanban;

pub use basic::{ButtonRenderer, ContainerRenderer, PageRenderer, TextRenderer};
pub use dashboard::DashboardRenderer;
pub use form::FormRenderer;
pub use gallery::GalleryRenderer;
pub use grid::GridRenderer;
pub use kanban::KanbanRenderer;

use serde_json::{Map, Value};
use std::sync::Arc;

use crate::data_source::{Query, Record};
use crate::registry::{ComponentMeta, ComponentRegistry, InputDescriptor, InputKind};
use crate::render::{Element, RenderContext, RenderError, RenderResult};
use crate::schema::SchemaNode;

/// Register every built-in renderer with its designer metadata
pub fn register_builtin_components(registry: &ComponentRegistry) {
    registry.register(
        "text",
        Arc::new(TextRenderer),
        Some(
            ComponentMeta::new("Text")
                .icon("type")
                .category("basic")
                .input(InputDescriptor::new("content", InputKind::String).label("Content"))
                .default_prop("content", "Text"),
        ),
    );
    registry.register(
        "page",
        Arc::new(PageRenderer),
        Some(
            ComponentMeta::new("Page")
                .icon("file")
                .category("layout")
                .input(InputDescriptor::new("title", InputKind::String).label("Title"))
                .input(InputDescriptor::new("description", InputKind::String))
                .input(InputDescriptor::new("children", InputKind::Slot))
                .default_prop("children", Value::Array(Vec::new())),
        ),
    );
    registry.register(
        "container",
        Arc::new(ContainerRenderer),
        Some(
            ComponentMeta::new("Container")
                .icon("square")
                .category("layout")
                .input(InputDescriptor::new("children", InputKind::Slot))
                .default_prop("children", Value::Array(Vec::new())),
        ),
    );
    registry.register(
        "button",
        Arc::new(ButtonRenderer),
        Some(
            ComponentMeta::new("Button")
                .icon("mouse-pointer")
                .category("basic")
                .input(InputDescriptor::new("label", InputKind::String).label("Label"))
                .input(InputDescriptor::new("action", InputKind::Object).label("Action"))
                .default_prop("label", "Button"),
        ),
    );
    registry.register(
        "form",
        Arc::new(FormRenderer),
        Some(
            ComponentMeta::new("Form")
                .icon("clipboard")
                .category("data")
                .input(InputDescriptor::new("objectName", InputKind::String).label("Object"))
                .input(InputDescriptor::new("fields", InputKind::Array).label("Fields"))
                .input(InputDescriptor::new("submitLabel", InputKind::String))
                .input(InputDescriptor::new("children", InputKind::Slot))
                .default_prop("fields", Value::Array(Vec::new())),
        ),
    );
    registry.register(
        "dashboard",
        Arc::new(DashboardRenderer),
        Some(
            ComponentMeta::new("Dashboard")
                .icon("layout-dashboard")
                .category("data")
                .input(InputDescriptor::new("title", InputKind::String))
                .input(InputDescriptor::new("columns", InputKind::Number).default_value(3))
                .input(InputDescriptor::new("widgets", InputKind::Array))
                .default_prop("widgets", Value::Array(Vec::new())),
        ),
    );
    registry.register(
        "grid",
        Arc::new(GridRenderer),
        Some(
            ComponentMeta::new("Grid")
                .icon("table")
                .category("data")
                .input(
                    InputDescriptor::new("objectName", InputKind::String)
                        .label("Object")
                        .required(),
                )
                .input(InputDescriptor::new("columns", InputKind::Array))
                .input(InputDescriptor::new("filter", InputKind::Object)),
        ),
    );
    registry.register(
        "kanban",
        Arc::new(KanbanRenderer),
        Some(
            ComponentMeta::new("Kanban")
                .icon("columns")
                .category("data")
                .input(
                    InputDescriptor::new("objectName", InputKind::String)
                        .label("Object")
                        .required(),
                )
                .input(
                    InputDescriptor::new("groupBy", InputKind::String)
                        .label("Group by")
                        .required(),
                )
                .input(
                    InputDescriptor::new("titleFormat", InputKind::String)
                        .description("Card title template, e.g. {subject} or {{subject}}"),
                )
                .input(InputDescriptor::new("columns", InputKind::Array))
                .input(InputDescriptor::new("cardFields", InputKind::Array)),
        ),
    );
    registry.register(
        "gallery",
        Arc::new(GalleryRenderer),
        Some(
            ComponentMeta::new("Gallery")
                .icon("image")
                .category("data")
                .input(
                    InputDescriptor::new("objectName", InputKind::String)
                        .label("Object")
                        .required(),
                )
                .input(
                    InputDescriptor::new("options", InputKind::Object)
                        .description("options.gallery.imageField / titleField"),
                ),
        ),
    );
}

/// Copy `id`, `className`, `data-obj-id` and `style` onto the element
pub(crate) fn apply_base(mut element: Element, node: &SchemaNode) -> Element {
    if let Some(class) = node.class_name() {
        element = element.class(class);
    }
    if let Some(id) = node.id() {
        element = element.attr("id", id);
    }
    if let Some(designer_id) = node.designer_id() {
        element = element.attr("data-obj-id", designer_id);
    }
    if let Some(style) = node.base().and_then(|b| b.style.as_ref()) {
        let css = style_to_css(style);
        if !css.is_empty() {
            element = element.attr("style", css);
        }
    }
    element
}

fn style_to_css(style: &Map<String, Value>) -> String {
    style
        .iter()
        .filter_map(|(name, value)| {
            let value = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                _ => return None,
            };
            Some(format!("{}: {};", kebab_case(name), value))
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn kebab_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            out.push('-');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Records for a data-bound view: inline `data` when present, otherwise
/// the context data source
pub(crate) async fn load_records(
    ctx: &RenderContext,
    type_name: &str,
    object_name: Option<&str>,
    inline: Option<&Vec<Record>>,
    query: &Query,
) -> RenderResult<Vec<Record>> {
    if let Some(inline) = inline {
        return Ok(query.apply(inline));
    }
    let object = object_name.ok_or_else(|| {
        RenderError::invalid(type_name, "either 'objectName' or 'data' is required")
    })?;
    let data_source = ctx.require_data_source()?;
    Ok(data_source.find(object, query).await?)
}
