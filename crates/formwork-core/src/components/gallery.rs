use async_trait::async_trait;
use serde_json::Value;

use super::format::{field_display, initial, lookup};
use super::{apply_base, load_records};
use crate::data_source::{record_id, Query, Record};
use crate::render::{ComponentRenderer, Element, Output, RenderContext, RenderError, RenderResult};
use crate::schema::SchemaNode;

/// `gallery`: one figure per record
///
/// The image comes from `options.gallery.imageField` (default `image`) and
/// the caption from `titleField` (default `name`). Records without an image
/// show a placeholder with the caption's initial.
pub struct GalleryRenderer;

#[async_trait]
impl ComponentRenderer for GalleryRenderer {
    async fn render(&self, node: &SchemaNode, ctx: &RenderContext) -> RenderResult<Output> {
        let SchemaNode::Gallery(gallery) = node else {
            return Err(RenderError::mismatch("gallery", node));
        };

        let records = load_records(
            ctx,
            "gallery",
            gallery.object_name.as_deref(),
            gallery.data.as_ref(),
            &Query::default(),
        )
        .await?;

        let image_field = gallery.image_field();
        let title_field = gallery.title_field();

        let mut root = apply_base(Element::new("div").class("formwork-gallery"), node);
        if let Some(object) = &gallery.object_name {
            root = root.attr("data-object", object.clone());
        }
        for record in &records {
            root = root.child(render_item(record, image_field, title_field, ctx));
        }
        Ok(root.into())
    }
}

/// Image URL from a string field or an `{url}` / `{src}` object
fn image_url(record: &Record, field: &str) -> Option<String> {
    match lookup(record, field)? {
        Value::String(url) if !url.trim().is_empty() => Some(url.clone()),
        Value::Object(map) => map
            .get("url")
            .or_else(|| map.get("src"))
            .and_then(Value::as_str)
            .filter(|url| !url.trim().is_empty())
            .map(str::to_string),
        _ => None,
    }
}

fn render_item(
    record: &Record,
    image_field: &str,
    title_field: &str,
    ctx: &RenderContext,
) -> Output {
    let title = field_display(record, title_field)
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| ctx.t("gallery.untitled", "Untitled"));

    let visual = match image_url(record, image_field) {
        Some(url) => Element::new("img")
            .attr("src", url)
            .attr("alt", title.clone())
            .into_output(),
        None => Element::new("div")
            .class("formwork-gallery-placeholder")
            .attr("aria-hidden", "true")
            .text(initial(&title))
            .into_output(),
    };

    let mut figure = Element::new("figure").class("formwork-gallery-item");
    if let Some(id) = record_id(record) {
        figure = figure.attr("data-record-id", id);
    }
    figure
        .child(visual)
        .child(Element::new("figcaption").text(title).into())
        .into()
}
