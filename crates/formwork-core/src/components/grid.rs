use async_trait::async_trait;

use super::format::{field_display, humanize};
use super::{apply_base, load_records};
use crate::data_source::{record_id, Query, Record};
use crate::render::{ComponentRenderer, Element, Output, RenderContext, RenderError, RenderResult};
use crate::schema::{GridColumn, SchemaNode};

/// `grid`: records as a table, from inline `data` or the data source
pub struct GridRenderer;

#[async_trait]
impl ComponentRenderer for GridRenderer {
    async fn render(&self, node: &SchemaNode, ctx: &RenderContext) -> RenderResult<Output> {
        let SchemaNode::Grid(grid) = node else {
            return Err(RenderError::mismatch("grid", node));
        };

        let query = Query {
            filter: grid.filter.clone().unwrap_or_default(),
            ..Query::default()
        };
        let records = load_records(
            ctx,
            "grid",
            grid.object_name.as_deref(),
            grid.data.as_ref(),
            &query,
        )
        .await?;

        let columns = match &grid.columns {
            Some(columns) if !columns.is_empty() => columns.clone(),
            _ => derive_columns(&records),
        };

        let header = Element::new("tr").children(columns.iter().map(|column| {
            let label = column.label.clone().unwrap_or_else(|| humanize(&column.field));
            Output::from(Element::new("th").attr("data-field", column.field.clone()).text(label))
        }));

        let rows = records.iter().map(|record| {
            let mut row = Element::new("tr");
            if let Some(id) = record_id(record) {
                row = row.attr("data-record-id", id);
            }
            row.children(columns.iter().map(|column| {
                let cell = field_display(record, &column.field).unwrap_or_default();
                Output::from(Element::new("td").text(cell))
            }))
            .into_output()
        });

        let mut root = apply_base(Element::new("div").class("formwork-grid"), node);
        if let Some(object) = &grid.object_name {
            root = root.attr("data-object", object.clone());
        }
        root = root.child(
            Element::new("table")
                .child(Element::new("thead").child(header.into()).into())
                .child(Element::new("tbody").children(rows).into())
                .into(),
        );
        if records.is_empty() {
            root = root.child(
                Element::new("p")
                    .class("formwork-empty")
                    .text(ctx.t("grid.empty", "No records"))
                    .into(),
            );
        }
        Ok(root.into())
    }
}

/// Columns from the union of record keys, in first-seen order
fn derive_columns(records: &[Record]) -> Vec<GridColumn> {
    let mut seen: Vec<String> = Vec::new();
    for record in records {
        for key in record.keys() {
            if !seen.contains(key) {
                seen.push(key.clone());
            }
        }
    }
    seen.into_iter()
        .map(|field| GridColumn {
            field,
            ..GridColumn::default()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::super::register_builtin_components;
    use crate::registry::ComponentRegistry;
    use crate::render::{render, RenderContext};
    use crate::schema::Schema;
    use crate::test_support::MockDataSource;
    use serde_json::json;
    use std::sync::Arc;

    fn registry() -> Arc<ComponentRegistry> {
        let registry = ComponentRegistry::new();
        register_builtin_components(&registry);
        Arc::new(registry)
    }

    #[tokio::test]
    async fn test_grid_from_data_source_with_filter() {
        let ds = Arc::new(MockDataSource::new());
        ds.seed(
            "orders",
            vec![
                json!({"id": "1", "customer": "Ada", "status": "open"}),
                json!({"id": "2", "customer": "Linus", "status": "done"}),
            ],
        );
        let ctx = RenderContext::new(registry()).with_data_source(ds.clone());

        let schema = Schema::from_value(json!({
            "type": "grid",
            "objectName": "orders",
            "columns": [{"field": "customer", "label": "Customer"}],
            "filter": {"status": "open"}
        }))
        .unwrap();
        let out = render(&schema, &ctx).await;

        let rows = out.find_by_tag("tr");
        assert_eq!(rows.len(), 2, "header plus one matching row");
        assert_eq!(rows[1].attr_value("data-record-id"), Some("1"));
        assert!(out.to_html().contains("<td>Ada</td>"));
        assert_eq!(ds.stats().find_calls, 1);
    }

    #[tokio::test]
    async fn test_inline_data_derives_columns() {
        let ctx = RenderContext::new(registry());
        let schema = Schema::from_value(json!({
            "type": "grid",
            "data": [{"name": "A"}, {"name": "B", "due_date": "2024-01-01"}]
        }))
        .unwrap();
        let out = render(&schema, &ctx).await;
        let headers: Vec<String> = out
            .find_by_tag("th")
            .iter()
            .map(|th| th.children.iter().map(|c| c.text_content()).collect())
            .collect();
        assert_eq!(headers, vec!["Name", "Due date"]);
    }

    #[tokio::test]
    async fn test_missing_data_source_is_an_error_output() {
        let ctx = RenderContext::new(registry());
        let schema = Schema::from_value(json!({"type": "grid", "objectName": "orders"})).unwrap();
        let out = render(&schema, &ctx).await;
        assert_eq!(out.errors(), vec![("grid", "no data source available")]);
    }

    #[tokio::test]
    async fn test_empty_result_shows_message() {
        let ds = Arc::new(MockDataSource::new());
        ds.declare("orders");
        let ctx = RenderContext::new(registry()).with_data_source(ds);
        let schema = Schema::from_value(json!({"type": "grid", "objectName": "orders"})).unwrap();
        let out = render(&schema, &ctx).await;
        assert!(out.to_text().contains("No records"));
    }
}
