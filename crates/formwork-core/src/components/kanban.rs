use async_trait::async_trait;

use super::format::{card_title, field_display, humanize};
use super::{apply_base, load_records};
use crate::data_source::{record_id, Query, Record};
use crate::render::{ComponentRenderer, Element, Output, RenderContext, RenderError, RenderResult};
use crate::schema::{KanbanSchema, SchemaNode};

const UNCATEGORIZED: &str = "__uncategorized";

/// `kanban`: records grouped into columns by the `groupBy` field
///
/// Columns come from `columns` when given, otherwise from the distinct
/// group values in record order. Records whose value matches no column land
/// in a trailing "Uncategorized" column.
pub struct KanbanRenderer;

struct Column<'a> {
    id: String,
    title: String,
    cards: Vec<&'a Record>,
}

#[async_trait]
impl ComponentRenderer for KanbanRenderer {
    async fn render(&self, node: &SchemaNode, ctx: &RenderContext) -> RenderResult<Output> {
        let SchemaNode::Kanban(kanban) = node else {
            return Err(RenderError::mismatch("kanban", node));
        };
        let group_by = kanban
            .group_by
            .as_deref()
            .filter(|g| !g.is_empty())
            .ok_or_else(|| RenderError::invalid("kanban", "'groupBy' is required"))?;

        let records = load_records(
            ctx,
            "kanban",
            kanban.object_name.as_deref(),
            kanban.data.as_ref(),
            &Query::default(),
        )
        .await?;

        let columns = group(kanban, group_by, &records, ctx);

        let mut board = apply_base(Element::new("div").class("formwork-kanban"), node)
            .attr("data-group-by", group_by);
        if let Some(object) = &kanban.object_name {
            board = board.attr("data-object", object.clone());
        }

        for column in columns {
            let count = column.cards.len();
            let cards = column
                .cards
                .iter()
                .map(|record| render_card(kanban, record, ctx));
            board = board.child(
                Element::new("section")
                    .class("formwork-kanban-column")
                    .attr("data-column-id", column.id)
                    .child(
                        Element::new("h3")
                            .class("formwork-kanban-column-title")
                            .text(column.title)
                            .into(),
                    )
                    .child(
                        Element::new("span")
                            .class("formwork-kanban-count")
                            .text(count.to_string())
                            .into(),
                    )
                    .child(
                        Element::new("div")
                            .class("formwork-kanban-cards")
                            .children(cards)
                            .into(),
                    )
                    .into(),
            );
        }
        Ok(board.into())
    }
}

fn group<'a>(
    kanban: &KanbanSchema,
    group_by: &str,
    records: &'a [Record],
    ctx: &RenderContext,
) -> Vec<Column<'a>> {
    let mut columns: Vec<Column<'a>> = match &kanban.columns {
        Some(explicit) => explicit
            .iter()
            .map(|c| Column {
                id: c.id.clone(),
                title: c.title.clone().unwrap_or_else(|| humanize(&c.id)),
                cards: Vec::new(),
            })
            .collect(),
        None => Vec::new(),
    };
    let derive = kanban.columns.is_none();
    let mut uncategorized: Vec<&'a Record> = Vec::new();

    for record in records {
        let value = field_display(record, group_by).filter(|v| !v.is_empty());
        let Some(value) = value else {
            uncategorized.push(record);
            continue;
        };
        if let Some(column) = columns.iter_mut().find(|c| c.id == value) {
            column.cards.push(record);
        } else if derive {
            columns.push(Column {
                title: value.clone(),
                id: value,
                cards: vec![record],
            });
        } else {
            uncategorized.push(record);
        }
    }

    if !uncategorized.is_empty() {
        columns.push(Column {
            id: UNCATEGORIZED.to_string(),
            title: ctx.t("kanban.uncategorized", "Uncategorized"),
            cards: uncategorized,
        });
    }
    columns
}

fn render_card(kanban: &KanbanSchema, record: &Record, ctx: &RenderContext) -> Output {
    let title = card_title(record, kanban.title_format.as_deref())
        .unwrap_or_else(|| ctx.t("kanban.untitled", "Untitled"));

    let mut card = Element::new("article").class("formwork-kanban-card");
    if let Some(id) = record_id(record) {
        card = card.attr("data-record-id", id);
    }
    card = card.child(
        Element::new("h4")
            .class("formwork-kanban-card-title")
            .text(title)
            .into(),
    );
    for field in kanban.card_fields.iter().flatten() {
        if let Some(value) = field_display(record, field) {
            card = card.child(
                Element::new("p")
                    .class("formwork-kanban-card-field")
                    .attr("data-field", field.clone())
                    .text(value)
                    .into(),
            );
        }
    }
    card.into()
}
