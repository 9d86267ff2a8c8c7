//! Schema document model
//!
//! A schema document is a JSON tree. Objects carrying a `type` discriminator
//! become [`SchemaNode`]s; arrays become [`Schema::List`]; every other JSON
//! value is a literal that renders verbatim.
//!
//! Known node kinds get a typed variant. Anything else, including a known
//! kind whose fields fail to parse, is kept as [`SchemaNode::Unknown`] so
//! that serializing the tree again is lossless and the renderer can isolate
//! the bad subtree instead of rejecting the whole document.
//!
//! Nodes are shared through [`Arc`]; edits build new trees that reuse every
//! untouched subtree (see [`edit`]).

pub mod edit;
pub mod widgets;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Number, Value};
use std::sync::Arc;
use thiserror::Error;

use crate::action::ActionDef;
use crate::data_source::Record;

pub use widgets::ensure_widget_ids;

/// Errors raised while reading a schema document
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SchemaError {
    #[error("schema object has no 'type' field")]
    MissingType,

    #[error("schema 'type' must be a string, found {0}")]
    InvalidType(String),

    #[error("invalid JSON: {0}")]
    Json(String),
}

pub type SchemaResult<T> = Result<T, SchemaError>;

/// One position in a schema tree
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Schema {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    Text(String),
    List(Vec<Schema>),
    Node(Arc<SchemaNode>),
}

impl Schema {
    /// Build a schema tree from a JSON value
    pub fn from_value(value: Value) -> SchemaResult<Self> {
        Ok(match value {
            Value::Null => Schema::Null,
            Value::Bool(b) => Schema::Bool(b),
            Value::Number(n) => Schema::Number(n),
            Value::String(s) => Schema::Text(s),
            Value::Array(items) => Schema::List(
                items
                    .into_iter()
                    .map(Schema::from_value)
                    .collect::<SchemaResult<Vec<_>>>()?,
            ),
            Value::Object(map) => Schema::Node(Arc::new(SchemaNode::from_map(map)?)),
        })
    }

    /// Parse a JSON document
    pub fn from_json(json: &str) -> SchemaResult<Self> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| SchemaError::Json(e.to_string()))?;
        Self::from_value(value)
    }

    pub fn to_value(&self) -> Value {
        match self {
            Schema::Null => Value::Null,
            Schema::Bool(b) => Value::Bool(*b),
            Schema::Number(n) => Value::Number(n.clone()),
            Schema::Text(s) => Value::String(s.clone()),
            Schema::List(items) => Value::Array(items.iter().map(Schema::to_value).collect()),
            Schema::Node(node) => node.to_value(),
        }
    }

    pub fn node(node: SchemaNode) -> Self {
        Schema::Node(Arc::new(node))
    }

    pub fn text(content: impl Into<String>) -> Self {
        Schema::Text(content.into())
    }

    pub fn as_node(&self) -> Option<&Arc<SchemaNode>> {
        match self {
            Schema::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Schema::Null)
    }
}

impl From<SchemaNode> for Schema {
    fn from(node: SchemaNode) -> Self {
        Schema::node(node)
    }
}

impl Serialize for Schema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Schema {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Schema::from_value(value).map_err(D::Error::custom)
    }
}

/// Fields shared by every typed node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeBase {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Opaque styling classes, passed through untouched
    #[serde(rename = "className", default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<Map<String, Value>>,

    /// Designer selection handle
    #[serde(rename = "data-obj-id", default, skip_serializing_if = "Option::is_none")]
    pub designer_id: Option<String>,

    /// Fields this node kind does not interpret
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextSchema {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Legacy spelling of `content`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(flatten)]
    pub base: NodeBase,
}

impl TextSchema {
    /// `content` wins over the legacy `value` field
    pub fn display_text(&self) -> &str {
        self.content
            .as_deref()
            .or(self.value.as_deref())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageSchema {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Schema>,
    #[serde(flatten)]
    pub base: NodeBase,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContainerSchema {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Schema>,
    #[serde(flatten)]
    pub base: NodeBase,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ButtonSchema {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<ActionDef>,
    #[serde(flatten)]
    pub base: NodeBase,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormSchema {
    #[serde(rename = "objectName", default, skip_serializing_if = "Option::is_none")]
    pub object_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<FormField>>,
    /// Extra content rendered after the fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Schema>,
    #[serde(rename = "submitLabel", default, skip_serializing_if = "Option::is_none")]
    pub submit_label: Option<String>,
    #[serde(flatten)]
    pub base: NodeBase,
}

/// A form input, or a group of inputs when `fields` is set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormField {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub field_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<FieldOption>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<FormField>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldOption {
    pub label: String,
    pub value: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardSchema {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub widgets: Option<Vec<DashboardWidget>>,
    #[serde(flatten)]
    pub base: NodeBase,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardWidget {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<Schema>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GridSchema {
    #[serde(rename = "objectName", default, skip_serializing_if = "Option::is_none")]
    pub object_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<GridColumn>>,
    /// Inline records, used instead of the data source when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<Record>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Map<String, Value>>,
    #[serde(flatten)]
    pub base: NodeBase,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GridColumn {
    pub field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KanbanSchema {
    #[serde(rename = "objectName", default, skip_serializing_if = "Option::is_none")]
    pub object_name: Option<String>,
    #[serde(rename = "groupBy", default, skip_serializing_if = "Option::is_none")]
    pub group_by: Option<String>,
    /// Card title template, `{field}` or `{{field}}`
    #[serde(rename = "titleFormat", default, skip_serializing_if = "Option::is_none")]
    pub title_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<KanbanColumn>>,
    #[serde(rename = "cardFields", default, skip_serializing_if = "Option::is_none")]
    pub card_fields: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<Record>>,
    #[serde(flatten)]
    pub base: NodeBase,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KanbanColumn {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GallerySchema {
    #[serde(rename = "objectName", default, skip_serializing_if = "Option::is_none")]
    pub object_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<ViewOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<Record>>,
    #[serde(flatten)]
    pub base: NodeBase,
}

impl GallerySchema {
    pub const DEFAULT_IMAGE_FIELD: &'static str = "image";
    pub const DEFAULT_TITLE_FIELD: &'static str = "name";

    fn gallery_options(&self) -> Option<&GalleryOptions> {
        self.options.as_ref().and_then(|o| o.gallery.as_ref())
    }

    pub fn image_field(&self) -> &str {
        self.gallery_options()
            .and_then(|g| g.image_field.as_deref())
            .unwrap_or(Self::DEFAULT_IMAGE_FIELD)
    }

    pub fn title_field(&self) -> &str {
        self.gallery_options()
            .and_then(|g| g.title_field.as_deref())
            .unwrap_or(Self::DEFAULT_TITLE_FIELD)
    }
}

/// View options block (`options.gallery`, ...)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gallery: Option<GalleryOptions>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GalleryOptions {
    #[serde(rename = "imageField", default, skip_serializing_if = "Option::is_none")]
    pub image_field: Option<String>,
    #[serde(rename = "titleField", default, skip_serializing_if = "Option::is_none")]
    pub title_field: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Passthrough node for types without a typed variant
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnknownSchema {
    pub type_name: String,
    /// Parsed `children`, when present and well formed
    pub children: Option<Schema>,
    pub fields: Map<String, Value>,
    /// Why a known kind fell back to passthrough
    pub parse_error: Option<String>,
}

impl UnknownSchema {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            ..Default::default()
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    pub fn with_children(mut self, children: Schema) -> Self {
        self.children = Some(children);
        self
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn field_str(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }
}

/// A typed schema node, discriminated by `type`
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaNode {
    Text(TextSchema),
    Page(PageSchema),
    Container(ContainerSchema),
    Button(ButtonSchema),
    Form(FormSchema),
    Dashboard(DashboardSchema),
    Grid(GridSchema),
    Kanban(KanbanSchema),
    Gallery(GallerySchema),
    Unknown(UnknownSchema),
}

fn typed<T: serde::de::DeserializeOwned>(map: &Map<String, Value>) -> Result<T, String> {
    serde_json::from_value(Value::Object(map.clone())).map_err(|e| e.to_string())
}

impl SchemaNode {
    /// Build a node from a JSON object
    pub fn from_value(value: Value) -> SchemaResult<Self> {
        match value {
            Value::Object(map) => Self::from_map(map),
            other => Err(SchemaError::InvalidType(json_kind(&other).to_string())),
        }
    }

    fn from_map(mut map: Map<String, Value>) -> SchemaResult<Self> {
        let type_name = match map.remove("type") {
            Some(Value::String(t)) => t,
            Some(other) => return Err(SchemaError::InvalidType(json_kind(&other).to_string())),
            None => return Err(SchemaError::MissingType),
        };

        let parsed = match type_name.as_str() {
            "text" => typed(&map).map(SchemaNode::Text),
            "page" => typed(&map).map(SchemaNode::Page),
            "container" => typed(&map).map(SchemaNode::Container),
            "button" => typed(&map).map(SchemaNode::Button),
            "form" => typed(&map).map(SchemaNode::Form),
            "dashboard" => typed(&map).map(SchemaNode::Dashboard),
            "grid" => typed(&map).map(SchemaNode::Grid),
            "kanban" => typed(&map).map(SchemaNode::Kanban),
            "gallery" => typed(&map).map(SchemaNode::Gallery),
            _ => return Ok(SchemaNode::Unknown(Self::passthrough(type_name, map, None))),
        };

        match parsed {
            Ok(node) => Ok(node),
            Err(message) => {
                tracing::warn!(
                    node_type = %type_name,
                    error = %message,
                    "schema node kept as passthrough"
                );
                Ok(SchemaNode::Unknown(Self::passthrough(
                    type_name,
                    map,
                    Some(message),
                )))
            }
        }
    }

    fn passthrough(
        type_name: String,
        mut fields: Map<String, Value>,
        parse_error: Option<String>,
    ) -> UnknownSchema {
        let children = match fields.remove("children") {
            Some(raw) => match Schema::from_value(raw.clone()) {
                Ok(schema) => Some(schema),
                Err(_) => {
                    fields.insert("children".to_string(), raw);
                    None
                }
            },
            None => None,
        };
        UnknownSchema {
            type_name,
            children,
            fields,
            parse_error,
        }
    }

    /// Serialize back to the JSON document form
    pub fn to_value(&self) -> Value {
        let (type_name, body) = match self {
            SchemaNode::Text(n) => ("text", serde_json::to_value(n)),
            SchemaNode::Page(n) => ("page", serde_json::to_value(n)),
            SchemaNode::Container(n) => ("container", serde_json::to_value(n)),
            SchemaNode::Button(n) => ("button", serde_json::to_value(n)),
            SchemaNode::Form(n) => ("form", serde_json::to_value(n)),
            SchemaNode::Dashboard(n) => ("dashboard", serde_json::to_value(n)),
            SchemaNode::Grid(n) => ("grid", serde_json::to_value(n)),
            SchemaNode::Kanban(n) => ("kanban", serde_json::to_value(n)),
            SchemaNode::Gallery(n) => ("gallery", serde_json::to_value(n)),
            SchemaNode::Unknown(n) => {
                let mut map = n.fields.clone();
                if let Some(children) = &n.children {
                    map.insert("children".to_string(), children.to_value());
                }
                map.insert("type".to_string(), Value::String(n.type_name.clone()));
                return Value::Object(map);
            }
        };

        // Typed nodes only hold JSON-representable data
        let mut map = match body {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };
        map.insert("type".to_string(), Value::String(type_name.to_string()));
        Value::Object(map)
    }

    /// The `type` discriminator, possibly namespaced (`ui:badge`)
    pub fn type_name(&self) -> &str {
        match self {
            SchemaNode::Text(_) => "text",
            SchemaNode::Page(_) => "page",
            SchemaNode::Container(_) => "container",
            SchemaNode::Button(_) => "button",
            SchemaNode::Form(_) => "form",
            SchemaNode::Dashboard(_) => "dashboard",
            SchemaNode::Grid(_) => "grid",
            SchemaNode::Kanban(_) => "kanban",
            SchemaNode::Gallery(_) => "gallery",
            SchemaNode::Unknown(n) => &n.type_name,
        }
    }

    pub fn base(&self) -> Option<&NodeBase> {
        match self {
            SchemaNode::Text(n) => Some(&n.base),
            SchemaNode::Page(n) => Some(&n.base),
            SchemaNode::Container(n) => Some(&n.base),
            SchemaNode::Button(n) => Some(&n.base),
            SchemaNode::Form(n) => Some(&n.base),
            SchemaNode::Dashboard(n) => Some(&n.base),
            SchemaNode::Grid(n) => Some(&n.base),
            SchemaNode::Kanban(n) => Some(&n.base),
            SchemaNode::Gallery(n) => Some(&n.base),
            SchemaNode::Unknown(_) => None,
        }
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            SchemaNode::Unknown(n) => n.field_str("id"),
            _ => self.base().and_then(|b| b.id.as_deref()),
        }
    }

    pub fn designer_id(&self) -> Option<&str> {
        match self {
            SchemaNode::Unknown(n) => n.field_str("data-obj-id"),
            _ => self.base().and_then(|b| b.designer_id.as_deref()),
        }
    }

    pub fn class_name(&self) -> Option<&str> {
        match self {
            SchemaNode::Unknown(n) => n.field_str("className"),
            _ => self.base().and_then(|b| b.class_name.as_deref()),
        }
    }

    /// True when `key` equals the node `id` or its `data-obj-id`
    pub fn matches_key(&self, key: &str) -> bool {
        self.id() == Some(key) || self.designer_id() == Some(key)
    }

    /// The primary `children` slot, for kinds that have one
    pub fn children_slot(&self) -> Option<&Schema> {
        match self {
            SchemaNode::Page(n) => n.children.as_ref(),
            SchemaNode::Container(n) => n.children.as_ref(),
            SchemaNode::Form(n) => n.children.as_ref(),
            SchemaNode::Unknown(n) => n.children.as_ref(),
            _ => None,
        }
    }

    /// Whether this kind can hold a `children` slot
    pub fn accepts_children(&self) -> bool {
        matches!(
            self,
            SchemaNode::Page(_)
                | SchemaNode::Container(_)
                | SchemaNode::Form(_)
                | SchemaNode::Unknown(_)
        )
    }

    /// Copy of this node with `children` replaced; `None` for leaf kinds
    pub fn with_children(&self, children: Schema) -> Option<SchemaNode> {
        let mut node = self.clone();
        match &mut node {
            SchemaNode::Page(n) => n.children = Some(children),
            SchemaNode::Container(n) => n.children = Some(children),
            SchemaNode::Form(n) => n.children = Some(children),
            SchemaNode::Unknown(n) => n.children = Some(children),
            _ => return None,
        }
        Some(node)
    }

    /// Every direct child schema, in document order
    pub fn children(&self) -> Vec<&Schema> {
        match self {
            SchemaNode::Dashboard(n) => n
                .widgets
                .iter()
                .flatten()
                .filter_map(|w| w.component.as_ref())
                .collect(),
            _ => self.children_slot().into_iter().collect(),
        }
    }

    /// Rebuild this node with each child passed through `f`
    ///
    /// `f` returns `Some(replacement)` to change a child. The result is
    /// `None` when no child changed, so callers can keep the existing `Arc`.
    pub fn map_children(
        &self,
        f: &mut dyn FnMut(&Schema) -> Option<Schema>,
    ) -> Option<SchemaNode> {
        if let SchemaNode::Dashboard(dashboard) = self {
            let widgets = dashboard.widgets.as_ref()?;
            let mut changed = false;
            let mapped: Vec<DashboardWidget> = widgets
                .iter()
                .map(|widget| match widget.component.as_ref().and_then(|c| f(c)) {
                    Some(replacement) => {
                        changed = true;
                        DashboardWidget {
                            component: Some(replacement),
                            ..widget.clone()
                        }
                    }
                    None => widget.clone(),
                })
                .collect();
            if !changed {
                return None;
            }
            return Some(SchemaNode::Dashboard(DashboardSchema {
                widgets: Some(mapped),
                ..dashboard.clone()
            }));
        }

        let replacement = f(self.children_slot()?)?;
        self.with_children(replacement)
    }
}

impl Serialize for SchemaNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SchemaNode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        SchemaNode::from_value(value).map_err(D::Error::custom)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
