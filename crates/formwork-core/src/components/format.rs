//! Field formatting shared by the data-bound components

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::data_source::Record;

/// `{{ field }}` or `{field}`, with dotted paths
static FIELD_TEMPLATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{\s*([\w.]+)\s*\}\}|\{\s*([\w.]+)\s*\}")
        .expect("field template pattern is valid")
});

/// Value at a dotted path (`customer.name`)
pub fn lookup<'a>(record: &'a Record, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let first = parts.next()?;
    parts.try_fold(record.get(first)?, |value, part| value.get(part))
}

/// Display form of a field value; `None` for null and missing values
pub fn display_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(display_value)
                .collect::<Vec<_>>()
                .join(", "),
        ),
        Value::Object(_) => Some(value.to_string()),
    }
}

pub fn field_display(record: &Record, path: &str) -> Option<String> {
    lookup(record, path).and_then(display_value)
}

/// Substitute record fields into a template; missing fields become empty
pub fn interpolate(template: &str, record: &Record) -> String {
    FIELD_TEMPLATE_RE
        .replace_all(template, |caps: &regex::Captures<'_>| {
            let path = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map(|m| m.as_str())
                .unwrap_or_default();
            field_display(record, path).unwrap_or_default()
        })
        .into_owned()
}

/// Card title: the interpolated template, then `name`, then `title`
///
/// Returns `None` when nothing yields a non-blank title.
pub fn card_title(record: &Record, title_format: Option<&str>) -> Option<String> {
    let formatted = title_format
        .map(|template| interpolate(template, record))
        .filter(|s| !s.trim().is_empty());
    formatted
        .or_else(|| field_display(record, "name"))
        .or_else(|| field_display(record, "title"))
        .filter(|s| !s.trim().is_empty())
}

/// Uppercase first character, for image placeholders
pub fn initial(text: &str) -> String {
    text.trim()
        .chars()
        .next()
        .map(|c| c.to_uppercase().collect())
        .unwrap_or_else(|| "?".to_string())
}

/// Human label for a field name (`due_date` -> `Due date`)
pub fn humanize(field: &str) -> String {
    let spaced = field.replace(['_', '-'], " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
