//! Record queries
//!
//! A [`Query`] is a backend-neutral description of which records to return.
//! Remote adapters translate it to their own wire form; in-memory adapters
//! evaluate it with [`Query::apply`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;

use super::Record;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: String,
    #[serde(default)]
    pub order: SortOrder,
}

/// Filter, order and page a collection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Query {
    /// Field equality constraints, all of which must hold
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub filter: Map<String, Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sort: Vec<SortSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip: Option<usize>,
    /// Fields to keep; the id field is always kept
    #[serde(skip_serializing_if = "Option::is_none")]
    pub select: Option<Vec<String>>,
    /// Case-insensitive substring match against string fields
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter.insert(field.into(), value.into());
        self
    }

    pub fn sort_by(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort.push(SortSpec {
            field: field.into(),
            order,
        });
        self
    }

    pub fn top(mut self, top: usize) -> Self {
        self.top = Some(top);
        self
    }

    pub fn skip(mut self, skip: usize) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn select<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Query::default()
    }

    /// Whether a single record passes the filter and search terms
    pub fn matches(&self, record: &Record) -> bool {
        let filtered = self
            .filter
            .iter()
            .all(|(field, expected)| record.get(field).unwrap_or(&Value::Null) == expected);
        if !filtered {
            return false;
        }
        match self.search.as_deref().map(str::to_lowercase) {
            Some(term) if !term.is_empty() => record.values().any(|value| {
                value
                    .as_str()
                    .is_some_and(|s| s.to_lowercase().contains(&term))
            }),
            _ => true,
        }
    }

    /// Evaluate the query against an in-memory collection
    pub fn apply<'a, I>(&self, records: I) -> Vec<Record>
    where
        I: IntoIterator<Item = &'a Record>,
    {
        let mut matched: Vec<&Record> = records.into_iter().filter(|r| self.matches(r)).collect();

        if !self.sort.is_empty() {
            matched.sort_by(|a, b| {
                self.sort
                    .iter()
                    .map(|spec| {
                        let ordering = compare_values(
                            a.get(&spec.field).unwrap_or(&Value::Null),
                            b.get(&spec.field).unwrap_or(&Value::Null),
                        );
                        match spec.order {
                            SortOrder::Asc => ordering,
                            SortOrder::Desc => ordering.reverse(),
                        }
                    })
                    .find(|o| *o != Ordering::Equal)
                    .unwrap_or(Ordering::Equal)
            });
        }

        matched
            .into_iter()
            .skip(self.skip.unwrap_or(0))
            .take(self.top.unwrap_or(usize::MAX))
            .map(|record| self.project(record))
            .collect()
    }

    fn project(&self, record: &Record) -> Record {
        match &self.select {
            None => record.clone(),
            Some(fields) => record
                .iter()
                .filter(|(key, _)| {
                    key.as_str() == "id"
                        || key.as_str() == "_id"
                        || fields.iter().any(|f| f == *key)
                })
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Total order over JSON values: nulls first, then by kind, then by value
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn records() -> Vec<Record> {
        [
            json!({"id": "1", "name": "Widget", "status": "open", "price": 30}),
            json!({"id": "2", "name": "Gadget", "status": "done", "price": 10}),
            json!({"id": "3", "name": "Gizmo", "status": "open", "price": 20}),
            json!({"id": "4", "name": "Doohickey", "status": "open"}),
        ]
        .into_iter()
        .filter_map(|v| v.as_object().cloned())
        .collect()
    }

    fn ids(records: &[Record]) -> Vec<&str> {
        records
            .iter()
            .filter_map(|r| r.get("id").and_then(Value::as_str))
            .collect()
    }

    #[test]
    fn test_empty_query_returns_everything_in_order() {
        let data = records();
        let result = Query::new().apply(&data);
        assert_eq!(ids(&result), vec!["1", "2", "3", "4"]);
        assert!(Query::new().is_empty());
    }

    #[test]
    fn test_filter_and_sort() {
        let data = records();
        let result = Query::new()
            .filter_eq("status", "open")
            .sort_by("price", SortOrder::Desc)
            .apply(&data);
        // Missing price sorts as null, which is lowest
        assert_eq!(ids(&result), vec!["1", "3", "4"]);
    }

    #[test]
    fn test_skip_top_and_select() {
        let data = records();
        let result = Query::new()
            .sort_by("name", SortOrder::Asc)
            .skip(1)
            .top(2)
            .select(["name"])
            .apply(&data);
        assert_eq!(ids(&result), vec!["2", "3"]);
        assert_eq!(result[0].len(), 2);
        assert!(result[0].get("price").is_none());
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let data = records();
        let result = Query::new().search("GI").apply(&data);
        assert_eq!(ids(&result), vec!["3"]);
    }

    #[test]
    fn test_query_serializes_compactly() {
        let query = Query::new().filter_eq("status", "open").top(5);
        assert_eq!(
            serde_json::to_value(&query).unwrap(),
            json!({"filter": {"status": "open"}, "top": 5})
        );
    }
}
