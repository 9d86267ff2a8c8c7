//! In-memory data source
//!
//! Collections live in a map keyed by object name. An object is known once it
//! has been declared or seeded; `find` on anything else is
//! [`DataSourceError::NotFound`]. Queries are evaluated locally with
//! [`Query::apply`].

use async_trait::async_trait;
use formwork_core::data_source::{
    record_id, DataSource, DataSourceError, DataSourceResult, Query, Record,
};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct StaticDataSource {
    objects: RwLock<HashMap<String, Vec<Record>>>,
}

impl StaticDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `object` known without adding records
    pub fn declare_object(&self, object: &str) {
        self.objects.write().entry(object.to_string()).or_default();
    }

    /// Append records to `object`, declaring it if needed
    pub fn seed(&self, object: &str, records: impl IntoIterator<Item = Record>) {
        self.objects
            .write()
            .entry(object.to_string())
            .or_default()
            .extend(records);
    }

    /// Build from a document shaped as `{ "object": [records...] }`
    pub fn from_value(value: Value) -> DataSourceResult<Self> {
        let Value::Object(objects) = value else {
            return Err(DataSourceError::invalid_data(
                "static data must be an object of collections",
            ));
        };

        let source = Self::new();
        for (object, records) in objects {
            let Value::Array(items) = records else {
                return Err(DataSourceError::invalid_data(format!(
                    "collection '{}' must be an array",
                    object
                )));
            };
            let records = items
                .into_iter()
                .map(|item| match item {
                    Value::Object(map) => Ok(map),
                    other => Err(DataSourceError::invalid_data(format!(
                        "collection '{}' contains a non-object record: {}",
                        object, other
                    ))),
                })
                .collect::<DataSourceResult<Vec<_>>>()?;
            source.seed(&object, records);
        }
        Ok(source)
    }

    /// Load collections from a JSON file
    pub async fn from_json_file(path: impl AsRef<Path>) -> DataSourceResult<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            DataSourceError::transport(format!("failed to read {}: {}", path.display(), e))
        })?;
        let value: Value = serde_json::from_str(&content)?;
        let source = Self::from_value(value)?;
        tracing::debug!(
            path = %path.display(),
            objects = source.object_names().len(),
            "loaded static data"
        );
        Ok(source)
    }

    /// Known object names, sorted
    pub fn object_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.objects.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self, object: &str) -> usize {
        self.objects.read().get(object).map_or(0, Vec::len)
    }

    pub fn is_empty(&self, object: &str) -> bool {
        self.len(object) == 0
    }
}

fn position(records: &[Record], id: &str) -> Option<usize> {
    records
        .iter()
        .position(|r| record_id(r).as_deref() == Some(id))
}

#[async_trait]
impl DataSource for StaticDataSource {
    async fn find(&self, object: &str, query: &Query) -> DataSourceResult<Vec<Record>> {
        let objects = self.objects.read();
        let records = objects
            .get(object)
            .ok_or_else(|| DataSourceError::NotFound(object.to_string()))?;
        Ok(query.apply(records))
    }

    async fn find_one(&self, object: &str, id: &str) -> DataSourceResult<Option<Record>> {
        let objects = self.objects.read();
        let records = objects
            .get(object)
            .ok_or_else(|| DataSourceError::NotFound(object.to_string()))?;
        Ok(position(records, id).map(|i| records[i].clone()))
    }

    async fn create(&self, object: &str, mut data: Record) -> DataSourceResult<Record> {
        let mut objects = self.objects.write();
        let records = objects.entry(object.to_string()).or_default();

        // A client-supplied id is kept unless it is already taken
        let id = match record_id(&data) {
            Some(id) if position(records, &id).is_none() => id,
            _ => Uuid::new_v4().to_string(),
        };
        data.remove("_id");
        data.insert("id".to_string(), Value::String(id));
        records.push(data.clone());
        Ok(data)
    }

    async fn update(&self, object: &str, id: &str, patch: Record) -> DataSourceResult<Record> {
        let mut objects = self.objects.write();
        let records = objects
            .get_mut(object)
            .ok_or_else(|| DataSourceError::NotFound(object.to_string()))?;
        let index =
            position(records, id).ok_or_else(|| DataSourceError::record_not_found(object, id))?;

        let record = &mut records[index];
        for (key, value) in patch {
            // The id is immutable through update
            if key == "id" || key == "_id" {
                continue;
            }
            record.insert(key, value);
        }
        Ok(record.clone())
    }

    async fn delete(&self, object: &str, id: &str) -> DataSourceResult<bool> {
        let mut objects = self.objects.write();
        let Some(records) = objects.get_mut(object) else {
            return Ok(false);
        };
        Ok(match position(records, id) {
            Some(index) => {
                records.remove(index);
                true
            }
            None => false,
        })
    }

    fn name(&self) -> &str {
        "static"
    }
}
