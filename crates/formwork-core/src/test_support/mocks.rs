//! Mock Implementations for Testing
//!
//! - **Deterministic**: sequential ids (`mock-1`, `mock-2`, ...)
//! - **Observable**: every call is counted in [`MockDataSourceStats`]
//! - **Configurable**: error injection for failure paths
//!
//! # Examples
//!
//! ```rust,ignore
//! use formwork_core::test_support::MockDataSource;
//! use formwork_core::{DataSource, Query};
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let ds = MockDataSource::new();
//! ds.seed("orders", vec![json!({"id": "1", "total": 10})]);
//!
//! let rows = ds.find("orders", &Query::new()).await?;
//! assert_eq!(rows.len(), 1);
//! assert_eq!(ds.stats().find_calls, 1);
//!
//! // Error injection
//! ds.set_simulate_errors(true, "backend down");
//! assert!(ds.find("orders", &Query::new()).await.is_err());
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::data_source::{
    record_id, DataSource, DataSourceError, DataSourceResult, Query, Record,
};

/// Call counters for [`MockDataSource`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MockDataSourceStats {
    pub find_calls: usize,
    pub find_one_calls: usize,
    pub create_calls: usize,
    pub update_calls: usize,
    pub delete_calls: usize,
}

#[derive(Debug, Default)]
struct MockState {
    /// Collections in insertion order
    objects: HashMap<String, Vec<Record>>,
    stats: MockDataSourceStats,
    next_id: u64,
    simulate_errors: bool,
    error_message: String,
}

impl MockState {
    fn check(&self) -> DataSourceResult<()> {
        if self.simulate_errors {
            return Err(DataSourceError::backend(self.error_message.clone()));
        }
        Ok(())
    }

    fn collection(&mut self, object: &str) -> DataSourceResult<&mut Vec<Record>> {
        self.objects
            .get_mut(object)
            .ok_or_else(|| DataSourceError::NotFound(object.to_string()))
    }
}

/// In-memory [`DataSource`] with call tracking and error injection
#[derive(Debug, Clone, Default)]
pub struct MockDataSource {
    state: Arc<Mutex<MockState>>,
}

impl MockDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `object` known, with no records
    pub fn declare(&self, object: &str) {
        self.state
            .lock()
            .objects
            .entry(object.to_string())
            .or_default();
    }

    /// Append records to `object`; non-object values are skipped
    pub fn seed(&self, object: &str, records: Vec<Value>) {
        let mut state = self.state.lock();
        let collection = state.objects.entry(object.to_string()).or_default();
        collection.extend(records.into_iter().filter_map(|v| match v {
            Value::Object(map) => Some(map),
            _ => None,
        }));
    }

    pub fn records(&self, object: &str) -> Vec<Record> {
        self.state
            .lock()
            .objects
            .get(object)
            .cloned()
            .unwrap_or_default()
    }

    pub fn stats(&self) -> MockDataSourceStats {
        self.state.lock().stats.clone()
    }

    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.objects.clear();
        state.stats = MockDataSourceStats::default();
        state.simulate_errors = false;
        state.error_message.clear();
    }

    /// Make every subsequent call fail with a backend error
    pub fn set_simulate_errors(&self, enabled: bool, message: &str) {
        let mut state = self.state.lock();
        state.simulate_errors = enabled;
        state.error_message = message.to_string();
    }
}

fn position(records: &[Record], id: &str) -> Option<usize> {
    records
        .iter()
        .position(|r| record_id(r).as_deref() == Some(id))
}

#[async_trait]
impl DataSource for MockDataSource {
    async fn find(&self, object: &str, query: &Query) -> DataSourceResult<Vec<Record>> {
        let mut state = self.state.lock();
        state.stats.find_calls += 1;
        state.check()?;
        let records = state.collection(object)?;
        Ok(query.apply(records.iter()))
    }

    async fn find_one(&self, object: &str, id: &str) -> DataSourceResult<Option<Record>> {
        let mut state = self.state.lock();
        state.stats.find_one_calls += 1;
        state.check()?;
        let records = state.collection(object)?;
        Ok(position(records, id).map(|i| records[i].clone()))
    }

    async fn create(&self, object: &str, mut data: Record) -> DataSourceResult<Record> {
        let mut state = self.state.lock();
        state.stats.create_calls += 1;
        state.check()?;
        state.next_id += 1;
        let generated = format!("mock-{}", state.next_id);
        let records = state.objects.entry(object.to_string()).or_default();
        let id = match record_id(&data) {
            Some(id) if position(records, &id).is_none() => id,
            _ => generated,
        };
        data.insert("id".to_string(), Value::String(id));
        records.push(data.clone());
        Ok(data)
    }

    async fn update(&self, object: &str, id: &str, patch: Record) -> DataSourceResult<Record> {
        let mut state = self.state.lock();
        state.stats.update_calls += 1;
        state.check()?;
        let records = state.collection(object)?;
        let index = position(records, id)
            .ok_or_else(|| DataSourceError::record_not_found(object, id))?;
        let record = &mut records[index];
        for (key, value) in patch {
            record.insert(key, value);
        }
        Ok(record.clone())
    }

    async fn delete(&self, object: &str, id: &str) -> DataSourceResult<bool> {
        let mut state = self.state.lock();
        state.stats.delete_calls += 1;
        state.check()?;
        let Some(records) = state.objects.get_mut(object) else {
            return Ok(false);
        };
        match position(records, id) {
            Some(index) => {
                records.remove(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap_or_default()
    }

    #[tokio::test]
    async fn test_crud_contract() {
        let ds = MockDataSource::new();
        ds.declare("orders");

        let created = ds.create("orders", record(json!({"total": 5}))).await.unwrap();
        assert_eq!(created["id"], json!("mock-1"));

        let updated = ds
            .update("orders", "mock-1", record(json!({"status": "paid"})))
            .await
            .unwrap();
        assert_eq!(updated["total"], json!(5));
        assert_eq!(updated["status"], json!("paid"));

        let missing = ds.update("orders", "nope", Record::new()).await.unwrap_err();
        assert!(matches!(missing, DataSourceError::RecordNotFound { .. }));

        assert!(ds.delete("orders", "mock-1").await.unwrap());
        assert!(!ds.delete("orders", "mock-1").await.unwrap());
        assert_eq!(ds.find_one("orders", "mock-1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unknown_object_and_error_injection() {
        let ds = MockDataSource::new();
        let err = ds.find("ghosts", &Query::new()).await.unwrap_err();
        assert_eq!(err, DataSourceError::NotFound("ghosts".into()));

        ds.declare("orders");
        ds.set_simulate_errors(true, "down");
        assert!(ds.find("orders", &Query::new()).await.is_err());
        assert_eq!(ds.stats().find_calls, 2);

        ds.reset();
        assert_eq!(ds.stats(), MockDataSourceStats::default());
    }

    #[tokio::test]
    async fn test_create_keeps_free_client_id() {
        let ds = MockDataSource::new();
        let first = ds.create("orders", record(json!({"id": "o-1"}))).await.unwrap();
        assert_eq!(first["id"], json!("o-1"));
        let clash = ds.create("orders", record(json!({"id": "o-1"}))).await.unwrap();
        assert_ne!(clash["id"], json!("o-1"));
    }
}
