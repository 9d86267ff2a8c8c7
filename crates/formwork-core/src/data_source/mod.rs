//! Data access capability
//!
//! Renderers and action handlers never own data. They reach collections
//! through a shared [`DataSource`], injected via the render or action
//! context. Concrete adapters (in-memory, REST, RPC) live outside the core.

mod error;
mod query;

pub use error::{DataSourceError, DataSourceResult};
pub use query::{compare_values, Query, SortOrder, SortSpec};

use async_trait::async_trait;
use serde_json::{Map, Value};

/// A record is a JSON object
pub type Record = Map<String, Value>;

/// CRUD access to named collections ("objects")
///
/// Implementations must be `Send + Sync`; one instance is shared as
/// `Arc<dyn DataSource>` by every renderer in a tree.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Records of `object` matching `query`
    ///
    /// Fails with [`DataSourceError::NotFound`] when the object is unknown.
    async fn find(&self, object: &str, query: &Query) -> DataSourceResult<Vec<Record>>;

    /// A single record by id, `None` when it does not exist
    async fn find_one(&self, object: &str, id: &str) -> DataSourceResult<Option<Record>>;

    /// Create a record; the backend assigns the id
    async fn create(&self, object: &str, data: Record) -> DataSourceResult<Record>;

    /// Apply a partial update and return the updated record
    ///
    /// Fails with [`DataSourceError::RecordNotFound`] when `id` is missing.
    async fn update(&self, object: &str, id: &str, patch: Record) -> DataSourceResult<Record>;

    /// Delete a record; `false` when it did not exist
    async fn delete(&self, object: &str, id: &str) -> DataSourceResult<bool>;

    /// Adapter name for diagnostics
    fn name(&self) -> &str {
        "data-source"
    }
}

/// The identity of a record, read from `id` or `_id`
///
/// Numeric ids are rendered as strings.
pub fn record_id(record: &Record) -> Option<String> {
    ["id", "_id"]
        .iter()
        .filter_map(|key| record.get(*key))
        .find_map(|value| match value {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
}
