//! # Formwork Data
//!
//! [`DataSource`] adapters:
//!
//! - [`StaticDataSource`]: in-memory collections, optionally loaded from JSON
//! - [`HttpDataSource`]: REST backend over `reqwest`
//! - [`RpcDataSource`]: JSON-RPC 2.0 over a line-delimited byte stream
//!
//! [`connect`] builds whichever adapter the configuration selects.

pub mod http;
pub mod rpc;
pub mod static_source;

pub use http::HttpDataSource;
pub use rpc::{serve, RpcDataSource};
pub use static_source::StaticDataSource;

use formwork_config::DataSourceConfig;
use formwork_core::data_source::{DataSource, DataSourceResult};
use std::sync::Arc;

/// Build the adapter selected by `config`
pub async fn connect(config: &DataSourceConfig) -> DataSourceResult<Arc<dyn DataSource>> {
    let source: Arc<dyn DataSource> = match config {
        DataSourceConfig::Static { path: Some(path) } => {
            Arc::new(StaticDataSource::from_json_file(path).await?)
        }
        DataSourceConfig::Static { path: None } => Arc::new(StaticDataSource::new()),
        DataSourceConfig::Http { .. } => Arc::new(HttpDataSource::from_config(config)?),
        DataSourceConfig::Rpc { address } => Arc::new(RpcDataSource::connect(address).await?),
    };
    tracing::debug!(adapter = source.name(), "data source ready");
    Ok(source)
}
