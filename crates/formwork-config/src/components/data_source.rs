//! Data source configuration
//!
//! Selects which adapter a host wires into the render context.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Data source adapter selection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DataSourceConfig {
    /// In-memory collections, optionally seeded from a JSON file
    Static {
        /// JSON file shaped as `{ "object": [records...] }`
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<PathBuf>,
    },
    /// REST backend
    Http {
        /// Base URL, collections live at `{base_url}/{object}`
        base_url: String,
        /// Per-request timeout
        #[serde(default = "default_timeout_seconds")]
        timeout_seconds: u64,
        /// Headers sent with every request (authorization, tenant, ...)
        #[serde(default)]
        headers: BTreeMap<String, String>,
    },
    /// JSON-RPC over a TCP stream
    Rpc {
        /// `host:port`
        address: String,
    },
}

fn default_timeout_seconds() -> u64 {
    30
}

impl Default for DataSourceConfig {
    fn default() -> Self {
        Self::Static { path: None }
    }
}
