pub mod check;
pub mod components;
pub mod render;

use anyhow::{Context, Result};
use formwork_config::FormworkConfig;
use formwork_core::{register_builtin_components, ComponentRegistry, Schema};
use std::path::Path;
use std::sync::Arc;

/// Parse a schema document from a JSON file
pub async fn read_schema(path: &Path) -> Result<Schema> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read schema {}", path.display()))?;
    Schema::from_json(&content).with_context(|| format!("Invalid schema in {}", path.display()))
}

/// Registry with the built-in components under the configured policy
pub fn builtin_registry(config: &FormworkConfig) -> Arc<ComponentRegistry> {
    let registry = ComponentRegistry::from_config(&config.registry);
    register_builtin_components(&registry);
    Arc::new(registry)
}
