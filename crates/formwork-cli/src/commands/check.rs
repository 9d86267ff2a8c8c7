use anyhow::{bail, Result};
use formwork_config::FormworkConfig;
use formwork_core::{ComponentRegistry, Schema};
use std::collections::BTreeMap;
use std::path::Path;

use super::{builtin_registry, read_schema};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckReport {
    /// Node count per type
    pub types: BTreeMap<String, usize>,
    /// Types without a registered renderer, sorted
    pub unresolved: Vec<String>,
}

impl CheckReport {
    pub fn node_count(&self) -> usize {
        self.types.values().sum()
    }

    pub fn is_ok(&self) -> bool {
        self.unresolved.is_empty()
    }
}

/// Execute check subcommand
pub async fn execute(config: FormworkConfig, path: &Path) -> Result<()> {
    let schema = read_schema(path).await?;
    let report = check(&schema, &builtin_registry(&config));

    println!(
        "{}: {} node(s), {} type(s)",
        path.display(),
        report.node_count(),
        report.types.len()
    );
    if report.is_ok() {
        println!("All types resolve");
        return Ok(());
    }
    for type_name in &report.unresolved {
        println!(
            "  unresolved: {} ({} node(s))",
            type_name,
            report.types.get(type_name).copied().unwrap_or(0)
        );
    }
    bail!("{} unresolved type(s)", report.unresolved.len())
}

pub fn check(schema: &Schema, registry: &ComponentRegistry) -> CheckReport {
    let mut types = BTreeMap::new();
    collect_types(schema, &mut types);
    let unresolved = types
        .keys()
        .filter(|type_name| !registry.has(type_name))
        .cloned()
        .collect();
    CheckReport { types, unresolved }
}

fn collect_types(schema: &Schema, types: &mut BTreeMap<String, usize>) {
    match schema {
        Schema::List(items) => {
            for item in items {
                collect_types(item, types);
            }
        }
        Schema::Node(node) => {
            *types.entry(node.type_name().to_string()).or_default() += 1;
            node.map_children(&mut |child| {
                collect_types(child, types);
                None
            });
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn registry() -> std::sync::Arc<ComponentRegistry> {
        builtin_registry(&FormworkConfig::default())
    }

    #[test]
    fn test_nested_types_are_counted() {
        let schema = Schema::from_value(json!({
            "type": "page",
            "children": [
                {"type": "text", "content": "a"},
                {"type": "container", "children": [{"type": "text", "content": "b"}]},
                {"type": "dashboard", "widgets": [
                    {"component": {"type": "ui:badge"}}
                ]}
            ]
        }))
        .unwrap();

        let report = check(&schema, &registry());
        assert_eq!(report.types.get("text"), Some(&2));
        assert_eq!(report.node_count(), 6);
        assert_eq!(report.unresolved, vec!["ui:badge".to_string()]);
        assert!(!report.is_ok());
    }

    #[test]
    fn test_primitives_have_no_types() {
        let schema = Schema::from_value(json!(["plain", 1, null])).unwrap();
        let report = check(&schema, &registry());
        assert!(report.types.is_empty());
        assert!(report.is_ok());
    }
}
