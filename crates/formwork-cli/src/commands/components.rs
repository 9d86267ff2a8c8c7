use anyhow::Result;
use formwork_config::FormworkConfig;
use formwork_core::ComponentInfo;

use super::builtin_registry;

/// Execute components subcommand
pub async fn execute(config: FormworkConfig, namespace: Option<String>, json: bool) -> Result<()> {
    let components = list(&config, namespace.as_deref());
    if json {
        println!("{}", serde_json::to_string_pretty(&components)?);
    } else {
        print!("{}", format_table(&components));
    }
    Ok(())
}

pub fn list(config: &FormworkConfig, namespace: Option<&str>) -> Vec<ComponentInfo> {
    let registry = builtin_registry(config);
    match namespace {
        Some(namespace) => registry.list_namespace(namespace),
        None => registry.list(),
    }
}

pub fn format_table(components: &[ComponentInfo]) -> String {
    if components.is_empty() {
        return "No components registered\n".to_string();
    }
    let width = components
        .iter()
        .map(|info| info.type_name.len())
        .max()
        .unwrap_or(0)
        .max("TYPE".len());

    let mut out = format!("{:<width$}  {:<10}  LABEL\n", "TYPE", "CATEGORY");
    for info in components {
        out.push_str(&format!(
            "{:<width$}  {:<10}  {}\n",
            info.type_name,
            info.meta.category.as_deref().unwrap_or("-"),
            info.meta.label.as_deref().unwrap_or(""),
        ));
    }
    out
}
