use anyhow::{bail, Context, Result};
use formwork_config::FormworkConfig;
use formwork_core::data_source::DataSource;
use formwork_core::{render, Output, RenderContext, StaticTranslator};
use formwork_data::StaticDataSource;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

use super::{builtin_registry, read_schema};
use crate::cli::OutputFormat;

#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    pub schema: PathBuf,
    pub data: Option<PathBuf>,
    pub format: OutputFormat,
    pub locale: Option<String>,
    pub catalog: Option<PathBuf>,
    pub strict: bool,
}

/// Execute render subcommand
pub async fn execute(config: FormworkConfig, options: RenderOptions) -> Result<()> {
    let output = render_document(&config, &options).await?;
    println!("{}", format_output(&output, options.format)?);

    if options.strict {
        let problems = problems(&output);
        if !problems.is_empty() {
            bail!("{} subtree(s) did not render:\n  {}", problems.len(), problems.join("\n  "));
        }
    }
    Ok(())
}

/// Render the schema file against the configured (or `--data`) data source
pub async fn render_document(config: &FormworkConfig, options: &RenderOptions) -> Result<Output> {
    let schema = read_schema(&options.schema).await?;

    let data_source: Arc<dyn DataSource> = match &options.data {
        Some(path) => Arc::new(
            StaticDataSource::from_json_file(path)
                .await
                .with_context(|| format!("Failed to load data from {}", path.display()))?,
        ),
        None => formwork_data::connect(&config.data_source)
            .await
            .context("Failed to connect to the configured data source")?,
    };

    let locale = options
        .locale
        .clone()
        .unwrap_or_else(|| config.render.locale.clone());
    let mut translator = StaticTranslator::new(locale, config.render.fallback_locale.clone());
    if let Some(path) = &options.catalog {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read catalog {}", path.display()))?;
        let catalogs: serde_json::Value = serde_json::from_str(&content)
            .with_context(|| format!("Invalid catalog JSON in {}", path.display()))?;
        translator.load_catalogs(&catalogs);
    }

    let ctx = RenderContext::from_config(builtin_registry(config), &config.render)
        .with_data_source(data_source)
        .with_translator(Arc::new(translator));
    debug!(schema = %options.schema.display(), "rendering");

    let output = render(&schema, &ctx).await;
    for (type_name, message) in output.errors() {
        warn!(type_name, message, "subtree failed to render");
    }
    Ok(output)
}

pub fn format_output(output: &Output, format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Html => output.to_html(),
        OutputFormat::Text => output.to_text(),
        OutputFormat::Json => serde_json::to_string_pretty(output)?,
    })
}

/// One line per failed or placeholder subtree
pub fn problems(output: &Output) -> Vec<String> {
    let mut found: Vec<String> = output
        .errors()
        .into_iter()
        .map(|(type_name, message)| format!("{}: {}", type_name, message))
        .collect();
    found.extend(
        output
            .placeholders()
            .into_iter()
            .map(|(type_name, reason)| format!("{}: {:?}", type_name, reason)),
    );
    found
}
