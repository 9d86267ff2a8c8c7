//! Schema renderer
//!
//! [`render`] walks a [`Schema`] tree and dispatches every node to the
//! renderer registered for its `type`:
//!
//! - lists render element by element into a [`Output::Fragment`]
//! - literals render as text (`null` renders as nothing)
//! - unregistered types become a placeholder, never an error
//! - a renderer that fails or panics becomes an [`Output::Error`] for that
//!   subtree only; siblings render normally
//!
//! Composite renderers recurse through [`RenderContext::render`], which
//! tracks depth so that pathological documents stop at `max_depth`.

mod error;
pub mod i18n;
pub mod output;
pub mod theme;

pub use error::{RenderError, RenderResult};
pub use i18n::{NoopTranslator, StaticTranslator, Translator};
pub use output::{Element, Output, PlaceholderReason};
pub use theme::{Theme, ThemeMode};

use async_trait::async_trait;
use formwork_config::{RenderConfig, DEFAULT_MAX_DEPTH};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use crate::data_source::DataSource;
use crate::registry::ComponentRegistry;
use crate::schema::{Schema, SchemaNode};

/// Renders one kind of schema node
#[async_trait]
pub trait ComponentRenderer: Send + Sync {
    async fn render(&self, node: &SchemaNode, ctx: &RenderContext) -> RenderResult<Output>;
}

struct FnRenderer<F> {
    f: F,
}

#[async_trait]
impl<F> ComponentRenderer for FnRenderer<F>
where
    F: Fn(&SchemaNode, &RenderContext) -> RenderResult<Output> + Send + Sync,
{
    async fn render(&self, node: &SchemaNode, ctx: &RenderContext) -> RenderResult<Output> {
        (self.f)(node, ctx)
    }
}

/// Wrap a synchronous closure as a renderer, for leaf components
pub fn renderer_fn<F>(f: F) -> Arc<dyn ComponentRenderer>
where
    F: Fn(&SchemaNode, &RenderContext) -> RenderResult<Output> + Send + Sync + 'static,
{
    Arc::new(FnRenderer { f })
}

/// Read-only state handed to every renderer
#[derive(Clone)]
pub struct RenderContext {
    registry: Arc<ComponentRegistry>,
    data_source: Option<Arc<dyn DataSource>>,
    translator: Arc<dyn Translator>,
    theme: Arc<Theme>,
    scope: Option<String>,
    depth: usize,
    max_depth: usize,
}

impl std::fmt::Debug for RenderContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderContext")
            .field("components", &self.registry.len())
            .field("data_source", &self.data_source.as_ref().map(|ds| ds.name().to_string()))
            .field("locale", &self.translator.locale())
            .field("theme", &self.theme.mode)
            .field("scope", &self.scope)
            .field("depth", &self.depth)
            .field("max_depth", &self.max_depth)
            .finish()
    }
}

impl RenderContext {
    pub fn new(registry: Arc<ComponentRegistry>) -> Self {
        Self {
            registry,
            data_source: None,
            translator: Arc::new(NoopTranslator),
            theme: Arc::new(Theme::default()),
            scope: None,
            depth: 0,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Context with the depth limit and locales from configuration
    pub fn from_config(registry: Arc<ComponentRegistry>, config: &RenderConfig) -> Self {
        Self::new(registry)
            .with_max_depth(config.max_depth)
            .with_translator(Arc::new(StaticTranslator::new(
                config.locale.clone(),
                config.fallback_locale.clone(),
            )))
    }

    pub fn with_data_source(mut self, data_source: Arc<dyn DataSource>) -> Self {
        self.data_source = Some(data_source);
        self
    }

    pub fn with_translator(mut self, translator: Arc<dyn Translator>) -> Self {
        self.translator = translator;
        self
    }

    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = Arc::new(theme);
        self
    }

    /// Namespace tried before the default one for unqualified types
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn registry(&self) -> &Arc<ComponentRegistry> {
        &self.registry
    }

    pub fn data_source(&self) -> Option<&Arc<dyn DataSource>> {
        self.data_source.as_ref()
    }

    pub fn require_data_source(&self) -> RenderResult<&Arc<dyn DataSource>> {
        self.data_source.as_ref().ok_or(RenderError::NoDataSource)
    }

    pub fn translator(&self) -> &dyn Translator {
        self.translator.as_ref()
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Translated label for `key`, or `default`
    pub fn t(&self, key: &str, default: &str) -> String {
        self.translator
            .translate(key)
            .unwrap_or_else(|| default.to_string())
    }

    fn descend(&self) -> Self {
        Self {
            depth: self.depth + 1,
            ..self.clone()
        }
    }

    /// Render a child schema one level deeper
    pub fn render<'a>(&'a self, child: &'a Schema) -> BoxFuture<'a, Output> {
        async move {
            let nested = self.descend();
            render(child, &nested).await
        }
        .boxed()
    }

    /// Render each child in order
    pub async fn render_all(&self, children: &[Schema]) -> Vec<Output> {
        let mut out = Vec::with_capacity(children.len());
        for child in children {
            out.push(self.render(child).await);
        }
        out
    }

    /// Render an optional child slot, `Empty` when absent
    pub async fn render_slot(&self, slot: Option<&Schema>) -> Output {
        match slot {
            Some(child) => self.render(child).await,
            None => Output::Empty,
        }
    }
}

/// Render a schema tree
pub fn render<'a>(schema: &'a Schema, ctx: &'a RenderContext) -> BoxFuture<'a, Output> {
    async move {
        match schema {
            Schema::Null => Output::Empty,
            Schema::Bool(b) => Output::text(b.to_string()),
            Schema::Number(n) => Output::text(n.to_string()),
            Schema::Text(s) => Output::text(s.clone()),
            Schema::List(items) => {
                let mut children = Vec::with_capacity(items.len());
                for item in items {
                    children.push(render(item, ctx).await);
                }
                Output::fragment(children)
            }
            Schema::Node(node) => render_node(node, ctx).await,
        }
    }
    .boxed()
}

async fn render_node(node: &SchemaNode, ctx: &RenderContext) -> Output {
    let type_name = node.type_name();

    if ctx.depth >= ctx.max_depth {
        tracing::warn!(
            node_type = %type_name,
            depth = ctx.depth,
            "render depth limit reached"
        );
        return Output::placeholder(type_name, PlaceholderReason::DepthExceeded);
    }

    let Some(renderer) = ctx.registry.resolve(type_name, ctx.scope()) else {
        tracing::warn!(node_type = %type_name, "no renderer registered");
        return Output::placeholder(type_name, PlaceholderReason::NotRegistered);
    };

    tracing::debug!(node_type = %type_name, depth = ctx.depth, "dispatching renderer");

    match AssertUnwindSafe(renderer.render(node, ctx))
        .catch_unwind()
        .await
    {
        Ok(Ok(output)) => output,
        Ok(Err(err)) => {
            tracing::warn!(node_type = %type_name, error = %err, "renderer failed");
            Output::error(type_name, err.to_string())
        }
        Err(panic) => {
            let message = crate::panic_message(panic.as_ref());
            tracing::warn!(node_type = %type_name, panic = %message, "renderer panicked");
            Output::error(type_name, format!("renderer panicked: {}", message))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn registry() -> Arc<ComponentRegistry> {
        let registry = ComponentRegistry::new();
        registry.register(
            "text",
            renderer_fn(|node, _ctx| match node {
                SchemaNode::Text(t) => Ok(Output::text(t.display_text())),
                other => Err(RenderError::mismatch("text", other)),
            }),
            None,
        );
        registry.register(
            "explode",
            renderer_fn(|_node, _ctx| panic!("renderer bug")),
            None,
        );
        registry.register(
            "fail",
            renderer_fn(|_node, _ctx| Err(RenderError::custom("no luck"))),
            None,
        );
        Arc::new(registry)
    }

    fn schema(value: serde_json::Value) -> Schema {
        Schema::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn test_primitives_and_lists() {
        let ctx = RenderContext::new(registry());
        let out = render(&schema(json!(["a", 1, true, null])), &ctx).await;
        assert_eq!(
            out,
            Output::fragment(vec![
                Output::text("a"),
                Output::text("1"),
                Output::text("true"),
                Output::Empty,
            ])
        );
    }

    #[tokio::test]
    async fn test_unregistered_type_is_placeholder() {
        let ctx = RenderContext::new(registry());
        let out = render(&schema(json!({"type": "ui:badge"})), &ctx).await;
        assert_eq!(
            out,
            Output::placeholder("ui:badge", PlaceholderReason::NotRegistered)
        );
    }

    #[tokio::test]
    async fn test_failures_are_isolated_to_the_subtree() {
        let ctx = RenderContext::new(registry());
        let out = render(
            &schema(json!([
                {"type": "text", "content": "before"},
                {"type": "explode"},
                {"type": "fail"},
                {"type": "text", "content": "after"}
            ])),
            &ctx,
        )
        .await;

        let Output::Fragment { children } = out else {
            panic!("expected fragment");
        };
        assert_eq!(children[0], Output::text("before"));
        assert!(matches!(&children[1], Output::Error { type_name, message }
            if type_name == "explode" && message.contains("renderer bug")));
        assert_eq!(children[2], Output::error("fail", "no luck"));
        assert_eq!(children[3], Output::text("after"));
    }

    #[tokio::test]
    async fn test_depth_limit_yields_placeholder() {
        let ctx = RenderContext::new(registry()).with_max_depth(0);
        let out = render(&schema(json!({"type": "text", "content": "x"})), &ctx).await;
        assert_eq!(
            out,
            Output::placeholder("text", PlaceholderReason::DepthExceeded)
        );
    }

    #[test]
    fn test_translation_default() {
        let translator = StaticTranslator::new("en", "en").with("en", "greeting", "Hello");
        let ctx = RenderContext::new(registry()).with_translator(Arc::new(translator));
        assert_eq!(ctx.t("greeting", "Hi"), "Hello");
        assert_eq!(ctx.t("farewell", "Bye"), "Bye");
    }
}
