//! Component registry
//!
//! Maps a schema `type` to the renderer that draws it plus designer metadata.
//! Types may be namespaced (`"ui:badge"`); unqualified names live in the
//! default namespace. Registering an existing key replaces it.
//!
//! The registry is an explicit instance, shared as `Arc<ComponentRegistry>`
//! through the render context. All methods take `&self`.

use formwork_config::RegistryConfig;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::render::ComponentRenderer;
use crate::schema::{SchemaNode, SchemaResult};

/// Namespace-qualified component key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentKey {
    pub namespace: String,
    pub name: String,
}

impl ComponentKey {
    /// Split `"ns:name"`; unqualified names use `default_namespace`
    pub fn parse(type_name: &str, default_namespace: &str) -> Self {
        match type_name.split_once(':') {
            Some((namespace, name)) if !namespace.is_empty() => Self {
                namespace: namespace.to_string(),
                name: name.to_string(),
            },
            _ => Self {
                namespace: default_namespace.to_string(),
                name: type_name.trim_start_matches(':').to_string(),
            },
        }
    }

    fn is_qualified(type_name: &str) -> bool {
        matches!(type_name.split_once(':'), Some((ns, _)) if !ns.is_empty())
    }
}

impl fmt::Display for ComponentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.name)
    }
}

/// Kind of a designer-editable property
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    #[default]
    String,
    Number,
    Boolean,
    Enum,
    Array,
    Object,
    Color,
    Date,
    Code,
    File,
    Slot,
}

/// One designer-editable property of a component
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: InputKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Allowed values for [`InputKind::Enum`]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl InputDescriptor {
    pub fn new(name: impl Into<String>, kind: InputKind) -> Self {
        Self {
            name: name.into(),
            kind,
            ..Default::default()
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn options<I, V>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Designer metadata for a registered component
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Editable properties, in display order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<InputDescriptor>,
    /// Props for a freshly dropped instance
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub default_props: Map<String, Value>,
}

impl ComponentMeta {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Default::default()
        }
    }

    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn input(mut self, input: InputDescriptor) -> Self {
        self.inputs.push(input);
        self
    }

    pub fn default_prop(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.default_props.insert(name.into(), value.into());
        self
    }
}

/// A renderer bound to a key, with its metadata
#[derive(Clone)]
pub struct Registration {
    pub key: ComponentKey,
    pub renderer: Arc<dyn ComponentRenderer>,
    pub meta: ComponentMeta,
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("key", &self.key)
            .field("meta", &self.meta)
            .finish_non_exhaustive()
    }
}

/// Listing entry for designer tooling
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentInfo {
    /// Type as written in schemas (`"grid"`, `"ui:badge"`)
    #[serde(rename = "type")]
    pub type_name: String,
    pub namespace: String,
    pub name: String,
    pub meta: ComponentMeta,
}

pub struct ComponentRegistry {
    entries: RwLock<HashMap<ComponentKey, Arc<Registration>>>,
    aliases: RwLock<HashMap<ComponentKey, ComponentKey>>,
    default_namespace: String,
    warn_on_override: bool,
}

impl fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentRegistry")
            .field("components", &self.entries.read().len())
            .field("aliases", &self.aliases.read().len())
            .field("default_namespace", &self.default_namespace)
            .finish()
    }
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        Self::from_config(&RegistryConfig::default())
    }
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &RegistryConfig) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            aliases: RwLock::new(HashMap::new()),
            default_namespace: config.default_namespace.clone(),
            warn_on_override: config.warn_on_override,
        }
    }

    pub fn default_namespace(&self) -> &str {
        &self.default_namespace
    }

    fn key(&self, type_name: &str) -> ComponentKey {
        ComponentKey::parse(type_name, &self.default_namespace)
    }

    /// Type name as written in schemas: unqualified in the default namespace
    fn display_name(&self, key: &ComponentKey) -> String {
        if key.namespace == self.default_namespace {
            key.name.clone()
        } else {
            key.to_string()
        }
    }

    /// Register `renderer` for `type_name`, replacing any existing entry
    pub fn register(
        &self,
        type_name: &str,
        renderer: Arc<dyn ComponentRenderer>,
        meta: Option<ComponentMeta>,
    ) {
        let key = self.key(type_name);
        let registration = Arc::new(Registration {
            key: key.clone(),
            renderer,
            meta: meta.unwrap_or_default(),
        });

        let replaced = self.entries.write().insert(key.clone(), registration);
        if replaced.is_some() {
            if self.warn_on_override {
                tracing::warn!(component = %key, "component registration overridden");
            } else {
                tracing::debug!(component = %key, "component registration overridden");
            }
        } else {
            tracing::debug!(component = %key, "component registered");
        }
    }

    /// Remove a registration; returns whether it existed
    pub fn unregister(&self, type_name: &str) -> bool {
        self.entries.write().remove(&self.key(type_name)).is_some()
    }

    /// Make `alias` resolve to whatever `target` resolves to
    pub fn alias(&self, alias: &str, target: &str) {
        let alias_key = self.key(alias);
        let target_key = self.key(target);
        tracing::debug!(alias = %alias_key, target = %target_key, "component alias added");
        self.aliases.write().insert(alias_key, target_key);
    }

    fn lookup(&self, key: &ComponentKey) -> Option<Arc<Registration>> {
        let entries = self.entries.read();
        if let Some(found) = entries.get(key) {
            return Some(Arc::clone(found));
        }
        let target = self.aliases.read().get(key).cloned()?;
        entries.get(&target).cloned()
    }

    pub fn registration(&self, type_name: &str) -> Option<Arc<Registration>> {
        self.lookup(&self.key(type_name))
    }

    pub fn get(&self, type_name: &str) -> Option<Arc<dyn ComponentRenderer>> {
        self.registration(type_name)
            .map(|r| Arc::clone(&r.renderer))
    }

    pub fn has(&self, type_name: &str) -> bool {
        self.registration(type_name).is_some()
    }

    pub fn get_config(&self, type_name: &str) -> Option<ComponentMeta> {
        self.registration(type_name).map(|r| r.meta.clone())
    }

    /// Look up an unqualified type in `scope` first, then in the default
    /// namespace; qualified types ignore the scope
    pub fn resolve(
        &self,
        type_name: &str,
        scope: Option<&str>,
    ) -> Option<Arc<dyn ComponentRenderer>> {
        if let Some(scope) = scope.filter(|_| !ComponentKey::is_qualified(type_name)) {
            let scoped = ComponentKey {
                namespace: scope.to_string(),
                name: type_name.to_string(),
            };
            if let Some(found) = self.lookup(&scoped) {
                return Some(Arc::clone(&found.renderer));
            }
        }
        self.get(type_name)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Every registration, sorted by namespace then name
    pub fn list(&self) -> Vec<ComponentInfo> {
        let mut keys: Vec<(ComponentKey, ComponentMeta)> = self
            .entries
            .read()
            .values()
            .map(|r| (r.key.clone(), r.meta.clone()))
            .collect();
        keys.sort_by(|a, b| a.0.cmp(&b.0));
        keys.into_iter()
            .map(|(key, meta)| ComponentInfo {
                type_name: self.display_name(&key),
                namespace: key.namespace,
                name: key.name,
                meta,
            })
            .collect()
    }

    pub fn list_namespace(&self, namespace: &str) -> Vec<ComponentInfo> {
        self.list()
            .into_iter()
            .filter(|info| info.namespace == namespace)
            .collect()
    }

    /// A new node of `type_name` built from the registered default props
    pub fn instantiate(&self, type_name: &str) -> Option<SchemaResult<SchemaNode>> {
        let registration = self.registration(type_name)?;
        let mut props = registration.meta.default_props.clone();
        props.insert(
            "type".to_string(),
            Value::String(self.display_name(&registration.key)),
        );
        Some(SchemaNode::from_value(Value::Object(props)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{renderer_fn, Output, RenderContext};
    use serde_json::json;

    fn constant(text: &'static str) -> Arc<dyn ComponentRenderer> {
        renderer_fn(move |_, _| Ok(Output::text(text)))
    }

    async fn render_with(renderer: Arc<dyn ComponentRenderer>) -> Output {
        let ctx = RenderContext::new(Arc::new(ComponentRegistry::new()));
        let node = SchemaNode::from_value(json!({"type": "text"})).unwrap();
        renderer.render(&node, &ctx).await.unwrap()
    }

    #[test]
    fn test_key_parsing() {
        assert_eq!(
            ComponentKey::parse("ui:button", "default"),
            ComponentKey {
                namespace: "ui".into(),
                name: "button".into()
            }
        );
        assert_eq!(ComponentKey::parse("grid", "default").namespace, "default");
        assert_eq!(ComponentKey::parse(":grid", "default").name, "grid");
    }

    #[test]
    fn test_unregistered_is_absent() {
        let registry = ComponentRegistry::new();
        assert!(!registry.has("unregistered"));
        assert!(registry.get("unregistered").is_none());
        assert!(registry.get_config("unregistered").is_none());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_last_registration_wins() {
        let registry = ComponentRegistry::new();
        registry.register("badge", constant("first"), Some(ComponentMeta::new("First")));
        registry.register("badge", constant("second"), Some(ComponentMeta::new("Second")));

        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.get_config("badge").unwrap().label.as_deref(),
            Some("Second")
        );
        let out = render_with(registry.get("badge").unwrap()).await;
        assert_eq!(out, Output::text("second"));
    }

    #[tokio::test]
    async fn test_namespaces_are_separate() {
        let registry = ComponentRegistry::new();
        registry.register("button", constant("plain"), None);
        registry.register("ui:button", constant("fancy"), None);

        assert_eq!(render_with(registry.get("button").unwrap()).await, Output::text("plain"));
        assert_eq!(render_with(registry.get("ui:button").unwrap()).await, Output::text("fancy"));
        // Explicit default namespace is the same key as the bare name
        assert!(registry.has("default:button"));

        let scoped = registry.resolve("button", Some("ui")).unwrap();
        assert_eq!(render_with(scoped).await, Output::text("fancy"));
        let fallback = registry.resolve("button", Some("other")).unwrap();
        assert_eq!(render_with(fallback).await, Output::text("plain"));
    }

    #[tokio::test]
    async fn test_alias_follows_target() {
        let registry = ComponentRegistry::new();
        registry.register("grid", constant("grid v1"), None);
        registry.alias("table", "grid");
        assert!(registry.has("table"));

        registry.register("grid", constant("grid v2"), None);
        assert_eq!(render_with(registry.get("table").unwrap()).await, Output::text("grid v2"));

        assert!(registry.unregister("grid"));
        assert!(!registry.has("table"));
    }

    #[test]
    fn test_listing_and_instantiate() {
        let registry = ComponentRegistry::new();
        registry.register(
            "text",
            constant("t"),
            Some(
                ComponentMeta::new("Text")
                    .category("basic")
                    .input(InputDescriptor::new("content", InputKind::String).required())
                    .default_prop("content", "Hello"),
            ),
        );
        registry.register("ui:badge", constant("b"), None);

        let names: Vec<_> = registry.list().into_iter().map(|i| i.type_name).collect();
        assert_eq!(names, vec!["text", "ui:badge"]);
        assert_eq!(registry.list_namespace("ui").len(), 1);

        let node = registry.instantiate("text").unwrap().unwrap();
        assert_eq!(node.to_value(), json!({"type": "text", "content": "Hello"}));
        assert!(registry.instantiate("missing").is_none());
    }

    #[test]
    fn test_meta_serializes_for_designers() {
        let meta = ComponentMeta::new("Kanban")
            .icon("columns")
            .input(
                InputDescriptor::new("groupBy", InputKind::String)
                    .label("Group by")
                    .required(),
            )
            .input(InputDescriptor::new("size", InputKind::Enum).options(["sm", "md"]));
        let value = serde_json::to_value(&meta).unwrap();
        assert_eq!(value["inputs"][0]["type"], "string");
        assert_eq!(value["inputs"][0]["required"], true);
        assert_eq!(value["inputs"][1]["options"], json!(["sm", "md"]));
        let back: ComponentMeta = serde_json::from_value(value).unwrap();
        assert_eq!(back, meta);
    }
}
