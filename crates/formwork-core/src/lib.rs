//! # Formwork Core
//!
//! Schema-driven UI rendering: a JSON schema document is parsed into a typed
//! tree, every node is dispatched to the renderer registered for its `type`,
//! and data-bound views pull their records through the [`DataSource`]
//! contract. User intents travel as [`ActionDef`]s through the
//! [`ActionRunner`], which records compensating operations in an
//! [`UndoManager`].
//!
//! ```rust
//! use formwork_core::{
//!     register_builtin_components, render, ComponentRegistry, RenderContext, Schema,
//! };
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = ComponentRegistry::new();
//! register_builtin_components(&registry);
//! let ctx = RenderContext::new(Arc::new(registry));
//!
//! let schema = Schema::from_value(json!({"type": "text", "content": "Hello"}))?;
//! assert_eq!(render(&schema, &ctx).await.to_text(), "Hello");
//! # Ok(())
//! # }
//! ```

pub mod action;
pub mod components;
pub mod data_source;
pub mod registry;
pub mod render;
pub mod schema;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_support;
pub mod undo;

pub use action::{
    ActionContext, ActionDef, ActionError, ActionHandler, ActionOutcome, ActionResult,
    ActionRunner, ActionState,
};
pub use components::register_builtin_components;
pub use data_source::{
    record_id, DataSource, DataSourceError, DataSourceResult, Query, Record, SortOrder, SortSpec,
};
pub use registry::{
    ComponentInfo, ComponentKey, ComponentMeta, ComponentRegistry, InputDescriptor, InputKind,
};
pub use render::{
    render, ComponentRenderer, Element, Output, PlaceholderReason, RenderContext, RenderError,
    RenderResult, StaticTranslator, Theme, ThemeMode, Translator,
};
pub use schema::{Schema, SchemaError, SchemaNode, SchemaResult};
pub use undo::{OperationType, UndoManager, UndoSnapshot, UndoableOperation};

/// Best-effort text of a caught panic payload
pub(crate) fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
