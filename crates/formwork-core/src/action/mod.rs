//! Action dispatch
//!
//! An [`ActionDef`] names an operation (`{"type": "delete", "params": {...}}`).
//! The [`ActionRunner`] looks up the handler registered for that type and runs
//! it. Execution never fails at the call site: handler errors, missing
//! handlers and panics all come back as a failed [`ActionResult`].
//!
//! Progress is published on a `watch` channel as [`ActionState`]
//! (`Idle -> Running -> Succeeded | Failed`).

mod builtin;
mod error;

pub use builtin::{
    builtin_handlers, CreateHandler, DeleteHandler, NavigateHandler, RefreshHandler,
    UpdateHandler,
};
pub use error::{ActionError, ActionOutcome};

use async_trait::async_trait;
use futures::FutureExt;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::watch;

use crate::data_source::{record_id, DataSource, DataSourceError, DataSourceResult, Record};
use crate::undo::{OperationType, UndoManager, UndoableOperation};

/// Declarative action attached to a schema node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionDef {
    #[serde(rename = "type")]
    pub action_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Map<String, Value>>,
    /// Confirmation prompt; showing it is the host's job
    #[serde(rename = "confirmText", default, skip_serializing_if = "Option::is_none")]
    pub confirm_text: Option<String>,
}

impl ActionDef {
    pub fn new(action_type: impl Into<String>) -> Self {
        Self {
            action_type: action_type.into(),
            ..Default::default()
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params
            .get_or_insert_with(Map::new)
            .insert(name.into(), value.into());
        self
    }

    pub fn with_confirm_text(mut self, text: impl Into<String>) -> Self {
        self.confirm_text = Some(text.into());
        self
    }

    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.as_ref().and_then(|p| p.get(name))
    }

    pub fn param_str(&self, name: &str) -> Option<&str> {
        self.param(name).and_then(Value::as_str)
    }
}

/// Outcome of running an action
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Hint that the host should refetch data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reload: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub navigate_to: Option<String>,
}

impl ActionResult {
    pub fn success() -> Self {
        Self {
            success: true,
            ..Default::default()
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }

    pub fn navigate(target: impl Into<String>) -> Self {
        Self {
            navigate_to: Some(target.into()),
            ..Self::success()
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_reload(mut self) -> Self {
        self.reload = Some(true);
        self
    }
}

/// Observable runner state
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ActionState {
    #[default]
    Idle,
    Running { action_type: String },
    Succeeded { action_type: String },
    Failed { action_type: String, error: String },
}

impl ActionState {
    pub fn is_running(&self) -> bool {
        matches!(self, ActionState::Running { .. })
    }
}

/// Capabilities available to handlers
#[derive(Clone, Default)]
pub struct ActionContext {
    pub data_source: Option<Arc<dyn DataSource>>,
    pub undo: Option<Arc<Mutex<UndoManager>>>,
}

impl std::fmt::Debug for ActionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionContext")
            .field("data_source", &self.data_source.as_ref().map(|ds| ds.name().to_string()))
            .field("undo", &self.undo.is_some())
            .finish()
    }
}

impl ActionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data_source(mut self, data_source: Arc<dyn DataSource>) -> Self {
        self.data_source = Some(data_source);
        self
    }

    pub fn with_undo(mut self, undo: Arc<Mutex<UndoManager>>) -> Self {
        self.undo = Some(undo);
        self
    }

    /// Push an operation onto the attached undo history, if any
    pub fn record(&self, op: UndoableOperation) {
        if let Some(undo) = &self.undo {
            undo.lock().push(op);
        }
    }
}

/// Handler for one action type
#[async_trait]
pub trait ActionHandler: Send + Sync {
    async fn handle(&self, def: &ActionDef, ctx: &ActionContext) -> ActionOutcome;
}

struct FnHandler<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> ActionHandler for FnHandler<F>
where
    F: Fn(ActionDef, ActionContext) -> Fut + Send + Sync,
    Fut: Future<Output = ActionOutcome> + Send + 'static,
{
    async fn handle(&self, def: &ActionDef, ctx: &ActionContext) -> ActionOutcome {
        (self.f)(def.clone(), ctx.clone()).await
    }
}

/// Wrap an async closure as a handler
///
/// ```rust,ignore
/// runner.register_handler("ping", handler_fn(|_def, _ctx| async {
///     Ok(ActionResult::success())
/// }));
/// ```
pub fn handler_fn<F, Fut>(f: F) -> Arc<dyn ActionHandler>
where
    F: Fn(ActionDef, ActionContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ActionOutcome> + Send + 'static,
{
    Arc::new(FnHandler { f })
}

/// Dispatches actions to registered handlers
pub struct ActionRunner {
    handlers: RwLock<HashMap<String, Arc<dyn ActionHandler>>>,
    context: ActionContext,
    state: watch::Sender<ActionState>,
}

impl std::fmt::Debug for ActionRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut types: Vec<String> = self.handlers.read().keys().cloned().collect();
        types.sort();
        f.debug_struct("ActionRunner")
            .field("handlers", &types)
            .field("context", &self.context)
            .finish()
    }
}

impl ActionRunner {
    /// Runner with no handlers
    pub fn new(context: ActionContext) -> Self {
        let (state, _) = watch::channel(ActionState::Idle);
        Self {
            handlers: RwLock::new(HashMap::new()),
            context,
            state,
        }
    }

    /// Runner with `create`, `update`, `delete`, `navigate` and `refresh`
    pub fn with_builtin_handlers(context: ActionContext) -> Self {
        let runner = Self::new(context);
        for (action_type, handler) in builtin_handlers() {
            runner.register_handler(action_type, handler);
        }
        runner
    }

    pub fn context(&self) -> &ActionContext {
        &self.context
    }

    /// Register a handler; a later registration for the same type wins
    pub fn register_handler(
        &self,
        action_type: impl Into<String>,
        handler: Arc<dyn ActionHandler>,
    ) {
        let action_type = action_type.into();
        if self.handlers.write().insert(action_type.clone(), handler).is_some() {
            tracing::debug!(action_type = %action_type, "action handler replaced");
        }
    }

    pub fn has_handler(&self, action_type: &str) -> bool {
        self.handlers.read().contains_key(action_type)
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ActionState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> ActionState {
        self.state.borrow().clone()
    }

    /// Run the handler registered for `def.action_type`
    pub async fn execute(&self, def: &ActionDef) -> ActionResult {
        let action_type = def.action_type.clone();
        let handler = self.handlers.read().get(&action_type).cloned();

        let Some(handler) = handler else {
            let error = format!("no handler registered for action '{}'", action_type);
            tracing::warn!(action_type = %action_type, "{}", error);
            self.publish(ActionState::Failed {
                action_type,
                error: error.clone(),
            });
            return ActionResult::failure(error);
        };

        self.publish(ActionState::Running {
            action_type: action_type.clone(),
        });
        tracing::debug!(action_type = %action_type, "executing action");

        let outcome = AssertUnwindSafe(handler.handle(def, &self.context))
            .catch_unwind()
            .await;

        let result = match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(err)) => ActionResult::failure(err.to_string()),
            Err(panic) => ActionResult::failure(format!(
                "action handler panicked: {}",
                crate::panic_message(panic.as_ref())
            )),
        };

        self.finish(action_type, &result);
        result
    }

    /// Revert the most recent recorded operation
    pub async fn undo(&self) -> ActionResult {
        self.step(Direction::Undo).await
    }

    /// Re-apply the most recently undone operation
    pub async fn redo(&self) -> ActionResult {
        self.step(Direction::Redo).await
    }

    async fn step(&self, direction: Direction) -> ActionResult {
        let action_type = direction.label().to_string();
        let Some(undo) = self.context.undo.clone() else {
            return ActionResult::failure("no undo manager attached");
        };
        let Some(ds) = self.context.data_source.clone() else {
            return ActionResult::failure(ActionError::NoDataSource.to_string());
        };

        let popped = match direction {
            Direction::Undo => undo.lock().pop_undo(),
            Direction::Redo => undo.lock().pop_redo(),
        };
        let Some(op) = popped else {
            return ActionResult::failure(format!("nothing to {}", direction.label()));
        };

        self.publish(ActionState::Running {
            action_type: action_type.clone(),
        });

        let result = match compensate(ds.as_ref(), &undo, &op, direction).await {
            Ok(()) => ActionResult::success()
                .with_data(serde_json::to_value(&op).unwrap_or(Value::Null))
                .with_reload(),
            Err(err) => {
                tracing::warn!(
                    op_id = %op.id,
                    error = %err,
                    "{} failed, history restored",
                    direction.label()
                );
                let mut manager = undo.lock();
                match direction {
                    Direction::Undo => manager.restore_undo(&op.id),
                    Direction::Redo => manager.restore_redo(&op.id),
                }
                ActionResult::failure(err.to_string())
            }
        };

        self.finish(action_type, &result);
        result
    }

    fn finish(&self, action_type: String, result: &ActionResult) {
        let state = if result.success {
            ActionState::Succeeded { action_type }
        } else {
            ActionState::Failed {
                action_type,
                error: result.error.clone().unwrap_or_default(),
            }
        };
        self.publish(state);
    }

    fn publish(&self, state: ActionState) {
        self.state.send_replace(state);
    }
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Undo,
    Redo,
}

impl Direction {
    fn label(self) -> &'static str {
        match self {
            Direction::Undo => "undo",
            Direction::Redo => "redo",
        }
    }
}

/// Issue the data source call that reverts (undo) or re-applies (redo) `op`
async fn compensate(
    ds: &dyn DataSource,
    undo: &Mutex<UndoManager>,
    op: &UndoableOperation,
    direction: Direction,
) -> DataSourceResult<()> {
    let object = op.object_name.as_str();
    let missing = |what: &str| {
        DataSourceError::invalid_data(format!("operation {} has no {}", op.id, what))
    };

    match (op.op_type, direction) {
        (OperationType::Create, Direction::Undo) | (OperationType::Delete, Direction::Redo) => {
            ds.delete(object, &op.record_id).await?;
        }
        (OperationType::Delete, Direction::Undo) | (OperationType::Create, Direction::Redo) => {
            let data = match direction {
                Direction::Undo => op.undo_data.clone().ok_or_else(|| missing("undo data"))?,
                Direction::Redo => op.redo_data.clone().ok_or_else(|| missing("redo data"))?,
            };
            recreate(ds, undo, op, data).await?;
        }
        (OperationType::Update, Direction::Undo) => {
            let previous = op.undo_data.clone().ok_or_else(|| missing("undo data"))?;
            let introduced = op
                .redo_data
                .as_ref()
                .is_some_and(|patch| patch.keys().any(|key| !previous.contains_key(key)));

            if introduced {
                // A patch cannot remove keys; replace the record wholesale
                ds.delete(object, &op.record_id).await?;
                recreate(ds, undo, op, previous).await?;
            } else {
                let mut patch = previous;
                patch.remove("id");
                patch.remove("_id");
                ds.update(object, &op.record_id, patch).await?;
            }
        }
        (OperationType::Update, Direction::Redo) => {
            let patch = op.redo_data.clone().ok_or_else(|| missing("redo data"))?;
            ds.update(object, &op.record_id, patch).await?;
        }
    }
    Ok(())
}

/// Create `data` for `op` and follow a backend-assigned id in the history
async fn recreate(
    ds: &dyn DataSource,
    undo: &Mutex<UndoManager>,
    op: &UndoableOperation,
    data: Record,
) -> DataSourceResult<()> {
    let object = op.object_name.as_str();
    let created = ds.create(object, data).await?;
    if let Some(new_id) = record_id(&created) {
        if new_id != op.record_id {
            undo.lock().rebind_record_id(object, &op.record_id, &new_id);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_action_def_wire_format() {
        let def: ActionDef = serde_json::from_value(json!({
            "type": "delete",
            "params": {"objectName": "orders", "id": 7},
            "confirmText": "Sure?"
        }))
        .unwrap();
        assert_eq!(def.action_type, "delete");
        assert_eq!(def.param_str("objectName"), Some("orders"));
        assert_eq!(def.param("id"), Some(&json!(7)));
        assert_eq!(def.confirm_text.as_deref(), Some("Sure?"));

        let built = ActionDef::new("delete")
            .with_param("objectName", "orders")
            .with_param("id", 7)
            .with_confirm_text("Sure?");
        assert_eq!(built, def);
    }

    #[test]
    fn test_action_result_serializes_camel_case() {
        let value = serde_json::to_value(ActionResult::navigate("/orders/1")).unwrap();
        assert_eq!(value, json!({"success": true, "navigateTo": "/orders/1"}));
    }

    #[tokio::test]
    async fn test_missing_handler_reports_failure() {
        let runner = ActionRunner::new(ActionContext::new());
        let result = runner.execute(&ActionDef::new("launch")).await;
        assert!(!result.success);
        assert_eq!(
            result.error.as_deref(),
            Some("no handler registered for action 'launch'")
        );
        assert!(matches!(runner.state(), ActionState::Failed { .. }));
    }

    #[tokio::test]
    async fn test_later_registration_wins() {
        let runner = ActionRunner::new(ActionContext::new());
        runner.register_handler(
            "ping",
            handler_fn(|_, _| async { Ok(ActionResult::success().with_data(json!("first"))) }),
        );
        runner.register_handler(
            "ping",
            handler_fn(|_, _| async { Ok(ActionResult::success().with_data(json!("second"))) }),
        );
        let result = runner.execute(&ActionDef::new("ping")).await;
        assert_eq!(result.data, Some(json!("second")));
    }

    #[tokio::test]
    async fn test_handler_error_and_panic_become_failures() {
        let runner = ActionRunner::new(ActionContext::new());
        runner.register_handler(
            "broken",
            handler_fn(|_, _| async { Err(ActionError::handler("nope")) }),
        );
        runner.register_handler(
            "explodes",
            handler_fn(|def: ActionDef, _| async move {
                if def.action_type == "explodes" {
                    panic!("kaboom");
                }
                Ok(ActionResult::success())
            }),
        );

        let broken = runner.execute(&ActionDef::new("broken")).await;
        assert_eq!(broken.error.as_deref(), Some("nope"));

        let exploded = runner.execute(&ActionDef::new("explodes")).await;
        assert!(!exploded.success);
        assert!(exploded.error.unwrap().contains("kaboom"));
    }

    #[tokio::test]
    async fn test_state_transitions_are_published() {
        let runner = ActionRunner::with_builtin_handlers(ActionContext::new());
        let mut rx = runner.subscribe_state();
        assert_eq!(*rx.borrow(), ActionState::Idle);

        let result = runner.execute(&ActionDef::new("refresh")).await;
        assert_eq!(result.reload, Some(true));
        assert!(rx.has_changed().unwrap());
        assert_eq!(
            *rx.borrow_and_update(),
            ActionState::Succeeded {
                action_type: "refresh".into()
            }
        );
    }

    #[tokio::test]
    async fn test_navigate_and_missing_params() {
        let runner = ActionRunner::with_builtin_handlers(ActionContext::new());
        let nav = runner
            .execute(&ActionDef::new("navigate").with_param("to", "/home"))
            .await;
        assert_eq!(nav.navigate_to.as_deref(), Some("/home"));

        let bad = runner.execute(&ActionDef::new("navigate")).await;
        assert_eq!(bad.error.as_deref(), Some("missing parameter 'url'"));

        let no_ds = runner
            .execute(
                &ActionDef::new("create")
                    .with_param("objectName", "orders")
                    .with_param("data", json!({})),
            )
            .await;
        assert_eq!(no_ds.error.as_deref(), Some("no data source available"));
    }

    #[tokio::test]
    async fn test_undo_without_history() {
        let runner = ActionRunner::new(ActionContext::new());
        let result = runner.undo().await;
        assert_eq!(result.error.as_deref(), Some("no undo manager attached"));
    }
}
