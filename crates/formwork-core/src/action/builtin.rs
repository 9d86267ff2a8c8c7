//! Built-in action handlers
//!
//! | Type | Params | Effect |
//! |------|--------|--------|
//! | `create` | `objectName`, `data` | create a record, record undo |
//! | `update` | `objectName`, `id`, `data` | patch a record, record undo |
//! | `delete` | `objectName`, `id` | delete a record, record undo |
//! | `navigate` | `url` or `to` | ask the host to navigate |
//! | `refresh` | | ask the host to reload data |

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

use super::{ActionContext, ActionDef, ActionError, ActionHandler, ActionOutcome, ActionResult};
use crate::data_source::{record_id, DataSource, DataSourceError, Record};
use crate::undo::{OperationType, UndoableOperation};

fn object_name(def: &ActionDef) -> Result<&str, ActionError> {
    def.param_str("objectName")
        .or_else(|| def.param_str("object"))
        .ok_or_else(|| ActionError::MissingParam("objectName".to_string()))
}

fn record_id_param(def: &ActionDef) -> Result<String, ActionError> {
    match def.param("id") {
        Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(_) => Err(ActionError::invalid_param("id", "expected a string or number")),
        None => Err(ActionError::MissingParam("id".to_string())),
    }
}

fn data_param(def: &ActionDef) -> Result<Record, ActionError> {
    match def.param("data") {
        Some(Value::Object(map)) => Ok(map.clone()),
        Some(_) => Err(ActionError::invalid_param("data", "expected an object")),
        None => Err(ActionError::MissingParam("data".to_string())),
    }
}

fn data_source(ctx: &ActionContext) -> Result<&Arc<dyn DataSource>, ActionError> {
    ctx.data_source.as_ref().ok_or(ActionError::NoDataSource)
}

pub struct CreateHandler;

#[async_trait]
impl ActionHandler for CreateHandler {
    async fn handle(&self, def: &ActionDef, ctx: &ActionContext) -> ActionOutcome {
        let object = object_name(def)?;
        let data = data_param(def)?;
        let ds = data_source(ctx)?;

        let created = ds.create(object, data).await?;
        let id = record_id(&created).ok_or_else(|| {
            DataSourceError::invalid_data(format!("created {} record has no id", object))
        })?;

        ctx.record(
            UndoableOperation::new(OperationType::Create, object, id)
                .with_redo_data(created.clone()),
        );

        Ok(ActionResult::success()
            .with_data(Value::Object(created))
            .with_reload())
    }
}

pub struct UpdateHandler;

#[async_trait]
impl ActionHandler for UpdateHandler {
    async fn handle(&self, def: &ActionDef, ctx: &ActionContext) -> ActionOutcome {
        let object = object_name(def)?;
        let id = record_id_param(def)?;
        let patch = data_param(def)?;
        let ds = data_source(ctx)?;

        let previous = ds
            .find_one(object, &id)
            .await?
            .ok_or_else(|| DataSourceError::record_not_found(object, &id))?;

        let updated = ds.update(object, &id, patch.clone()).await?;

        // Full snapshot so undo can also drop keys the patch introduced
        ctx.record(
            UndoableOperation::new(OperationType::Update, object, id)
                .with_undo_data(previous)
                .with_redo_data(patch),
        );

        Ok(ActionResult::success()
            .with_data(Value::Object(updated))
            .with_reload())
    }
}

pub struct DeleteHandler;

#[async_trait]
impl ActionHandler for DeleteHandler {
    async fn handle(&self, def: &ActionDef, ctx: &ActionContext) -> ActionOutcome {
        let object = object_name(def)?;
        let id = record_id_param(def)?;
        let ds = data_source(ctx)?;

        let previous = ds.find_one(object, &id).await?;
        let deleted = ds.delete(object, &id).await?;

        if deleted {
            let mut op = UndoableOperation::new(OperationType::Delete, object, &id);
            if let Some(previous) = previous {
                op = op.with_undo_data(previous);
            }
            ctx.record(op);
        }

        Ok(ActionResult::success()
            .with_data(json!({ "deleted": deleted }))
            .with_reload())
    }
}

pub struct NavigateHandler;

#[async_trait]
impl ActionHandler for NavigateHandler {
    async fn handle(&self, def: &ActionDef, _ctx: &ActionContext) -> ActionOutcome {
        let target = def
            .param_str("url")
            .or_else(|| def.param_str("to"))
            .ok_or_else(|| ActionError::MissingParam("url".to_string()))?;
        Ok(ActionResult::navigate(target))
    }
}

pub struct RefreshHandler;

#[async_trait]
impl ActionHandler for RefreshHandler {
    async fn handle(&self, _def: &ActionDef, _ctx: &ActionContext) -> ActionOutcome {
        Ok(ActionResult::success().with_reload())
    }
}

/// Every built-in handler keyed by its action type
pub fn builtin_handlers() -> Vec<(&'static str, Arc<dyn ActionHandler>)> {
    let handlers: [(&'static str, Arc<dyn ActionHandler>); 5] = [
        ("create", Arc::new(CreateHandler)),
        ("update", Arc::new(UpdateHandler)),
        ("delete", Arc::new(DeleteHandler)),
        ("navigate", Arc::new(NavigateHandler)),
        ("refresh", Arc::new(RefreshHandler)),
    ];
    handlers.into()
}
