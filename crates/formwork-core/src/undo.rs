//! Bounded undo/redo history
//!
//! [`UndoManager`] only records operations. Issuing the compensating data
//! source calls is the job of the action runner (see
//! [`ActionRunner::undo`](crate::action::ActionRunner::undo)).
//!
//! The manager is shared between tasks as `Arc<parking_lot::Mutex<UndoManager>>`.
//! Listeners are invoked synchronously while that lock is held, so they must
//! not call back into the manager.

use chrono::{DateTime, Utc};
use formwork_config::{UndoConfig, DEFAULT_MAX_HISTORY};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use uuid::Uuid;

use crate::data_source::Record;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    Create,
    Update,
    Delete,
}

/// A reversible record mutation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UndoableOperation {
    pub id: String,
    #[serde(rename = "type")]
    pub op_type: OperationType,
    pub object_name: String,
    pub record_id: String,
    pub timestamp: DateTime<Utc>,
    pub description: String,
    /// State needed to revert the operation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub undo_data: Option<Record>,
    /// State needed to apply the operation again
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redo_data: Option<Record>,
}

impl UndoableOperation {
    pub fn new(
        op_type: OperationType,
        object_name: impl Into<String>,
        record_id: impl Into<String>,
    ) -> Self {
        let object_name = object_name.into();
        let record_id = record_id.into();
        let verb = match op_type {
            OperationType::Create => "Create",
            OperationType::Update => "Update",
            OperationType::Delete => "Delete",
        };
        Self {
            id: Uuid::new_v4().to_string(),
            op_type,
            description: format!("{} {} {}", verb, object_name, record_id),
            object_name,
            record_id,
            timestamp: Utc::now(),
            undo_data: None,
            redo_data: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_undo_data(mut self, data: Record) -> Self {
        self.undo_data = Some(data);
        self
    }

    pub fn with_redo_data(mut self, data: Record) -> Self {
        self.redo_data = Some(data);
        self
    }
}

/// Stack sizes delivered to listeners after every change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UndoSnapshot {
    pub undo_count: usize,
    pub redo_count: usize,
}

/// Change listener; identity is the `Arc` allocation
pub type UndoListener = Arc<dyn Fn(UndoSnapshot) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

pub struct UndoManager {
    undo_stack: VecDeque<UndoableOperation>,
    redo_stack: VecDeque<UndoableOperation>,
    max_history: usize,
    listeners: Vec<(SubscriptionId, UndoListener)>,
    next_subscription: u64,
}

impl std::fmt::Debug for UndoManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UndoManager")
            .field("undo_count", &self.undo_stack.len())
            .field("redo_count", &self.redo_stack.len())
            .field("max_history", &self.max_history)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Default for UndoManager {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HISTORY)
    }
}

impl UndoManager {
    /// Create a manager keeping at most `max_history` undo entries
    ///
    /// A zero limit is raised to one.
    pub fn new(max_history: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: VecDeque::new(),
            max_history: max_history.max(1),
            listeners: Vec::new(),
            next_subscription: 0,
        }
    }

    pub fn from_config(config: &UndoConfig) -> Self {
        Self::new(config.max_history)
    }

    pub fn max_history(&self) -> usize {
        self.max_history
    }

    /// Record a new operation, evicting the oldest on overflow
    ///
    /// Any pending redo history is discarded.
    pub fn push(&mut self, op: UndoableOperation) {
        tracing::debug!(op_id = %op.id, description = %op.description, "undo push");
        self.undo_stack.push_back(op);
        while self.undo_stack.len() > self.max_history {
            self.undo_stack.pop_front();
        }
        self.redo_stack.clear();
        self.notify();
    }

    /// Move the most recent operation to the redo stack and return it
    pub fn pop_undo(&mut self) -> Option<UndoableOperation> {
        let op = self.undo_stack.pop_back()?;
        self.redo_stack.push_back(op.clone());
        self.notify();
        Some(op)
    }

    /// Move the most recently undone operation back to the undo stack
    pub fn pop_redo(&mut self) -> Option<UndoableOperation> {
        let op = self.redo_stack.pop_back()?;
        self.undo_stack.push_back(op.clone());
        while self.undo_stack.len() > self.max_history {
            self.undo_stack.pop_front();
        }
        self.notify();
        Some(op)
    }

    pub fn peek_undo(&self) -> Option<&UndoableOperation> {
        self.undo_stack.back()
    }

    pub fn peek_redo(&self) -> Option<&UndoableOperation> {
        self.redo_stack.back()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn snapshot(&self) -> UndoSnapshot {
        UndoSnapshot {
            undo_count: self.undo_stack.len(),
            redo_count: self.redo_stack.len(),
        }
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.notify();
    }

    /// Reverse a [`pop_undo`](Self::pop_undo) whose compensation failed
    pub(crate) fn restore_undo(&mut self, op_id: &str) {
        if let Some(pos) = self.redo_stack.iter().rposition(|op| op.id == op_id) {
            if let Some(op) = self.redo_stack.remove(pos) {
                self.undo_stack.push_back(op);
                self.notify();
            }
        }
    }

    /// Reverse a [`pop_redo`](Self::pop_redo) whose re-application failed
    pub(crate) fn restore_redo(&mut self, op_id: &str) {
        if let Some(pos) = self.undo_stack.iter().rposition(|op| op.id == op_id) {
            if let Some(op) = self.undo_stack.remove(pos) {
                self.redo_stack.push_back(op);
                self.notify();
            }
        }
    }

    /// Point every entry for `old_id` at `new_id`
    ///
    /// Re-creating a deleted record yields a fresh backend id; later history
    /// entries must follow it.
    pub fn rebind_record_id(&mut self, object_name: &str, old_id: &str, new_id: &str) {
        for op in self.undo_stack.iter_mut().chain(self.redo_stack.iter_mut()) {
            if op.object_name == object_name && op.record_id == old_id {
                op.record_id = new_id.to_string();
            }
        }
    }

    /// Register a listener; subscribing the same `Arc` twice returns the
    /// original id
    pub fn subscribe(&mut self, listener: UndoListener) -> SubscriptionId {
        if let Some((id, _)) = self
            .listeners
            .iter()
            .find(|(_, existing)| Arc::ptr_eq(existing, &listener))
        {
            return *id;
        }
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, listener));
        id
    }

    /// Remove a listener; returns whether it was registered
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    fn notify(&self) {
        let snapshot = self.snapshot();
        for (_, listener) in &self.listeners {
            listener(snapshot);
        }
    }
}
