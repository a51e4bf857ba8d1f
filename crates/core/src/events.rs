//! Workflow events handed to asynchronous sinks (audit log, notifications).
//!
//! Emission never blocks the workflow: a sink must return immediately and do
//! any delivery on its own task.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::types::{DbId, Timestamp};

/// Known event type names.
pub mod event_types {
    pub const MOVEMENT_CREATED: &str = "movement.created";
    pub const MOVEMENT_APPROVED: &str = "movement.approved";
    pub const MOVEMENT_REJECTED: &str = "movement.rejected";
    pub const MOVEMENT_DENIED: &str = "movement.denied";
    pub const ASSET_REGISTERED: &str = "asset.registered";
    pub const ASSET_LABEL_ASSIGNED: &str = "asset.label_assigned";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Audit,
    Notification,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowEvent {
    pub kind: EventKind,
    /// Dot-separated event name, e.g. `"movement.approved"`.
    pub event_type: String,
    pub actor_id: Option<DbId>,
    pub subject_type: Option<String>,
    pub subject_id: Option<DbId>,
    pub payload: serde_json::Value,
    pub timestamp: Timestamp,
}

impl WorkflowEvent {
    pub fn new(kind: EventKind, event_type: impl Into<String>, timestamp: Timestamp) -> Self {
        Self {
            kind,
            event_type: event_type.into(),
            actor_id: None,
            subject_type: None,
            subject_id: None,
            payload: serde_json::Value::Object(Default::default()),
            timestamp,
        }
    }

    pub fn with_actor(mut self, actor_id: DbId) -> Self {
        self.actor_id = Some(actor_id);
        self
    }

    pub fn with_subject(mut self, subject_type: impl Into<String>, subject_id: DbId) -> Self {
        self.subject_type = Some(subject_type.into());
        self.subject_id = Some(subject_id);
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

/// Fire-and-forget consumer of workflow events.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: WorkflowEvent);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: WorkflowEvent) {}
}

/// Keeps every event in memory; used by tests across the workspace.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<WorkflowEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<WorkflowEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn event_types(&self) -> Vec<String> {
        self.events().into_iter().map(|e| e.event_type).collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: WorkflowEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
