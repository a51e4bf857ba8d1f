//! Append-only asset audit trail.

use serde::{Deserialize, Serialize};

use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Action constants
// ---------------------------------------------------------------------------

/// Known audit actions.
pub mod actions {
    pub const ASSET_CREATED: &str = "asset_created";
    pub const LABEL_ASSIGNED: &str = "label_assigned";
    pub const MOVEMENT_APPLIED: &str = "movement_applied";
    pub const REPLACEMENT_APPLIED: &str = "replacement_applied";
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange {
    pub field: String,
    pub old: Option<String>,
    pub new: Option<String>,
}

impl FieldChange {
    pub fn new(field: &str, old: Option<String>, new: Option<String>) -> Self {
        Self {
            field: field.to_string(),
            old,
            new,
        }
    }
}

/// Audit record before it is attached to an asset row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAuditRecord {
    pub movement_id: Option<DbId>,
    pub action: String,
    pub actor_id: DbId,
    pub changes: Vec<FieldChange>,
    pub recorded_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: DbId,
    pub asset_id: DbId,
    pub movement_id: Option<DbId>,
    pub action: String,
    pub actor_id: DbId,
    pub changes: Vec<FieldChange>,
    pub recorded_at: Timestamp,
}

/// Push a change for `field` only if the value differs.
pub fn track<T: ToString + PartialEq>(
    changes: &mut Vec<FieldChange>,
    field: &str,
    old: Option<T>,
    new: Option<T>,
) {
    if old != new {
        changes.push(FieldChange::new(
            field,
            old.map(|v| v.to_string()),
            new.map(|v| v.to_string()),
        ));
    }
}
