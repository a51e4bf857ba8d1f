//! Rows for `audit_records`.

use assetflow_core::audit::{AuditRecord, FieldChange};
use assetflow_core::types::{DbId, Timestamp};
use sqlx::types::Json;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct AuditRecordRow {
    pub id: DbId,
    pub asset_id: DbId,
    pub movement_id: Option<DbId>,
    pub action: String,
    pub actor_id: DbId,
    pub changes: Json<Vec<FieldChange>>,
    pub recorded_at: Timestamp,
}

impl From<AuditRecordRow> for AuditRecord {
    fn from(row: AuditRecordRow) -> Self {
        AuditRecord {
            id: row.id,
            asset_id: row.asset_id,
            movement_id: row.movement_id,
            action: row.action,
            actor_id: row.actor_id,
            changes: row.changes.0,
            recorded_at: row.recorded_at,
        }
    }
}
