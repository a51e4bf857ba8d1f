//! Rows for `movements` with their ordered `movement_assets`.

use assetflow_core::movement::Movement;
use assetflow_core::store::StoreError;
use assetflow_core::types::{Date, DbId, Timestamp};
use sqlx::FromRow;

use super::parse_column;

/// A `movements` row; `asset_ids` is aggregated from `movement_assets` in
/// position order.
#[derive(Debug, Clone, FromRow)]
pub struct MovementRow {
    pub id: DbId,
    pub movement_type: String,
    pub asset_ids: Vec<DbId>,
    pub origin_room_id: Option<DbId>,
    pub destination_room_id: Option<DbId>,
    pub destination_custodian_id: Option<DbId>,
    pub new_condition: Option<String>,
    pub replacement_asset_id: Option<DbId>,
    pub expected_return: Option<Date>,
    pub requester_id: DbId,
    pub authorizer_id: DbId,
    pub resolver_id: Option<DbId>,
    pub status: String,
    pub reason: String,
    pub rejection_reason: Option<String>,
    pub evidence_note: Option<String>,
    pub evidence_photo: Option<String>,
    pub created_at: Timestamp,
    pub resolved_at: Option<Timestamp>,
}

impl TryFrom<MovementRow> for Movement {
    type Error = StoreError;

    fn try_from(row: MovementRow) -> Result<Self, Self::Error> {
        let new_condition = row
            .new_condition
            .as_deref()
            .map(|c| parse_column("movements.new_condition", c))
            .transpose()?;
        Ok(Movement {
            movement_type: parse_column("movements.movement_type", &row.movement_type)?,
            status: parse_column("movements.status", &row.status)?,
            new_condition,
            id: row.id,
            asset_ids: row.asset_ids,
            origin_room_id: row.origin_room_id,
            destination_room_id: row.destination_room_id,
            destination_custodian_id: row.destination_custodian_id,
            replacement_asset_id: row.replacement_asset_id,
            expected_return: row.expected_return,
            requester_id: row.requester_id,
            authorizer_id: row.authorizer_id,
            resolver_id: row.resolver_id,
            reason: row.reason,
            rejection_reason: row.rejection_reason,
            evidence_note: row.evidence_note,
            evidence_photo: row.evidence_photo,
            created_at: row.created_at,
            resolved_at: row.resolved_at,
        })
    }
}
