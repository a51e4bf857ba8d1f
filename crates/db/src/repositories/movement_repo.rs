//! Repository for `movements` and `movement_assets`.

use assetflow_core::movement::{MovementFilter, MovementStatus, NewMovement, Resolution};
use assetflow_core::notification::NewNotification;
use assetflow_core::types::DbId;
use sqlx::PgPool;

use super::{AuditRepo, NotificationRepo, Tx};
use crate::models::movement::MovementRow;

/// Column list for `movements m`; target ids come back in request order.
const COLUMNS: &str = "m.id, m.movement_type, \
    ARRAY(SELECT ma.asset_id FROM movement_assets ma \
          WHERE ma.movement_id = m.id ORDER BY ma.position) AS asset_ids, \
    m.origin_room_id, m.destination_room_id, m.destination_custodian_id, m.new_condition, \
    m.replacement_asset_id, m.expected_return, m.requester_id, m.authorizer_id, m.resolver_id, \
    m.status, m.reason, m.rejection_reason, m.evidence_note, m.evidence_photo, m.created_at, \
    m.resolved_at";

/// Outcome of [`MovementRepo::apply_resolution`]. Anything but `Applied`
/// rolled the transaction back.
#[derive(Debug)]
pub enum ApplyOutcome {
    Applied(MovementRow),
    Missing,
    NotPending,
    /// The named asset's version no longer matched the plan.
    VersionMismatch(DbId),
}

pub struct MovementRepo;

impl MovementRepo {
    /// Insert a pending movement, its targets, and the authorizer's
    /// notification in one transaction.
    pub async fn create(
        pool: &PgPool,
        input: &NewMovement,
        notification: &NewNotification,
    ) -> Result<MovementRow, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let movement_id: DbId = sqlx::query_scalar(
            "INSERT INTO movements \
                (movement_type, origin_room_id, destination_room_id, destination_custodian_id, \
                 new_condition, replacement_asset_id, expected_return, requester_id, \
                 authorizer_id, status, reason, evidence_note, evidence_photo, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) \
             RETURNING id",
        )
        .bind(input.movement_type.as_str())
        .bind(input.origin_room_id)
        .bind(input.destination_room_id)
        .bind(input.destination_custodian_id)
        .bind(input.new_condition.map(|c| c.as_str()))
        .bind(input.replacement_asset_id)
        .bind(input.expected_return)
        .bind(input.requester_id)
        .bind(input.authorizer_id)
        .bind(MovementStatus::Pending.as_str())
        .bind(&input.reason)
        .bind(&input.evidence_note)
        .bind(&input.evidence_photo)
        .bind(input.created_at)
        .fetch_one(&mut *tx)
        .await?;

        for (position, asset_id) in input.asset_ids.iter().enumerate() {
            sqlx::query(
                "INSERT INTO movement_assets (movement_id, asset_id, position) VALUES ($1, $2, $3)",
            )
            .bind(movement_id)
            .bind(asset_id)
            .bind(position as i32)
            .execute(&mut *tx)
            .await?;
        }

        NotificationRepo::insert_in(&mut tx, notification, Some(movement_id)).await?;

        let movement = Self::find_in(&mut tx, movement_id).await?;
        tx.commit().await?;
        Ok(movement)
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<MovementRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM movements m WHERE m.id = $1");
        sqlx::query_as::<_, MovementRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Movements matching every set filter field, newest first.
    pub async fn list(
        pool: &PgPool,
        filter: &MovementFilter,
    ) -> Result<Vec<MovementRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM movements m \
             WHERE ($1::TEXT IS NULL OR m.status = $1) \
               AND ($2::BIGINT IS NULL OR m.requester_id = $2) \
               AND ($3::BIGINT IS NULL OR m.authorizer_id = $3) \
             ORDER BY m.created_at DESC, m.id DESC"
        );
        sqlx::query_as::<_, MovementRow>(&query)
            .bind(filter.status.map(|s| s.as_str()))
            .bind(filter.requester_id)
            .bind(filter.authorizer_id)
            .fetch_all(pool)
            .await
    }

    /// Commit a resolution: lock the movement, require `pending`, apply each
    /// versioned asset update with its audit record, add the requester's
    /// notification, and stamp the movement.
    pub async fn apply_resolution(
        pool: &PgPool,
        resolution: &Resolution,
    ) -> Result<ApplyOutcome, sqlx::Error> {
        let movement_id = resolution.movement_id;
        let mut tx = pool.begin().await?;

        let status: Option<String> =
            sqlx::query_scalar("SELECT status FROM movements WHERE id = $1 FOR UPDATE")
                .bind(movement_id)
                .fetch_optional(&mut *tx)
                .await?;
        match status.as_deref() {
            None => return Ok(ApplyOutcome::Missing),
            Some(s) if s != MovementStatus::Pending.as_str() => {
                return Ok(ApplyOutcome::NotPending)
            }
            Some(_) => {}
        }

        for change in &resolution.changes {
            let updated = sqlx::query(
                "UPDATE assets \
                 SET room_id = $3, custodian_id = $4, condition = $5, version = version + 1 \
                 WHERE id = $1 AND version = $2",
            )
            .bind(change.asset_id)
            .bind(change.expected_version)
            .bind(change.after.room_id)
            .bind(change.after.custodian_id)
            .bind(change.after.condition.as_str())
            .execute(&mut *tx)
            .await?;
            if updated.rows_affected() == 0 {
                return Ok(ApplyOutcome::VersionMismatch(change.asset_id));
            }
            AuditRepo::insert_in(&mut tx, change.asset_id, &change.audit).await?;
        }

        NotificationRepo::insert_in(&mut tx, &resolution.notification, Some(movement_id)).await?;

        sqlx::query(
            "UPDATE movements \
             SET status = $2, resolver_id = $3, resolved_at = $4, rejection_reason = $5 \
             WHERE id = $1",
        )
        .bind(movement_id)
        .bind(resolution.status.as_str())
        .bind(resolution.resolver_id)
        .bind(resolution.resolved_at)
        .bind(&resolution.rejection_reason)
        .execute(&mut *tx)
        .await?;

        let movement = Self::find_in(&mut tx, movement_id).await?;
        tx.commit().await?;
        Ok(ApplyOutcome::Applied(movement))
    }

    async fn find_in(tx: &mut Tx<'_>, id: DbId) -> Result<MovementRow, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM movements m WHERE m.id = $1");
        sqlx::query_as::<_, MovementRow>(&query)
            .bind(id)
            .fetch_one(&mut **tx)
            .await
    }
}
