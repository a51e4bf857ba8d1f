//! Repository for the `audit_records` table.

use assetflow_core::audit::NewAuditRecord;
use assetflow_core::types::DbId;
use sqlx::types::Json;
use sqlx::PgPool;

use super::Tx;
use crate::models::audit::AuditRecordRow;

const COLUMNS: &str = "id, asset_id, movement_id, action, actor_id, changes, recorded_at";

pub struct AuditRepo;

impl AuditRepo {
    /// Append one record inside the caller's transaction.
    pub async fn insert_in(
        tx: &mut Tx<'_>,
        asset_id: DbId,
        record: &NewAuditRecord,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO audit_records (asset_id, movement_id, action, actor_id, changes, recorded_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(asset_id)
        .bind(record.movement_id)
        .bind(&record.action)
        .bind(record.actor_id)
        .bind(Json(&record.changes))
        .bind(record.recorded_at)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// All records for an asset, newest first.
    pub async fn list_for_asset(
        pool: &PgPool,
        asset_id: DbId,
    ) -> Result<Vec<AuditRecordRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM audit_records \
             WHERE asset_id = $1 \
             ORDER BY id DESC"
        );
        sqlx::query_as::<_, AuditRecordRow>(&query)
            .bind(asset_id)
            .fetch_all(pool)
            .await
    }
}
