//! Repository for `areas`, `asset_types`, and `assets`.

use assetflow_core::assets::NewAsset;
use assetflow_core::audit::NewAuditRecord;
use assetflow_core::store::AssetFilter;
use assetflow_core::types::DbId;
use sqlx::PgPool;

use super::AuditRepo;
use crate::models::asset::{AreaRow, AssetRow, AssetTypeRow, LocatedAssetRow};

const AREA_COLUMNS: &str = "id, code, name, is_active";
const TYPE_COLUMNS: &str = "id, area_id, name, is_mobile";

/// Column list for plain `assets` queries.
const COLUMNS: &str = "id, internal_code, label, serial_number, name, area_id, asset_type_id, \
    room_id, condition, custodian_id, warranty_until, is_leasing, leasing_company, leasing_end, \
    created_at, created_by, version";

/// Asset columns plus the room's campus and the type's mobility.
const LOCATED_COLUMNS: &str = "a.id, a.internal_code, a.label, a.serial_number, a.name, \
    a.area_id, a.asset_type_id, a.room_id, a.condition, a.custodian_id, a.warranty_until, \
    a.is_leasing, a.leasing_company, a.leasing_end, a.created_at, a.created_by, a.version, \
    s.campus_id, t.is_mobile";

const LOCATED_FROM: &str = "FROM assets a \
    JOIN asset_types t ON t.id = a.asset_type_id \
    LEFT JOIN rooms r ON r.id = a.room_id \
    LEFT JOIN blocks b ON b.id = r.block_id \
    LEFT JOIN sites s ON s.id = b.site_id";

pub struct AssetRepo;

impl AssetRepo {
    // -- lookups --

    pub async fn find_area(pool: &PgPool, id: DbId) -> Result<Option<AreaRow>, sqlx::Error> {
        let query = format!("SELECT {AREA_COLUMNS} FROM areas WHERE id = $1");
        sqlx::query_as::<_, AreaRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_asset_type(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<AssetTypeRow>, sqlx::Error> {
        let query = format!("SELECT {TYPE_COLUMNS} FROM asset_types WHERE id = $1");
        sqlx::query_as::<_, AssetTypeRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_asset_types(
        pool: &PgPool,
        area_id: DbId,
    ) -> Result<Vec<AssetTypeRow>, sqlx::Error> {
        let query = format!("SELECT {TYPE_COLUMNS} FROM asset_types WHERE area_id = $1 ORDER BY name");
        sqlx::query_as::<_, AssetTypeRow>(&query)
            .bind(area_id)
            .fetch_all(pool)
            .await
    }

    // -- located reads --

    pub async fn locate(pool: &PgPool, id: DbId) -> Result<Option<LocatedAssetRow>, sqlx::Error> {
        let query = format!("SELECT {LOCATED_COLUMNS} {LOCATED_FROM} WHERE a.id = $1");
        sqlx::query_as::<_, LocatedAssetRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn locate_by_code(
        pool: &PgPool,
        internal_code: &str,
    ) -> Result<Option<LocatedAssetRow>, sqlx::Error> {
        let query = format!("SELECT {LOCATED_COLUMNS} {LOCATED_FROM} WHERE a.internal_code = $1");
        sqlx::query_as::<_, LocatedAssetRow>(&query)
            .bind(internal_code)
            .fetch_optional(pool)
            .await
    }

    pub async fn locate_many(
        pool: &PgPool,
        ids: &[DbId],
    ) -> Result<Vec<LocatedAssetRow>, sqlx::Error> {
        let query = format!("SELECT {LOCATED_COLUMNS} {LOCATED_FROM} WHERE a.id = ANY($1)");
        sqlx::query_as::<_, LocatedAssetRow>(&query)
            .bind(ids)
            .fetch_all(pool)
            .await
    }

    pub async fn locate_by_codes(
        pool: &PgPool,
        codes: &[String],
    ) -> Result<Vec<LocatedAssetRow>, sqlx::Error> {
        let query =
            format!("SELECT {LOCATED_COLUMNS} {LOCATED_FROM} WHERE a.internal_code = ANY($1)");
        sqlx::query_as::<_, LocatedAssetRow>(&query)
            .bind(codes)
            .fetch_all(pool)
            .await
    }

    pub async fn list(
        pool: &PgPool,
        filter: &AssetFilter,
    ) -> Result<Vec<LocatedAssetRow>, sqlx::Error> {
        let query = format!(
            "SELECT {LOCATED_COLUMNS} {LOCATED_FROM} \
             WHERE ($1::BIGINT IS NULL OR a.area_id = $1) \
               AND ($2::BIGINT IS NULL OR a.room_id = $2) \
               AND ($3::BIGINT IS NULL OR a.custodian_id = $3) \
             ORDER BY a.internal_code"
        );
        sqlx::query_as::<_, LocatedAssetRow>(&query)
            .bind(filter.area_id)
            .bind(filter.room_id)
            .bind(filter.custodian_id)
            .fetch_all(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<AssetRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM assets WHERE id = $1");
        sqlx::query_as::<_, AssetRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    // -- duplicate checks --

    pub async fn serial_exists(pool: &PgPool, serial_number: &str) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM assets WHERE serial_number = $1)")
            .bind(serial_number)
            .fetch_one(pool)
            .await
    }

    pub async fn label_exists(
        pool: &PgPool,
        label: &str,
        excluding: Option<DbId>,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS ( \
                 SELECT 1 FROM assets \
                 WHERE label = $1 AND label <> 'PENDING' \
                   AND ($2::BIGINT IS NULL OR id <> $2) \
             )",
        )
        .bind(label)
        .bind(excluding)
        .fetch_one(pool)
        .await
    }

    // -- writes --

    /// Insert an asset and its creation audit record in one transaction.
    pub async fn create(
        pool: &PgPool,
        input: &NewAsset,
        audit: &NewAuditRecord,
    ) -> Result<AssetRow, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO assets \
                (internal_code, label, serial_number, name, area_id, asset_type_id, room_id, \
                 condition, custodian_id, warranty_until, is_leasing, leasing_company, \
                 leasing_end, created_at, created_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15) \
             RETURNING {COLUMNS}"
        );
        let asset = sqlx::query_as::<_, AssetRow>(&query)
            .bind(&input.internal_code)
            .bind(&input.label)
            .bind(&input.serial_number)
            .bind(&input.name)
            .bind(input.area_id)
            .bind(input.asset_type_id)
            .bind(input.room_id)
            .bind(input.condition.as_str())
            .bind(input.custodian_id)
            .bind(input.warranty_until)
            .bind(input.is_leasing)
            .bind(&input.leasing_company)
            .bind(input.leasing_end)
            .bind(input.created_at)
            .bind(input.created_by)
            .fetch_one(&mut *tx)
            .await?;

        AuditRepo::insert_in(&mut tx, asset.id, audit).await?;

        tx.commit().await?;
        Ok(asset)
    }

    /// Replace the label if the row is still at `expected_version`.
    ///
    /// Returns `None` (and writes nothing) when the version moved or the
    /// asset does not exist.
    pub async fn update_label(
        pool: &PgPool,
        asset_id: DbId,
        expected_version: i64,
        label: &str,
        audit: &NewAuditRecord,
    ) -> Result<Option<AssetRow>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "UPDATE assets SET label = $3, version = version + 1 \
             WHERE id = $1 AND version = $2 \
             RETURNING {COLUMNS}"
        );
        let Some(asset) = sqlx::query_as::<_, AssetRow>(&query)
            .bind(asset_id)
            .bind(expected_version)
            .bind(label)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(None);
        };

        AuditRepo::insert_in(&mut tx, asset.id, audit).await?;

        tx.commit().await?;
        Ok(Some(asset))
    }
}
