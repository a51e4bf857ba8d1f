//! Rows for `areas`, `asset_types`, `collaborators`, and `assets`.

use assetflow_core::assets::{Area, Asset, AssetType, Collaborator, LocatedAsset};
use assetflow_core::store::StoreError;
use assetflow_core::types::{Date, DbId, Timestamp};
use sqlx::FromRow;

use super::parse_column;

#[derive(Debug, Clone, FromRow)]
pub struct AreaRow {
    pub id: DbId,
    pub code: String,
    pub name: String,
    pub is_active: bool,
}

impl From<AreaRow> for Area {
    fn from(row: AreaRow) -> Self {
        Area {
            id: row.id,
            code: row.code,
            name: row.name,
            is_active: row.is_active,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct AssetTypeRow {
    pub id: DbId,
    pub area_id: DbId,
    pub name: String,
    pub is_mobile: bool,
}

impl From<AssetTypeRow> for AssetType {
    fn from(row: AssetTypeRow) -> Self {
        AssetType {
            id: row.id,
            area_id: row.area_id,
            name: row.name,
            is_mobile: row.is_mobile,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct CollaboratorRow {
    pub id: DbId,
    pub full_name: String,
    pub unit: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub is_active: bool,
}

impl From<CollaboratorRow> for Collaborator {
    fn from(row: CollaboratorRow) -> Self {
        Collaborator {
            id: row.id,
            full_name: row.full_name,
            unit: row.unit,
            email: row.email,
            phone: row.phone,
            is_active: row.is_active,
        }
    }
}

/// A row from the `assets` table.
#[derive(Debug, Clone, FromRow)]
pub struct AssetRow {
    pub id: DbId,
    pub internal_code: String,
    pub label: String,
    pub serial_number: Option<String>,
    pub name: String,
    pub area_id: DbId,
    pub asset_type_id: DbId,
    pub room_id: Option<DbId>,
    pub condition: String,
    pub custodian_id: Option<DbId>,
    pub warranty_until: Option<Date>,
    pub is_leasing: bool,
    pub leasing_company: Option<String>,
    pub leasing_end: Option<Date>,
    pub created_at: Timestamp,
    pub created_by: DbId,
    pub version: i64,
}

impl TryFrom<AssetRow> for Asset {
    type Error = StoreError;

    fn try_from(row: AssetRow) -> Result<Self, Self::Error> {
        Ok(Asset {
            condition: parse_column("assets.condition", &row.condition)?,
            id: row.id,
            internal_code: row.internal_code,
            label: row.label,
            serial_number: row.serial_number,
            name: row.name,
            area_id: row.area_id,
            asset_type_id: row.asset_type_id,
            room_id: row.room_id,
            custodian_id: row.custodian_id,
            warranty_until: row.warranty_until,
            is_leasing: row.is_leasing,
            leasing_company: row.leasing_company,
            leasing_end: row.leasing_end,
            created_at: row.created_at,
            created_by: row.created_by,
            version: row.version,
        })
    }
}

/// An asset joined with its room's campus and its type's mobility.
#[derive(Debug, Clone, FromRow)]
pub struct LocatedAssetRow {
    #[sqlx(flatten)]
    pub asset: AssetRow,
    pub campus_id: Option<DbId>,
    pub is_mobile: bool,
}

impl TryFrom<LocatedAssetRow> for LocatedAsset {
    type Error = StoreError;

    fn try_from(row: LocatedAssetRow) -> Result<Self, Self::Error> {
        Ok(LocatedAsset {
            asset: row.asset.try_into()?,
            campus_id: row.campus_id,
            is_mobile: row.is_mobile,
        })
    }
}
