//! Rows for `campuses`, `sites`, `blocks`, and `rooms`.

use assetflow_core::location::{Block, Campus, Room, Site};
use assetflow_core::store::StoreError;
use assetflow_core::types::DbId;
use sqlx::FromRow;

use super::parse_column;

#[derive(Debug, Clone, FromRow)]
pub struct CampusRow {
    pub id: DbId,
    pub code: String,
    pub name: String,
    pub is_active: bool,
}

impl From<CampusRow> for Campus {
    fn from(row: CampusRow) -> Self {
        Campus {
            id: row.id,
            code: row.code,
            name: row.name,
            is_active: row.is_active,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct SiteRow {
    pub id: DbId,
    pub campus_id: DbId,
    pub official_code: i32,
    pub name: String,
}

impl TryFrom<SiteRow> for Site {
    type Error = StoreError;

    fn try_from(row: SiteRow) -> Result<Self, Self::Error> {
        let official_code = u32::try_from(row.official_code)
            .map_err(|_| StoreError::Backend(format!("site {} has a negative code", row.id)))?;
        Ok(Site {
            id: row.id,
            campus_id: row.campus_id,
            official_code,
            name: row.name,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct BlockRow {
    pub id: DbId,
    pub site_id: DbId,
    pub letter: String,
    pub floors: i32,
    pub basements: i32,
    pub name: Option<String>,
}

impl TryFrom<BlockRow> for Block {
    type Error = StoreError;

    fn try_from(row: BlockRow) -> Result<Self, Self::Error> {
        let letter = row
            .letter
            .chars()
            .next()
            .ok_or_else(|| StoreError::Backend(format!("block {} has no letter", row.id)))?;
        Ok(Block {
            id: row.id,
            site_id: row.site_id,
            letter,
            floors: row.floors,
            basements: row.basements,
            name: row.name,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct RoomRow {
    pub id: DbId,
    pub block_id: DbId,
    pub floor: i32,
    pub number: i32,
    pub code: String,
    pub capacity: Option<i32>,
    pub kind: String,
    pub name: String,
}

impl TryFrom<RoomRow> for Room {
    type Error = StoreError;

    fn try_from(row: RoomRow) -> Result<Self, Self::Error> {
        Ok(Room {
            kind: parse_column("rooms.kind", &row.kind)?,
            id: row.id,
            block_id: row.block_id,
            floor: row.floor,
            number: row.number,
            code: row.code,
            capacity: row.capacity,
            name: row.name,
        })
    }
}
