//! PostgreSQL implementation of the core store traits.
//!
//! Thin glue over the repositories: convert rows into core types and
//! translate `sqlx` failures into [`StoreError`].

use assetflow_core::assets::{Area, Asset, AssetType, Collaborator, LocatedAsset, NewAsset};
use assetflow_core::audit::{AuditRecord, NewAuditRecord};
use assetflow_core::location::{
    room_code, Block, Campus, NewBlock, NewRoom, Room, RoomInsert, Site, SiteCodeUpdate,
};
use assetflow_core::movement::{Movement, MovementFilter, NewMovement, Resolution};
use assetflow_core::notification::{NewNotification, Notification};
use assetflow_core::scope::Actor;
use assetflow_core::store::{
    constraints, AssetFilter, AssetStore, AuditStore, Directory, LocationStore, MovementStore,
    NotificationStore, SequenceStore, StoreError, StoreResult,
};
use assetflow_core::types::{DbId, Timestamp};
use async_trait::async_trait;
use sqlx::PgPool;

use crate::repositories::location_repo::{GuardedRoomInsert, SiteCodeChange};
use crate::repositories::movement_repo::ApplyOutcome;
use crate::repositories::{
    AssetRepo, AuditRepo, DirectoryRepo, LocationRepo, MovementRepo, NotificationRepo,
    SequenceRepo,
};

/// PostgreSQL unique-violation SQLSTATE.
const UNIQUE_VIOLATION: &str = "23505";

/// Store backed by a PostgreSQL pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Map a `sqlx` error into a [`StoreError`].
///
/// Unique violations keep their constraint name so the core can tell which
/// rule fired. Everything else is logged here and surfaced as a backend error.
fn store_err(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = e {
        if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
            return StoreError::UniqueViolation {
                constraint: db_err.constraint().unwrap_or_default().to_string(),
            };
        }
    }
    tracing::error!(error = %e, "Database error");
    StoreError::Backend(e.to_string())
}

fn convert_all<R, T>(rows: Vec<R>) -> StoreResult<Vec<T>>
where
    T: TryFrom<R, Error = StoreError>,
{
    rows.into_iter().map(T::try_from).collect()
}

fn to_db_code(official_code: u32) -> StoreResult<i32> {
    i32::try_from(official_code)
        .map_err(|_| StoreError::Backend(format!("official code {official_code} out of range")))
}

// ---------------------------------------------------------------------------
// Locations
// ---------------------------------------------------------------------------

impl PgStore {
    /// Code the room at `input`'s position would get under the current site
    /// code.
    async fn current_room_code(&self, input: &NewRoom) -> StoreResult<String> {
        let block = self.get_block(input.block_id).await?.ok_or_else(|| StoreError::NotFound {
            entity: "Block",
            key: input.block_id.to_string(),
        })?;
        let site = self.get_site(block.site_id).await?.ok_or_else(|| StoreError::NotFound {
            entity: "Site",
            key: block.site_id.to_string(),
        })?;
        room_code(site.official_code, block.letter, input.floor, input.number)
            .map_err(|e| StoreError::Backend(e.to_string()))
    }
}

#[async_trait]
impl LocationStore for PgStore {
    async fn get_campus(&self, id: DbId) -> StoreResult<Option<Campus>> {
        let row = LocationRepo::find_campus(&self.pool, id)
            .await
            .map_err(store_err)?;
        Ok(row.map(Campus::from))
    }

    async fn get_site(&self, id: DbId) -> StoreResult<Option<Site>> {
        LocationRepo::find_site(&self.pool, id)
            .await
            .map_err(store_err)?
            .map(Site::try_from)
            .transpose()
    }

    async fn get_block(&self, id: DbId) -> StoreResult<Option<Block>> {
        LocationRepo::find_block(&self.pool, id)
            .await
            .map_err(store_err)?
            .map(Block::try_from)
            .transpose()
    }

    async fn get_room(&self, id: DbId) -> StoreResult<Option<Room>> {
        LocationRepo::find_room(&self.pool, id)
            .await
            .map_err(store_err)?
            .map(Room::try_from)
            .transpose()
    }

    async fn find_room_by_code(&self, code: &str) -> StoreResult<Option<Room>> {
        LocationRepo::find_room_by_code(&self.pool, code)
            .await
            .map_err(store_err)?
            .map(Room::try_from)
            .transpose()
    }

    async fn list_sites(&self, campus_id: DbId) -> StoreResult<Vec<Site>> {
        let rows = LocationRepo::list_sites(&self.pool, campus_id)
            .await
            .map_err(store_err)?;
        convert_all(rows)
    }

    async fn list_blocks(&self, site_id: DbId) -> StoreResult<Vec<Block>> {
        let rows = LocationRepo::list_blocks(&self.pool, site_id)
            .await
            .map_err(store_err)?;
        convert_all(rows)
    }

    async fn list_rooms(&self, block_id: DbId) -> StoreResult<Vec<Room>> {
        let rows = LocationRepo::list_rooms(&self.pool, block_id)
            .await
            .map_err(store_err)?;
        convert_all(rows)
    }

    async fn room_campus(&self, room_id: DbId) -> StoreResult<Option<DbId>> {
        LocationRepo::room_campus(&self.pool, room_id)
            .await
            .map_err(store_err)
    }

    async fn insert_block(&self, input: &NewBlock) -> StoreResult<Block> {
        LocationRepo::create_block(&self.pool, input)
            .await
            .map_err(store_err)?
            .try_into()
    }

    async fn insert_room_guarded(&self, input: &NewRoom) -> StoreResult<RoomInsert> {
        match LocationRepo::insert_room_guarded(&self.pool, input).await {
            Ok(GuardedRoomInsert::Created(row)) => Ok(RoomInsert::Created(row.try_into()?)),
            Ok(GuardedRoomInsert::Existing(row)) => Ok(RoomInsert::Existing(row.try_into()?)),
            Ok(GuardedRoomInsert::CodeTaken(row)) => Ok(RoomInsert::CodeTaken(row.try_into()?)),
            Ok(GuardedRoomInsert::MissingBlock) => Err(StoreError::NotFound {
                entity: "Block",
                key: input.block_id.to_string(),
            }),
            Ok(GuardedRoomInsert::InvalidCode(reason)) => Err(StoreError::Backend(reason)),
            Err(e) => match store_err(e) {
                // A racing insert won between our lookup and our write.
                StoreError::UniqueViolation { constraint }
                    if constraint == constraints::ROOM_POSITION =>
                {
                    let row = LocationRepo::find_room_by_position(
                        &self.pool,
                        input.block_id,
                        input.floor,
                        input.number,
                    )
                    .await
                    .map_err(store_err)?
                    .ok_or(StoreError::UniqueViolation { constraint })?;
                    Ok(RoomInsert::Existing(row.try_into()?))
                }
                StoreError::UniqueViolation { constraint } if constraint == constraints::ROOM_CODE => {
                    let code = self.current_room_code(input).await?;
                    let row = LocationRepo::find_room_by_code(&self.pool, &code)
                        .await
                        .map_err(store_err)?
                        .ok_or(StoreError::UniqueViolation { constraint })?;
                    Ok(RoomInsert::CodeTaken(row.try_into()?))
                }
                other => Err(other),
            },
        }
    }

    async fn update_site_code_if_no_rooms(
        &self,
        site_id: DbId,
        official_code: u32,
    ) -> StoreResult<SiteCodeUpdate> {
        let code = to_db_code(official_code)?;
        match LocationRepo::update_site_code_if_no_rooms(&self.pool, site_id, code)
            .await
            .map_err(store_err)?
        {
            SiteCodeChange::Updated(row) => Ok(SiteCodeUpdate::Updated(row.try_into()?)),
            SiteCodeChange::HasRooms => Ok(SiteCodeUpdate::HasRooms),
            SiteCodeChange::Missing => Err(StoreError::NotFound {
                entity: "Site",
                key: site_id.to_string(),
            }),
        }
    }
}

#[async_trait]
impl SequenceStore for PgStore {
    async fn next_sequence(&self, prefix: &str, year: i32) -> StoreResult<u32> {
        let value = SequenceRepo::next(&self.pool, prefix, year)
            .await
            .map_err(store_err)?;
        u32::try_from(value)
            .map_err(|_| StoreError::Backend(format!("sequence {prefix}/{year} is negative")))
    }
}

// ---------------------------------------------------------------------------
// Assets
// ---------------------------------------------------------------------------

#[async_trait]
impl AssetStore for PgStore {
    async fn get_area(&self, id: DbId) -> StoreResult<Option<Area>> {
        let row = AssetRepo::find_area(&self.pool, id)
            .await
            .map_err(store_err)?;
        Ok(row.map(Area::from))
    }

    async fn get_asset_type(&self, id: DbId) -> StoreResult<Option<AssetType>> {
        let row = AssetRepo::find_asset_type(&self.pool, id)
            .await
            .map_err(store_err)?;
        Ok(row.map(AssetType::from))
    }

    async fn list_asset_types(&self, area_id: DbId) -> StoreResult<Vec<AssetType>> {
        let rows = AssetRepo::list_asset_types(&self.pool, area_id)
            .await
            .map_err(store_err)?;
        Ok(rows.into_iter().map(AssetType::from).collect())
    }

    async fn locate_asset(&self, id: DbId) -> StoreResult<Option<LocatedAsset>> {
        AssetRepo::locate(&self.pool, id)
            .await
            .map_err(store_err)?
            .map(LocatedAsset::try_from)
            .transpose()
    }

    async fn locate_asset_by_code(&self, internal_code: &str) -> StoreResult<Option<LocatedAsset>> {
        AssetRepo::locate_by_code(&self.pool, internal_code)
            .await
            .map_err(store_err)?
            .map(LocatedAsset::try_from)
            .transpose()
    }

    async fn locate_assets(&self, ids: &[DbId]) -> StoreResult<Vec<LocatedAsset>> {
        let rows = AssetRepo::locate_many(&self.pool, ids)
            .await
            .map_err(store_err)?;
        convert_all(rows)
    }

    async fn locate_assets_by_codes(&self, codes: &[String]) -> StoreResult<Vec<LocatedAsset>> {
        let rows = AssetRepo::locate_by_codes(&self.pool, codes)
            .await
            .map_err(store_err)?;
        convert_all(rows)
    }

    async fn list_assets(&self, filter: &AssetFilter) -> StoreResult<Vec<LocatedAsset>> {
        let rows = AssetRepo::list(&self.pool, filter)
            .await
            .map_err(store_err)?;
        convert_all(rows)
    }

    async fn serial_exists(&self, serial_number: &str) -> StoreResult<bool> {
        AssetRepo::serial_exists(&self.pool, serial_number)
            .await
            .map_err(store_err)
    }

    async fn label_exists(&self, label: &str, excluding: Option<DbId>) -> StoreResult<bool> {
        AssetRepo::label_exists(&self.pool, label, excluding)
            .await
            .map_err(store_err)
    }

    async fn insert_asset(&self, input: &NewAsset, audit: &NewAuditRecord) -> StoreResult<Asset> {
        AssetRepo::create(&self.pool, input, audit)
            .await
            .map_err(store_err)?
            .try_into()
    }

    async fn update_label(
        &self,
        asset_id: DbId,
        expected_version: i64,
        label: &str,
        audit: &NewAuditRecord,
    ) -> StoreResult<Asset> {
        let updated = AssetRepo::update_label(&self.pool, asset_id, expected_version, label, audit)
            .await
            .map_err(store_err)?;
        match updated {
            Some(row) => row.try_into(),
            None => {
                let exists = AssetRepo::find_by_id(&self.pool, asset_id)
                    .await
                    .map_err(store_err)?
                    .is_some();
                if exists {
                    Err(StoreError::Contention {
                        entity: "Asset",
                        id: asset_id,
                    })
                } else {
                    Err(StoreError::NotFound {
                        entity: "Asset",
                        key: asset_id.to_string(),
                    })
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Movements
// ---------------------------------------------------------------------------

#[async_trait]
impl MovementStore for PgStore {
    async fn insert_movement(
        &self,
        input: &NewMovement,
        notification: &NewNotification,
    ) -> StoreResult<Movement> {
        MovementRepo::create(&self.pool, input, notification)
            .await
            .map_err(store_err)?
            .try_into()
    }

    async fn get_movement(&self, id: DbId) -> StoreResult<Option<Movement>> {
        MovementRepo::find_by_id(&self.pool, id)
            .await
            .map_err(store_err)?
            .map(Movement::try_from)
            .transpose()
    }

    async fn list_movements(&self, filter: &MovementFilter) -> StoreResult<Vec<Movement>> {
        let rows = MovementRepo::list(&self.pool, filter)
            .await
            .map_err(store_err)?;
        convert_all(rows)
    }

    async fn apply_resolution(&self, resolution: &Resolution) -> StoreResult<Movement> {
        let outcome = MovementRepo::apply_resolution(&self.pool, resolution)
            .await
            .map_err(store_err)?;
        match outcome {
            ApplyOutcome::Applied(row) => row.try_into(),
            ApplyOutcome::Missing => Err(StoreError::NotFound {
                entity: "Movement",
                key: resolution.movement_id.to_string(),
            }),
            ApplyOutcome::NotPending => Err(StoreError::StaleStatus(resolution.movement_id)),
            ApplyOutcome::VersionMismatch(asset_id) => Err(StoreError::Contention {
                entity: "Asset",
                id: asset_id,
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Directory, notifications, audit
// ---------------------------------------------------------------------------

#[async_trait]
impl Directory for PgStore {
    async fn get_actor(&self, id: DbId) -> StoreResult<Option<Actor>> {
        DirectoryRepo::find_actor(&self.pool, id)
            .await
            .map_err(store_err)?
            .map(Actor::try_from)
            .transpose()
    }

    async fn get_collaborator(&self, id: DbId) -> StoreResult<Option<Collaborator>> {
        let row = DirectoryRepo::find_collaborator(&self.pool, id)
            .await
            .map_err(store_err)?;
        Ok(row.map(Collaborator::from))
    }

    async fn list_authorizer_candidates(&self) -> StoreResult<Vec<Actor>> {
        let rows = DirectoryRepo::list_authorizer_candidates(&self.pool)
            .await
            .map_err(store_err)?;
        convert_all(rows)
    }
}

#[async_trait]
impl NotificationStore for PgStore {
    async fn list_notifications(
        &self,
        recipient_id: DbId,
        unread_only: bool,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<Notification>> {
        let rows =
            NotificationRepo::list_for_recipient(&self.pool, recipient_id, unread_only, limit, offset)
                .await
                .map_err(store_err)?;
        convert_all(rows)
    }

    async fn mark_notification_read(
        &self,
        id: DbId,
        recipient_id: DbId,
        at: Timestamp,
    ) -> StoreResult<bool> {
        NotificationRepo::mark_read(&self.pool, id, recipient_id, at)
            .await
            .map_err(store_err)
    }

    async fn mark_all_notifications_read(
        &self,
        recipient_id: DbId,
        at: Timestamp,
    ) -> StoreResult<u64> {
        NotificationRepo::mark_all_read(&self.pool, recipient_id, at)
            .await
            .map_err(store_err)
    }

    async fn unread_notification_count(&self, recipient_id: DbId) -> StoreResult<i64> {
        NotificationRepo::unread_count(&self.pool, recipient_id)
            .await
            .map_err(store_err)
    }
}

#[async_trait]
impl AuditStore for PgStore {
    async fn list_audit_records(&self, asset_id: DbId) -> StoreResult<Vec<AuditRecord>> {
        let rows = AuditRepo::list_for_asset(&self.pool, asset_id)
            .await
            .map_err(store_err)?;
        Ok(rows.into_iter().map(AuditRecord::from).collect())
    }
}
