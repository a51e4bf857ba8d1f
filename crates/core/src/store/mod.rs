//! Persistence seams consumed by the domain core.
//!
//! Each trait covers one concern; [`InventoryStore`] bundles them so services
//! can hold a single `Arc<dyn InventoryStore>`. Operations that must be atomic
//! (guarded room insert, sequence increment, movement creation, resolution)
//! are single trait calls so an adapter can wrap each in one transaction.

pub mod memory;

use async_trait::async_trait;

use crate::assets::{Area, Asset, AssetType, Collaborator, LocatedAsset, NewAsset};
use crate::audit::{AuditRecord, NewAuditRecord};
use crate::location::{Block, Campus, NewBlock, NewRoom, Room, RoomInsert, Site, SiteCodeUpdate};
use crate::movement::{Movement, MovementFilter, NewMovement, Resolution};
use crate::notification::{NewNotification, Notification};
use crate::scope::Actor;
use crate::types::{DbId, Timestamp};

pub use memory::MemoryStore;

/// Failures reported by a store adapter.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{entity} '{key}' not found")]
    NotFound { entity: &'static str, key: String },

    /// A uniqueness constraint rejected the write.
    #[error("Unique constraint violated: {constraint}")]
    UniqueViolation { constraint: String },

    /// An optimistic version check failed; the row changed underneath us.
    #[error("Concurrent modification of {entity} {id}")]
    Contention { entity: &'static str, id: DbId },

    /// A movement was no longer pending when the resolution tried to commit.
    #[error("Movement {0} is no longer pending")]
    StaleStatus(DbId),

    #[error("Store backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

// ---------------------------------------------------------------------------
// Constraint names shared by the adapters
// ---------------------------------------------------------------------------

/// Unique constraint names. The PostgreSQL migrations use the same names so
/// callers can tell which uniqueness rule fired.
pub mod constraints {
    pub const BLOCK_SITE_LETTER: &str = "uq_blocks_site_letter";
    pub const SITE_OFFICIAL_CODE: &str = "uq_sites_official_code";
    pub const ROOM_CODE: &str = "uq_rooms_code";
    pub const ROOM_POSITION: &str = "uq_rooms_block_floor_number";
    pub const ASSET_INTERNAL_CODE: &str = "uq_assets_internal_code";
    pub const ASSET_SERIAL: &str = "uq_assets_serial_number";
    pub const ASSET_LABEL: &str = "uq_assets_label";
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

#[async_trait]
pub trait LocationStore: Send + Sync {
    async fn get_campus(&self, id: DbId) -> StoreResult<Option<Campus>>;
    async fn get_site(&self, id: DbId) -> StoreResult<Option<Site>>;
    async fn get_block(&self, id: DbId) -> StoreResult<Option<Block>>;
    async fn get_room(&self, id: DbId) -> StoreResult<Option<Room>>;
    async fn find_room_by_code(&self, code: &str) -> StoreResult<Option<Room>>;

    async fn list_sites(&self, campus_id: DbId) -> StoreResult<Vec<Site>>;
    async fn list_blocks(&self, site_id: DbId) -> StoreResult<Vec<Block>>;
    async fn list_rooms(&self, block_id: DbId) -> StoreResult<Vec<Room>>;

    /// Campus a room belongs to, walking block and site.
    async fn room_campus(&self, room_id: DbId) -> StoreResult<Option<DbId>>;

    /// Insert a block. `(site, letter)` collisions surface as
    /// [`StoreError::UniqueViolation`] on [`constraints::BLOCK_SITE_LETTER`].
    async fn insert_block(&self, input: &NewBlock) -> StoreResult<Block>;

    /// Insert a room guarded on its `(block, floor, number)` key.
    ///
    /// Returns the existing room when the key is taken, and the conflicting
    /// room when a different key already owns the code. Never overwrites.
    async fn insert_room_guarded(&self, input: &NewRoom) -> StoreResult<RoomInsert>;

    /// Change a site's official code only if it has no rooms yet.
    async fn update_site_code_if_no_rooms(
        &self,
        site_id: DbId,
        official_code: u32,
    ) -> StoreResult<SiteCodeUpdate>;
}

#[async_trait]
pub trait SequenceStore: Send + Sync {
    /// Atomically increment and return the counter for `(prefix, year)`.
    /// The first call for a key returns 1.
    async fn next_sequence(&self, prefix: &str, year: i32) -> StoreResult<u32>;
}

#[async_trait]
pub trait AssetStore: Send + Sync {
    async fn get_area(&self, id: DbId) -> StoreResult<Option<Area>>;
    async fn get_asset_type(&self, id: DbId) -> StoreResult<Option<AssetType>>;
    async fn list_asset_types(&self, area_id: DbId) -> StoreResult<Vec<AssetType>>;

    async fn locate_asset(&self, id: DbId) -> StoreResult<Option<LocatedAsset>>;
    async fn locate_asset_by_code(&self, internal_code: &str) -> StoreResult<Option<LocatedAsset>>;
    /// Located assets for the given ids; unknown ids are skipped.
    async fn locate_assets(&self, ids: &[DbId]) -> StoreResult<Vec<LocatedAsset>>;
    /// Located assets for the given internal codes; unknown codes are skipped.
    async fn locate_assets_by_codes(&self, codes: &[String]) -> StoreResult<Vec<LocatedAsset>>;
    async fn list_assets(&self, filter: &AssetFilter) -> StoreResult<Vec<LocatedAsset>>;

    async fn serial_exists(&self, serial_number: &str) -> StoreResult<bool>;
    /// Whether another asset already carries `label`.
    async fn label_exists(&self, label: &str, excluding: Option<DbId>) -> StoreResult<bool>;

    /// Insert an asset together with its creation audit record.
    async fn insert_asset(&self, input: &NewAsset, audit: &NewAuditRecord) -> StoreResult<Asset>;

    /// Replace the physical label if the asset is still at `expected_version`,
    /// appending `audit` in the same unit.
    async fn update_label(
        &self,
        asset_id: DbId,
        expected_version: i64,
        label: &str,
        audit: &NewAuditRecord,
    ) -> StoreResult<Asset>;
}

#[async_trait]
pub trait MovementStore: Send + Sync {
    /// Persist a pending movement and its creation notification atomically.
    /// The store fills in `notification.movement_id`.
    async fn insert_movement(
        &self,
        input: &NewMovement,
        notification: &NewNotification,
    ) -> StoreResult<Movement>;

    async fn get_movement(&self, id: DbId) -> StoreResult<Option<Movement>>;
    async fn list_movements(&self, filter: &MovementFilter) -> StoreResult<Vec<Movement>>;

    /// Apply a resolution atomically: status compare-and-set on pending,
    /// versioned asset updates, audit records, and the requester notification.
    ///
    /// Fails with [`StoreError::StaleStatus`] when the movement is no longer
    /// pending and [`StoreError::Contention`] when an asset version moved.
    async fn apply_resolution(&self, resolution: &Resolution) -> StoreResult<Movement>;
}

/// Actor and collaborator lookup.
#[async_trait]
pub trait Directory: Send + Sync {
    async fn get_actor(&self, id: DbId) -> StoreResult<Option<Actor>>;
    async fn get_collaborator(&self, id: DbId) -> StoreResult<Option<Collaborator>>;

    /// Actors with an active admin or supervisor profile, by display name.
    async fn list_authorizer_candidates(&self) -> StoreResult<Vec<Actor>>;
}

#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn list_notifications(
        &self,
        recipient_id: DbId,
        unread_only: bool,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<Notification>>;

    /// Returns `true` if an unread notification owned by `recipient_id` was updated.
    async fn mark_notification_read(
        &self,
        id: DbId,
        recipient_id: DbId,
        at: Timestamp,
    ) -> StoreResult<bool>;

    async fn mark_all_notifications_read(
        &self,
        recipient_id: DbId,
        at: Timestamp,
    ) -> StoreResult<u64>;

    async fn unread_notification_count(&self, recipient_id: DbId) -> StoreResult<i64>;
}

#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Audit records for an asset, newest first.
    async fn list_audit_records(&self, asset_id: DbId) -> StoreResult<Vec<AuditRecord>>;
}

/// Every store seam in one object-safe trait.
pub trait InventoryStore:
    LocationStore
    + SequenceStore
    + AssetStore
    + MovementStore
    + Directory
    + NotificationStore
    + AuditStore
{
}

impl<T> InventoryStore for T where
    T: LocationStore
        + SequenceStore
        + AssetStore
        + MovementStore
        + Directory
        + NotificationStore
        + AuditStore
{
}

/// Optional narrowing for asset listings. Scope filtering happens in the core.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct AssetFilter {
    pub area_id: Option<DbId>,
    pub room_id: Option<DbId>,
    pub custodian_id: Option<DbId>,
}
