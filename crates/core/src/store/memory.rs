//! In-process store used by tests and local development.
//!
//! All state sits behind one async mutex, so every trait call is atomic the
//! same way a single PostgreSQL transaction is.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{
    constraints, AssetFilter, AssetStore, AuditStore, Directory, LocationStore, MovementStore,
    NotificationStore, SequenceStore, StoreError, StoreResult,
};
use crate::assets::{codes, Area, Asset, AssetType, Collaborator, LocatedAsset, NewAsset};
use crate::audit::{AuditRecord, NewAuditRecord};
use crate::location::{
    self, Block, Campus, NewBlock, NewRoom, Room, RoomInsert, RoomKind, Site, SiteCodeUpdate,
};
use crate::movement::{Movement, MovementFilter, MovementStatus, NewMovement, Resolution};
use crate::notification::{NewNotification, Notification};
use crate::roles::Role;
use crate::scope::{Actor, ActorProfile};
use crate::types::{DbId, Timestamp};

#[derive(Default)]
struct Inner {
    next_id: DbId,
    campuses: BTreeMap<DbId, Campus>,
    sites: BTreeMap<DbId, Site>,
    blocks: BTreeMap<DbId, Block>,
    rooms: BTreeMap<DbId, Room>,
    areas: BTreeMap<DbId, Area>,
    asset_types: BTreeMap<DbId, AssetType>,
    collaborators: BTreeMap<DbId, Collaborator>,
    actors: BTreeMap<DbId, Actor>,
    assets: BTreeMap<DbId, Asset>,
    sequences: HashMap<(String, i32), u32>,
    movements: BTreeMap<DbId, Movement>,
    notifications: BTreeMap<DbId, Notification>,
    audit: BTreeMap<DbId, AuditRecord>,
    /// Asset id -> number of upcoming versioned writes that see a foreign
    /// write first.
    #[cfg(test)]
    interference: HashMap<DbId, u32>,
    /// Site id -> official code applied right after the next read of it.
    #[cfg(test)]
    site_renames: HashMap<DbId, u32>,
}

impl Inner {
    fn next_id(&mut self) -> DbId {
        self.next_id += 1;
        self.next_id
    }

    fn room_campus(&self, room_id: DbId) -> Option<DbId> {
        let room = self.rooms.get(&room_id)?;
        let block = self.blocks.get(&room.block_id)?;
        self.sites.get(&block.site_id).map(|s| s.campus_id)
    }

    fn locate(&self, asset: &Asset) -> LocatedAsset {
        LocatedAsset {
            asset: asset.clone(),
            campus_id: asset.room_id.and_then(|r| self.room_campus(r)),
            is_mobile: self
                .asset_types
                .get(&asset.asset_type_id)
                .is_some_and(|t| t.is_mobile),
        }
    }

    fn push_audit(&mut self, asset_id: DbId, record: &NewAuditRecord) {
        let id = self.next_id();
        self.audit.insert(
            id,
            AuditRecord {
                id,
                asset_id,
                movement_id: record.movement_id,
                action: record.action.clone(),
                actor_id: record.actor_id,
                changes: record.changes.clone(),
                recorded_at: record.recorded_at,
            },
        );
    }

    fn push_notification(&mut self, input: &NewNotification, movement_id: Option<DbId>) {
        let id = self.next_id();
        self.notifications.insert(
            id,
            Notification {
                id,
                recipient_id: input.recipient_id,
                kind: input.kind,
                title: input.title.clone(),
                message: input.message.clone(),
                movement_id: movement_id.or(input.movement_id),
                is_read: false,
                read_at: None,
                created_at: input.created_at,
            },
        );
    }

    #[cfg(test)]
    fn interfere(&mut self, asset_id: DbId) {
        if let Some(remaining) = self.interference.get_mut(&asset_id) {
            if *remaining > 0 {
                *remaining -= 1;
                if let Some(asset) = self.assets.get_mut(&asset_id) {
                    asset.version += 1;
                }
            }
        }
    }

    #[cfg(test)]
    fn rename_site_after_read(&mut self, site_id: DbId) {
        if let Some(code) = self.site_renames.remove(&site_id) {
            if let Some(site) = self.sites.get_mut(&site_id) {
                site.official_code = code;
            }
        }
    }

    fn label_taken(&self, label: &str, excluding: Option<DbId>) -> bool {
        label != codes::PENDING_LABEL
            && self
                .assets
                .values()
                .any(|a| a.label == label && Some(a.id) != excluding)
    }
}

fn unique(constraint: &str) -> StoreError {
    StoreError::UniqueViolation {
        constraint: constraint.to_string(),
    }
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------------
    // Seeding
    // -----------------------------------------------------------------------

    pub async fn add_campus(&self, code: &str, name: &str) -> Campus {
        let mut inner = self.inner.lock().await;
        let id = inner.next_id();
        let campus = Campus {
            id,
            code: code.to_string(),
            name: name.to_string(),
            is_active: true,
        };
        inner.campuses.insert(id, campus.clone());
        campus
    }

    pub async fn add_site(&self, campus_id: DbId, official_code: u32, name: &str) -> Site {
        let mut inner = self.inner.lock().await;
        let id = inner.next_id();
        let site = Site {
            id,
            campus_id,
            official_code,
            name: name.to_string(),
        };
        inner.sites.insert(id, site.clone());
        site
    }

    pub async fn add_area(&self, code: &str, name: &str) -> Area {
        let mut inner = self.inner.lock().await;
        let id = inner.next_id();
        let area = Area {
            id,
            code: code.to_string(),
            name: name.to_string(),
            is_active: true,
        };
        inner.areas.insert(id, area.clone());
        area
    }

    pub async fn add_asset_type(&self, area_id: DbId, name: &str, is_mobile: bool) -> AssetType {
        let mut inner = self.inner.lock().await;
        let id = inner.next_id();
        let asset_type = AssetType {
            id,
            area_id,
            name: name.to_string(),
            is_mobile,
        };
        inner.asset_types.insert(id, asset_type.clone());
        asset_type
    }

    pub async fn add_collaborator(&self, full_name: &str, is_active: bool) -> Collaborator {
        let mut inner = self.inner.lock().await;
        let id = inner.next_id();
        let collaborator = Collaborator {
            id,
            full_name: full_name.to_string(),
            unit: "General".to_string(),
            email: None,
            phone: None,
            is_active,
        };
        inner.collaborators.insert(id, collaborator.clone());
        collaborator
    }

    pub async fn add_actor(&self, display_name: &str, profile: Option<ActorProfile>) -> Actor {
        let mut inner = self.inner.lock().await;
        let id = inner.next_id();
        let actor = Actor {
            id,
            display_name: display_name.to_string(),
            profile,
        };
        inner.actors.insert(id, actor.clone());
        actor
    }

    /// Insert a room without the position or code guards, to set up
    /// collisions.
    pub async fn force_room(&self, block_id: DbId, floor: i32, number: i32, code: &str) -> Room {
        let mut inner = self.inner.lock().await;
        let id = inner.next_id();
        let room = Room {
            id,
            block_id,
            floor,
            number,
            code: code.to_string(),
            capacity: None,
            kind: RoomKind::Office,
            name: format!("Room {code}"),
        };
        inner.rooms.insert(id, room.clone());
        room
    }

    /// Make the next `times` versioned writes touching `asset_id` find its
    /// version already moved, as if another writer committed first.
    #[cfg(test)]
    pub async fn bump_version_on_next_writes(&self, asset_id: DbId, times: u32) {
        self.inner.lock().await.interference.insert(asset_id, times);
    }

    /// Change the site's official code right after the next `get_site`
    /// hands out the old one.
    #[cfg(test)]
    pub async fn rename_site_after_next_read(&self, site_id: DbId, official_code: u32) {
        self.inner
            .lock()
            .await
            .site_renames
            .insert(site_id, official_code);
    }
}

// ---------------------------------------------------------------------------
// Locations
// ---------------------------------------------------------------------------

#[async_trait]
impl LocationStore for MemoryStore {
    async fn get_campus(&self, id: DbId) -> StoreResult<Option<Campus>> {
        Ok(self.inner.lock().await.campuses.get(&id).cloned())
    }

    async fn get_site(&self, id: DbId) -> StoreResult<Option<Site>> {
        let site = self.inner.lock().await.sites.get(&id).cloned();
        #[cfg(test)]
        self.inner.lock().await.rename_site_after_read(id);
        Ok(site)
    }

    async fn get_block(&self, id: DbId) -> StoreResult<Option<Block>> {
        Ok(self.inner.lock().await.blocks.get(&id).cloned())
    }

    async fn get_room(&self, id: DbId) -> StoreResult<Option<Room>> {
        Ok(self.inner.lock().await.rooms.get(&id).cloned())
    }

    async fn find_room_by_code(&self, code: &str) -> StoreResult<Option<Room>> {
        let inner = self.inner.lock().await;
        Ok(inner.rooms.values().find(|r| r.code == code).cloned())
    }

    async fn list_sites(&self, campus_id: DbId) -> StoreResult<Vec<Site>> {
        let inner = self.inner.lock().await;
        let mut sites: Vec<Site> = inner
            .sites
            .values()
            .filter(|s| s.campus_id == campus_id)
            .cloned()
            .collect();
        sites.sort_by_key(|s| s.official_code);
        Ok(sites)
    }

    async fn list_blocks(&self, site_id: DbId) -> StoreResult<Vec<Block>> {
        let inner = self.inner.lock().await;
        let mut blocks: Vec<Block> = inner
            .blocks
            .values()
            .filter(|b| b.site_id == site_id)
            .cloned()
            .collect();
        blocks.sort_by_key(|b| b.letter);
        Ok(blocks)
    }

    async fn list_rooms(&self, block_id: DbId) -> StoreResult<Vec<Room>> {
        let inner = self.inner.lock().await;
        let mut rooms: Vec<Room> = inner
            .rooms
            .values()
            .filter(|r| r.block_id == block_id)
            .cloned()
            .collect();
        rooms.sort_by_key(|r| (r.floor, r.number));
        Ok(rooms)
    }

    async fn room_campus(&self, room_id: DbId) -> StoreResult<Option<DbId>> {
        Ok(self.inner.lock().await.room_campus(room_id))
    }

    async fn insert_block(&self, input: &NewBlock) -> StoreResult<Block> {
        let mut inner = self.inner.lock().await;
        if inner
            .blocks
            .values()
            .any(|b| b.site_id == input.site_id && b.letter == input.letter)
        {
            return Err(unique(constraints::BLOCK_SITE_LETTER));
        }
        let id = inner.next_id();
        let block = Block {
            id,
            site_id: input.site_id,
            letter: input.letter,
            floors: input.floors,
            basements: input.basements,
            name: input.name.clone(),
        };
        inner.blocks.insert(id, block.clone());
        Ok(block)
    }

    async fn insert_room_guarded(&self, input: &NewRoom) -> StoreResult<RoomInsert> {
        let mut inner = self.inner.lock().await;
        let block = inner
            .blocks
            .get(&input.block_id)
            .ok_or_else(|| StoreError::NotFound {
                entity: "Block",
                key: input.block_id.to_string(),
            })?;
        let site = inner
            .sites
            .get(&block.site_id)
            .ok_or_else(|| StoreError::NotFound {
                entity: "Site",
                key: block.site_id.to_string(),
            })?;
        let code = location::room_code(site.official_code, block.letter, input.floor, input.number)
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        if let Some(existing) = inner.rooms.values().find(|r| {
            r.block_id == input.block_id && r.floor == input.floor && r.number == input.number
        }) {
            return Ok(RoomInsert::Existing(existing.clone()));
        }
        if let Some(owner) = inner.rooms.values().find(|r| r.code == code) {
            return Ok(RoomInsert::CodeTaken(owner.clone()));
        }
        let id = inner.next_id();
        let room = Room {
            id,
            block_id: input.block_id,
            floor: input.floor,
            number: input.number,
            code,
            capacity: input.capacity,
            kind: input.kind,
            name: input.name.clone(),
        };
        inner.rooms.insert(id, room.clone());
        Ok(RoomInsert::Created(room))
    }

    async fn update_site_code_if_no_rooms(
        &self,
        site_id: DbId,
        official_code: u32,
    ) -> StoreResult<SiteCodeUpdate> {
        let mut inner = self.inner.lock().await;
        let has_rooms = inner.rooms.values().any(|r| {
            inner
                .blocks
                .get(&r.block_id)
                .is_some_and(|b| b.site_id == site_id)
        });
        if has_rooms {
            return Ok(SiteCodeUpdate::HasRooms);
        }
        if inner
            .sites
            .values()
            .any(|s| s.id != site_id && s.official_code == official_code)
        {
            return Err(unique(constraints::SITE_OFFICIAL_CODE));
        }
        let site = inner
            .sites
            .get_mut(&site_id)
            .ok_or_else(|| StoreError::NotFound {
                entity: "Site",
                key: site_id.to_string(),
            })?;
        site.official_code = official_code;
        Ok(SiteCodeUpdate::Updated(site.clone()))
    }
}

#[async_trait]
impl SequenceStore for MemoryStore {
    async fn next_sequence(&self, prefix: &str, year: i32) -> StoreResult<u32> {
        let mut inner = self.inner.lock().await;
        let counter = inner
            .sequences
            .entry((prefix.to_string(), year))
            .or_insert(0);
        *counter += 1;
        Ok(*counter)
    }
}

// ---------------------------------------------------------------------------
// Assets
// ---------------------------------------------------------------------------

#[async_trait]
impl AssetStore for MemoryStore {
    async fn get_area(&self, id: DbId) -> StoreResult<Option<Area>> {
        Ok(self.inner.lock().await.areas.get(&id).cloned())
    }

    async fn get_asset_type(&self, id: DbId) -> StoreResult<Option<AssetType>> {
        Ok(self.inner.lock().await.asset_types.get(&id).cloned())
    }

    async fn list_asset_types(&self, area_id: DbId) -> StoreResult<Vec<AssetType>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .asset_types
            .values()
            .filter(|t| t.area_id == area_id)
            .cloned()
            .collect())
    }

    async fn locate_asset(&self, id: DbId) -> StoreResult<Option<LocatedAsset>> {
        let inner = self.inner.lock().await;
        Ok(inner.assets.get(&id).map(|a| inner.locate(a)))
    }

    async fn locate_asset_by_code(&self, internal_code: &str) -> StoreResult<Option<LocatedAsset>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .assets
            .values()
            .find(|a| a.internal_code == internal_code)
            .map(|a| inner.locate(a)))
    }

    async fn locate_assets(&self, ids: &[DbId]) -> StoreResult<Vec<LocatedAsset>> {
        let inner = self.inner.lock().await;
        Ok(ids
            .iter()
            .filter_map(|id| inner.assets.get(id))
            .map(|a| inner.locate(a))
            .collect())
    }

    async fn locate_assets_by_codes(&self, codes: &[String]) -> StoreResult<Vec<LocatedAsset>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .assets
            .values()
            .filter(|a| codes.contains(&a.internal_code))
            .map(|a| inner.locate(a))
            .collect())
    }

    async fn list_assets(&self, filter: &AssetFilter) -> StoreResult<Vec<LocatedAsset>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .assets
            .values()
            .filter(|a| filter.area_id.map_or(true, |id| a.area_id == id))
            .filter(|a| filter.room_id.map_or(true, |id| a.room_id == Some(id)))
            .filter(|a| filter.custodian_id.map_or(true, |id| a.custodian_id == Some(id)))
            .map(|a| inner.locate(a))
            .collect())
    }

    async fn serial_exists(&self, serial_number: &str) -> StoreResult<bool> {
        let inner = self.inner.lock().await;
        Ok(inner
            .assets
            .values()
            .any(|a| a.serial_number.as_deref() == Some(serial_number)))
    }

    async fn label_exists(&self, label: &str, excluding: Option<DbId>) -> StoreResult<bool> {
        Ok(self.inner.lock().await.label_taken(label, excluding))
    }

    async fn insert_asset(&self, input: &NewAsset, audit: &NewAuditRecord) -> StoreResult<Asset> {
        let mut inner = self.inner.lock().await;
        if inner
            .assets
            .values()
            .any(|a| a.internal_code == input.internal_code)
        {
            return Err(unique(constraints::ASSET_INTERNAL_CODE));
        }
        if let Some(serial) = input.serial_number.as_deref() {
            if inner
                .assets
                .values()
                .any(|a| a.serial_number.as_deref() == Some(serial))
            {
                return Err(unique(constraints::ASSET_SERIAL));
            }
        }
        if inner.label_taken(&input.label, None) {
            return Err(unique(constraints::ASSET_LABEL));
        }

        let id = inner.next_id();
        let asset = Asset {
            id,
            internal_code: input.internal_code.clone(),
            label: input.label.clone(),
            serial_number: input.serial_number.clone(),
            name: input.name.clone(),
            area_id: input.area_id,
            asset_type_id: input.asset_type_id,
            room_id: input.room_id,
            condition: input.condition,
            custodian_id: input.custodian_id,
            warranty_until: input.warranty_until,
            is_leasing: input.is_leasing,
            leasing_company: input.leasing_company.clone(),
            leasing_end: input.leasing_end,
            created_at: input.created_at,
            created_by: input.created_by,
            version: 1,
        };
        inner.assets.insert(id, asset.clone());
        inner.push_audit(id, audit);
        Ok(asset)
    }

    async fn update_label(
        &self,
        asset_id: DbId,
        expected_version: i64,
        label: &str,
        audit: &NewAuditRecord,
    ) -> StoreResult<Asset> {
        let mut inner = self.inner.lock().await;
        #[cfg(test)]
        inner.interfere(asset_id);
        if inner.label_taken(label, Some(asset_id)) {
            return Err(unique(constraints::ASSET_LABEL));
        }
        let asset = inner
            .assets
            .get_mut(&asset_id)
            .ok_or_else(|| StoreError::NotFound {
                entity: "Asset",
                key: asset_id.to_string(),
            })?;
        if asset.version != expected_version {
            return Err(StoreError::Contention {
                entity: "Asset",
                id: asset_id,
            });
        }
        asset.label = label.to_string();
        asset.version += 1;
        let updated = asset.clone();
        inner.push_audit(asset_id, audit);
        Ok(updated)
    }
}

// ---------------------------------------------------------------------------
// Movements
// ---------------------------------------------------------------------------

#[async_trait]
impl MovementStore for MemoryStore {
    async fn insert_movement(
        &self,
        input: &NewMovement,
        notification: &NewNotification,
    ) -> StoreResult<Movement> {
        let mut inner = self.inner.lock().await;
        let id = inner.next_id();
        let movement = Movement {
            id,
            movement_type: input.movement_type,
            asset_ids: input.asset_ids.clone(),
            origin_room_id: input.origin_room_id,
            destination_room_id: input.destination_room_id,
            destination_custodian_id: input.destination_custodian_id,
            new_condition: input.new_condition,
            replacement_asset_id: input.replacement_asset_id,
            expected_return: input.expected_return,
            requester_id: input.requester_id,
            authorizer_id: input.authorizer_id,
            resolver_id: None,
            status: MovementStatus::Pending,
            reason: input.reason.clone(),
            rejection_reason: None,
            evidence_note: input.evidence_note.clone(),
            evidence_photo: input.evidence_photo.clone(),
            created_at: input.created_at,
            resolved_at: None,
        };
        inner.movements.insert(id, movement.clone());
        inner.push_notification(notification, Some(id));
        Ok(movement)
    }

    async fn get_movement(&self, id: DbId) -> StoreResult<Option<Movement>> {
        Ok(self.inner.lock().await.movements.get(&id).cloned())
    }

    async fn list_movements(&self, filter: &MovementFilter) -> StoreResult<Vec<Movement>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .movements
            .values()
            .rev()
            .filter(|m| filter.status.map_or(true, |s| m.status == s))
            .filter(|m| filter.requester_id.map_or(true, |id| m.requester_id == id))
            .filter(|m| filter.authorizer_id.map_or(true, |id| m.authorizer_id == id))
            .cloned()
            .collect())
    }

    async fn apply_resolution(&self, resolution: &Resolution) -> StoreResult<Movement> {
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;
        let movement_id = resolution.movement_id;
        let status = inner
            .movements
            .get(&movement_id)
            .map(|m| m.status)
            .ok_or_else(|| StoreError::NotFound {
                entity: "Movement",
                key: movement_id.to_string(),
            })?;
        if status != MovementStatus::Pending {
            return Err(StoreError::StaleStatus(movement_id));
        }

        #[cfg(test)]
        for change in &resolution.changes {
            inner.interfere(change.asset_id);
        }

        // Check every version before touching anything.
        for change in &resolution.changes {
            let current = inner.assets.get(&change.asset_id).map(|a| a.version);
            if current != Some(change.expected_version) {
                return Err(StoreError::Contention {
                    entity: "Asset",
                    id: change.asset_id,
                });
            }
        }

        for change in &resolution.changes {
            if let Some(asset) = inner.assets.get_mut(&change.asset_id) {
                asset.room_id = change.after.room_id;
                asset.custodian_id = change.after.custodian_id;
                asset.condition = change.after.condition;
                asset.version += 1;
            }
            inner.push_audit(change.asset_id, &change.audit);
        }
        inner.push_notification(&resolution.notification, Some(movement_id));

        let movement = inner
            .movements
            .get_mut(&movement_id)
            .ok_or_else(|| StoreError::NotFound {
                entity: "Movement",
                key: movement_id.to_string(),
            })?;
        movement.status = resolution.status;
        movement.resolver_id = Some(resolution.resolver_id);
        movement.resolved_at = Some(resolution.resolved_at);
        movement.rejection_reason = resolution.rejection_reason.clone();
        Ok(movement.clone())
    }
}

// ---------------------------------------------------------------------------
// Directory, notifications, audit
// ---------------------------------------------------------------------------

#[async_trait]
impl Directory for MemoryStore {
    async fn get_actor(&self, id: DbId) -> StoreResult<Option<Actor>> {
        Ok(self.inner.lock().await.actors.get(&id).cloned())
    }

    async fn get_collaborator(&self, id: DbId) -> StoreResult<Option<Collaborator>> {
        Ok(self.inner.lock().await.collaborators.get(&id).cloned())
    }

    async fn list_authorizer_candidates(&self) -> StoreResult<Vec<Actor>> {
        let inner = self.inner.lock().await;
        let mut actors: Vec<Actor> = inner
            .actors
            .values()
            .filter(|a| matches!(a.role(), Some(Role::Admin | Role::Supervisor)))
            .cloned()
            .collect();
        actors.sort_by(|a, b| a.display_name.cmp(&b.display_name));
        Ok(actors)
    }
}

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn list_notifications(
        &self,
        recipient_id: DbId,
        unread_only: bool,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<Notification>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .notifications
            .values()
            .rev()
            .filter(|n| n.recipient_id == recipient_id && (!unread_only || !n.is_read))
            .skip(usize::try_from(offset).unwrap_or(0))
            .take(usize::try_from(limit).unwrap_or(0))
            .cloned()
            .collect())
    }

    async fn mark_notification_read(
        &self,
        id: DbId,
        recipient_id: DbId,
        at: Timestamp,
    ) -> StoreResult<bool> {
        let mut inner = self.inner.lock().await;
        match inner.notifications.get_mut(&id) {
            Some(n) if n.recipient_id == recipient_id && !n.is_read => {
                n.is_read = true;
                n.read_at = Some(at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_all_notifications_read(
        &self,
        recipient_id: DbId,
        at: Timestamp,
    ) -> StoreResult<u64> {
        let mut inner = self.inner.lock().await;
        let mut updated = 0;
        for n in inner
            .notifications
            .values_mut()
            .filter(|n| n.recipient_id == recipient_id && !n.is_read)
        {
            n.is_read = true;
            n.read_at = Some(at);
            updated += 1;
        }
        Ok(updated)
    }

    async fn unread_notification_count(&self, recipient_id: DbId) -> StoreResult<i64> {
        let inner = self.inner.lock().await;
        let count = inner
            .notifications
            .values()
            .filter(|n| n.recipient_id == recipient_id && !n.is_read)
            .count();
        Ok(i64::try_from(count).unwrap_or(i64::MAX))
    }
}

#[async_trait]
impl AuditStore for MemoryStore {
    async fn list_audit_records(&self, asset_id: DbId) -> StoreResult<Vec<AuditRecord>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .audit
            .values()
            .rev()
            .filter(|r| r.asset_id == asset_id)
            .cloned()
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Shared test world
// ---------------------------------------------------------------------------

#[cfg(test)]
pub mod fixtures {
    use std::collections::BTreeSet;

    use super::*;
    use crate::assets::AssetCondition;
    use crate::audit::actions;
    use crate::context::RequestContext;

    /// Two campuses, two areas, one room per campus, and one actor per role.
    pub struct World {
        pub campus_x: Campus,
        pub campus_y: Campus,
        pub room_x: Room,
        pub room_y: Room,
        pub sistemas: Area,
        pub laboratorio: Area,
        pub laptop: AssetType,
        pub phone: AssetType,
        pub microscope: AssetType,
        pub custodian: Collaborator,
        pub retired: Collaborator,
        pub admin: Actor,
        pub sis_supervisor: Actor,
        pub lab_supervisor: Actor,
        pub aux_x: Actor,
        pub external: Actor,
    }

    fn profile(role: Role, areas: &[DbId], campuses: &[DbId]) -> Option<ActorProfile> {
        Some(ActorProfile {
            role,
            area_ids: areas.iter().copied().collect::<BTreeSet<_>>(),
            campus_ids: campuses.iter().copied().collect::<BTreeSet<_>>(),
            collaborator_id: None,
            is_active: true,
        })
    }

    async fn room(store: &MemoryStore, campus: &Campus, site_code: u32) -> Room {
        let site = store.add_site(campus.id, site_code, &campus.name).await;
        let block = store
            .insert_block(&NewBlock {
                site_id: site.id,
                letter: 'A',
                floors: 3,
                basements: 1,
                name: None,
            })
            .await
            .unwrap();
        store
            .force_room(block.id, 1, 1, &format!("{site_code}A101"))
            .await
    }

    pub async fn world(store: &MemoryStore) -> World {
        let campus_x = store.add_campus("LIM", "Lima").await;
        let campus_y = store.add_campus("ARE", "Arequipa").await;
        let room_x = room(store, &campus_x, 77).await;
        let room_y = room(store, &campus_y, 12).await;

        let sistemas = store.add_area("sistemas", "Sistemas").await;
        let laboratorio = store.add_area("laboratorio", "Laboratorio").await;
        let laptop = store.add_asset_type(sistemas.id, "Laptop", false).await;
        let phone = store.add_asset_type(sistemas.id, "Celular", true).await;
        let microscope = store.add_asset_type(laboratorio.id, "Microscopio", false).await;

        let custodian = store.add_collaborator("Rosa Quispe", true).await;
        let retired = store.add_collaborator("Luis Vega", false).await;

        let admin = store.add_actor("Admin", profile(Role::Admin, &[], &[])).await;
        let sis_supervisor = store
            .add_actor("Sis Supervisor", profile(Role::Supervisor, &[sistemas.id], &[]))
            .await;
        let lab_supervisor = store
            .add_actor("Lab Supervisor", profile(Role::Supervisor, &[laboratorio.id], &[]))
            .await;
        let aux_x = store
            .add_actor("Aux Lima", profile(Role::Auxiliary, &[], &[campus_x.id]))
            .await;
        let mut external_profile = profile(Role::External, &[], &[]);
        if let Some(p) = external_profile.as_mut() {
            p.collaborator_id = Some(custodian.id);
        }
        let external = store.add_actor("Rosa", external_profile).await;

        World {
            campus_x,
            campus_y,
            room_x,
            room_y,
            sistemas,
            laboratorio,
            laptop,
            phone,
            microscope,
            custodian,
            retired,
            admin,
            sis_supervisor,
            lab_supervisor,
            aux_x,
            external,
        }
    }

    impl World {
        pub fn ctx(&self, actor: &Actor) -> RequestContext {
            RequestContext::now(actor.clone())
        }

        async fn asset_at(
            &self,
            store: &MemoryStore,
            asset_type: &AssetType,
            room_id: Option<DbId>,
            custodian_id: Option<DbId>,
            condition: AssetCondition,
        ) -> Asset {
            let now = chrono::Utc::now();
            let prefix = if asset_type.area_id == self.sistemas.id {
                "SIS"
            } else {
                "LAB"
            };
            let sequence = store.next_sequence(prefix, 2026).await.unwrap();
            let input = NewAsset {
                internal_code: codes::format_internal_code(prefix, 2026, sequence),
                label: codes::PENDING_LABEL.to_string(),
                serial_number: None,
                name: asset_type.name.clone(),
                area_id: asset_type.area_id,
                asset_type_id: asset_type.id,
                room_id,
                condition,
                custodian_id,
                warranty_until: None,
                is_leasing: false,
                leasing_company: None,
                leasing_end: None,
                created_at: now,
                created_by: self.admin.id,
            };
            let audit = NewAuditRecord {
                movement_id: None,
                action: actions::ASSET_CREATED.to_string(),
                actor_id: self.admin.id,
                changes: Vec::new(),
                recorded_at: now,
            };
            store.insert_asset(&input, &audit).await.unwrap()
        }

        /// Active sistemas laptop in campus X, held by the custodian.
        pub async fn asset_in_x(&self, store: &MemoryStore) -> Asset {
            self.asset_at(
                store,
                &self.laptop,
                Some(self.room_x.id),
                Some(self.custodian.id),
                AssetCondition::Active,
            )
            .await
        }

        /// Active sistemas laptop in campus Y.
        pub async fn asset_in_y(&self, store: &MemoryStore) -> Asset {
            self.asset_at(store, &self.laptop, Some(self.room_y.id), None, AssetCondition::Active)
                .await
        }

        /// Unlocated sistemas laptop in storage.
        pub async fn asset_in_storage(&self, store: &MemoryStore) -> Asset {
            self.asset_at(store, &self.laptop, None, None, AssetCondition::InStorage)
                .await
        }

        /// Decommissioned sistemas laptop left in campus X.
        pub async fn decommissioned_in_x(&self, store: &MemoryStore) -> Asset {
            self.asset_at(
                store,
                &self.laptop,
                Some(self.room_x.id),
                None,
                AssetCondition::Decommissioned,
            )
            .await
        }

        /// Laboratorio microscope in storage.
        pub async fn microscope_in_storage(&self, store: &MemoryStore) -> Asset {
            self.asset_at(store, &self.microscope, None, None, AssetCondition::InStorage)
                .await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::AssetCondition;

    #[tokio::test]
    async fn guarded_room_insert_never_overwrites() {
        let store = MemoryStore::new();
        let campus = store.add_campus("LIM", "Lima").await;
        let site = store.add_site(campus.id, 77, "Central").await;
        let block = store
            .insert_block(&NewBlock {
                site_id: site.id,
                letter: 'A',
                floors: 3,
                basements: 0,
                name: None,
            })
            .await
            .unwrap();
        let taken = store.force_room(block.id, 2, 5, "77A101").await;
        let input = NewRoom {
            block_id: block.id,
            floor: 1,
            number: 1,
            capacity: None,
            kind: RoomKind::Lecture,
            name: "Aula".into(),
        };

        match store.insert_room_guarded(&input).await.unwrap() {
            RoomInsert::CodeTaken(owner) => assert_eq!(owner.id, taken.id),
            other => panic!("expected CodeTaken, got {other:?}"),
        }
        assert_eq!(store.list_rooms(block.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn guarded_room_insert_derives_code_from_current_site() {
        let store = MemoryStore::new();
        let campus = store.add_campus("LIM", "Lima").await;
        let site = store.add_site(campus.id, 77, "Central").await;
        let block = store
            .insert_block(&NewBlock {
                site_id: site.id,
                letter: 'B',
                floors: 3,
                basements: 1,
                name: None,
            })
            .await
            .unwrap();
        store.update_site_code_if_no_rooms(site.id, 78).await.unwrap();

        let input = NewRoom {
            block_id: block.id,
            floor: -1,
            number: 4,
            capacity: None,
            kind: RoomKind::Office,
            name: "Archivo".into(),
        };
        match store.insert_room_guarded(&input).await.unwrap() {
            RoomInsert::Created(room) => assert_eq!(room.code, "78BS104"),
            other => panic!("expected Created, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn resolution_is_all_or_nothing() {
        let store = MemoryStore::new();
        let fx = fixtures::world(&store).await;
        let a = fx.asset_in_x(&store).await;
        let b = fx.asset_in_x(&store).await;
        store.bump_version_on_next_writes(b.id, 1).await;

        let movement = store
            .insert_movement(
                &NewMovement {
                    movement_type: crate::movement::MovementType::Transfer,
                    asset_ids: vec![a.id, b.id],
                    origin_room_id: Some(fx.room_x.id),
                    destination_room_id: Some(fx.room_y.id),
                    destination_custodian_id: None,
                    new_condition: None,
                    replacement_asset_id: None,
                    expected_return: None,
                    requester_id: fx.sis_supervisor.id,
                    authorizer_id: fx.admin.id,
                    reason: String::new(),
                    evidence_note: None,
                    evidence_photo: None,
                    created_at: chrono::Utc::now(),
                },
                &crate::notification::movement_created(fx.admin.id, "x", "transfer", 2, chrono::Utc::now()),
            )
            .await
            .unwrap();

        let targets = store.locate_assets(&[a.id, b.id]).await.unwrap();
        let changes = crate::movement::effects::plan_approval(
            &movement,
            &targets,
            None,
            fx.admin.id,
            chrono::Utc::now(),
        )
        .unwrap();
        let resolution = Resolution {
            movement_id: movement.id,
            status: MovementStatus::Approved,
            resolver_id: fx.admin.id,
            resolved_at: chrono::Utc::now(),
            rejection_reason: None,
            changes,
            notification: crate::notification::movement_approved(&movement, "Admin", chrono::Utc::now()),
        };

        let result = store.apply_resolution(&resolution).await;
        assert!(matches!(result, Err(StoreError::Contention { id, .. }) if id == b.id));

        let a_now = store.locate_asset(a.id).await.unwrap().unwrap().asset;
        assert_eq!(a_now.room_id, Some(fx.room_x.id));
        assert_eq!(a_now.condition, AssetCondition::Active);
        assert_eq!(
            store.get_movement(movement.id).await.unwrap().unwrap().status,
            MovementStatus::Pending
        );
        assert_eq!(store.unread_notification_count(fx.sis_supervisor.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn notifications_page_newest_first() {
        let store = MemoryStore::new();
        let now = chrono::Utc::now();
        for n in 0..3 {
            let note = crate::notification::movement_created(7, "Ana", "transfer", n, now);
            store.inner.lock().await.push_notification(&note, None);
        }

        let page = store.list_notifications(7, false, 2, 0).await.unwrap();
        assert_eq!(page.len(), 2);
        assert!(page[0].message.contains("2 asset"));

        assert!(store.mark_notification_read(page[0].id, 7, now).await.unwrap());
        assert!(!store.mark_notification_read(page[0].id, 7, now).await.unwrap());
        assert!(!store.mark_notification_read(page[1].id, 8, now).await.unwrap());
        assert_eq!(store.mark_all_notifications_read(7, now).await.unwrap(), 2);
        assert_eq!(store.unread_notification_count(7).await.unwrap(), 0);
    }
}
