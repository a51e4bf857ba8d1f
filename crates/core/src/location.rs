//! Location hierarchy (campus, site, block, room) and room code allocation.
//!
//! A room code is a pure function of its position:
//! `site.official_code ++ block.letter ++ floor_token ++ zero_pad2(number)`,
//! where basement floors render as `S<n>`. Allocation is idempotent on the
//! `(block, floor, number)` key and never overwrites another room's code.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, ErrorKind};
use crate::store::{constraints, LocationStore, StoreError};
use crate::types::DbId;

/// Highest room number on a floor.
pub const MAX_ROOM_NUMBER: i32 = 99;

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Campus {
    pub id: DbId,
    pub code: String,
    pub name: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    pub id: DbId,
    pub campus_id: DbId,
    pub official_code: u32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub id: DbId,
    pub site_id: DbId,
    /// Always an uppercase ASCII letter.
    pub letter: char,
    pub floors: i32,
    pub basements: i32,
    pub name: Option<String>,
}

impl Block {
    /// Lowest and highest valid floor numbers (floor 0 is never valid).
    pub fn floor_range(&self) -> (i32, i32) {
        (-self.basements, self.floors)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomKind {
    Lecture,
    ComputerLab,
    SpecializedLab,
    Office,
}

impl RoomKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RoomKind::Lecture => "lecture",
            RoomKind::ComputerLab => "computer_lab",
            RoomKind::SpecializedLab => "specialized_lab",
            RoomKind::Office => "office",
        }
    }
}

impl fmt::Display for RoomKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoomKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lecture" => Ok(RoomKind::Lecture),
            "computer_lab" => Ok(RoomKind::ComputerLab),
            "specialized_lab" => Ok(RoomKind::SpecializedLab),
            "office" => Ok(RoomKind::Office),
            other => Err(format!("Unknown room kind '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: DbId,
    pub block_id: DbId,
    pub floor: i32,
    pub number: i32,
    pub code: String,
    pub capacity: Option<i32>,
    pub kind: RoomKind,
    pub name: String,
}

// ---------------------------------------------------------------------------
// Inputs and store outcomes
// ---------------------------------------------------------------------------

/// Validated block insert.
#[derive(Debug, Clone)]
pub struct NewBlock {
    pub site_id: DbId,
    pub letter: char,
    pub floors: i32,
    pub basements: i32,
    pub name: Option<String>,
}

/// Caller input for creating a block; the letter is normalized before insert.
#[derive(Debug, Clone, Deserialize)]
pub struct BlockRequest {
    pub site_id: DbId,
    pub letter: String,
    pub floors: i32,
    #[serde(default)]
    pub basements: i32,
    pub name: Option<String>,
}

/// Caller input for allocating a room.
#[derive(Debug, Clone, Deserialize)]
pub struct RoomRequest {
    pub block_id: DbId,
    pub floor: i32,
    pub number: i32,
    pub capacity: Option<i32>,
    pub kind: RoomKind,
    pub name: String,
}

/// Validated room insert. The store derives the code from the site and
/// block rows it holds while inserting, so a concurrent site code change
/// cannot leave a room with a stale code.
#[derive(Debug, Clone)]
pub struct NewRoom {
    pub block_id: DbId,
    pub floor: i32,
    pub number: i32,
    pub capacity: Option<i32>,
    pub kind: RoomKind,
    pub name: String,
}

/// Outcome of a guarded room insert.
#[derive(Debug, Clone)]
pub enum RoomInsert {
    Created(Room),
    /// The `(block, floor, number)` key already exists.
    Existing(Room),
    /// A room at a different key already owns the code.
    CodeTaken(Room),
}

/// Outcome of a guarded site code update.
#[derive(Debug, Clone)]
pub enum SiteCodeUpdate {
    Updated(Site),
    HasRooms,
}

/// Result of [`allocate_room`].
#[derive(Debug, Clone, Serialize)]
pub struct RoomAllocation {
    pub room: Room,
    /// `false` when the key already existed and the stored room was returned.
    pub created: bool,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum LocationError {
    #[error("Invalid block letter '{0}': expected a single letter A-Z")]
    InvalidBlockLetter(String),

    #[error("Floor 0 does not exist")]
    InvalidFloor,

    #[error("Floor {floor} is outside the block range {min}..={max}")]
    FloorOutOfRange { floor: i32, min: i32, max: i32 },

    #[error("Room number {0} must be between 1 and 99")]
    InvalidRoomNumber(i32),

    #[error("Invalid block dimensions: {0}")]
    InvalidBlockShape(String),

    #[error("Room capacity {0} cannot be negative")]
    InvalidCapacity(i32),

    #[error("Site official code must be positive")]
    InvalidSiteCode,

    #[error("Block {letter} already exists in site {site_id}")]
    DuplicateBlock { site_id: DbId, letter: char },

    #[error("Official code {0} is already used by another site")]
    DuplicateSiteCode(u32),

    #[error("Room code {code} is already assigned to room {existing_room_id}")]
    CodeCollision { code: String, existing_room_id: DbId },

    #[error("Site {0} already has rooms; its official code can no longer change")]
    ImmutableOnceAssigned(DbId),

    #[error("{entity} '{key}' not found")]
    NotFound { entity: &'static str, key: String },

    #[error(transparent)]
    Store(StoreError),
}

impl LocationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LocationError::InvalidBlockLetter(_)
            | LocationError::InvalidFloor
            | LocationError::FloorOutOfRange { .. }
            | LocationError::InvalidRoomNumber(_)
            | LocationError::InvalidBlockShape(_)
            | LocationError::InvalidCapacity(_)
            | LocationError::InvalidSiteCode => ErrorKind::Validation,
            LocationError::DuplicateBlock { .. }
            | LocationError::DuplicateSiteCode(_)
            | LocationError::CodeCollision { .. }
            | LocationError::ImmutableOnceAssigned(_) => ErrorKind::Conflict,
            LocationError::NotFound { .. } => ErrorKind::NotFound,
            LocationError::Store(StoreError::UniqueViolation { .. }) => ErrorKind::Conflict,
            LocationError::Store(_) => ErrorKind::Internal,
        }
    }

    fn not_found(entity: &'static str, key: impl fmt::Display) -> Self {
        LocationError::NotFound {
            entity,
            key: key.to_string(),
        }
    }
}

impl From<StoreError> for LocationError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, key } => LocationError::NotFound { entity, key },
            other => LocationError::Store(other),
        }
    }
}

impl From<LocationError> for CoreError {
    fn from(err: LocationError) -> Self {
        match err {
            LocationError::NotFound { entity, key } => CoreError::NotFound { entity, key },
            other => CoreError::from_kind(other.kind(), other.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Pure code derivation
// ---------------------------------------------------------------------------

/// Render a floor for a room code: `S<n>` below ground, the number otherwise.
pub fn floor_token(floor: i32) -> String {
    if floor < 0 {
        format!("S{}", floor.unsigned_abs())
    } else {
        floor.to_string()
    }
}

/// Normalize a block letter: trimmed, a single ASCII letter, uppercased.
pub fn normalize_block_letter(raw: &str) -> Result<char, LocationError> {
    let trimmed = raw.trim();
    let mut chars = trimmed.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_alphabetic() => Ok(c.to_ascii_uppercase()),
        _ => Err(LocationError::InvalidBlockLetter(trimmed.to_string())),
    }
}

/// Derive the room code for a position. Deterministic and side-effect free.
pub fn room_code(
    site_code: u32,
    block_letter: char,
    floor: i32,
    number: i32,
) -> Result<String, LocationError> {
    if site_code == 0 {
        return Err(LocationError::InvalidSiteCode);
    }
    if !block_letter.is_ascii_uppercase() {
        return Err(LocationError::InvalidBlockLetter(block_letter.to_string()));
    }
    if floor == 0 {
        return Err(LocationError::InvalidFloor);
    }
    if !(1..=MAX_ROOM_NUMBER).contains(&number) {
        return Err(LocationError::InvalidRoomNumber(number));
    }
    Ok(format!(
        "{site_code}{block_letter}{}{number:02}",
        floor_token(floor)
    ))
}

/// Check that `floor` exists in `block`.
pub fn validate_floor(block: &Block, floor: i32) -> Result<(), LocationError> {
    if floor == 0 {
        return Err(LocationError::InvalidFloor);
    }
    let (min, max) = block.floor_range();
    if floor < min || floor > max {
        return Err(LocationError::FloorOutOfRange { floor, min, max });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Create a block under a site, enforcing `(site, letter)` uniqueness.
pub async fn create_block<S>(store: &S, request: &BlockRequest) -> Result<Block, LocationError>
where
    S: LocationStore + ?Sized,
{
    let letter = normalize_block_letter(&request.letter)?;
    if request.floors < 1 {
        return Err(LocationError::InvalidBlockShape(
            "a block needs at least one floor".into(),
        ));
    }
    if request.basements < 0 {
        return Err(LocationError::InvalidBlockShape(
            "basement count cannot be negative".into(),
        ));
    }
    if store.get_site(request.site_id).await?.is_none() {
        return Err(LocationError::not_found("Site", request.site_id));
    }

    let input = NewBlock {
        site_id: request.site_id,
        letter,
        floors: request.floors,
        basements: request.basements,
        name: request
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string),
    };

    match store.insert_block(&input).await {
        Ok(block) => {
            tracing::info!(block_id = block.id, site_id = block.site_id, letter = %block.letter, "Block created");
            Ok(block)
        }
        Err(StoreError::UniqueViolation { constraint })
            if constraint == constraints::BLOCK_SITE_LETTER =>
        {
            Err(LocationError::DuplicateBlock {
                site_id: request.site_id,
                letter,
            })
        }
        Err(e) => Err(e.into()),
    }
}

/// Allocate (or re-fetch) the room at `(block, floor, number)`.
///
/// Re-running with the same key returns the stored room and its code
/// unchanged. A code already owned by a different key fails with
/// [`LocationError::CodeCollision`].
pub async fn allocate_room<S>(
    store: &S,
    request: &RoomRequest,
) -> Result<RoomAllocation, LocationError>
where
    S: LocationStore + ?Sized,
{
    let block = store
        .get_block(request.block_id)
        .await?
        .ok_or_else(|| LocationError::not_found("Block", request.block_id))?;
    let site = store
        .get_site(block.site_id)
        .await?
        .ok_or_else(|| LocationError::not_found("Site", block.site_id))?;

    validate_floor(&block, request.floor)?;
    room_code(site.official_code, block.letter, request.floor, request.number)?;

    if let Some(capacity) = request.capacity {
        if capacity < 0 {
            return Err(LocationError::InvalidCapacity(capacity));
        }
    }

    let input = NewRoom {
        block_id: block.id,
        floor: request.floor,
        number: request.number,
        capacity: request.capacity,
        kind: request.kind,
        name: request.name.trim().to_string(),
    };

    match store.insert_room_guarded(&input).await? {
        RoomInsert::Created(room) => {
            tracing::info!(room_id = room.id, code = %room.code, "Room allocated");
            Ok(RoomAllocation {
                room,
                created: true,
            })
        }
        RoomInsert::Existing(room) => {
            tracing::debug!(room_id = room.id, code = %room.code, "Room already allocated");
            Ok(RoomAllocation {
                room,
                created: false,
            })
        }
        RoomInsert::CodeTaken(other) => {
            tracing::warn!(code = %other.code, existing_room_id = other.id, "Room code collision");
            Err(LocationError::CodeCollision {
                code: other.code,
                existing_room_id: other.id,
            })
        }
    }
}

/// Change a site's official code. Allowed only while the site has no rooms,
/// because every room code embeds it.
pub async fn rename_site_code<S>(
    store: &S,
    site_id: DbId,
    official_code: u32,
) -> Result<Site, LocationError>
where
    S: LocationStore + ?Sized,
{
    if official_code == 0 {
        return Err(LocationError::InvalidSiteCode);
    }
    let site = store
        .get_site(site_id)
        .await?
        .ok_or_else(|| LocationError::not_found("Site", site_id))?;
    if site.official_code == official_code {
        return Ok(site);
    }

    match store
        .update_site_code_if_no_rooms(site_id, official_code)
        .await
    {
        Ok(SiteCodeUpdate::Updated(site)) => {
            tracing::info!(site_id, official_code, "Site official code changed");
            Ok(site)
        }
        Ok(SiteCodeUpdate::HasRooms) => Err(LocationError::ImmutableOnceAssigned(site_id)),
        Err(StoreError::UniqueViolation { constraint })
            if constraint == constraints::SITE_OFFICIAL_CODE =>
        {
            Err(LocationError::DuplicateSiteCode(official_code))
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn sites_under<S>(store: &S, campus_id: DbId) -> Result<Vec<Site>, LocationError>
where
    S: LocationStore + ?Sized,
{
    if store.get_campus(campus_id).await?.is_none() {
        return Err(LocationError::not_found("Campus", campus_id));
    }
    Ok(store.list_sites(campus_id).await?)
}

pub async fn blocks_under<S>(store: &S, site_id: DbId) -> Result<Vec<Block>, LocationError>
where
    S: LocationStore + ?Sized,
{
    if store.get_site(site_id).await?.is_none() {
        return Err(LocationError::not_found("Site", site_id));
    }
    Ok(store.list_blocks(site_id).await?)
}

pub async fn rooms_under<S>(store: &S, block_id: DbId) -> Result<Vec<Room>, LocationError>
where
    S: LocationStore + ?Sized,
{
    if store.get_block(block_id).await?.is_none() {
        return Err(LocationError::not_found("Block", block_id));
    }
    Ok(store.list_rooms(block_id).await?)
}

/// Look a room up by its code (case-insensitive).
pub async fn room_by_code<S>(store: &S, code: &str) -> Result<Room, LocationError>
where
    S: LocationStore + ?Sized,
{
    let normalized = code.trim().to_ascii_uppercase();
    store
        .find_room_by_code(&normalized)
        .await?
        .ok_or_else(|| LocationError::not_found("Room", normalized))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::store::MemoryStore;

    fn block(floors: i32, basements: i32) -> Block {
        Block {
            id: 1,
            site_id: 1,
            letter: 'A',
            floors,
            basements,
            name: None,
        }
    }

    fn room_request(block_id: DbId, floor: i32, number: i32) -> RoomRequest {
        RoomRequest {
            block_id,
            floor,
            number,
            capacity: Some(30),
            kind: RoomKind::Lecture,
            name: "Aula".into(),
        }
    }

    async fn seeded_block(store: &MemoryStore, site_code: u32, basements: i32) -> Block {
        let campus = store.add_campus("LIM", "Lima Centro").await;
        let site = store.add_site(campus.id, site_code, "Sede Central").await;
        create_block(
            store,
            &BlockRequest {
                site_id: site.id,
                letter: "a".into(),
                floors: 5,
                basements,
                name: None,
            },
        )
        .await
        .expect("block should be created")
    }

    // -- pure derivation --

    #[test]
    fn basement_floor_renders_with_s_prefix() {
        assert_eq!(floor_token(-1), "S1");
        assert_eq!(floor_token(-12), "S12");
        assert_eq!(floor_token(3), "3");
    }

    #[test]
    fn room_code_for_basement_room() {
        assert_eq!(room_code(77, 'A', -1, 3).unwrap(), "77AS103");
    }

    #[test]
    fn room_code_pads_number_to_two_digits() {
        assert_eq!(room_code(12, 'B', 2, 7).unwrap(), "12B207");
        assert_eq!(room_code(12, 'B', 2, 45).unwrap(), "12B245");
    }

    #[test]
    fn room_code_rejects_floor_zero_and_bad_numbers() {
        assert_matches!(room_code(77, 'A', 0, 3), Err(LocationError::InvalidFloor));
        assert_matches!(
            room_code(77, 'A', 1, 0),
            Err(LocationError::InvalidRoomNumber(0))
        );
        assert_matches!(
            room_code(77, 'A', 1, 100),
            Err(LocationError::InvalidRoomNumber(100))
        );
        assert_matches!(
            room_code(77, 'a', 1, 1),
            Err(LocationError::InvalidBlockLetter(_))
        );
    }

    #[test]
    fn block_letter_is_normalized() {
        assert_eq!(normalize_block_letter(" c ").unwrap(), 'C');
        assert_matches!(
            normalize_block_letter("AB"),
            Err(LocationError::InvalidBlockLetter(_))
        );
        assert_matches!(
            normalize_block_letter("1"),
            Err(LocationError::InvalidBlockLetter(_))
        );
        assert_matches!(
            normalize_block_letter(""),
            Err(LocationError::InvalidBlockLetter(_))
        );
    }

    #[test]
    fn floor_must_fit_block() {
        let b = block(4, 2);
        assert!(validate_floor(&b, -2).is_ok());
        assert!(validate_floor(&b, 4).is_ok());
        assert_matches!(
            validate_floor(&b, 5),
            Err(LocationError::FloorOutOfRange { min: -2, max: 4, .. })
        );
        assert_matches!(
            validate_floor(&b, -3),
            Err(LocationError::FloorOutOfRange { .. })
        );
        assert_matches!(validate_floor(&b, 0), Err(LocationError::InvalidFloor));
    }

    // -- allocation --

    #[tokio::test]
    async fn allocation_is_idempotent_on_position() {
        let store = MemoryStore::new();
        let block = seeded_block(&store, 77, 1).await;

        let first = allocate_room(&store, &room_request(block.id, -1, 3))
            .await
            .unwrap();
        assert!(first.created);
        assert_eq!(first.room.code, "77AS103");

        let second = allocate_room(&store, &room_request(block.id, -1, 3))
            .await
            .unwrap();
        assert!(!second.created);
        assert_eq!(second.room.id, first.room.id);
        assert_eq!(second.room.code, "77AS103");
        assert_eq!(store.list_rooms(block.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn allocation_rejects_floor_outside_block() {
        let store = MemoryStore::new();
        let block = seeded_block(&store, 77, 0).await;

        let result = allocate_room(&store, &room_request(block.id, -1, 3)).await;
        assert_matches!(result, Err(LocationError::FloorOutOfRange { .. }));
    }

    #[tokio::test]
    async fn code_owned_by_other_position_is_a_collision() {
        let store = MemoryStore::new();
        let block = seeded_block(&store, 77, 0).await;
        store.force_room(block.id, 2, 99, "77A101").await;

        let result = allocate_room(&store, &room_request(block.id, 1, 1)).await;
        assert_matches!(result, Err(LocationError::CodeCollision { ref code, .. }) if code == "77A101");
    }

    #[tokio::test]
    async fn unknown_block_is_not_found() {
        let store = MemoryStore::new();
        let result = allocate_room(&store, &room_request(999, 1, 1)).await;
        assert_matches!(result, Err(LocationError::NotFound { entity: "Block", .. }));
    }

    #[tokio::test]
    async fn duplicate_block_letter_in_site() {
        let store = MemoryStore::new();
        let block = seeded_block(&store, 77, 0).await;

        let result = create_block(
            &store,
            &BlockRequest {
                site_id: block.site_id,
                letter: "A".into(),
                floors: 2,
                basements: 0,
                name: None,
            },
        )
        .await;
        assert_matches!(result, Err(LocationError::DuplicateBlock { letter: 'A', .. }));
    }

    #[tokio::test]
    async fn room_code_uses_site_code_current_at_insert() {
        let store = MemoryStore::new();
        let block = seeded_block(&store, 77, 0).await;
        // The allocation reads code 77; the site becomes 78 before the insert.
        store.rename_site_after_next_read(block.site_id, 78).await;

        let allocation = allocate_room(&store, &room_request(block.id, 1, 1))
            .await
            .unwrap();
        assert_eq!(allocation.room.code, "78A101");
        assert_matches!(
            rename_site_code(&store, block.site_id, 79).await,
            Err(LocationError::ImmutableOnceAssigned(_))
        );
    }

    // -- site code --

    #[tokio::test]
    async fn site_code_changes_until_rooms_exist() {
        let store = MemoryStore::new();
        let block = seeded_block(&store, 77, 0).await;

        let site = rename_site_code(&store, block.site_id, 78).await.unwrap();
        assert_eq!(site.official_code, 78);

        allocate_room(&store, &room_request(block.id, 1, 1))
            .await
            .unwrap();

        let result = rename_site_code(&store, block.site_id, 79).await;
        assert_matches!(result, Err(LocationError::ImmutableOnceAssigned(_)));

        // Re-submitting the current code is a no-op, not an error.
        let unchanged = rename_site_code(&store, block.site_id, 78).await.unwrap();
        assert_eq!(unchanged.official_code, 78);
    }

    #[tokio::test]
    async fn site_code_must_be_unique() {
        let store = MemoryStore::new();
        let block = seeded_block(&store, 77, 0).await;
        let site = store.get_site(block.site_id).await.unwrap().unwrap();
        let other = store.add_site(site.campus_id, 12, "Anexo").await;

        let result = rename_site_code(&store, other.id, 77).await;
        assert_matches!(result, Err(LocationError::DuplicateSiteCode(77)));
        assert_eq!(
            store.get_site(other.id).await.unwrap().unwrap().official_code,
            12
        );
    }

    // -- hierarchy reads --

    #[tokio::test]
    async fn hierarchy_reads_walk_down_the_tree() {
        let store = MemoryStore::new();
        let block = seeded_block(&store, 77, 1).await;
        allocate_room(&store, &room_request(block.id, 1, 2))
            .await
            .unwrap();
        let site = store.get_site(block.site_id).await.unwrap().unwrap();

        assert_eq!(sites_under(&store, site.campus_id).await.unwrap().len(), 1);
        assert_eq!(blocks_under(&store, site.id).await.unwrap().len(), 1);
        assert_eq!(rooms_under(&store, block.id).await.unwrap().len(), 1);
        assert_eq!(room_by_code(&store, "77a102").await.unwrap().number, 2);
        assert_matches!(
            rooms_under(&store, 4242).await,
            Err(LocationError::NotFound { entity: "Block", .. })
        );
    }
}
