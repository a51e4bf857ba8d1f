//! Repository for `campuses`, `sites`, `blocks`, and `rooms`.

use assetflow_core::location::{self, NewBlock, NewRoom};
use assetflow_core::types::DbId;
use sqlx::PgPool;

use crate::models::location::{BlockRow, CampusRow, RoomRow, SiteRow};

const CAMPUS_COLUMNS: &str = "id, code, name, is_active";
const SITE_COLUMNS: &str = "id, campus_id, official_code, name";
const BLOCK_COLUMNS: &str = "id, site_id, letter, floors, basements, name";
const ROOM_COLUMNS: &str = "id, block_id, floor, number, code, capacity, kind, name";

/// Outcome of [`LocationRepo::insert_room_guarded`].
#[derive(Debug)]
pub enum GuardedRoomInsert {
    Created(RoomRow),
    Existing(RoomRow),
    CodeTaken(RoomRow),
    /// The block does not exist.
    MissingBlock,
    /// The stored site code and block letter do not form a valid room code.
    InvalidCode(String),
}

/// Outcome of [`LocationRepo::update_site_code_if_no_rooms`].
#[derive(Debug)]
pub enum SiteCodeChange {
    Missing,
    HasRooms,
    Updated(SiteRow),
}

pub struct LocationRepo;

impl LocationRepo {
    // -- reads --

    pub async fn find_campus(pool: &PgPool, id: DbId) -> Result<Option<CampusRow>, sqlx::Error> {
        let query = format!("SELECT {CAMPUS_COLUMNS} FROM campuses WHERE id = $1");
        sqlx::query_as::<_, CampusRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_site(pool: &PgPool, id: DbId) -> Result<Option<SiteRow>, sqlx::Error> {
        let query = format!("SELECT {SITE_COLUMNS} FROM sites WHERE id = $1");
        sqlx::query_as::<_, SiteRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_block(pool: &PgPool, id: DbId) -> Result<Option<BlockRow>, sqlx::Error> {
        let query = format!("SELECT {BLOCK_COLUMNS} FROM blocks WHERE id = $1");
        sqlx::query_as::<_, BlockRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_room(pool: &PgPool, id: DbId) -> Result<Option<RoomRow>, sqlx::Error> {
        let query = format!("SELECT {ROOM_COLUMNS} FROM rooms WHERE id = $1");
        sqlx::query_as::<_, RoomRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_room_by_code(
        pool: &PgPool,
        code: &str,
    ) -> Result<Option<RoomRow>, sqlx::Error> {
        let query = format!("SELECT {ROOM_COLUMNS} FROM rooms WHERE code = $1");
        sqlx::query_as::<_, RoomRow>(&query)
            .bind(code)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_room_by_position(
        pool: &PgPool,
        block_id: DbId,
        floor: i32,
        number: i32,
    ) -> Result<Option<RoomRow>, sqlx::Error> {
        let query = format!(
            "SELECT {ROOM_COLUMNS} FROM rooms WHERE block_id = $1 AND floor = $2 AND number = $3"
        );
        sqlx::query_as::<_, RoomRow>(&query)
            .bind(block_id)
            .bind(floor)
            .bind(number)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_sites(pool: &PgPool, campus_id: DbId) -> Result<Vec<SiteRow>, sqlx::Error> {
        let query = format!(
            "SELECT {SITE_COLUMNS} FROM sites WHERE campus_id = $1 ORDER BY official_code"
        );
        sqlx::query_as::<_, SiteRow>(&query)
            .bind(campus_id)
            .fetch_all(pool)
            .await
    }

    pub async fn list_blocks(pool: &PgPool, site_id: DbId) -> Result<Vec<BlockRow>, sqlx::Error> {
        let query = format!("SELECT {BLOCK_COLUMNS} FROM blocks WHERE site_id = $1 ORDER BY letter");
        sqlx::query_as::<_, BlockRow>(&query)
            .bind(site_id)
            .fetch_all(pool)
            .await
    }

    pub async fn list_rooms(pool: &PgPool, block_id: DbId) -> Result<Vec<RoomRow>, sqlx::Error> {
        let query = format!(
            "SELECT {ROOM_COLUMNS} FROM rooms WHERE block_id = $1 ORDER BY floor, number"
        );
        sqlx::query_as::<_, RoomRow>(&query)
            .bind(block_id)
            .fetch_all(pool)
            .await
    }

    /// Campus owning a room, walking block and site.
    pub async fn room_campus(pool: &PgPool, room_id: DbId) -> Result<Option<DbId>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT s.campus_id FROM rooms r \
             JOIN blocks b ON b.id = r.block_id \
             JOIN sites s ON s.id = b.site_id \
             WHERE r.id = $1",
        )
        .bind(room_id)
        .fetch_optional(pool)
        .await
    }

    // -- writes --

    pub async fn create_block(pool: &PgPool, input: &NewBlock) -> Result<BlockRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO blocks (site_id, letter, floors, basements, name) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {BLOCK_COLUMNS}"
        );
        sqlx::query_as::<_, BlockRow>(&query)
            .bind(input.site_id)
            .bind(input.letter.to_string())
            .bind(input.floors)
            .bind(input.basements)
            .bind(&input.name)
            .fetch_one(pool)
            .await
    }

    /// Insert a room unless its position or code is already taken.
    ///
    /// Locks the parent block for update and its site for share, then derives
    /// the code from those locked rows. Allocations within a block serialize,
    /// and a site code change cannot commit between the derivation and the
    /// insert. A racing insert in another block can still trip
    /// `uq_rooms_code`; the caller resolves that by re-reading.
    pub async fn insert_room_guarded(
        pool: &PgPool,
        input: &NewRoom,
    ) -> Result<GuardedRoomInsert, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let parent: Option<(String, i32)> = sqlx::query_as(
            "SELECT b.letter, s.official_code \
             FROM blocks b JOIN sites s ON s.id = b.site_id \
             WHERE b.id = $1 \
             FOR UPDATE OF b FOR SHARE OF s",
        )
        .bind(input.block_id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some((letter, site_code)) = parent else {
            return Ok(GuardedRoomInsert::MissingBlock);
        };
        let code = match derive_room_code(&letter, site_code, input) {
            Ok(code) => code,
            Err(reason) => return Ok(GuardedRoomInsert::InvalidCode(reason)),
        };

        let by_position = format!(
            "SELECT {ROOM_COLUMNS} FROM rooms WHERE block_id = $1 AND floor = $2 AND number = $3"
        );
        if let Some(existing) = sqlx::query_as::<_, RoomRow>(&by_position)
            .bind(input.block_id)
            .bind(input.floor)
            .bind(input.number)
            .fetch_optional(&mut *tx)
            .await?
        {
            return Ok(GuardedRoomInsert::Existing(existing));
        }

        let by_code = format!("SELECT {ROOM_COLUMNS} FROM rooms WHERE code = $1");
        if let Some(owner) = sqlx::query_as::<_, RoomRow>(&by_code)
            .bind(&code)
            .fetch_optional(&mut *tx)
            .await?
        {
            return Ok(GuardedRoomInsert::CodeTaken(owner));
        }

        let insert = format!(
            "INSERT INTO rooms (block_id, floor, number, code, capacity, kind, name) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {ROOM_COLUMNS}"
        );
        let room = sqlx::query_as::<_, RoomRow>(&insert)
            .bind(input.block_id)
            .bind(input.floor)
            .bind(input.number)
            .bind(&code)
            .bind(input.capacity)
            .bind(input.kind.as_str())
            .bind(&input.name)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(GuardedRoomInsert::Created(room))
    }

    /// Change a site's official code only while no room exists under it.
    pub async fn update_site_code_if_no_rooms(
        pool: &PgPool,
        site_id: DbId,
        official_code: i32,
    ) -> Result<SiteCodeChange, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let lock = format!("SELECT {SITE_COLUMNS} FROM sites WHERE id = $1 FOR UPDATE");
        if sqlx::query_as::<_, SiteRow>(&lock)
            .bind(site_id)
            .fetch_optional(&mut *tx)
            .await?
            .is_none()
        {
            return Ok(SiteCodeChange::Missing);
        }

        let has_rooms: bool = sqlx::query_scalar(
            "SELECT EXISTS ( \
                 SELECT 1 FROM rooms r JOIN blocks b ON b.id = r.block_id \
                 WHERE b.site_id = $1 \
             )",
        )
        .bind(site_id)
        .fetch_one(&mut *tx)
        .await?;
        if has_rooms {
            return Ok(SiteCodeChange::HasRooms);
        }

        let update = format!(
            "UPDATE sites SET official_code = $2 WHERE id = $1 RETURNING {SITE_COLUMNS}"
        );
        let site = sqlx::query_as::<_, SiteRow>(&update)
            .bind(site_id)
            .bind(official_code)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(SiteCodeChange::Updated(site))
    }
}

fn derive_room_code(letter: &str, site_code: i32, input: &NewRoom) -> Result<String, String> {
    let mut chars = letter.chars();
    let (Some(letter), None) = (chars.next(), chars.next()) else {
        return Err(format!("block {} has letter '{letter}'", input.block_id));
    };
    let site_code = u32::try_from(site_code)
        .map_err(|_| format!("block {} sits on a negative site code", input.block_id))?;
    location::room_code(site_code, letter, input.floor, input.number).map_err(|e| e.to_string())
}
