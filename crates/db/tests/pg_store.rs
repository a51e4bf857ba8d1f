//! Integration tests for `PgStore`. They need a PostgreSQL server reachable
//! through `DATABASE_URL`; run them with `cargo test -- --ignored`.

use assetflow_core::assets::{AssetCondition, NewAsset};
use assetflow_core::audit::{actions, NewAuditRecord};
use assetflow_core::location::{NewRoom, RoomInsert, RoomKind, SiteCodeUpdate};
use assetflow_core::movement::effects::{AssetChange, AssetState};
use assetflow_core::movement::{MovementStatus, MovementType, NewMovement, Resolution};
use assetflow_core::notification::{NewNotification, NotificationKind};
use assetflow_core::store::{
    AssetStore, AuditStore, Directory, LocationStore, MovementStore, NotificationStore,
    SequenceStore, StoreError,
};
use assetflow_core::types::DbId;
use assetflow_db::PgStore;
use sqlx::PgPool;

struct Seed {
    block_id: DbId,
    room_id: DbId,
    other_room_id: DbId,
    type_id: DbId,
    area_id: DbId,
    actor_id: DbId,
    custodian_id: DbId,
}

async fn seed(pool: &PgPool) -> Seed {
    let campus_id: DbId =
        sqlx::query_scalar("INSERT INTO campuses (code, name) VALUES ('X', 'Norte') RETURNING id")
            .fetch_one(pool)
            .await
            .unwrap();
    let site_id: DbId = sqlx::query_scalar(
        "INSERT INTO sites (campus_id, official_code, name) VALUES ($1, 77, 'Sede 77') RETURNING id",
    )
    .bind(campus_id)
    .fetch_one(pool)
    .await
    .unwrap();
    let block_id: DbId = sqlx::query_scalar(
        "INSERT INTO blocks (site_id, letter, floors) VALUES ($1, 'A', 3) RETURNING id",
    )
    .bind(site_id)
    .fetch_one(pool)
    .await
    .unwrap();
    let room_id: DbId = sqlx::query_scalar(
        "INSERT INTO rooms (block_id, floor, number, code, kind, name) \
         VALUES ($1, 1, 1, '77A101', 'office', 'Oficina') RETURNING id",
    )
    .bind(block_id)
    .fetch_one(pool)
    .await
    .unwrap();
    let other_room_id: DbId = sqlx::query_scalar(
        "INSERT INTO rooms (block_id, floor, number, code, kind, name) \
         VALUES ($1, 2, 1, '77A201', 'lecture', 'Aula') RETURNING id",
    )
    .bind(block_id)
    .fetch_one(pool)
    .await
    .unwrap();
    let area_id: DbId = sqlx::query_scalar("SELECT id FROM areas WHERE code = 'sistemas'")
        .fetch_one(pool)
        .await
        .unwrap();
    let type_id: DbId = sqlx::query_scalar(
        "INSERT INTO asset_types (area_id, name) VALUES ($1, 'Laptop') RETURNING id",
    )
    .bind(area_id)
    .fetch_one(pool)
    .await
    .unwrap();
    let actor_id: DbId =
        sqlx::query_scalar("INSERT INTO actors (display_name) VALUES ('Ana') RETURNING id")
            .fetch_one(pool)
            .await
            .unwrap();
    sqlx::query(
        "INSERT INTO actor_profiles (actor_id, role, area_ids, campus_ids) VALUES ($1, 'admin', $2, $3)",
    )
    .bind(actor_id)
    .bind(vec![area_id])
    .bind(vec![campus_id])
    .execute(pool)
    .await
    .unwrap();
    let custodian_id: DbId = sqlx::query_scalar(
        "INSERT INTO collaborators (full_name, unit) VALUES ('Luis Mora', 'Sistemas') RETURNING id",
    )
    .fetch_one(pool)
    .await
    .unwrap();

    Seed {
        block_id,
        room_id,
        other_room_id,
        type_id,
        area_id,
        actor_id,
        custodian_id,
    }
}

fn new_asset(seed: &Seed, code: &str, serial: Option<&str>) -> NewAsset {
    NewAsset {
        internal_code: code.to_string(),
        label: "PENDING".to_string(),
        serial_number: serial.map(str::to_string),
        name: "Laptop".to_string(),
        area_id: seed.area_id,
        asset_type_id: seed.type_id,
        room_id: Some(seed.room_id),
        condition: AssetCondition::Active,
        custodian_id: Some(seed.custodian_id),
        warranty_until: None,
        is_leasing: false,
        leasing_company: None,
        leasing_end: None,
        created_at: chrono::Utc::now(),
        created_by: seed.actor_id,
    }
}

fn audit(seed: &Seed, action: &str) -> NewAuditRecord {
    NewAuditRecord {
        movement_id: None,
        action: action.to_string(),
        actor_id: seed.actor_id,
        changes: Vec::new(),
        recorded_at: chrono::Utc::now(),
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_health_check(pool: PgPool) {
    assetflow_db::health_check(&pool).await.unwrap();
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_sequences_increment_per_prefix_and_year(pool: PgPool) {
    let store = PgStore::new(pool);
    assert_eq!(store.next_sequence("SIS", 2026).await.unwrap(), 1);
    assert_eq!(store.next_sequence("SIS", 2026).await.unwrap(), 2);
    assert_eq!(store.next_sequence("SIS", 2027).await.unwrap(), 1);
    assert_eq!(store.next_sequence("LAB", 2026).await.unwrap(), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_guarded_room_insert_never_overwrites(pool: PgPool) {
    let seed = seed(&pool).await;
    let store = PgStore::new(pool);

    let input = NewRoom {
        block_id: seed.block_id,
        floor: 1,
        number: 1,
        capacity: Some(40),
        kind: RoomKind::Lecture,
        name: "Renamed".to_string(),
    };
    match store.insert_room_guarded(&input).await.unwrap() {
        RoomInsert::Existing(room) => {
            assert_eq!(room.id, seed.room_id);
            assert_eq!(room.name, "Oficina");
            assert_eq!(room.kind, RoomKind::Office);
        }
        other => panic!("expected existing room, got {other:?}"),
    }

    let fresh = NewRoom {
        floor: 3,
        number: 5,
        ..input
    };
    assert!(matches!(
        store.insert_room_guarded(&fresh).await.unwrap(),
        RoomInsert::Created(ref room) if room.code == "77A305"
    ));
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_guarded_room_insert_uses_committed_site_code(pool: PgPool) {
    seed(&pool).await;
    let campus_id: DbId = sqlx::query_scalar("SELECT id FROM campuses WHERE code = 'X'")
        .fetch_one(&pool)
        .await
        .unwrap();
    let site_id: DbId = sqlx::query_scalar(
        "INSERT INTO sites (campus_id, official_code, name) VALUES ($1, 40, 'Anexo') RETURNING id",
    )
    .bind(campus_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    let block_id: DbId = sqlx::query_scalar(
        "INSERT INTO blocks (site_id, letter, floors, basements) VALUES ($1, 'C', 2, 1) RETURNING id",
    )
    .bind(site_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    let store = PgStore::new(pool);
    assert!(matches!(
        store.update_site_code_if_no_rooms(site_id, 41).await.unwrap(),
        SiteCodeUpdate::Updated(_)
    ));

    let input = NewRoom {
        block_id,
        floor: -1,
        number: 2,
        capacity: None,
        kind: RoomKind::Office,
        name: "Archivo".to_string(),
    };
    assert!(matches!(
        store.insert_room_guarded(&input).await.unwrap(),
        RoomInsert::Created(ref room) if room.code == "41CS102"
    ));
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_site_code_locked_once_rooms_exist(pool: PgPool) {
    let seed = seed(&pool).await;
    let store = PgStore::new(pool.clone());
    let block = store.get_block(seed.block_id).await.unwrap().unwrap();

    let outcome = store
        .update_site_code_if_no_rooms(block.site_id, 78)
        .await
        .unwrap();
    assert!(matches!(outcome, SiteCodeUpdate::HasRooms));
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_asset_uniqueness_and_located_reads(pool: PgPool) {
    let seed = seed(&pool).await;
    let store = PgStore::new(pool);

    let asset = store
        .insert_asset(
            &new_asset(&seed, "SIS-2026-0001", Some("SN-1")),
            &audit(&seed, actions::ASSET_CREATED),
        )
        .await
        .unwrap();
    assert_eq!(asset.version, 1);

    let dup = store
        .insert_asset(
            &new_asset(&seed, "SIS-2026-0002", Some("SN-1")),
            &audit(&seed, actions::ASSET_CREATED),
        )
        .await;
    assert!(matches!(
        dup,
        Err(StoreError::UniqueViolation { ref constraint }) if constraint == "uq_assets_serial_number"
    ));

    let located = store
        .locate_asset_by_code("SIS-2026-0001")
        .await
        .unwrap()
        .unwrap();
    assert!(located.campus_id.is_some());
    assert!(!located.is_mobile);
    assert!(store.serial_exists("SN-1").await.unwrap());

    let records = store.list_audit_records(asset.id).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].action, actions::ASSET_CREATED);
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_label_update_checks_version(pool: PgPool) {
    let seed = seed(&pool).await;
    let store = PgStore::new(pool);
    let asset = store
        .insert_asset(
            &new_asset(&seed, "SIS-2026-0001", None),
            &audit(&seed, actions::ASSET_CREATED),
        )
        .await
        .unwrap();

    let updated = store
        .update_label(asset.id, 1, "ETQ-100", &audit(&seed, actions::LABEL_ASSIGNED))
        .await
        .unwrap();
    assert_eq!(updated.label, "ETQ-100");
    assert_eq!(updated.version, 2);

    let stale = store
        .update_label(asset.id, 1, "ETQ-101", &audit(&seed, actions::LABEL_ASSIGNED))
        .await;
    assert!(matches!(stale, Err(StoreError::Contention { id, .. }) if id == asset.id));
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_resolution_is_all_or_nothing(pool: PgPool) {
    let seed = seed(&pool).await;
    let store = PgStore::new(pool);
    let a = store
        .insert_asset(&new_asset(&seed, "SIS-2026-0001", None), &audit(&seed, actions::ASSET_CREATED))
        .await
        .unwrap();
    let b = store
        .insert_asset(&new_asset(&seed, "SIS-2026-0002", None), &audit(&seed, actions::ASSET_CREATED))
        .await
        .unwrap();

    let now = chrono::Utc::now();
    let movement = store
        .insert_movement(
            &NewMovement {
                movement_type: MovementType::Transfer,
                asset_ids: vec![b.id, a.id],
                origin_room_id: Some(seed.room_id),
                destination_room_id: Some(seed.other_room_id),
                destination_custodian_id: None,
                new_condition: None,
                replacement_asset_id: None,
                expected_return: None,
                requester_id: seed.actor_id,
                authorizer_id: seed.actor_id,
                reason: "Reubicación".to_string(),
                evidence_note: None,
                evidence_photo: None,
                created_at: now,
            },
            &NewNotification {
                recipient_id: seed.actor_id,
                kind: NotificationKind::MovementCreated,
                title: "Nuevo movimiento".to_string(),
                message: "Pendiente".to_string(),
                movement_id: None,
                created_at: now,
            },
        )
        .await
        .unwrap();
    assert_eq!(movement.asset_ids, vec![b.id, a.id]);
    assert_eq!(movement.status, MovementStatus::Pending);

    let change = |id: DbId, expected_version: i64| AssetChange {
        asset_id: id,
        internal_code: String::new(),
        expected_version,
        after: AssetState {
            room_id: Some(seed.other_room_id),
            custodian_id: Some(seed.custodian_id),
            condition: AssetCondition::Active,
        },
        audit: NewAuditRecord {
            movement_id: Some(movement.id),
            ..audit(&seed, actions::MOVEMENT_APPLIED)
        },
    };
    let resolution = |changes: Vec<AssetChange>| Resolution {
        movement_id: movement.id,
        status: MovementStatus::Approved,
        resolver_id: seed.actor_id,
        resolved_at: now,
        rejection_reason: None,
        changes,
        notification: NewNotification {
            recipient_id: seed.actor_id,
            kind: NotificationKind::MovementApproved,
            title: "Aprobado".to_string(),
            message: "Aprobado".to_string(),
            movement_id: None,
            created_at: now,
        },
    };

    // Second asset's version is wrong: nothing may change.
    let failed = store
        .apply_resolution(&resolution(vec![change(a.id, 1), change(b.id, 7)]))
        .await;
    assert!(matches!(failed, Err(StoreError::Contention { id, .. }) if id == b.id));
    let a_after = store.locate_asset(a.id).await.unwrap().unwrap();
    assert_eq!(a_after.asset.room_id, Some(seed.room_id));
    assert_eq!(a_after.asset.version, 1);
    assert_eq!(store.list_audit_records(a.id).await.unwrap().len(), 1);

    let applied = store
        .apply_resolution(&resolution(vec![change(a.id, 1), change(b.id, 1)]))
        .await
        .unwrap();
    assert_eq!(applied.status, MovementStatus::Approved);
    assert_eq!(applied.resolver_id, Some(seed.actor_id));
    let a_after = store.locate_asset(a.id).await.unwrap().unwrap();
    assert_eq!(a_after.asset.room_id, Some(seed.other_room_id));
    assert_eq!(a_after.asset.version, 2);

    let again = store
        .apply_resolution(&resolution(vec![change(a.id, 2)]))
        .await;
    assert!(matches!(again, Err(StoreError::StaleStatus(id)) if id == movement.id));

    // Creation and approval notifications, both unread.
    assert_eq!(store.unread_notification_count(seed.actor_id).await.unwrap(), 2);
    let actor = store.get_actor(seed.actor_id).await.unwrap().unwrap();
    assert!(actor.profile.is_some());
}
