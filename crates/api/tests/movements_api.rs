//! HTTP-level tests for the movement workflow.

mod common;

use axum::http::StatusCode;
use common::{body_json, build_test_app, TestApp};
use serde_json::json;

/// Request a transfer of `code` to the second campus' room.
async fn request_transfer(app: &TestApp, code: &str, authorizer_id: i64) -> axum::response::Response {
    app.post(
        "/api/v1/movements",
        &app.world.sis_supervisor,
        json!({
            "movement_type": "transfer",
            "asset_codes": [code],
            "authorizer_id": authorizer_id,
            "destination_room_id": app.world.other_room.id,
            "reason": "Campus move",
        }),
    )
    .await
}

async fn pending_transfer(app: &TestApp) -> (String, i64) {
    let code = app.register_laptop(&app.world.admin, app.world.room.id).await;
    let response = request_transfer(app, &code, app.world.admin.id).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "pending");
    (code, json["data"]["id"].as_i64().unwrap())
}

#[tokio::test]
async fn approval_moves_the_asset_and_audits_once() {
    let app = build_test_app().await;
    let (code, id) = pending_transfer(&app).await;

    let response = app
        .post(&format!("/api/v1/movements/{id}/approve"), &app.world.admin, json!({}))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "approved");
    assert_eq!(json["data"]["resolver_id"], app.world.admin.id);

    let asset = body_json(app.get(&format!("/api/v1/assets/{code}"), &app.world.admin).await).await;
    assert_eq!(asset["data"]["room_id"], app.world.other_room.id);
    assert_eq!(asset["data"]["campus_id"], app.world.arequipa.id);

    let history = body_json(
        app.get(&format!("/api/v1/assets/{code}/history"), &app.world.admin)
            .await,
    )
    .await;
    let records = history["data"].as_array().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["action"], "movement_applied");
    assert_eq!(records[0]["movement_id"], id);
}

#[tokio::test]
async fn second_resolution_conflicts() {
    let app = build_test_app().await;
    let (_, id) = pending_transfer(&app).await;
    let uri = format!("/api/v1/movements/{id}/approve");

    let first = app.post(&uri, &app.world.admin, json!({})).await;
    assert_eq!(first.status(), StatusCode::OK);

    let second = app.post(&uri, &app.world.admin, json!({})).await;
    assert_eq!(second.status(), StatusCode::CONFLICT);
    let json = body_json(second).await;
    assert_eq!(json["code"], "CONFLICT");
}

#[tokio::test]
async fn rejection_needs_a_reason_and_leaves_assets_alone() {
    let app = build_test_app().await;
    let (code, id) = pending_transfer(&app).await;
    let uri = format!("/api/v1/movements/{id}/reject");

    let blank = app.post(&uri, &app.world.admin, json!({ "reason": "  " })).await;
    assert_eq!(blank.status(), StatusCode::BAD_REQUEST);

    let response = app
        .post(&uri, &app.world.admin, json!({ "reason": "Not budgeted" }))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "rejected");
    assert_eq!(json["data"]["rejection_reason"], "Not budgeted");

    let asset = body_json(app.get(&format!("/api/v1/assets/{code}"), &app.world.admin).await).await;
    assert_eq!(asset["data"]["room_id"], app.world.room.id);

    let history = body_json(
        app.get(&format!("/api/v1/assets/{code}/history"), &app.world.admin)
            .await,
    )
    .await;
    assert_eq!(history["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn self_authorization_is_forbidden_and_creates_nothing() {
    let app = build_test_app().await;
    let code = app.register_laptop(&app.world.admin, app.world.room.id).await;

    let response = request_transfer(&app, &code, app.world.sis_supervisor.id).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let all = body_json(app.get("/api/v1/movements", &app.world.admin).await).await;
    assert!(all["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn empty_asset_selection_is_a_validation_error() {
    let app = build_test_app().await;
    let response = app
        .post(
            "/api/v1/movements",
            &app.world.sis_supervisor,
            json!({
                "movement_type": "transfer",
                "asset_codes": [],
                "authorizer_id": app.world.admin.id,
                "destination_room_id": app.world.other_room.id,
            }),
        )
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn auxiliary_cannot_move_assets_on_other_campuses() {
    let app = build_test_app().await;
    let code = app.register_laptop(&app.world.admin, app.world.room.id).await;

    let response = app
        .post(
            "/api/v1/movements",
            &app.world.aux_arequipa,
            json!({
                "movement_type": "transfer",
                "asset_codes": [code],
                "authorizer_id": app.world.admin.id,
                "destination_room_id": app.world.other_room.id,
            }),
        )
        .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let all = body_json(app.get("/api/v1/movements", &app.world.admin).await).await;
    assert!(all["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn only_the_named_authorizer_resolves() {
    let app = build_test_app().await;
    let (_, id) = pending_transfer(&app).await;

    let response = app
        .post(
            &format!("/api/v1/movements/{id}/approve"),
            &app.world.lab_supervisor,
            json!({}),
        )
        .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn pending_queue_and_filters() {
    let app = build_test_app().await;
    let (_, id) = pending_transfer(&app).await;

    let queue = body_json(app.get("/api/v1/movements/pending", &app.world.admin).await).await;
    let queue = queue["data"].as_array().unwrap();
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0]["id"], id);

    let mine = body_json(
        app.get(
            &format!("/api/v1/movements?requester_id={}", app.world.sis_supervisor.id),
            &app.world.sis_supervisor,
        )
        .await,
    )
    .await;
    assert_eq!(mine["data"].as_array().unwrap().len(), 1);

    let approved = body_json(
        app.get("/api/v1/movements?status=approved", &app.world.admin)
            .await,
    )
    .await;
    assert!(approved["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn movements_are_hidden_from_unrelated_actors() {
    let app = build_test_app().await;
    let (_, id) = pending_transfer(&app).await;

    let response = app
        .get(&format!("/api/v1/movements/{id}"), &app.world.lab_supervisor)
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let requester = app
        .get(&format!("/api/v1/movements/{id}"), &app.world.sis_supervisor)
        .await;
    assert_eq!(requester.status(), StatusCode::OK);
}

#[tokio::test]
async fn unknown_movement_is_not_found() {
    let app = build_test_app().await;
    let response = app
        .post("/api/v1/movements/9999/approve", &app.world.admin, json!({}))
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn authorizer_choices_are_admins_and_area_supervisors() {
    let app = build_test_app().await;
    let uri = format!("/api/v1/movements/authorizers?area_id={}", app.world.sistemas.id);

    let response = app.get(&uri, &app.world.aux_arequipa).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let ids: Vec<i64> = json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![app.world.admin.id, app.world.sis_supervisor.id]);
    assert_eq!(json["data"][1]["role"], "supervisor");
}

#[tokio::test]
async fn authorizer_choices_need_a_known_area() {
    let app = build_test_app().await;

    let unknown = app
        .get("/api/v1/movements/authorizers?area_id=9999", &app.world.admin)
        .await;
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);

    let missing = app.get("/api/v1/movements/authorizers", &app.world.admin).await;
    assert_eq!(missing.status(), StatusCode::BAD_REQUEST);
}
