//! Tests for `AppError` to HTTP response mapping.
//!
//! These call `IntoResponse` directly on `AppError` values; no server needed.

use assert_matches::assert_matches;
use assetflow_api::error::AppError;
use assetflow_core::error::CoreError;
use assetflow_core::location::LocationError;
use assetflow_core::movement::{MovementStatus, WorkflowError};
use assetflow_core::store::StoreError;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use http_body_util::BodyExt;

/// Convert an `AppError` into its status code and parsed JSON body.
async fn error_to_response(err: AppError) -> (StatusCode, serde_json::Value) {
    let response = err.into_response();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    (status, json)
}

#[tokio::test]
async fn not_found_error_returns_404() {
    let err = AppError::Core(CoreError::not_found("Asset", "SIS-2026-0042"));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "NOT_FOUND");
    assert_eq!(json["error"], "Asset 'SIS-2026-0042' not found");
}

#[tokio::test]
async fn validation_error_returns_400() {
    let (status, json) = error_to_response(WorkflowError::NoAssetsSelected.into()).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert_eq!(json["error"], "At least one asset must be selected");
}

#[tokio::test]
async fn authorization_failures_return_403() {
    let (status, json) =
        error_to_response(WorkflowError::SelfAuthorizationForbidden.into()).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["code"], "FORBIDDEN");
}

#[tokio::test]
async fn already_resolved_returns_409() {
    let err: AppError = WorkflowError::AlreadyResolved {
        movement_id: 7,
        status: MovementStatus::Approved,
    }
    .into();

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "CONFLICT");
    assert_eq!(json["error"], "Movement 7 is already approved");
}

#[tokio::test]
async fn site_code_locked_returns_409() {
    let (status, json) = error_to_response(LocationError::ImmutableOnceAssigned(3).into()).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "CONFLICT");
}

#[tokio::test]
async fn unauthorized_returns_401() {
    let err = AppError::Core(CoreError::Unauthorized("Invalid or expired token".into()));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn bad_request_error_returns_400() {
    let err = AppError::BadRequest("invalid field value".into());

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "BAD_REQUEST");
    assert_eq!(json["error"], "invalid field value");
}

#[tokio::test]
async fn store_backend_errors_are_sanitized() {
    let err: AppError =
        WorkflowError::Store(StoreError::Backend("connection reset by peer".into())).into();

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["code"], "INTERNAL_ERROR");
    assert_eq!(json["error"], "An internal error occurred");
}

#[tokio::test]
async fn internal_error_does_not_leak_message() {
    let err = AppError::InternalError("secret stack trace".into());

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"], "An internal error occurred");
}

#[tokio::test]
async fn row_not_found_returns_404() {
    let (status, json) = error_to_response(AppError::Database(sqlx::Error::RowNotFound)).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "NOT_FOUND");
}

#[test]
fn domain_errors_convert_into_core_kinds() {
    assert_matches!(
        AppError::from(WorkflowError::NoAssetsSelected),
        AppError::Core(CoreError::Validation(_))
    );
    assert_matches!(
        AppError::from(WorkflowError::ConcurrentModification(9)),
        AppError::Core(CoreError::Conflict(_))
    );
    assert_matches!(
        AppError::from(LocationError::DuplicateSiteCode(77)),
        AppError::Core(CoreError::Conflict(ref msg)) if msg.contains("77")
    );
    assert_matches!(
        AppError::from(WorkflowError::Store(StoreError::Backend("down".into()))),
        AppError::Core(CoreError::Internal(_))
    );
}
