//! HTTP status and body mapping for domain errors.

use axum::body::to_bytes;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::Value;

use wisemark_api::error::{status_for, ApiError};
use wisemark_core::Error;

async fn body_of(err: ApiError) -> (StatusCode, Value) {
    let response = err.into_response();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[test]
fn test_status_for_every_client_error() {
    assert_eq!(status_for(&Error::Validation("x".into())), StatusCode::BAD_REQUEST);
    assert_eq!(status_for(&Error::Unauthorized("x".into())), StatusCode::UNAUTHORIZED);
    assert_eq!(status_for(&Error::Forbidden("x".into())), StatusCode::FORBIDDEN);
    assert_eq!(status_for(&Error::NotFound("x".into())), StatusCode::NOT_FOUND);
    assert_eq!(status_for(&Error::DuplicateName("x".into())), StatusCode::CONFLICT);
    assert_eq!(status_for(&Error::DuplicateKey("x".into())), StatusCode::CONFLICT);
    assert_eq!(status_for(&Error::InUse("x".into())), StatusCode::CONFLICT);
    assert_eq!(
        status_for(&Error::QuotaExceeded { limit: 3 }),
        StatusCode::UNPROCESSABLE_ENTITY
    );
    assert_eq!(
        status_for(&Error::CapacityExceeded { limit: 5 }),
        StatusCode::UNPROCESSABLE_ENTITY
    );
}

#[test]
fn test_status_for_server_errors() {
    assert_eq!(
        status_for(&Error::Internal("boom".into())),
        StatusCode::INTERNAL_SERVER_ERROR
    );
    assert_eq!(
        status_for(&Error::Config("missing".into())),
        StatusCode::INTERNAL_SERVER_ERROR
    );
    assert_eq!(
        status_for(&Error::Database(sqlx::Error::RowNotFound)),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}

#[tokio::test]
async fn test_body_carries_message_without_prefix() {
    let (status, body) =
        body_of(Error::Forbidden("System lenses cannot be modified".into()).into()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "System lenses cannot be modified");
    assert_eq!(body["kind"], Error::Forbidden(String::new()).kind());
}

#[tokio::test]
async fn test_database_details_are_hidden() {
    let (status, body) = body_of(Error::Database(sqlx::Error::PoolTimedOut).into()).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Internal server error");
}

#[tokio::test]
async fn test_bad_request_kind() {
    let (status, body) = body_of(ApiError::BadRequest("Invalid JSON".into())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation_error");
    assert_eq!(body["error"], "Invalid JSON");
}
