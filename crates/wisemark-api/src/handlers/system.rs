//! Health, rate-limit status, and the legacy colour list.

use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use wisemark_core::{LegacyColor, LegacyColorRepository};

use crate::auth::RequireAuth;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RateLimitStatus {
    pub enabled: bool,
    pub message: String,
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    responses((status = 200, body = HealthResponse))
)]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[utoipa::path(
    get,
    path = "/api/v1/rate-limit/status",
    tag = "System",
    responses((status = 200, body = RateLimitStatus))
)]
pub async fn rate_limit_status(State(state): State<AppState>) -> Json<RateLimitStatus> {
    Json(if state.rate_limiter.is_some() {
        RateLimitStatus {
            enabled: true,
            message: "Rate limiting is active".to_string(),
        }
    } else {
        RateLimitStatus {
            enabled: false,
            message: "Rate limiting is disabled".to_string(),
        }
    })
}

/// The flat colour list that predates lenses, in display order.
#[utoipa::path(
    get,
    path = "/api/v1/legacy-colors",
    tag = "System",
    responses((status = 200, body = [LegacyColor]))
)]
pub async fn list_legacy_colors(
    State(state): State<AppState>,
    _auth: RequireAuth,
) -> Result<Json<Vec<LegacyColor>>, ApiError> {
    Ok(Json(state.db.legacy_colors.list().await?))
}
