//! Lens catalog HTTP handlers.
//!
//! System lenses are listed for everyone and are read-only; each user may
//! own up to three lenses of up to five colours each.

use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use wisemark_core::{
    AddPaletteEntryRequest, CreateLensRequest, Error, Lens, LensRepository, PaletteEntry,
    UpdateLensRequest, UpdatePaletteEntryRequest,
};

use crate::auth::RequireAuth;
use crate::error::ApiError;
use crate::extract::{AppJson, AppPath};
use crate::state::AppState;

/// One colour of a lens.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LensColorResponse {
    pub id: Uuid,
    pub key: String,
    pub display_name: String,
    pub hex: String,
    pub sort_order: i32,
}

impl From<PaletteEntry> for LensColorResponse {
    fn from(entry: PaletteEntry) -> Self {
        Self {
            id: entry.id,
            key: entry.key,
            display_name: entry.display_name,
            hex: entry.hex,
            sort_order: entry.sort_order,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LensResponse {
    pub id: Uuid,
    pub name: String,
    /// System lenses are shared and cannot be modified.
    pub is_system: bool,
    pub owner_id: Option<Uuid>,
    pub colors: Vec<LensColorResponse>,
    pub created_at: DateTime<Utc>,
}

impl From<Lens> for LensResponse {
    fn from(lens: Lens) -> Self {
        Self {
            is_system: lens.is_system(),
            id: lens.id,
            name: lens.name,
            owner_id: lens.owner_id,
            colors: lens.entries.into_iter().map(Into::into).collect(),
            created_at: lens.created_at,
        }
    }
}

/// List system lenses and the caller's own lenses, ordered by name.
#[utoipa::path(
    get,
    path = "/api/v1/lenses",
    tag = "Lenses",
    responses(
        (status = 200, description = "Visible lenses", body = [LensResponse]),
        (status = 401, description = "Missing or invalid token")
    )
)]
pub async fn list_lenses(
    State(state): State<AppState>,
    RequireAuth { user_id }: RequireAuth,
) -> Result<Json<Vec<LensResponse>>, ApiError> {
    let lenses = state.db.lenses.list_for_user(user_id).await?;
    Ok(Json(lenses.into_iter().map(Into::into).collect()))
}

/// Get one visible lens.
#[utoipa::path(
    get,
    path = "/api/v1/lenses/{id}",
    tag = "Lenses",
    params(("id" = Uuid, Path, description = "Lens id")),
    responses(
        (status = 200, body = LensResponse),
        (status = 404, description = "Lens not found")
    )
)]
pub async fn get_lens(
    State(state): State<AppState>,
    RequireAuth { user_id }: RequireAuth,
    AppPath(lens_id): AppPath<Uuid>,
) -> Result<Json<LensResponse>, ApiError> {
    let lens = state
        .db
        .lenses
        .get_visible(user_id, lens_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Lens {} not found", lens_id)))?;
    Ok(Json(lens.into()))
}

/// Create a user lens.
///
/// # Returns
/// - 201 Created with the new lens
/// - 400 Bad Request on a malformed hex colour or duplicated key
/// - 409 Conflict if the caller already has a lens with this name
/// - 422 Unprocessable Entity when the lens quota or colour capacity is exhausted
#[utoipa::path(
    post,
    path = "/api/v1/lenses",
    tag = "Lenses",
    responses(
        (status = 201, body = LensResponse),
        (status = 400, description = "Invalid colours"),
        (status = 409, description = "Duplicate lens name"),
        (status = 422, description = "Quota or capacity exceeded")
    )
)]
pub async fn create_lens(
    State(state): State<AppState>,
    RequireAuth { user_id }: RequireAuth,
    AppJson(req): AppJson<CreateLensRequest>,
) -> Result<(StatusCode, Json<LensResponse>), ApiError> {
    let lens = state.db.lenses.create(user_id, req).await?;
    info!(
        subsystem = "api",
        component = "lenses",
        op = "create_lens",
        user_id = %user_id,
        lens_id = %lens.id,
        "Lens created"
    );
    Ok((StatusCode::CREATED, Json(lens.into())))
}

/// Rename a lens and/or replace all of its colours at once.
#[utoipa::path(
    patch,
    path = "/api/v1/lenses/{id}",
    tag = "Lenses",
    params(("id" = Uuid, Path, description = "Lens id")),
    responses(
        (status = 200, body = LensResponse),
        (status = 403, description = "System lens or not the owner"),
        (status = 404, description = "Lens not found")
    )
)]
pub async fn update_lens(
    State(state): State<AppState>,
    RequireAuth { user_id }: RequireAuth,
    AppPath(lens_id): AppPath<Uuid>,
    AppJson(req): AppJson<UpdateLensRequest>,
) -> Result<Json<LensResponse>, ApiError> {
    let lens = state.db.lenses.update(user_id, lens_id, req).await?;
    Ok(Json(lens.into()))
}

/// Delete a lens. Rejected with 409 while any document is assigned to it.
#[utoipa::path(
    delete,
    path = "/api/v1/lenses/{id}",
    tag = "Lenses",
    params(("id" = Uuid, Path, description = "Lens id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "System lens or not the owner"),
        (status = 409, description = "Lens is assigned to documents")
    )
)]
pub async fn delete_lens(
    State(state): State<AppState>,
    RequireAuth { user_id }: RequireAuth,
    AppPath(lens_id): AppPath<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.db.lenses.delete(user_id, lens_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Add one colour to a lens.
#[utoipa::path(
    post,
    path = "/api/v1/lenses/{id}/colors",
    tag = "Lenses",
    params(("id" = Uuid, Path, description = "Lens id")),
    responses(
        (status = 201, body = LensColorResponse),
        (status = 409, description = "Key already in the lens"),
        (status = 422, description = "Lens already has five colours")
    )
)]
pub async fn add_lens_color(
    State(state): State<AppState>,
    RequireAuth { user_id }: RequireAuth,
    AppPath(lens_id): AppPath<Uuid>,
    AppJson(req): AppJson<AddPaletteEntryRequest>,
) -> Result<(StatusCode, Json<LensColorResponse>), ApiError> {
    let entry = state.db.lenses.add_entry(user_id, lens_id, req).await?;
    Ok((StatusCode::CREATED, Json(entry.into())))
}

/// Rename a colour of a lens.
#[utoipa::path(
    patch,
    path = "/api/v1/lenses/{id}/colors/{color_id}",
    tag = "Lenses",
    params(
        ("id" = Uuid, Path, description = "Lens id"),
        ("color_id" = Uuid, Path, description = "Colour id")
    ),
    responses((status = 200, body = LensColorResponse))
)]
pub async fn update_lens_color(
    State(state): State<AppState>,
    RequireAuth { user_id }: RequireAuth,
    AppPath((lens_id, color_id)): AppPath<(Uuid, Uuid)>,
    AppJson(req): AppJson<UpdatePaletteEntryRequest>,
) -> Result<Json<LensColorResponse>, ApiError> {
    let entry = state
        .db
        .lenses
        .update_entry(user_id, lens_id, color_id, req)
        .await?;
    Ok(Json(entry.into()))
}

/// Remove a colour from a lens. Existing highlights keep the key and render
/// as deleted.
#[utoipa::path(
    delete,
    path = "/api/v1/lenses/{id}/colors/{color_id}",
    tag = "Lenses",
    params(
        ("id" = Uuid, Path, description = "Lens id"),
        ("color_id" = Uuid, Path, description = "Colour id")
    ),
    responses((status = 204, description = "Removed"))
)]
pub async fn delete_lens_color(
    State(state): State<AppState>,
    RequireAuth { user_id }: RequireAuth,
    AppPath((lens_id, color_id)): AppPath<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    state
        .db
        .lenses
        .remove_entry(user_id, lens_id, color_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
