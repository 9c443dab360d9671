//! Highlight and note handlers.
//!
//! Every response carries the colour resolved against the document's label
//! layers, so a highlight whose key was removed from the lens still renders
//! with a name and a hex.

use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value as JsonValue;
use utoipa::ToSchema;
use uuid::Uuid;

use wisemark_core::{
    CreateHighlightRequest, Highlight, HighlightRepository, LabelLayers, Note,
    UpdateHighlightRequest,
};

use super::DocumentContext;
use crate::auth::RequireAuth;
use crate::error::ApiError;
use crate::extract::{AppJson, AppPath};
use crate::state::AppState;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HighlightResponse {
    pub id: Uuid,
    pub document_id: Uuid,
    pub page_number: i32,
    #[schema(value_type = Object)]
    pub position_data: JsonValue,
    /// Stored colour key.
    pub color_key: String,
    pub color_display_name: String,
    pub color_hex: String,
    /// The key is no longer part of the effective lens.
    pub is_stale: bool,
    pub highlighted_text: String,
    pub note: Option<Note>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl HighlightResponse {
    pub fn new(highlight: Highlight, layers: &LabelLayers<'_>) -> Self {
        let display = layers.resolve(&highlight.color);
        Self {
            id: highlight.id,
            document_id: highlight.document_id,
            page_number: highlight.page_number,
            position_data: highlight.position_data,
            color_key: highlight.color.key,
            color_display_name: display.name,
            color_hex: display.hex,
            is_stale: display.is_stale,
            highlighted_text: highlight.highlighted_text,
            note: highlight.note,
            created_at: highlight.created_at,
            updated_at: highlight.updated_at,
        }
    }
}

/// Highlights of a document ordered by page.
#[utoipa::path(
    get,
    path = "/api/v1/documents/{id}/highlights",
    tag = "Highlights",
    params(("id" = Uuid, Path, description = "Document id")),
    responses((status = 200, body = [HighlightResponse]))
)]
pub async fn list_highlights(
    State(state): State<AppState>,
    RequireAuth { user_id }: RequireAuth,
    AppPath(document_id): AppPath<Uuid>,
) -> Result<Json<Vec<HighlightResponse>>, ApiError> {
    let ctx = DocumentContext::load(&state.db, user_id, document_id).await?;
    let layers = ctx.layers();
    let highlights = state.db.highlights.list(document_id).await?;
    Ok(Json(
        highlights
            .into_iter()
            .map(|h| HighlightResponse::new(h, &layers))
            .collect(),
    ))
}

/// Create a highlight. An unknown or missing colour falls back to the first
/// colour of the effective lens; a non-blank `comment` becomes its note.
#[utoipa::path(
    post,
    path = "/api/v1/documents/{id}/highlights",
    tag = "Highlights",
    params(("id" = Uuid, Path, description = "Document id")),
    responses(
        (status = 201, body = HighlightResponse),
        (status = 400, description = "Invalid page number")
    )
)]
pub async fn create_highlight(
    State(state): State<AppState>,
    RequireAuth { user_id }: RequireAuth,
    AppPath(document_id): AppPath<Uuid>,
    AppJson(req): AppJson<CreateHighlightRequest>,
) -> Result<(StatusCode, Json<HighlightResponse>), ApiError> {
    let ctx = DocumentContext::load(&state.db, user_id, document_id).await?;
    let highlight = state
        .db
        .highlights
        .create(document_id, ctx.lens.as_ref(), req)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(HighlightResponse::new(highlight, &ctx.layers())),
    ))
}

/// Change a highlight's colour and/or note. A blank note deletes it.
#[utoipa::path(
    patch,
    path = "/api/v1/documents/{id}/highlights/{highlight_id}",
    tag = "Highlights",
    params(
        ("id" = Uuid, Path, description = "Document id"),
        ("highlight_id" = Uuid, Path, description = "Highlight id")
    ),
    responses(
        (status = 200, body = HighlightResponse),
        (status = 400, description = "Colour key not in the effective lens")
    )
)]
pub async fn update_highlight(
    State(state): State<AppState>,
    RequireAuth { user_id }: RequireAuth,
    AppPath((document_id, highlight_id)): AppPath<(Uuid, Uuid)>,
    AppJson(req): AppJson<UpdateHighlightRequest>,
) -> Result<Json<HighlightResponse>, ApiError> {
    let ctx = DocumentContext::load(&state.db, user_id, document_id).await?;

    let highlight = state
        .db
        .highlights
        .update(document_id, highlight_id, ctx.lens.as_ref(), req)
        .await?;
    Ok(Json(HighlightResponse::new(highlight, &ctx.layers())))
}

/// Delete a highlight and its note.
#[utoipa::path(
    delete,
    path = "/api/v1/documents/{id}/highlights/{highlight_id}",
    tag = "Highlights",
    params(
        ("id" = Uuid, Path, description = "Document id"),
        ("highlight_id" = Uuid, Path, description = "Highlight id")
    ),
    responses((status = 204, description = "Deleted"))
)]
pub async fn delete_highlight(
    State(state): State<AppState>,
    RequireAuth { user_id }: RequireAuth,
    AppPath((document_id, highlight_id)): AppPath<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    DocumentContext::load(&state.db, user_id, document_id).await?;
    state.db.highlights.delete(document_id, highlight_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
