//! Document handlers, including PDF upload and download.

use std::collections::HashMap;

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use wisemark_core::{
    CreateDocumentRequest, Document, DocumentLabels, DocumentRepository, Error, Lens, LensCache,
    LensRepository, ProjectRepository, StorageLocation, UpdateDocumentRequest,
};

use super::lenses::LensResponse;
use super::DocumentContext;
use crate::auth::RequireAuth;
use crate::error::ApiError;
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::state::AppState;

const PDF_MAGIC: &[u8] = b"%PDF-";

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DocumentListQuery {
    /// Only documents of this project.
    pub project_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DocumentResponse {
    pub id: Uuid,
    pub project_id: Uuid,
    pub pdf_hash: String,
    pub filename: String,
    pub file_size: i64,
    /// Document colour, or the project colour when unset.
    pub color: String,
    /// Explicitly assigned lens; `null` means the default system lens applies.
    pub lens_id: Option<Uuid>,
    /// The lens highlight colours resolve against.
    pub effective_lens: Option<LensResponse>,
    pub storage_location: StorageLocation,
    pub annotation_count: i64,
    pub last_opened_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Legacy per-document colour names. Only present on single-document
    /// responses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_labels: Option<DocumentLabels>,
}

impl DocumentResponse {
    pub fn new(document: Document, project_color: &str, lens: Option<Lens>) -> Self {
        Self {
            color: document
                .color
                .unwrap_or_else(|| project_color.to_string()),
            id: document.id,
            project_id: document.project_id,
            pdf_hash: document.pdf_hash,
            filename: document.filename,
            file_size: document.file_size,
            lens_id: document.lens_id,
            effective_lens: lens.map(Into::into),
            storage_location: document.storage_location,
            annotation_count: document.annotation_count,
            last_opened_at: document.last_opened_at,
            created_at: document.created_at,
            updated_at: document.updated_at,
            color_labels: None,
        }
    }

    pub fn with_labels(mut self, labels: DocumentLabels) -> Self {
        self.color_labels = Some(labels);
        self
    }
}

async fn detail_response(
    state: &AppState,
    user_id: Uuid,
    document: Document,
) -> Result<DocumentResponse, ApiError> {
    let project = state.db.projects.get(user_id, document.project_id).await?;
    let ctx = DocumentContext::for_document(&state.db, document).await?;
    Ok(DocumentResponse::new(ctx.document, &project.color, ctx.lens).with_labels(ctx.labels))
}

/// List the caller's documents, optionally filtered by project.
#[utoipa::path(
    get,
    path = "/api/v1/documents",
    tag = "Documents",
    params(DocumentListQuery),
    responses((status = 200, body = [DocumentResponse]))
)]
pub async fn list_documents(
    State(state): State<AppState>,
    RequireAuth { user_id }: RequireAuth,
    AppQuery(query): AppQuery<DocumentListQuery>,
) -> Result<Json<Vec<DocumentResponse>>, ApiError> {
    let documents = state.db.documents.list(user_id, query.project_id).await?;
    let project_colors: HashMap<Uuid, String> = state
        .db
        .projects
        .list(user_id)
        .await?
        .into_iter()
        .map(|p| (p.id, p.color))
        .collect();

    // One cache for the whole page so the default lens resolves once.
    let mut cache = LensCache::new();
    let mut out = Vec::with_capacity(documents.len());
    for document in documents {
        let lens = state
            .db
            .lenses
            .effective_lens(document.lens_id, &mut cache)
            .await?;
        let color = project_colors
            .get(&document.project_id)
            .map(String::as_str)
            .unwrap_or(wisemark_core::defaults::DEFAULT_PROJECT_COLOR);
        out.push(DocumentResponse::new(document, color, lens));
    }
    Ok(Json(out))
}

/// Open a document: returns it with colour labels and stamps
/// `last_opened_at`.
#[utoipa::path(
    get,
    path = "/api/v1/documents/{id}",
    tag = "Documents",
    params(("id" = Uuid, Path, description = "Document id")),
    responses((status = 200, body = DocumentResponse), (status = 404, description = "Document not found"))
)]
pub async fn get_document(
    State(state): State<AppState>,
    RequireAuth { user_id }: RequireAuth,
    AppPath(document_id): AppPath<Uuid>,
) -> Result<Json<DocumentResponse>, ApiError> {
    let document = state.db.documents.open(user_id, document_id).await?;
    Ok(Json(detail_response(&state, user_id, document).await?))
}

/// Register a PDF in a project. The bytes are uploaded separately.
#[utoipa::path(
    post,
    path = "/api/v1/documents",
    tag = "Documents",
    responses(
        (status = 201, body = DocumentResponse),
        (status = 409, description = "This PDF is already in the project")
    )
)]
pub async fn create_document(
    State(state): State<AppState>,
    RequireAuth { user_id }: RequireAuth,
    AppJson(req): AppJson<CreateDocumentRequest>,
) -> Result<(StatusCode, Json<DocumentResponse>), ApiError> {
    let document = state.db.documents.create(user_id, req).await?;
    info!(
        subsystem = "api",
        component = "documents",
        op = "create_document",
        document_id = %document.id,
        project_id = %document.project_id,
        "Document created"
    );
    let response = detail_response(&state, user_id, document).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Partially update a document: filename, colour, lens assignment, and
/// legacy colour labels.
#[utoipa::path(
    patch,
    path = "/api/v1/documents/{id}",
    tag = "Documents",
    params(("id" = Uuid, Path, description = "Document id")),
    responses(
        (status = 200, body = DocumentResponse),
        (status = 404, description = "Document or lens not found")
    )
)]
pub async fn update_document(
    State(state): State<AppState>,
    RequireAuth { user_id }: RequireAuth,
    AppPath(document_id): AppPath<Uuid>,
    AppJson(req): AppJson<UpdateDocumentRequest>,
) -> Result<Json<DocumentResponse>, ApiError> {
    let document = state.db.documents.update(user_id, document_id, req).await?;
    Ok(Json(detail_response(&state, user_id, document).await?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/documents/{id}",
    tag = "Documents",
    params(("id" = Uuid, Path, description = "Document id")),
    responses((status = 204, description = "Deleted"))
)]
pub async fn delete_document(
    State(state): State<AppState>,
    RequireAuth { user_id }: RequireAuth,
    AppPath(document_id): AppPath<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.db.documents.delete(user_id, document_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Upload the PDF bytes of a document. Recomputes the hash and size.
#[utoipa::path(
    put,
    path = "/api/v1/documents/{id}/pdf",
    tag = "Documents",
    params(("id" = Uuid, Path, description = "Document id")),
    request_body(content = String, content_type = "application/pdf", description = "PDF bytes"),
    responses(
        (status = 200, body = DocumentResponse),
        (status = 400, description = "Empty body or not a PDF"),
        (status = 409, description = "This PDF is already in the project")
    )
)]
pub async fn upload_pdf(
    State(state): State<AppState>,
    RequireAuth { user_id }: RequireAuth,
    AppPath(document_id): AppPath<Uuid>,
    body: Bytes,
) -> Result<Json<DocumentResponse>, ApiError> {
    if body.is_empty() {
        return Err(Error::Validation("PDF upload is empty".to_string()).into());
    }
    if !body.starts_with(PDF_MAGIC) {
        return Err(Error::Validation("Uploaded file is not a PDF".to_string()).into());
    }

    // Ownership check before touching storage.
    state.db.documents.get(user_id, document_id).await?;
    let stored = state.db.pdf_storage.store(document_id, &body).await?;
    info!(
        subsystem = "api",
        component = "documents",
        op = "upload_pdf",
        document_id = %document_id,
        byte_len = stored.file_size,
        storage = %stored.location,
        "PDF uploaded"
    );

    let document = state.db.documents.get(user_id, document_id).await?;
    Ok(Json(detail_response(&state, user_id, document).await?))
}

/// Download the PDF bytes of a document.
#[utoipa::path(
    get,
    path = "/api/v1/documents/{id}/pdf",
    tag = "Documents",
    params(("id" = Uuid, Path, description = "Document id")),
    responses(
        (status = 200, description = "PDF bytes as application/pdf"),
        (status = 404, description = "Document not found or no PDF uploaded")
    )
)]
pub async fn download_pdf(
    State(state): State<AppState>,
    RequireAuth { user_id }: RequireAuth,
    AppPath(document_id): AppPath<Uuid>,
) -> Result<Response, ApiError> {
    let document = state.db.documents.get(user_id, document_id).await?;
    let data = state.db.pdf_storage.load(document_id).await?;

    let disposition = format!(
        "inline; filename=\"{}\"",
        content_disposition_filename(&document.filename)
    );
    let disposition = HeaderValue::from_str(&disposition)
        .unwrap_or_else(|_| HeaderValue::from_static("inline"));

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/pdf")),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        data,
    )
        .into_response())
}

/// Filename safe to embed in a quoted `Content-Disposition` parameter.
pub fn content_disposition_filename(filename: &str) -> String {
    let cleaned: String = filename
        .chars()
        .map(|c| match c {
            '"' | '\\' | '/' => '_',
            c if c.is_control() || !c.is_ascii() => '_',
            c => c,
        })
        .collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        "document.pdf".to_string()
    } else {
        cleaned.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document(color: Option<&str>) -> Document {
        Document {
            id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            pdf_hash: "ab".repeat(32),
            filename: "teaser.pdf".to_string(),
            file_size: 1024,
            color: color.map(str::to_string),
            lens_id: None,
            storage_location: StorageLocation::Postgres,
            annotation_count: 3,
            last_opened_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_color_falls_back_to_project_color() {
        let response = DocumentResponse::new(document(None), "#f59e0b", None);
        assert_eq!(response.color, "#f59e0b");

        let response = DocumentResponse::new(document(Some("#10B981")), "#f59e0b", None);
        assert_eq!(response.color, "#10B981");
    }

    #[test]
    fn test_color_labels_only_serialized_when_present() {
        let response = DocumentResponse::new(document(None), "#f59e0b", None);
        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("color_labels").is_none());

        let mut labels = DocumentLabels::new();
        labels.insert("yellow".to_string(), "Revenue".to_string());
        let json = serde_json::to_value(response.with_labels(labels)).unwrap();
        assert_eq!(json["color_labels"]["yellow"], "Revenue");
    }

    #[test]
    fn test_content_disposition_filename() {
        assert_eq!(content_disposition_filename("teaser.pdf"), "teaser.pdf");
        assert_eq!(
            content_disposition_filename("Q3 \"final\"/v2.pdf"),
            "Q3 _final__v2.pdf"
        );
        assert_eq!(content_disposition_filename("Übersicht.pdf"), "_bersicht.pdf");
        assert_eq!(content_disposition_filename("  "), "document.pdf");
        assert_eq!(content_disposition_filename("a\r\nb.pdf"), "a__b.pdf");
    }
}
