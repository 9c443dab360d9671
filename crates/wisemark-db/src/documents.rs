//! Document repository implementation.
//!
//! Documents are scoped to their project's owner: a document in someone
//! else's project is reported as `NotFound`, never `Forbidden`.

use std::collections::HashSet;

use async_trait::async_trait;
use sqlx::{PgConnection, Pool, Postgres, Row};
use tracing::{debug, info};
use uuid::Uuid;

use wisemark_core::palette::validate_filename;
use wisemark_core::{
    validate_hex, CreateDocumentRequest, Document, DocumentLabels, DocumentRepository, Error,
    Result, UpdateDocumentRequest,
};

use crate::map_db_error;

const DOCUMENT_SELECT: &str = r#"
    SELECT d.id, d.project_id, d.pdf_hash, d.filename, d.file_size, d.color, d.lens_id,
           d.storage_location, d.last_opened_at, d.created_at, d.updated_at,
           (SELECT COUNT(*) FROM highlight h WHERE h.document_id = d.id) AS annotation_count
    FROM document d
    JOIN project p ON p.id = d.project_id
"#;

/// PostgreSQL implementation of DocumentRepository.
#[derive(Clone)]
pub struct PgDocumentRepository {
    pool: Pool<Postgres>,
}

impl PgDocumentRepository {
    /// Create a new PgDocumentRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn not_found(document_id: Uuid) -> Error {
        Error::NotFound(format!("Document {} not found", document_id))
    }
}

pub(crate) fn document_from_row(row: &sqlx::postgres::PgRow) -> Result<Document> {
    let storage: String = row.get("storage_location");
    Ok(Document {
        id: row.get("id"),
        project_id: row.get("project_id"),
        pdf_hash: row.get("pdf_hash"),
        filename: row.get("filename"),
        file_size: row.get("file_size"),
        color: row.get("color"),
        lens_id: row.get("lens_id"),
        storage_location: storage.parse()?,
        annotation_count: row.get("annotation_count"),
        last_opened_at: row.get("last_opened_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

async fn fetch_owned(
    conn: &mut PgConnection,
    user_id: Uuid,
    document_id: Uuid,
) -> Result<Option<Document>> {
    let query = format!("{} WHERE d.id = $1 AND p.owner_id = $2", DOCUMENT_SELECT);
    let row = sqlx::query(&query)
        .bind(document_id)
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(Error::Database)?;

    row.as_ref().map(document_from_row).transpose()
}

/// Replace the legacy overlay of a document.
///
/// Keys present in `labels` are upserted with the trimmed name (an empty name
/// is stored as empty), legacy keys absent from `labels` are removed, and keys
/// that are not legacy colours are ignored.
async fn write_color_labels(
    conn: &mut PgConnection,
    document_id: Uuid,
    labels: &DocumentLabels,
) -> Result<usize> {
    let legacy_keys: HashSet<String> = sqlx::query_scalar("SELECT key FROM legacy_color")
        .fetch_all(&mut *conn)
        .await
        .map_err(Error::Database)?
        .into_iter()
        .collect();

    let mut kept: Vec<String> = Vec::new();
    for (key, name) in labels {
        if !legacy_keys.contains(key) {
            debug!(
                subsystem = "db",
                component = "documents",
                document_id = %document_id,
                color_key = %key,
                "Ignoring label for unknown legacy colour"
            );
            continue;
        }
        sqlx::query(
            "INSERT INTO document_color (document_id, color_key, custom_name)
             VALUES ($1, $2, $3)
             ON CONFLICT (document_id, color_key) DO UPDATE SET custom_name = EXCLUDED.custom_name",
        )
        .bind(document_id)
        .bind(key)
        .bind(name.trim())
        .execute(&mut *conn)
        .await
        .map_err(Error::Database)?;
        kept.push(key.clone());
    }

    sqlx::query("DELETE FROM document_color WHERE document_id = $1 AND color_key <> ALL($2)")
        .bind(document_id)
        .bind(&kept)
        .execute(&mut *conn)
        .await
        .map_err(Error::Database)?;

    Ok(kept.len())
}

#[async_trait]
impl DocumentRepository for PgDocumentRepository {
    async fn list(&self, user_id: Uuid, project_id: Option<Uuid>) -> Result<Vec<Document>> {
        let query = format!(
            "{} WHERE p.owner_id = $1 AND ($2::uuid IS NULL OR d.project_id = $2)
             ORDER BY d.updated_at DESC",
            DOCUMENT_SELECT
        );
        let rows = sqlx::query(&query)
            .bind(user_id)
            .bind(project_id)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        rows.iter().map(document_from_row).collect()
    }

    async fn get(&self, user_id: Uuid, document_id: Uuid) -> Result<Document> {
        let mut conn = self.pool.acquire().await.map_err(Error::Database)?;
        fetch_owned(&mut conn, user_id, document_id)
            .await?
            .ok_or_else(|| Self::not_found(document_id))
    }

    async fn open(&self, user_id: Uuid, document_id: Uuid) -> Result<Document> {
        let result = sqlx::query(
            "UPDATE document SET last_opened_at = now()
             WHERE id = $1
               AND project_id IN (SELECT id FROM project WHERE owner_id = $2)",
        )
        .bind(document_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Self::not_found(document_id));
        }
        self.get(user_id, document_id).await
    }

    async fn create(&self, user_id: Uuid, req: CreateDocumentRequest) -> Result<Document> {
        let pdf_hash = req.pdf_hash.trim().to_lowercase();
        if pdf_hash.is_empty() {
            return Err(Error::Validation("pdf_hash is required".to_string()));
        }
        let filename = validate_filename(&req.filename)?;
        let file_size = req.file_size.unwrap_or(0);
        if file_size < 0 {
            return Err(Error::Validation("file_size must not be negative".to_string()));
        }

        let owns_project: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM project WHERE id = $1 AND owner_id = $2)",
        )
        .bind(req.project_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;
        if !owns_project {
            return Err(Error::NotFound(format!("Project {} not found", req.project_id)));
        }

        let document_id = Uuid::now_v7();
        sqlx::query(
            "INSERT INTO document (id, project_id, pdf_hash, filename, file_size)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(document_id)
        .bind(req.project_id)
        .bind(&pdf_hash)
        .bind(&filename)
        .bind(file_size)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        sqlx::query("UPDATE project SET updated_at = now() WHERE id = $1")
            .bind(req.project_id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        info!(
            subsystem = "db",
            component = "documents",
            op = "create_document",
            user_id = %user_id,
            project_id = %req.project_id,
            document_id = %document_id,
            "Document created"
        );
        self.get(user_id, document_id).await
    }

    async fn update(
        &self,
        user_id: Uuid,
        document_id: Uuid,
        req: UpdateDocumentRequest,
    ) -> Result<Document> {
        let filename = req
            .filename
            .as_deref()
            .map(validate_filename)
            .transpose()?;
        if let Some(Some(color)) = req.color.as_ref() {
            validate_hex("color", color)?;
        }

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        fetch_owned(&mut tx, user_id, document_id)
            .await?
            .ok_or_else(|| Self::not_found(document_id))?;

        if let Some(Some(lens_id)) = req.lens_id {
            let visible: bool = sqlx::query_scalar(
                "SELECT EXISTS(
                    SELECT 1 FROM lens WHERE id = $1 AND (owner_id IS NULL OR owner_id = $2)
                 )",
            )
            .bind(lens_id)
            .bind(user_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(Error::Database)?;
            if !visible {
                return Err(Error::NotFound(format!("Lens {} not found", lens_id)));
            }
        }

        sqlx::query(
            "UPDATE document SET
                filename = COALESCE($2, filename),
                color = CASE WHEN $3 THEN $4 ELSE color END,
                lens_id = CASE WHEN $5 THEN $6 ELSE lens_id END,
                updated_at = now()
             WHERE id = $1",
        )
        .bind(document_id)
        .bind(filename)
        .bind(req.color.is_some())
        .bind(req.color.clone().flatten())
        .bind(req.lens_id.is_some())
        .bind(req.lens_id.flatten())
        .execute(&mut *tx)
        .await
        .map_err(|e| match map_db_error(e) {
            // The lens vanished between the visibility check and the write.
            Error::InUse(_) => Error::NotFound("Lens not found".to_string()),
            other => other,
        })?;

        if let Some(labels) = req.color_labels.as_ref() {
            write_color_labels(&mut tx, document_id, labels).await?;
        }

        let document = fetch_owned(&mut tx, user_id, document_id)
            .await?
            .ok_or_else(|| Self::not_found(document_id))?;
        tx.commit().await.map_err(Error::Database)?;

        info!(
            subsystem = "db",
            component = "documents",
            op = "update_document",
            document_id = %document_id,
            lens_changed = req.lens_id.is_some(),
            labels_changed = req.color_labels.is_some(),
            "Document updated"
        );
        Ok(document)
    }

    async fn delete(&self, user_id: Uuid, document_id: Uuid) -> Result<()> {
        let result = sqlx::query(
            "DELETE FROM document d USING project p
             WHERE d.id = $1 AND d.project_id = p.id AND p.owner_id = $2",
        )
        .bind(document_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Self::not_found(document_id));
        }

        info!(
            subsystem = "db",
            component = "documents",
            op = "delete_document",
            user_id = %user_id,
            document_id = %document_id,
            "Document deleted"
        );
        Ok(())
    }

    async fn color_labels(&self, document_id: Uuid) -> Result<DocumentLabels> {
        let rows = sqlx::query(
            "SELECT color_key, custom_name FROM document_color WHERE document_id = $1",
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows
            .iter()
            .map(|r| (r.get("color_key"), r.get("custom_name")))
            .collect())
    }
}
