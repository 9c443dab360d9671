//! Highlight and note repository implementation.
//!
//! Callers verify document ownership before reaching this repository; every
//! statement here is still scoped by `document_id` so a highlight id from
//! another document is reported as `NotFound`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::{PgConnection, Pool, Postgres, Row};
use tracing::{debug, info};
use uuid::Uuid;

use wisemark_core::{
    parse_page_number, resolve_color_key, ColorSnapshot, CreateHighlightRequest, Error,
    Highlight, HighlightRepository, Lens, Note, Result, UpdateHighlightRequest,
};

const HIGHLIGHT_SELECT: &str = r#"
    SELECT h.id, h.document_id, h.page_number, h.position_data, h.color_key, h.color_name,
           h.highlighted_text, h.created_at, h.updated_at,
           n.id AS note_id, n.content AS note_content,
           n.created_at AS note_created_at, n.updated_at AS note_updated_at
    FROM highlight h
    LEFT JOIN note n ON n.highlight_id = h.id
"#;

/// PostgreSQL implementation of HighlightRepository.
#[derive(Clone)]
pub struct PgHighlightRepository {
    pool: Pool<Postgres>,
}

impl PgHighlightRepository {
    /// Create a new PgHighlightRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn not_found(highlight_id: Uuid) -> Error {
        Error::NotFound(format!("Highlight {} not found", highlight_id))
    }
}

fn highlight_from_row(row: &sqlx::postgres::PgRow) -> Highlight {
    let id: Uuid = row.get("id");
    let note_id: Option<Uuid> = row.get("note_id");
    let note = note_id.map(|note_id| Note {
        id: note_id,
        highlight_id: id,
        content: row.get("note_content"),
        created_at: row.get::<DateTime<Utc>, _>("note_created_at"),
        updated_at: row.get::<DateTime<Utc>, _>("note_updated_at"),
    });

    Highlight {
        id,
        document_id: row.get("document_id"),
        page_number: row.get("page_number"),
        position_data: row.get("position_data"),
        color: ColorSnapshot {
            key: row.get("color_key"),
            last_known_name: row.get("color_name"),
        },
        highlighted_text: row.get("highlighted_text"),
        note,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

async fn fetch_one(
    conn: &mut PgConnection,
    document_id: Uuid,
    highlight_id: Uuid,
) -> Result<Highlight> {
    let query = format!("{} WHERE h.id = $1 AND h.document_id = $2", HIGHLIGHT_SELECT);
    let row = sqlx::query(&query)
        .bind(highlight_id)
        .bind(document_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(Error::Database)?
        .ok_or_else(|| PgHighlightRepository::not_found(highlight_id))?;

    Ok(highlight_from_row(&row))
}

async fn touch_document(conn: &mut PgConnection, document_id: Uuid) -> Result<()> {
    sqlx::query("UPDATE document SET updated_at = now() WHERE id = $1")
        .bind(document_id)
        .execute(&mut *conn)
        .await
        .map_err(Error::Database)?;
    Ok(())
}

#[async_trait]
impl HighlightRepository for PgHighlightRepository {
    async fn list(&self, document_id: Uuid) -> Result<Vec<Highlight>> {
        let query = format!(
            "{} WHERE h.document_id = $1 ORDER BY h.page_number, h.created_at, h.id",
            HIGHLIGHT_SELECT
        );
        let rows = sqlx::query(&query)
            .bind(document_id)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(rows.iter().map(highlight_from_row).collect())
    }

    async fn get(&self, document_id: Uuid, highlight_id: Uuid) -> Result<Highlight> {
        let mut conn = self.pool.acquire().await.map_err(Error::Database)?;
        fetch_one(&mut conn, document_id, highlight_id).await
    }

    async fn create(
        &self,
        document_id: Uuid,
        lens: Option<&Lens>,
        req: CreateHighlightRequest,
    ) -> Result<Highlight> {
        let page_number = parse_page_number(req.page_number.as_ref())?;
        let key = resolve_color_key(req.color.as_deref(), lens);
        let snapshot = ColorSnapshot::capture(&key, lens);
        let position_data = req.position_data.unwrap_or_else(|| json!({}));
        let comment = req
            .comment
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty());

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM document WHERE id = $1)")
                .bind(document_id)
                .fetch_one(&mut *tx)
                .await
                .map_err(Error::Database)?;
        if !exists {
            return Err(Error::NotFound(format!("Document {} not found", document_id)));
        }

        let highlight_id = Uuid::now_v7();
        sqlx::query(
            "INSERT INTO highlight
                (id, document_id, page_number, position_data, color_key, color_name, highlighted_text)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(highlight_id)
        .bind(document_id)
        .bind(page_number)
        .bind(&position_data)
        .bind(&snapshot.key)
        .bind(&snapshot.last_known_name)
        .bind(req.highlighted_text.as_deref().unwrap_or(""))
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        if let Some(content) = comment {
            sqlx::query("INSERT INTO note (id, highlight_id, content) VALUES ($1, $2, $3)")
                .bind(Uuid::now_v7())
                .bind(highlight_id)
                .bind(content)
                .execute(&mut *tx)
                .await
                .map_err(Error::Database)?;
        }

        touch_document(&mut tx, document_id).await?;
        let highlight = fetch_one(&mut tx, document_id, highlight_id).await?;
        tx.commit().await.map_err(Error::Database)?;

        info!(
            subsystem = "db",
            component = "highlights",
            op = "create_highlight",
            document_id = %document_id,
            highlight_id = %highlight_id,
            color_key = %highlight.color.key,
            with_note = highlight.note.is_some(),
            "Highlight created"
        );
        Ok(highlight)
    }

    async fn update(
        &self,
        document_id: Uuid,
        highlight_id: Uuid,
        lens: Option<&Lens>,
        req: UpdateHighlightRequest,
    ) -> Result<Highlight> {
        let entry = match req.color.as_deref().map(str::trim) {
            Some(key) => Some(lens.and_then(|l| l.entry(key)).ok_or_else(|| {
                Error::Validation(format!(
                    "Colour '{}' is not part of the document's lens",
                    key
                ))
            })?),
            None => None,
        };
        let note = req.note_content().map(str::trim);
        if entry.is_none() && note.is_none() {
            return Err(Error::Validation(
                "Nothing to update: provide color or note".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let locked = sqlx::query(
            "SELECT id FROM highlight WHERE id = $1 AND document_id = $2 FOR UPDATE",
        )
        .bind(highlight_id)
        .bind(document_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(Error::Database)?;
        if locked.is_none() {
            return Err(Self::not_found(highlight_id));
        }

        if let Some(entry) = entry {
            sqlx::query(
                "UPDATE highlight SET color_key = $2, color_name = $3, updated_at = now()
                 WHERE id = $1",
            )
            .bind(highlight_id)
            .bind(&entry.key)
            .bind(&entry.display_name)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
        }

        match note {
            Some("") => {
                sqlx::query("DELETE FROM note WHERE highlight_id = $1")
                    .bind(highlight_id)
                    .execute(&mut *tx)
                    .await
                    .map_err(Error::Database)?;
            }
            Some(content) => {
                sqlx::query(
                    "INSERT INTO note (id, highlight_id, content) VALUES ($1, $2, $3)
                     ON CONFLICT (highlight_id)
                     DO UPDATE SET content = EXCLUDED.content, updated_at = now()",
                )
                .bind(Uuid::now_v7())
                .bind(highlight_id)
                .bind(content)
                .execute(&mut *tx)
                .await
                .map_err(Error::Database)?;
            }
            None => {}
        }

        let highlight = fetch_one(&mut tx, document_id, highlight_id).await?;
        tx.commit().await.map_err(Error::Database)?;

        debug!(
            subsystem = "db",
            component = "highlights",
            op = "update_highlight",
            highlight_id = %highlight_id,
            color_key = %highlight.color.key,
            note_changed = note.is_some(),
            note_removed = note == Some(""),
            "Highlight updated"
        );
        Ok(highlight)
    }

    async fn update_color(
        &self,
        document_id: Uuid,
        highlight_id: Uuid,
        lens: Option<&Lens>,
        color_key: &str,
    ) -> Result<Highlight> {
        let req = UpdateHighlightRequest {
            color: Some(color_key.to_string()),
            ..Default::default()
        };
        self.update(document_id, highlight_id, lens, req).await
    }

    async fn set_note(
        &self,
        document_id: Uuid,
        highlight_id: Uuid,
        content: &str,
    ) -> Result<Highlight> {
        let req = UpdateHighlightRequest {
            note: Some(content.to_string()),
            ..Default::default()
        };
        self.update(document_id, highlight_id, None, req).await
    }

    async fn delete(&self, document_id: Uuid, highlight_id: Uuid) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let result = sqlx::query("DELETE FROM highlight WHERE id = $1 AND document_id = $2")
            .bind(highlight_id)
            .bind(document_id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Self::not_found(highlight_id));
        }
        touch_document(&mut tx, document_id).await?;
        tx.commit().await.map_err(Error::Database)?;

        info!(
            subsystem = "db",
            component = "highlights",
            op = "delete_highlight",
            document_id = %document_id,
            highlight_id = %highlight_id,
            "Highlight deleted"
        );
        Ok(())
    }
}
