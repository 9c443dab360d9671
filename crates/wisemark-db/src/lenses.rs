//! Lens catalog repository implementation.
//!
//! Every mutation runs in one transaction that first locks the lens row (or
//! the owner row, for creation) so quota, capacity, and key checks cannot race
//! with a concurrent request of the same user. A failed check rolls the
//! transaction back: callers never observe a partially replaced palette.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use sqlx::{PgConnection, Pool, Postgres, Row};
use tracing::{debug, info, warn};
use uuid::Uuid;

use wisemark_core::palette::{new_entry, validate_entry_key, validate_name};
use wisemark_core::{
    check_entry_capacity, check_lens_quota, ensure_mutable_by, select_default_lens,
    validate_entries, AddPaletteEntryRequest, CreateLensRequest, Error, Lens, LensCache,
    LensRepository, NewPaletteEntry, PaletteEntry, Result, UpdateLensRequest,
    UpdatePaletteEntryRequest,
};

use crate::map_db_error;

/// PostgreSQL implementation of LensRepository.
#[derive(Clone)]
pub struct PgLensRepository {
    pool: Pool<Postgres>,
}

impl PgLensRepository {
    /// Create a new PgLensRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// All system lenses, ordered by name.
    pub async fn list_system(&self) -> Result<Vec<Lens>> {
        let mut conn = self.pool.acquire().await.map_err(Error::Database)?;
        let rows = sqlx::query(
            "SELECT id, name, owner_id, created_at FROM lens
             WHERE owner_id IS NULL
             ORDER BY name, id",
        )
        .fetch_all(&mut *conn)
        .await
        .map_err(Error::Database)?;

        attach_entries(&mut conn, rows).await
    }

    /// Fetch any lens by id, regardless of owner.
    pub async fn get(&self, lens_id: Uuid) -> Result<Option<Lens>> {
        let mut conn = self.pool.acquire().await.map_err(Error::Database)?;
        load_lens(&mut conn, lens_id).await
    }
}

// =============================================================================
// ROW HELPERS
// =============================================================================

fn entry_from_row(row: &sqlx::postgres::PgRow) -> PaletteEntry {
    PaletteEntry {
        id: row.get("id"),
        lens_id: row.get("lens_id"),
        key: row.get("key"),
        display_name: row.get("display_name"),
        hex: row.get("hex"),
        sort_order: row.get("sort_order"),
    }
}

/// Load entries for a batch of lens rows with a single query.
async fn attach_entries(
    conn: &mut PgConnection,
    rows: Vec<sqlx::postgres::PgRow>,
) -> Result<Vec<Lens>> {
    let ids: Vec<Uuid> = rows.iter().map(|r| r.get("id")).collect();

    let entry_rows = sqlx::query(
        "SELECT id, lens_id, key, display_name, hex, sort_order FROM palette_entry
         WHERE lens_id = ANY($1)
         ORDER BY sort_order, key",
    )
    .bind(&ids)
    .fetch_all(&mut *conn)
    .await
    .map_err(Error::Database)?;

    let mut by_lens: HashMap<Uuid, Vec<PaletteEntry>> = HashMap::new();
    for row in &entry_rows {
        let entry = entry_from_row(row);
        by_lens.entry(entry.lens_id).or_default().push(entry);
    }

    Ok(rows
        .into_iter()
        .map(|r| {
            let id: Uuid = r.get("id");
            Lens {
                id,
                name: r.get("name"),
                owner_id: r.get("owner_id"),
                entries: by_lens.remove(&id).unwrap_or_default(),
                created_at: r.get("created_at"),
            }
        })
        .collect())
}

async fn load_lens(conn: &mut PgConnection, lens_id: Uuid) -> Result<Option<Lens>> {
    let row = sqlx::query("SELECT id, name, owner_id, created_at FROM lens WHERE id = $1")
        .bind(lens_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(Error::Database)?;

    match row {
        Some(row) => Ok(attach_entries(conn, vec![row]).await?.pop()),
        None => Ok(None),
    }
}

/// Lock a lens row for the rest of the transaction and return it.
async fn lock_lens(conn: &mut PgConnection, lens_id: Uuid) -> Result<Lens> {
    let row = sqlx::query(
        "SELECT id, name, owner_id, created_at FROM lens WHERE id = $1 FOR UPDATE",
    )
    .bind(lens_id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(Error::Database)?
    .ok_or_else(|| Error::NotFound(format!("Lens {} not found", lens_id)))?;

    attach_entries(conn, vec![row])
        .await?
        .pop()
        .ok_or_else(|| Error::Internal(format!("Lens {} vanished while locked", lens_id)))
}

async fn insert_entry(
    conn: &mut PgConnection,
    lens_id: Uuid,
    entry: &NewPaletteEntry,
) -> Result<PaletteEntry> {
    let row = sqlx::query(
        "INSERT INTO palette_entry (id, lens_id, key, display_name, hex, sort_order)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING id, lens_id, key, display_name, hex, sort_order",
    )
    .bind(Uuid::now_v7())
    .bind(lens_id)
    .bind(&entry.key)
    .bind(&entry.display_name)
    .bind(&entry.hex)
    .bind(entry.sort_order)
    .fetch_one(&mut *conn)
    .await
    .map_err(map_db_error)?;

    Ok(entry_from_row(&row))
}

/// Refresh the cached colour name of highlights on documents assigned to
/// `lens_id`. Only the name cache changes; colour keys are never rewritten.
async fn refresh_name_cache(
    conn: &mut PgConnection,
    lens_id: Uuid,
    key: &str,
    name: &str,
) -> Result<u64> {
    let result = sqlx::query(
        "UPDATE highlight SET color_name = $3
         WHERE color_key = $2
           AND document_id IN (SELECT id FROM document WHERE lens_id = $1)",
    )
    .bind(lens_id)
    .bind(key)
    .bind(name)
    .execute(&mut *conn)
    .await
    .map_err(Error::Database)?;

    Ok(result.rows_affected())
}

async fn name_taken(
    conn: &mut PgConnection,
    owner_id: Uuid,
    name: &str,
    except: Option<Uuid>,
) -> Result<bool> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(
            SELECT 1 FROM lens
            WHERE owner_id = $1 AND name = $2 AND ($3::uuid IS NULL OR id <> $3)
         )",
    )
    .bind(owner_id)
    .bind(name)
    .bind(except)
    .fetch_one(&mut *conn)
    .await
    .map_err(Error::Database)
}

// =============================================================================
// REPOSITORY
// =============================================================================

#[async_trait]
impl LensRepository for PgLensRepository {
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Lens>> {
        let mut conn = self.pool.acquire().await.map_err(Error::Database)?;
        let rows = sqlx::query(
            "SELECT id, name, owner_id, created_at FROM lens
             WHERE owner_id IS NULL OR owner_id = $1
             ORDER BY name, id",
        )
        .bind(user_id)
        .fetch_all(&mut *conn)
        .await
        .map_err(Error::Database)?;

        attach_entries(&mut conn, rows).await
    }

    async fn get_visible(&self, user_id: Uuid, lens_id: Uuid) -> Result<Option<Lens>> {
        let lens = self.get(lens_id).await?;
        Ok(lens.filter(|l| l.is_system() || l.is_owned_by(user_id)))
    }

    async fn create(&self, user_id: Uuid, req: CreateLensRequest) -> Result<Lens> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        // Serializes concurrent creates by the same user for the quota check.
        sqlx::query("SELECT id FROM app_user WHERE id = $1 FOR UPDATE")
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(Error::Database)?
            .ok_or_else(|| Error::NotFound(format!("User {} not found", user_id)))?;

        let owned: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM lens WHERE owner_id = $1")
            .bind(user_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(Error::Database)?;
        check_lens_quota(owned as usize)?;

        let name = validate_name("name", &req.name)?;
        if name_taken(&mut tx, user_id, &name, None).await? {
            return Err(Error::DuplicateName(format!(
                "You already have a lens named '{}'",
                name
            )));
        }

        let entries = validate_entries(&req.entries)?;

        let lens_id = Uuid::now_v7();
        sqlx::query("INSERT INTO lens (id, name, owner_id) VALUES ($1, $2, $3)")
            .bind(lens_id)
            .bind(&name)
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;

        for entry in &entries {
            insert_entry(&mut tx, lens_id, entry).await?;
        }

        let lens = load_lens(&mut tx, lens_id)
            .await?
            .ok_or_else(|| Error::Internal(format!("Lens {} missing after insert", lens_id)))?;
        tx.commit().await.map_err(Error::Database)?;

        info!(
            subsystem = "db",
            component = "lenses",
            op = "create_lens",
            user_id = %user_id,
            lens_id = %lens_id,
            result_count = lens.entries.len(),
            "Lens created"
        );
        Ok(lens)
    }

    async fn update(&self, user_id: Uuid, lens_id: Uuid, req: UpdateLensRequest) -> Result<Lens> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let lens = lock_lens(&mut tx, lens_id).await?;
        ensure_mutable_by(&lens, user_id)?;

        if let Some(raw_name) = req.name.as_deref() {
            let name = validate_name("name", raw_name)?;
            if name != lens.name {
                if name_taken(&mut tx, user_id, &name, Some(lens_id)).await? {
                    return Err(Error::DuplicateName(format!(
                        "You already have a lens named '{}'",
                        name
                    )));
                }
                sqlx::query("UPDATE lens SET name = $1 WHERE id = $2")
                    .bind(&name)
                    .bind(lens_id)
                    .execute(&mut *tx)
                    .await
                    .map_err(map_db_error)?;
            }
        }

        if let Some(inputs) = req.entries.as_deref() {
            let entries = validate_entries(inputs)?;

            sqlx::query("DELETE FROM palette_entry WHERE lens_id = $1")
                .bind(lens_id)
                .execute(&mut *tx)
                .await
                .map_err(Error::Database)?;

            for entry in &entries {
                insert_entry(&mut tx, lens_id, entry).await?;
                refresh_name_cache(&mut tx, lens_id, &entry.key, &entry.display_name).await?;
            }

            let kept: HashSet<&str> = entries.iter().map(|e| e.key.as_str()).collect();
            for old in lens.entries.iter().filter(|e| !kept.contains(e.key.as_str())) {
                refresh_name_cache(&mut tx, lens_id, &old.key, &old.display_name).await?;
            }
        }

        let updated = load_lens(&mut tx, lens_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Lens {} not found", lens_id)))?;
        tx.commit().await.map_err(Error::Database)?;

        info!(
            subsystem = "db",
            component = "lenses",
            op = "update_lens",
            user_id = %user_id,
            lens_id = %lens_id,
            replaced_entries = req.entries.is_some(),
            "Lens updated"
        );
        Ok(updated)
    }

    async fn delete(&self, user_id: Uuid, lens_id: Uuid) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let lens = lock_lens(&mut tx, lens_id).await?;
        ensure_mutable_by(&lens, user_id)?;

        let in_use: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM document WHERE lens_id = $1")
            .bind(lens_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(Error::Database)?;
        if in_use > 0 {
            return Err(Error::InUse(format!(
                "Lens '{}' is used by {} document(s); assign them another lens first",
                lens.name, in_use
            )));
        }

        sqlx::query("DELETE FROM lens WHERE id = $1")
            .bind(lens_id)
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;
        tx.commit().await.map_err(Error::Database)?;

        info!(
            subsystem = "db",
            component = "lenses",
            op = "delete_lens",
            user_id = %user_id,
            lens_id = %lens_id,
            "Lens deleted"
        );
        Ok(())
    }

    async fn add_entry(
        &self,
        user_id: Uuid,
        lens_id: Uuid,
        req: AddPaletteEntryRequest,
    ) -> Result<PaletteEntry> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let lens = lock_lens(&mut tx, lens_id).await?;
        ensure_mutable_by(&lens, user_id)?;

        let key = validate_entry_key(&req.key)?;
        if lens.entry(&key).is_some() {
            return Err(Error::DuplicateKey(format!(
                "Colour key '{}' already exists in lens '{}'",
                key, lens.name
            )));
        }
        check_entry_capacity(lens.entries.len())?;

        let entry = new_entry(
            &key,
            req.display_name.as_deref(),
            &req.hex,
            lens.entries.len() as i32,
        )?;
        let created = insert_entry(&mut tx, lens_id, &entry).await?;
        refresh_name_cache(&mut tx, lens_id, &created.key, &created.display_name).await?;
        tx.commit().await.map_err(Error::Database)?;

        info!(
            subsystem = "db",
            component = "lenses",
            op = "add_entry",
            lens_id = %lens_id,
            entry_id = %created.id,
            color_key = %created.key,
            "Palette entry added"
        );
        Ok(created)
    }

    async fn update_entry(
        &self,
        user_id: Uuid,
        lens_id: Uuid,
        entry_id: Uuid,
        req: UpdatePaletteEntryRequest,
    ) -> Result<PaletteEntry> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let lens = lock_lens(&mut tx, lens_id).await?;
        ensure_mutable_by(&lens, user_id)?;

        let display_name = validate_name("display_name", &req.display_name)?;
        let row = sqlx::query(
            "UPDATE palette_entry SET display_name = $1
             WHERE id = $2 AND lens_id = $3
             RETURNING id, lens_id, key, display_name, hex, sort_order",
        )
        .bind(&display_name)
        .bind(entry_id)
        .bind(lens_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(Error::Database)?
        .ok_or_else(|| Error::NotFound(format!("Colour {} not found in lens", entry_id)))?;
        let entry = entry_from_row(&row);

        let refreshed = refresh_name_cache(&mut tx, lens_id, &entry.key, &entry.display_name).await?;
        tx.commit().await.map_err(Error::Database)?;

        debug!(
            subsystem = "db",
            component = "lenses",
            op = "update_entry",
            entry_id = %entry_id,
            highlights_refreshed = refreshed,
            "Palette entry renamed"
        );
        Ok(entry)
    }

    async fn remove_entry(&self, user_id: Uuid, lens_id: Uuid, entry_id: Uuid) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let lens = lock_lens(&mut tx, lens_id).await?;
        ensure_mutable_by(&lens, user_id)?;

        let row = sqlx::query(
            "DELETE FROM palette_entry WHERE id = $1 AND lens_id = $2
             RETURNING key, display_name",
        )
        .bind(entry_id)
        .bind(lens_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(Error::Database)?
        .ok_or_else(|| Error::NotFound(format!("Colour {} not found in lens", entry_id)))?;

        let key: String = row.get("key");
        let display_name: String = row.get("display_name");
        // Highlights keep the key; the cache remembers what it was called.
        let stale = refresh_name_cache(&mut tx, lens_id, &key, &display_name).await?;
        tx.commit().await.map_err(Error::Database)?;

        info!(
            subsystem = "db",
            component = "lenses",
            op = "remove_entry",
            lens_id = %lens_id,
            color_key = %key,
            stale_highlights = stale,
            "Palette entry removed"
        );
        Ok(())
    }

    async fn effective_lens(
        &self,
        lens_id: Option<Uuid>,
        cache: &mut LensCache,
    ) -> Result<Option<Lens>> {
        if let Some(hit) = cache.effective(lens_id) {
            return Ok(hit.cloned());
        }

        if let Some(id) = lens_id {
            if let Some(lens) = self.get(id).await? {
                cache.insert_explicit(lens.clone());
                return Ok(Some(lens));
            }
            warn!(
                subsystem = "db",
                component = "lenses",
                op = "effective_lens",
                lens_id = %id,
                "Assigned lens missing, falling back to default"
            );
            if let Some(hit) = cache.default_lens() {
                return Ok(hit.cloned());
            }
        }

        // Selected in Rust so "first by name" is byte order, not collation order.
        let system = self.list_system().await?;
        let default = select_default_lens(&system).cloned();
        debug!(
            subsystem = "db",
            component = "lenses",
            op = "effective_lens",
            default_lens = default.as_ref().map(|l| l.name.as_str()).unwrap_or("(none)"),
            "Resolved default lens"
        );
        cache.set_default(default.clone());
        Ok(default)
    }
}
