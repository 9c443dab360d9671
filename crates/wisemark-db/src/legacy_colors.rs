//! Legacy colour list repository.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};
use wisemark_core::{Error, LegacyColor, LegacyColorRepository, Result};

/// PostgreSQL implementation of LegacyColorRepository.
#[derive(Clone)]
pub struct PgLegacyColorRepository {
    pool: Pool<Postgres>,
}

impl PgLegacyColorRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LegacyColorRepository for PgLegacyColorRepository {
    async fn list(&self) -> Result<Vec<LegacyColor>> {
        let rows = sqlx::query(
            "SELECT key, display_name, hex, sort_order FROM legacy_color ORDER BY sort_order, key",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows
            .iter()
            .map(|r| LegacyColor {
                key: r.get("key"),
                display_name: r.get("display_name"),
                hex: r.get("hex"),
                sort_order: r.get("sort_order"),
            })
            .collect())
    }
}
