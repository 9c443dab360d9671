//! Bearer token resolution.
//!
//! Tokens are issued outside this service. Only the SHA-256 hex digest of a
//! token is stored, so a leaked `user_token` table cannot be replayed.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use sqlx::{Pool, Postgres};
use tracing::debug;
use uuid::Uuid;

use wisemark_core::{Error, IdentityResolver, Result};

/// SHA-256 hex digest of a raw bearer token.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Resolves tokens against the `user_token` table.
#[derive(Clone)]
pub struct PgIdentityResolver {
    pool: Pool<Postgres>,
}

impl PgIdentityResolver {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IdentityResolver for PgIdentityResolver {
    async fn resolve_token(&self, token: &str) -> Result<Option<Uuid>> {
        let token = token.trim();
        if token.is_empty() {
            return Ok(None);
        }

        let user_id: Option<Uuid> = sqlx::query_scalar(
            "SELECT user_id FROM user_token
             WHERE token_hash = $1 AND (expires_at IS NULL OR expires_at > now())",
        )
        .bind(hash_token(token))
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        if user_id.is_none() {
            debug!(subsystem = "db", component = "identity", "Unknown or expired token");
        }
        Ok(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_token_is_sha256_hex() {
        assert_eq!(
            hash_token("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(hash_token("secret").len(), 64);
    }
}
