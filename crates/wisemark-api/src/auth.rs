//! Bearer token authentication.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use tracing::debug;
use uuid::Uuid;

use wisemark_core::{Error, IdentityResolver};

use crate::error::ApiError;
use crate::state::AppState;

/// Extractor that requires a valid bearer token and yields the caller's id.
///
/// ```ignore
/// async fn my_handler(RequireAuth { user_id }: RequireAuth) -> impl IntoResponse { ... }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RequireAuth {
    pub user_id: Uuid,
}

/// Token part of an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header_value: &str) -> Option<&str> {
    let (scheme, token) = header_value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

#[async_trait]
impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(bearer_token)
            .ok_or_else(|| Error::Unauthorized("Authentication required".to_string()))?;

        match state.db.identity.resolve_token(token).await? {
            Some(user_id) => Ok(RequireAuth { user_id }),
            None => {
                debug!(subsystem = "api", component = "auth", "Rejected unknown token");
                Err(Error::Unauthorized("Invalid or expired token".to_string()).into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token("Bearer abc123"), Some("abc123"));
        assert_eq!(bearer_token("bearer   abc123 "), Some("abc123"));
        assert_eq!(bearer_token("Basic dXNlcjpwYXNz"), None);
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("abc123"), None);
    }
}
