use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use shared::AppError;
use std::sync::Arc;

use crate::error::ApiError;
use crate::state::AppState;

/// Caller identified by a `Bearer` JWT. Use `Option<AuthUser>` for routes
/// that also serve anonymous callers.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: i32,
    pub username: String,
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .ok_or(AppError::Unauthorized)?;

        let claims = shared::auth::decode_jwt(token, &state.config.jwt_secret).map_err(|e| {
            tracing::debug!("JWT validation failed: {}", e);
            e
        })?;

        Ok(AuthUser {
            id: claims.user_id()?,
            username: claims.username,
        })
    }
}
