use axum::extract::State;
use axum::routing::{get, patch};
use axum::{Json, Router};
use serde_json::{json, Value};
use shared::models::{LanguageChange, LanguageResponse, PasswordChange, ProfileUpdate, PublicUser};
use shared::AppError;
use std::sync::Arc;

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/user", get(current_user))
        .route("/user/profile", patch(update_profile))
        .route("/user/password", patch(change_password))
        .route("/user/language", patch(change_language))
}

async fn current_user(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> ApiResult<Json<PublicUser>> {
    let user = state.user_service.get_user(user.id).await?;
    Ok(Json(PublicUser::from(user)))
}

pub(super) async fn update_profile(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(update): Json<ProfileUpdate>,
) -> ApiResult<Json<PublicUser>> {
    let user = state.user_service.update_profile(user.id, update).await?;
    Ok(Json(PublicUser::from(user)))
}

async fn change_password(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(change): Json<PasswordChange>,
) -> ApiResult<Json<Value>> {
    if change.new_password.len() < shared::auth::MIN_PASSWORD_LEN {
        return Err(AppError::InvalidInput(format!(
            "Password must be at least {} characters",
            shared::auth::MIN_PASSWORD_LEN
        ))
        .into());
    }
    state.user_service.change_password(user.id, change).await?;
    Ok(Json(json!({ "message": "Password updated" })))
}

async fn change_language(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(change): Json<LanguageChange>,
) -> ApiResult<Json<LanguageResponse>> {
    let response = state
        .user_service
        .set_language(user.id, &change.language)
        .await?;
    tracing::info!(user_id = user.id, language = response.language.code(), "Language changed");
    Ok(Json(response))
}
