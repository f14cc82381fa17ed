use axum::extract::State;
use axum::routing::{get, put};
use axum::{Json, Router};
use serde_json::Value;
use shared::models::{AllSettings, SettingsSaved};
use shared::settings::{ApiKeySettings, NotificationPreferences, UserSettingsView};
use std::sync::Arc;

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/user/settings",
            get(get_settings).patch(save_settings).put(save_settings),
        )
        .route("/user/settings/api", put(save_api_key).patch(save_api_key))
        .route(
            "/user/notifications",
            get(get_notifications).patch(save_notifications),
        )
        .route("/settings", get(all_settings))
        .route("/settings/general", put(save_settings))
        .route("/settings/notifications", put(save_notifications))
        .route("/settings/profile", put(super::user::update_profile))
        .route("/settings/api", put(save_api_key))
}

async fn get_settings(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> ApiResult<Json<UserSettingsView>> {
    Ok(Json(state.settings_service.get_settings(user.id).await?))
}

async fn save_settings(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(incoming): Json<Value>,
) -> ApiResult<Json<SettingsSaved>> {
    Ok(Json(state.settings_service.save_general(user.id, &incoming).await?))
}

async fn save_api_key(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(request): Json<ApiKeySettings>,
) -> ApiResult<Json<SettingsSaved>> {
    Ok(Json(state.settings_service.save_api_key(user.id, request).await?))
}

async fn get_notifications(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> ApiResult<Json<NotificationPreferences>> {
    Ok(Json(state.settings_service.get_notifications(user.id).await?))
}

async fn save_notifications(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(incoming): Json<Value>,
) -> ApiResult<Json<NotificationPreferences>> {
    Ok(Json(
        state
            .settings_service
            .save_notifications(user.id, &incoming)
            .await?,
    ))
}

async fn all_settings(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> ApiResult<Json<AllSettings>> {
    Ok(Json(state.settings_service.all_settings(user.id).await?))
}
