use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use shared::entity::notifications;
use std::sync::Arc;

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/notifications", get(list))
        .route("/notifications/unread", get(unread))
        .route("/notifications/read-all", post(mark_all_read))
        .route("/notifications/:id/read", post(mark_read))
}

async fn list(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> ApiResult<Json<Vec<notifications::Model>>> {
    Ok(Json(state.notification_service.list(user.id).await?))
}

async fn unread(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> ApiResult<Json<Vec<notifications::Model>>> {
    Ok(Json(state.notification_service.unread(user.id).await?))
}

async fn mark_read(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<Json<notifications::Model>> {
    Ok(Json(state.notification_service.mark_read(id, user.id).await?))
}

async fn mark_all_read(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> ApiResult<Json<Value>> {
    let updated = state.notification_service.mark_all_read(user.id).await?;
    Ok(Json(json!({ "updated": updated })))
}
