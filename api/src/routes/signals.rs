use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use shared::entity::signals;
use shared::models::{FavoriteUpdate, NewSignal, NotesUpdate, ResultUpdate, StatusUpdate, UserSignalView};
use shared::signal_filter::SignalFilter;
use std::sync::Arc;

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/signals", get(active_signals).post(create_signal))
        .route("/signals/history", get(signal_history))
        .route("/signals/:id", get(get_signal))
        .route("/signals/:id/status", patch(update_status))
        .route("/signals/:id/result", patch(update_result))
        .route("/user/signals", get(user_signals))
        .route("/user/signals/favorites", get(favorite_signals))
        .route("/user/signals/:id/favorite", post(set_favorite))
        .route("/user/signals/:id/notes", put(set_notes))
}

#[derive(Debug, Deserialize)]
struct SignalQuery {
    asset: Option<String>,
    #[serde(rename = "type")]
    signal_type: Option<String>,
}

impl SignalQuery {
    fn filter(&self) -> shared::Result<SignalFilter> {
        SignalFilter::from_query(self.asset.as_deref(), self.signal_type.as_deref())
    }
}

async fn active_signals(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SignalQuery>,
) -> ApiResult<Json<Vec<signals::Model>>> {
    Ok(Json(state.signal_service.active_signals(&query.filter()?).await?))
}

async fn signal_history(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SignalQuery>,
) -> ApiResult<Json<Vec<signals::Model>>> {
    Ok(Json(state.signal_service.history(&query.filter()?).await?))
}

async fn get_signal(
    State(state): State<Arc<AppState>>,
    user: Option<AuthUser>,
    Path(id): Path<i32>,
) -> ApiResult<Json<signals::Model>> {
    let signal = state
        .signal_service
        .view_signal(id, user.map(|u| u.id))
        .await?;
    Ok(Json(signal))
}

async fn create_signal(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Json(new): Json<NewSignal>,
) -> ApiResult<(StatusCode, Json<signals::Model>)> {
    let signal = state.signal_service.create_signal(new).await?;
    Ok((StatusCode::CREATED, Json(signal)))
}

async fn update_status(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Path(id): Path<i32>,
    Json(update): Json<StatusUpdate>,
) -> ApiResult<Json<signals::Model>> {
    Ok(Json(state.signal_service.update_status(id, update.status).await?))
}

async fn update_result(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Path(id): Path<i32>,
    Json(update): Json<ResultUpdate>,
) -> ApiResult<Json<signals::Model>> {
    Ok(Json(state.signal_service.update_result(id, update.result).await?))
}

async fn user_signals(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> ApiResult<Json<Vec<UserSignalView>>> {
    Ok(Json(state.signal_service.user_signals(user.id, false).await?))
}

async fn favorite_signals(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> ApiResult<Json<Vec<UserSignalView>>> {
    Ok(Json(state.signal_service.user_signals(user.id, true).await?))
}

async fn set_favorite(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<i32>,
    body: Option<Json<FavoriteUpdate>>,
) -> ApiResult<Json<UserSignalView>> {
    let is_favorite = body.map(|Json(b)| b.is_favorite).unwrap_or(true);
    Ok(Json(
        state
            .signal_service
            .set_favorite(user.id, id, is_favorite)
            .await?,
    ))
}

async fn set_notes(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(update): Json<NotesUpdate>,
) -> ApiResult<Json<UserSignalView>> {
    Ok(Json(
        state
            .signal_service
            .set_notes(user.id, id, update.notes)
            .await?,
    ))
}
