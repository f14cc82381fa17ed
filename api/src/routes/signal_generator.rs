use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use shared::entity::sea_orm_active_enums::Language;
use shared::entity::signals;
use shared::models::TrendRequest;
use shared::signal_generator::{GenerateRequest, TrendAnalysis};
use std::sync::Arc;

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/generate", post(generate))
        .route("/analyze-trend", post(analyze_trend))
}

/// Reply language and AI key for the caller.
async fn caller_context(
    state: &AppState,
    user: Option<&AuthUser>,
) -> shared::Result<(Language, Option<String>)> {
    let user_id = user.map(|u| u.id);
    let language = match user_id {
        Some(id) => state.user_service.get_user(id).await?.language,
        None => Language::default(),
    };
    let key = state.settings_service.resolve_openai_key(user_id).await?;
    Ok((language, key))
}

async fn generate(
    State(state): State<Arc<AppState>>,
    user: Option<AuthUser>,
    Json(request): Json<GenerateRequest>,
) -> ApiResult<(StatusCode, Json<signals::Model>)> {
    request.validate()?;
    let (language, key) = caller_context(&state, user.as_ref()).await?;
    let signal = state
        .signal_service
        .generate(request, user.map(|u| u.id), language, key)
        .await?;
    Ok((StatusCode::CREATED, Json(signal)))
}

async fn analyze_trend(
    State(state): State<Arc<AppState>>,
    user: Option<AuthUser>,
    Json(request): Json<TrendRequest>,
) -> ApiResult<Json<TrendAnalysis>> {
    let (language, key) = caller_context(&state, user.as_ref()).await?;
    let analysis = state
        .signal_service
        .analyze_trend(&request.pair, user.map(|u| u.id), language, key)
        .await?;
    Ok(Json(analysis))
}
