use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use shared::models::{AuthResponse, LoginRequest, PublicUser, RegisterRequest};
use std::sync::Arc;

use crate::error::ApiResult;
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
}

async fn register(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    let user = state.user_service.register(request).await?;
    let token = state.issue_token(user.id, &user.username)?;
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user: PublicUser::from(user),
            token,
        }),
    ))
}

async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let user = state
        .user_service
        .authenticate(&request.username, &request.password)
        .await?;
    let token = state.issue_token(user.id, &user.username)?;
    Ok(Json(AuthResponse {
        user: PublicUser::from(user),
        token,
    }))
}

async fn logout() -> Json<Value> {
    Json(json!({ "message": "Logged out" }))
}
