use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

mod auth;
mod market;
mod mini_app;
mod notifications;
mod settings;
mod signal_generator;
mod signals;
mod telegram_bot;
mod user;

pub fn app(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .merge(auth::routes())
        .merge(user::routes())
        .merge(settings::routes())
        .merge(signals::routes())
        .merge(notifications::routes())
        .merge(market::routes())
        .nest("/signal-generator", signal_generator::routes())
        .nest("/telegram-mini-app", mini_app::routes())
        .nest("/telegram-bot", telegram_bot::routes());

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "git_hash": env!("GIT_HASH"),
    }))
}
