use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use shared::entity::market_data;
use shared::models::MarketSnapshotRequest;
use shared::services::market_service::PairSummary;
use shared::services::MarketQuote;
use std::sync::Arc;

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::state::AppState;

// Assets such as `BTC/USD` contain a slash, hence the catch-all segment.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/market-data", get(list_pairs).post(save_snapshot))
        .route("/market-data/*asset", get(quote))
}

async fn list_pairs(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<PairSummary>>> {
    Ok(Json(state.market_service.list_pairs().await?))
}

async fn quote(
    State(state): State<Arc<AppState>>,
    Path(asset): Path<String>,
) -> ApiResult<Json<MarketQuote>> {
    Ok(Json(state.market_service.quote(&asset).await?))
}

async fn save_snapshot(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Json(request): Json<MarketSnapshotRequest>,
) -> ApiResult<(StatusCode, Json<market_data::Model>)> {
    let saved = state.market_service.save(request).await?;
    tracing::info!(asset = %saved.asset, price = %saved.price, "Stored market snapshot");
    Ok((StatusCode::CREATED, Json(saved)))
}
