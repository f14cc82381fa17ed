use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use shared::models::{
    InitDataRequest, MiniAppPaymentRequest, MiniAppPaymentResponse, PaymentStatus,
    ProcessPaymentRequest, PublicUser, VerifyPaymentRequest,
};
use shared::telegram;
use std::sync::Arc;

use crate::error::ApiResult;
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/process-mini-app", post(process_mini_app))
        .route("/payment-status/:payment_id", get(payment_status))
        .route("/process-payment", post(process_payment))
        .route("/verify-payment", post(verify_payment))
        .route("/user-data", post(user_data))
}

async fn process_mini_app(
    State(state): State<Arc<AppState>>,
    Json(request): Json<MiniAppPaymentRequest>,
) -> ApiResult<Json<MiniAppPaymentResponse>> {
    Ok(Json(state.payment_service.start_mini_app_payment(&request)?))
}

async fn payment_status(
    State(state): State<Arc<AppState>>,
    Path(payment_id): Path<String>,
) -> ApiResult<Json<PaymentStatus>> {
    Ok(Json(state.payment_service.payment_status(&payment_id).await?))
}

async fn process_payment(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ProcessPaymentRequest>,
) -> ApiResult<Json<Value>> {
    let subscription = state
        .payment_service
        .process_payment(
            request.user_id,
            &request.plan_type,
            &request.payment_id,
            request.stars_amount,
        )
        .await?;
    Ok(Json(json!({
        "success": true,
        "subscription": subscription,
    })))
}

async fn verify_payment(
    State(state): State<Arc<AppState>>,
    Json(request): Json<VerifyPaymentRequest>,
) -> ApiResult<Json<PaymentStatus>> {
    Ok(Json(
        state
            .payment_service
            .verify_payment(request.user_id, &request.transaction_id)
            .await?,
    ))
}

/// Verified `initData` plus the account linked to that Telegram user, if any.
async fn user_data(
    State(state): State<Arc<AppState>>,
    Json(request): Json<InitDataRequest>,
) -> ApiResult<Json<Value>> {
    let init_data = telegram::verify_init_data(
        &request.init_data,
        state.config.telegram.bot_token.as_deref(),
    )?;
    let account = match &init_data.user {
        Some(tg_user) => state
            .user_service
            .find_by_telegram_id(tg_user.id)
            .await?
            .map(PublicUser::from),
        None => None,
    };
    Ok(Json(json!({
        "success": true,
        "telegram": init_data,
        "user": account,
    })))
}
