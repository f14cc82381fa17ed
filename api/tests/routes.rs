use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::Utc;
use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase};
use serde_json::{json, Value};
use shared::config::{BackupConfig, PgConnectionInfo, TelegramConfig, DEFAULT_BOT_USERNAME};
use shared::entity::user_settings;
use shared::Config;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use api::{app, AppState};

const SECRET: &str = "test-secret";

fn config() -> Config {
    Config {
        database_url: "postgres://localhost/test".to_string(),
        api_host: "127.0.0.1".to_string(),
        api_port: 5000,
        jwt_secret: SECRET.to_string(),
        jwt_expiration_hours: 1,
        encryption_key: SECRET.to_string(),
        openai_api_key: None,
        telegram: TelegramConfig {
            bot_token: None,
            bot_username: DEFAULT_BOT_USERNAME.to_string(),
            webhook_url: None,
        },
        backup: BackupConfig {
            enabled: false,
            dir: "backups".to_string(),
            interval: Duration::from_secs(300),
            max_backups: 10,
            command_timeout: Duration::from_secs(600),
            pg_bin_dir: None,
            pg: PgConnectionInfo::default(),
            default_user_password: None,
        },
    }
}

fn router(db: DatabaseConnection) -> Router {
    app(Arc::new(AppState::new(Arc::new(db), config())))
}

fn empty_db() -> DatabaseConnection {
    MockDatabase::new(DatabaseBackend::Postgres).into_connection()
}

fn bearer() -> String {
    let token = shared::auth::encode_jwt(42, "trader", SECRET, 1).unwrap();
    format!("Bearer {}", token)
}

fn json_request(method: &str, uri: &str, body: Value, auth: Option<String>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_reports_ok() {
    let response = router(empty_db())
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "ok");
}

#[tokio::test]
async fn user_requires_token() {
    let response = router(empty_db())
        .oneshot(Request::builder().uri("/api/user").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["message"], "Unauthorized");
}

#[tokio::test]
async fn invalid_token_is_rejected() {
    let response = router(empty_db())
        .oneshot(
            Request::builder()
                .uri("/api/user/settings")
                .header(header::AUTHORIZATION, "Bearer not-a-jwt")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unsupported_language_is_bad_request() {
    let response = router(empty_db())
        .oneshot(json_request(
            "PATCH",
            "/api/user/language",
            json!({ "language": "fr" }),
            Some(bearer()),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn non_numeric_signal_id_is_bad_request() {
    let response = router(empty_db())
        .oneshot(Request::builder().uri("/api/signals/abc").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn generator_rejects_blank_fields() {
    let response = router(empty_db())
        .oneshot(json_request(
            "POST",
            "/api/signal-generator/generate",
            json!({ "platform": "Binance", "pair": "", "timeframe": "1h" }),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn mini_app_payment_returns_deep_link() {
    let response = router(empty_db())
        .oneshot(json_request(
            "POST",
            "/api/telegram-mini-app/process-mini-app",
            json!({ "planType": "weekly", "userId": "42" }),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(
        body["redirect_url"],
        "https://t.me/Payment_gateway_Binar_bot?start=pay_weekly_750_42"
    );
    assert!(body["payment_id"].as_str().unwrap().starts_with("tg_"));
}

#[tokio::test]
async fn mini_app_payment_rejects_unknown_plan() {
    let response = router(empty_db())
        .oneshot(json_request(
            "POST",
            "/api/telegram-mini-app/process-mini-app",
            json!({ "plan": "lifetime" }),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn webhook_acknowledges_without_bot() {
    let response = router(empty_db())
        .oneshot(json_request(
            "POST",
            "/api/telegram-bot/webhook",
            json!({ "update_id": 1, "message": { "chat": { "id": 5 }, "text": "/start" } }),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"OK");
}

#[tokio::test]
async fn settings_are_returned_without_api_key() {
    let now = Utc::now();
    let row = user_settings::Model {
        id: 1,
        user_id: 42,
        theme: "dark".to_string(),
        default_asset: "BTC/USDT".to_string(),
        default_timeframe: "1h".to_string(),
        default_platform: "Binance".to_string(),
        chart_type: "candlestick".to_string(),
        show_trading_tips: true,
        auto_refresh_data: true,
        refresh_interval: 60,
        use_ai_for_signals: true,
        use_custom_ai_key: true,
        openai_api_key: Some("sealed".to_string()),
        enable_otc_trading: false,
        allow_scheduled_signals: false,
        respect_timeframes: true,
        created_at: now,
        updated_at: now,
    };
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![row]])
        .into_connection();

    let response = router(db)
        .oneshot(
            Request::builder()
                .uri("/api/user/settings")
                .header(header::AUTHORIZATION, bearer())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["theme"], "dark");
    assert_eq!(body["has_custom_api_key"], true);
    assert!(body.get("openai_api_key").is_none());
}
