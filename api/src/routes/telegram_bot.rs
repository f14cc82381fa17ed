use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use shared::{i18n, telegram, AppError};
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::ParseMode;

use crate::error::ApiResult;
use crate::state::AppState;

const WEBHOOK_PATH: &str = "/api/telegram-bot/webhook";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/webhook", post(webhook))
        .route("/status", get(status))
        .route("/reset-webhook", post(reset_webhook))
}

/// Chat, text and sender language of an incoming text message.
#[derive(Debug, PartialEq)]
pub struct IncomingText {
    pub chat_id: i64,
    pub text: String,
    pub language_code: Option<String>,
}

impl IncomingText {
    pub fn from_update(update: &Value) -> Option<Self> {
        let message = update.get("message")?;
        Some(Self {
            chat_id: message.pointer("/chat/id")?.as_i64()?,
            text: message.get("text")?.as_str()?.to_string(),
            language_code: message
                .pointer("/from/language_code")
                .and_then(Value::as_str)
                .map(str::to_string),
        })
    }
}

fn bot(state: &AppState) -> shared::Result<&Bot> {
    state
        .bot
        .as_ref()
        .ok_or_else(|| AppError::InvalidInput("TELEGRAM_BOT_TOKEN is not configured".to_string()))
}

/// Acknowledges at once; the reply is sent from a background task.
async fn webhook(
    State(state): State<Arc<AppState>>,
    Json(update): Json<Value>,
) -> (StatusCode, &'static str) {
    let Some(incoming) = IncomingText::from_update(&update) else {
        return (StatusCode::OK, "OK");
    };
    let Some(bot) = state.bot.clone() else {
        tracing::warn!("Webhook update received but no bot token is configured");
        return (StatusCode::OK, "OK");
    };

    let language = i18n::language_from_telegram(incoming.language_code.as_deref());
    let reply = telegram::canned_reply(&incoming.text, language, &state.config.telegram.bot_username);
    tokio::spawn(async move {
        if let Err(e) = bot
            .send_message(ChatId(incoming.chat_id), reply)
            .parse_mode(ParseMode::Html)
            .await
        {
            tracing::error!(chat_id = incoming.chat_id, "Failed to answer webhook message: {}", e);
        }
    });
    (StatusCode::OK, "OK")
}

async fn status(State(state): State<Arc<AppState>>) -> ApiResult<Json<Value>> {
    let bot = bot(&state)?;
    let me = bot
        .get_me()
        .await
        .map_err(|e| AppError::Upstream(e.to_string()))?;
    let info = bot
        .get_webhook_info()
        .await
        .map_err(|e| AppError::Upstream(e.to_string()))?;

    Ok(Json(json!({
        "success": true,
        "bot": {
            "id": me.id.0,
            "username": me.username(),
            "first_name": me.first_name,
        },
        "webhook": {
            "url": info.url.map(|u| u.to_string()),
            "pending_update_count": info.pending_update_count,
            "last_error_message": info.last_error_message,
        },
    })))
}

#[derive(Debug, Default, Deserialize)]
struct ResetWebhook {
    #[serde(default, alias = "baseUrl")]
    base_url: Option<String>,
}

pub fn webhook_url(base_url: &str) -> shared::Result<url::Url> {
    let base = base_url.trim().trim_end_matches('/');
    let base = base.strip_suffix(WEBHOOK_PATH).unwrap_or(base);
    url::Url::parse(&format!("{}{}", base, WEBHOOK_PATH))
        .map_err(|e| AppError::InvalidInput(format!("Invalid webhook base URL: {}", e)))
}

async fn reset_webhook(
    State(state): State<Arc<AppState>>,
    body: Option<Json<ResetWebhook>>,
) -> ApiResult<Json<Value>> {
    let bot = bot(&state)?;
    let request = body.map(|Json(b)| b).unwrap_or_default();
    let base = request
        .base_url
        .filter(|b| !b.trim().is_empty())
        .or_else(|| state.config.telegram.webhook_url.clone())
        .ok_or_else(|| AppError::InvalidInput("base_url is required".to_string()))?;
    let url = webhook_url(&base)?;

    bot.delete_webhook()
        .await
        .map_err(|e| AppError::Upstream(e.to_string()))?;
    bot.set_webhook(url.clone())
        .await
        .map_err(|e| AppError::Upstream(e.to_string()))?;
    tracing::info!(url = %url, "Telegram webhook reset");

    Ok(Json(json!({ "success": true, "webhook_url": url.to_string() })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incoming_text_from_update() {
        let update = json!({
            "update_id": 1,
            "message": {
                "message_id": 5,
                "chat": { "id": 99, "type": "private" },
                "from": { "id": 7, "is_bot": false, "first_name": "A", "language_code": "en" },
                "text": "/plans"
            }
        });
        assert_eq!(
            IncomingText::from_update(&update),
            Some(IncomingText {
                chat_id: 99,
                text: "/plans".to_string(),
                language_code: Some("en".to_string()),
            })
        );
        assert_eq!(IncomingText::from_update(&json!({ "update_id": 2 })), None);
    }

    #[test]
    fn test_webhook_url_appends_path_once() {
        assert_eq!(
            webhook_url("https://example.com/").unwrap().as_str(),
            "https://example.com/api/telegram-bot/webhook"
        );
        assert_eq!(
            webhook_url("https://example.com/api/telegram-bot/webhook").unwrap().as_str(),
            "https://example.com/api/telegram-bot/webhook"
        );
        assert!(webhook_url("not a url").is_err());
    }
}
