use chrono::{TimeZone, Utc};
use std::sync::Arc;
use teloxide::prelude::*;

use super::send_html;
use crate::state::{AppState, HandlerResult};
use shared::i18n;

fn build_time() -> String {
    let raw = option_env!("BUILD_TIME").unwrap_or("unknown");
    raw.parse::<i64>()
        .ok()
        .and_then(|epoch| Utc.timestamp_opt(epoch, 0).single())
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| raw.to_string())
}

pub async fn handle_version(bot: Bot, msg: Message, state: Arc<AppState>) -> HandlerResult {
    let locale = state.language_for(msg.from.as_ref()).await.code();
    let text = i18n::translate(
        locale,
        "version_info",
        Some(&[
            ("version", env!("CARGO_PKG_VERSION")),
            ("hash", option_env!("GIT_HASH").unwrap_or("unknown")),
            ("built", &build_time()),
        ]),
    );
    send_html(&bot, msg.chat.id, text).await
}
