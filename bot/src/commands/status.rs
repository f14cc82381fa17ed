use std::sync::Arc;
use teloxide::prelude::*;

use super::send_html;
use crate::state::{AppState, HandlerResult};
use shared::entity::sea_orm_active_enums::SubscriptionTier;
use shared::i18n;

pub async fn handle_status(bot: Bot, msg: Message, state: Arc<AppState>) -> HandlerResult {
    let Some(user) = state.linked_user(msg.from.as_ref()).await else {
        let locale = state.language_for(msg.from.as_ref()).await.code();
        return send_html(&bot, msg.chat.id, i18n::translate(locale, "status_unlinked", None)).await;
    };
    let locale = user.language.code();

    let text = match (user.subscription_level, user.subscription_expiry) {
        (SubscriptionTier::Free, _) | (_, None) => i18n::translate(locale, "status_free", None),
        (tier, Some(expiry)) => i18n::translate(
            locale,
            "status_active",
            Some(&[
                ("tier", tier.as_str()),
                ("until", &expiry.format("%Y-%m-%d").to_string()),
            ]),
        ),
    };
    send_html(&bot, msg.chat.id, text).await
}
