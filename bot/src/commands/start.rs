use std::sync::Arc;
use teloxide::prelude::*;

use super::payment::send_plan_invoice;
use super::send_html;
use crate::state::{AppState, BotState, HandlerResult, MyDialogue};
use shared::i18n;
use shared::telegram::{parse_start_parameter, plan_details, Plan};

/// `/start` or `/start pay_<plan>_<amount>[_<user_id>]` from a web deep link.
pub async fn handle_start(
    bot: Bot,
    dialogue: MyDialogue,
    msg: Message,
    state: Arc<AppState>,
    param: String,
) -> HandlerResult {
    let locale = state.language_for(msg.from.as_ref()).await.code();
    let telegram_id = msg.from.as_ref().map(|f| f.id.0 as i64).unwrap_or(0);
    tracing::info!(telegram_id, param = %param, "Processing /start");

    let Some(intent) = parse_start_parameter(&param) else {
        dialogue.exit().await?;
        let text = i18n::translate(locale, "start_welcome", Some(&[("bot_name", &state.bot_name)]));
        return send_html(&bot, msg.chat.id, text).await;
    };

    let Some(plan) = Plan::find(&intent.plan) else {
        let text = i18n::translate(locale, "plan_unknown", Some(&[("plan", &intent.plan)]));
        return send_html(&bot, msg.chat.id, text).await;
    };

    if intent.amount.parse::<u32>().ok() != Some(plan.stars) {
        let text = i18n::translate(
            locale,
            "pay_amount_mismatch",
            Some(&[
                ("amount", &intent.amount),
                ("name", &plan.display_name(locale)),
                ("stars", &plan.stars.to_string()),
            ]),
        );
        send_html(&bot, msg.chat.id, text).await?;
    }

    let app_user_id = intent.user_id.as_deref().and_then(|id| id.parse::<i32>().ok());
    dialogue
        .update(BotState::AwaitingPayment {
            plan: plan.code.to_string(),
            app_user_id,
        })
        .await?;

    send_html(&bot, msg.chat.id, plan_details(plan, locale)).await?;
    send_plan_invoice(&bot, msg.chat.id, plan, telegram_id, locale).await
}
