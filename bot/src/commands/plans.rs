use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, ParseMode};

use super::send_html;
use crate::state::{AppState, HandlerResult};
use shared::i18n;
use shared::telegram::{self, Plan, PLANS};

pub const PAY_CALLBACK_PREFIX: &str = "pay:";

fn pay_button(plan: &Plan, locale: &str) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(
        i18n::translate_plain(locale, "pay_button", Some(&[("stars", &plan.stars.to_string())])),
        format!("{}{}", PAY_CALLBACK_PREFIX, plan.code),
    )
}

pub async fn handle_plans(bot: Bot, msg: Message, state: Arc<AppState>) -> HandlerResult {
    let locale = state.language_for(msg.from.as_ref()).await.code();
    let buttons = PLANS
        .iter()
        .map(|plan| {
            vec![InlineKeyboardButton::callback(
                format!("{} · {} ⭐", plan.display_name(locale), plan.stars),
                format!("{}{}", PAY_CALLBACK_PREFIX, plan.code),
            )]
        })
        .collect::<Vec<_>>();

    bot.send_message(msg.chat.id, telegram::plans_overview(locale))
        .parse_mode(ParseMode::Html)
        .reply_markup(InlineKeyboardMarkup::new(buttons))
        .await?;
    Ok(())
}

pub async fn handle_plan(
    bot: Bot,
    msg: Message,
    state: Arc<AppState>,
    plan_code: &'static str,
) -> HandlerResult {
    let locale = state.language_for(msg.from.as_ref()).await.code();
    let Some(plan) = Plan::find(plan_code) else {
        let text = i18n::translate(locale, "plan_unknown", Some(&[("plan", plan_code)]));
        return send_html(&bot, msg.chat.id, text).await;
    };

    bot.send_message(msg.chat.id, telegram::plan_details(plan, locale))
        .parse_mode(ParseMode::Html)
        .reply_markup(InlineKeyboardMarkup::new(vec![vec![pay_button(plan, locale)]]))
        .await?;
    Ok(())
}
