use chrono::Utc;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::{LabeledPrice, PreCheckoutQuery, SuccessfulPayment};

use super::plans::PAY_CALLBACK_PREFIX;
use super::send_html;
use crate::state::{AppState, BotState, HandlerResult, MyDialogue};
use shared::i18n;
use shared::telegram::{self, InvoicePayload, Plan};

/// Send a Stars invoice whose payload is `<payment_id>_<plan>_<telegram_user_id>`.
pub async fn send_plan_invoice(
    bot: &Bot,
    chat_id: ChatId,
    plan: &Plan,
    telegram_user_id: i64,
    locale: &str,
) -> HandlerResult {
    let payment_id = {
        let mut rng = rand::thread_rng();
        telegram::payment_id(Utc::now(), &mut rng)
    };
    let payload = InvoicePayload {
        payment_id: payment_id.clone(),
        plan: plan.code.to_string(),
        telegram_user_id,
    };
    let name = plan.display_name(locale);
    let title = i18n::translate_plain(locale, "invoice_title", Some(&[("name", &name)]));
    let description = i18n::translate_plain(
        locale,
        "invoice_description",
        Some(&[("days", &plan.display_days().to_string())]),
    );

    bot.send_invoice(
        chat_id,
        title,
        description,
        payload.encode(),
        telegram::STARS_CURRENCY,
        vec![LabeledPrice::new(name, plan.stars)],
    )
    .await?;
    tracing::info!(telegram_user_id, plan = plan.code, %payment_id, "Sent Stars invoice");
    Ok(())
}

pub async fn handle_pay(bot: Bot, msg: Message, state: Arc<AppState>, plan: String) -> HandlerResult {
    let locale = state.language_for(msg.from.as_ref()).await.code();
    let plan = plan.trim();
    if plan.is_empty() {
        return send_html(&bot, msg.chat.id, i18n::translate(locale, "pay_usage", None)).await;
    }
    match Plan::find(plan) {
        Some(found) => {
            let telegram_id = msg.from.as_ref().map(|f| f.id.0 as i64).unwrap_or(0);
            send_plan_invoice(&bot, msg.chat.id, found, telegram_id, locale).await
        }
        None => {
            let text = i18n::translate(locale, "plan_unknown", Some(&[("plan", plan)]));
            send_html(&bot, msg.chat.id, text).await
        }
    }
}

pub async fn handle_pay_callback(
    bot: Bot,
    dialogue: MyDialogue,
    q: CallbackQuery,
    state: Arc<AppState>,
) -> HandlerResult {
    let plan = q
        .data
        .as_deref()
        .and_then(|d| d.strip_prefix(PAY_CALLBACK_PREFIX))
        .and_then(Plan::find);
    let locale = state.language_for(Some(&q.from)).await.code();
    let telegram_id = q.from.id.0 as i64;
    bot.answer_callback_query(q.id).await?;

    match plan {
        Some(plan) => send_plan_invoice(&bot, dialogue.chat_id(), plan, telegram_id, locale).await,
        None => Ok(()),
    }
}

/// Stars invoices have nothing to reserve, so every checkout is approved.
pub async fn handle_pre_checkout(bot: Bot, q: PreCheckoutQuery) -> HandlerResult {
    if InvoicePayload::parse(&q.invoice_payload).is_none() {
        tracing::warn!(payload = %q.invoice_payload, "Pre-checkout with unrecognised payload");
    }
    bot.answer_pre_checkout_query(q.id, true).await?;
    Ok(())
}

pub async fn handle_successful_payment(
    bot: Bot,
    dialogue: MyDialogue,
    msg: Message,
    payment: SuccessfulPayment,
    state: Arc<AppState>,
) -> HandlerResult {
    let locale = state.language_for(msg.from.as_ref()).await.code();
    let Some(payload) = InvoicePayload::parse(&payment.invoice_payload) else {
        tracing::error!(payload = %payment.invoice_payload, "Successful payment with unrecognised payload");
        let text = i18n::translate(locale, "payment_failed", Some(&[("payment_id", &payment.invoice_payload)]));
        return send_html(&bot, msg.chat.id, text).await;
    };

    let app_user_id = match dialogue.get().await? {
        Some(BotState::AwaitingPayment { app_user_id, .. }) => app_user_id,
        _ => None,
    };
    let telegram_id = msg
        .from
        .as_ref()
        .map(|f| f.id.0 as i64)
        .unwrap_or(payload.telegram_user_id);
    let stars = u32::try_from(payment.total_amount).unwrap_or_default();

    let result = state
        .payment_service
        .activate_from_telegram(telegram_id, app_user_id, &payload.plan, &payload.payment_id, stars)
        .await;
    dialogue.exit().await?;

    let text = match result {
        Ok(Some(activation)) => {
            let until = activation
                .subscription
                .end_date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default();
            i18n::translate(
                activation.user.language.code(),
                "payment_success",
                Some(&[
                    ("tier", activation.subscription.subscription_type.as_str()),
                    ("until", &until),
                ]),
            )
        }
        Ok(None) => i18n::translate(
            locale,
            "payment_account_missing",
            Some(&[
                ("stars", &stars.to_string()),
                ("payment_id", &payload.payment_id),
            ]),
        ),
        Err(e) => {
            tracing::error!(payment_id = %payload.payment_id, "Failed to activate subscription: {}", e);
            i18n::translate(locale, "payment_failed", Some(&[("payment_id", &payload.payment_id)]))
        }
    };
    send_html(&bot, msg.chat.id, text).await
}
