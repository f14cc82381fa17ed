use chrono::Utc;
use sea_orm::prelude::DatabaseConnection;
use std::sync::Arc;

use crate::entity::sea_orm_active_enums::NotificationType;
use crate::entity::{subscriptions, users};
use crate::error::{AppError, Result};
use crate::i18n;
use crate::models::{MiniAppPaymentRequest, MiniAppPaymentResponse, PaymentStatus};
use crate::repositories::subscription_repository::NewSubscription;
use crate::repositories::{SubscriptionRepository, UserRepository};
use crate::services::NotificationService;
use crate::telegram::{self, Plan, PAYMENT_METHOD, STORED_CURRENCY};

pub struct PaymentService {
    subscriptions: SubscriptionRepository,
    users: UserRepository,
    notifications: NotificationService,
    bot_username: String,
}

/// Outcome of a successful Stars payment seen by the bot.
#[derive(Debug, Clone)]
pub struct Activation {
    pub user: users::Model,
    pub subscription: subscriptions::Model,
}

impl PaymentService {
    pub fn new(db: Arc<DatabaseConnection>, bot_username: String) -> Self {
        Self {
            subscriptions: SubscriptionRepository::new(db.clone()),
            users: UserRepository::new(db.clone()),
            notifications: NotificationService::new(db),
            bot_username,
        }
    }

    /// Validate the plan and hand back the bot deep link carrying the intent.
    pub fn start_mini_app_payment(&self, request: &MiniAppPaymentRequest) -> Result<MiniAppPaymentResponse> {
        let plan = Plan::get(&request.plan)?;
        let amount = request.amount.unwrap_or(plan.stars);
        let payment_id = {
            let mut rng = rand::thread_rng();
            telegram::payment_id(Utc::now(), &mut rng)
        };
        let redirect_url = telegram::deep_link(
            Some(&self.bot_username),
            plan.code,
            &amount.to_string(),
            request.user_id.as_deref(),
        );
        tracing::info!(plan = plan.code, %payment_id, "Started mini-app payment");
        Ok(MiniAppPaymentResponse {
            success: true,
            redirect_url,
            payment_id,
        })
    }

    /// Record a paid plan: upsert the user's subscription, mirror the tier on
    /// the user row and leave an account notification.
    pub async fn process_payment(
        &self,
        user_id: i32,
        plan_code: &str,
        payment_id: &str,
        stars_amount: u32,
    ) -> Result<subscriptions::Model> {
        let plan = Plan::get(plan_code)?;
        if payment_id.trim().is_empty() {
            return Err(AppError::InvalidInput("payment_id is required".to_string()));
        }
        let amount = i32::try_from(stars_amount)
            .map_err(|_| AppError::InvalidInput(format!("stars_amount {} is out of range", stars_amount)))?;
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;
        if stars_amount != plan.stars {
            tracing::warn!(
                user_id,
                plan = plan.code,
                paid = stars_amount,
                expected = plan.stars,
                "Stars amount differs from plan price"
            );
        }

        let now = Utc::now();
        let end = plan.expiry_from(now);
        let subscription = self
            .subscriptions
            .upsert(NewSubscription {
                user_id,
                tier: plan.tier,
                start_date: now,
                end_date: Some(end),
                daily_signal_limit: plan.daily_signal_limit,
                payment_method: Some(PAYMENT_METHOD.to_string()),
                transaction_id: Some(payment_id.to_string()),
                amount: Some(amount),
                currency: Some(STORED_CURRENCY.to_string()),
            })
            .await?;
        self.users.set_subscription(user_id, plan.tier, Some(end)).await?;

        let locale = user.language.code();
        let until = end.format("%Y-%m-%d").to_string();
        self.notifications
            .notify(
                user_id,
                NotificationType::Account,
                i18n::translate_plain(locale, "notification_subscription_title", None),
                i18n::translate_plain(
                    locale,
                    "notification_subscription_message",
                    Some(&[("tier", plan.tier.as_str()), ("until", &until)]),
                ),
                Some(subscription.id),
            )
            .await?;

        tracing::info!(user_id, plan = plan.code, %payment_id, "Activated subscription");
        Ok(subscription)
    }

    pub async fn payment_status(&self, payment_id: &str) -> Result<PaymentStatus> {
        let subscription = self.subscriptions.find_by_transaction_id(payment_id).await?;
        Ok(match subscription {
            Some(sub) => PaymentStatus {
                verified: sub.is_active,
                message: "Payment verified".to_string(),
                subscription: Some(sub),
            },
            None => PaymentStatus {
                verified: false,
                subscription: None,
                message: "Payment not found yet".to_string(),
            },
        })
    }

    pub async fn verify_payment(&self, user_id: i32, transaction_id: &str) -> Result<PaymentStatus> {
        let status = self.payment_status(transaction_id).await?;
        match &status.subscription {
            Some(sub) if sub.user_id != user_id => Ok(PaymentStatus {
                verified: false,
                subscription: None,
                message: "Payment belongs to another user".to_string(),
            }),
            _ => Ok(status),
        }
    }

    /// Activate a plan paid inside Telegram. The account is matched by
    /// `telegram_id`, else by the app user id carried in the start parameter
    /// (which then gets linked). `None` when no account matches.
    pub async fn activate_from_telegram(
        &self,
        telegram_user_id: i64,
        linked_user_id: Option<i32>,
        plan_code: &str,
        payment_id: &str,
        stars_amount: u32,
    ) -> Result<Option<Activation>> {
        let user = match self.users.find_by_telegram_id(telegram_user_id).await? {
            Some(user) => Some(user),
            None => match linked_user_id {
                Some(user_id) => match self.users.find_by_id(user_id).await? {
                    Some(_) => Some(self.users.link_telegram(user_id, telegram_user_id).await?),
                    None => None,
                },
                None => None,
            },
        };
        let Some(user) = user else {
            tracing::warn!(telegram_user_id, %payment_id, "Payment from unlinked Telegram account");
            return Ok(None);
        };

        let subscription = self
            .process_payment(user.id, plan_code, payment_id, stars_amount)
            .await?;
        let user = self
            .users
            .find_by_id(user.id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user.id)))?;
        Ok(Some(Activation { user, subscription }))
    }
}
