use chrono::{DateTime, Utc};
use sea_orm::prelude::*;
use sea_orm::sea_query::OnConflict;
use sea_orm::ActiveValue::Set;
use std::sync::Arc;

use crate::entity::sea_orm_active_enums::SubscriptionTier;
use crate::entity::subscriptions;
use crate::error::{AppError, Result};

/// Fields written when a paid plan is activated.
#[derive(Debug, Clone)]
pub struct NewSubscription {
    pub user_id: i32,
    pub tier: SubscriptionTier,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub daily_signal_limit: i32,
    pub payment_method: Option<String>,
    pub transaction_id: Option<String>,
    pub amount: Option<i32>,
    pub currency: Option<String>,
}

pub struct SubscriptionRepository {
    db: Arc<DatabaseConnection>,
}

impl SubscriptionRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn find_by_user(&self, user_id: i32) -> Result<Option<subscriptions::Model>> {
        let sub = subscriptions::Entity::find()
            .filter(subscriptions::Column::UserId.eq(user_id))
            .one(self.db.as_ref())
            .await?;
        Ok(sub)
    }

    pub async fn find_active(&self, user_id: i32) -> Result<Option<subscriptions::Model>> {
        let sub = subscriptions::Entity::find()
            .filter(subscriptions::Column::UserId.eq(user_id))
            .filter(subscriptions::Column::IsActive.eq(true))
            .one(self.db.as_ref())
            .await?;
        Ok(sub)
    }

    pub async fn find_by_transaction_id(&self, transaction_id: &str) -> Result<Option<subscriptions::Model>> {
        let sub = subscriptions::Entity::find()
            .filter(subscriptions::Column::TransactionId.eq(transaction_id))
            .one(self.db.as_ref())
            .await?;
        Ok(sub)
    }

    /// Insert or overwrite the user's single subscription row.
    pub async fn upsert(&self, new: NewSubscription) -> Result<subscriptions::Model> {
        let now = Utc::now();
        let active = subscriptions::ActiveModel {
            user_id: Set(new.user_id),
            subscription_type: Set(new.tier),
            start_date: Set(new.start_date),
            end_date: Set(new.end_date),
            is_active: Set(true),
            daily_signal_limit: Set(new.daily_signal_limit),
            payment_method: Set(new.payment_method),
            transaction_id: Set(new.transaction_id),
            amount: Set(new.amount),
            currency: Set(new.currency),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        subscriptions::Entity::insert(active)
            .on_conflict(
                OnConflict::column(subscriptions::Column::UserId)
                    .update_columns([
                        subscriptions::Column::SubscriptionType,
                        subscriptions::Column::StartDate,
                        subscriptions::Column::EndDate,
                        subscriptions::Column::IsActive,
                        subscriptions::Column::DailySignalLimit,
                        subscriptions::Column::PaymentMethod,
                        subscriptions::Column::TransactionId,
                        subscriptions::Column::Amount,
                        subscriptions::Column::Currency,
                        subscriptions::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(self.db.as_ref())
            .await?;

        self.find_by_user(new.user_id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("Subscription for user {} vanished", new.user_id)))
    }
}
