use chrono::{DateTime, Utc};
use sea_orm::prelude::*;
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveValue::Set, IntoActiveModel, TransactionTrait};
use std::sync::Arc;

use crate::entity::sea_orm_active_enums::{Language, SubscriptionTier};
use crate::entity::{subscriptions, users};
use crate::error::{AppError, Result};
use crate::settings::{GeneralSettings, NotificationPreferences};

pub struct UserRepository {
    db: Arc<DatabaseConnection>,
}

impl UserRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, user_id: i32) -> Result<Option<users::Model>> {
        let user = users::Entity::find_by_id(user_id)
            .one(self.db.as_ref())
            .await?;
        Ok(user)
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<users::Model>> {
        let user = users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .one(self.db.as_ref())
            .await?;
        Ok(user)
    }

    pub async fn find_by_telegram_id(&self, telegram_id: i64) -> Result<Option<users::Model>> {
        let user = users::Entity::find()
            .filter(users::Column::TelegramId.eq(telegram_id))
            .one(self.db.as_ref())
            .await?;
        Ok(user)
    }

    /// Insert the user with default settings, notification preferences and a
    /// free subscription in a single transaction.
    pub async fn create_with_defaults(
        &self,
        active_model: users::ActiveModel,
        daily_signal_limit: i32,
    ) -> Result<users::Model> {
        let txn = self.db.begin().await?;

        let user = users::Entity::insert(active_model)
            .exec_with_returning(&txn)
            .await?;

        GeneralSettings::default()
            .new_active_model(user.id)
            .insert(&txn)
            .await?;
        NotificationPreferences::default()
            .new_active_model(user.id)
            .insert(&txn)
            .await?;

        let now = Utc::now();
        subscriptions::ActiveModel {
            user_id: Set(user.id),
            subscription_type: Set(SubscriptionTier::Free),
            start_date: Set(now),
            end_date: Set(None),
            is_active: Set(true),
            daily_signal_limit: Set(daily_signal_limit),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;
        Ok(user)
    }

    pub async fn update(&self, active_model: users::ActiveModel) -> Result<users::Model> {
        let user = active_model.update(self.db.as_ref()).await?;
        Ok(user)
    }

    async fn load_active(&self, user_id: i32) -> Result<users::ActiveModel> {
        self.find_by_id(user_id)
            .await?
            .map(IntoActiveModel::into_active_model)
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))
    }

    pub async fn update_profile(
        &self,
        user_id: i32,
        full_name: Option<String>,
        email: Option<String>,
    ) -> Result<users::Model> {
        let mut active = self.load_active(user_id).await?;
        if let Some(full_name) = full_name {
            active.full_name = Set(Some(full_name));
        }
        if let Some(email) = email {
            active.email = Set(Some(email));
        }
        self.update(active).await
    }

    pub async fn update_password(&self, user_id: i32, password_hash: String) -> Result<users::Model> {
        let mut active = self.load_active(user_id).await?;
        active.password = Set(password_hash);
        self.update(active).await
    }

    pub async fn update_language(&self, user_id: i32, language: Language) -> Result<users::Model> {
        let mut active = self.load_active(user_id).await?;
        active.language = Set(language);
        self.update(active).await
    }

    pub async fn touch_last_login(&self, user_id: i32) -> Result<()> {
        users::Entity::update_many()
            .col_expr(users::Column::LastLogin, Expr::value(Utc::now()))
            .filter(users::Column::Id.eq(user_id))
            .exec(self.db.as_ref())
            .await?;
        Ok(())
    }

    pub async fn set_subscription(
        &self,
        user_id: i32,
        tier: SubscriptionTier,
        expiry: Option<DateTime<Utc>>,
    ) -> Result<users::Model> {
        let mut active = self.load_active(user_id).await?;
        active.subscription_level = Set(tier);
        active.subscription_expiry = Set(expiry);
        self.update(active).await
    }

    pub async fn link_telegram(&self, user_id: i32, telegram_id: i64) -> Result<users::Model> {
        let mut active = self.load_active(user_id).await?;
        active.telegram_id = Set(Some(telegram_id));
        self.update(active).await
    }

    pub async fn list_all(&self) -> Result<Vec<users::Model>> {
        let users = users::Entity::find()
            .all(self.db.as_ref())
            .await?;
        Ok(users)
    }

    pub async fn count(&self) -> Result<u64> {
        let count = users::Entity::find()
            .count(self.db.as_ref())
            .await?;
        Ok(count)
    }
}
