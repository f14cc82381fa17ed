use chrono::Utc;
use sea_orm::prelude::*;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ActiveValue::Set, IntoActiveModel};
use std::sync::Arc;

use crate::entity::{user_notification_settings, user_settings};
use crate::error::{AppError, Result};
use crate::settings::{GeneralSettings, NotificationPreferences};

pub struct SettingsRepository {
    db: Arc<DatabaseConnection>,
}

impl SettingsRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn find_settings(&self, user_id: i32) -> Result<Option<user_settings::Model>> {
        let settings = user_settings::Entity::find()
            .filter(user_settings::Column::UserId.eq(user_id))
            .one(self.db.as_ref())
            .await?;
        Ok(settings)
    }

    /// Insert the default row unless one already exists, then return the stored row.
    /// Concurrent callers race on the unique `user_id` index; the loser inserts nothing.
    pub async fn ensure_settings(&self, user_id: i32) -> Result<(user_settings::Model, bool)> {
        if let Some(existing) = self.find_settings(user_id).await? {
            return Ok((existing, false));
        }

        let inserted = user_settings::Entity::insert(GeneralSettings::default().new_active_model(user_id))
            .on_conflict(
                OnConflict::column(user_settings::Column::UserId)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(self.db.as_ref())
            .await?;

        let settings = self
            .find_settings(user_id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("Settings for user {} vanished", user_id)))?;
        Ok((settings, inserted > 0))
    }

    pub async fn save_general(
        &self,
        current: user_settings::Model,
        general: &GeneralSettings,
    ) -> Result<user_settings::Model> {
        let mut active = current.into_active_model();
        general.apply(&mut active);
        active.updated_at = Set(Utc::now());
        Ok(active.update(self.db.as_ref()).await?)
    }

    pub async fn save_api_key(
        &self,
        current: user_settings::Model,
        sealed_key: Option<String>,
        use_custom_ai_key: bool,
        use_ai_for_signals: bool,
    ) -> Result<user_settings::Model> {
        let mut active = current.into_active_model();
        active.openai_api_key = Set(sealed_key);
        active.use_custom_ai_key = Set(use_custom_ai_key);
        active.use_ai_for_signals = Set(use_ai_for_signals);
        active.updated_at = Set(Utc::now());
        Ok(active.update(self.db.as_ref()).await?)
    }

    pub async fn find_notification_settings(
        &self,
        user_id: i32,
    ) -> Result<Option<user_notification_settings::Model>> {
        let settings = user_notification_settings::Entity::find()
            .filter(user_notification_settings::Column::UserId.eq(user_id))
            .one(self.db.as_ref())
            .await?;
        Ok(settings)
    }

    pub async fn ensure_notification_settings(
        &self,
        user_id: i32,
    ) -> Result<user_notification_settings::Model> {
        if let Some(existing) = self.find_notification_settings(user_id).await? {
            return Ok(existing);
        }

        user_notification_settings::Entity::insert(
            NotificationPreferences::default().new_active_model(user_id),
        )
        .on_conflict(
            OnConflict::column(user_notification_settings::Column::UserId)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(self.db.as_ref())
        .await?;

        self.find_notification_settings(user_id)
            .await?
            .ok_or_else(|| {
                AppError::Internal(format!("Notification settings for user {} vanished", user_id))
            })
    }

    pub async fn save_notifications(
        &self,
        current: user_notification_settings::Model,
        prefs: &NotificationPreferences,
    ) -> Result<user_notification_settings::Model> {
        let mut active = current.into_active_model();
        prefs.apply(&mut active);
        active.updated_at = Set(Utc::now());
        Ok(active.update(self.db.as_ref()).await?)
    }
}
