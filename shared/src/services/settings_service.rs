use chrono::Utc;
use sea_orm::prelude::DatabaseConnection;
use serde_json::Value;
use std::sync::Arc;

use crate::crypto::SecretBox;
use crate::error::Result;
use crate::models::{AllSettings, PublicUser, SettingsSaved};
use crate::repositories::{SettingsRepository, UserRepository};
use crate::settings::{ApiKeySettings, GeneralSettings, NotificationPreferences, UserSettingsView};

pub struct SettingsService {
    repo: SettingsRepository,
    users: UserRepository,
    secrets: SecretBox,
    default_openai_key: Option<String>,
}

impl SettingsService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        secrets: SecretBox,
        default_openai_key: Option<String>,
    ) -> Self {
        Self {
            repo: SettingsRepository::new(db.clone()),
            users: UserRepository::new(db),
            secrets,
            default_openai_key,
        }
    }

    /// Stored settings, creating the default row on first access.
    pub async fn get_settings(&self, user_id: i32) -> Result<UserSettingsView> {
        let (settings, created) = self.repo.ensure_settings(user_id).await?;
        if created {
            tracing::info!(user_id, "Created default settings");
        }
        Ok(UserSettingsView::from_model(&settings))
    }

    /// Merge a partial or full settings object over the stored row.
    /// API-key fields are ignored here.
    pub async fn save_general(&self, user_id: i32, incoming: &Value) -> Result<SettingsSaved> {
        let (current, _) = self.repo.ensure_settings(user_id).await?;
        let merged = GeneralSettings::from_model(&current).merged_with(incoming);
        let saved = self.repo.save_general(current, &merged).await?;
        tracing::debug!(user_id, "Saved general settings");
        Ok(SettingsSaved {
            settings: UserSettingsView::from_model(&saved),
            server_time: Utc::now(),
        })
    }

    /// A missing key with `use_custom_ai_key` keeps the stored one; turning
    /// the custom key off clears it.
    pub async fn save_api_key(&self, user_id: i32, request: ApiKeySettings) -> Result<SettingsSaved> {
        let (current, _) = self.repo.ensure_settings(user_id).await?;
        let sealed = if request.use_custom_ai_key {
            match request.openai_api_key.as_deref().map(str::trim) {
                Some(key) if !key.is_empty() => Some(self.secrets.seal(key)?),
                _ => current.openai_api_key.clone(),
            }
        } else {
            None
        };
        let saved = self
            .repo
            .save_api_key(current, sealed, request.use_custom_ai_key, request.use_ai_for_signals)
            .await?;
        tracing::info!(user_id, use_custom = request.use_custom_ai_key, "Updated AI key settings");
        Ok(SettingsSaved {
            settings: UserSettingsView::from_model(&saved),
            server_time: Utc::now(),
        })
    }

    pub async fn get_notifications(&self, user_id: i32) -> Result<NotificationPreferences> {
        let prefs = self.repo.ensure_notification_settings(user_id).await?;
        Ok(NotificationPreferences::from_model(&prefs))
    }

    pub async fn save_notifications(
        &self,
        user_id: i32,
        incoming: &Value,
    ) -> Result<NotificationPreferences> {
        let current = self.repo.ensure_notification_settings(user_id).await?;
        let merged = NotificationPreferences::from_model(&current).merged_with(incoming);
        let saved = self.repo.save_notifications(current, &merged).await?;
        Ok(NotificationPreferences::from_model(&saved))
    }

    pub async fn all_settings(&self, user_id: i32) -> Result<AllSettings> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| crate::error::AppError::NotFound(format!("User {} not found", user_id)))?;
        Ok(AllSettings {
            general: self.get_settings(user_id).await?,
            notifications: self.get_notifications(user_id).await?,
            user: PublicUser::from(user),
        })
    }

    /// Key to use for AI generation, or `None` when the user turned AI off or
    /// no key is available.
    pub async fn resolve_openai_key(&self, user_id: Option<i32>) -> Result<Option<String>> {
        let Some(user_id) = user_id else {
            return Ok(self.default_openai_key.clone());
        };
        let Some(settings) = self.repo.find_settings(user_id).await? else {
            return Ok(self.default_openai_key.clone());
        };
        if !settings.use_ai_for_signals {
            return Ok(None);
        }
        if settings.use_custom_ai_key {
            if let Some(sealed) = settings.openai_api_key.as_deref().filter(|k| !k.is_empty()) {
                match self.secrets.open(sealed) {
                    Ok(key) => return Ok(Some(key)),
                    Err(e) => tracing::warn!(user_id, "Could not decrypt custom AI key: {}", e),
                }
            }
        }
        Ok(self.default_openai_key.clone())
    }
}
