use sea_orm::prelude::DatabaseConnection;
use sea_orm::ActiveValue::Set;
use std::sync::Arc;

use crate::auth;
use crate::entity::sea_orm_active_enums::{Language, SubscriptionTier};
use crate::entity::users;
use crate::error::{AppError, Result};
use crate::i18n;
use crate::models::{LanguageResponse, PasswordChange, ProfileUpdate, RegisterRequest};
use crate::repositories::UserRepository;
use crate::services::FREE_DAILY_SIGNAL_LIMIT;

pub struct UserService {
    repo: UserRepository,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl UserService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            repo: UserRepository::new(db),
        }
    }

    pub async fn get_user(&self, user_id: i32) -> Result<users::Model> {
        self.repo
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))
    }

    pub async fn find_by_telegram_id(&self, telegram_id: i64) -> Result<Option<users::Model>> {
        self.repo.find_by_telegram_id(telegram_id).await
    }

    /// Create the account with its default settings, notification
    /// preferences and free subscription.
    pub async fn register(&self, request: RegisterRequest) -> Result<users::Model> {
        let username = request.username.trim().to_string();
        if username.is_empty() {
            return Err(AppError::InvalidInput("username is required".to_string()));
        }
        if self.repo.find_by_username(&username).await?.is_some() {
            return Err(AppError::Conflict("username_exists".to_string()));
        }
        let password = auth::hash_password(&request.password)?;

        let active = users::ActiveModel {
            username: Set(username.clone()),
            password: Set(password),
            email: Set(non_blank(request.email)),
            full_name: Set(non_blank(request.full_name)),
            subscription_level: Set(SubscriptionTier::Free),
            subscription_expiry: Set(None),
            language: Set(i18n::resolve_language(request.language.as_deref())),
            telegram_id: Set(None),
            created_at: Set(chrono::Utc::now()),
            last_login: Set(None),
            ..Default::default()
        };
        let user = self
            .repo
            .create_with_defaults(active, FREE_DAILY_SIGNAL_LIMIT)
            .await?;
        tracing::info!(user_id = user.id, username = %username, "Registered user");
        Ok(user)
    }

    pub async fn authenticate(&self, username: &str, password: &str) -> Result<users::Model> {
        let user = self
            .repo
            .find_by_username(username.trim())
            .await?
            .ok_or(AppError::Unauthorized)?;
        if !auth::verify_password(password, &user.password)? {
            tracing::warn!(username = %username, "Rejected login");
            return Err(AppError::Unauthorized);
        }
        self.repo.touch_last_login(user.id).await?;
        Ok(user)
    }

    pub async fn update_profile(&self, user_id: i32, update: ProfileUpdate) -> Result<users::Model> {
        self.repo
            .update_profile(user_id, non_blank(update.full_name), non_blank(update.email))
            .await
    }

    pub async fn change_password(&self, user_id: i32, change: PasswordChange) -> Result<()> {
        let user = self.get_user(user_id).await?;
        if !auth::verify_password(&change.current_password, &user.password)? {
            return Err(AppError::InvalidInput("current_password_incorrect".to_string()));
        }
        let hash = auth::hash_password(&change.new_password)?;
        self.repo.update_password(user_id, hash).await?;
        Ok(())
    }

    /// The stored locale and the returned direction come from the same value.
    pub async fn set_language(&self, user_id: i32, code: &str) -> Result<LanguageResponse> {
        let language = Language::parse(code)
            .ok_or_else(|| AppError::InvalidInput(format!("Unsupported language: {}", code)))?;
        let user = self.repo.update_language(user_id, language).await?;
        Ok(LanguageResponse {
            language: user.language,
            direction: user.language.direction(),
        })
    }

    pub async fn link_telegram(&self, user_id: i32, telegram_id: i64) -> Result<users::Model> {
        self.repo.link_telegram(user_id, telegram_id).await
    }

    pub async fn count_users(&self) -> Result<u64> {
        self.repo.count().await
    }
}
