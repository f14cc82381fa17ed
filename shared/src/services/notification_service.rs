use sea_orm::prelude::DatabaseConnection;
use std::sync::Arc;

use crate::entity::notifications;
use crate::entity::sea_orm_active_enums::NotificationType;
use crate::error::Result;
use crate::repositories::notification_repository::NewNotification;
use crate::repositories::NotificationRepository;

pub struct NotificationService {
    repo: NotificationRepository,
}

impl NotificationService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            repo: NotificationRepository::new(db),
        }
    }

    pub async fn list(&self, user_id: i32) -> Result<Vec<notifications::Model>> {
        self.repo.list(user_id, false).await
    }

    pub async fn unread(&self, user_id: i32) -> Result<Vec<notifications::Model>> {
        self.repo.list(user_id, true).await
    }

    pub async fn notify(
        &self,
        user_id: i32,
        notification_type: NotificationType,
        title: String,
        message: String,
        related_id: Option<i32>,
    ) -> Result<notifications::Model> {
        self.repo
            .create(NewNotification {
                user_id,
                notification_type,
                title,
                message,
                related_id,
                link: None,
            })
            .await
    }

    /// Only the owner may mark a notification; anything else is `NotFound`.
    pub async fn mark_read(&self, id: i32, user_id: i32) -> Result<notifications::Model> {
        self.repo.mark_read(id, user_id).await
    }

    pub async fn mark_all_read(&self, user_id: i32) -> Result<u64> {
        let updated = self.repo.mark_all_read(user_id).await?;
        tracing::debug!(user_id, updated, "Marked notifications read");
        Ok(updated)
    }
}
