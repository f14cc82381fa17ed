use chrono::Utc;
use sea_orm::prelude::*;
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveValue::Set, IntoActiveModel, QueryOrder};
use std::sync::Arc;

use crate::entity::notifications;
use crate::entity::sea_orm_active_enums::NotificationType;
use crate::error::{AppError, Result};

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: i32,
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub related_id: Option<i32>,
    pub link: Option<String>,
}

pub struct NotificationRepository {
    db: Arc<DatabaseConnection>,
}

impl NotificationRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn list(&self, user_id: i32, unread_only: bool) -> Result<Vec<notifications::Model>> {
        let mut query = notifications::Entity::find()
            .filter(notifications::Column::UserId.eq(user_id));
        if unread_only {
            query = query.filter(notifications::Column::IsRead.eq(false));
        }
        let rows = query
            .order_by_desc(notifications::Column::CreatedAt)
            .all(self.db.as_ref())
            .await?;
        Ok(rows)
    }

    pub async fn create(&self, new: NewNotification) -> Result<notifications::Model> {
        let active = notifications::ActiveModel {
            user_id: Set(new.user_id),
            notification_type: Set(new.notification_type),
            title: Set(new.title),
            message: Set(new.message),
            is_read: Set(false),
            related_id: Set(new.related_id),
            link: Set(new.link),
            created_at: Set(Utc::now()),
            ..Default::default()
        };
        Ok(notifications::Entity::insert(active)
            .exec_with_returning(self.db.as_ref())
            .await?)
    }

    /// Scoped to the owner so one user cannot flip another user's notifications.
    pub async fn mark_read(&self, id: i32, user_id: i32) -> Result<notifications::Model> {
        let notification = notifications::Entity::find_by_id(id)
            .filter(notifications::Column::UserId.eq(user_id))
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Notification {} not found", id)))?;

        let mut active = notification.into_active_model();
        active.is_read = Set(true);
        Ok(active.update(self.db.as_ref()).await?)
    }

    pub async fn mark_all_read(&self, user_id: i32) -> Result<u64> {
        let res = notifications::Entity::update_many()
            .col_expr(notifications::Column::IsRead, Expr::value(true))
            .filter(notifications::Column::UserId.eq(user_id))
            .filter(notifications::Column::IsRead.eq(false))
            .exec(self.db.as_ref())
            .await?;
        Ok(res.rows_affected)
    }
}
