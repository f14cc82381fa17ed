use chrono::Utc;
use sea_orm::prelude::*;
use sea_orm::{ActiveValue::Set, IntoActiveModel, QueryOrder};
use std::sync::Arc;

use crate::entity::sea_orm_active_enums::{SignalResult, SignalStatus};
use crate::entity::signals;
use crate::error::{AppError, Result};
use crate::signal_filter::SignalFilter;

pub struct SignalRepository {
    db: Arc<DatabaseConnection>,
}

impl SignalRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Newest first. `status = None` returns the full history.
    pub async fn list(
        &self,
        status: Option<SignalStatus>,
        filter: &SignalFilter,
    ) -> Result<Vec<signals::Model>> {
        let mut query = signals::Entity::find().filter(filter.condition());
        if let Some(status) = status {
            query = query.filter(signals::Column::Status.eq(status));
        }
        let rows = query
            .order_by_desc(signals::Column::CreatedAt)
            .order_by_desc(signals::Column::Id)
            .all(self.db.as_ref())
            .await?;
        Ok(rows)
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<signals::Model>> {
        let signal = signals::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?;
        Ok(signal)
    }

    pub async fn create(&self, active_model: signals::ActiveModel) -> Result<signals::Model> {
        let signal = signals::Entity::insert(active_model)
            .exec_with_returning(self.db.as_ref())
            .await?;
        Ok(signal)
    }

    async fn load_active(&self, id: i32) -> Result<signals::ActiveModel> {
        self.find_by_id(id)
            .await?
            .map(IntoActiveModel::into_active_model)
            .ok_or_else(|| AppError::NotFound(format!("Signal {} not found", id)))
    }

    pub async fn update_status(&self, id: i32, status: SignalStatus) -> Result<signals::Model> {
        let mut active = self.load_active(id).await?;
        active.status = Set(status);
        if status == SignalStatus::Completed {
            active.completed_at = Set(Some(Utc::now()));
        }
        Ok(active.update(self.db.as_ref()).await?)
    }

    /// Recording a result always completes the signal.
    pub async fn update_result(&self, id: i32, result: SignalResult) -> Result<signals::Model> {
        let mut active = self.load_active(id).await?;
        active.status = Set(SignalStatus::Completed);
        active.result = Set(Some(result));
        active.completed_at = Set(Some(Utc::now()));
        Ok(active.update(self.db.as_ref()).await?)
    }

    pub async fn count(&self) -> Result<u64> {
        Ok(signals::Entity::find().count(self.db.as_ref()).await?)
    }
}
