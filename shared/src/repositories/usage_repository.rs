use chrono::NaiveDate;
use sea_orm::prelude::*;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::ActiveValue::Set;
use std::sync::Arc;

use crate::entity::user_signal_usage;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageKind {
    Generated,
    Viewed,
    Analyzed,
}

impl UsageKind {
    fn column(&self) -> user_signal_usage::Column {
        match self {
            UsageKind::Generated => user_signal_usage::Column::SignalsGenerated,
            UsageKind::Viewed => user_signal_usage::Column::SignalsViewed,
            UsageKind::Analyzed => user_signal_usage::Column::AnalysisRequested,
        }
    }
}

pub struct UsageRepository {
    db: Arc<DatabaseConnection>,
}

impl UsageRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn find(&self, user_id: i32, date: NaiveDate) -> Result<Option<user_signal_usage::Model>> {
        let usage = user_signal_usage::Entity::find()
            .filter(user_signal_usage::Column::UserId.eq(user_id))
            .filter(user_signal_usage::Column::Date.eq(date))
            .one(self.db.as_ref())
            .await?;
        Ok(usage)
    }

    /// Bump one counter of the (user, day) row, creating it on first use.
    pub async fn track(&self, user_id: i32, kind: UsageKind, date: NaiveDate) -> Result<()> {
        let column = kind.column();
        let mut active = user_signal_usage::ActiveModel {
            user_id: Set(user_id),
            date: Set(date),
            signals_generated: Set(0),
            signals_viewed: Set(0),
            analysis_requested: Set(0),
            ..Default::default()
        };
        active.set(column, 1.into());

        user_signal_usage::Entity::insert(active)
            .on_conflict(
                OnConflict::columns([
                    user_signal_usage::Column::UserId,
                    user_signal_usage::Column::Date,
                ])
                .value(column, Expr::col((user_signal_usage::Entity, column)).add(1))
                .to_owned(),
            )
            .exec_without_returning(self.db.as_ref())
            .await?;
        Ok(())
    }

    pub async fn generated_on(&self, user_id: i32, date: NaiveDate) -> Result<i32> {
        Ok(self
            .find(user_id, date)
            .await?
            .map(|u| u.signals_generated)
            .unwrap_or(0))
    }
}
