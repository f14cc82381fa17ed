use chrono::Utc;
use sea_orm::prelude::*;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ActiveValue::Set, QueryOrder};
use std::sync::Arc;

use crate::entity::{signals, user_signals};
use crate::error::{AppError, Result};

pub struct UserSignalRepository {
    db: Arc<DatabaseConnection>,
}

fn new_link(user_id: i32, signal_id: i32) -> user_signals::ActiveModel {
    user_signals::ActiveModel {
        user_id: Set(user_id),
        signal_id: Set(signal_id),
        is_favorite: Set(false),
        is_taken: Set(false),
        notes: Set(None),
        result: Set(None),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
}

impl UserSignalRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn list_for_user(
        &self,
        user_id: i32,
        favorites_only: bool,
    ) -> Result<Vec<(user_signals::Model, signals::Model)>> {
        let mut query = user_signals::Entity::find()
            .find_also_related(signals::Entity)
            .filter(user_signals::Column::UserId.eq(user_id));
        if favorites_only {
            query = query.filter(user_signals::Column::IsFavorite.eq(true));
        }
        let rows = query
            .order_by_desc(user_signals::Column::CreatedAt)
            .all(self.db.as_ref())
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(link, signal)| signal.map(|s| (link, s)))
            .collect())
    }

    pub async fn find(&self, user_id: i32, signal_id: i32) -> Result<Option<user_signals::Model>> {
        let link = user_signals::Entity::find()
            .filter(user_signals::Column::UserId.eq(user_id))
            .filter(user_signals::Column::SignalId.eq(signal_id))
            .one(self.db.as_ref())
            .await?;
        Ok(link)
    }

    async fn upsert(
        &self,
        user_id: i32,
        signal_id: i32,
        active: user_signals::ActiveModel,
        on_conflict: OnConflict,
    ) -> Result<user_signals::Model> {
        user_signals::Entity::insert(active)
            .on_conflict(on_conflict)
            .exec_without_returning(self.db.as_ref())
            .await?;

        self.find(user_id, signal_id).await?.ok_or_else(|| {
            AppError::Internal(format!("User signal {}/{} vanished", user_id, signal_id))
        })
    }

    /// Idempotent: an existing link is returned untouched.
    pub async fn add(&self, user_id: i32, signal_id: i32) -> Result<user_signals::Model> {
        self.upsert(
            user_id,
            signal_id,
            new_link(user_id, signal_id),
            OnConflict::columns([user_signals::Column::UserId, user_signals::Column::SignalId])
                .do_nothing()
                .to_owned(),
        )
        .await
    }

    pub async fn set_favorite(&self, user_id: i32, signal_id: i32, is_favorite: bool) -> Result<user_signals::Model> {
        let mut active = new_link(user_id, signal_id);
        active.is_favorite = Set(is_favorite);
        self.upsert(
            user_id,
            signal_id,
            active,
            OnConflict::columns([user_signals::Column::UserId, user_signals::Column::SignalId])
                .update_column(user_signals::Column::IsFavorite)
                .to_owned(),
        )
        .await
    }

    pub async fn set_notes(&self, user_id: i32, signal_id: i32, notes: String) -> Result<user_signals::Model> {
        let mut active = new_link(user_id, signal_id);
        active.notes = Set(Some(notes));
        self.upsert(
            user_id,
            signal_id,
            active,
            OnConflict::columns([user_signals::Column::UserId, user_signals::Column::SignalId])
                .update_column(user_signals::Column::Notes)
                .to_owned(),
        )
        .await
    }
}
