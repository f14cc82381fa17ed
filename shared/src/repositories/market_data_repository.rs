use sea_orm::prelude::*;
use sea_orm::QueryOrder;
use std::sync::Arc;

use crate::entity::market_data;
use crate::error::Result;

pub struct MarketDataRepository {
    db: Arc<DatabaseConnection>,
}

impl MarketDataRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn latest(&self, asset: &str) -> Result<Option<market_data::Model>> {
        let row = market_data::Entity::find()
            .filter(market_data::Column::Asset.eq(asset))
            .order_by_desc(market_data::Column::Timestamp)
            .one(self.db.as_ref())
            .await?;
        Ok(row)
    }

    pub async fn save(&self, active_model: market_data::ActiveModel) -> Result<market_data::Model> {
        Ok(market_data::Entity::insert(active_model)
            .exec_with_returning(self.db.as_ref())
            .await?)
    }
}
