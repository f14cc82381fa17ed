//! `SeaORM` Entity, @generated manually

use super::sea_orm_active_enums::{SignalResult, SignalStatus, SignalType};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "signals")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub asset: String,
    #[sea_orm(column_name = "type")]
    #[serde(rename = "type")]
    pub signal_type: SignalType,
    #[sea_orm(column_type = "Decimal(Some((20, 8)))")]
    pub entry_price: Decimal,
    #[sea_orm(column_type = "Decimal(Some((20, 8)))")]
    pub target_price: Decimal,
    #[sea_orm(column_type = "Decimal(Some((20, 8)))")]
    pub stop_loss: Decimal,
    pub accuracy: i32,
    /// Wall-clock `HH:MM` the signal targets.
    pub time: String,
    pub status: SignalStatus,
    /// JSON array of indicator names.
    #[sea_orm(column_type = "JsonBinary")]
    pub indicators: Json,
    pub platform: Option<String>,
    pub timeframe: Option<String>,
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub analysis: Option<Json>,
    pub created_at: DateTimeUtc,
    pub completed_at: Option<DateTimeUtc>,
    pub result: Option<SignalResult>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::user_signals::Entity")]
    UserSignals,
}

impl Related<super::user_signals::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserSignals.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn indicator_names(&self) -> Vec<String> {
        self.indicators
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}
