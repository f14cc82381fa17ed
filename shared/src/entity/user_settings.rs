//! `SeaORM` Entity, @generated manually

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "user_settings")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub user_id: i32,
    pub theme: String,
    pub default_asset: String,
    pub default_timeframe: String,
    pub default_platform: String,
    pub chart_type: String,
    pub show_trading_tips: bool,
    pub auto_refresh_data: bool,
    pub refresh_interval: i32,
    pub use_ai_for_signals: bool,
    pub use_custom_ai_key: bool,
    /// Stored encrypted, see `crypto::SecretBox`.
    #[sea_orm(column_type = "Text", nullable)]
    pub openai_api_key: Option<String>,
    pub enable_otc_trading: bool,
    pub allow_scheduled_signals: bool,
    pub respect_timeframes: bool,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Users,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
