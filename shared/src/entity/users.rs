//! `SeaORM` Entity, @generated manually

use super::sea_orm_active_enums::{Language, SubscriptionTier};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub username: String,
    /// Argon2 PHC string.
    pub password: String,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub subscription_level: SubscriptionTier,
    pub subscription_expiry: Option<DateTimeUtc>,
    pub language: Language,
    #[sea_orm(unique)]
    pub telegram_id: Option<i64>,
    pub created_at: DateTimeUtc,
    pub last_login: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_one = "super::user_settings::Entity")]
    UserSettings,
    #[sea_orm(has_one = "super::user_notification_settings::Entity")]
    UserNotificationSettings,
    #[sea_orm(has_one = "super::subscriptions::Entity")]
    Subscriptions,
    #[sea_orm(has_many = "super::user_signals::Entity")]
    UserSignals,
    #[sea_orm(has_many = "super::notifications::Entity")]
    Notifications,
}

impl Related<super::user_settings::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserSettings.def()
    }
}

impl Related<super::user_notification_settings::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserNotificationSettings.def()
    }
}

impl Related<super::subscriptions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Subscriptions.def()
    }
}

impl Related<super::user_signals::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserSignals.def()
    }
}

impl Related<super::notifications::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Notifications.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
