use sea_orm_migration::prelude::*;

use crate::m20240101_000001_create_users::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // One settings row per user, enforced by the unique user_id
        manager
            .create_table(
                Table::create()
                    .table(UserSettings::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(UserSettings::Id).integer().not_null().auto_increment().primary_key())
                    .col(ColumnDef::new(UserSettings::UserId).integer().not_null().unique_key())
                    .col(ColumnDef::new(UserSettings::Theme).text().not_null().default("dark"))
                    .col(ColumnDef::new(UserSettings::DefaultAsset).text().not_null().default("BTC/USDT"))
                    .col(ColumnDef::new(UserSettings::DefaultTimeframe).text().not_null().default("1h"))
                    .col(ColumnDef::new(UserSettings::DefaultPlatform).text().not_null().default(""))
                    .col(ColumnDef::new(UserSettings::ChartType).text().not_null().default("candlestick"))
                    .col(ColumnDef::new(UserSettings::ShowTradingTips).boolean().not_null().default(true))
                    .col(ColumnDef::new(UserSettings::AutoRefreshData).boolean().not_null().default(true))
                    .col(ColumnDef::new(UserSettings::RefreshInterval).integer().not_null().default(60))
                    .col(ColumnDef::new(UserSettings::UseAiForSignals).boolean().not_null().default(true))
                    .col(ColumnDef::new(UserSettings::UseCustomAiKey).boolean().not_null().default(false))
                    .col(ColumnDef::new(UserSettings::OpenaiApiKey).text().null())
                    .col(ColumnDef::new(UserSettings::EnableOtcTrading).boolean().not_null().default(false))
                    .col(ColumnDef::new(UserSettings::AllowScheduledSignals).boolean().not_null().default(false))
                    .col(ColumnDef::new(UserSettings::RespectTimeframes).boolean().not_null().default(true))
                    .col(
                        ColumnDef::new(UserSettings::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(UserSettings::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_settings_user")
                            .from(UserSettings::Table, UserSettings::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(UserNotificationSettings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UserNotificationSettings::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(UserNotificationSettings::UserId).integer().not_null().unique_key())
                    .col(ColumnDef::new(UserNotificationSettings::EmailNotifications).boolean().not_null().default(true))
                    .col(ColumnDef::new(UserNotificationSettings::PushNotifications).boolean().not_null().default(true))
                    .col(ColumnDef::new(UserNotificationSettings::SignalAlerts).boolean().not_null().default(true))
                    .col(ColumnDef::new(UserNotificationSettings::MarketUpdates).boolean().not_null().default(true))
                    .col(ColumnDef::new(UserNotificationSettings::AccountAlerts).boolean().not_null().default(true))
                    .col(ColumnDef::new(UserNotificationSettings::PromotionalEmails).boolean().not_null().default(false))
                    .col(
                        ColumnDef::new(UserNotificationSettings::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(UserNotificationSettings::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_notification_settings_user")
                            .from(UserNotificationSettings::Table, UserNotificationSettings::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UserNotificationSettings::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(UserSettings::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum UserSettings {
    Table,
    Id,
    UserId,
    Theme,
    DefaultAsset,
    DefaultTimeframe,
    DefaultPlatform,
    ChartType,
    ShowTradingTips,
    AutoRefreshData,
    RefreshInterval,
    UseAiForSignals,
    UseCustomAiKey,
    OpenaiApiKey,
    EnableOtcTrading,
    AllowScheduledSignals,
    RespectTimeframes,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum UserNotificationSettings {
    Table,
    Id,
    UserId,
    EmailNotifications,
    PushNotifications,
    SignalAlerts,
    MarketUpdates,
    AccountAlerts,
    PromotionalEmails,
    CreatedAt,
    UpdatedAt,
}
