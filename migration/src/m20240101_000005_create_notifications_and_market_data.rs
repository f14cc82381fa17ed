use sea_orm_migration::prelude::*;

use crate::m20240101_000001_create_users::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Notifications::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Notifications::Id).integer().not_null().auto_increment().primary_key())
                    .col(ColumnDef::new(Notifications::UserId).integer().not_null())
                    .col(ColumnDef::new(Notifications::Type).string_len(16).not_null())
                    .col(ColumnDef::new(Notifications::Title).text().not_null())
                    .col(ColumnDef::new(Notifications::Message).text().not_null())
                    .col(ColumnDef::new(Notifications::IsRead).boolean().not_null().default(false))
                    .col(ColumnDef::new(Notifications::RelatedId).integer().null())
                    .col(ColumnDef::new(Notifications::Link).text().null())
                    .col(
                        ColumnDef::new(Notifications::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_notifications_user")
                            .from(Notifications::Table, Notifications::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_notifications_user_read")
                    .table(Notifications::Table)
                    .col(Notifications::UserId)
                    .col(Notifications::IsRead)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(MarketData::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(MarketData::Id).integer().not_null().auto_increment().primary_key())
                    .col(ColumnDef::new(MarketData::Asset).text().not_null())
                    .col(ColumnDef::new(MarketData::Price).decimal_len(20, 8).not_null())
                    .col(ColumnDef::new(MarketData::Change24h).decimal_len(10, 4).null())
                    .col(ColumnDef::new(MarketData::High24h).decimal_len(20, 8).null())
                    .col(ColumnDef::new(MarketData::Low24h).decimal_len(20, 8).null())
                    .col(ColumnDef::new(MarketData::Volume24h).decimal_len(30, 8).null())
                    .col(ColumnDef::new(MarketData::MarketCap).decimal_len(30, 2).null())
                    .col(ColumnDef::new(MarketData::DataSource).text().null())
                    .col(
                        ColumnDef::new(MarketData::Timestamp)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_market_data_asset_timestamp")
                    .table(MarketData::Table)
                    .col(MarketData::Asset)
                    .col(MarketData::Timestamp)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(MarketData::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Notifications::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Notifications {
    Table,
    Id,
    UserId,
    Type,
    Title,
    Message,
    IsRead,
    RelatedId,
    Link,
    CreatedAt,
}

#[derive(DeriveIden)]
enum MarketData {
    Table,
    Id,
    Asset,
    Price,
    Change24h,
    High24h,
    Low24h,
    Volume24h,
    MarketCap,
    DataSource,
    Timestamp,
}
