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
                    .table(Signals::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Signals::Id).integer().not_null().auto_increment().primary_key())
                    .col(ColumnDef::new(Signals::Asset).text().not_null())
                    .col(ColumnDef::new(Signals::Type).string_len(8).not_null()) // "buy" or "sell"
                    .col(ColumnDef::new(Signals::EntryPrice).decimal_len(20, 8).not_null())
                    .col(ColumnDef::new(Signals::TargetPrice).decimal_len(20, 8).not_null())
                    .col(ColumnDef::new(Signals::StopLoss).decimal_len(20, 8).not_null())
                    .col(ColumnDef::new(Signals::Accuracy).integer().not_null())
                    .col(ColumnDef::new(Signals::Time).string_len(8).not_null())
                    .col(ColumnDef::new(Signals::Status).string_len(16).not_null().default("active"))
                    .col(ColumnDef::new(Signals::Indicators).json_binary().not_null())
                    .col(ColumnDef::new(Signals::Platform).text().null())
                    .col(ColumnDef::new(Signals::Timeframe).string_len(8).null())
                    .col(ColumnDef::new(Signals::Analysis).json_binary().null())
                    .col(
                        ColumnDef::new(Signals::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Signals::CompletedAt).timestamp_with_time_zone().null())
                    .col(ColumnDef::new(Signals::Result).string_len(16).null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_signals_status_created")
                    .table(Signals::Table)
                    .col(Signals::Status)
                    .col(Signals::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(UserSignals::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(UserSignals::Id).integer().not_null().auto_increment().primary_key())
                    .col(ColumnDef::new(UserSignals::UserId).integer().not_null())
                    .col(ColumnDef::new(UserSignals::SignalId).integer().not_null())
                    .col(ColumnDef::new(UserSignals::IsFavorite).boolean().not_null().default(false))
                    .col(ColumnDef::new(UserSignals::IsTaken).boolean().not_null().default(false))
                    .col(ColumnDef::new(UserSignals::Notes).text().null())
                    .col(ColumnDef::new(UserSignals::Result).string_len(16).null())
                    .col(
                        ColumnDef::new(UserSignals::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .index(
                        Index::create()
                            .name("idx_user_signals_user_signal")
                            .table(UserSignals::Table)
                            .col(UserSignals::UserId)
                            .col(UserSignals::SignalId)
                            .unique(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_signals_user")
                            .from(UserSignals::Table, UserSignals::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_signals_signal")
                            .from(UserSignals::Table, UserSignals::SignalId)
                            .to(Signals::Table, Signals::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(UserSignalUsage::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(UserSignalUsage::Id).integer().not_null().auto_increment().primary_key())
                    .col(ColumnDef::new(UserSignalUsage::UserId).integer().not_null())
                    .col(ColumnDef::new(UserSignalUsage::Date).date().not_null())
                    .col(ColumnDef::new(UserSignalUsage::SignalsGenerated).integer().not_null().default(0))
                    .col(ColumnDef::new(UserSignalUsage::SignalsViewed).integer().not_null().default(0))
                    .col(ColumnDef::new(UserSignalUsage::AnalysisRequested).integer().not_null().default(0))
                    .index(
                        Index::create()
                            .name("idx_user_signal_usage_user_date")
                            .table(UserSignalUsage::Table)
                            .col(UserSignalUsage::UserId)
                            .col(UserSignalUsage::Date)
                            .unique(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_signal_usage_user")
                            .from(UserSignalUsage::Table, UserSignalUsage::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UserSignalUsage::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(UserSignals::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Signals::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Signals {
    Table,
    Id,
    Asset,
    Type,
    EntryPrice,
    TargetPrice,
    StopLoss,
    Accuracy,
    Time,
    Status,
    Indicators,
    Platform,
    Timeframe,
    Analysis,
    CreatedAt,
    CompletedAt,
    Result,
}

#[derive(DeriveIden)]
enum UserSignals {
    Table,
    Id,
    UserId,
    SignalId,
    IsFavorite,
    IsTaken,
    Notes,
    Result,
    CreatedAt,
}

#[derive(DeriveIden)]
enum UserSignalUsage {
    Table,
    Id,
    UserId,
    Date,
    SignalsGenerated,
    SignalsViewed,
    AnalysisRequested,
}
