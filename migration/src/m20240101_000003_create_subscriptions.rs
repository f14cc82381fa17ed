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
                    .table(Subscriptions::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Subscriptions::Id).integer().not_null().auto_increment().primary_key())
                    .col(ColumnDef::new(Subscriptions::UserId).integer().not_null().unique_key())
                    .col(ColumnDef::new(Subscriptions::Type).string_len(16).not_null().default("free"))
                    .col(
                        ColumnDef::new(Subscriptions::StartDate)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Subscriptions::EndDate).timestamp_with_time_zone().null())
                    .col(ColumnDef::new(Subscriptions::IsActive).boolean().not_null().default(true))
                    .col(ColumnDef::new(Subscriptions::DailySignalLimit).integer().not_null().default(5))
                    .col(ColumnDef::new(Subscriptions::PaymentMethod).text().null())
                    .col(ColumnDef::new(Subscriptions::TransactionId).text().null())
                    .col(ColumnDef::new(Subscriptions::Amount).integer().null())
                    .col(ColumnDef::new(Subscriptions::Currency).string_len(8).null())
                    .col(
                        ColumnDef::new(Subscriptions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Subscriptions::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_subscriptions_user")
                            .from(Subscriptions::Table, Subscriptions::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // payment-status lookups go through the transaction id
        manager
            .create_index(
                Index::create()
                    .name("idx_subscriptions_transaction_id")
                    .table(Subscriptions::Table)
                    .col(Subscriptions::TransactionId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Subscriptions::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Subscriptions {
    Table,
    Id,
    UserId,
    Type,
    StartDate,
    EndDate,
    IsActive,
    DailySignalLimit,
    PaymentMethod,
    TransactionId,
    Amount,
    Currency,
    CreatedAt,
    UpdatedAt,
}
