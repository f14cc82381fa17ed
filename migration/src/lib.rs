pub use sea_orm_migration::prelude::*;

mod m20240101_000001_create_users;
mod m20240101_000002_create_user_preferences;
mod m20240101_000003_create_subscriptions;
mod m20240101_000004_create_signals;
mod m20240101_000005_create_notifications_and_market_data;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_users::Migration),
            Box::new(m20240101_000002_create_user_preferences::Migration),
            Box::new(m20240101_000003_create_subscriptions::Migration),
            Box::new(m20240101_000004_create_signals::Migration),
            Box::new(m20240101_000005_create_notifications_and_market_data::Migration),
        ]
    }
}
