//! `SeaORM` Entity, @generated manually

pub mod prelude;

pub mod market_data;
pub mod notifications;
pub mod sea_orm_active_enums;
pub mod signals;
pub mod subscriptions;
pub mod user_notification_settings;
pub mod user_settings;
pub mod user_signal_usage;
pub mod user_signals;
pub mod users;
