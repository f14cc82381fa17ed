//! `SeaORM` Entity, @generated manually

pub use super::market_data::Entity as MarketData;
pub use super::notifications::Entity as Notifications;
pub use super::signals::Entity as Signals;
pub use super::subscriptions::Entity as Subscriptions;
pub use super::user_notification_settings::Entity as UserNotificationSettings;
pub use super::user_settings::Entity as UserSettings;
pub use super::user_signal_usage::Entity as UserSignalUsage;
pub use super::user_signals::Entity as UserSignals;
pub use super::users::Entity as Users;
