pub mod market_data_repository;
pub mod notification_repository;
pub mod settings_repository;
pub mod signal_repository;
pub mod subscription_repository;
pub mod usage_repository;
pub mod user_repository;
pub mod user_signal_repository;

pub use market_data_repository::MarketDataRepository;
pub use notification_repository::NotificationRepository;
pub use settings_repository::SettingsRepository;
pub use signal_repository::SignalRepository;
pub use subscription_repository::SubscriptionRepository;
pub use usage_repository::{UsageKind, UsageRepository};
pub use user_repository::UserRepository;
pub use user_signal_repository::UserSignalRepository;
