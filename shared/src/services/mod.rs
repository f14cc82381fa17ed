pub mod market_service;
pub mod notification_service;
pub mod payment_service;
pub mod settings_service;
pub mod signal_service;
pub mod user_service;

pub use market_service::{MarketQuote, MarketService};
pub use notification_service::NotificationService;
pub use payment_service::PaymentService;
pub use settings_service::SettingsService;
pub use signal_service::SignalService;
pub use user_service::UserService;

/// Daily generation quota of the free tier created at registration.
pub const FREE_DAILY_SIGNAL_LIMIT: i32 = 5;
