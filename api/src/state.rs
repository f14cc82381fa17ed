use sea_orm::DatabaseConnection;
use shared::crypto::SecretBox;
use shared::services::{
    MarketService, NotificationService, PaymentService, SettingsService, SignalService, UserService,
};
use shared::Config;
use std::sync::Arc;
use teloxide::Bot;

pub struct AppState {
    pub config: Config,
    pub db: Arc<DatabaseConnection>,
    pub user_service: UserService,
    pub settings_service: SettingsService,
    pub signal_service: SignalService,
    pub notification_service: NotificationService,
    pub market_service: MarketService,
    pub payment_service: PaymentService,
    /// Present only when `TELEGRAM_BOT_TOKEN` is configured.
    pub bot: Option<Bot>,
}

impl AppState {
    pub fn new(db: Arc<DatabaseConnection>, config: Config) -> Self {
        let secrets = SecretBox::from_passphrase(&config.encryption_key);
        let bot = config.telegram.bot_token.as_deref().map(Bot::new);

        AppState {
            user_service: UserService::new(db.clone()),
            settings_service: SettingsService::new(
                db.clone(),
                secrets,
                config.openai_api_key.clone(),
            ),
            signal_service: SignalService::new(db.clone()),
            notification_service: NotificationService::new(db.clone()),
            market_service: MarketService::new(db.clone()),
            payment_service: PaymentService::new(db.clone(), config.telegram.bot_username.clone()),
            bot,
            db,
            config,
        }
    }

    pub fn issue_token(&self, user_id: i32, username: &str) -> shared::Result<String> {
        shared::auth::encode_jwt(
            user_id,
            username,
            &self.config.jwt_secret,
            self.config.jwt_expiration_hours,
        )
    }
}
