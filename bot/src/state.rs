use sea_orm::DatabaseConnection;
use shared::entity::sea_orm_active_enums::Language;
use shared::entity::users;
use shared::services::{PaymentService, UserService};
use shared::{get_db_connection, i18n, Config};
use std::sync::Arc;
use teloxide::dispatching::dialogue::InMemStorage;
use teloxide::prelude::Dialogue;
use teloxide::types::User;

pub type MyDialogue = Dialogue<BotState, InMemStorage<BotState>>;
pub type HandlerResult = Result<(), anyhow::Error>;

pub struct AppState {
    pub bot_token: String,
    pub bot_name: String,
    pub db: Arc<DatabaseConnection>,
    pub user_service: UserService,
    pub payment_service: PaymentService,
}

impl AppState {
    pub async fn new() -> Result<Self, anyhow::Error> {
        let config = Config::from_env()?;
        let bot_token = config
            .telegram
            .bot_token
            .clone()
            .ok_or_else(|| anyhow::anyhow!("TELEGRAM_BOT_TOKEN is not set"))?;
        let db = Arc::new(get_db_connection(&config.database_url).await?);
        tracing::info!("Connected to database successfully");

        Ok(AppState {
            bot_token,
            bot_name: config.telegram.bot_username.clone(),
            user_service: UserService::new(db.clone()),
            payment_service: PaymentService::new(db.clone(), config.telegram.bot_username),
            db,
        })
    }

    /// Account linked to this Telegram user, if any.
    pub async fn linked_user(&self, from: Option<&User>) -> Option<users::Model> {
        let from = from?;
        match self.user_service.find_by_telegram_id(from.id.0 as i64).await {
            Ok(user) => user,
            Err(e) => {
                tracing::error!(telegram_id = from.id.0, "Failed to load linked user: {}", e);
                None
            }
        }
    }

    /// Reply language: the account's stored language, else the Telegram client's.
    pub async fn language_for(&self, from: Option<&User>) -> Language {
        match self.linked_user(from).await {
            Some(user) => user.language,
            None => i18n::language_from_telegram(from.and_then(|u| u.language_code.as_deref())),
        }
    }
}

#[derive(Clone, Default, Debug)]
pub enum BotState {
    #[default]
    Normal,
    /// Opened through a payment deep link; the app user id (if any) is
    /// linked when the payment succeeds.
    AwaitingPayment {
        plan: String,
        app_user_id: Option<i32>,
    },
}
