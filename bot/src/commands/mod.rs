use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use teloxide::utils::command::BotCommands;

use crate::state::{AppState, HandlerResult};
use shared::i18n;

pub mod admin;
pub mod payment;
pub mod plans;
pub mod start;
pub mod status;

pub use admin::handle_version;
pub use payment::{handle_pay, handle_pay_callback, handle_pre_checkout, handle_successful_payment};
pub use plans::{handle_plan, handle_plans};
pub use start::handle_start;
pub use status::handle_status;

/// SignalHub payment bot commands
#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "lowercase")]
pub enum Command {
    /// Start the bot, optionally from a payment link
    Start(String),
    /// Show the list of commands
    Help,
    /// Show subscription plans
    Plans,
    /// Weekly plan details
    Weekly,
    /// Monthly plan details
    Monthly,
    /// Annual plan details
    Annual,
    /// Premium plan details
    Premium,
    /// Pay for a plan with Telegram Stars
    Pay(String),
    /// Show your subscription status
    Status,
    /// Show the bot version
    Version,
}

impl Command {
    pub fn plan_code(&self) -> Option<&'static str> {
        match self {
            Command::Weekly => Some("weekly"),
            Command::Monthly => Some("monthly"),
            Command::Annual => Some("annual"),
            Command::Premium => Some("premium"),
            _ => None,
        }
    }
}

pub(crate) async fn send_html(bot: &Bot, chat_id: ChatId, text: String) -> HandlerResult {
    bot.send_message(chat_id, text)
        .parse_mode(ParseMode::Html)
        .await?;
    Ok(())
}

pub async fn handle_help(bot: Bot, msg: Message, state: Arc<AppState>) -> HandlerResult {
    let locale = state.language_for(msg.from.as_ref()).await.code();
    send_html(&bot, msg.chat.id, i18n::translate(locale, "help_text", None)).await
}

pub async fn handle_invalid(bot: Bot, msg: Message, state: Arc<AppState>) -> HandlerResult {
    let locale = state.language_for(msg.from.as_ref()).await.code();
    send_html(&bot, msg.chat.id, i18n::translate(locale, "unknown_command", None)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            Command::parse("/start pay_weekly_750_42", "bot").unwrap(),
            Command::Start("pay_weekly_750_42".to_string())
        );
        assert_eq!(Command::parse("/start", "bot").unwrap(), Command::Start(String::new()));
        assert_eq!(
            Command::parse("/pay monthly", "bot").unwrap(),
            Command::Pay("monthly".to_string())
        );
        assert_eq!(Command::parse("/premium", "bot").unwrap().plan_code(), Some("premium"));
        assert_eq!(Command::parse("/plans", "bot").unwrap().plan_code(), None);
    }
}
