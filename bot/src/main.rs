use anyhow::Result;
use std::sync::Arc;
use teloxide::dispatching::dialogue::InMemStorage;
use teloxide::dispatching::{dialogue, UpdateHandler};
use teloxide::prelude::*;
use tracing_subscriber::EnvFilter;

mod commands;
mod state;

use crate::commands::{
    handle_help, handle_invalid, handle_pay, handle_pay_callback, handle_plan, handle_plans,
    handle_pre_checkout, handle_start, handle_status, handle_successful_payment, handle_version,
    Command,
};
use crate::state::{AppState, BotState};

fn schema() -> UpdateHandler<anyhow::Error> {
    use dptree::case;

    let command_handler = teloxide::filter_command::<Command, _>()
        .branch(case![Command::Start(param)].endpoint(handle_start))
        .branch(case![Command::Help].endpoint(handle_help))
        .branch(case![Command::Plans].endpoint(handle_plans))
        .branch(dptree::filter_map(|cmd: Command| cmd.plan_code()).endpoint(handle_plan))
        .branch(case![Command::Pay(plan)].endpoint(handle_pay))
        .branch(case![Command::Status].endpoint(handle_status))
        .branch(case![Command::Version].endpoint(handle_version));

    let message_handler = Update::filter_message()
        .branch(Message::filter_successful_payment().endpoint(handle_successful_payment))
        .branch(command_handler)
        .branch(dptree::endpoint(handle_invalid));

    let callback_query_handler = Update::filter_callback_query().endpoint(handle_pay_callback);

    // Pre-checkout queries carry no chat, so they are answered outside the dialogue.
    dptree::entry()
        .branch(Update::filter_pre_checkout_query().endpoint(handle_pre_checkout))
        .branch(
            dialogue::enter::<Update, InMemStorage<BotState>, BotState, _>()
                .branch(message_handler)
                .branch(callback_query_handler),
        )
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    tracing::info!("Starting SignalHub payment bot...");

    let app_state = Arc::new(AppState::new().await?);
    tracing::info!("AppState initialized");

    let bot = Bot::new(&app_state.bot_token);

    let mut dispatcher = Dispatcher::builder(bot, schema())
        .dependencies(dptree::deps![InMemStorage::<BotState>::new(), app_state.clone()])
        .enable_ctrlc_handler()
        .build();

    tracing::info!("Bot is running and waiting for updates...");
    dispatcher.dispatch().await;

    Ok(())
}
