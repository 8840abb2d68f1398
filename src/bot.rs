/// Telegram bot module
///
/// This module sets up and runs the Telegram bot using the teloxide framework.
/// It connects the pieces: configuration, catalog, lead log, language model and handlers.

use anyhow::{Context, Result};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use teloxide::{prelude::*, types::Me, utils::command::BotCommands};
use tokio::time::sleep;

use crate::config::Config;
use crate::handlers::{
    handle_callback_query, handle_help_command, handle_message, handle_start_command,
    TourAssistant,
};

/// Bot commands that users can use
#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "lowercase", description = "Supported commands:")]
pub enum Command {
    #[command(description = "Start the bot and show the tour menu")]
    Start,
    #[command(description = "Show search examples")]
    Help,
}

/// Initialize and run the Telegram bot around a ready assistant
pub async fn run_bot(config: Config, assistant: Arc<TourAssistant>) -> Result<()> {
    log::info!("Initializing bot...");

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(60))
        .connect_timeout(Duration::from_secs(30))
        .tcp_keepalive(Duration::from_secs(60))
        .build()
        .context("Failed to create HTTP client")?;

    let bot = Bot::with_client(&config.telegram_token, client);

    // Get bot info with retry logic for network issues
    let me = retry_get_me(&bot)
        .await
        .context("Failed to connect to Telegram API")?;
    log::info!("Bot started: @{}", me.username());

    let handler = dptree::entry()
        // Handle commands
        .branch(
            Update::filter_message()
                .filter_command::<Command>()
                .endpoint(
                    |bot: Bot, msg: Message, cmd: Command, assistant: Arc<TourAssistant>| async move {
                        let result = match cmd {
                            Command::Start => handle_start_command(bot, msg, assistant).await,
                            Command::Help => handle_help_command(bot, msg, assistant).await,
                        };
                        if let Err(e) = result {
                            log::error!("Error handling command: {:?}", e);
                        }
                        Ok::<(), anyhow::Error>(())
                    },
                ),
        )
        // Handle menu buttons
        .branch(
            Update::filter_callback_query()
                .endpoint(
                    |bot: Bot, q: CallbackQuery, assistant: Arc<TourAssistant>| async move {
                        if let Err(e) = handle_callback_query(bot, q, assistant).await {
                            log::error!("Error handling callback query: {:?}", e);
                        }
                        Ok::<(), anyhow::Error>(())
                    },
                ),
        )
        // Handle regular messages
        .branch(
            Update::filter_message()
                .endpoint(
                    |bot: Bot, msg: Message, assistant: Arc<TourAssistant>| async move {
                        if let Err(e) = handle_message(bot, msg, assistant).await {
                            log::error!("Error handling message: {:?}", e);
                        }
                        Ok::<(), anyhow::Error>(())
                    },
                ),
        );

    // Create dispatcher
    let mut dispatcher = Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![assistant])
        .enable_ctrlc_handler()
        .build();

    log::info!("Bot is running. Press Ctrl+C to stop.");

    dispatcher.dispatch().await;

    Ok(())
}

/// Ask Telegram who we are, backing off between failed attempts
async fn retry_get_me(bot: &Bot) -> Result<Me> {
    with_backoff("get_me", 5, Duration::from_secs(2), || async move {
        bot.get_me().await
    })
    .await
}

/// Run `op` up to `attempts` times, doubling `delay` after each failure.
/// When every attempt fails the last error is returned.
async fn with_backoff<T, E, F, Fut>(
    what: &str,
    attempts: u32,
    mut delay: Duration,
    mut op: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    E: std::error::Error + Send + Sync + 'static,
{
    let mut last_error = None;

    for attempt in 1..=attempts {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                log::warn!("{} failed (attempt {}/{}): {}", what, attempt, attempts, e);
                last_error = Some(e);
            }
        }

        if attempt < attempts {
            sleep(delay).await;
            delay *= 2;
        }
    }

    match last_error {
        Some(e) => Err(anyhow::Error::new(e).context(format!("{} failed {} times", what, attempts))),
        None => anyhow::bail!("{} was never attempted", what),
    }
}
