/// Message handlers module
///
/// This module handles:
/// - Turning each inbound event (command, button press, free text) into a reply
/// - Recording every free-text message as a lead
/// - Falling back to the language model when the catalog has no match
/// - Sending the replies back through Telegram

use anyhow::Result;
use std::str::FromStr;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::{ChatAction, InlineKeyboardButton, InlineKeyboardMarkup};

use crate::catalog::{Catalog, RankBy, MENU_RANK_LIMIT};
use crate::completion::CompletionClient;
use crate::format::{
    format_tours, search_heading, split_message, AI_APOLOGY_TEXT, AI_DISABLED_TEXT,
    BUTTON_CHEAP_LABEL, BUTTON_SEARCH_LABEL, BUTTON_TOP_LABEL, CHEAPEST_HEADING,
    EMPTY_CATALOG_TEXT, HELP_TEXT, SEARCH_PROMPT_TEXT, TELEGRAM_MESSAGE_LIMIT,
    TOP_RATED_HEADING, UNKNOWN_BUTTON_TEXT, WELCOME_TEXT,
};
use crate::leads::LeadStore;

/// The buttons of the main menu, identified by their callback data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonTag {
    Cheap,
    Top,
    Search,
}

impl ButtonTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            ButtonTag::Cheap => "cheap",
            ButtonTag::Top => "top",
            ButtonTag::Search => "search",
        }
    }
}

impl FromStr for ButtonTag {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "cheap" => Ok(ButtonTag::Cheap),
            "top" => Ok(ButtonTag::Top),
            "search" => Ok(ButtonTag::Search),
            other => anyhow::bail!("Unknown button tag: {}", other),
        }
    }
}

/// Inline keyboard attached to the welcome message
pub fn main_menu() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::callback(
            BUTTON_CHEAP_LABEL,
            ButtonTag::Cheap.as_str(),
        )],
        vec![InlineKeyboardButton::callback(
            BUTTON_TOP_LABEL,
            ButtonTag::Top.as_str(),
        )],
        vec![InlineKeyboardButton::callback(
            BUTTON_SEARCH_LABEL,
            ButtonTag::Search.as_str(),
        )],
    ])
}

/// Transport-independent core of the bot
///
/// Holds the immutable catalog plus handles to the lead log and the optional
/// language model, all injected at construction.
pub struct TourAssistant {
    catalog: Arc<Catalog>,
    leads: Arc<dyn LeadStore>,
    completion: Option<Arc<dyn CompletionClient>>,
}

impl TourAssistant {
    pub fn new(
        catalog: Arc<Catalog>,
        leads: Arc<dyn LeadStore>,
        completion: Option<Arc<dyn CompletionClient>>,
    ) -> Self {
        Self {
            catalog,
            leads,
            completion,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn completion_enabled(&self) -> bool {
        self.completion.is_some()
    }

    pub fn start_text(&self) -> &'static str {
        WELCOME_TEXT
    }

    pub fn help_text(&self) -> &'static str {
        HELP_TEXT
    }

    /// Whether `answer_text` would call the language model for `text`
    pub fn will_consult_completion(&self, text: &str) -> bool {
        self.completion.is_some() && self.catalog.search(text).is_empty()
    }

    /// Reply for a main-menu button press
    pub fn answer_button(&self, tag: ButtonTag) -> String {
        let (heading, by) = match tag {
            ButtonTag::Cheap => (CHEAPEST_HEADING, RankBy::PriceAscending),
            ButtonTag::Top => (TOP_RATED_HEADING, RankBy::SatisfactionDescending),
            ButtonTag::Search => return SEARCH_PROMPT_TEXT.to_string(),
        };

        let ranked = self.catalog.rank(by, MENU_RANK_LIMIT);
        if ranked.is_empty() {
            return EMPTY_CATALOG_TEXT.to_string();
        }

        format_tours(heading, &ranked)
    }

    /// Reply for raw callback data, which may be missing or forged
    pub fn answer_callback_data(&self, data: Option<&str>) -> String {
        match data.map(ButtonTag::from_str) {
            Some(Ok(tag)) => self.answer_button(tag),
            _ => UNKNOWN_BUTTON_TEXT.to_string(),
        }
    }

    /// Reply for a free-text message
    ///
    /// Records the lead, then answers from the catalog or, when nothing
    /// matches, from the language model.
    pub async fn answer_text(&self, username: Option<&str>, text: &str) -> String {
        if let Err(e) = self.leads.record(username, text).await {
            log::warn!("Failed to record lead from {:?}: {:#}", username, e);
        }

        let results = self.catalog.search(text);
        if !results.is_empty() {
            log::info!("{} tours matched '{}'", results.len(), text);
            return format_tours(&search_heading(text), &results);
        }

        let Some(completion) = self.completion.as_ref() else {
            return AI_DISABLED_TEXT.to_string();
        };

        log::info!("No tour matched '{}', using language model fallback", text);
        match completion.complete(text).await {
            Ok(reply) if !reply.trim().is_empty() => reply,
            Ok(_) => {
                log::warn!("Language model returned an empty reply");
                AI_APOLOGY_TEXT.to_string()
            }
            Err(e) => {
                log::error!("Error querying language model: {:#}", e);
                AI_APOLOGY_TEXT.to_string()
            }
        }
    }
}

/// Send `text`, split to fit Telegram's length limit
async fn send_long_message(bot: &Bot, chat_id: ChatId, text: &str) -> Result<()> {
    for chunk in split_message(text, TELEGRAM_MESSAGE_LIMIT) {
        bot.send_message(chat_id, chunk).await?;
    }
    Ok(())
}

/// Handle the /start command
pub async fn handle_start_command(
    bot: Bot,
    msg: Message,
    assistant: Arc<TourAssistant>,
) -> Result<()> {
    bot.send_message(msg.chat.id, assistant.start_text())
        .reply_markup(main_menu())
        .await?;

    Ok(())
}

/// Handle the /help command
pub async fn handle_help_command(
    bot: Bot,
    msg: Message,
    assistant: Arc<TourAssistant>,
) -> Result<()> {
    bot.send_message(msg.chat.id, assistant.help_text()).await?;

    Ok(())
}

/// Handle a main-menu button press
pub async fn handle_callback_query(
    bot: Bot,
    q: CallbackQuery,
    assistant: Arc<TourAssistant>,
) -> Result<()> {
    log::debug!("Callback {:?} from user {}", q.data, q.from.id);

    // Stop the loading spinner on the button. Telegram rejects answers to
    // stale queries, but the user still gets the reply
    if let Err(e) = bot.answer_callback_query(q.id.clone()).await {
        log::warn!("Failed to answer callback query {}: {}", q.id, e);
    }

    let Some(chat_id) = q.message.as_ref().map(|m| m.chat.id) else {
        log::debug!("Callback without an attached message, nothing to reply to");
        return Ok(());
    };

    let reply = assistant.answer_callback_data(q.data.as_deref());
    send_long_message(&bot, chat_id, &reply).await
}

/// Main message handler
///
/// Non-text messages get the help text so every update is answered.
pub async fn handle_message(
    bot: Bot,
    msg: Message,
    assistant: Arc<TourAssistant>,
) -> Result<()> {
    let Some(text) = msg.text() else {
        bot.send_message(msg.chat.id, assistant.help_text()).await?;
        return Ok(());
    };

    let username = msg.from().and_then(|user| user.username.as_deref());

    log::debug!("Received message in chat {} from {:?}: {}", msg.chat.id, username, text);

    // Show "typing" while the language model works
    if assistant.will_consult_completion(text) {
        if let Err(e) = bot.send_chat_action(msg.chat.id, ChatAction::Typing).await {
            log::warn!("Failed to send typing action to chat {}: {}", msg.chat.id, e);
        }
    }

    let reply = assistant.answer_text(username, text).await;

    send_long_message(&bot, msg.chat.id, &reply).await
}
