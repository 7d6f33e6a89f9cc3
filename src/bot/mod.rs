//! Telegram update handling.
//!
//! The [`Dispatcher`] routes each update to a handler: commands from
//! messages, button presses from callback queries. Handler errors are
//! logged and counted, never returned to the update source, so one bad
//! update cannot stall webhook delivery or the polling loop.

mod commands;
mod handlers;
pub mod keyboards;
pub mod texts;

pub use commands::{Command, CommandKind};

use std::sync::{Arc, OnceLock};

use tracing::{debug, error};

use crate::api::status;
use crate::error::Result;
use crate::models::{CallbackQuery, InlineKeyboardMarkup, Message, Update};
use crate::services::{DialogueStore, GiveawayService, TelegramService};

/// Routes updates to handlers.
#[derive(Clone)]
pub struct Dispatcher {
    pub(crate) telegram: Arc<TelegramService>,
    pub(crate) giveaway: GiveawayService,
    pub(crate) dialogues: DialogueStore,
    /// Own username from `getMe`, used to skip commands for other bots.
    bot_username: Arc<OnceLock<String>>,
}

impl Dispatcher {
    pub fn new(
        telegram: Arc<TelegramService>,
        giveaway: GiveawayService,
        dialogues: DialogueStore,
    ) -> Self {
        Self {
            telegram,
            giveaway,
            dialogues,
            bot_username: Arc::new(OnceLock::new()),
        }
    }

    /// Record the bot's own username. Later calls are ignored.
    pub fn set_bot_username(&self, username: impl Into<String>) {
        let _ = self.bot_username.set(username.into());
    }

    /// Handle one update.
    pub async fn dispatch(&self, update: Update) {
        status::inc_update_count();
        let update_id = update.update_id;

        let result = if let Some(message) = update.message {
            self.handle_message(message).await
        } else if let Some(query) = update.callback_query {
            self.handle_callback(query).await
        } else {
            debug!(update_id, "Ignoring unsupported update");
            Ok(())
        };

        if let Err(e) = result {
            status::inc_error_count();
            error!(update_id, error = %e, "Update handling failed");
        }
    }

    async fn handle_message(&self, message: Message) -> Result<()> {
        let Some(command) = message.text.as_deref().and_then(Command::parse) else {
            return Ok(());
        };
        let Some(user) = message.from.as_ref() else {
            return Ok(());
        };

        if let Some(username) = self.bot_username.get() {
            if !command.is_addressed_to(username) {
                debug!(mention = ?command.mention, "Ignoring command for another bot");
                return Ok(());
            }
        }

        if command.kind.is_admin_only() && !self.giveaway.is_admin(user.id).await? {
            debug!(user_id = user.id, command = ?command.kind, "Ignoring admin command from non-admin");
            return Ok(());
        }

        match command.kind {
            CommandKind::Start => handlers::start(self, user).await,
            CommandKind::Gift => handlers::gift(self, user).await,
            CommandKind::Balance => handlers::balance(self, &message).await,
            CommandKind::Export => handlers::export(self, &message, command.limit_arg()).await,
            CommandKind::Add => handlers::add(self, &message, &command.args).await,
            CommandKind::Promo if message.chat.is_private() => {
                handlers::promo(self, &message, &command.args).await
            }
            CommandKind::Promo | CommandKind::Unknown => Ok(()),
        }
    }

    async fn handle_callback(&self, query: CallbackQuery) -> Result<()> {
        match query.data.as_deref() {
            Some(keyboards::CLAIM_GIFT) => handlers::claim(self, &query).await,
            Some(keyboards::CHECK_SUBSCRIPTION) => handlers::check_subscription(self, &query).await,
            _ => {
                debug!(data = ?query.data, "Ignoring unknown callback");
                self.answer(&query).await;
                Ok(())
            }
        }
    }

    /// Send a message, logging instead of failing.
    pub(crate) async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        markup: Option<&InlineKeyboardMarkup>,
    ) {
        if let Err(e) = self.telegram.send_message(chat_id, text, markup, None).await {
            error!(chat_id, error = %e, "send_message failed");
        }
    }

    /// Acknowledge a callback query, logging instead of failing.
    pub(crate) async fn answer(&self, query: &CallbackQuery) {
        if let Err(e) = self.telegram.answer_callback_query(&query.id).await {
            debug!(error = %e, "answerCallbackQuery failed");
        }
    }

    /// Replace the text of the message the button belongs to. Falls back to
    /// a new message when the original is unavailable.
    pub(crate) async fn edit_or_send(
        &self,
        query: &CallbackQuery,
        text: &str,
        markup: Option<&InlineKeyboardMarkup>,
    ) {
        let Some(message) = query.message.as_ref() else {
            self.send_text(query.from.id, text, markup).await;
            return;
        };

        if let Err(e) = self
            .telegram
            .edit_message_text(message.chat.id, message.message_id, text, markup)
            .await
        {
            error!(chat_id = message.chat.id, error = %e, "editMessageText failed");
        }
    }
}
