//! Telegram client using teloxide.

use teloxide::prelude::*;
use teloxide::types::{ChatAction, InlineKeyboardMarkup, MessageId, ParseMode, ReplyParameters};
use tracing::warn;

use crate::translator::commands::Reply;

/// Telegram API client for the handful of calls the bot makes.
#[derive(Clone)]
pub struct TelegramClient {
    bot: Bot,
}

impl TelegramClient {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    pub async fn send_html(
        &self,
        chat_id: ChatId,
        text: &str,
        reply_to: Option<MessageId>,
        keyboard: Option<InlineKeyboardMarkup>,
    ) -> Result<MessageId, String> {
        let mut request = self
            .bot
            .send_message(chat_id, text)
            .parse_mode(ParseMode::Html);

        if let Some(msg_id) = reply_to {
            request = request.reply_parameters(ReplyParameters::new(msg_id));
        }
        if let Some(markup) = keyboard {
            request = request.reply_markup(markup);
        }

        request.await.map(|msg| msg.id).map_err(|e| {
            let msg = format!("Failed to send: {e}");
            warn!("{}", msg);
            msg
        })
    }

    pub async fn send_reply(&self, chat_id: ChatId, reply: Reply, reply_to: Option<MessageId>) -> Result<MessageId, String> {
        self.send_html(chat_id, &reply.text, reply_to, reply.keyboard).await
    }

    /// Replace the content of a message the bot sent earlier.
    pub async fn edit_reply(&self, chat_id: ChatId, message_id: MessageId, reply: Reply) -> Result<(), String> {
        let mut request = self
            .bot
            .edit_message_text(chat_id, message_id, reply.text)
            .parse_mode(ParseMode::Html);

        if let Some(markup) = reply.keyboard {
            request = request.reply_markup(markup);
        }

        request.await.map(|_| ()).map_err(|e| {
            let msg = format!("Failed to edit message: {e}");
            warn!("{}", msg);
            msg
        })
    }

    pub async fn delete_message(&self, chat_id: ChatId, message_id: MessageId) -> Result<(), String> {
        self.bot
            .delete_message(chat_id, message_id)
            .await
            .map(|_| ())
            .map_err(|e| {
                let msg = format!("Failed to delete message: {e}");
                warn!("{}", msg);
                msg
            })
    }

    /// Show "typing..." in the chat. Best effort.
    pub async fn typing(&self, chat_id: ChatId) {
        if let Err(e) = self.bot.send_chat_action(chat_id, ChatAction::Typing).await {
            warn!("Failed to send chat action: {e}");
        }
    }
}
