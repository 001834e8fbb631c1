//! Telegram delivery for notifications
//!
//! Uses the teloxide crate. Only compiled with the `telegram` feature.

use super::types::Notification;
use super::NotificationSink;
use crate::logger::{self, LogTag};
use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::ChatId;

/// Telegram notifier for sending messages
pub struct TelegramNotifier {
    bot: Bot,
    chat_id: ChatId,
}

impl TelegramNotifier {
    pub fn new(bot_token: &str, chat_id: i64) -> Result<Self, String> {
        if bot_token.is_empty() {
            return Err("Bot token is empty".to_string());
        }
        if chat_id == 0 {
            return Err("Chat ID is not set".to_string());
        }

        Ok(Self {
            bot: Bot::new(bot_token),
            chat_id: ChatId(chat_id),
        })
    }
}

#[async_trait]
impl NotificationSink for TelegramNotifier {
    fn name(&self) -> &'static str {
        "telegram"
    }

    async fn notify(&self, notification: &Notification) -> Result<(), String> {
        let message = notification.message();
        self.bot
            .send_message(self.chat_id, message.as_str())
            .await
            .map_err(|e| format!("Failed to send Telegram message: {}", e))?;

        logger::debug(
            LogTag::Notifications,
            &format!("Sent Telegram notification (length={})", message.len()),
        );
        Ok(())
    }
}
