use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{ChatId, ParseMode};

use crate::catalog::QuoteEntry;
use crate::error::BotError;

/// Sends one message to one chat. Implementations make a single delivery
/// attempt; whether to retry is the caller's decision.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, chat_id: &str, text: &str, mode: ParseMode) -> Result<(), BotError>;
}

/// Notifier over the Telegram Bot API.
pub struct TelegramNotifier {
    bot: Bot,
}

impl TelegramNotifier {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, chat_id: &str, text: &str, mode: ParseMode) -> Result<(), BotError> {
        let id: i64 = chat_id
            .parse()
            .map_err(|_| BotError::Delivery(format!("invalid chat id: {chat_id}")))?;

        self.bot
            .send_message(ChatId(id), text)
            .parse_mode(mode)
            .await
            .map_err(|e| BotError::Delivery(e.to_string()))?;

        Ok(())
    }
}

/// Render a quote as Telegram HTML: the quote text, then a link to the book
/// it comes from.
pub fn render_quote(entry: &QuoteEntry, site_base: &str) -> String {
    let href = format!(
        "{}/{}",
        site_base.trim_end_matches('/'),
        entry.link.trim_start_matches('/')
    );
    format!(
        "\u{201c}{}\u{201d}\n\n<a href=\"{}\">{}</a>",
        html_escape::encode_text(&entry.quote),
        html_escape::encode_double_quoted_attribute(&href),
        html_escape::encode_text(&entry.title),
    )
}
