use std::sync::Arc;

use teloxide::types::ParseMode;
use teloxide::utils::command::BotCommands;
use tracing::{error, info};

use crate::catalog::QuoteSource;
use crate::error::BotError;
use crate::notifier::{render_quote, Notifier};
use crate::selector;
use crate::store::users::{Subscriber, UserStore};

#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "lowercase", description = "What I can do:")]
pub enum Command {
    #[command(description = "subscribe to the daily book quote")]
    Start,
    #[command(description = "stop receiving quotes")]
    Stop,
    #[command(description = "get a quote right now")]
    Quote,
    #[command(description = "show this help")]
    Help,
}

/// One inbound chat message, reduced to the fields the bot acts on.
#[derive(Debug, Clone)]
pub struct Inbound {
    pub chat_id: String,
    pub sender_id: String,
    pub sender_name: String,
    pub text: String,
}

const WELCOME: &str = "You're in! I'll send you a book quote every morning. \
                       Send /quote whenever you want one right away.";
const ALREADY_SUBSCRIBED: &str =
    "You're already subscribed. /quote gets you one right now; /stop unsubscribes.";
const GOODBYE: &str = "You're unsubscribed. Send /start whenever you want quotes again.";
const NOT_SUBSCRIBED: &str = "You're not subscribed yet. Send /start first.";
const APOLOGY: &str = "Sorry, something went wrong on my end. Please try again in a little while.";

/// Turns commands into store mutations and replies.
pub struct CommandHandler {
    users: UserStore,
    quotes: Arc<dyn QuoteSource>,
    notifier: Arc<dyn Notifier>,
    site_base: String,
}

impl CommandHandler {
    pub fn new(
        users: UserStore,
        quotes: Arc<dyn QuoteSource>,
        notifier: Arc<dyn Notifier>,
        site_base: String,
    ) -> Self {
        Self {
            users,
            quotes,
            notifier,
            site_base,
        }
    }

    /// Entry point for one inbound message. Does not propagate errors:
    /// every outcome ends in a reply, or in a logged failure to reply.
    pub async fn dispatch(&self, command: Option<Command>, inbound: &Inbound) {
        let result = match command {
            Some(Command::Start) => self.subscribe(inbound).await,
            Some(Command::Stop) => self.unsubscribe(inbound).await,
            Some(Command::Quote) => self.quote_now(inbound).await,
            Some(Command::Help) | None => self.help(inbound).await,
        };

        match result {
            Ok(()) => {}
            Err(BotError::NotRegistered(_)) => {
                self.reply(inbound, NOT_SUBSCRIBED).await;
            }
            Err(e) => {
                error!("Command from chat {} failed: {}", inbound.chat_id, e);
                self.reply(inbound, APOLOGY).await;
            }
        }
    }

    async fn subscribe(&self, inbound: &Inbound) -> Result<(), BotError> {
        if self.users.get(&inbound.chat_id).await?.is_some() {
            return self
                .notifier
                .send(&inbound.chat_id, ALREADY_SUBSCRIBED, ParseMode::Html)
                .await;
        }

        let subscriber = Subscriber::new(&inbound.chat_id, &inbound.sender_name);
        self.users.put(&subscriber).await?;
        info!("Chat {} subscribed ({})", inbound.chat_id, inbound.sender_name);
        self.notifier
            .send(&inbound.chat_id, WELCOME, ParseMode::Html)
            .await
    }

    async fn unsubscribe(&self, inbound: &Inbound) -> Result<(), BotError> {
        self.users.delete(&inbound.chat_id).await?;
        info!("Chat {} unsubscribed", inbound.chat_id);
        self.notifier
            .send(&inbound.chat_id, GOODBYE, ParseMode::Html)
            .await
    }

    /// History is appended only after the send succeeds, so a failed
    /// delivery never burns a quote.
    async fn quote_now(&self, inbound: &Inbound) -> Result<(), BotError> {
        let Some(mut subscriber) = self.users.get(&inbound.chat_id).await? else {
            return Err(BotError::NotRegistered(inbound.chat_id.clone()));
        };

        let catalog = self.quotes.catalog().await?;
        let entry = selector::pick_quote(&catalog, &subscriber.recent_quotes)?;
        let text = render_quote(entry, &self.site_base);
        self.notifier
            .send(&inbound.chat_id, &text, ParseMode::Html)
            .await?;

        subscriber.remember_quote(&entry.id);
        self.users.put(&subscriber).await
    }

    async fn help(&self, inbound: &Inbound) -> Result<(), BotError> {
        self.notifier
            .send(
                &inbound.chat_id,
                &Command::descriptions().to_string(),
                ParseMode::Html,
            )
            .await
    }

    /// Best-effort reply on an error path; a failure here is only logged.
    async fn reply(&self, inbound: &Inbound, text: &str) {
        if let Err(e) = self
            .notifier
            .send(&inbound.chat_id, text, ParseMode::Html)
            .await
        {
            error!("Failed to reply to chat {}: {}", inbound.chat_id, e);
        }
    }
}
