use thiserror::Error;

/// Errors produced by the bot's core components.
#[derive(Debug, Error)]
pub enum BotError {
    /// The quote feed could not be reached or returned a bad payload.
    #[error("catalog fetch failed: {0}")]
    Fetch(String),

    /// Selection ran against a catalog with no entries.
    #[error("quote catalog is empty")]
    EmptyCatalog,

    /// Message delivery failed; carries the transport's error payload.
    #[error("delivery failed: {0}")]
    Delivery(String),

    /// A durable-store operation failed or a stored record is unreadable.
    #[error("storage error: {0}")]
    Storage(String),

    /// The command needs a subscription that does not exist.
    #[error("chat {0} is not subscribed")]
    NotRegistered(String),
}

impl From<rusqlite::Error> for BotError {
    fn from(err: rusqlite::Error) -> Self {
        BotError::Storage(err.to_string())
    }
}
