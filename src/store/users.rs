use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::BotError;
use crate::store::KvStore;

/// How many sent quote ids are remembered per subscriber.
pub const RECENT_QUOTES_CAP: usize = 10;

const KEY_PREFIX: &str = "user:";

/// A subscribed chat and the quotes it was sent recently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscriber {
    /// Telegram chat id; doubles as the delivery address.
    pub id: String,
    /// Display name captured when the chat subscribed.
    pub name: String,
    /// Ids of recently sent quotes, oldest first.
    #[serde(default)]
    pub recent_quotes: Vec<String>,
}

impl Subscriber {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            recent_quotes: Vec::new(),
        }
    }

    /// Append a quote id to the history, evicting the oldest entries so the
    /// list never grows past RECENT_QUOTES_CAP.
    pub fn remember_quote(&mut self, quote_id: &str) {
        self.recent_quotes.push(quote_id.to_string());
        if self.recent_quotes.len() > RECENT_QUOTES_CAP {
            let overflow = self.recent_quotes.len() - RECENT_QUOTES_CAP;
            self.recent_quotes.drain(..overflow);
        }
    }
}

/// Subscriber records, stored as JSON under `user:<chat id>`.
#[derive(Clone)]
pub struct UserStore {
    kv: KvStore,
}

impl UserStore {
    pub fn new(kv: KvStore) -> Self {
        Self { kv }
    }

    fn key(id: &str) -> String {
        format!("{KEY_PREFIX}{id}")
    }

    pub async fn get(&self, id: &str) -> Result<Option<Subscriber>, BotError> {
        let Some(bytes) = self.kv.get(&Self::key(id)).await? else {
            return Ok(None);
        };
        let subscriber = serde_json::from_slice(&bytes)
            .map_err(|e| BotError::Storage(format!("subscriber record {id} is unreadable: {e}")))?;
        Ok(Some(subscriber))
    }

    /// Persist a subscriber, replacing any existing record with the same id.
    pub async fn put(&self, subscriber: &Subscriber) -> Result<(), BotError> {
        let bytes = serde_json::to_vec(subscriber).map_err(|e| {
            BotError::Storage(format!("failed to encode subscriber {}: {}", subscriber.id, e))
        })?;
        self.kv.put(&Self::key(&subscriber.id), &bytes, None).await
    }

    /// Remove a subscriber. Removing an absent record is not an error.
    pub async fn delete(&self, id: &str) -> Result<(), BotError> {
        self.kv.delete(&Self::key(id)).await
    }

    /// Every subscriber, in key order. A record that fails to decode is
    /// logged and skipped rather than failing the whole listing.
    pub async fn list_all(&self) -> Result<Vec<Subscriber>, BotError> {
        let rows = self.kv.scan_prefix(KEY_PREFIX).await?;
        let mut subscribers = Vec::with_capacity(rows.len());
        for (key, bytes) in rows {
            match serde_json::from_slice::<Subscriber>(&bytes) {
                Ok(subscriber) => subscribers.push(subscriber),
                Err(e) => warn!("Skipping unreadable subscriber record {}: {}", key, e),
            }
        }
        Ok(subscribers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> UserStore {
        UserStore::new(KvStore::open_in_memory().unwrap())
    }

    #[tokio::test]
    async fn test_put_get_roundtrip() {
        let users = store();
        let mut subscriber = Subscriber::new("42", "Alice");
        subscriber.remember_quote("q1");
        subscriber.remember_quote("q2");

        users.put(&subscriber).await.unwrap();
        let loaded = users.get("42").await.unwrap().unwrap();
        assert_eq!(loaded, subscriber);
    }

    #[tokio::test]
    async fn test_get_absent_subscriber() {
        let users = store();
        assert!(users.get("42").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let users = store();
        users.put(&Subscriber::new("42", "Alice")).await.unwrap();
        users.delete("42").await.unwrap();
        users.delete("42").await.unwrap();
        assert!(users.get("42").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_remember_quote_caps_history() {
        let mut subscriber = Subscriber::new("42", "Alice");
        for i in 0..13 {
            subscriber.remember_quote(&format!("q{i}"));
        }
        assert_eq!(subscriber.recent_quotes.len(), RECENT_QUOTES_CAP);
        assert_eq!(subscriber.recent_quotes.first().map(String::as_str), Some("q3"));
        assert_eq!(subscriber.recent_quotes.last().map(String::as_str), Some("q12"));
    }

    #[tokio::test]
    async fn test_list_all_returns_every_subscriber() {
        let users = store();
        users.put(&Subscriber::new("1", "Alice")).await.unwrap();
        users.put(&Subscriber::new("2", "Bob")).await.unwrap();
        users.put(&Subscriber::new("3", "Carol")).await.unwrap();

        let all = users.list_all().await.unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn test_list_all_skips_unreadable_records() {
        let kv = KvStore::open_in_memory().unwrap();
        let users = UserStore::new(kv.clone());
        users.put(&Subscriber::new("1", "Alice")).await.unwrap();
        kv.put("user:broken", b"not json", None).await.unwrap();

        let all = users.list_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, "1");
    }

    #[tokio::test]
    async fn test_missing_history_field_decodes_as_empty() {
        let kv = KvStore::open_in_memory().unwrap();
        let users = UserStore::new(kv.clone());
        kv.put("user:7", br#"{"id":"7","name":"Dora"}"#, None)
            .await
            .unwrap();

        let loaded = users.get("7").await.unwrap().unwrap();
        assert!(loaded.recent_quotes.is_empty());
    }
}
