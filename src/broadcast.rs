use std::sync::Arc;

use serde::Serialize;
use teloxide::types::ParseMode;
use tracing::{error, info};

use crate::catalog::{Catalog, QuoteSource};
use crate::error::BotError;
use crate::notifier::{render_quote, Notifier};
use crate::selector;
use crate::store::users::{Subscriber, UserStore};

/// Outcome counts for one broadcast run.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct BroadcastReport {
    pub subscribers: usize,
    pub delivered: usize,
    pub failed: usize,
}

/// The recurring fan-out: one quote to every subscriber.
pub struct Broadcaster {
    users: UserStore,
    quotes: Arc<dyn QuoteSource>,
    notifier: Arc<dyn Notifier>,
    site_base: String,
}

impl Broadcaster {
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

    /// Run one broadcast. Never fails: a run-level problem is logged and
    /// cuts the run short, a per-subscriber problem is logged and counted,
    /// and the rest of the fan-out continues.
    pub async fn run(&self) -> BroadcastReport {
        let subscribers = match self.users.list_all().await {
            Ok(subscribers) => subscribers,
            Err(e) => {
                error!("Broadcast aborted, could not list subscribers: {}", e);
                return BroadcastReport::default();
            }
        };

        if subscribers.is_empty() {
            info!("Broadcast skipped: no subscribers");
            return BroadcastReport::default();
        }

        // The catalog is fetched once per run. Without it there is nothing
        // to send, so the run ends before any delivery is attempted.
        let catalog = match self.quotes.catalog().await {
            Ok(catalog) => catalog,
            Err(e) => {
                error!("Broadcast aborted, catalog unavailable: {}", e);
                return BroadcastReport {
                    subscribers: subscribers.len(),
                    ..Default::default()
                };
            }
        };

        let mut report = BroadcastReport {
            subscribers: subscribers.len(),
            ..Default::default()
        };

        for subscriber in subscribers {
            let chat_id = subscriber.id.clone();
            match self.send_quote(&catalog, subscriber).await {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    report.failed += 1;
                    error!("Broadcast to chat {} failed: {}", chat_id, e);
                }
            }
        }

        info!(
            "Broadcast finished: {} delivered, {} failed, {} subscribers",
            report.delivered, report.failed, report.subscribers
        );
        report
    }

    /// Deliver to one subscriber; history is persisted only after a
    /// successful send.
    async fn send_quote(
        &self,
        catalog: &Catalog,
        mut subscriber: Subscriber,
    ) -> Result<(), BotError> {
        let entry = selector::pick_quote(catalog, &subscriber.recent_quotes)?;
        let text = render_quote(entry, &self.site_base);
        self.notifier
            .send(&subscriber.id, &text, ParseMode::Html)
            .await?;

        subscriber.remember_quote(&entry.id);
        self.users.put(&subscriber).await
    }
}
