mod admin;
mod bot;
mod broadcast;
mod catalog;
mod commands;
mod config;
mod error;
mod notifier;
mod scheduler;
mod selector;
mod store;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use teloxide::Bot;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::broadcast::Broadcaster;
use crate::catalog::CachedQuoteFeed;
use crate::commands::CommandHandler;
use crate::config::Config;
use crate::notifier::TelegramNotifier;
use crate::scheduler::Scheduler;
use crate::store::users::UserStore;
use crate::store::KvStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,pagebot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    info!("Loading configuration from: {}", config_path.display());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    info!("Configuration loaded successfully");
    info!("  Feed: {}", config.catalog.feed_url);
    info!("  Broadcast cron: {}", config.broadcast.cron);
    info!("  Database: {}", config.storage.database_path.display());

    let kv = KvStore::open(&config.storage.database_path).context("Failed to open the store")?;
    let users = UserStore::new(kv.clone());

    let bot = Bot::new(&config.telegram.bot_token);
    let notifier = Arc::new(TelegramNotifier::new(bot.clone()));

    let quotes = Arc::new(CachedQuoteFeed::new(
        kv,
        config.catalog.feed_url.clone(),
        Duration::from_secs(config.catalog.cache_ttl_hours * 3600),
    ));

    let broadcaster = Arc::new(Broadcaster::new(
        users.clone(),
        quotes.clone(),
        notifier.clone(),
        config.catalog.site_base_url.clone(),
    ));

    // Schedule the recurring broadcast
    let sched = Scheduler::new().await?;
    scheduler::register_daily_broadcast(&sched, broadcaster.clone(), &config.broadcast.cron).await?;
    sched.start().await?;

    // Optional manual trigger endpoint
    if let Some(admin_config) = config.admin.clone() {
        let broadcaster = broadcaster.clone();
        tokio::spawn(async move {
            let result =
                admin::serve(&admin_config.listen_addr, admin_config.bearer_token, broadcaster)
                    .await;
            if let Err(e) = result {
                error!("Admin endpoint failed: {:#}", e);
            }
        });
    }

    let handler = Arc::new(CommandHandler::new(
        users,
        quotes,
        notifier,
        config.catalog.site_base_url.clone(),
    ));

    info!("Bot is starting...");
    bot::run(bot, handler).await?;

    Ok(())
}
