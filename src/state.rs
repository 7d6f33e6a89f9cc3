//! Application state for giftbot.
//!
//! Contains the shared state that is passed to all handlers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::bot::Dispatcher;
use crate::config::Config;
use crate::db::DbPool;
use crate::services::{DialogueStore, GiveawayService, Poller, TelegramService};
use crate::Result;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Loaded configuration.
    pub config: Arc<Config>,
    /// Database connection pool.
    pub db: DbPool,
    /// Telegram Bot API client.
    pub telegram: Arc<TelegramService>,
    /// Giveaway rules and code pool management.
    pub giveaway: GiveawayService,
    /// Per-user dialogue state.
    pub dialogues: DialogueStore,
    /// Update router shared by the webhook and the poller.
    pub dispatcher: Dispatcher,
    /// Set once `setWebhook` succeeded; the webhook route drops updates
    /// until then.
    webhook_ready: Arc<AtomicBool>,
}

impl AppState {
    /// Create a new application state, opening the configured database.
    pub async fn new(config: Config) -> Result<Self> {
        let db = crate::db::init_pool(&config.database.path).await?;
        crate::db::initialize_schema(&db).await?;

        Self::with_pool(config, db)
    }

    /// Create application state around an existing pool.
    pub fn with_pool(config: Config, db: DbPool) -> Result<Self> {
        let telegram = Arc::new(TelegramService::new(&config.telegram)?);
        let giveaway = GiveawayService::new(db.clone(), telegram.clone(), config.giveaway.clone());
        let dialogues = DialogueStore::new();
        let dispatcher = Dispatcher::new(telegram.clone(), giveaway.clone(), dialogues.clone());

        Ok(Self {
            config: Arc::new(config),
            db,
            telegram,
            giveaway,
            dialogues,
            dispatcher,
            webhook_ready: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn is_webhook_ready(&self) -> bool {
        self.webhook_ready.load(Ordering::Acquire)
    }

    pub fn set_webhook_ready(&self, ready: bool) {
        self.webhook_ready.store(ready, Ordering::Release);
    }

    /// Long-polling source wired to this state's dispatcher.
    pub fn poller(&self) -> Poller {
        Poller::new(
            self.telegram.clone(),
            self.dispatcher.clone(),
            self.config.polling.timeout_secs,
        )
    }
}
