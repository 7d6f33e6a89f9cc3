//! Long-polling update source.
//!
//! Used when no webhook URL is configured. Fetches updates with
//! `getUpdates`, feeds them to the dispatcher in order and advances the
//! offset so each update is handled once. Failures back off exponentially.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Notify, RwLock};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::bot::Dispatcher;
use crate::error::Result;
use crate::models::Update;
use crate::services::TelegramService;

/// Update kinds the bot handles.
pub const ALLOWED_UPDATES: &[&str] = &["message", "callback_query"];

/// First retry delay after a failed poll (seconds)
const INITIAL_BACKOFF_SECS: u64 = 1;

/// Upper bound for the retry delay (seconds)
const MAX_BACKOFF_SECS: u64 = 30;

/// Background long-polling service.
#[derive(Clone)]
pub struct Poller {
    inner: Arc<PollerInner>,
}

struct PollerInner {
    telegram: Arc<TelegramService>,
    dispatcher: Dispatcher,
    timeout_secs: u64,
    offset: RwLock<Option<i64>>,
    running: RwLock<bool>,
    shutdown: Notify,
}

impl Poller {
    pub fn new(telegram: Arc<TelegramService>, dispatcher: Dispatcher, timeout_secs: u64) -> Self {
        Self {
            inner: Arc::new(PollerInner {
                telegram,
                dispatcher,
                timeout_secs,
                offset: RwLock::new(None),
                running: RwLock::new(false),
                shutdown: Notify::new(),
            }),
        }
    }

    /// Start the polling loop in the background.
    /// Returns a handle that can be used to stop it.
    pub async fn start(&self) -> PollerHandle {
        *self.inner.running.write().await = true;

        // A registered webhook makes getUpdates fail with 409
        if let Err(e) = self.inner.telegram.delete_webhook().await {
            warn!(error = %e, "Failed to delete webhook before polling");
        }

        let poller = self.clone();
        let handle = tokio::spawn(async move {
            poller.run_loop().await;
        });

        info!("Using long polling");

        PollerHandle {
            poller: self.clone(),
            handle,
        }
    }

    /// Stop the polling loop.
    ///
    /// An in-flight `getUpdates` is abandoned; a batch already fetched is
    /// dispatched to the end first.
    pub async fn stop(&self) {
        *self.inner.running.write().await = false;
        self.inner.shutdown.notify_one();
    }

    async fn run_loop(&self) {
        let mut backoff = INITIAL_BACKOFF_SECS;

        loop {
            if !*self.inner.running.read().await {
                info!("Poller stopping");
                break;
            }

            let fetched = tokio::select! {
                _ = self.inner.shutdown.notified() => continue,
                result = self.fetch() => result,
            };

            let delay = match fetched {
                Ok(updates) => {
                    let count = self.dispatch_batch(updates).await;
                    if count > 0 {
                        debug!(count, "Dispatched updates");
                    }
                    backoff = INITIAL_BACKOFF_SECS;
                    None
                }
                Err(e) => {
                    error!(error = %e, retry_in_secs = backoff, "getUpdates failed");
                    let delay = backoff;
                    backoff = (backoff * 2).min(MAX_BACKOFF_SECS);
                    Some(delay)
                }
            };

            if let Some(delay) = delay {
                tokio::select! {
                    _ = self.inner.shutdown.notified() => {}
                    _ = sleep(Duration::from_secs(delay)) => {}
                }
            }
        }
    }

    /// Fetch one batch of updates and dispatch them in order.
    ///
    /// Returns the number of updates handled.
    pub async fn poll_once(&self) -> Result<usize> {
        let updates = self.fetch().await?;
        Ok(self.dispatch_batch(updates).await)
    }

    async fn fetch(&self) -> Result<Vec<Update>> {
        let offset = *self.inner.offset.read().await;

        self.inner
            .telegram
            .get_updates(offset, self.inner.timeout_secs, ALLOWED_UPDATES)
            .await
    }

    async fn dispatch_batch(&self, updates: Vec<Update>) -> usize {
        let count = updates.len();
        for update in updates {
            *self.inner.offset.write().await = Some(update.update_id + 1);
            self.inner.dispatcher.dispatch(update).await;
        }
        count
    }

    /// Offset that will be sent with the next `getUpdates`.
    pub async fn next_offset(&self) -> Option<i64> {
        *self.inner.offset.read().await
    }
}

/// Handle to a running poller.
pub struct PollerHandle {
    poller: Poller,
    handle: tokio::task::JoinHandle<()>,
}

impl PollerHandle {
    /// Stop the poller and wait for the loop to exit.
    pub async fn stop(self) {
        self.poller.stop().await;
        if let Err(e) = self.handle.await {
            warn!(error = %e, "Poller task ended abnormally");
        }
    }
}
