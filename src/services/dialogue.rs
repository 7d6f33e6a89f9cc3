//! In-memory per-user dialogue state.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

/// Where a user is in the conversation with the bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogueState {
    /// The user asked for a gift with `/gift` and has not claimed it yet.
    WaitingClaim,
}

/// Dialogue state keyed by Telegram user id. Lost on restart.
#[derive(Clone, Default)]
pub struct DialogueStore {
    states: Arc<RwLock<HashMap<i64, DialogueState>>>,
}

impl DialogueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, user_id: i64) -> Option<DialogueState> {
        self.states.read().await.get(&user_id).copied()
    }

    pub async fn set(&self, user_id: i64, state: DialogueState) {
        self.states.write().await.insert(user_id, state);
    }

    pub async fn clear(&self, user_id: i64) {
        self.states.write().await.remove(&user_id);
    }
}
