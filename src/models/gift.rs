//! Star Gift catalogue entries.

use serde::{Deserialize, Serialize};

/// A Telegram Star Gift the bot can send with `sendGift`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StarGift {
    pub id: String,
    pub name: String,
}
