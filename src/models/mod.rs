//! Data models for giftbot.
//!
//! Telegram Bot API wire types and the gift catalogue.

mod gift;
mod telegram;

pub use gift::*;
pub use telegram::*;
