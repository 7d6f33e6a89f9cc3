//! giftbot - Telegram giveaway bot
//!
//! Library exports for testing and external use.

pub mod api;
pub mod bot;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod state;

pub use config::Config;
pub use error::{Error, Result};
pub use state::AppState;
