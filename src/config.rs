//! Configuration management for giftbot.
//!
//! Loads configuration from environment variables (and an optional `.env`
//! file) with support for:
//! - Bot API credentials and endpoint
//! - The channel a user must be subscribed to
//! - Star Gift catalogue and promo code fallback behaviour
//! - Webhook or long-polling update delivery

use std::env;

use crate::models::StarGift;
use crate::{Error, Result};

const DEFAULT_API_URL: &str = "https://api.telegram.org";
const DEFAULT_WEBHOOK_PATH: &str = "/tg/webhook";

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub telegram: TelegramConfig,
    pub giveaway: GiveawayConfig,
    pub webhook: WebhookConfig,
    pub polling: PollingConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub path: String,
}

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub api_url: String,
}

#[derive(Debug, Clone)]
pub struct GiveawayConfig {
    /// Channel the user must be subscribed to (`@name` or `-100...`).
    pub required_channel: String,
    pub gifts: Vec<StarGift>,
    /// Label of the claim button.
    pub gift_name: String,
    /// Reward each user at most once.
    pub only_once: bool,
    /// Fallback admin list used when the `admins` setting is absent.
    pub admins: String,
    pub support_contact: String,
}

impl GiveawayConfig {
    /// Gift sent by `sendGift`, the first entry of the catalogue.
    pub fn default_gift(&self) -> Option<&StarGift> {
        self.gifts.first()
    }
}

#[derive(Debug, Clone)]
pub struct WebhookConfig {
    pub url: Option<String>,
    pub path: String,
    pub secret: Option<String>,
}

impl WebhookConfig {
    /// Full URL registered with `setWebhook`, if webhook mode is enabled.
    pub fn endpoint(&self) -> Option<String> {
        self.url
            .as_ref()
            .map(|url| format!("{}{}", url.trim_end_matches('/'), self.path))
    }

    pub fn enabled(&self) -> bool {
        self.url.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct PollingConfig {
    pub timeout_secs: u64,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string());
        let var_or = |key: &str, default: &str| var(key).unwrap_or_else(|| default.to_string());
        let non_empty = |key: &str| var(key).filter(|v| !v.is_empty());

        let bot_token = var_or("BOT_TOKEN", "");
        if bot_token.is_empty() {
            return Err(Error::Config("BOT_TOKEN is required".into()));
        }

        let channel_id = var_or("CHANNEL_ID", "");
        let required_channel = var("REQUIRE_CHANNEL").unwrap_or_else(|| channel_id.clone());

        let gifts = match non_empty("GIFTS_JSON") {
            Some(raw) => parse_gifts(&raw)?,
            None => Vec::new(),
        };

        let port = var_or("PORT", "8080")
            .parse()
            .map_err(|_| Error::Config("PORT must be a valid port number".into()))?;

        let mut path = var_or("WEBHOOK_PATH", DEFAULT_WEBHOOK_PATH);
        if !path.starts_with('/') {
            path.insert(0, '/');
        }

        Ok(Self {
            server: ServerConfig {
                host: var_or("HOST", "0.0.0.0"),
                port,
            },
            database: DatabaseConfig {
                path: var_or("DB_PATH", "bot.sqlite3"),
            },
            telegram: TelegramConfig {
                bot_token,
                api_url: var_or("TELEGRAM_API_URL", DEFAULT_API_URL)
                    .trim_end_matches('/')
                    .to_string(),
            },
            giveaway: GiveawayConfig {
                required_channel,
                gifts,
                gift_name: lookup("GIFT_NAME").unwrap_or_else(|| "🎁 Подарок".to_string()),
                only_once: var_or("ONLY_ONCE", "1") == "1",
                admins: var_or("ADMINS", ""),
                support_contact: var_or("SUPPORT_CONTACT", "@support"),
            },
            webhook: WebhookConfig {
                url: non_empty("WEBHOOK_URL"),
                path,
                secret: non_empty("WEBHOOK_SECRET"),
            },
            polling: PollingConfig {
                timeout_secs: var_or("POLL_TIMEOUT", "30").parse().unwrap_or(30),
            },
        })
    }
}

/// Parse the `GIFTS_JSON` catalogue.
///
/// Every element must be an object carrying both `id` and `name`.
fn parse_gifts(raw: &str) -> Result<Vec<StarGift>> {
    serde_json::from_str::<Vec<StarGift>>(raw).map_err(|_| {
        Error::Config("GIFTS_JSON must be a JSON list of objects with 'id' and 'name'".into())
    })
}
