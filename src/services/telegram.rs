//! Telegram Bot API client.
//!
//! Every method is a `POST {api_url}/bot{token}/{method}` with a JSON body
//! (multipart for documents). Responses are unwrapped from the `ok/result`
//! envelope; `ok=false` becomes [`Error::Telegram`].

use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::config::TelegramConfig;
use crate::error::{Error, Result};
use crate::models::{ApiResponse, BotCommand, ChatMember, InlineKeyboardMarkup, Update, User};

/// Default request timeout for regular calls.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Extra slack on top of the long-poll timeout for `getUpdates`.
const LONG_POLL_SLACK_SECS: u64 = 10;

/// Service for Telegram Bot API operations.
#[derive(Clone)]
pub struct TelegramService {
    client: Client,
    base_url: String,
}

impl TelegramService {
    /// Create a new Telegram service.
    pub fn new(config: &TelegramConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(concat!("giftbot/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: format!("{}/bot{}", config.api_url, config.bot_token),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{}", self.base_url, method)
    }

    /// Call a Bot API method with a JSON body.
    async fn call<B, T>(&self, method: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.call_with_timeout(method, body, None).await
    }

    async fn call_with_timeout<B, T>(
        &self,
        method: &str,
        body: &B,
        timeout: Option<Duration>,
    ) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        debug!(method, "Bot API call");

        let mut request = self.client.post(self.method_url(method)).json(body);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        // The URL carries the bot token, keep it out of error messages
        let response = request.send().await.map_err(|e| e.without_url())?;
        Self::unwrap_response(method, response).await
    }

    async fn unwrap_response<T: DeserializeOwned>(
        method: &str,
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();
        let text = response.text().await.map_err(|e| e.without_url())?;

        let envelope: ApiResponse<T> = serde_json::from_str(&text).map_err(|e| {
            Error::Http(format!(
                "{} returned {} with unreadable body: {}",
                method, status, e
            ))
        })?;

        if !envelope.ok {
            return Err(Error::Telegram {
                code: envelope.error_code.unwrap_or_else(|| i64::from(status.as_u16())),
                description: envelope
                    .description
                    .unwrap_or_else(|| "no description".to_string()),
            });
        }

        envelope
            .result
            .ok_or_else(|| Error::Http(format!("{} returned ok without result", method)))
    }

    /// The bot's own user record.
    pub async fn get_me(&self) -> Result<User> {
        self.call("getMe", &json!({})).await
    }

    /// Look up a user's membership in a chat.
    pub async fn get_chat_member(&self, chat_id: &str, user_id: i64) -> Result<ChatMember> {
        self.call(
            "getChatMember",
            &json!({ "chat_id": chat_id, "user_id": user_id }),
        )
        .await
    }

    /// Send a text message.
    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        reply_markup: Option<&InlineKeyboardMarkup>,
        parse_mode: Option<&str>,
    ) -> Result<()> {
        let mut body = json!({ "chat_id": chat_id, "text": text });
        if let Some(markup) = reply_markup {
            body["reply_markup"] = serde_json::to_value(markup)?;
        }
        if let Some(mode) = parse_mode {
            body["parse_mode"] = json!(mode);
        }

        let _: Value = self.call("sendMessage", &body).await?;
        Ok(())
    }

    /// Replace the text (and keyboard) of a message the bot sent.
    pub async fn edit_message_text(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
        reply_markup: Option<&InlineKeyboardMarkup>,
    ) -> Result<()> {
        let mut body = json!({
            "chat_id": chat_id,
            "message_id": message_id,
            "text": text,
        });
        if let Some(markup) = reply_markup {
            body["reply_markup"] = serde_json::to_value(markup)?;
        }

        let _: Value = self.call("editMessageText", &body).await?;
        Ok(())
    }

    /// Acknowledge a callback query so the client stops its spinner.
    pub async fn answer_callback_query(&self, callback_query_id: &str) -> Result<()> {
        let _: Value = self
            .call(
                "answerCallbackQuery",
                &json!({ "callback_query_id": callback_query_id }),
            )
            .await?;
        Ok(())
    }

    /// Send a Star Gift to a user.
    pub async fn send_gift(&self, user_id: i64, gift_id: &str, text: Option<&str>) -> Result<bool> {
        let mut body = json!({ "user_id": user_id, "gift_id": gift_id });
        if let Some(text) = text {
            body["text"] = json!(text);
        }

        self.call("sendGift", &body).await
    }

    /// Upload a document built in memory.
    pub async fn send_document(&self, chat_id: i64, filename: &str, bytes: Vec<u8>) -> Result<()> {
        let form = Form::new().text("chat_id", chat_id.to_string()).part(
            "document",
            Part::bytes(bytes).file_name(filename.to_string()),
        );

        let response = self
            .client
            .post(self.method_url("sendDocument"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| e.without_url())?;

        let _: Value = Self::unwrap_response("sendDocument", response).await?;
        Ok(())
    }

    /// Register the command menu.
    pub async fn set_my_commands(&self, commands: &[BotCommand]) -> Result<()> {
        let _: Value = self
            .call("setMyCommands", &json!({ "commands": commands }))
            .await?;
        Ok(())
    }

    /// Point Telegram at our webhook endpoint.
    pub async fn set_webhook(
        &self,
        url: &str,
        drop_pending_updates: bool,
        secret_token: Option<&str>,
    ) -> Result<()> {
        let mut body = json!({
            "url": url,
            "drop_pending_updates": drop_pending_updates,
            "allowed_updates": ["message", "callback_query"],
        });
        if let Some(secret) = secret_token {
            body["secret_token"] = json!(secret);
        }

        let _: Value = self.call("setWebhook", &body).await?;
        Ok(())
    }

    /// Remove a webhook so `getUpdates` can be used.
    pub async fn delete_webhook(&self) -> Result<()> {
        let _: Value = self.call("deleteWebhook", &json!({})).await?;
        Ok(())
    }

    /// Long-poll for updates newer than `offset`.
    pub async fn get_updates(
        &self,
        offset: Option<i64>,
        timeout_secs: u64,
        allowed_updates: &[&str],
    ) -> Result<Vec<Update>> {
        let mut body = json!({
            "timeout": timeout_secs,
            "allowed_updates": allowed_updates,
        });
        if let Some(offset) = offset {
            body["offset"] = json!(offset);
        }

        let timeout = Duration::from_secs(timeout_secs + LONG_POLL_SLACK_SECS);
        self.call_with_timeout("getUpdates", &body, Some(timeout))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_url_embeds_token() {
        let service = TelegramService::new(&TelegramConfig {
            bot_token: "123:abc".into(),
            api_url: "http://localhost:9999".into(),
        })
        .unwrap();

        assert_eq!(
            service.method_url("getMe"),
            "http://localhost:9999/bot123:abc/getMe"
        );
    }
}
