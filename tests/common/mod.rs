//! Common test utilities and helpers.
//!
//! Every test talks to a wiremock server standing in for the Telegram Bot
//! API and an in-memory SQLite database.

#![allow(dead_code)]

use std::collections::HashMap;

use giftbot::{db, AppState, Config};
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const BOT_TOKEN: &str = "123456:TEST";
pub const CHANNEL: &str = "@giveaway_channel";
pub const ADMIN_ID: i64 = 1000;

/// Path of a Bot API method on the mock server.
pub fn api_path(api_method: &str) -> String {
    format!("/bot{}/{}", BOT_TOKEN, api_method)
}

/// Build configuration pointing at the mock server.
pub fn test_config(server: &MockServer, extra: &[(&str, &str)]) -> Config {
    let mut vars: HashMap<String, String> = HashMap::from([
        ("BOT_TOKEN".to_string(), BOT_TOKEN.to_string()),
        ("TELEGRAM_API_URL".to_string(), server.uri()),
        ("CHANNEL_ID".to_string(), CHANNEL.to_string()),
        ("ADMINS".to_string(), ADMIN_ID.to_string()),
        ("DB_PATH".to_string(), ":memory:".to_string()),
    ]);
    for (key, value) in extra {
        vars.insert(key.to_string(), value.to_string());
    }
    Config::from_lookup(|key| vars.get(key).cloned()).expect("valid test config")
}

/// Build application state backed by a fresh in-memory database.
pub async fn test_state(server: &MockServer, extra: &[(&str, &str)]) -> AppState {
    let config = test_config(server, extra);
    let pool = db::init_pool(":memory:").await.unwrap();
    db::initialize_schema(&pool).await.unwrap();
    AppState::with_pool(config, pool).unwrap()
}

/// Seed the promo code pool.
pub async fn seed_codes(state: &AppState, codes: &[&str]) {
    let codes: Vec<String> = codes.iter().map(|c| c.to_string()).collect();
    db::add_codes(&state.db, &codes).await.unwrap();
}

/// Successful Bot API envelope.
pub fn ok(result: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "ok": true, "result": result }))
}

/// Failed Bot API envelope.
pub fn api_error(code: u16, description: &str) -> ResponseTemplate {
    ResponseTemplate::new(code).set_body_json(json!({
        "ok": false,
        "error_code": code,
        "description": description,
    }))
}

/// A message object as returned by sendMessage/editMessageText.
pub fn sent_message(chat_id: i64) -> Value {
    json!({
        "message_id": 99,
        "chat": { "id": chat_id, "type": "private" },
        "date": 1700000000,
        "text": "ok"
    })
}

/// Answer getChatMember with the given status.
pub async fn mock_membership(server: &MockServer, status: &str) {
    Mock::given(method("POST"))
        .and(path(api_path("getChatMember")))
        .respond_with(ok(json!({
            "status": status,
            "user": { "id": 42, "is_bot": false, "first_name": "Test" }
        })))
        .mount(server)
        .await;
}

/// Accept every outgoing message and acknowledgement.
pub async fn mock_outgoing(server: &MockServer) {
    for api_method in ["sendMessage", "editMessageText"] {
        Mock::given(method("POST"))
            .and(path(api_path(api_method)))
            .respond_with(ok(sent_message(42)))
            .mount(server)
            .await;
    }
    for api_method in ["answerCallbackQuery", "sendDocument"] {
        Mock::given(method("POST"))
            .and(path(api_path(api_method)))
            .respond_with(ok(json!(true)))
            .mount(server)
            .await;
    }
}

/// JSON bodies of every request made to a Bot API method.
pub async fn requests_to(server: &MockServer, api_method: &str) -> Vec<Value> {
    let wanted = api_path(api_method);
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|req| req.url.path() == wanted)
        .map(|req| serde_json::from_slice(&req.body).unwrap_or(Value::Null))
        .collect()
}

/// A private text message update.
pub fn message_update(update_id: i64, user_id: i64, text: &str) -> Value {
    json!({
        "update_id": update_id,
        "message": {
            "message_id": update_id,
            "from": { "id": user_id, "is_bot": false, "first_name": "Test", "username": "tester" },
            "chat": { "id": user_id, "type": "private" },
            "date": 1700000000,
            "text": text
        }
    })
}

/// A callback query update for a button press.
pub fn callback_update(update_id: i64, user_id: i64, data: &str) -> Value {
    json!({
        "update_id": update_id,
        "callback_query": {
            "id": format!("cb-{}", update_id),
            "from": { "id": user_id, "is_bot": false, "first_name": "Test", "username": "tester" },
            "message": {
                "message_id": 7,
                "chat": { "id": user_id, "type": "private" },
                "date": 1700000000,
                "text": "Спасибо! Вы подписаны. Можно получить подарок."
            },
            "chat_instance": "1",
            "data": data
        }
    })
}
