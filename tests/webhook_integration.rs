//! Integration tests for webhook handling and status routes.
//!
//! Posts Telegram updates to the HTTP router and checks which Bot API
//! calls the bot made in response.

mod common;

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::Router;
use axum_test::TestServer;
use common::*;
use giftbot::api::{self, webhook::SECRET_TOKEN_HEADER};
use giftbot::{db, AppState};
use serde_json::{json, Value};
use wiremock::MockServer;

const WEBHOOK: &str = "/tg/webhook";

// ============================================================================
// Test Setup Helpers
// ============================================================================

/// Build a test server in webhook mode.
async fn build_test_app(extra: &[(&str, &str)]) -> (TestServer, AppState, MockServer) {
    let mock = MockServer::start().await;
    let mut vars = vec![("WEBHOOK_URL", "https://bot.example.com")];
    vars.extend_from_slice(extra);

    let state = test_state(&mock, &vars).await;
    state.set_webhook_ready(true);

    let app = Router::new()
        .merge(api::routes(&state))
        .with_state(state.clone());
    let server = TestServer::new(app).expect("Failed to create test server");

    (server, state, mock)
}

fn secret_header(value: &'static str) -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static(SECRET_TOKEN_HEADER),
        HeaderValue::from_static(value),
    )
}

// ============================================================================
// Webhook Delivery Tests
// ============================================================================

#[tokio::test]
async fn test_update_ignored_until_webhook_ready() {
    let (server, state, mock) = build_test_app(&[]).await;
    state.set_webhook_ready(false);

    let response = server
        .post(WEBHOOK)
        .json(&message_update(1, 42, "/start"))
        .await;

    response.assert_status_ok();
    assert!(mock.received_requests().await.unwrap_or_default().is_empty());
    assert!(db::get_user(&state.db, 42).await.unwrap().is_none());
}

#[tokio::test]
async fn test_secret_token_is_enforced() {
    let (server, _state, mock) = build_test_app(&[("WEBHOOK_SECRET", "s3cret")]).await;
    mock_membership(&mock, "left").await;
    mock_outgoing(&mock).await;

    let response = server
        .post(WEBHOOK)
        .json(&message_update(1, 42, "/start"))
        .await;
    response.assert_status_unauthorized();

    let (name, value) = secret_header("wrong");
    let response = server
        .post(WEBHOOK)
        .add_header(name, value)
        .json(&message_update(2, 42, "/start"))
        .await;
    response.assert_status_unauthorized();

    let (name, value) = secret_header("s3cret");
    let response = server
        .post(WEBHOOK)
        .add_header(name, value)
        .json(&message_update(3, 42, "/start"))
        .await;
    response.assert_status_ok();
    assert_eq!(requests_to(&mock, "sendMessage").await.len(), 1);
}

#[tokio::test]
async fn test_malformed_update_is_acknowledged() {
    let (server, _state, _mock) = build_test_app(&[]).await;

    let response = server.post(WEBHOOK).text("{not json").await;

    response.assert_status_ok();
}

#[tokio::test]
async fn test_start_prompts_unsubscribed_user() {
    let (server, state, mock) = build_test_app(&[]).await;
    mock_membership(&mock, "left").await;
    mock_outgoing(&mock).await;

    server
        .post(WEBHOOK)
        .json(&message_update(1, 42, "/start"))
        .await
        .assert_status_ok();

    let messages = requests_to(&mock, "sendMessage").await;
    assert_eq!(messages.len(), 1);
    let text = messages[0]["text"].as_str().unwrap();
    assert!(text.contains(CHANNEL));

    let keyboard = &messages[0]["reply_markup"]["inline_keyboard"];
    assert_eq!(keyboard.as_array().unwrap().len(), 2);
    assert_eq!(keyboard[0][0]["callback_data"], "claim:gift");
    assert_eq!(keyboard[1][0]["callback_data"], "check_sub");

    let user = db::get_user(&state.db, 42).await.unwrap().unwrap();
    assert_eq!(user.username.as_deref(), Some("tester"));
}

#[tokio::test]
async fn test_start_offers_gift_to_subscriber() {
    let (server, _state, mock) = build_test_app(&[]).await;
    mock_membership(&mock, "member").await;
    mock_outgoing(&mock).await;

    server
        .post(WEBHOOK)
        .json(&message_update(1, 42, "/start"))
        .await
        .assert_status_ok();

    let messages = requests_to(&mock, "sendMessage").await;
    assert_eq!(
        messages[0]["text"],
        "Спасибо! Вы подписаны. Можно получить подарок."
    );
    assert_eq!(
        messages[0]["reply_markup"]["inline_keyboard"]
            .as_array()
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test]
async fn test_gift_command_sets_waiting_state() {
    let (server, state, mock) = build_test_app(&[]).await;
    mock_membership(&mock, "member").await;
    mock_outgoing(&mock).await;

    server
        .post(WEBHOOK)
        .json(&message_update(1, 42, "/gift"))
        .await
        .assert_status_ok();

    assert!(state.dialogues.get(42).await.is_some());

    server
        .post(WEBHOOK)
        .json(&message_update(2, 42, "/start"))
        .await
        .assert_status_ok();

    assert!(state.dialogues.get(42).await.is_none());
}

#[tokio::test]
async fn test_claim_button_edits_message() {
    let (server, state, mock) = build_test_app(&[]).await;
    mock_membership(&mock, "member").await;
    mock_outgoing(&mock).await;
    seed_codes(&state, &["CODE1"]).await;

    server
        .post(WEBHOOK)
        .json(&callback_update(1, 42, "claim:gift"))
        .await
        .assert_status_ok();

    assert_eq!(requests_to(&mock, "answerCallbackQuery").await.len(), 1);

    let edits = requests_to(&mock, "editMessageText").await;
    assert_eq!(edits.len(), 1);
    assert_eq!(edits[0]["message_id"], 7);
    assert!(edits[0]["text"].as_str().unwrap().starts_with("✅"));

    // Second press: already rewarded
    server
        .post(WEBHOOK)
        .json(&callback_update(2, 42, "claim:gift"))
        .await
        .assert_status_ok();

    let edits = requests_to(&mock, "editMessageText").await;
    assert_eq!(edits[1]["text"], "Вы уже получали подарок. Спасибо!");
}

#[tokio::test]
async fn test_check_subscription_button() {
    let (server, _state, mock) = build_test_app(&[]).await;
    mock_membership(&mock, "left").await;
    mock_outgoing(&mock).await;

    server
        .post(WEBHOOK)
        .json(&callback_update(1, 42, "check_sub"))
        .await
        .assert_status_ok();

    let edits = requests_to(&mock, "editMessageText").await;
    assert_eq!(
        edits[0]["text"],
        "Подписка не найдена. Подпишитесь на канал и повторите попытку."
    );
    assert_eq!(
        edits[0]["reply_markup"]["inline_keyboard"][1][0]["callback_data"],
        "check_sub"
    );
}

// ============================================================================
// Admin Command Tests
// ============================================================================

#[tokio::test]
async fn test_balance_for_admin_only() {
    let (server, state, mock) = build_test_app(&[]).await;
    mock_outgoing(&mock).await;
    seed_codes(&state, &["A", "B"]).await;

    server
        .post(WEBHOOK)
        .json(&message_update(1, 7, "/balance"))
        .await
        .assert_status_ok();
    assert!(requests_to(&mock, "sendMessage").await.is_empty());

    server
        .post(WEBHOOK)
        .json(&message_update(2, ADMIN_ID, "/balance"))
        .await
        .assert_status_ok();

    let messages = requests_to(&mock, "sendMessage").await;
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["text"], "Промокодов осталось: 2");
}

#[tokio::test]
async fn test_add_then_export() {
    let (server, _state, mock) = build_test_app(&[]).await;
    mock_outgoing(&mock).await;

    server
        .post(WEBHOOK)
        .json(&message_update(1, ADMIN_ID, "/add X1, X2\nX3"))
        .await
        .assert_status_ok();

    let messages = requests_to(&mock, "sendMessage").await;
    assert_eq!(messages[0]["text"], "Добавлено кодов: 3");

    server
        .post(WEBHOOK)
        .json(&message_update(2, ADMIN_ID, "/export 2"))
        .await
        .assert_status_ok();

    let uploads: Vec<_> = mock
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|req| req.url.path() == api_path("sendDocument"))
        .collect();
    assert_eq!(uploads.len(), 1);
    let body = String::from_utf8_lossy(&uploads[0].body);
    assert!(body.contains("promo_codes.txt"));
    assert!(body.contains("X1\nX2"));
    assert!(!body.contains("X3"));
}

#[tokio::test]
async fn test_export_with_empty_pool() {
    let (server, _state, mock) = build_test_app(&[]).await;
    mock_outgoing(&mock).await;

    server
        .post(WEBHOOK)
        .json(&message_update(1, ADMIN_ID, "/export"))
        .await
        .assert_status_ok();

    let messages = requests_to(&mock, "sendMessage").await;
    assert_eq!(messages[0]["text"], "Нет доступных кодов.");
}

#[tokio::test]
async fn test_add_without_codes_shows_usage() {
    let (server, _state, mock) = build_test_app(&[]).await;
    mock_outgoing(&mock).await;

    server
        .post(WEBHOOK)
        .json(&message_update(1, ADMIN_ID, "/add"))
        .await
        .assert_status_ok();

    let messages = requests_to(&mock, "sendMessage").await;
    assert!(messages[0]["text"].as_str().unwrap().starts_with("Использование: /add"));
}

#[tokio::test]
async fn test_promo_ignored_in_group_chat() {
    let (server, state, mock) = build_test_app(&[]).await;
    mock_outgoing(&mock).await;
    seed_codes(&state, &["GROUPCODE"]).await;

    let mut update = message_update(1, ADMIN_ID, "/promo\n55: GROUPCODE");
    update["message"]["chat"] = json!({ "id": -100123, "type": "group", "title": "Team" });

    server.post(WEBHOOK).json(&update).await.assert_status_ok();

    assert!(requests_to(&mock, "sendMessage").await.is_empty());
    assert_eq!(db::count_issued_codes(&state.db).await.unwrap(), 0);

    // Same command in a private chat is handled
    server
        .post(WEBHOOK)
        .json(&message_update(2, ADMIN_ID, "/promo"))
        .await
        .assert_status_ok();
    let messages = requests_to(&mock, "sendMessage").await;
    assert_eq!(messages.len(), 1);
    assert!(messages[0]["text"].as_str().unwrap().contains("user_id: CODE"));
}

#[tokio::test]
async fn test_commands_for_other_bots_are_ignored() {
    let (server, state, mock) = build_test_app(&[]).await;
    mock_membership(&mock, "member").await;
    mock_outgoing(&mock).await;
    state.dispatcher.set_bot_username("gift_bot");

    server
        .post(WEBHOOK)
        .json(&message_update(1, 42, "/start@other_bot"))
        .await
        .assert_status_ok();
    assert!(requests_to(&mock, "sendMessage").await.is_empty());

    server
        .post(WEBHOOK)
        .json(&message_update(2, 42, "/start@Gift_Bot"))
        .await
        .assert_status_ok();
    assert_eq!(requests_to(&mock, "sendMessage").await.len(), 1);
}

// ============================================================================
// Status Endpoint Tests
// ============================================================================

#[tokio::test]
async fn test_health_check_returns_healthy() {
    let (server, _state, _mock) = build_test_app(&[]).await;

    let response = server.get("/health").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_readiness_checks_database() {
    let (server, _state, _mock) = build_test_app(&[]).await;

    let response = server.get("/health/ready").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["ready"], true);
    assert_eq!(body["checks"][0]["name"], "database");
}

#[tokio::test]
async fn test_status_reports_pool() {
    let (server, state, _mock) = build_test_app(&[]).await;
    seed_codes(&state, &["A", "B", "C"]).await;
    db::take_code_for_user(&state.db, 1).await.unwrap();

    let response = server.get("/status").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["mode"], "webhook");
    assert_eq!(body["webhook_ready"], true);
    assert_eq!(body["giveaway"]["available_codes"], 2);
    assert_eq!(body["giveaway"]["issued_codes"], 1);
    assert_eq!(body["giveaway"]["required_channel"], CHANNEL);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let (server, _state, _mock) = build_test_app(&[]).await;

    let response = server.get("/metrics").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert!(response.text().contains("giftbot_updates_total"));
}
