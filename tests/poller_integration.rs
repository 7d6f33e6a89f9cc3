//! Integration tests for long polling.

mod common;

use std::time::Duration;

use common::*;
use giftbot::{db, Error};
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer};

async fn mock_updates(server: &MockServer, updates: Value) {
    Mock::given(method("POST"))
        .and(path(api_path("getUpdates")))
        .respond_with(ok(updates))
        .up_to_n_times(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_poll_dispatches_updates_and_advances_offset() {
    let server = MockServer::start().await;
    mock_membership(&server, "left").await;
    mock_outgoing(&server).await;
    mock_updates(
        &server,
        json!([message_update(10, 42, "/start"), message_update(11, 43, "/start")]),
    )
    .await;

    let state = test_state(&server, &[("POLL_TIMEOUT", "0")]).await;
    let poller = state.poller();
    assert_eq!(poller.next_offset().await, None);

    let handled = poller.poll_once().await.unwrap();

    assert_eq!(handled, 2);
    assert_eq!(poller.next_offset().await, Some(12));

    let messages = requests_to(&server, "sendMessage").await;
    let recipients: Vec<_> = messages.iter().map(|m| m["chat_id"].clone()).collect();
    assert_eq!(recipients, vec![json!(42), json!(43)]);

    let polls = requests_to(&server, "getUpdates").await;
    assert_eq!(polls[0]["allowed_updates"], json!(["message", "callback_query"]));
    assert!(polls[0].get("offset").is_none());
}

#[tokio::test]
async fn test_next_poll_sends_offset() {
    let server = MockServer::start().await;
    mock_outgoing(&server).await;
    mock_updates(&server, json!([callback_update(5, 42, "unknown")])).await;
    Mock::given(method("POST"))
        .and(path(api_path("getUpdates")))
        .and(body_partial_json(json!({ "offset": 6 })))
        .respond_with(ok(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let state = test_state(&server, &[("POLL_TIMEOUT", "0")]).await;
    let poller = state.poller();

    assert_eq!(poller.poll_once().await.unwrap(), 1);
    assert_eq!(poller.poll_once().await.unwrap(), 0);
    assert_eq!(poller.next_offset().await, Some(6));
}

#[tokio::test]
async fn test_poll_conflict_surfaces_telegram_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(api_path("getUpdates")))
        .respond_with(api_error(
            409,
            "Conflict: can't use getUpdates method while webhook is active",
        ))
        .mount(&server)
        .await;

    let state = test_state(&server, &[("POLL_TIMEOUT", "0")]).await;
    let poller = state.poller();

    let err = poller.poll_once().await.unwrap_err();

    assert!(matches!(err, Error::Telegram { code: 409, .. }));
    assert_eq!(poller.next_offset().await, None);
}

#[tokio::test]
async fn test_stop_finishes_batch_in_progress() {
    let server = MockServer::start().await;
    mock_membership(&server, "member").await;
    for api_method in ["deleteWebhook", "answerCallbackQuery"] {
        Mock::given(method("POST"))
            .and(path(api_path(api_method)))
            .respond_with(ok(json!(true)))
            .mount(&server)
            .await;
    }
    Mock::given(method("POST"))
        .and(path(api_path("editMessageText")))
        .respond_with(ok(sent_message(42)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(api_path("sendMessage")))
        .respond_with(ok(sent_message(42)).set_delay(Duration::from_secs(1)))
        .mount(&server)
        .await;
    mock_updates(&server, json!([callback_update(1, 42, "claim:gift")])).await;
    Mock::given(method("POST"))
        .and(path(api_path("getUpdates")))
        .respond_with(ok(json!([])).set_delay(Duration::from_millis(100)))
        .mount(&server)
        .await;

    let state = test_state(&server, &[("POLL_TIMEOUT", "0")]).await;
    seed_codes(&state, &["CODE1"]).await;

    let handle = state.poller().start().await;
    tokio::time::sleep(Duration::from_millis(300)).await;
    handle.stop().await;

    // The claim ran to completion: code delivered and user marked
    assert_eq!(db::count_available_codes(&state.db).await.unwrap(), 0);
    assert_eq!(db::count_issued_codes(&state.db).await.unwrap(), 1);
    assert!(db::has_received_gift(&state.db, 42).await.unwrap());
    assert_eq!(requests_to(&server, "sendMessage").await.len(), 1);
    assert_eq!(requests_to(&server, "editMessageText").await.len(), 1);
}
