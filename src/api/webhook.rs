//! Webhook Route
//!
//! Receives updates pushed by Telegram.
//!
//! Routes:
//! - POST {WEBHOOK_PATH} - Handle a Telegram update
//!
//! Telegram retries any non-2xx answer, so everything past the secret
//! check answers 200, including malformed bodies and failed handlers.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Router,
};
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{debug, warn};

use crate::config::WebhookConfig;
use crate::models::Update;
use crate::{AppState, Error, Result};

/// Header Telegram uses to echo the `secret_token` given to `setWebhook`.
pub const SECRET_TOKEN_HEADER: &str = "x-telegram-bot-api-secret-token";

/// Upper bound on an update body.
const MAX_UPDATE_BYTES: usize = 1024 * 1024;

/// Build the webhook route on the configured path.
pub fn routes(config: &WebhookConfig) -> Router<AppState> {
    Router::new()
        .route(&config.path, post(handle_update))
        .layer(RequestBodyLimitLayer::new(MAX_UPDATE_BYTES))
}

/// Handle a Telegram update.
///
/// POST {WEBHOOK_PATH}
#[axum::debug_handler]
async fn handle_update(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode> {
    if !state.is_webhook_ready() {
        debug!("Webhook not active, dropping update");
        return Ok(StatusCode::OK);
    }

    verify_secret(&state.config.webhook, &headers)?;

    let update: Update = match serde_json::from_slice(&body) {
        Ok(update) => update,
        Err(e) => {
            warn!(error = %e, "Dropping malformed update");
            return Ok(StatusCode::OK);
        }
    };

    state.dispatcher.dispatch(update).await;

    Ok(StatusCode::OK)
}

/// Check the secret token header when a secret is configured.
fn verify_secret(config: &WebhookConfig, headers: &HeaderMap) -> Result<()> {
    let Some(expected) = config.secret.as_deref() else {
        return Ok(());
    };

    let provided = headers
        .get(SECRET_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if constant_time_eq(provided.as_bytes(), expected.as_bytes()) {
        Ok(())
    } else {
        warn!("Webhook request with invalid secret token");
        Err(Error::Unauthenticated)
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
