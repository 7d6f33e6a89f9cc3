//! API Routes for giftbot
//!
//! This module combines all HTTP routes into a single router.

pub mod status;
pub mod webhook;

use axum::Router;

use crate::AppState;

/// Build the complete HTTP router.
///
/// Route structure:
/// - {WEBHOOK_PATH} - Telegram webhook (secret-token verified)
/// - /health, /status, /metrics - Health checks (public)
pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        // Health and status endpoints (public)
        .merge(status::routes())
        // Telegram update delivery
        .merge(webhook::routes(&state.config.webhook))
}
