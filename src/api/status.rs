//! Status Routes
//!
//! Health checks, status endpoints, and metrics.
//!
//! Routes:
//! - GET /health - Basic health check
//! - GET /health/ready - Readiness check (database reachable)
//! - GET /health/live - Liveness check (server responding)
//! - GET /status - Giveaway status and counters
//! - GET /metrics - Prometheus metrics endpoint

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::Instant;

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{db, AppState, Result};

// Global metrics (simple counters)
static UPDATE_COUNT: AtomicU64 = AtomicU64::new(0);
static ERROR_COUNT: AtomicU64 = AtomicU64::new(0);
static STAR_GIFT_COUNT: AtomicU64 = AtomicU64::new(0);
static PROMO_CODE_COUNT: AtomicU64 = AtomicU64::new(0);
static STARTUP_TIME: OnceLock<Instant> = OnceLock::new();

/// Initialize startup time. Call this once at server start.
pub fn init_startup_time() {
    let _ = STARTUP_TIME.get_or_init(Instant::now);
}

/// Get uptime in seconds since server start.
fn get_uptime_seconds() -> u64 {
    STARTUP_TIME
        .get()
        .map(|start| start.elapsed().as_secs())
        .unwrap_or(0)
}

/// Increment the handled update counter.
pub fn inc_update_count() {
    UPDATE_COUNT.fetch_add(1, Ordering::Relaxed);
}

/// Increment the failed update counter.
pub fn inc_error_count() {
    ERROR_COUNT.fetch_add(1, Ordering::Relaxed);
}

pub fn inc_star_gifts_sent() {
    STAR_GIFT_COUNT.fetch_add(1, Ordering::Relaxed);
}

pub fn inc_promo_codes_issued() {
    PROMO_CODE_COUNT.fetch_add(1, Ordering::Relaxed);
}

/// Build status routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/ready", get(readiness_check))
        .route("/health/live", get(liveness_check))
        .route("/status", get(system_status))
        .route("/metrics", get(prometheus_metrics))
}

// ============================================================================
// Response Types
// ============================================================================

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

/// Readiness check response.
#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub checks: Vec<DependencyCheck>,
}

#[derive(Debug, Serialize)]
pub struct DependencyCheck {
    pub name: String,
    pub status: HealthStatus,
    pub latency_ms: Option<u64>,
    pub message: Option<String>,
}

/// How updates reach the bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMode {
    Webhook,
    Polling,
}

/// System status response.
#[derive(Debug, Serialize)]
pub struct SystemStatusResponse {
    pub version: String,
    pub uptime_seconds: u64,
    pub mode: DeliveryMode,
    pub webhook_ready: bool,
    pub giveaway: GiveawayStatus,
    pub metrics: BotMetrics,
}

#[derive(Debug, Serialize)]
pub struct GiveawayStatus {
    pub users: i64,
    pub available_codes: i64,
    pub issued_codes: i64,
    pub star_gifts_sent: i64,
    pub only_once: bool,
    pub required_channel: String,
}

#[derive(Debug, Serialize)]
pub struct BotMetrics {
    pub updates_total: u64,
    pub update_errors_total: u64,
    pub star_gifts_sent_total: u64,
    pub promo_codes_issued_total: u64,
}

impl BotMetrics {
    fn snapshot() -> Self {
        Self {
            updates_total: UPDATE_COUNT.load(Ordering::Relaxed),
            update_errors_total: ERROR_COUNT.load(Ordering::Relaxed),
            star_gifts_sent_total: STAR_GIFT_COUNT.load(Ordering::Relaxed),
            promo_codes_issued_total: PROMO_CODE_COUNT.load(Ordering::Relaxed),
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Basic health check.
///
/// GET /health
#[axum::debug_handler]
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: HealthStatus::Healthy,
        version: env!("CARGO_PKG_VERSION").into(),
        timestamp: Utc::now(),
    })
}

/// Readiness check.
///
/// GET /health/ready
///
/// Returns 503 when the database cannot be reached.
#[axum::debug_handler]
async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    let db_check = check_database(&state).await;
    let ready = db_check.status == HealthStatus::Healthy;

    let response = ReadinessResponse {
        ready,
        checks: vec![db_check],
    };

    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(response))
}

/// Liveness check.
///
/// GET /health/live
#[axum::debug_handler]
async fn liveness_check() -> StatusCode {
    StatusCode::OK
}

/// Giveaway status.
///
/// GET /status
#[axum::debug_handler]
async fn system_status(State(state): State<AppState>) -> Result<Json<SystemStatusResponse>> {
    let pool = &state.db;
    let config = &state.config;

    let giveaway = GiveawayStatus {
        users: db::count_users(pool).await?,
        available_codes: db::count_available_codes(pool).await?,
        issued_codes: db::count_issued_codes(pool).await?,
        star_gifts_sent: db::count_gifts_sent(pool).await?,
        only_once: config.giveaway.only_once,
        required_channel: config.giveaway.required_channel.clone(),
    };

    let mode = if config.webhook.enabled() {
        DeliveryMode::Webhook
    } else {
        DeliveryMode::Polling
    };

    Ok(Json(SystemStatusResponse {
        version: env!("CARGO_PKG_VERSION").into(),
        uptime_seconds: get_uptime_seconds(),
        mode,
        webhook_ready: state.is_webhook_ready(),
        giveaway,
        metrics: BotMetrics::snapshot(),
    }))
}

/// Prometheus metrics.
///
/// GET /metrics
#[axum::debug_handler]
async fn prometheus_metrics() -> impl IntoResponse {
    let metrics = BotMetrics::snapshot();

    let body = format!(
        r#"# HELP giftbot_updates_total Total number of Telegram updates handled
# TYPE giftbot_updates_total counter
giftbot_updates_total {}

# HELP giftbot_update_errors_total Total number of updates whose handler failed
# TYPE giftbot_update_errors_total counter
giftbot_update_errors_total {}

# HELP giftbot_star_gifts_sent_total Star Gifts delivered
# TYPE giftbot_star_gifts_sent_total counter
giftbot_star_gifts_sent_total {}

# HELP giftbot_promo_codes_issued_total Promo codes delivered
# TYPE giftbot_promo_codes_issued_total counter
giftbot_promo_codes_issued_total {}

# HELP giftbot_up Whether the service is up
# TYPE giftbot_up gauge
giftbot_up 1
"#,
        metrics.updates_total,
        metrics.update_errors_total,
        metrics.star_gifts_sent_total,
        metrics.promo_codes_issued_total,
    );

    (
        StatusCode::OK,
        [("Content-Type", "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Check database connectivity.
async fn check_database(state: &AppState) -> DependencyCheck {
    let start = Instant::now();
    let result = db::health_check(&state.db).await;
    let latency_ms = start.elapsed().as_millis() as u64;

    match result {
        Ok(()) => DependencyCheck {
            name: "database".into(),
            status: HealthStatus::Healthy,
            latency_ms: Some(latency_ms),
            message: None,
        },
        Err(e) => DependencyCheck {
            name: "database".into(),
            status: HealthStatus::Unhealthy,
            latency_ms: Some(latency_ms),
            message: Some(e.to_string()),
        },
    }
}
