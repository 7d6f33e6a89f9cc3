//! giftbot - Telegram giveaway bot
//!
//! Rewards subscribers of a channel with a Star Gift or a promo code.
//! Receives updates through a webhook when `WEBHOOK_URL` is set and
//! through long polling otherwise.

use std::net::SocketAddr;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use giftbot::api::{self, status};
use giftbot::bot::texts;
use giftbot::models::BotCommand;
use giftbot::{AppState, Config, Error, Result};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "giftbot=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env().inspect_err(|e| tracing::error!("{}", e))?;
    tracing::info!(
        "Starting giftbot on {}:{}",
        config.server.host,
        config.server.port
    );

    // Initialize application state
    let state = AppState::new(config).await?;
    tracing::info!("Application state initialized");

    status::init_startup_time();

    register_commands(&state).await;
    identify_bot(&state).await;

    // Choose update delivery
    let poller = match state.config.webhook.endpoint() {
        Some(url) => {
            let secret = state.config.webhook.secret.as_deref();
            match state.telegram.set_webhook(&url, true, secret).await {
                Ok(()) => {
                    state.set_webhook_ready(true);
                    tracing::info!("Webhook set: {}", url);
                }
                Err(e) => tracing::error!("Failed to set webhook: {}", e),
            }
            None
        }
        None => Some(state.poller().start().await),
    };

    // Build router
    let app = Router::new()
        .merge(api::routes(&state))
        .layer(TraceLayer::new_for_http())
        .with_state(state.clone());

    // Start server
    let addr: SocketAddr = format!("{}:{}", state.config.server.host, state.config.server.port)
        .parse()
        .map_err(|e| Error::Config(format!("Invalid listen address: {}", e)))?;

    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(poller) = poller {
        poller.stop().await;
    }

    tracing::info!("giftbot stopped");

    Ok(())
}

/// Publish the command menu shown by Telegram clients.
async fn register_commands(state: &AppState) {
    let commands = [
        BotCommand::new("start", texts::COMMAND_START),
        BotCommand::new("gift", texts::COMMAND_GIFT),
    ];

    if let Err(e) = state.telegram.set_my_commands(&commands).await {
        tracing::warn!("Failed to register bot commands: {}", e);
    }
}

/// Learn the bot's username so group commands for other bots are skipped.
async fn identify_bot(state: &AppState) {
    match state.telegram.get_me().await {
        Ok(me) => match me.username {
            Some(username) => {
                tracing::info!("Running as @{}", username);
                state.dispatcher.set_bot_username(username);
            }
            None => tracing::warn!("getMe returned no username"),
        },
        Err(e) => tracing::warn!("Failed to fetch bot identity: {}", e),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
