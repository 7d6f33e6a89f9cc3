//! Database layer for giftbot.
//!
//! Provides SQLite connection pooling and query modules
//! for users, promo codes and settings.

mod pool;
mod promo_codes;
mod settings;
mod users;

pub use pool::*;
pub use promo_codes::*;
pub use settings::*;
pub use users::*;

use crate::Result;
use tracing::info;

/// Type alias for the SQLite connection pool.
pub type DbPool = sqlx::SqlitePool;

/// Initialize the database connection pool.
///
/// Creates parent directories if needed. `:memory:` databases get a
/// single-connection pool so every query sees the same data.
pub async fn init_pool(path: &str) -> Result<DbPool> {
    let config = if path == ":memory:" {
        PoolConfig::test()
    } else {
        PoolConfig::default()
    };

    let pool = create_pool_with_config(path, config).await?;

    info!("Database pool initialized: {}", path);

    Ok(pool)
}

/// Initialize the database schema.
///
/// Applies the complete schema from schema.sql. Uses IF NOT EXISTS
/// clauses so it's safe to run multiple times.
pub async fn initialize_schema(pool: &DbPool) -> Result<()> {
    info!("Initializing database schema");

    apply_schema(pool, include_str!("../../schema.sql")).await?;

    info!("Database schema initialized successfully");

    Ok(())
}

/// Execute a multi-statement SQL script.
///
/// `--` comments are removed before splitting on `;`, so comment text
/// never ends up inside a statement.
async fn apply_schema(pool: &DbPool, sql: &str) -> Result<()> {
    let stripped: String = sql
        .lines()
        .map(|line| line.split_once("--").map_or(line, |(code, _)| code))
        .collect::<Vec<_>>()
        .join("\n");

    for statement in stripped.split(';') {
        let statement = statement.trim();
        if statement.is_empty() {
            continue;
        }
        sqlx::query(statement).execute(pool).await?;
    }

    Ok(())
}

/// Current unix time in seconds, the unit every timestamp column uses.
pub(crate) fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}
