//! Telegram user database queries.

use crate::Result;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{unix_now, DbPool};

/// User record from the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct BotUser {
    pub user_id: i64,
    pub username: Option<String>,
    pub first_seen: Option<i64>,
}

/// Record a user the first time they are seen.
///
/// Existing rows are left untouched, so the first username and
/// first-seen time stick.
pub async fn upsert_user(pool: &DbPool, user_id: i64, username: Option<&str>) -> Result<()> {
    sqlx::query(
        r#"
        INSERT OR IGNORE INTO users (user_id, username, first_seen)
        VALUES (?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(username)
    .bind(unix_now())
    .execute(pool)
    .await?;

    Ok(())
}

/// Get a user by Telegram id.
pub async fn get_user(pool: &DbPool, user_id: i64) -> Result<Option<BotUser>> {
    let user = sqlx::query_as::<_, BotUser>("SELECT * FROM users WHERE user_id = ?")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    Ok(user)
}

/// Count every user that has interacted with the bot.
pub async fn count_users(pool: &DbPool) -> Result<i64> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;

    Ok(count)
}
