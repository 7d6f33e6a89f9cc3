//! Key/value settings queries.
//!
//! Besides free-form settings such as `admins`, the table records which
//! users were already rewarded.

use crate::Result;

use super::{unix_now, DbPool};

/// Setting holding the comma-separated admin id list.
pub const ADMINS_KEY: &str = "admins";

fn gift_received_key(user_id: i64) -> String {
    format!("gift_received_{}", user_id)
}

fn gift_sent_key(user_id: i64) -> String {
    format!("gift_sent_to_{}", user_id)
}

/// Get a setting value.
pub async fn get_setting(pool: &DbPool, key: &str) -> Result<Option<String>> {
    let row: Option<(Option<String>,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await?;

    Ok(row.and_then(|(value,)| value))
}

/// Insert or overwrite a setting.
pub async fn set_setting(pool: &DbPool, key: &str, value: &str) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO settings (key, value) VALUES (?, ?)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value
        "#,
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;

    Ok(())
}

/// Whether the user was already rewarded.
pub async fn has_received_gift(pool: &DbPool, user_id: i64) -> Result<bool> {
    let value = get_setting(pool, &gift_received_key(user_id)).await?;
    Ok(value.is_some_and(|v| !v.is_empty()))
}

/// Record that the user was rewarded.
pub async fn mark_gift_received(pool: &DbPool, user_id: i64) -> Result<()> {
    set_setting(pool, &gift_received_key(user_id), &unix_now().to_string()).await
}

/// Record that a Star Gift was delivered to the user.
pub async fn mark_gift_sent(pool: &DbPool, user_id: i64) -> Result<()> {
    set_setting(pool, &gift_sent_key(user_id), &unix_now().to_string()).await
}

/// Count Star Gifts delivered so far.
pub async fn count_gifts_sent(pool: &DbPool) -> Result<i64> {
    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM settings WHERE key LIKE 'gift_sent_to_%'")
            .fetch_one(pool)
            .await?;

    Ok(count)
}
