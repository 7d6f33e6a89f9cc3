//! Promo code pool queries.
//!
//! A code is available while `used_by` is NULL. Issuing a code is a single
//! `UPDATE ... RETURNING` so two concurrent claims can never receive the
//! same code.

use crate::Result;
use serde::Serialize;
use sqlx::FromRow;

use super::{unix_now, DbPool};

/// A code that has just been issued to a user.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct IssuedCode {
    pub code: String,
    pub used_at: i64,
}

/// Count codes that have not been issued yet.
pub async fn count_available_codes(pool: &DbPool) -> Result<i64> {
    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM promo_codes WHERE used_by IS NULL")
            .fetch_one(pool)
            .await?;

    Ok(count)
}

/// Count codes that have already been issued.
pub async fn count_issued_codes(pool: &DbPool) -> Result<i64> {
    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM promo_codes WHERE used_by IS NOT NULL")
            .fetch_one(pool)
            .await?;

    Ok(count)
}

/// Issue the oldest available code to `user_id`.
///
/// Returns `None` when the pool is empty.
pub async fn take_code_for_user(pool: &DbPool, user_id: i64) -> Result<Option<IssuedCode>> {
    let issued = sqlx::query_as::<_, IssuedCode>(
        r#"
        UPDATE promo_codes
        SET used_by = ?, used_at = ?
        WHERE code = (
            SELECT code FROM promo_codes
            WHERE used_by IS NULL
            ORDER BY rowid
            LIMIT 1
        )
        AND used_by IS NULL
        RETURNING code, used_at
        "#,
    )
    .bind(user_id)
    .bind(unix_now())
    .fetch_optional(pool)
    .await?;

    Ok(issued)
}

/// Issue a specific code to `user_id`, adding it to the pool if unknown.
///
/// Returns `None` when the code was already issued to someone.
pub async fn assign_code(pool: &DbPool, code: &str, user_id: i64) -> Result<Option<IssuedCode>> {
    let mut tx = pool.begin().await?;

    sqlx::query("INSERT OR IGNORE INTO promo_codes (code) VALUES (?)")
        .bind(code)
        .execute(&mut *tx)
        .await?;

    let issued = sqlx::query_as::<_, IssuedCode>(
        r#"
        UPDATE promo_codes
        SET used_by = ?, used_at = ?
        WHERE code = ? AND used_by IS NULL
        RETURNING code, used_at
        "#,
    )
    .bind(user_id)
    .bind(unix_now())
    .bind(code)
    .fetch_optional(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(issued)
}

/// Put an issued code back into the pool.
pub async fn release_code(pool: &DbPool, code: &str) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE promo_codes SET used_by = NULL, used_at = NULL WHERE code = ?",
    )
    .bind(code)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Add codes to the pool, skipping ones that already exist.
///
/// Returns how many codes were actually inserted.
pub async fn add_codes(pool: &DbPool, codes: &[String]) -> Result<u64> {
    if codes.is_empty() {
        return Ok(0);
    }

    let mut tx = pool.begin().await?;
    let mut inserted = 0;

    for code in codes {
        let result = sqlx::query("INSERT OR IGNORE INTO promo_codes (code) VALUES (?)")
            .bind(code)
            .execute(&mut *tx)
            .await?;
        inserted += result.rows_affected();
    }

    tx.commit().await?;

    Ok(inserted)
}

/// List available codes in insertion order.
///
/// `None` or `Some(0)` returns every available code.
pub async fn export_remaining_codes(pool: &DbPool, limit: Option<u32>) -> Result<Vec<String>> {
    // SQLite treats a negative LIMIT as "no limit"
    let limit = match limit {
        Some(n) if n > 0 => i64::from(n),
        _ => -1,
    };

    let rows: Vec<(String,)> = sqlx::query_as(
        "SELECT code FROM promo_codes WHERE used_by IS NULL ORDER BY rowid LIMIT ?",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|(code,)| code).collect())
}
