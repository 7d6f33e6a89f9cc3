//! Giveaway service.
//!
//! Decides who gets a reward and delivers it: a Star Gift when the
//! catalogue is configured and `sendGift` succeeds, otherwise a promo code
//! from the pool sent as a direct message. Also backs the admin commands
//! that manage the code pool.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use tracing::{info, warn};

use crate::api::status;
use crate::bot::texts;
use crate::config::GiveawayConfig;
use crate::db::{self, DbPool};
use crate::error::Result;
use crate::services::TelegramService;

/// Result of a claim attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    NotSubscribed,
    AlreadyReceived,
    /// Another claim for the same user is still running.
    InProgress,
    StarGiftSent,
    PromoSent(String),
    OutOfStock,
    /// A code was taken but the direct message failed; the code went back
    /// to the pool.
    DeliveryFailed,
}

/// Counts reported back to the admin after `/add`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddCodesReport {
    pub submitted: usize,
    pub inserted: u64,
}

impl AddCodesReport {
    pub fn duplicates(&self) -> u64 {
        (self.submitted as u64).saturating_sub(self.inserted)
    }
}

/// One `user_id: CODE` line of a manual grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantLine {
    pub user_id: i64,
    pub code: String,
}

/// Outcome of one manual grant line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrantResult {
    Granted(GrantLine),
    AlreadyIssued(GrantLine),
    DeliveryFailed(GrantLine),
    Invalid(String),
}

/// Service implementing the giveaway rules.
#[derive(Clone)]
pub struct GiveawayService {
    inner: Arc<GiveawayInner>,
}

struct GiveawayInner {
    db: DbPool,
    telegram: Arc<TelegramService>,
    config: GiveawayConfig,
    in_flight: Mutex<HashSet<i64>>,
}

/// Removes the user from the in-flight set when the claim ends.
struct ClaimGuard<'a> {
    in_flight: &'a Mutex<HashSet<i64>>,
    user_id: i64,
}

impl Drop for ClaimGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut set) = self.in_flight.lock() {
            set.remove(&self.user_id);
        }
    }
}

impl GiveawayService {
    pub fn new(db: DbPool, telegram: Arc<TelegramService>, config: GiveawayConfig) -> Self {
        Self {
            inner: Arc::new(GiveawayInner {
                db,
                telegram,
                config,
                in_flight: Mutex::new(HashSet::new()),
            }),
        }
    }

    pub fn config(&self) -> &GiveawayConfig {
        &self.inner.config
    }

    /// Record a user the first time they talk to the bot.
    pub async fn register_user(&self, user_id: i64, username: Option<&str>) -> Result<()> {
        db::upsert_user(&self.inner.db, user_id, username).await
    }

    /// Whether the user is subscribed to the required channel.
    ///
    /// Fails closed: lookup errors (usually the bot not being an admin of
    /// the channel) count as not subscribed.
    pub async fn is_subscribed(&self, user_id: i64) -> bool {
        let channel = &self.inner.config.required_channel;
        if channel.is_empty() {
            warn!("No required channel configured, treating user {} as unsubscribed", user_id);
            return false;
        }

        match self.inner.telegram.get_chat_member(channel, user_id).await {
            Ok(member) => member.is_subscribed(),
            Err(e) => {
                warn!(user_id, channel = %channel, error = %e, "Subscription check failed");
                false
            }
        }
    }

    /// Whether the user may run admin commands.
    ///
    /// The `admins` setting wins over the `ADMINS` environment fallback.
    pub async fn is_admin(&self, user_id: i64) -> Result<bool> {
        let raw = match db::get_setting(&self.inner.db, db::ADMINS_KEY).await? {
            Some(value) if !value.trim().is_empty() => value,
            _ => self.inner.config.admins.clone(),
        };

        Ok(parse_admin_ids(&raw).contains(&user_id))
    }

    fn begin_claim(&self, user_id: i64) -> Option<ClaimGuard<'_>> {
        let mut set = self.inner.in_flight.lock().ok()?;
        if !set.insert(user_id) {
            return None;
        }
        Some(ClaimGuard {
            in_flight: &self.inner.in_flight,
            user_id,
        })
    }

    /// Run the full claim flow for a user.
    pub async fn claim(&self, user_id: i64, username: Option<&str>) -> Result<ClaimOutcome> {
        let Some(_guard) = self.begin_claim(user_id) else {
            return Ok(ClaimOutcome::InProgress);
        };

        let pool = &self.inner.db;
        let config = &self.inner.config;

        self.register_user(user_id, username).await?;

        if !self.is_subscribed(user_id).await {
            return Ok(ClaimOutcome::NotSubscribed);
        }

        if config.only_once && db::has_received_gift(pool, user_id).await? {
            return Ok(ClaimOutcome::AlreadyReceived);
        }

        let outcome = match self.try_send_star_gift(user_id).await? {
            Some(outcome) => outcome,
            None => {
                let Some(issued) = db::take_code_for_user(pool, user_id).await? else {
                    warn!(user_id, "Promo code pool is empty");
                    return Ok(ClaimOutcome::OutOfStock);
                };

                if let Err(e) = self.send_promo(user_id, &issued.code).await {
                    warn!(user_id, error = %e, "Failed to deliver promo code, releasing it");
                    db::release_code(pool, &issued.code).await?;
                    return Ok(ClaimOutcome::DeliveryFailed);
                }

                status::inc_promo_codes_issued();
                ClaimOutcome::PromoSent(issued.code)
            }
        };

        if config.only_once {
            db::mark_gift_received(pool, user_id).await?;
        }

        info!(user_id, outcome = ?outcome, "Reward delivered");
        Ok(outcome)
    }

    /// Send the default Star Gift, if one is configured.
    ///
    /// Returns `None` when the caller should fall back to a promo code.
    async fn try_send_star_gift(&self, user_id: i64) -> Result<Option<ClaimOutcome>> {
        let Some(gift) = self.inner.config.default_gift() else {
            return Ok(None);
        };

        match self
            .inner
            .telegram
            .send_gift(user_id, &gift.id, Some(texts::STAR_GIFT_CAPTION))
            .await
        {
            Ok(true) => {
                // Statistics only; the once-only marker must still be written
                if let Err(e) = db::mark_gift_sent(&self.inner.db, user_id).await {
                    warn!(user_id, error = %e, "Failed to record sent Star Gift");
                }
                status::inc_star_gifts_sent();
                Ok(Some(ClaimOutcome::StarGiftSent))
            }
            Ok(false) => {
                warn!(user_id, gift_id = %gift.id, "sendGift returned false");
                Ok(None)
            }
            Err(e) => {
                warn!(user_id, gift_id = %gift.id, error = %e, "sendGift failed");
                Ok(None)
            }
        }
    }

    async fn send_promo(&self, user_id: i64, code: &str) -> Result<()> {
        self.inner
            .telegram
            .send_message(user_id, &texts::promo_code(code), None, Some("HTML"))
            .await
    }

    /// Number of codes left in the pool.
    pub async fn balance(&self) -> Result<i64> {
        db::count_available_codes(&self.inner.db).await
    }

    /// Available codes, optionally capped.
    pub async fn export(&self, limit: Option<u32>) -> Result<Vec<String>> {
        db::export_remaining_codes(&self.inner.db, limit).await
    }

    /// Add codes separated by commas, spaces or newlines.
    pub async fn add_codes(&self, text: &str) -> Result<AddCodesReport> {
        let codes = parse_codes(text);
        let inserted = db::add_codes(&self.inner.db, &codes).await?;

        info!(submitted = codes.len(), inserted, "Promo codes added");
        Ok(AddCodesReport {
            submitted: codes.len(),
            inserted,
        })
    }

    /// Hand out specific codes to specific users.
    pub async fn grant_manual(&self, text: &str) -> Result<Vec<GrantResult>> {
        let mut results = Vec::new();

        for parsed in parse_grant_lines(text) {
            let line = match parsed {
                Ok(line) => line,
                Err(raw) => {
                    results.push(GrantResult::Invalid(raw));
                    continue;
                }
            };

            if db::assign_code(&self.inner.db, &line.code, line.user_id)
                .await?
                .is_none()
            {
                results.push(GrantResult::AlreadyIssued(line));
                continue;
            }

            match self.send_promo(line.user_id, &line.code).await {
                Ok(()) => {
                    status::inc_promo_codes_issued();
                    results.push(GrantResult::Granted(line));
                }
                Err(e) => {
                    warn!(user_id = line.user_id, error = %e, "Manual grant delivery failed");
                    db::release_code(&self.inner.db, &line.code).await?;
                    results.push(GrantResult::DeliveryFailed(line));
                }
            }
        }

        Ok(results)
    }
}

/// Parse a comma-separated admin list; entries that are not plain digits
/// are skipped.
pub fn parse_admin_ids(raw: &str) -> Vec<i64> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()))
        .filter_map(|s| s.parse().ok())
        .collect()
}

/// Split admin input into individual codes.
pub fn parse_codes(text: &str) -> Vec<String> {
    text.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Parse `user_id: CODE` lines; blank lines are skipped and malformed ones
/// are returned as `Err` with the raw text.
pub fn parse_grant_lines(text: &str) -> Vec<std::result::Result<GrantLine, String>> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            let (id, code) = line.split_once(':').ok_or_else(|| line.to_string())?;
            let user_id = id.trim().parse().map_err(|_| line.to_string())?;
            let code = code.trim();
            if code.is_empty() || code.contains(char::is_whitespace) {
                return Err(line.to_string());
            }
            Ok(GrantLine {
                user_id,
                code: code.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("1, 2,3", vec![1, 2, 3])]
    #[case("", vec![])]
    #[case("42,abc, -5, 7 ", vec![42, 7])]
    #[case(",,", vec![])]
    fn test_parse_admin_ids(#[case] raw: &str, #[case] expected: Vec<i64>) {
        assert_eq!(parse_admin_ids(raw), expected);
    }

    #[test]
    fn test_parse_codes_accepts_mixed_separators() {
        assert_eq!(
            parse_codes("A1, B2\nC3  D4,,"),
            vec!["A1", "B2", "C3", "D4"]
        );
        assert!(parse_codes("  \n , ").is_empty());
    }

    #[test]
    fn test_parse_grant_lines() {
        let parsed = parse_grant_lines("123: CODE1\n\n  456:CODE2\nbogus\n789: two words\nx: Y");

        assert_eq!(
            parsed,
            vec![
                Ok(GrantLine {
                    user_id: 123,
                    code: "CODE1".into()
                }),
                Ok(GrantLine {
                    user_id: 456,
                    code: "CODE2".into()
                }),
                Err("bogus".into()),
                Err("789: two words".into()),
                Err("x: Y".into()),
            ]
        );
    }

    #[test]
    fn test_add_codes_report_duplicates() {
        let report = AddCodesReport {
            submitted: 5,
            inserted: 3,
        };
        assert_eq!(report.duplicates(), 2);
    }
}
