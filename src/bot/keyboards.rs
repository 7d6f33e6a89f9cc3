//! Inline keyboards.

use crate::bot::texts;
use crate::models::{InlineKeyboardButton, InlineKeyboardMarkup};

/// Callback data of the claim button.
pub const CLAIM_GIFT: &str = "claim:gift";

/// Callback data of the "I subscribed" button.
pub const CHECK_SUBSCRIPTION: &str = "check_sub";

/// Claim keyboard; `pending` adds the re-check button for users that are
/// not subscribed yet.
pub fn claim_keyboard(gift_name: &str, pending: bool) -> InlineKeyboardMarkup {
    let mut rows = vec![vec![InlineKeyboardButton::callback(gift_name, CLAIM_GIFT)]];
    if pending {
        rows.push(vec![InlineKeyboardButton::callback(
            texts::CHECK_SUBSCRIPTION_BUTTON,
            CHECK_SUBSCRIPTION,
        )]);
    }
    InlineKeyboardMarkup {
        inline_keyboard: rows,
    }
}
