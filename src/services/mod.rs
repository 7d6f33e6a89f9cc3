//! Service layer for giftbot.
//!
//! Contains business logic and external service integrations:
//! - Telegram (Bot API client)
//! - Giveaway (subscription gate, reward delivery, code pool admin)
//! - Dialogue (in-memory per-user conversation state)
//! - Poller (long-polling update source)

mod dialogue;
mod giveaway;
mod poller;
mod telegram;

pub use dialogue::{DialogueState, DialogueStore};
pub use giveaway::{
    parse_admin_ids, parse_codes, parse_grant_lines, AddCodesReport, ClaimOutcome, GiveawayService,
    GrantLine, GrantResult,
};
pub use poller::{Poller, PollerHandle, ALLOWED_UPDATES};
pub use telegram::TelegramService;
