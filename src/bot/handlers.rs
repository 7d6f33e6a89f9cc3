//! Command and callback handlers.

use tracing::info;

use super::keyboards::claim_keyboard;
use super::{texts, Dispatcher};
use crate::error::Result;
use crate::models::{CallbackQuery, Message, User};
use crate::services::{ClaimOutcome, DialogueState};

/// `/start`: greet the user and offer the gift or the subscribe prompt.
pub(super) async fn start(ctx: &Dispatcher, user: &User) -> Result<()> {
    ctx.giveaway.register_user(user.id, user.username.as_deref()).await?;
    ctx.dialogues.clear(user.id).await;
    send_start_reply(ctx, user).await;
    Ok(())
}

/// `/gift`: same reply as `/start`, remembering that the user asked.
pub(super) async fn gift(ctx: &Dispatcher, user: &User) -> Result<()> {
    ctx.giveaway.register_user(user.id, user.username.as_deref()).await?;
    ctx.dialogues.set(user.id, DialogueState::WaitingClaim).await;
    send_start_reply(ctx, user).await;
    Ok(())
}

async fn send_start_reply(ctx: &Dispatcher, user: &User) {
    let config = ctx.giveaway.config();

    if ctx.giveaway.is_subscribed(user.id).await {
        let keyboard = claim_keyboard(&config.gift_name, false);
        ctx.send_text(user.id, texts::SUBSCRIBED, Some(&keyboard)).await;
    } else {
        let keyboard = claim_keyboard(&config.gift_name, true);
        let text = texts::subscribe_prompt(&config.required_channel);
        ctx.send_text(user.id, &text, Some(&keyboard)).await;
    }
}

/// `/balance`: number of codes left.
pub(super) async fn balance(ctx: &Dispatcher, message: &Message) -> Result<()> {
    let left = ctx.giveaway.balance().await?;
    ctx.send_text(message.chat.id, &texts::balance(left), None).await;
    Ok(())
}

/// `/export [limit]`: available codes as a text file.
pub(super) async fn export(ctx: &Dispatcher, message: &Message, limit: Option<u32>) -> Result<()> {
    let codes = ctx.giveaway.export(limit).await?;
    if codes.is_empty() {
        ctx.send_text(message.chat.id, texts::NO_CODES, None).await;
        return Ok(());
    }

    info!(count = codes.len(), "Exporting promo codes");
    ctx.telegram
        .send_document(
            message.chat.id,
            texts::EXPORT_FILENAME,
            codes.join("\n").into_bytes(),
        )
        .await
}

/// `/add CODES...`: grow the pool.
pub(super) async fn add(ctx: &Dispatcher, message: &Message, args: &str) -> Result<()> {
    if args.is_empty() {
        ctx.send_text(message.chat.id, texts::ADD_USAGE, None).await;
        return Ok(());
    }

    let report = ctx.giveaway.add_codes(args).await?;
    ctx.send_text(message.chat.id, &texts::codes_added(&report), None)
        .await;
    Ok(())
}

/// `/promo` with `user_id: CODE` lines: hand out codes manually.
pub(super) async fn promo(ctx: &Dispatcher, message: &Message, args: &str) -> Result<()> {
    if args.is_empty() {
        ctx.send_text(message.chat.id, texts::PROMO_USAGE, None).await;
        return Ok(());
    }

    let results = ctx.giveaway.grant_manual(args).await?;
    ctx.send_text(message.chat.id, &texts::grant_summary(&results), None)
        .await;
    Ok(())
}

/// "I subscribed" button: re-check and update the keyboard.
pub(super) async fn check_subscription(ctx: &Dispatcher, query: &CallbackQuery) -> Result<()> {
    ctx.answer(query).await;

    let gift_name = &ctx.giveaway.config().gift_name;
    if ctx.giveaway.is_subscribed(query.from.id).await {
        let keyboard = claim_keyboard(gift_name, false);
        ctx.edit_or_send(query, texts::SUBSCRIPTION_CONFIRMED, Some(&keyboard))
            .await;
    } else {
        let keyboard = claim_keyboard(gift_name, true);
        ctx.edit_or_send(query, texts::SUBSCRIPTION_NOT_FOUND, Some(&keyboard))
            .await;
    }
    Ok(())
}

/// Claim button: run the claim flow and report the outcome.
pub(super) async fn claim(ctx: &Dispatcher, query: &CallbackQuery) -> Result<()> {
    ctx.answer(query).await;

    let user = &query.from;
    let outcome = ctx
        .giveaway
        .claim(user.id, user.username.as_deref())
        .await?;

    match outcome {
        ClaimOutcome::NotSubscribed => {
            let keyboard = claim_keyboard(&ctx.giveaway.config().gift_name, true);
            ctx.edit_or_send(query, texts::CLAIM_NEEDS_SUBSCRIPTION, Some(&keyboard))
                .await;
        }
        ClaimOutcome::AlreadyReceived => {
            ctx.edit_or_send(query, texts::ALREADY_RECEIVED, None).await;
        }
        // The running claim will edit the message itself
        ClaimOutcome::InProgress => {}
        ClaimOutcome::StarGiftSent | ClaimOutcome::PromoSent(_) => {
            ctx.dialogues.clear(user.id).await;
            ctx.edit_or_send(query, texts::GIFT_SENT, None).await;
        }
        ClaimOutcome::OutOfStock => {
            ctx.edit_or_send(query, texts::OUT_OF_STOCK, None).await;
        }
        ClaimOutcome::DeliveryFailed => {
            let text = texts::delivery_failed(&ctx.giveaway.config().support_contact);
            ctx.edit_or_send(query, &text, None).await;
        }
    }

    Ok(())
}
