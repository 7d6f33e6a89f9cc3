//! User-facing message texts.

use crate::services::{AddCodesReport, GrantResult};

pub const SUBSCRIBED: &str = "Спасибо! Вы подписаны. Можно получить подарок.";
pub const SUBSCRIPTION_CONFIRMED: &str = "Отлично! Подписка подтверждена.\nМожно получить подарок.";
pub const SUBSCRIPTION_NOT_FOUND: &str =
    "Подписка не найдена. Подпишитесь на канал и повторите попытку.";
pub const CLAIM_NEEDS_SUBSCRIPTION: &str = "Нужно подписаться на канал для получения подарка.";
pub const ALREADY_RECEIVED: &str = "Вы уже получали подарок. Спасибо!";
pub const OUT_OF_STOCK: &str = "К сожалению, подарки закончились. Попробуйте позже.";
pub const GIFT_SENT: &str =
    "✅ Подарок отправлен! Если это был промокод — проверьте личные сообщения.";
pub const STAR_GIFT_CAPTION: &str = "Спасибо за подписку!";

pub const CHECK_SUBSCRIPTION_BUTTON: &str = "🔔 Я подписался(ась)";

pub const NO_CODES: &str = "Нет доступных кодов.";
pub const EXPORT_FILENAME: &str = "promo_codes.txt";
pub const ADD_USAGE: &str = "Использование: /add CODE1 CODE2 CODE3 ...";
pub const PROMO_USAGE: &str =
    "Отправьте список вида:\nuser_id: CODE\nчтобы выдать промокод вручную.";

pub const COMMAND_START: &str = "Старт / Проверка подписки";
pub const COMMAND_GIFT: &str = "Получить подарок";

pub fn subscribe_prompt(channel: &str) -> String {
    format!(
        "👋 Привет! Для получения подарка нужно подписаться на канал.\n\
         Канал: {}\n\n\
         После подписки нажмите «Я подписался(ась)».",
        channel
    )
}

pub fn delivery_failed(support_contact: &str) -> String {
    format!("Не удалось отправить подарок. Напишите {}.", support_contact)
}

/// Promo code direct message, HTML parse mode.
pub fn promo_code(code: &str) -> String {
    format!(
        "🎉 Ваш промокод: <code>{}</code>\nИспользуйте его в боте/на сайте.",
        escape_html(code)
    )
}

pub fn balance(available: i64) -> String {
    format!("Промокодов осталось: {}", available)
}

pub fn codes_added(report: &AddCodesReport) -> String {
    let mut text = format!("Добавлено кодов: {}", report.inserted);
    let duplicates = report.duplicates();
    if duplicates > 0 {
        text.push_str(&format!("\nПропущено дубликатов: {}", duplicates));
    }
    text
}

pub fn grant_summary(results: &[GrantResult]) -> String {
    if results.is_empty() {
        return PROMO_USAGE.to_string();
    }

    results
        .iter()
        .map(|result| match result {
            GrantResult::Granted(line) => format!("✅ {}: {}", line.user_id, line.code),
            GrantResult::AlreadyIssued(line) => {
                format!("⚠️ {}: {} — код уже выдан", line.user_id, line.code)
            }
            GrantResult::DeliveryFailed(line) => {
                format!("❌ {}: {} — не удалось отправить", line.user_id, line.code)
            }
            GrantResult::Invalid(raw) => format!("❓ {} — неверный формат", raw),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
