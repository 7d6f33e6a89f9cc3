//! Bot command parsing.

/// Commands the bot understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Start,
    Gift,
    Balance,
    Export,
    Add,
    Promo,
    Unknown,
}

impl CommandKind {
    fn from_name(name: &str) -> Self {
        match name {
            "start" => Self::Start,
            "gift" => Self::Gift,
            "balance" => Self::Balance,
            "export" => Self::Export,
            "add" => Self::Add,
            "promo" => Self::Promo,
            _ => Self::Unknown,
        }
    }

    /// Commands limited to admins.
    pub fn is_admin_only(&self) -> bool {
        matches!(self, Self::Balance | Self::Export | Self::Add | Self::Promo)
    }
}

/// A parsed `/command[@bot] args` message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub kind: CommandKind,
    /// Everything after the command token, trimmed. May span lines.
    pub args: String,
    /// Bot addressed as in `/start@my_bot`.
    pub mention: Option<String>,
}

impl Command {
    /// Parse message text; `None` when it is not a command.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim_start();
        let body = text.strip_prefix('/')?;

        let (token, rest) = match body.find(char::is_whitespace) {
            Some(idx) => body.split_at(idx),
            None => (body, ""),
        };

        // "/start@my_bot" addresses a specific bot in group chats
        let (name, mention) = match token.split_once('@') {
            Some((name, bot)) => (name, Some(bot.to_string())),
            None => (token, None),
        };
        if name.is_empty() {
            return None;
        }

        Some(Self {
            kind: CommandKind::from_name(name),
            args: rest.trim().to_string(),
            mention,
        })
    }

    /// Whether the command is meant for the bot called `username`.
    ///
    /// Commands without a mention are for every bot. Usernames compare
    /// case-insensitively, as Telegram treats them.
    pub fn is_addressed_to(&self, username: &str) -> bool {
        self.mention
            .as_deref()
            .map_or(true, |mention| mention.eq_ignore_ascii_case(username))
    }

    /// Leading numeric argument, as `/export 10`.
    pub fn limit_arg(&self) -> Option<u32> {
        let first = self.args.split_whitespace().next()?;
        if !first.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        first.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("/start", CommandKind::Start, "")]
    #[case("/start@gift_bot", CommandKind::Start, "")]
    #[case("/GIFT", CommandKind::Unknown, "")]
    #[case("/Start", CommandKind::Unknown, "")]
    #[case("/export 25", CommandKind::Export, "25")]
    #[case("/add A1, B2\nC3", CommandKind::Add, "A1, B2\nC3")]
    #[case("/promo\n123: CODE", CommandKind::Promo, "123: CODE")]
    #[case("/help me", CommandKind::Unknown, "me")]
    fn test_parse(#[case] text: &str, #[case] kind: CommandKind, #[case] args: &str) {
        let command = Command::parse(text).unwrap();
        assert_eq!(command.kind, kind);
        assert_eq!(command.args, args);
    }

    #[rstest]
    #[case("hello")]
    #[case("")]
    #[case("/")]
    #[case("/@bot")]
    fn test_not_a_command(#[case] text: &str) {
        assert!(Command::parse(text).is_none());
    }

    #[test]
    fn test_mention() {
        let plain = Command::parse("/start").unwrap();
        assert_eq!(plain.mention, None);
        assert!(plain.is_addressed_to("gift_bot"));

        let ours = Command::parse("/start@Gift_Bot now").unwrap();
        assert_eq!(ours.mention.as_deref(), Some("Gift_Bot"));
        assert_eq!(ours.args, "now");
        assert!(ours.is_addressed_to("gift_bot"));

        let other = Command::parse("/start@other_bot").unwrap();
        assert!(!other.is_addressed_to("gift_bot"));
    }

    #[test]
    fn test_limit_arg() {
        assert_eq!(Command::parse("/export 10").unwrap().limit_arg(), Some(10));
        assert_eq!(Command::parse("/export").unwrap().limit_arg(), None);
        assert_eq!(Command::parse("/export ten").unwrap().limit_arg(), None);
        assert_eq!(Command::parse("/export -3").unwrap().limit_arg(), None);
    }

    #[test]
    fn test_admin_only_commands() {
        assert!(CommandKind::Balance.is_admin_only());
        assert!(CommandKind::Promo.is_admin_only());
        assert!(!CommandKind::Start.is_admin_only());
        assert!(!CommandKind::Unknown.is_admin_only());
    }
}
