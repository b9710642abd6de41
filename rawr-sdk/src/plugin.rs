//! Plugin contract between the bot host and the features it runs.
//!
//! A plugin sees one [`Incoming`] line at a time and answers with zero or
//! more [`Response`]s. It never touches the connection itself.

/// An inbound chat line as seen by plugins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Incoming {
    /// Message text.
    pub text: String,
    /// Display name of the sender.
    pub sender: String,
    /// Channel the line was said in, `None` for a direct message.
    pub channel: Option<String>,
    /// The bot's current nick.
    pub bot_nick: String,
    /// Command prefix, e.g. `!`.
    pub prefix: String,
}

impl Incoming {
    /// Length of the leading `nick[:,-]` address, if the text starts with one.
    fn address_len(&self) -> Option<usize> {
        let nick = &self.bot_nick;
        if nick.is_empty() || self.text.len() < nick.len() {
            return None;
        }
        let head = self.text.get(..nick.len())?;
        if !head.eq_ignore_ascii_case(nick) {
            return None;
        }
        let rest = &self.text[nick.len()..];
        match rest.chars().next() {
            None => Some(nick.len()),
            Some(c @ (':' | ',' | '-')) => Some(nick.len() + c.len_utf8()),
            Some(c) if c.is_whitespace() => Some(nick.len()),
            Some(_) => None,
        }
    }

    /// True when the line is a direct message.
    pub fn is_private(&self) -> bool {
        self.channel.is_none()
    }

    /// True when the line names the bot first, or arrives as a direct message.
    pub fn is_addressed(&self) -> bool {
        self.is_private() || self.address_len().is_some()
    }

    /// The text with any leading bot address removed, left-trimmed.
    ///
    /// `None` when the line is not addressed to the bot.
    pub fn addressed_text(&self) -> Option<&str> {
        match self.address_len() {
            Some(n) => Some(self.text[n..].trim_start()),
            None if self.is_private() => Some(self.text.trim_start()),
            None => None,
        }
    }

    /// True when the line starts with the command prefix.
    pub fn is_prefixed(&self) -> bool {
        !self.prefix.is_empty() && self.text.starts_with(&self.prefix)
    }

    /// True for a prefixed command, sent bare or after the bot's name.
    pub fn is_command(&self) -> bool {
        if self.is_prefixed() {
            return true;
        }
        !self.prefix.is_empty()
            && self
                .addressed_text()
                .is_some_and(|text| text.starts_with(&self.prefix))
    }

    /// The text after the command prefix, if the line is a prefixed command.
    pub fn command_text(&self) -> Option<&str> {
        if self.prefix.is_empty() {
            return None;
        }
        self.text.strip_prefix(&self.prefix).map(str::trim)
    }

    /// Where a reply should go: the channel, or the sender for direct messages.
    pub fn reply_target(&self) -> &str {
        self.channel.as_deref().unwrap_or(&self.sender)
    }
}

/// An outbound reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub text: String,
    /// Send as a CTCP ACTION rather than a plain message.
    pub action: bool,
}

impl Response {
    pub fn say(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            action: false,
        }
    }

    pub fn action(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            action: true,
        }
    }
}

/// A feature hosted by the bot.
///
/// Plugins are called one line at a time, in registration order.
pub trait Plugin: Send + Sync {
    /// Short lowercase name, used by `help <name>`.
    fn name(&self) -> &str;

    /// Usage lines shown by `help <name>`.
    fn help(&self) -> &[&str] {
        &[]
    }

    /// React to one line.
    fn handle(&self, msg: &Incoming) -> anyhow::Result<Vec<Response>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn incoming(text: &str, channel: Option<&str>) -> Incoming {
        Incoming {
            text: text.to_string(),
            sender: "test".to_string(),
            channel: channel.map(str::to_string),
            bot_nick: "testbot".to_string(),
            prefix: "!".to_string(),
        }
    }

    #[test]
    fn addressed_with_separators() {
        for text in ["testbot: foo", "testbot, foo", "testbot- foo", "testbot foo", "TestBot: foo"] {
            let msg = incoming(text, Some("#c"));
            assert!(msg.is_addressed(), "{text}");
            assert_eq!(msg.addressed_text(), Some("foo"), "{text}");
        }
    }

    #[test]
    fn bare_nick_is_addressed_with_empty_text() {
        let msg = incoming("testbot", Some("#c"));
        assert!(msg.is_addressed());
        assert_eq!(msg.addressed_text(), Some(""));
        let msg = incoming("testbot:", Some("#c"));
        assert_eq!(msg.addressed_text(), Some(""));
    }

    #[test]
    fn longer_nick_is_not_the_bot() {
        let msg = incoming("testbotty: foo", Some("#c"));
        assert!(!msg.is_addressed());
        assert_eq!(msg.addressed_text(), None);
    }

    #[test]
    fn private_messages_are_always_addressed() {
        let msg = incoming("foo is bar", None);
        assert!(msg.is_addressed());
        assert_eq!(msg.addressed_text(), Some("foo is bar"));
        assert_eq!(msg.reply_target(), "test");

        let msg = incoming("testbot: foo", None);
        assert_eq!(msg.addressed_text(), Some("foo"));
    }

    #[test]
    fn unaddressed_channel_line() {
        let msg = incoming("foo is bar", Some("#c"));
        assert!(!msg.is_addressed());
        assert_eq!(msg.reply_target(), "#c");
    }

    #[test]
    fn command_prefix() {
        let msg = incoming("!karma foo", Some("#c"));
        assert!(msg.is_prefixed());
        assert_eq!(msg.command_text(), Some("karma foo"));

        let msg = incoming("karma foo", Some("#c"));
        assert!(!msg.is_prefixed());
        assert_eq!(msg.command_text(), None);
    }

    #[test]
    fn commands_after_the_nick_count_as_commands() {
        assert!(incoming("!foo is bar", None).is_command());
        assert!(incoming("testbot: !foo", Some("#c")).is_command());
        assert!(!incoming("testbot: foo!", Some("#c")).is_command());
        assert!(!incoming("foo is bar", None).is_command());

        let mut msg = incoming("testbot: !foo", Some("#c"));
        msg.prefix = String::new();
        assert!(!msg.is_command());
    }
}
