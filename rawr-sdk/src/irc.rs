//! IRC wire format: parsing and serializing single protocol lines.
//!
//! Only the RFC 1459 shape is handled (`:prefix COMMAND params :trailing`).
//! An IRCv3 tag section, if a server sends one anyway, is skipped.

use std::fmt;

/// CTCP delimiter byte.
const CTCP_DELIM: char = '\x01';

/// A single parsed IRC line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub prefix: Option<String>,
    pub command: String,
    pub params: Vec<String>,
}

impl Message {
    /// Build an outbound message with no prefix.
    pub fn new(command: &str, params: Vec<String>) -> Self {
        Self {
            prefix: None,
            command: command.to_string(),
            params,
        }
    }

    /// Parse one line. Trailing CR/LF is ignored.
    ///
    /// Returns `None` for blank lines or lines with no command.
    pub fn parse(line: &str) -> Option<Self> {
        let mut rest = line.trim_end_matches(['\r', '\n']);

        if rest.starts_with('@') {
            let (_, after) = rest.split_once(' ')?;
            rest = after.trim_start_matches(' ');
        }

        let prefix = if let Some(stripped) = rest.strip_prefix(':') {
            let (prefix, after) = stripped.split_once(' ')?;
            rest = after.trim_start_matches(' ');
            Some(prefix.to_string())
        } else {
            None
        };

        let (command, mut rest) = match rest.split_once(' ') {
            Some((cmd, after)) => (cmd, after),
            None => (rest, ""),
        };
        if command.is_empty() {
            return None;
        }

        let mut params = Vec::new();
        loop {
            rest = rest.trim_start_matches(' ');
            if rest.is_empty() {
                break;
            }
            if let Some(trailing) = rest.strip_prefix(':') {
                params.push(trailing.to_string());
                break;
            }
            match rest.split_once(' ') {
                Some((param, after)) => {
                    params.push(param.to_string());
                    rest = after;
                }
                None => {
                    params.push(rest.to_string());
                    break;
                }
            }
        }

        Some(Self {
            prefix,
            command: command.to_ascii_uppercase(),
            params,
        })
    }

    /// Nick portion of a `nick!user@host` prefix.
    pub fn nick(&self) -> Option<&str> {
        self.prefix
            .as_deref()
            .and_then(|p| p.split('!').next())
            .filter(|n| !n.is_empty())
    }

    /// True when the prefix is a user (`nick!user@host`) rather than a server.
    pub fn from_user(&self) -> bool {
        self.prefix.as_deref().is_some_and(|p| p.contains('!'))
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(prefix) = &self.prefix {
            write!(f, ":{prefix} ")?;
        }
        f.write_str(&self.command)?;
        let last = self.params.len().saturating_sub(1);
        for (i, param) in self.params.iter().enumerate() {
            let trailing =
                i == last && (param.is_empty() || param.contains(' ') || param.starts_with(':'));
            if trailing {
                write!(f, " :{param}")?;
            } else {
                write!(f, " {param}")?;
            }
        }
        Ok(())
    }
}

/// Wrap text as a CTCP ACTION payload (`/me`).
pub fn ctcp_action(text: &str) -> String {
    format!("{CTCP_DELIM}ACTION {text}{CTCP_DELIM}")
}

/// Extract the payload of a CTCP ACTION, if `text` is one.
///
/// Some clients omit the closing delimiter, so it is optional.
pub fn parse_ctcp_action(text: &str) -> Option<&str> {
    let inner = text.strip_prefix(CTCP_DELIM)?;
    let inner = inner.strip_suffix(CTCP_DELIM).unwrap_or(inner);
    inner.strip_prefix("ACTION ").or_else(|| (inner == "ACTION").then_some(""))
}

/// Whether a PRIVMSG/NOTICE target names a channel.
pub fn is_channel(target: &str) -> bool {
    target.starts_with('#') || target.starts_with('&')
}

/// Strip characters that would split a single command across wire lines.
pub fn sanitize(text: &str) -> String {
    text.chars().filter(|c| *c != '\r' && *c != '\n').collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_privmsg_with_prefix() {
        let msg = Message::parse(":alice!a@host PRIVMSG #rawr :hello there\r\n").unwrap();
        assert_eq!(msg.prefix.as_deref(), Some("alice!a@host"));
        assert_eq!(msg.command, "PRIVMSG");
        assert_eq!(msg.params, vec!["#rawr", "hello there"]);
        assert_eq!(msg.nick(), Some("alice"));
        assert!(msg.from_user());
    }

    #[test]
    fn parse_numeric_from_server() {
        let msg = Message::parse(":irc.example.org 001 rawrbot :Welcome to IRC").unwrap();
        assert_eq!(msg.command, "001");
        assert_eq!(msg.params, vec!["rawrbot", "Welcome to IRC"]);
        assert!(!msg.from_user());
    }

    #[test]
    fn parse_ping_without_prefix() {
        let msg = Message::parse("PING :irc.example.org").unwrap();
        assert_eq!(msg.prefix, None);
        assert_eq!(msg.command, "PING");
        assert_eq!(msg.params, vec!["irc.example.org"]);
    }

    #[test]
    fn parse_skips_tags() {
        let msg = Message::parse("@time=2024-01-01T00:00:00Z :bob!b@h PRIVMSG #c :hi").unwrap();
        assert_eq!(msg.nick(), Some("bob"));
        assert_eq!(msg.params, vec!["#c", "hi"]);
    }

    #[test]
    fn parse_rejects_blank() {
        assert!(Message::parse("").is_none());
        assert!(Message::parse("\r\n").is_none());
        assert!(Message::parse(":prefix.only").is_none());
    }

    #[test]
    fn parse_keeps_colons_inside_trailing() {
        let msg = Message::parse(":a!b@c PRIVMSG #c :rawrbot: foo is bar").unwrap();
        assert_eq!(msg.params[1], "rawrbot: foo is bar");
    }

    #[test]
    fn display_uses_trailing_when_needed() {
        let msg = Message::new("PRIVMSG", vec!["#rawr".into(), "two words".into()]);
        assert_eq!(msg.to_string(), "PRIVMSG #rawr :two words");

        let msg = Message::new("JOIN", vec!["#rawr".into()]);
        assert_eq!(msg.to_string(), "JOIN #rawr");

        let msg = Message::new("PRIVMSG", vec!["#rawr".into(), ":)".into()]);
        assert_eq!(msg.to_string(), "PRIVMSG #rawr ::)");
    }

    #[test]
    fn ctcp_action_roundtrip() {
        let wrapped = ctcp_action("waves at test");
        assert_eq!(wrapped, "\x01ACTION waves at test\x01");
        assert_eq!(parse_ctcp_action(&wrapped), Some("waves at test"));
        assert_eq!(parse_ctcp_action("\x01ACTION dances"), Some("dances"));
        assert_eq!(parse_ctcp_action("plain text"), None);
        assert_eq!(parse_ctcp_action("\x01VERSION\x01"), None);
    }

    #[test]
    fn channel_targets() {
        assert!(is_channel("#rawr"));
        assert!(is_channel("&local"));
        assert!(!is_channel("rawrbot"));
    }

    #[test]
    fn sanitize_removes_line_breaks() {
        assert_eq!(sanitize("a\r\nb\nc"), "abc");
    }
}
