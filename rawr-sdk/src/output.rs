//! Outbound line budgeting.
//!
//! IRC caps a line at 512 bytes including CRLF, and the server relays our
//! message to others with our full `nick!user@host` prefix prepended. Text
//! that would push the relayed line over the cap gets silently cut by the
//! server, so replies are truncated here at a word boundary instead.

/// Maximum line length excluding the trailing CRLF.
pub const MAX_LINE: usize = 510;

/// Conventional maximum ident length.
const MAX_USER: usize = 10;

/// Maximum hostname length.
const MAX_HOST: usize = 63;

/// `\x01ACTION ` + `\x01`.
const ACTION_OVERHEAD: usize = 9;

const ELLIPSIS: &str = "...";

/// Bytes available for message text sent by `nick` to `target`.
pub fn line_budget(nick: &str, target: &str, action: bool) -> usize {
    // ":nick!user@host PRIVMSG target :"
    let framing = 1 + nick.len() + 1 + MAX_USER + 1 + MAX_HOST + " PRIVMSG ".len() + target.len() + 2;
    let ctcp = if action { ACTION_OVERHEAD } else { 0 };
    MAX_LINE.saturating_sub(framing + ctcp)
}

/// Cut `text` to at most `budget` bytes, ending in an ellipsis when cut.
///
/// The cut lands on the last whitespace before the limit, or mid-word when
/// the text has no whitespace in range.
pub fn truncate(text: &str, budget: usize) -> String {
    if text.len() <= budget {
        return text.to_string();
    }

    let mut limit = budget.saturating_sub(ELLIPSIS.len());
    while !text.is_char_boundary(limit) {
        limit -= 1;
    }
    let head = &text[..limit];
    let cut = match head.rfind(char::is_whitespace) {
        Some(i) if i > 0 => &head[..i],
        _ => head,
    };
    format!("{}{ELLIPSIS}", cut.trim_end())
}

/// Split multi-line text into wire-safe lines, each within `budget`.
pub fn fit_lines(text: &str, budget: usize) -> Vec<String> {
    text.lines()
        .map(str::trim_end)
        .filter(|l| !l.is_empty())
        .map(|l| truncate(l, budget))
        .collect()
}
