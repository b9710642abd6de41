//! Turning a stored factoid body into a chat reply.
//!
//! Bodies may hold `|`-separated alternatives, `$who` placeholders and a
//! leading `<reply>` or `<action>` directive. None of that is expanded in
//! storage; it is applied fresh on every recall.

use rawr_sdk::plugin::Response;

use crate::phrases::{self, Selector};

const WHO: &str = "$who";
const REPLY: &str = "<reply>";
const ACTION: &str = "<action>";

/// A recalled factoid, ready to send.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Rendered {
    /// `topic is text.`
    Statement(String),
    /// Payload of a `<reply>` directive, said verbatim.
    Reply(String),
    /// Payload of an `<action>` directive, sent as an emote.
    Action(String),
}

impl Rendered {
    pub fn into_response(self) -> Response {
        match self {
            Rendered::Statement(text) | Rendered::Reply(text) => Response::say(text),
            Rendered::Action(text) => Response::action(text),
        }
    }
}

/// Render `body` as recalled by `who`.
pub fn render(topic: &str, body: &str, who: &str, selector: &dyn Selector) -> Rendered {
    let choices = alternatives(body);
    let chosen = phrases::pick(selector, &choices).copied().unwrap_or(body);
    let text = substitute_who(chosen, who);

    if let Some(payload) = directive(&text, REPLY) {
        Rendered::Reply(payload.to_string())
    } else if let Some(payload) = directive(&text, ACTION) {
        Rendered::Action(payload.to_string())
    } else {
        Rendered::Statement(format!("{topic} is {text}."))
    }
}

/// The `|`-separated alternatives of `body`, blank ones dropped.
///
/// A body without `|` is its own single alternative.
pub fn alternatives(body: &str) -> Vec<&str> {
    if !body.contains('|') {
        return vec![body];
    }
    body.split('|').filter(|alt| !alt.trim().is_empty()).collect()
}

/// Replace every `$who` (any case) with `who`.
pub fn substitute_who(text: &str, who: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(i) = find_ignore_case(rest, WHO) {
        out.push_str(&rest[..i]);
        out.push_str(who);
        rest = &rest[i + WHO.len()..];
    }
    out.push_str(rest);
    out
}

/// Byte offset of an ASCII `needle` in `haystack`, ignoring ASCII case.
fn find_ignore_case(haystack: &str, needle: &str) -> Option<usize> {
    haystack
        .as_bytes()
        .windows(needle.len())
        .position(|w| w.eq_ignore_ascii_case(needle.as_bytes()))
}

/// Non-empty payload after a leading `tag` and at most one space.
fn directive<'a>(text: &'a str, tag: &str) -> Option<&'a str> {
    let rest = text.strip_prefix(tag)?;
    let payload = rest.strip_prefix(' ').unwrap_or(rest);
    (!payload.is_empty()).then_some(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phrases::{FixedSelector, RandomSelector};
    use std::collections::HashSet;

    #[test]
    fn plain_body_is_a_statement() {
        assert_eq!(
            render("foo", "bar", "test", &FixedSelector(0)),
            Rendered::Statement("foo is bar.".into())
        );
    }

    #[test]
    fn reply_directive_drops_topic() {
        assert_eq!(
            render("foo", "<reply>bar", "test", &FixedSelector(0)),
            Rendered::Reply("bar".into())
        );
        assert_eq!(
            render("foo", "<reply> bar or baz", "test", &FixedSelector(0)),
            Rendered::Reply("bar or baz".into())
        );
    }

    #[test]
    fn action_directive() {
        assert_eq!(
            render("hug", "<action> hugs $who", "alice", &FixedSelector(0)),
            Rendered::Action("hugs alice".into())
        );
    }

    #[test]
    fn empty_directive_is_just_text() {
        assert_eq!(
            render("foo", "<reply>", "test", &FixedSelector(0)),
            Rendered::Statement("foo is <reply>.".into())
        );
    }

    #[test]
    fn who_is_replaced_everywhere_any_case() {
        assert_eq!(substitute_who("$who likes $WHO and $Who", "bob"), "bob likes bob and bob");
        assert_eq!(substitute_who("no placeholder", "bob"), "no placeholder");
    }

    #[test]
    fn who_replacement_does_not_recurse() {
        assert_eq!(substitute_who("hi $who", "$who"), "hi $who");
    }

    #[test]
    fn alternatives_split_on_pipe() {
        assert_eq!(alternatives("a or b|c"), vec!["a or b", "c"]);
        assert_eq!(alternatives("a||b|"), vec!["a", "b"]);
        assert_eq!(alternatives("plain"), vec!["plain"]);
    }

    #[test]
    fn selector_picks_the_alternative() {
        assert_eq!(
            render("foo", "a|b|<reply>c", "test", &FixedSelector(2)),
            Rendered::Reply("c".into())
        );
        assert_eq!(
            render("foo", "a|b|c", "test", &FixedSelector(1)),
            Rendered::Statement("foo is b.".into())
        );
    }

    #[test]
    fn random_alternatives_all_show_up() {
        let mut seen = HashSet::new();
        for _ in 0..300 {
            seen.insert(render("foo", "a|b|c", "test", &RandomSelector));
        }
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn into_response_marks_actions() {
        assert!(Rendered::Action("waves".into()).into_response().action);
        assert!(!Rendered::Reply("hi".into()).into_response().action);
    }
}
