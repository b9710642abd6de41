//! Canned reply phrases and the selector that picks among them.

use rand::Rng;

/// Replies after learning a factoid.
pub const ACKNOWLEDGEMENTS: &[&str] = &[
    "good to know, {who}.",
    "got it, {who}.",
    "roger, {who}.",
    "understood, {who}.",
    "OK, {who}.",
    "so speaketh {who}.",
    "whatever you say, {who}.",
    "I'll take your word for it, {who}.",
];

/// Replies when asked about an unknown topic.
pub const GIVE_UPS: &[&str] = &[
    "bugger all, I dunno, {who}.",
    "no idea, {who}.",
    "huh?",
    "what?",
    "dunno, {who}.",
];

/// Replies when addressed with nothing else.
pub const IDLE: &[&str] = &["{who}?", "yes?", "you called?", "what?"];

/// Picks an index into a list of choices.
pub trait Selector: Send + Sync {
    /// Index in `0..len`. `len` is never zero.
    fn select(&self, len: usize) -> usize;
}

/// Uniform random choice.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomSelector;

impl Selector for RandomSelector {
    fn select(&self, len: usize) -> usize {
        rand::thread_rng().gen_range(0..len)
    }
}

/// Always the same index, clamped to the list. For tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixedSelector(pub usize);

impl Selector for FixedSelector {
    fn select(&self, len: usize) -> usize {
        self.0.min(len.saturating_sub(1))
    }
}

/// Pick one item from `items`. `None` only when `items` is empty.
pub fn pick<'a, T>(selector: &dyn Selector, items: &'a [T]) -> Option<&'a T> {
    if items.is_empty() {
        return None;
    }
    items.get(selector.select(items.len()))
}

/// Pick a phrase from `bank` and fill in the speaker.
pub fn phrase(selector: &dyn Selector, bank: &[&str], who: &str) -> String {
    pick(selector, bank)
        .map(|p| p.replace("{who}", who))
        .unwrap_or_default()
}
