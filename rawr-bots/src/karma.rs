//! Karma tracking: `foo++`, `(foo bar)--`, `karma foo`.
//!
//! Scores live in an integer store. A score that returns to zero is removed,
//! so the table only holds non-neutral keys.

use anyhow::Result;
use rawr_sdk::plugin::{Incoming, Plugin, Response};
use regex::{Regex, RegexBuilder};

use crate::kv::{KvStore, StoreResult};

const HELP: &[&str] = &[
    "Karma tracker",
    "Description: Tracks karma for things. Higher karma = liked more, lower karma = disliked more.",
    "Usage: !karma foo (to see karma level of 'foo')",
    "foo++ (foo bar)++ increments karma for 'foo' and 'foo bar'",
    "foo-- (foo bar)-- decrements karma for 'foo' and 'foo bar'",
];

/// One `++` or `--` found in a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vote {
    /// Lowercased key.
    pub key: String,
    /// `+1` or `-1`.
    pub delta: i64,
}

/// The `karma` plugin.
pub struct Karma {
    store: KvStore<i64>,
    votes: Regex,
    query: Regex,
}

impl Karma {
    pub fn new(store: KvStore<i64>) -> Result<Self, regex::Error> {
        Ok(Self {
            store,
            votes: Regex::new(r"\(([^)]+)\)(\+\+|--)|(\S+)(\+\+|--)")?,
            query: RegexBuilder::new(r"^karma\s+(.+)$")
                .case_insensitive(true)
                .build()?,
        })
    }

    pub fn store(&self) -> &KvStore<i64> {
        &self.store
    }

    /// Every vote in `text`, left to right.
    ///
    /// A parenthesized group votes for its whole contents; otherwise the
    /// run of non-space characters before the operator is the key.
    pub fn votes(&self, text: &str) -> Vec<Vote> {
        self.votes
            .captures_iter(text)
            .filter_map(|caps| {
                let (key, op) = match (caps.get(1), caps.get(2)) {
                    (Some(key), Some(op)) => (key, op),
                    _ => (caps.get(3)?, caps.get(4)?),
                };
                let key = key.as_str().trim().to_lowercase();
                if key.is_empty() {
                    return None;
                }
                let delta = if op.as_str() == "++" { 1 } else { -1 };
                Some(Vote { key, delta })
            })
            .collect()
    }

    /// Apply `delta` to `key`. Returns the new score, `None` when neutral.
    pub fn adjust(&self, key: &str, delta: i64) -> StoreResult<Option<i64>> {
        self.store.update(&key.trim().to_lowercase(), |current| {
            let next = current.unwrap_or(0).saturating_add(delta);
            (next != 0).then_some(next)
        })
    }

    pub fn increment(&self, key: &str) -> StoreResult<Option<i64>> {
        self.adjust(key, 1)
    }

    pub fn decrement(&self, key: &str) -> StoreResult<Option<i64>> {
        self.adjust(key, -1)
    }

    /// Current score, zero when the key has no record.
    pub fn score(&self, key: &str) -> StoreResult<i64> {
        Ok(self.store.get(&key.trim().to_lowercase())?.unwrap_or(0))
    }

    /// Human-readable score line for `key`.
    pub fn display(&self, key: &str) -> StoreResult<String> {
        let key = key.trim().to_lowercase();
        Ok(match self.store.get(&key)? {
            Some(score) => format!("{key} has karma of {score}."),
            None => format!("{key} has neutral karma."),
        })
    }

    /// The key asked about, if `msg` is a karma query.
    ///
    /// Queries come as a prefixed command, or addressed to the bot.
    fn query<'a>(&self, msg: &'a Incoming) -> Option<&'a str> {
        let text = match msg.command_text() {
            Some(cmd) => cmd,
            None => msg.addressed_text()?,
        };
        let caps = self.query.captures(text)?;
        caps.get(1).map(|m| m.as_str())
    }
}

impl Plugin for Karma {
    fn name(&self) -> &str {
        "karma"
    }

    fn help(&self) -> &[&str] {
        HELP
    }

    fn handle(&self, msg: &Incoming) -> Result<Vec<Response>> {
        if let Some(key) = self.query(msg) {
            return Ok(vec![Response::say(self.display(key)?)]);
        }

        for vote in self.votes(&msg.text) {
            let score = self.adjust(&vote.key, vote.delta)?;
            tracing::debug!(key = %vote.key, delta = vote.delta, score = score.unwrap_or(0), "Karma");
        }
        Ok(Vec::new())
    }
}
