//! Factoid learning: teach the bot "X is Y" and have it repeat it later.
//!
//! Only lines addressed to the bot (by nick, or in a direct message) are
//! considered, and lines starting with the command prefix are left to the
//! command plugins. Each line is matched against an ordered list of rules;
//! the first rule that matches decides what happens.

pub mod render;

use anyhow::Result;
use rawr_sdk::plugin::{Incoming, Plugin, Response};
use regex::{Captures, NoExpand, Regex, RegexBuilder};

use crate::kv::KvStore;
use crate::phrases::{self, Selector};

pub use render::{Rendered, render};

/// Words that start commands other plugins answer when addressed.
pub const DEFAULT_RESERVED: &[&str] = &["karma", "help"];

const HELP: &[&str] = &[
    "Learning module",
    "Description: Teach the bot about things, and have it repeat that info back later.",
    "Usage: [botname] [thing] is [information] (to store additional [information] under the keyword [thing].)",
    "[botname] [thing] (to get whatever the bot knows about [thing].)",
    "[botname] [thing] =~ s/[find]/[replace]/ (to edit what the bot knows about [thing].)",
    "[botname] forget [thing] (to make the bot forget everything about [thing].)",
    "[botname] literal [thing] (to see the raw entry for [thing].)",
];

/// What an addressed line asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command<'a> {
    Learn { topic: &'a str, body: &'a str },
    Edit { topic: &'a str, find: &'a str, replace: &'a str },
    Forget { topic: &'a str },
    Literal { topic: &'a str },
    /// Belongs to another plugin.
    Ignore,
    Recall { topic: &'a str },
    Idle,
}

type Build = for<'h> fn(&Captures<'h>) -> Command<'h>;

struct Rule {
    pattern: Regex,
    build: Build,
}

fn group<'h>(caps: &Captures<'h>, i: usize) -> &'h str {
    caps.get(i).map_or("", |m| m.as_str())
}

fn rule(pattern: &str, build: Build) -> Result<Rule, regex::Error> {
    let pattern = RegexBuilder::new(pattern).case_insensitive(true).build()?;
    Ok(Rule { pattern, build })
}

/// The ordered trigger list. First match wins.
fn rules(reserved: &[String]) -> Result<Vec<Rule>, regex::Error> {
    let mut rules = vec![
        rule(r"^(.+?) is (?:also )?(.+)$", |c| Command::Learn {
            topic: group(c, 1).trim(),
            body: group(c, 2),
        })?,
        rule(r"^(.+?) are (?:also )?(.+)$", |c| Command::Learn {
            topic: group(c, 1).trim(),
            body: group(c, 2),
        })?,
        rule(r"^(.+) =~ s/(.+)/(.*)/", |c| Command::Edit {
            topic: group(c, 1).trim(),
            find: group(c, 2),
            replace: group(c, 3),
        })?,
        rule(r"^forget (.+)$", |c| Command::Forget {
            topic: group(c, 1).trim(),
        })?,
        rule(r"^literal(?:ly)? (.+)$", |c| Command::Literal {
            topic: group(c, 1).trim(),
        })?,
    ];

    let words: Vec<String> = reserved
        .iter()
        .map(|w| w.trim())
        .filter(|w| !w.is_empty())
        .map(regex::escape)
        .collect();
    if !words.is_empty() {
        let pattern = format!(r"^(?:{})(?:\s|$)", words.join("|"));
        rules.push(rule(&pattern, |_| Command::Ignore)?);
    }

    rules.push(rule(r"^(.+)$", |c| Command::Recall {
        topic: group(c, 1).trim(),
    })?);
    Ok(rules)
}

/// The `learning` plugin.
pub struct Factoids {
    store: KvStore<String>,
    selector: Box<dyn Selector>,
    rules: Vec<Rule>,
}

impl Factoids {
    /// `reserved` lists first words that are never treated as topics.
    pub fn new(
        store: KvStore<String>,
        selector: Box<dyn Selector>,
        reserved: &[String],
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            store,
            selector,
            rules: rules(reserved)?,
        })
    }

    pub fn store(&self) -> &KvStore<String> {
        &self.store
    }

    /// Decide what an addressed line asks for.
    pub fn classify<'a>(&self, text: &'a str) -> Command<'a> {
        let text = text.trim_end();
        self.rules
            .iter()
            .find_map(|rule| rule.pattern.captures(text).map(|c| (rule.build)(&c)))
            .unwrap_or(Command::Idle)
    }

    /// Run one addressed line from `who`.
    pub fn respond(&self, who: &str, text: &str) -> Result<Vec<Response>> {
        let reply = match self.classify(text) {
            Command::Learn { topic, body } => self.learn(who, topic, body)?,
            Command::Edit { topic, find, replace } => self.edit(who, topic, find, replace)?,
            Command::Forget { topic } => self.forget(topic)?,
            Command::Literal { topic } => self.literal(topic)?,
            Command::Ignore => return Ok(Vec::new()),
            Command::Recall { topic } => self.recall(who, topic)?.into_response(),
            Command::Idle => Response::say(phrases::phrase(&*self.selector, phrases::IDLE, who)),
        };
        Ok(vec![reply])
    }

    /// Append `body` to what is known about `topic`.
    ///
    /// A body starting with `|` joins as a new alternative; anything else is
    /// joined with " or ".
    pub fn learn(&self, who: &str, topic: &str, body: &str) -> Result<Response> {
        let key = topic.to_lowercase();
        self.store.update(&key, |current| {
            Some(match current {
                None => body.to_string(),
                Some(existing) if body.starts_with('|') => format!("{existing}{body}"),
                Some(existing) => format!("{existing} or {body}"),
            })
        })?;
        tracing::info!(topic = %key, who, "Learned factoid");
        Ok(Response::say(phrases::phrase(
            &*self.selector,
            phrases::ACKNOWLEDGEMENTS,
            who,
        )))
    }

    /// Substitute the first match of `find` with `replace` in the entry.
    ///
    /// `find` is a regular expression when it compiles and a literal string
    /// otherwise. `replace` is always literal. An entry edited down to
    /// nothing is removed.
    pub fn edit(&self, who: &str, topic: &str, find: &str, replace: &str) -> Result<Response> {
        let key = topic.to_lowercase();
        let Some(body) = self.store.get(&key)? else {
            return Ok(Response::say(format!("I don't know anything about {topic}.")));
        };

        let pattern = Regex::new(find).or_else(|_| Regex::new(&regex::escape(find)))?;
        if !pattern.is_match(&body) {
            return Ok(Response::say(format!("{topic} doesn't contain '{find}'.")));
        }

        let edited = pattern.replacen(&body, 1, NoExpand(replace));
        if edited.trim().is_empty() {
            self.store.delete(&key)?;
        } else {
            self.store.set(&key, edited.into_owned())?;
        }
        tracing::info!(topic = %key, who, "Edited factoid");
        Ok(Response::say(format!("done, {who}.")))
    }

    pub fn forget(&self, topic: &str) -> Result<Response> {
        let key = topic.to_lowercase();
        if self.store.get(&key)?.is_none() {
            return Ok(Response::say(format!("I don't know anything about {topic}.")));
        }
        self.store.delete(&key)?;
        tracing::info!(topic = %key, "Forgot factoid");
        Ok(Response::say(format!("I forgot {topic}.")))
    }

    /// The raw entry, no alternatives or directives applied.
    pub fn literal(&self, topic: &str) -> Result<Response> {
        let reply = match self.store.get(&topic.to_lowercase())? {
            Some(body) => format!("{topic} =is= {body}."),
            None => format!("No entry for {topic}"),
        };
        Ok(Response::say(reply))
    }

    pub fn recall(&self, who: &str, topic: &str) -> Result<Rendered> {
        match self.store.get(&topic.to_lowercase())? {
            Some(body) => Ok(render(topic, &body, who, &*self.selector)),
            None => Ok(Rendered::Statement(phrases::phrase(
                &*self.selector,
                phrases::GIVE_UPS,
                who,
            ))),
        }
    }
}

impl Plugin for Factoids {
    fn name(&self) -> &str {
        "learning"
    }

    fn help(&self) -> &[&str] {
        HELP
    }

    fn handle(&self, msg: &Incoming) -> Result<Vec<Response>> {
        if msg.is_command() {
            return Ok(Vec::new());
        }
        match msg.addressed_text() {
            Some(text) => self.respond(&msg.sender, text),
            None => Ok(Vec::new()),
        }
    }
}
