//! Canned responses to trigger patterns, configured in the bot's config file.

use anyhow::Result;
use rawr_sdk::plugin::{Incoming, Plugin, Response};
use regex::{Regex, RegexBuilder};
use serde::Deserialize;

/// One `[[reactions]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Reaction {
    /// Case-insensitive regular expression, matched anywhere in the line.
    pub trigger: String,
    pub response: String,
}

/// The `reactions` plugin.
pub struct Reactions {
    rules: Vec<(Regex, String)>,
}

impl Reactions {
    /// Compile every trigger. A bad pattern fails the whole set.
    pub fn new(reactions: &[Reaction]) -> Result<Self, regex::Error> {
        let rules = reactions
            .iter()
            .map(|r| {
                let pattern = RegexBuilder::new(&r.trigger).case_insensitive(true).build()?;
                Ok((pattern, r.response.clone()))
            })
            .collect::<Result<Vec<_>, regex::Error>>()?;
        Ok(Self { rules })
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Plugin for Reactions {
    fn name(&self) -> &str {
        "reactions"
    }

    fn handle(&self, msg: &Incoming) -> Result<Vec<Response>> {
        if msg.is_prefixed() {
            return Ok(Vec::new());
        }
        Ok(self
            .rules
            .iter()
            .filter(|(pattern, _)| pattern.is_match(&msg.text))
            .map(|(_, response)| Response::say(response.as_str()))
            .collect())
    }
}
