//! rawrbot: an IRC bot that learns factoids and keeps karma.
//!
//! - `learning`: "foo is bar" / "foo" / forget / literal / edit
//! - `karma`: `foo++`, `(foo bar)--`, `!karma foo`
//! - `reactions`: configured trigger → response pairs
//!
//! Plugins are built here from a [`config::BotConfig`] and hosted by
//! [`rawr_sdk::bot::Bot`].

pub mod config;
pub mod factoid;
pub mod karma;
pub mod kv;
pub mod phrases;
pub mod reactions;
pub mod transfer;

use anyhow::{Context, Result};
use rawr_sdk::bot::Bot;

use crate::config::BotConfig;
use crate::factoid::Factoids;
use crate::karma::Karma;
use crate::kv::KvStore;
use crate::phrases::{RandomSelector, Selector};
use crate::reactions::Reactions;

/// Open the stores and assemble the bot with the given phrase selector.
///
/// Plugin order: karma, learning, reactions.
pub fn build_bot_with(config: &BotConfig, selector: Box<dyn Selector>) -> Result<Bot> {
    std::fs::create_dir_all(&config.data_dir)
        .with_context(|| format!("Failed to create {}", config.data_dir.display()))?;

    let karma_path = config.store_path(&config.karma);
    let karma_store = KvStore::open_table(&karma_path, &config.karma.table)
        .with_context(|| format!("Failed to open karma store {}", karma_path.display()))?;

    let learning_path = config.store_path(&config.learning);
    let learning_store = KvStore::open_table(&learning_path, &config.learning.table)
        .with_context(|| format!("Failed to open learning store {}", learning_path.display()))?;

    let karma = Karma::new(karma_store)?;
    let factoids = Factoids::new(learning_store, selector, &config.reserved_words)
        .context("Invalid reserved words")?;
    let reactions = Reactions::new(&config.reactions).context("Invalid reaction trigger")?;
    tracing::info!(reactions = reactions.len(), "Plugins ready");

    Ok(Bot::new(&config.nick, &config.prefix)
        .with_plugin(karma)
        .with_plugin(factoids)
        .with_plugin(reactions))
}

/// [`build_bot_with`] using random phrase selection.
pub fn build_bot(config: &BotConfig) -> Result<Bot> {
    build_bot_with(config, Box::new(RandomSelector))
}
