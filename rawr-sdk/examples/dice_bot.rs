//! Dice bot example: a single plugin hosted by [`Bot`].
//!
//! Usage:
//!   cargo run --example dice_bot -- --server irc.example.org:6697 --channel "#dice"
//!
//! Then in the channel: `!roll 2d6`, `!help dice`.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use rand::Rng;
use rawr_sdk::bot::Bot;
use rawr_sdk::client::{self, ConnectConfig, ReconnectConfig};
use rawr_sdk::plugin::{Incoming, Plugin, Response};

#[derive(Parser)]
#[command(name = "dice-bot", about = "rawr-sdk dice bot example")]
struct Args {
    #[arg(long, default_value = "127.0.0.1:6667")]
    server: String,
    #[arg(long, default_value = "dicebot")]
    nick: String,
    #[arg(long, default_value = "#dice")]
    channel: String,
    #[arg(long)]
    tls: bool,
}

struct Dice;

impl Dice {
    /// Parse `NdM`, e.g. `2d6`.
    fn parse(dice: &str) -> Option<(u32, u32)> {
        let (count, sides) = dice.split_once(['d', 'D'])?;
        let count = if count.is_empty() { 1 } else { count.parse().ok()? };
        let sides = sides.parse().ok()?;
        ((1..=20).contains(&count) && (2..=1000).contains(&sides)).then_some((count, sides))
    }
}

impl Plugin for Dice {
    fn name(&self) -> &str {
        "dice"
    }

    fn help(&self) -> &[&str] {
        &["Dice roller", "Usage: !roll 2d6"]
    }

    fn handle(&self, msg: &Incoming) -> Result<Vec<Response>> {
        let Some(dice) = msg.command_text().and_then(|c| c.strip_prefix("roll ")) else {
            return Ok(Vec::new());
        };
        let Some((count, sides)) = Self::parse(dice.trim()) else {
            return Ok(vec![Response::say(format!("{}: try something like 2d6", msg.sender))]);
        };
        let mut rng = rand::thread_rng();
        let rolls: Vec<u32> = (0..count).map(|_| rng.gen_range(1..=sides)).collect();
        let total: u32 = rolls.iter().sum();
        Ok(vec![Response::say(format!(
            "{} rolls {dice}: {rolls:?} = {total}",
            msg.sender
        ))])
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let bot = Arc::new(Bot::new(&args.nick, "!").with_plugin(Dice));
    let config = ConnectConfig {
        server_addr: args.server,
        nick: args.nick.clone(),
        user: args.nick.clone(),
        realname: "rawr-sdk dice bot".to_string(),
        tls: args.tls,
        ..ConnectConfig::default()
    };
    let reconnect = ReconnectConfig {
        channels: vec![args.channel],
        ..ReconnectConfig::default()
    };

    client::run_with_reconnect(config, reconnect, move |handle, event| {
        let bot = bot.clone();
        Box::pin(async move { bot.handle_event(&handle, &event).await })
    })
    .await
}
