//! rawrbot: factoid and karma bot for IRC.
//!
//! Settings come from a TOML file (default `rawrbot.toml`, missing is fine);
//! flags and environment variables override it.
//!
//!   rawrbot --config rawrbot.toml --server irc.example.org:6697 --channel '#rawr'

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use rawr_sdk::client::{self, ReconnectConfig};
use tracing_subscriber::EnvFilter;

use rawrbot::config::BotConfig;

#[derive(Parser)]
#[command(name = "rawrbot", about = "Factoid and karma bot for IRC")]
struct Args {
    /// Config file
    #[arg(long, env = "RAWRBOT_CONFIG", default_value = "rawrbot.toml")]
    config: PathBuf,

    /// IRC server address (host:port)
    #[arg(long, env = "RAWRBOT_SERVER")]
    server: Option<String>,

    /// Bot nick
    #[arg(long, env = "RAWRBOT_NICK")]
    nick: Option<String>,

    /// Channel to join (repeatable; replaces the configured list)
    #[arg(long = "channel")]
    channels: Vec<String>,

    /// Server password
    #[arg(long, env = "RAWRBOT_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Use TLS
    #[arg(long)]
    tls: bool,

    /// Skip TLS certificate verification
    #[arg(long)]
    tls_insecure: bool,

    /// Command prefix
    #[arg(long)]
    prefix: Option<String>,

    /// Directory for the SQLite stores
    #[arg(long, env = "RAWRBOT_DATA_DIR")]
    data_dir: Option<PathBuf>,
}

impl Args {
    fn apply(self, config: &mut BotConfig) {
        if let Some(server) = self.server {
            config.server = server;
        }
        if let Some(nick) = self.nick {
            config.nick = nick;
        }
        if !self.channels.is_empty() {
            config.channels = self.channels;
        }
        if self.password.is_some() {
            config.password = self.password;
        }
        config.tls |= self.tls;
        config.tls_insecure |= self.tls_insecure;
        if let Some(prefix) = self.prefix {
            config.prefix = prefix;
        }
        if let Some(dir) = self.data_dir {
            config.data_dir = dir;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // JSON logs when RAWRBOT_LOG_JSON=1, human-readable otherwise
    let json_logs = std::env::var("RAWRBOT_LOG_JSON").unwrap_or_default() == "1";
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("rawrbot=info,rawr_sdk=info"));
    if json_logs {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let args = Args::parse();
    let mut config = BotConfig::load(&args.config)?;
    args.apply(&mut config);

    let bot = Arc::new(rawrbot::build_bot(&config)?);
    tracing::info!(
        server = %config.server,
        nick = %config.nick,
        channels = ?config.channels,
        plugins = ?bot.plugin_names(),
        "Starting rawrbot"
    );

    let reconnect = ReconnectConfig {
        channels: config.channels.clone(),
        ..ReconnectConfig::default()
    };
    let run = client::run_with_reconnect(config.connect_config(), reconnect, move |handle, event| {
        let bot = bot.clone();
        Box::pin(async move { bot.handle_event(&handle, &event).await })
    });

    tokio::select! {
        result = run => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted, shutting down");
            Ok(())
        }
    }
}
