//! Bot configuration.
//!
//! Read from a TOML file (`rawrbot.toml` by default). Every field has a
//! default, so a missing file or a partial one both work. Command-line
//! flags override what the file says.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rawr_sdk::client::ConnectConfig;
use serde::Deserialize;

use crate::factoid;
use crate::reactions::Reaction;

/// Where one store lives.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite file. Relative paths resolve against `data_dir`.
    pub file: PathBuf,
    pub table: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from("data.sqlite3"),
            table: crate::kv::DEFAULT_TABLE.to_string(),
        }
    }
}

impl StoreConfig {
    fn named(name: &str) -> Self {
        Self {
            file: PathBuf::from(format!("{name}.sqlite3")),
            table: name.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// IRC server (host:port).
    pub server: String,
    pub nick: String,
    pub user: String,
    pub realname: String,
    /// Server password.
    pub password: Option<String>,
    /// Channels joined after every registration.
    pub channels: Vec<String>,
    /// Use TLS. Port 6697 implies it.
    pub tls: bool,
    /// Skip TLS certificate verification.
    pub tls_insecure: bool,
    /// Command prefix, e.g. `!karma foo`.
    pub prefix: String,
    /// Base directory for relative store paths.
    pub data_dir: PathBuf,
    pub learning: StoreConfig,
    pub karma: StoreConfig,
    /// First words the learning plugin leaves to other plugins.
    pub reserved_words: Vec<String>,
    pub reactions: Vec<Reaction>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            server: "127.0.0.1:6667".to_string(),
            nick: "rawrbot".to_string(),
            user: "rawrbot".to_string(),
            realname: "rawrbot".to_string(),
            password: None,
            channels: Vec::new(),
            tls: false,
            tls_insecure: false,
            prefix: "!".to_string(),
            data_dir: PathBuf::from("."),
            learning: StoreConfig::named("learning"),
            karma: StoreConfig::named("karma"),
            reserved_words: factoid::DEFAULT_RESERVED
                .iter()
                .map(|w| w.to_string())
                .collect(),
            reactions: Vec::new(),
        }
    }
}

impl BotConfig {
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).context("Invalid config")
    }

    /// Load `path`, or defaults when it doesn't exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("Failed to load {}", path.display()))
    }

    /// Resolved path of a store file.
    pub fn store_path(&self, store: &StoreConfig) -> PathBuf {
        if store.file.is_absolute() {
            store.file.clone()
        } else {
            self.data_dir.join(&store.file)
        }
    }

    pub fn connect_config(&self) -> ConnectConfig {
        ConnectConfig {
            server_addr: self.server.clone(),
            nick: self.nick.clone(),
            user: self.user.clone(),
            realname: self.realname.clone(),
            password: self.password.clone(),
            tls: self.tls,
            tls_insecure: self.tls_insecure,
        }
    }
}
