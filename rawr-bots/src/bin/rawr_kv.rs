//! rawr-kv: move factoid and karma stores to and from flat files.
//!
//! Store locations default to the bot's config file; `--db` and `--table`
//! override them.
//!
//!   rawr-kv import-learning learning.txt
//!   rawr-kv export-karma karma.txt --db /var/lib/rawrbot/karma.sqlite3

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use rawrbot::config::{BotConfig, StoreConfig};
use rawrbot::kv::KvStore;
use rawrbot::transfer::{self, TransferStats};

#[derive(Parser)]
#[command(name = "rawr-kv", about = "Import and export rawrbot stores")]
struct Cli {
    /// Bot config file, used for default store locations
    #[arg(long, env = "RAWRBOT_CONFIG", default_value = "rawrbot.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Merge factoids from a flat file into the learning store
    ImportLearning(Transfer),
    /// Load karma scores from a flat file, overwriting existing ones
    ImportKarma(Transfer),
    /// Write the learning store to a flat file
    ExportLearning(Transfer),
    /// Write the karma store to a flat file
    ExportKarma(Transfer),
}

#[derive(Args)]
struct Transfer {
    /// Flat file with one `key => value` per line
    file: PathBuf,

    /// SQLite database (defaults to the configured store)
    #[arg(long)]
    db: Option<PathBuf>,

    /// Table name (defaults to the configured store)
    #[arg(long)]
    table: Option<String>,
}

impl Transfer {
    fn store<V: rawrbot::kv::KvValue>(&self, config: &BotConfig, store: &StoreConfig) -> Result<KvStore<V>> {
        let path = self.db.clone().unwrap_or_else(|| config.store_path(store));
        let table = self.table.as_deref().unwrap_or(&store.table);
        KvStore::open_table(&path, table)
            .with_context(|| format!("Failed to open {} (table {table})", path.display()))
    }
}

fn reader(path: &Path) -> Result<BufReader<File>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    Ok(BufReader::new(file))
}

fn writer(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    Ok(BufWriter::new(file))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("rawrbot=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = BotConfig::load(&cli.config)?;

    let stats: TransferStats = match &cli.command {
        Command::ImportLearning(t) => {
            let store = t.store::<String>(&config, &config.learning)?;
            transfer::import_learning(&store, reader(&t.file)?)?
        }
        Command::ImportKarma(t) => {
            let store = t.store::<i64>(&config, &config.karma)?;
            transfer::import_karma(&store, reader(&t.file)?)?
        }
        Command::ExportLearning(t) => {
            let store = t.store::<String>(&config, &config.learning)?;
            transfer::export(&store, writer(&t.file)?)?
        }
        Command::ExportKarma(t) => {
            let store = t.store::<i64>(&config, &config.karma)?;
            transfer::export(&store, writer(&t.file)?)?
        }
    };

    println!("{} written, {} skipped", stats.imported, stats.skipped);
    Ok(())
}
