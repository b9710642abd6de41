//! Flat-file import and export for the stores.
//!
//! One `key => value` pair per line. Keys are lowercased on import so they
//! match how the plugins look them up.

use std::fmt::Display;
use std::io::{BufRead, Write};

use anyhow::{Context, Result};

use crate::kv::{KvStore, KvValue};

pub const DELIMITER: &str = " => ";

/// Counts from one import or export run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TransferStats {
    pub imported: usize,
    pub skipped: usize,
}

/// Split a line at its first delimiter. Both sides must be non-empty.
pub fn parse_line(line: &str) -> Option<(&str, &str)> {
    let line = line.trim_end_matches(['\r', '\n']);
    let (key, value) = line.split_once(DELIMITER)?;
    let key = key.trim();
    (!key.is_empty() && !value.trim().is_empty()).then_some((key, value))
}

/// Merge factoids from `reader`. Existing entries get the new text
/// appended with " or ".
pub fn import_learning<R: BufRead>(store: &KvStore<String>, reader: R) -> Result<TransferStats> {
    let mut stats = TransferStats::default();
    for line in reader.lines() {
        let line = line.context("Failed to read import file")?;
        let Some((key, value)) = parse_line(&line) else {
            stats.skipped += 1;
            continue;
        };
        store.update(&key.to_lowercase(), |current| {
            Some(match current {
                Some(existing) => format!("{existing} or {value}"),
                None => value.to_string(),
            })
        })?;
        stats.imported += 1;
    }
    tracing::info!(imported = stats.imported, skipped = stats.skipped, "Imported factoids");
    Ok(stats)
}

/// Load karma scores from `reader`, overwriting what is stored.
///
/// Zero scores are skipped since neutral keys are never stored.
pub fn import_karma<R: BufRead>(store: &KvStore<i64>, reader: R) -> Result<TransferStats> {
    let mut stats = TransferStats::default();
    for (n, line) in reader.lines().enumerate() {
        let line = line.context("Failed to read import file")?;
        let Some((key, value)) = parse_line(&line) else {
            stats.skipped += 1;
            continue;
        };
        let score = match value.trim().parse::<i64>() {
            Ok(0) => {
                stats.skipped += 1;
                continue;
            }
            Ok(score) => score,
            Err(e) => {
                tracing::warn!(line = n + 1, key, value, error = %e, "Skipping bad karma value");
                stats.skipped += 1;
                continue;
            }
        };
        store.set(&key.to_lowercase(), score)?;
        stats.imported += 1;
    }
    tracing::info!(imported = stats.imported, skipped = stats.skipped, "Imported karma");
    Ok(stats)
}

/// Write every entry as `key => value`, one per line.
pub fn export<V, W>(store: &KvStore<V>, mut writer: W) -> Result<TransferStats>
where
    V: KvValue + Display,
    W: Write,
{
    let mut stats = TransferStats::default();
    for (key, value) in store.entries()? {
        writeln!(
            writer,
            "{}{DELIMITER}{}",
            strip_newlines(&key),
            strip_newlines(&value.to_string())
        )
        .context("Failed to write export")?;
        stats.imported += 1;
    }
    writer.flush()?;
    tracing::info!(table = store.table(), exported = stats.imported, "Exported store");
    Ok(stats)
}

fn strip_newlines(s: &str) -> String {
    s.chars().filter(|c| !matches!(c, '\r' | '\n')).collect()
}
