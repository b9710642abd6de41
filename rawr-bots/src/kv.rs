//! Persistent key-value store backed by SQLite.
//!
//! One store is one table with a text primary key and a typed value column.
//! Callers own key normalization (e.g. lowercasing); the store compares
//! keys exactly as given.

use std::marker::PhantomData;
use std::path::Path;

use parking_lot::Mutex;
use rusqlite::types::FromSql;
use rusqlite::{Connection, OptionalExtension, ToSql, TransactionBehavior};

/// Table used when none is configured.
pub const DEFAULT_TABLE: &str = "data";

/// Alias for `Result<T, StoreError>`.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors from the key-value store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// SQLite operation failed.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The table name is not a plain SQL identifier.
    #[error("invalid table name: {0:?}")]
    InvalidTable(String),
}

/// A value type the store can hold. Only picks the column type.
pub trait KvValue: ToSql + FromSql + Send {
    /// SQL column type for the value column.
    const SQL_TYPE: &'static str;
}

impl KvValue for String {
    const SQL_TYPE: &'static str = "TEXT";
}

impl KvValue for i64 {
    const SQL_TYPE: &'static str = "INTEGER";
}

/// A single-table key-value store.
pub struct KvStore<V: KvValue> {
    db: Mutex<Connection>,
    table: String,
    _value: PhantomData<fn() -> V>,
}

impl<V: KvValue> std::fmt::Debug for KvStore<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KvStore")
            .field("table", &self.table)
            .field("value_type", &V::SQL_TYPE)
            .finish()
    }
}

impl<V: KvValue> KvStore<V> {
    /// Open or create a store in the default table.
    pub fn open(path: &Path) -> StoreResult<Self> {
        Self::open_table(path, DEFAULT_TABLE)
    }

    /// Open or create a store in `table`.
    pub fn open_table(path: &Path, table: &str) -> StoreResult<Self> {
        validate_table(table)?;
        let conn = Connection::open(path)?;
        tracing::debug!(path = %path.display(), table, "Opened key-value store");
        Self::init(conn, table)
    }

    /// Open an in-memory store (for testing).
    pub fn in_memory(table: &str) -> StoreResult<Self> {
        validate_table(table)?;
        Self::init(Connection::open_in_memory()?, table)
    }

    fn init(conn: Connection, table: &str) -> StoreResult<Self> {
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                key TEXT PRIMARY KEY,
                val {}
            );",
            V::SQL_TYPE
        ))?;
        Ok(Self {
            db: Mutex::new(conn),
            table: table.to_string(),
            _value: PhantomData,
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Get the value for `key`, or `None` if there is no record.
    pub fn get(&self, key: &str) -> StoreResult<Option<V>> {
        let db = self.db.lock();
        select(&db, &self.table, key)
    }

    /// Insert or overwrite the value for `key`.
    ///
    /// The existence check and the write share one transaction, so two
    /// writers racing on a new key cannot both attempt the insert.
    pub fn set(&self, key: &str, value: V) -> StoreResult<()> {
        self.update(key, |_| Some(value))?;
        Ok(())
    }

    /// Remove the record for `key`. Missing keys are not an error.
    pub fn delete(&self, key: &str) -> StoreResult<()> {
        let db = self.db.lock();
        db.execute(
            &format!("DELETE FROM {} WHERE key = ?1", self.table),
            rusqlite::params![key],
        )?;
        Ok(())
    }

    /// Read-modify-write `key` in one transaction.
    ///
    /// `f` receives the current value and returns the new one; `None`
    /// deletes the record. Returns what `f` returned.
    pub fn update<F>(&self, key: &str, f: F) -> StoreResult<Option<V>>
    where
        F: FnOnce(Option<V>) -> Option<V>,
    {
        let mut db = self.db.lock();
        let tx = db.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let current = select(&tx, &self.table, key)?;
        let existed = current.is_some();
        let next = f(current);
        match (&next, existed) {
            (Some(value), false) => {
                tx.execute(
                    &format!("INSERT INTO {} (key, val) VALUES (?1, ?2)", self.table),
                    rusqlite::params![key, value],
                )?;
            }
            (Some(value), true) => {
                tx.execute(
                    &format!("UPDATE {} SET val = ?1 WHERE key = ?2", self.table),
                    rusqlite::params![value, key],
                )?;
            }
            (None, true) => {
                tx.execute(
                    &format!("DELETE FROM {} WHERE key = ?1", self.table),
                    rusqlite::params![key],
                )?;
            }
            (None, false) => {}
        }
        tx.commit()?;
        Ok(next)
    }

    /// All records ordered by key.
    pub fn entries(&self) -> StoreResult<Vec<(String, V)>> {
        let db = self.db.lock();
        let mut stmt = db.prepare(&format!(
            "SELECT key, val FROM {} ORDER BY key ASC",
            self.table
        ))?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, V>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Number of records.
    pub fn len(&self) -> StoreResult<usize> {
        let db = self.db.lock();
        let n: i64 = db.query_row(
            &format!("SELECT COUNT(*) FROM {}", self.table),
            [],
            |row| row.get(0),
        )?;
        Ok(n as usize)
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }
}

fn select<V: KvValue>(conn: &Connection, table: &str, key: &str) -> StoreResult<Option<V>> {
    let value = conn
        .query_row(
            &format!("SELECT val FROM {table} WHERE key = ?1"),
            rusqlite::params![key],
            |row| row.get::<_, V>(0),
        )
        .optional()?;
    Ok(value)
}

/// Table names are interpolated into SQL, so only plain identifiers pass.
fn validate_table(table: &str) -> StoreResult<()> {
    let mut chars = table.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidTable(table.to_string()))
    }
}
