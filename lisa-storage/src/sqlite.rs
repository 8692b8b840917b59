use std::path::Path;
use std::time::Duration;

use rusqlite::{Connection, OptionalExtension, params};

use crate::error::StorageError;
use crate::schema::apply_schema;
use crate::session::{QueueSession, TakeOutcome};

const COUNT_SQL: &str = "SELECT COUNT(*) FROM q";
const INSERT_SQL: &str = "INSERT INTO q (d, p) VALUES (?1, ?2)";
const HEAD_SQL: &str = "SELECT k, d FROM q ORDER BY p DESC, k ASC LIMIT 1";
const DELETE_SQL: &str = "DELETE FROM q WHERE k = ?1";

#[derive(Debug, Clone)]
pub struct SqliteConfig {
    pub busy_timeout_ms: u64,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            busy_timeout_ms: 5_000,
        }
    }
}

/// A queue session over its own SQLite connection.
///
/// Transactions start with `BEGIN IMMEDIATE`, so the database write lock is
/// held from `begin` to `commit`/`rollback`. Concurrent takes from other
/// sessions wait on that lock (bounded by the busy timeout) instead of on an
/// application mutex.
#[derive(Debug)]
pub struct SqliteSession {
    conn: Connection,
}

impl SqliteSession {
    pub fn open_with_config(
        path: impl AsRef<Path>,
        config: &SqliteConfig,
    ) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        let session = Self { conn };
        session.initialize(config)?;
        Ok(session)
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        let session = Self { conn };
        session.initialize(&SqliteConfig::default())?;
        Ok(session)
    }

    pub fn in_transaction(&self) -> bool {
        !self.conn.is_autocommit()
    }

    fn initialize(&self, config: &SqliteConfig) -> Result<(), StorageError> {
        self.conn
            .busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
        // In-memory databases answer "memory" here; that is fine.
        let _mode: String =
            self.conn
                .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        self.conn.pragma_update(None, "synchronous", "NORMAL")?;

        apply_schema(&self.conn)
    }
}

impl QueueSession for SqliteSession {
    fn begin(&mut self) -> Result<(), StorageError> {
        self.conn.execute_batch("BEGIN IMMEDIATE")?;
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StorageError> {
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), StorageError> {
        self.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }

    fn count(&mut self) -> Result<u64, StorageError> {
        let count = self
            .conn
            .prepare_cached(COUNT_SQL)?
            .query_row([], |row| row.get::<_, i64>(0))?;
        Ok(count.max(0) as u64)
    }

    fn insert(&mut self, priority: i32, payload: &[u8]) -> Result<i64, StorageError> {
        self.conn
            .prepare_cached(INSERT_SQL)?
            .execute(params![payload, priority])?;
        Ok(self.conn.last_insert_rowid())
    }

    fn take(&mut self, remove: bool) -> Result<Option<TakeOutcome>, StorageError> {
        let head = self
            .conn
            .prepare_cached(HEAD_SQL)?
            .query_row([], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, Vec<u8>>(1)?))
            })
            .optional()?;

        let Some((key, payload)) = head else {
            return Ok(Some(TakeOutcome::Empty));
        };

        if remove {
            let deleted = self.conn.prepare_cached(DELETE_SQL)?.execute([key])?;
            if deleted != 1 {
                return Ok(None);
            }
        }

        Ok(Some(TakeOutcome::Found(payload)))
    }
}
