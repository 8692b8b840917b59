use rusqlite::{Connection, Transaction, TransactionBehavior};
use thiserror::Error;

use crate::error::StorageError;

pub const QUEUE_TABLE: &str = "q";

/// Stored in `PRAGMA user_version` once the schema below is in place.
pub const SCHEMA_VERSION: i64 = 1;

/// `k` is the insertion key, `p` the priority and `d` the payload.
const CREATE_QUEUE_SQL: &str = "CREATE TABLE IF NOT EXISTS q (
    k INTEGER PRIMARY KEY AUTOINCREMENT,
    p INTEGER NOT NULL DEFAULT 0,
    d BLOB NOT NULL
)";

/// Matches the take order: highest `p` first, then oldest `k`.
const CREATE_TAKE_INDEX_SQL: &str =
    "CREATE INDEX IF NOT EXISTS idx_q_take_order ON q(p DESC, k ASC)";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("database schema version {found} is newer than supported version {supported}")]
    UnsupportedVersion { found: i64, supported: i64 },
}

pub fn schema_version(conn: &Connection) -> Result<i64, StorageError> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}

/// Creates the queue table and index if missing and stamps the version.
/// A database written by a newer schema is refused untouched.
pub fn apply_schema(conn: &Connection) -> Result<(), StorageError> {
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    let found = schema_version(&tx)?;
    if found > SCHEMA_VERSION {
        return Err(SchemaError::UnsupportedVersion {
            found,
            supported: SCHEMA_VERSION,
        }
        .into());
    }

    tx.execute(CREATE_QUEUE_SQL, [])?;
    tx.execute(CREATE_TAKE_INDEX_SQL, [])?;
    if found < SCHEMA_VERSION {
        tx.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    }
    tx.commit()?;
    Ok(())
}
