use thiserror::Error;

use crate::schema::SchemaError;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),
    #[error("invalid priority {0:?}")]
    InvalidPriority(String),
    #[error("no storage session for worker {0}")]
    NoSession(usize),
    #[error("take produced no result row")]
    NoResultRow,
}
