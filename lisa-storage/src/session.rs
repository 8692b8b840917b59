use crate::error::StorageError;

/// Result of a take that produced a row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TakeOutcome {
    Found(Vec<u8>),
    Empty,
}

/// One storage session: explicit transaction control plus the queue
/// statements. A session is used by exactly one worker at a time.
pub trait QueueSession: Send {
    fn begin(&mut self) -> Result<(), StorageError>;
    fn commit(&mut self) -> Result<(), StorageError>;
    fn rollback(&mut self) -> Result<(), StorageError>;

    fn count(&mut self) -> Result<u64, StorageError>;

    /// Stores `payload` and returns its insertion key.
    fn insert(&mut self, priority: i32, payload: &[u8]) -> Result<i64, StorageError>;

    /// Selects the highest-priority, oldest item and removes it when
    /// `remove` is set. Must be called inside a transaction.
    ///
    /// `Ok(None)` means the store produced no result row at all, which
    /// callers treat as a failure rather than an empty queue.
    fn take(&mut self, remove: bool) -> Result<Option<TakeOutcome>, StorageError>;
}

pub fn parse_priority(raw: &str) -> Result<i32, StorageError> {
    raw.parse::<i32>()
        .map_err(|err| StorageError::InvalidPriority(format!("{raw}: {err}")))
}
