use std::path::Path;

use crate::error::StorageError;
use crate::session::QueueSession;
use crate::sqlite::{SqliteConfig, SqliteSession};

/// Fixed set of storage sessions, one per worker.
///
/// The pool owns its sessions for its whole lifetime and only lends them out
/// as `&mut` borrows, so a session can never be reached by two workers.
#[derive(Debug)]
pub struct ConnectionPool<S> {
    sessions: Vec<S>,
}

impl<S: QueueSession> ConnectionPool<S> {
    /// Opens `size` sessions with `open`, which receives the worker id.
    pub fn open_with<F>(size: usize, mut open: F) -> Result<Self, StorageError>
    where
        F: FnMut(usize) -> Result<S, StorageError>,
    {
        let sessions = (0..size).map(&mut open).collect::<Result<Vec<_>, _>>()?;
        Ok(Self { sessions })
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn session_for(&mut self, worker_id: usize) -> Result<&mut S, StorageError> {
        self.sessions
            .get_mut(worker_id)
            .ok_or(StorageError::NoSession(worker_id))
    }

    /// Every session paired with the worker id it is bound to.
    pub fn sessions_mut(&mut self) -> impl Iterator<Item = (usize, &mut S)> {
        self.sessions.iter_mut().enumerate()
    }
}

impl ConnectionPool<SqliteSession> {
    pub fn open_sqlite(
        path: impl AsRef<Path>,
        size: usize,
        config: &SqliteConfig,
    ) -> Result<Self, StorageError> {
        let path = path.as_ref();
        Self::open_with(size, |_| SqliteSession::open_with_config(path, config))
    }
}
