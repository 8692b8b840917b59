use lisa_storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("server configuration error: {0}")]
    Config(String),
    #[error("server storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("server IO error: {0}")]
    Io(#[from] std::io::Error),
}
