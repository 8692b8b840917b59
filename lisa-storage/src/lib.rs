mod error;
mod pool;
mod schema;
mod session;
mod sqlite;

pub use error::StorageError;
pub use pool::ConnectionPool;
pub use schema::{QUEUE_TABLE, SCHEMA_VERSION, SchemaError, schema_version};
pub use session::{QueueSession, TakeOutcome, parse_priority};
pub use sqlite::{SqliteConfig, SqliteSession};
