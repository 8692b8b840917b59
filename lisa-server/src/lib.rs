mod config;
mod connection;
mod error;
mod handler;
mod logger;
mod queue;
mod router;
mod server;

pub use config::{
    ConnectionConfig, DatabaseConfig, LimitsConfig, ListenConfig, LoggingConfig, MAX_WORKERS,
    MIN_WORKERS, ServerConfig,
};
pub use connection::{ConnectionOutcome, ConnectionSettings, serve_connection};
pub use error::ServerError;
pub use handler::RequestHandler;
pub use logger::{Logger, TracingLogger};
pub use queue::{QueueProcessor, finish_content};
pub use router::{Handler, Outcome, RequestContext, Router};
pub use server::{Server, ShutdownHandle};
