mod logging;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use lisa_server::{Server, ServerConfig, ServerError, TracingLogger};
use lisa_storage::ConnectionPool;
#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

#[derive(Debug, Parser)]
#[command(name = "lisa", about = "Durable priority queue served over HTTP/1.0")]
struct Cli {
    /// SQLite database file holding the queue.
    #[arg(short = 'd', long)]
    database: Option<String>,
    /// Address to listen on.
    #[arg(short = 'a', long)]
    address: Option<String>,
    #[arg(short = 'p', long, value_parser = clap::value_parser!(u16).range(1..))]
    port: Option<u16>,
    /// Worker threads, each with its own database connection.
    #[arg(short = 't', long, value_parser = clap::value_parser!(u16).range(1..=100))]
    threads: Option<u16>,
    /// TOML configuration file; flags override its values.
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,
}

impl Cli {
    fn server_config(&self) -> Result<ServerConfig, ServerError> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::load(path)?,
            None => ServerConfig::default(),
        };
        if let Some(database) = &self.database {
            config.database.path = database.clone();
        }
        if let Some(address) = &self.address {
            config.listen.host = address.clone();
        }
        if let Some(port) = self.port {
            config.listen.port = port;
        }
        if let Some(threads) = self.threads {
            config.workers = usize::from(threads);
        }
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), String> {
    let cli = Cli::parse();
    let config = cli.server_config().map_err(|err| err.to_string())?;
    let _guard = logging::init(&config.logging)?;

    let pool = ConnectionPool::open_sqlite(
        &config.database.path,
        config.workers,
        &config.sqlite_config(),
    )
    .map_err(|err| err.to_string())?;
    let server =
        Server::bind(&config, pool, Arc::new(TracingLogger)).map_err(|err| err.to_string())?;
    let handle = server.shutdown_handle().map_err(|err| err.to_string())?;

    let mut serve = tokio::task::spawn_blocking(move || server.run());
    tokio::select! {
        result = &mut serve => return flatten(result),
        signal = shutdown_signal() => {
            if let Err(err) = signal {
                tracing::error!(%err, "failed to listen for shutdown signals");
            }
            tracing::info!("shutdown signal received");
            handle.shutdown();
        }
    }

    flatten(serve.await)
}

fn flatten(
    joined: Result<Result<(), ServerError>, tokio::task::JoinError>,
) -> Result<(), String> {
    joined
        .map_err(|err| err.to_string())?
        .map_err(|err| err.to_string())
}

/// Resolves on SIGINT or, on Unix, SIGTERM.
async fn shutdown_signal() -> io::Result<()> {
    #[cfg(unix)]
    let mut sigterm = signal(SignalKind::terminate())?;
    #[cfg(unix)]
    let terminate = async {
        sigterm.recv().await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        result = tokio::signal::ctrl_c() => result,
        () = terminate => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use clap::Parser;

    use super::Cli;

    #[test]
    fn defaults_without_flags() {
        let config = Cli::try_parse_from(["lisa"]).unwrap().server_config().unwrap();

        assert_eq!(config.listen_addr(), "0.0.0.0:1972");
        assert_eq!(config.workers, 42);
    }

    #[test]
    fn flags_override_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "workers = 10\n[listen]\nport = 8080\n[database]\npath = \"from-file.db\""
        )
        .unwrap();
        let path = file.path().to_string_lossy().into_owned();

        let cli =
            Cli::try_parse_from(["lisa", "-c", path.as_str(), "-t", "3", "-d", "flag.db"]).unwrap();
        let config = cli.server_config().unwrap();

        assert_eq!(config.workers, 3);
        assert_eq!(config.database.path, "flag.db");
        assert_eq!(config.listen.port, 8080);
    }

    #[test]
    fn rejects_out_of_range_flags() {
        assert!(Cli::try_parse_from(["lisa", "-p", "0"]).is_err());
        assert!(Cli::try_parse_from(["lisa", "-t", "0"]).is_err());
        assert!(Cli::try_parse_from(["lisa", "-t", "101"]).is_err());
        assert!(Cli::try_parse_from(["lisa", "-a", "127.0.0.1", "-p", "65535"]).is_ok());
    }
}
