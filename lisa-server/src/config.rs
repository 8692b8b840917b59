use std::path::Path;
use std::time::Duration;

use lisa_net::Limits;
use lisa_storage::SqliteConfig;
use serde::{Deserialize, Serialize};

use crate::error::ServerError;

pub const MIN_WORKERS: usize = 1;
pub const MAX_WORKERS: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    pub listen: ListenConfig,
    pub workers: usize,
    pub database: DatabaseConfig,
    pub connection: ConnectionConfig,
    pub limits: LimitsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ListenConfig {
    pub host: String,
    pub port: u16,
}

/// Where the queue lives. `path` is the SQLite database file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
    pub busy_timeout_ms: u64,
}

/// Socket timeouts; zero disables the timeout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ConnectionConfig {
    pub read_timeout_ms: u64,
    pub write_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_header_bytes: usize,
    pub max_body_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: ListenConfig::default(),
            workers: 42,
            database: DatabaseConfig::default(),
            connection: ConnectionConfig::default(),
            limits: LimitsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 1972,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "lisa.db".to_string(),
            busy_timeout_ms: SqliteConfig::default().busy_timeout_ms,
        }
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            read_timeout_ms: 30_000,
            write_timeout_ms: 30_000,
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        let limits = Limits::default();
        Self {
            max_header_bytes: limits.max_header_bytes,
            max_body_bytes: limits.max_body_bytes,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl ServerConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ServerError> {
        toml::from_str(text).map_err(|err| ServerError::Config(err.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ServerError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ServerError> {
        if !(MIN_WORKERS..=MAX_WORKERS).contains(&self.workers) {
            return Err(ServerError::Config(format!(
                "workers must be in [{MIN_WORKERS}, {MAX_WORKERS}], got {}",
                self.workers
            )));
        }
        if self.database.path.trim().is_empty() {
            return Err(ServerError::Config("database path cannot be empty".to_string()));
        }
        if self.listen.host.trim().is_empty() {
            return Err(ServerError::Config("listen host cannot be empty".to_string()));
        }
        if self.limits.max_header_bytes == 0 {
            return Err(ServerError::Config(
                "max_header_bytes must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.listen.host, self.listen.port)
    }

    pub fn sqlite_config(&self) -> SqliteConfig {
        SqliteConfig {
            busy_timeout_ms: self.database.busy_timeout_ms,
        }
    }

    pub fn parser_limits(&self) -> Limits {
        Limits {
            max_header_bytes: self.limits.max_header_bytes,
            max_body_bytes: self.limits.max_body_bytes,
        }
    }
}

impl ConnectionConfig {
    pub fn read_timeout(&self) -> Option<Duration> {
        non_zero_millis(self.read_timeout_ms)
    }

    pub fn write_timeout(&self) -> Option<Duration> {
        non_zero_millis(self.write_timeout_ms)
    }
}

fn non_zero_millis(millis: u64) -> Option<Duration> {
    (millis > 0).then(|| Duration::from_millis(millis))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use assert_matches::assert_matches;

    use super::ServerConfig;
    use crate::ServerError;

    #[test]
    fn defaults_validate() {
        let config = ServerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.listen_addr(), "0.0.0.0:1972");
        assert_eq!(config.workers, 42);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = ServerConfig::from_toml_str(
            r#"
workers = 8

[database]
path = "/var/lib/lisa/queue.db"

[connection]
read_timeout_ms = 0
"#,
        )
        .unwrap();

        assert_eq!(config.workers, 8);
        assert_eq!(config.database.path, "/var/lib/lisa/queue.db");
        assert_eq!(config.database.busy_timeout_ms, 5_000);
        assert_eq!(config.listen.port, 1972);
        assert_eq!(config.connection.read_timeout(), None);
        assert_eq!(
            config.connection.write_timeout(),
            Some(Duration::from_millis(30_000))
        );
    }

    #[test]
    fn rejects_out_of_range_workers() {
        for workers in [0, 101] {
            let config = ServerConfig {
                workers,
                ..ServerConfig::default()
            };
            assert_matches!(config.validate(), Err(ServerError::Config(_)));
        }
    }

    #[test]
    fn rejects_empty_database_path() {
        let mut config = ServerConfig::default();
        config.database.path = "  ".to_string();
        assert_matches!(config.validate(), Err(ServerError::Config(_)));
    }

    #[test]
    fn rejects_malformed_toml() {
        assert_matches!(
            ServerConfig::from_toml_str("workers = \"many\""),
            Err(ServerError::Config(_))
        );
    }

    #[test]
    fn maps_limits_and_storage_settings() {
        let mut config = ServerConfig::default();
        config.limits.max_body_bytes = 1024;
        config.database.busy_timeout_ms = 250;

        assert_eq!(config.parser_limits().max_body_bytes, 1024);
        assert_eq!(config.sqlite_config().busy_timeout_ms, 250);
    }
}
