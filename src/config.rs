use anyhow::Context;

pub const DEFAULT_LOG_FILTER: &str = "user_directory=debug,axum=info,tower_http=info";

/// Which record store backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl std::str::FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "pg" => Ok(Self::Postgres),
            "memory" | "mem" => Ok(Self::Memory),
            other => anyhow::bail!("unknown USER_STORE `{other}` (expected `postgres` or `memory`)"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => anyhow::bail!("unknown LOG_FORMAT `{other}` (expected `text` or `json`)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// `EnvFilter` directives, from `RUST_LOG`.
    pub filter: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub store: StoreBackend,
    pub database: Option<DatabaseConfig>,
    pub log: LogConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("APP_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port = match lookup("APP_PORT") {
            Some(v) => v.parse::<u16>().context("APP_PORT must be a port number")?,
            None => 8080,
        };
        let store = match lookup("USER_STORE") {
            Some(v) => v.parse()?,
            None => StoreBackend::Postgres,
        };

        let database = match store {
            StoreBackend::Postgres => {
                let url = lookup("DATABASE_URL")
                    .context("DATABASE_URL is required when USER_STORE=postgres")?;
                let max_connections = match lookup("DB_MAX_CONNECTIONS") {
                    Some(v) => v
                        .parse::<u32>()
                        .ok()
                        .filter(|n| *n > 0)
                        .context("DB_MAX_CONNECTIONS must be a positive integer")?,
                    None => 10,
                };
                Some(DatabaseConfig { url, max_connections })
            }
            StoreBackend::Memory => None,
        };

        let log = LogConfig {
            filter: lookup("RUST_LOG").unwrap_or_else(|| DEFAULT_LOG_FILTER.into()),
            format: match lookup("LOG_FORMAT") {
                Some(v) => v.parse()?,
                None => LogFormat::Text,
            },
        };

        Ok(Self {
            host,
            port,
            store,
            database,
            log,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
