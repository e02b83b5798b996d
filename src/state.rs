use crate::config::{AppConfig, LogConfig, LogFormat, StoreBackend, DEFAULT_LOG_FILTER};
use crate::db;
use crate::users::{MemoryUserStore, PgUserStore, UserStore};
use anyhow::Context;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn UserStore>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let config = Arc::new(config);

        let store = match config.store {
            StoreBackend::Postgres => {
                let db_config = config
                    .database
                    .as_ref()
                    .context("postgres store selected without database settings")?;
                let pool = db::connect(db_config).await?;
                db::migrate(&pool).await?;
                Arc::new(PgUserStore::new(pool)) as Arc<dyn UserStore>
            }
            StoreBackend::Memory => {
                tracing::warn!("using in-memory user store; records are lost on restart");
                Arc::new(MemoryUserStore::new()) as Arc<dyn UserStore>
            }
        };

        Ok(Self { store, config })
    }

    pub fn from_parts(store: Arc<dyn UserStore>, config: Arc<AppConfig>) -> Self {
        Self { store, config }
    }

    /// State over a fresh in-memory store, for tests and local runs.
    pub fn in_memory() -> Self {
        let config = Arc::new(AppConfig {
            host: "127.0.0.1".into(),
            port: 0,
            store: StoreBackend::Memory,
            database: None,
            log: LogConfig {
                filter: DEFAULT_LOG_FILTER.into(),
                format: LogFormat::Text,
            },
        });
        Self::from_parts(Arc::new(MemoryUserStore::new()), config)
    }
}
