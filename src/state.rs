use std::sync::Arc;

use crate::auth::repo::{MemoryUserRepo, PgUserRepo, UserRepo};
use crate::config::{AppConfig, StoreBackend};
use crate::db;
use crate::students::repo::{MemoryStudentRepo, PgStudentRepo, StudentRepo};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserRepo>,
    pub students: Arc<dyn StudentRepo>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        Self::from_config(config).await
    }

    pub async fn from_config(config: Arc<AppConfig>) -> anyhow::Result<Self> {
        match config.store {
            StoreBackend::Memory => {
                tracing::info!("using in-memory store");
                Ok(Self::in_memory(config))
            }
            StoreBackend::Postgres => {
                let pool = db::connect(&config).await?;
                db::migrate(&pool).await?;
                tracing::info!("using postgres store");
                Ok(Self::from_parts(
                    config,
                    Arc::new(PgUserRepo::new(pool.clone())),
                    Arc::new(PgStudentRepo::new(pool)),
                ))
            }
        }
    }

    pub fn in_memory(config: Arc<AppConfig>) -> Self {
        Self::from_parts(
            config,
            Arc::new(MemoryUserRepo::new()),
            Arc::new(MemoryStudentRepo::new()),
        )
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        users: Arc<dyn UserRepo>,
        students: Arc<dyn StudentRepo>,
    ) -> Self {
        Self {
            config,
            users,
            students,
        }
    }

    /// In-memory state with a fixed test secret.
    #[cfg(test)]
    pub fn fake() -> Self {
        let config = Arc::new(AppConfig {
            environment: "test".into(),
            store: StoreBackend::Memory,
            database_url: None,
            database_max_connections: 1,
            jwt: crate::config::JwtConfig {
                secret: "test".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 120,
            },
            seed_demo_data: false,
        });
        Self::in_memory(config)
    }
}
