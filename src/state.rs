use std::sync::Arc;

use anyhow::Context;
use sqlx::PgPool;

use crate::{
    auth::repo::{PgUserRepo, UserRepo},
    categories::repo::{CategoryRepo, PgCategoryRepo},
    config::{AppConfig, StoreBackend},
    db,
    memory::MemoryStore,
    password_reset::repo::{PgResetRepo, ResetRepo},
    products::repo::{PgProductRepo, ProductRepo},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserRepo>,
    pub categories: Arc<dyn CategoryRepo>,
    pub products: Arc<dyn ProductRepo>,
    pub resets: Arc<dyn ResetRepo>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        match config.store {
            StoreBackend::Postgres => {
                let url = config
                    .database_url
                    .as_deref()
                    .context("DATABASE_URL is not set")?;
                let pool = db::connect(url).await?;
                db::migrate(&pool).await?;
                tracing::info!("using postgres store");
                Ok(Self::from_pg(pool, config))
            }
            StoreBackend::Memory => {
                tracing::warn!("using in-memory store; data is lost on restart");
                Ok(Self::with_memory_store(config))
            }
        }
    }

    pub fn from_pg(pool: PgPool, config: Arc<AppConfig>) -> Self {
        Self {
            config,
            users: Arc::new(PgUserRepo::new(pool.clone())),
            categories: Arc::new(PgCategoryRepo::new(pool.clone())),
            products: Arc::new(PgProductRepo::new(pool.clone())),
            resets: Arc::new(PgResetRepo::new(pool)),
        }
    }

    pub fn with_memory_store(config: Arc<AppConfig>) -> Self {
        let store = MemoryStore::new();
        Self {
            config,
            users: Arc::new(store.clone()),
            categories: Arc::new(store.clone()),
            products: Arc::new(store.clone()),
            resets: Arc::new(store),
        }
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        Self::with_memory_store(Arc::new(AppConfig::for_tests()))
    }
}
