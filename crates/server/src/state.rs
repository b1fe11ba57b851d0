//! Shared application state.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::services::{ImageStore, TokenService};

/// State handed to every handler. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    pool: PgPool,
    tokens: Arc<TokenService>,
    images: ImageStore,
}

impl AppState {
    /// Build application state from config and an established pool.
    #[must_use]
    pub fn new(config: Config, pool: PgPool) -> Self {
        let tokens = Arc::new(TokenService::new(&config.jwt));
        let images = ImageStore::new(&config.upload_dir);
        Self {
            config: Arc::new(config),
            pool,
            tokens,
            images,
        }
    }

    /// Database connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Application configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Token issue/verify service.
    #[must_use]
    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Image asset store.
    #[must_use]
    pub const fn images(&self) -> &ImageStore {
        &self.images
    }
}
