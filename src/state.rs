use crate::{config::Config, database::DbPool};
use std::sync::Arc;

/// Application state shared across all HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool for accessing the database
    pub pool: DbPool,
    /// Loaded configuration (JWT secret, booking hours)
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new AppState instance
    ///
    /// # Arguments
    /// * `pool` - Database connection pool
    /// * `config` - Application configuration
    pub fn new(pool: DbPool, config: Config) -> Self {
        Self {
            pool,
            config: Arc::new(config),
        }
    }
}
