use std::time::Duration;

use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};
use thiserror::Error;
use tracing::info;

use crate::config::DatabaseConfig;

/// Errors from the record store
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Builds the MySQL pool shared by the record repositories.
pub struct DatabaseManager;

impl DatabaseManager {
    pub fn connect_options(config: &DatabaseConfig) -> MySqlConnectOptions {
        MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password)
            .database(&config.database)
            .charset("utf8mb4")
    }

    /// Pool that opens connections on first use, so the server can start
    /// (and report degraded health) while the database is down.
    pub fn connect_lazy(config: &DatabaseConfig) -> MySqlPool {
        let pool = MySqlPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect_lazy_with(Self::connect_options(config));

        info!(
            host = %config.host,
            database = %config.database,
            max_connections = config.max_connections,
            "Configured database pool"
        );
        pool
    }

    /// Pings the pool to ensure connectivity
    pub async fn health_check(pool: &MySqlPool) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(pool).await?;
        Ok(())
    }
}
