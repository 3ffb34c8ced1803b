use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::postgres::PgPoolOptions;

use crate::config::DatabaseConfig;

/// Database connection pool type
pub type DbPool = sqlx::PgPool;

/// Database connection type - supports both pool connections and transactions
/// Pass `&mut conn` for pool connections, `&mut *tx` for transactions
pub type DbConn = sqlx::PgConnection;

/// Opens the connection pool described by the database config.
pub async fn connect(config: &DatabaseConfig) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .idle_timeout(Duration::from_secs(300))
        .connect(config.connection_string().expose_secret())
        .await
}

/// Applies the embedded migrations.
pub async fn migrate(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
