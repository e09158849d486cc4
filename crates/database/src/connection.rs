use crate::error::DbError;
use dotenvy::dotenv;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// How a pool may touch the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// Reports and diagnostics. The file must already exist.
    ReadOnly,
    /// Migrations and ledger writers. Creates the file if missing.
    ReadWrite,
}

/// Resolves the ledger URL: `DATABASE_URL` (from the environment or a
/// `.env` file) wins over the configured default.
pub fn resolve_database_url(default_url: &str) -> String {
    // A missing .env file is normal outside development.
    dotenv().ok();
    env::var("DATABASE_URL").unwrap_or_else(|_| default_url.to_string())
}

/// Establishes a connection pool to the SQLite ledger.
///
/// A read-only pool opens the file with `SQLITE_OPEN_READONLY`, so the
/// reporting paths cannot mutate the ledger even by accident. An
/// unreachable ledger is returned as an error immediately; nothing retries.
pub async fn connect(
    default_url: &str,
    max_connections: u32,
    mode: AccessMode,
) -> Result<SqlitePool, DbError> {
    let database_url = resolve_database_url(default_url);
    if database_url.trim().is_empty() {
        return Err(DbError::ConnectionConfigError(
            "database URL must not be empty".to_string(),
        ));
    }

    let options = SqliteConnectOptions::from_str(&database_url)?;
    let options = match mode {
        AccessMode::ReadOnly => options.read_only(true),
        AccessMode::ReadWrite => options.create_if_missing(true),
    };

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect_with(options)
        .await?;

    tracing::debug!(url = %database_url, ?mode, "Connected to ledger.");
    Ok(pool)
}

/// Applies the embedded schema migrations.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), DbError> {
    // Use a relative path from the crate root
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
