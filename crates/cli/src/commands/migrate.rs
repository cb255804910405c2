//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! aq-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `DATABASE_URL` - `PostgreSQL` connection string for the Supabase project
//!   (the direct connection, not the REST endpoint)
//!
//! # Migration Files
//!
//! Schema migrations live in `migrations/` at the workspace root. They create
//! the `products`, `orders` and `order_items` tables and a trigger per table
//! that issues `pg_notify('<table>_changes', TG_OP)` on every write. The
//! session table for `tower-sessions` is created afterwards.

use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use tower_sessions_sqlx_store::PostgresStore;

/// Errors from running migrations.
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Run schema migrations and create the session table.
///
/// # Errors
///
/// Returns an error if `DATABASE_URL` is unset, the connection fails or a
/// migration fails.
pub async fn run() -> Result<(), MigrationError> {
    let database_url = std::env::var("DATABASE_URL")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(SecretString::from)
        .ok_or(MigrationError::MissingEnvVar("DATABASE_URL"))?;

    tracing::info!("Connecting to database...");
    let pool = PgPool::connect(database_url.expose_secret()).await?;

    tracing::info!("Running schema migrations...");
    sqlx::migrate!("../../migrations").run(&pool).await?;

    tracing::info!("Creating session table...");
    PostgresStore::new(pool).migrate().await?;

    tracing::info!("Migrations complete");
    Ok(())
}
