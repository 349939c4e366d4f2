//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! qb-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `CANTEEN_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string
//!
//! # Migration Files
//!
//! `crates/canteen/migrations/`, embedded at compile time.

use quickbites_canteen::config::CanteenConfig;
use quickbites_canteen::db;

use super::CommandError;

/// Run canteen database migrations.
///
/// # Errors
///
/// Returns an error if configuration is missing, the database is unreachable
/// or a migration fails.
pub async fn canteen() -> Result<(), CommandError> {
    let config = CanteenConfig::from_env()?;

    tracing::info!("Connecting to canteen database...");
    let pool = db::create_pool(&config.database_url).await?;

    tracing::info!("Running canteen migrations...");
    sqlx::migrate!("../canteen/migrations").run(&pool).await?;

    tracing::info!("Canteen migrations complete!");
    Ok(())
}
