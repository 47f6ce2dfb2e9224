//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! helper-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `HELPER_DATABASE_URL` - `SQLite` connection string (falls back to `DATABASE_URL`,
//!   then `sqlite://helper.db?mode=rwc`)

use helper_server::config::get_database_url;
use helper_server::db;

use super::CommandError;

/// Run the embedded migrations against the configured database.
pub async fn run() -> Result<(), CommandError> {
    dotenvy::dotenv().ok();

    let database_url = get_database_url("HELPER_DATABASE_URL");

    tracing::info!("Connecting to database...");
    let pool = db::create_pool(&database_url).await?;

    tracing::info!("Running migrations...");
    db::run_migrations(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
