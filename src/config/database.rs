//! Database configuration module for Chip.
//!
//! This module opens the `SQLite` file configured in `config.json` and makes sure every
//! table the bot needs exists. The file is created on first start. Table creation is
//! idempotent, so it runs on every startup without touching existing rows.

use crate::core::guild::Guild;
use crate::errors::Result;
use sea_orm::{Database, DatabaseConnection};
use std::path::Path;
use tracing::{info, instrument};

/// Storage file used when the configuration does not name one.
pub const DEFAULT_DATABASE_PATH: &str = "./main.db";

/// Builds the `sea-orm` connection URL for a `SQLite` file, creating it if missing.
#[must_use]
pub fn database_url(path: &Path) -> String {
    format!("sqlite://{}?mode=rwc", path.display())
}

/// Opens the database at `path` and ensures all tables exist.
#[instrument]
pub async fn init_db(path: &Path) -> Result<DatabaseConnection> {
    let db = create_connection(path).await?;
    info!("Database connection opened. Ensuring tables are created...");
    create_tables(&db).await?;
    Ok(db)
}

/// Establishes a connection to the `SQLite` file at `path`.
pub async fn create_connection(path: &Path) -> Result<DatabaseConnection> {
    Database::connect(database_url(path))
        .await
        .map_err(Into::into)
}

/// Creates every table used by the bot if it does not exist yet.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    Guild::ensure_table(db).await?;
    info!("Database tables ensured.");
    Ok(())
}
