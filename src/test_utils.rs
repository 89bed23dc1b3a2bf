//! Shared test utilities for Chip.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test records with sensible defaults.

use crate::{
    core::guild::{Guild, NewGuild},
    errors::Result,
};
use sea_orm::DatabaseConnection;

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    crate::logging::init_test_tracing();
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates a test guild with no overrides.
///
/// # Defaults
/// * `prefix`: None
/// * `mod_log` / `mod_role`: None
/// * `case_id`: 0
pub async fn create_test_guild(db: &DatabaseConnection, id: u64) -> Result<Guild> {
    Guild::create(db, NewGuild::new(id)).await
}

/// Creates a test guild with a custom prefix.
pub async fn create_guild_with_prefix(
    db: &DatabaseConnection,
    id: u64,
    prefix: &str,
) -> Result<Guild> {
    Guild::create(db, NewGuild::new(id).with_prefix(prefix)).await
}
