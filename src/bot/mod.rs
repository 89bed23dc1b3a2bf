//! Bot layer - Discord-specific interface and command handlers
//!
//! This module provides the Discord interface for Chip: the extension registry,
//! every command, guild lifecycle events and the shared bot context.

/// Discord command implementations (meta, owner, settings)
pub mod commands;
/// Named command bundles loaded at startup
pub mod extensions;
/// Framework options, event handling and client startup
pub mod framework;

use crate::config::AppConfig;
use crate::core::prefix::PrefixSettings;
use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

/// Shared data available to all bot commands.
/// This structure holds the database connection, the loaded configuration and
/// the bookkeeping commands report on.
pub struct BotData {
    /// Database connection shared by every record
    pub database: DatabaseConnection,
    /// Configuration the bot was started with
    pub config: Arc<AppConfig>,
    /// Global prefix policy
    pub prefixes: PrefixSettings,
    /// Extensions that loaded successfully, in load order
    pub extensions: Vec<&'static str>,
    /// When the framework finished setting up
    pub started_at: DateTime<Utc>,
}

impl BotData {
    /// Creates a new `BotData` instance for a freshly started bot.
    #[must_use]
    pub fn new(
        database: DatabaseConnection,
        config: Arc<AppConfig>,
        extensions: Vec<&'static str>,
    ) -> Self {
        let prefixes = config.prefix_settings();
        Self {
            database,
            config,
            prefixes,
            extensions,
            started_at: Utc::now(),
        }
    }
}

pub use framework::run_bot;
