//! Unified error type for Chip.
//!
//! Every fallible operation in the crate returns [`Result`]. Startup failures carry
//! the process exit code they map to, see [`Error::exit_code`].

use poise::serenity_prelude as serenity;
use sea_orm::{DbErr, SqlErr};
use std::path::PathBuf;
use thiserror::Error;

/// Exit code used when `config.json` does not exist at startup.
pub const EXIT_CONFIG_MISSING: i32 = 4;
/// Exit code used when the setup template is missing or malformed.
pub const EXIT_TEMPLATE: i32 = 2;
/// Exit code for every other fatal error, including setup failures.
pub const EXIT_FAILURE: i32 = 1;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("No configuration file at {}. Please run `chip --setup`.", path.display())]
    ConfigMissing { path: PathBuf },

    #[error("Setup template error: {message}")]
    SetupTemplate { message: String },

    #[error("Setup failed: {message}")]
    Setup { message: String },

    #[error("Database error: {0}")]
    Database(DbErr),

    #[error("Constraint violation: {message}")]
    ConstraintViolation { message: String },

    #[error("No `{table}` record matches {lookup}")]
    RecordNotFound { table: String, lookup: String },

    #[error("`{table}` record has no primary key, unable to {operation}")]
    MissingPrimaryKey {
        table: String,
        operation: &'static str,
    },

    #[error("`{table}` record was deleted and can no longer be used")]
    InvalidRecord { table: String },

    #[error("`{table}` has no attribute '{column}'")]
    AttributeNotFound { table: String, column: String },

    #[error("Invalid `{table}` operation: {message}")]
    Validation { table: String, message: String },

    #[error("Extension `{name}` failed: {message}")]
    Extension { name: String, message: String },

    #[error("Logging setup error: {message}")]
    Logging { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Serenity/Poise framework error: {0}")]
    #[allow(clippy::enum_variant_names)]
    FrameworkError(Box<serenity::Error>),
}

impl Error {
    /// The process exit code this error terminates with when it reaches `main`.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::ConfigMissing { .. } => EXIT_CONFIG_MISSING,
            Self::SetupTemplate { .. } => EXIT_TEMPLATE,
            _ => EXIT_FAILURE,
        }
    }

    /// Whether this is a lookup miss rather than a real failure.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::RecordNotFound { .. })
    }
}

impl From<DbErr> for Error {
    fn from(value: DbErr) -> Self {
        match value.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(message)) => {
                Self::ConstraintViolation { message }
            }
            _ => Self::Database(value),
        }
    }
}

impl From<serenity::Error> for Error {
    fn from(value: serenity::Error) -> Self {
        Self::FrameworkError(Box::new(value))
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
