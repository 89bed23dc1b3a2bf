/// Database connection and table creation
pub mod database;

/// `config.json` structure and loading
pub mod settings;

/// Interactive generation of `config.json`
pub mod setup;

pub use settings::{AppConfig, Environment, load_config};
