//! Application configuration loaded from `config.json`.
//!
//! The file must exist before the bot starts; `chip --setup` generates it from
//! `template_config.json`. A missing file is reported as [`Error::ConfigMissing`],
//! which `main` turns into exit code 4.

use crate::{
    config::database::DEFAULT_DATABASE_PATH,
    core::prefix::PrefixSettings,
    errors::{Error, Result},
};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default location of the configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "./config.json";

/// Which bot account to log in as.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Production,
    Beta,
    Development,
}

impl Environment {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Production => "production",
            Self::Beta => "beta",
            Self::Development => "development",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Top-level structure of `config.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub tokens: Tokens,
    pub prefix: PrefixConfig,
    pub control: ControlConfig,
    /// `SQLite` file path, `./main.db` when unset
    #[serde(default)]
    pub sql: Option<String>,
    pub allowed_mentions: AllowedMentionsConfig,
    /// Bot owners; empty means the application owner is looked up at startup
    #[serde(deserialize_with = "deserialize_ids")]
    pub owners: Vec<u64>,
    /// Extensions loaded at startup, in order
    pub extensions: Vec<String>,
}

/// Bot tokens keyed by environment name.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Tokens {
    /// Environment used when none is given on the command line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Environment>,
    #[serde(flatten)]
    secrets: BTreeMap<String, Option<String>>,
}

impl fmt::Debug for Tokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let configured: Vec<_> = self
            .secrets
            .iter()
            .filter(|(_, token)| token.is_some())
            .map(|(env, _)| env.as_str())
            .collect();
        f.debug_struct("Tokens")
            .field("default", &self.default)
            .field("configured", &configured)
            .finish()
    }
}

impl Tokens {
    /// The token for `environment`, if one is configured.
    pub fn token_for(&self, environment: Environment) -> Result<&str> {
        self.secrets
            .get(environment.as_str())
            .and_then(Option::as_deref)
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| Error::Config {
                message: format!("No token configured for environment '{environment}'"),
            })
    }

    pub fn set(&mut self, environment: Environment, token: Option<String>) {
        self.secrets.insert(environment.as_str().to_string(), token);
    }
}

/// The `prefix` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrefixConfig {
    /// Global default prefixes; a single string or a list
    #[serde(deserialize_with = "one_or_many")]
    pub set: Vec<String>,
    /// Whether mentioning the bot triggers commands
    pub mention: bool,
    /// Whether guilds may set their own prefix
    #[serde(default = "enabled")]
    pub custom: bool,
}

/// The `control` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlConfig {
    /// Number of messages the framework cache keeps per channel
    pub max_messages: usize,
    /// The bot leaves newly joined guilds beyond this count
    #[serde(default)]
    pub max_guilds: Option<usize>,
}

/// Which mention categories outgoing messages may ping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllowedMentionsConfig {
    pub everyone: bool,
    pub users: bool,
    pub roles: bool,
    pub replied_user: bool,
}

impl Default for AllowedMentionsConfig {
    fn default() -> Self {
        Self {
            everyone: false,
            users: true,
            roles: false,
            replied_user: true,
        }
    }
}

impl AllowedMentionsConfig {
    /// Every category by name, for interactive editing.
    pub fn categories_mut(&mut self) -> [(&'static str, &mut bool); 4] {
        [
            ("everyone", &mut self.everyone),
            ("users", &mut self.users),
            ("roles", &mut self.roles),
            ("replied_user", &mut self.replied_user),
        ]
    }
}

impl AppConfig {
    /// Storage file, falling back to `./main.db` when `sql` is unset or blank.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.sql
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map_or_else(|| PathBuf::from(DEFAULT_DATABASE_PATH), PathBuf::from)
    }

    /// The environment to run: the command line choice, then `tokens.default`,
    /// then production.
    #[must_use]
    pub fn environment(&self, requested: Option<Environment>) -> Environment {
        requested
            .or(self.tokens.default)
            .unwrap_or(Environment::Production)
    }

    /// Global prefix policy for prefix resolution.
    #[must_use]
    pub fn prefix_settings(&self) -> PrefixSettings {
        PrefixSettings::new(self.prefix.set.clone(), self.prefix.mention, self.prefix.custom)
    }
}

/// Loads configuration from a JSON file.
///
/// # Errors
/// * [`Error::ConfigMissing`] if the file does not exist
/// * [`Error::Config`] if it cannot be read or parsed
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path = path.as_ref();
    debug!("Attempting to load configuration from: {:?}", path);
    if !path.exists() {
        return Err(Error::ConfigMissing {
            path: path.to_path_buf(),
        });
    }

    let contents = std::fs::read_to_string(path).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path.display()),
    })?;
    let config: AppConfig = serde_json::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config file {}: {e}", path.display()),
    })?;
    debug!("Loaded configuration: {:?}", config);
    Ok(config)
}

const fn enabled() -> bool {
    true
}

fn one_or_many<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(prefix) => vec![prefix],
        OneOrMany::Many(prefixes) => prefixes,
    })
}

fn deserialize_ids<'de, D>(deserializer: D) -> std::result::Result<Vec<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Number(u64),
        Text(String),
    }

    Vec::<Id>::deserialize(deserializer)?
        .into_iter()
        .map(|id| match id {
            Id::Number(n) => Ok(n),
            Id::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| serde::de::Error::custom(format!("'{s}' is not a valid user ID"))),
        })
        .collect()
}
