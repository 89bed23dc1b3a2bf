//! Prefix resolution - decides which prefixes trigger commands for a message.
//!
//! Runs for every incoming message, so a guild lookup is a single primary-key read
//! and direct messages never touch storage.

use crate::{
    core::guild::Guild,
    errors::{Error, Result},
};
use sea_orm::DatabaseConnection;

/// Prefix used when the configuration does not name any.
pub const FALLBACK_PREFIX: &str = "//";

/// Longest custom prefix a guild may set.
pub const MAX_PREFIX_LEN: usize = 16;

/// Global prefix policy, built from the `prefix` section of the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixSettings {
    defaults: Vec<String>,
    /// Whether the bot's mention also triggers commands.
    pub mention: bool,
    /// Whether guilds may override the prefix.
    pub custom: bool,
}

impl PrefixSettings {
    /// Empty or blank defaults are replaced with [`FALLBACK_PREFIX`].
    #[must_use]
    pub fn new(defaults: Vec<String>, mention: bool, custom: bool) -> Self {
        let mut defaults: Vec<String> = defaults
            .into_iter()
            .filter(|p| !p.trim().is_empty())
            .collect();
        if defaults.is_empty() {
            defaults.push(FALLBACK_PREFIX.to_string());
        }
        Self {
            defaults,
            mention,
            custom,
        }
    }

    /// The global default prefixes, never empty.
    #[must_use]
    pub fn defaults(&self) -> &[String] {
        &self.defaults
    }
}

/// The two forms a user mention of `bot_id` takes in message content.
#[must_use]
pub fn mention_prefixes(bot_id: u64) -> [String; 2] {
    [format!("<@{bot_id}>"), format!("<@!{bot_id}>")]
}

/// Resolves every valid trigger prefix for a message from `guild_id`.
///
/// Direct messages (`None`) get the global defaults. Guilds get their stored prefix,
/// falling back to the global defaults when none is stored or the guild has no row.
/// Mention forms are appended when mentions are enabled.
pub async fn resolve_prefixes(
    db: &DatabaseConnection,
    guild_id: Option<u64>,
    bot_id: u64,
    settings: &PrefixSettings,
) -> Result<Vec<String>> {
    let mut prefixes = match guild_id {
        Some(id) if settings.custom => match Guild::get(db, id).await {
            Ok(guild) => guild
                .prefix()?
                .map_or_else(|| settings.defaults.clone(), |p| vec![p.to_string()]),
            Err(e) if e.is_not_found() => settings.defaults.clone(),
            Err(e) => return Err(e),
        },
        _ => settings.defaults.clone(),
    };

    if settings.mention {
        prefixes.extend(mention_prefixes(bot_id));
    }
    Ok(prefixes)
}

/// Splits `content` into `(prefix, rest)` using the longest matching prefix.
///
/// Whitespace between the prefix and the command is skipped.
#[must_use]
pub fn strip_prefix<'a>(content: &'a str, prefixes: &[String]) -> Option<(&'a str, &'a str)> {
    let matched = prefixes
        .iter()
        .filter(|p| !p.is_empty() && content.starts_with(p.as_str()))
        .max_by_key(|p| p.len())?;
    let (prefix, rest) = content.split_at(matched.len());
    Some((prefix, rest.trim_start()))
}

/// Checks a prefix a guild wants to set.
pub fn validate_prefix(prefix: &str) -> Result<()> {
    let message = if prefix.is_empty() {
        "prefix cannot be empty".to_string()
    } else if prefix.chars().count() > MAX_PREFIX_LEN {
        format!("prefix cannot be longer than {MAX_PREFIX_LEN} characters")
    } else if prefix.chars().any(char::is_whitespace) {
        "prefix cannot contain whitespace".to_string()
    } else {
        return Ok(());
    };
    Err(Error::Validation {
        table: "guilds".to_string(),
        message,
    })
}
