//! Settings commands - per-guild configuration.
//!
//! Guilds may override the global prefix with one of their own unless
//! `prefix.custom` is disabled in `config.json`.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::BotData,
        core::{
            guild::Guild,
            prefix::{resolve_prefixes, validate_prefix},
        },
        errors::{Error, Result},
    };
    use tracing::info;

    /// Shows or changes this server's command prefix.
    #[poise::command(
        slash_command,
        prefix_command,
        guild_only,
        subcommands("show", "set", "reset"),
        subcommand_required
    )]
    pub async fn prefix(_ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        Ok(())
    }

    /// Shows the prefixes that trigger commands in this server
    #[poise::command(slash_command, prefix_command, guild_only)]
    pub async fn show(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let data = ctx.data();
        let guild_id = ctx.guild_id().map(|id| id.get());
        let bot_id = ctx.framework().bot_id.get();

        let prefixes = resolve_prefixes(&data.database, guild_id, bot_id, &data.prefixes).await?;
        ctx.say(super::format_prefixes(&prefixes)).await?;
        Ok(())
    }

    /// Sets a custom prefix for this server
    #[poise::command(
        slash_command,
        prefix_command,
        guild_only,
        required_permissions = "MANAGE_GUILD"
    )]
    pub async fn set(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "New prefix, up to 16 characters without spaces"] new_prefix: String,
    ) -> Result<()> {
        let data = ctx.data();
        if !data.prefixes.custom {
            ctx.say(super::CUSTOM_DISABLED).await?;
            return Ok(());
        }
        if let Err(e) = validate_prefix(&new_prefix) {
            ctx.say(format!("❌ {e}")).await?;
            return Ok(());
        }

        let guild_id = super::require_guild(ctx.guild_id())?;
        let mut guild = Guild::get_or_create(&data.database, guild_id).await?;
        guild.set_prefix(Some(new_prefix.clone())).await?;
        info!(
            "Prefix of guild {} set to {:?} by {}",
            guild_id,
            new_prefix,
            ctx.author().name
        );

        ctx.say(format!("✅ Prefix set to `{new_prefix}`")).await?;
        Ok(())
    }

    /// Resets this server's prefix to the default
    #[poise::command(
        slash_command,
        prefix_command,
        guild_only,
        required_permissions = "MANAGE_GUILD"
    )]
    pub async fn reset(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let data = ctx.data();
        if !data.prefixes.custom {
            ctx.say(super::CUSTOM_DISABLED).await?;
            return Ok(());
        }

        let guild_id = super::require_guild(ctx.guild_id())?;
        let mut guild = Guild::get_or_create(&data.database, guild_id).await?;
        if guild.prefix()?.is_some() {
            guild.set_prefix(None).await?;
            info!("Prefix of guild {} reset by {}", guild_id, ctx.author().name);
        }

        ctx.say(format!(
            "✅ Prefix reset to {}",
            super::format_prefix_list(data.prefixes.defaults())
        ))
        .await?;
        Ok(())
    }
}

use crate::{
    bot::extensions::Command,
    errors::{Error, Result},
};
use poise::serenity_prelude as serenity;
use std::fmt::Write;

const CUSTOM_DISABLED: &str = "Custom prefixes are disabled on this bot.";

/// Commands of the `settings` extension.
pub fn commands() -> Result<Vec<Command>> {
    Ok(vec![inner::prefix()])
}

fn require_guild(guild_id: Option<serenity::GuildId>) -> Result<u64> {
    guild_id.map(serenity::GuildId::get).ok_or_else(|| Error::Validation {
        table: "guilds".to_string(),
        message: "this command only works in a server".to_string(),
    })
}

fn format_prefix_list(prefixes: &[String]) -> String {
    prefixes
        .iter()
        .map(|p| format!("`{p}`"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Lists the prefixes, showing mentions as written rather than as code.
fn format_prefixes(prefixes: &[String]) -> String {
    let (mentions, plain): (Vec<&String>, Vec<&String>) =
        prefixes.iter().partition(|p| p.starts_with("<@"));
    let plain: Vec<String> = plain.into_iter().cloned().collect();

    let mut message = format!("My prefix here is {}", format_prefix_list(&plain));
    if let Some(mention) = mentions.first() {
        let _ = write!(message, ", or you can mention me ({mention})");
    }
    message
}

pub use inner::*;
