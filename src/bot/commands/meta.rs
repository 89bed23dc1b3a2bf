//! Meta commands - latency and information about the bot.
//! Neither command touches the database.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::BotData,
        errors::{Error, Result},
    };
    use poise::serenity_prelude as serenity;
    use std::time::Instant;

    /// Shows you the bot's ping
    #[poise::command(
        slash_command,
        prefix_command,
        aliases("pong"),
        channel_cooldown = 1,
        required_bot_permissions = "EMBED_LINKS"
    )]
    pub async fn ping(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let start = Instant::now();
        let reply = ctx.say("Pinging...").await?;
        let http_time = start.elapsed();
        let gateway_time = ctx.ping().await;

        let author = ctx.author();
        let embed = serenity::CreateEmbed::new()
            .title("Pong!")
            .description(format!(
                "API latency: `{}ms`\nGateway Latency: `{}ms`",
                super::format_ms(http_time),
                super::format_ms(gateway_time)
            ))
            .color(0x002E_CC71) // Green
            .timestamp(serenity::Timestamp::now())
            .author(serenity::CreateEmbedAuthor::new(&author.name).icon_url(author.face()));

        reply
            .edit(ctx, poise::CreateReply::default().content("").embed(embed))
            .await?;
        Ok(())
    }

    /// Displays loads of metadata about the bot.
    #[poise::command(
        slash_command,
        prefix_command,
        aliases("about", "info"),
        user_cooldown = 3,
        required_bot_permissions = "EMBED_LINKS"
    )]
    pub async fn credits(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let data = ctx.data();
        let uptime = super::format_uptime(chrono::Utc::now() - data.started_at);
        let guilds = ctx.serenity_context().cache.guild_count();
        let owners = ctx.framework().options().owners.len();

        let embed = serenity::CreateEmbed::new()
            .title(format!("Chip v{}", env!("CARGO_PKG_VERSION")))
            .description(super::DESCRIPTION)
            .color(0x0034_98DB) // Blue
            .field("Uptime", uptime, true)
            .field("Servers", guilds.to_string(), true)
            .field("Owners", owners.to_string(), true)
            .field("Extensions", data.extensions.join(", "), false)
            .footer(serenity::CreateEmbedFooter::new(
                "Open source, built on serenity and poise",
            ));

        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        Ok(())
    }
}

use crate::{bot::extensions::Command, errors::Result};
use std::time::Duration;

/// Shown by `credits`.
pub const DESCRIPTION: &str =
    "Chip - A multi-purpose, open-source, easy to use and powerful moderation bot.";

/// Commands of the `meta` extension.
pub fn commands() -> Result<Vec<Command>> {
    Ok(vec![inner::ping(), inner::credits()])
}

/// Milliseconds with two decimals.
fn format_ms(duration: Duration) -> String {
    format!("{:.2}", duration.as_secs_f64() * 1000.0)
}

/// Compact uptime such as `2d 3h 4m 5s`; zero units are left out.
fn format_uptime(elapsed: chrono::TimeDelta) -> String {
    let total = elapsed.num_seconds().max(0);
    let parts = [
        (total / 86_400, "d"),
        (total % 86_400 / 3_600, "h"),
        (total % 3_600 / 60, "m"),
        (total % 60, "s"),
    ];
    let formatted: Vec<_> = parts
        .iter()
        .filter(|(value, _)| *value > 0)
        .map(|(value, unit)| format!("{value}{unit}"))
        .collect();
    if formatted.is_empty() {
        "0s".to_string()
    } else {
        formatted.join(" ")
    }
}

pub use inner::*;
