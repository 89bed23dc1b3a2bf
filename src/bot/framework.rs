//! Framework setup, event handling and client startup.

use crate::{
    bot::{BotData, extensions},
    config::{AppConfig, settings::AllowedMentionsConfig},
    core::{
        guild::Guild,
        prefix::{resolve_prefixes, strip_prefix},
    },
    errors::{Error, Result},
};
use poise::serenity_prelude as serenity;
use sea_orm::DatabaseConnection;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

async fn on_error(error: poise::FrameworkError<'_, BotData, Error>) {
    match error {
        poise::FrameworkError::Setup { error, .. } => {
            error!("Failed to start bot: {:?}", error);
        }
        poise::FrameworkError::Command { error, ctx, .. } => {
            error!("Error in command `{}`: {:?}", ctx.command().name, error);
            if let Err(e) = ctx.say(format!("An error occurred: {error}")).await {
                error!("Failed to send error message: {}", e);
            }
        }
        poise::FrameworkError::EventHandler { error, event, .. } => {
            error!(
                "Error in event handler for {}: {:?}",
                event.snake_case_name(),
                error
            );
        }
        error => {
            if let Err(e) = poise::builtins::on_error(error).await {
                error!("Error while handling error: {}", e);
            }
        }
    }
}

/// Strips whichever prefix is valid for the message's guild.
fn strip_dynamic_prefix<'a>(
    ctx: &'a serenity::Context,
    msg: &'a serenity::Message,
    data: &'a BotData,
) -> poise::BoxFuture<'a, Result<Option<(&'a str, &'a str)>>> {
    Box::pin(async move {
        let bot_id = ctx.cache.current_user().id.get();
        let guild_id = msg.guild_id.map(serenity::GuildId::get);
        let prefixes = resolve_prefixes(&data.database, guild_id, bot_id, &data.prefixes).await?;
        Ok(strip_prefix(&msg.content, &prefixes))
    })
}

async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, BotData, Error>,
    data: &BotData,
) -> Result<()> {
    match event {
        serenity::FullEvent::Ready { data_about_bot } => {
            info!(
                "{} is online in {} guilds (shard {:?})",
                data_about_bot.user.name,
                data_about_bot.guilds.len(),
                data_about_bot.shard
            );
        }
        serenity::FullEvent::GuildCreate { guild, is_new } => {
            guild_create(ctx, guild, is_new.unwrap_or(false), data).await?;
        }
        serenity::FullEvent::GuildDelete { incomplete, .. } => {
            guild_delete(incomplete.id.get(), incomplete.unavailable, data).await?;
        }
        _ => {}
    }
    Ok(())
}

/// Makes sure the guild has a record and enforces `control.max_guilds`.
#[instrument(skip_all, fields(guild_id = %guild.id))]
async fn guild_create(
    ctx: &serenity::Context,
    guild: &serenity::Guild,
    is_new: bool,
    data: &BotData,
) -> Result<()> {
    Guild::get_or_create(&data.database, guild.id.get()).await?;
    if is_new {
        info!("Joined guild: {} (ID: {})", guild.name, guild.id);
    }

    let guild_count = ctx.cache.guild_count();
    if should_leave(data.config.control.max_guilds, is_new, guild_count) {
        warn!(
            "Leaving guild {} (ID: {}): {} guilds exceeds the configured limit",
            guild.name, guild.id, guild_count
        );
        guild.id.leave(&ctx.http).await?;
    }
    Ok(())
}

/// Removes the record of a guild the bot was removed from.
async fn guild_delete(guild_id: u64, unavailable: bool, data: &BotData) -> Result<()> {
    if unavailable {
        return Ok(());
    }

    match Guild::get(&data.database, guild_id).await {
        Ok(mut guild) => {
            guild.delete().await?;
            info!("Left guild {}, record deleted", guild_id);
            Ok(())
        }
        Err(e) if e.is_not_found() => Ok(()),
        Err(e) => Err(e),
    }
}

/// Whether a newly joined guild pushes the bot over its guild limit.
const fn should_leave(max_guilds: Option<usize>, is_new: bool, guild_count: usize) -> bool {
    match max_guilds {
        Some(max) => is_new && guild_count > max,
        None => false,
    }
}

fn allowed_mentions(config: AllowedMentionsConfig) -> serenity::CreateAllowedMentions {
    serenity::CreateAllowedMentions::new()
        .everyone(config.everyone)
        .all_users(config.users)
        .all_roles(config.roles)
        .replied_user(config.replied_user)
}

fn owner_ids(owners: &[u64]) -> HashSet<serenity::UserId> {
    owners
        .iter()
        .filter(|id| **id != 0)
        .map(|id| serenity::UserId::new(*id))
        .collect()
}

/// Builds the framework and client, then runs until every shard is shut down.
#[instrument(skip(token, config, database))]
pub async fn run_bot(
    token: String,
    config: Arc<AppConfig>,
    database: DatabaseConnection,
) -> Result<()> {
    let loaded = extensions::load(&config.extensions);
    info!(
        "Loaded {} extensions: {:?}",
        loaded.names.len(),
        loaded.names
    );

    let owners = owner_ids(&config.owners);
    let initialize_owners = owners.is_empty();
    let names = loaded.names;
    let setup_config = Arc::clone(&config);

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: loaded.commands,
            on_error: |error| Box::pin(on_error(error)),
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            prefix_options: poise::PrefixFrameworkOptions {
                prefix: None,
                stripped_dynamic_prefix: Some(strip_dynamic_prefix),
                mention_as_prefix: false,
                case_insensitive_commands: true,
                ..Default::default()
            },
            allowed_mentions: Some(allowed_mentions(config.allowed_mentions)),
            owners,
            initialize_owners,
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                info!("Logged in as {}", ready.user.name);
                info!("Registering commands globally...");
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                Ok(BotData::new(database, setup_config, names))
            })
        })
        .build();

    let intents =
        serenity::GatewayIntents::non_privileged() | serenity::GatewayIntents::MESSAGE_CONTENT;

    let mut cache_settings = serenity::cache::Settings::default();
    cache_settings.max_messages = config.control.max_messages;

    info!("Setting up Serenity client for Poise framework...");
    let mut client = serenity::ClientBuilder::new(&token, intents)
        .framework(framework)
        .cache_settings(cache_settings)
        .activity(serenity::ActivityData::watching("gears turn..."))
        .status(serenity::OnlineStatus::DoNotDisturb)
        .await
        .inspect_err(|e| error!("Error creating client: {:?}", e))?;

    info!("Starting bot client...");
    client
        .start()
        .await
        .inspect_err(|e| error!("Client error: {:?}", e))?;
    info!("All shards shut down, logged out");
    Ok(())
}
