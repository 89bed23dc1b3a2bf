//! Owner commands - reloading extensions and shutting the bot down.
//!
//! Both commands are restricted to the owners listed in `config.json` (or the
//! application owner when that list is empty).

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, extensions as registry},
        errors::{Error, Result},
    };
    use tracing::{error, info};

    /// Re-initializes extensions to check they still load, then re-syncs commands.
    ///
    /// Pass a space-delimited list of extensions, or nothing, "~", "all" or "auto"
    /// to check every loaded extension. Running commands are not replaced.
    #[poise::command(prefix_command, owners_only, hide_in_help)]
    pub async fn reload(
        ctx: poise::Context<'_, BotData, Error>,
        #[rest] extensions: Option<String>,
    ) -> Result<()> {
        let loaded = &ctx.data().extensions;
        let targets = super::reload_targets(extensions.as_deref(), loaded);
        info!(
            "Reloading {:?} at the request of {}...",
            targets,
            ctx.author().name
        );

        let results: Vec<(String, Result<usize>)> = targets
            .into_iter()
            .map(|name| {
                let result = registry::reload(&name, loaded);
                (name, result)
            })
            .collect();
        for (name, result) in &results {
            if let Err(e) = result {
                error!("Failed to re-load extension {}: {}", name, e);
            }
        }

        if results.iter().any(|(_, result)| result.is_ok()) {
            poise::builtins::register_globally(
                ctx.serenity_context(),
                &ctx.framework().options().commands,
            )
            .await?;
        }

        match results.as_slice() {
            [(name, Err(e))] if super::is_explicit(extensions.as_deref()) => {
                ctx.say(format!("❌ Failed to load `{name}`:")).await?;
                for page in super::error_pages(&e.to_string()) {
                    ctx.say(page).await?;
                }
            }
            [(_, Ok(_))] if super::is_explicit(extensions.as_deref()) => {
                if let poise::Context::Prefix(prefix) = ctx {
                    prefix.msg.react(ctx.serenity_context(), '✅').await?;
                } else {
                    ctx.say("✅").await?;
                }
            }
            _ => {
                ctx.say(super::format_reload_report(&results)).await?;
            }
        }
        Ok(())
    }

    /// Just closes the bot and logs it out. Optional delay included!
    #[poise::command(prefix_command, owners_only, hide_in_help, aliases("logout"))]
    pub async fn shutdown(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Seconds to wait before shutting down"] delay: Option<f64>,
    ) -> Result<()> {
        let delay = match super::parse_delay(delay.unwrap_or(0.0)) {
            Ok(delay) => delay,
            Err(message) => {
                ctx.say(format!("❌ {message}")).await?;
                return Ok(());
            }
        };

        info!(
            "Told to close in {} seconds by {}.",
            delay.as_secs_f64(),
            ctx.author().name
        );
        if delay >= super::TYPING_THRESHOLD {
            ctx.channel_id()
                .broadcast_typing(ctx.serenity_context())
                .await?;
        }
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        ctx.framework().shard_manager().shutdown_all().await;
        Ok(())
    }
}

use crate::{bot::extensions::Command, errors::Result};
use std::fmt::Write;
use std::time::Duration;

/// Delays at least this long show a typing indicator while waiting.
const TYPING_THRESHOLD: Duration = Duration::from_secs(10);

/// Discord's message length limit.
const MESSAGE_LIMIT: usize = 2000;
/// Longest line kept in an error page.
const LINE_LIMIT: usize = 1980;

/// Commands of the `owner` extension.
pub fn commands() -> Result<Vec<Command>> {
    Ok(vec![inner::reload(), inner::shutdown()])
}

const RELOAD_ALL: [&str; 3] = ["~", "all", "auto"];

/// Which extensions a `reload` invocation targets.
fn reload_targets(arguments: Option<&str>, loaded: &[&'static str]) -> Vec<String> {
    let names: Vec<&str> = arguments.unwrap_or_default().split_whitespace().collect();
    match names.as_slice() {
        [] => loaded.iter().map(ToString::to_string).collect(),
        [single] if RELOAD_ALL.contains(single) => loaded.iter().map(ToString::to_string).collect(),
        _ => names.into_iter().map(ToString::to_string).collect(),
    }
}

/// Whether the owner named exactly one extension.
fn is_explicit(arguments: Option<&str>) -> bool {
    let names: Vec<&str> = arguments.unwrap_or_default().split_whitespace().collect();
    matches!(names.as_slice(), [single] if !RELOAD_ALL.contains(single))
}

/// One line per extension, marked with a check or a cross.
fn format_reload_report(results: &[(String, Result<usize>)]) -> String {
    if results.is_empty() {
        return "No extensions are loaded.".to_string();
    }
    results.iter().fold(String::new(), |mut report, (name, result)| {
        let mark = if result.is_ok() { '✅' } else { '❌' };
        let _ = writeln!(report, "{mark} `{name}`");
        report
    })
}

/// Splits `text` into code blocks that each fit in one message.
///
/// Backticks are followed by a zero-width space so they cannot close the block.
/// Escaped lines are cut at [`LINE_LIMIT`] characters.
fn error_pages(text: &str) -> Vec<String> {
    const OPEN: &str = "```\n";
    const CLOSE: &str = "```";

    let mut pages = Vec::new();
    let mut page = String::from(OPEN);
    let mut page_chars = OPEN.chars().count();
    for line in text.lines() {
        let mut line: String = line
            .replace('`', "`\u{200b}")
            .chars()
            .take(LINE_LIMIT)
            .collect();
        // A cut between a backtick and its escape leaves the backtick live.
        if line.ends_with('`') {
            line.pop();
        }

        let line_chars = line.chars().count() + 1;
        if page_chars + line_chars + CLOSE.len() > MESSAGE_LIMIT && page_chars > OPEN.len() {
            page.push_str(CLOSE);
            pages.push(std::mem::replace(&mut page, String::from(OPEN)));
            page_chars = OPEN.len();
        }
        page.push_str(&line);
        page.push('\n');
        page_chars += line_chars;
    }
    page.push_str(CLOSE);
    pages.push(page);
    pages
}

/// Validates the `shutdown` delay in seconds.
fn parse_delay(seconds: f64) -> std::result::Result<Duration, String> {
    Duration::try_from_secs_f64(seconds)
        .map_err(|_| format!("`{seconds}` is not a valid delay in seconds"))
}

pub use inner::*;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Error;

    const LOADED: [&str; 2] = ["meta", "owner"];

    #[test]
    fn test_reload_targets() {
        assert_eq!(reload_targets(None, &LOADED), ["meta", "owner"]);
        assert_eq!(reload_targets(Some("~"), &LOADED), ["meta", "owner"]);
        assert_eq!(reload_targets(Some("all"), &LOADED), ["meta", "owner"]);
        assert_eq!(reload_targets(Some("meta settings"), &LOADED), ["meta", "settings"]);

        assert!(is_explicit(Some("meta")));
        assert!(!is_explicit(Some("auto")));
        assert!(!is_explicit(Some("meta owner")));
        assert!(!is_explicit(None));
    }

    #[test]
    fn test_format_reload_report() {
        let results = vec![
            ("meta".to_string(), Ok(2)),
            (
                "bogus".to_string(),
                Err(Error::Extension {
                    name: "bogus".to_string(),
                    message: "no such extension".to_string(),
                }),
            ),
        ];
        assert_eq!(format_reload_report(&results), "✅ `meta`\n❌ `bogus`\n");
        assert_eq!(format_reload_report(&[]), "No extensions are loaded.");
    }

    #[test]
    fn test_error_pages_fit_and_escape() {
        let text = (0..200)
            .map(|i| format!("line {i} with `code` and padding {}", "x".repeat(20)))
            .collect::<Vec<_>>()
            .join("\n");
        let pages = error_pages(&text);

        assert!(pages.len() > 1);
        for page in &pages {
            assert!(page.chars().count() <= MESSAGE_LIMIT);
            assert!(page.starts_with("```\n"));
            assert!(page.ends_with("```"));
        }
        assert!(pages[0].contains("`\u{200b}code`\u{200b}"));
    }

    #[test]
    fn test_error_pages_truncate_long_lines() {
        let pages = error_pages(&"y".repeat(5000));
        assert_eq!(pages.len(), 1);
        assert!(pages[0].chars().count() <= MESSAGE_LIMIT);
    }

    #[test]
    fn test_error_pages_escape_before_truncating() {
        let pages = error_pages(&"`".repeat(1990));
        assert_eq!(pages.len(), 1);

        let page = &pages[0];
        assert!(page.chars().count() <= MESSAGE_LIMIT);
        let body = &page["```\n".len()..page.len() - "```".len()];
        assert!(!body.contains("```"));
        // Every backtick in the body is escaped.
        let chars: Vec<char> = body.chars().collect();
        for (i, c) in chars.iter().enumerate() {
            if *c == '`' {
                assert_eq!(chars.get(i + 1), Some(&'\u{200b}'));
            }
        }
    }

    #[test]
    fn test_error_pages_mixed_long_lines_fit() {
        let text = ["`".repeat(1990), "z".repeat(3000), "a`b".repeat(900)].join("\n");
        for page in error_pages(&text) {
            assert!(page.chars().count() <= MESSAGE_LIMIT);
            assert!(page.ends_with("```"));
        }
    }

    #[test]
    fn test_reload_help_does_not_promise_hot_swap() {
        let help = reload().description.unwrap_or_default();
        assert!(help.contains("check they still load"));
        assert!(help.contains("re-syncs commands"));
    }

    #[test]
    fn test_parse_delay() {
        assert_eq!(parse_delay(0.0).unwrap_or_default(), Duration::ZERO);
        assert_eq!(parse_delay(2.5).unwrap_or_default(), Duration::from_millis(2500));
        assert!(parse_delay(-1.0).is_err());
        assert!(parse_delay(f64::NAN).is_err());
        assert!(parse_delay(f64::INFINITY).is_err());
    }
}
