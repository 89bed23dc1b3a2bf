//! Interactive generation of `config.json`.
//!
//! `chip --setup` reads `template_config.json`, asks for each setting on the
//! terminal and writes the result next to it. A missing or malformed template is
//! [`Error::SetupTemplate`] (exit code 2); any other failure is [`Error::Setup`]
//! (exit code 1).

use crate::{
    config::{
        database::DEFAULT_DATABASE_PATH,
        settings::{AppConfig, Environment},
    },
    core::prefix::FALLBACK_PREFIX,
    errors::{Error, Result},
};
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::str::FromStr;
use tracing::info;

/// Template shipped with the bot.
pub const TEMPLATE_PATH: &str = "./template_config.json";

const DEFAULT_MAX_MESSAGES: usize = 1000;
const DEFAULT_MAX_GUILDS: usize = 30;

/// `true` for answers like "yes", "true", "1" or "ok".
#[must_use]
pub fn is_affirmative(text: &str) -> bool {
    text.trim()
        .to_lowercase()
        .starts_with(['y', 't', '1', 'o'])
}

/// Parses a space or comma separated list of user IDs.
pub fn parse_ids(text: &str) -> std::result::Result<Vec<u64>, String> {
    text.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse()
                .map_err(|_| format!("'{part}' is not a valid user ID"))
        })
        .collect()
}

/// Reads the setup template.
pub fn load_template(path: &Path) -> Result<AppConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => Error::SetupTemplate {
            message: format!(
                "No template file found at {}. Please ensure you downloaded Chip correctly, and try again.",
                path.display()
            ),
        },
        _ => setup_error(&e),
    })?;

    serde_json::from_str(&contents).map_err(|e| Error::SetupTemplate {
        message: format!("Failed to load template, did you modify it? ({e})"),
    })
}

/// Line-based question and answer over any reader/writer pair.
pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub const fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Prints `message` on its own line.
    pub fn say(&mut self, message: &str) -> Result<()> {
        writeln!(self.output, "{message}").map_err(|e| setup_error(&e))
    }

    /// Asks once and returns the trimmed answer, possibly empty.
    pub fn ask(&mut self, question: &str) -> Result<String> {
        write!(self.output, "{question}").map_err(|e| setup_error(&e))?;
        self.output.flush().map_err(|e| setup_error(&e))?;

        let mut line = String::new();
        let read = self.input.read_line(&mut line).map_err(|e| setup_error(&e))?;
        if read == 0 {
            return Err(Error::Setup {
                message: "input closed before setup finished".to_string(),
            });
        }
        Ok(line.trim().to_string())
    }

    /// Asks once, using `default` for an empty answer.
    pub fn ask_or(&mut self, question: &str, default: &str) -> Result<String> {
        let answer = self.ask(question)?;
        Ok(if answer.is_empty() {
            default.to_string()
        } else {
            answer
        })
    }

    /// Asks until the answer is non-empty.
    pub fn required(&mut self, question: &str) -> Result<String> {
        loop {
            let answer = self.ask(question)?;
            if !answer.is_empty() {
                return Ok(answer);
            }
            self.say("An answer is required.")?;
        }
    }

    /// Yes/no question; an empty answer keeps `default`.
    pub fn confirm(&mut self, question: &str, default: bool) -> Result<bool> {
        let answer = self.ask(question)?;
        Ok(if answer.is_empty() {
            default
        } else {
            is_affirmative(&answer)
        })
    }

    /// Asks until the answer parses as `T`; an empty answer keeps `default`.
    pub fn parse_or<T: FromStr>(&mut self, question: &str, default: T) -> Result<T> {
        loop {
            let answer = self.ask(question)?;
            if answer.is_empty() {
                return Ok(default);
            }
            match answer.parse() {
                Ok(value) => return Ok(value),
                Err(_) => self.say(&format!(
                    "Unable to convert '{answer}' to {}. Please try again.",
                    short_type_name::<T>()
                ))?,
            }
        }
    }
}

fn short_type_name<T>() -> &'static str {
    let name = std::any::type_name::<T>();
    name.rsplit("::").next().unwrap_or(name)
}

/// Walks through every setting, starting from `template`.
pub fn configure<R: BufRead, W: Write>(
    mut config: AppConfig,
    prompt: &mut Prompter<R, W>,
) -> Result<AppConfig> {
    let prefix = prompt.ask_or(
        &format!("Please input a default prefix [{FALLBACK_PREFIX}]: "),
        FALLBACK_PREFIX,
    )?;
    config.prefix.set = vec![prefix];
    config.prefix.mention = prompt.confirm(
        "Would you like to allow the bot's mention to be a prefix? [Y/N] ",
        config.prefix.mention,
    )?;
    config.prefix.custom = prompt.confirm(
        "Would you like to allow custom prefixes? [Y/N] ",
        config.prefix.custom,
    )?;

    let production = prompt.required("Please enter a primary (production) bot token: ")?;
    config.tokens.set(Environment::Production, Some(production));
    if is_affirmative(
        &prompt.required("Would you like to add extra (beta and development) bot tokens? [Y/N] ")?,
    ) {
        let beta = prompt.ask("Please insert a beta bot token [ ]: ")?;
        config
            .tokens
            .set(Environment::Beta, Some(beta).filter(|t| !t.is_empty()));
        let development = prompt.ask("Please insert a development bot token [ ]: ")?;
        config.tokens.set(
            Environment::Development,
            Some(development).filter(|t| !t.is_empty()),
        );
    }

    config.control.max_messages = prompt.parse_or(
        &format!("How large should the bot's max message cache be? [{DEFAULT_MAX_MESSAGES}] "),
        DEFAULT_MAX_MESSAGES,
    )?;
    config.control.max_guilds = if prompt.confirm(
        "Would you like to (at least temporarily) limit how many servers Chip can join? [Y/N] ",
        false,
    )? {
        Some(prompt.parse_or(
            &format!("How many servers can Chip join? [{DEFAULT_MAX_GUILDS}] "),
            DEFAULT_MAX_GUILDS,
        )?)
    } else {
        None
    };

    config.sql = Some(prompt.ask_or(
        &format!(
            "Please input a file path where the sqlite database should be located [{DEFAULT_DATABASE_PATH}]: "
        ),
        DEFAULT_DATABASE_PATH,
    )?);

    for (category, allowed) in config.allowed_mentions.categories_mut() {
        *allowed = prompt.confirm(
            &format!("Should the bot be allowed to mention {category}? [Y/N] (default: {allowed}) "),
            *allowed,
        )?;
    }

    config.owners = loop {
        let answer = prompt.ask(
            "Please enter a list of owner user IDs (or hit enter for discord native bot ownership): ",
        )?;
        match parse_ids(&answer) {
            Ok(ids) => break ids,
            Err(message) => prompt.say(&message)?,
        }
    };

    Ok(config)
}

/// Runs the interactive setup on the terminal and writes `output`.
pub fn run(template: &Path, output: &Path) -> Result<()> {
    let config = load_template(template)?;
    let stdin = io::stdin();
    let mut prompt = Prompter::new(stdin.lock(), io::stdout());

    let config = configure(config, &mut prompt)?;

    prompt.say("Saving...")?;
    write_config(&config, output)?;
    prompt.say("Saved!")?;
    info!("Wrote configuration to {}", output.display());
    Ok(())
}

/// Serializes `config` as pretty JSON.
pub fn write_config(config: &AppConfig, output: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(config).map_err(|e| Error::Setup {
        message: e.to_string(),
    })?;
    std::fs::write(output, json).map_err(|e| setup_error(&e))
}

fn setup_error(error: &io::Error) -> Error {
    Error::Setup {
        message: error.to_string(),
    }
}
