//! Extension registry.
//!
//! An extension is a named bundle of commands. The registry is a static table of
//! initializers; startup loads the names listed in `config.json` and skips (with an
//! error log) any extension that is unknown, fails to initialize or clashes with a
//! command that is already registered.

use crate::{
    bot::{BotData, commands},
    errors::{Error, Result},
};
use std::collections::HashSet;
use tracing::{error, info};

/// A poise command with Chip's data and error types.
pub type Command = poise::Command<BotData, Error>;

/// One loadable bundle of commands.
pub struct Extension {
    pub name: &'static str,
    pub description: &'static str,
    init: fn() -> Result<Vec<Command>>,
}

impl Extension {
    /// Builds the extension's commands.
    pub fn initialize(&self) -> Result<Vec<Command>> {
        let commands = (self.init)()?;
        if commands.is_empty() {
            return Err(Error::Extension {
                name: self.name.to_string(),
                message: "extension provides no commands".to_string(),
            });
        }
        Ok(commands)
    }
}

/// Every extension the bot knows about.
pub static EXTENSIONS: &[Extension] = &[
    Extension {
        name: "meta",
        description: "Latency and information about the bot",
        init: commands::meta::commands,
    },
    Extension {
        name: "owner",
        description: "Bot management for owners",
        init: commands::owner::commands,
    },
    Extension {
        name: "settings",
        description: "Per-server configuration",
        init: commands::settings::commands,
    },
];

/// Looks up an extension by name.
#[must_use]
pub fn find(name: &str) -> Option<&'static Extension> {
    EXTENSIONS.iter().find(|e| e.name == name)
}

/// Result of loading the configured extensions.
pub struct LoadedExtensions {
    /// Names that loaded, in order
    pub names: Vec<&'static str>,
    /// Commands of every loaded extension
    pub commands: Vec<Command>,
    /// One error per extension that was skipped
    pub failures: Vec<Error>,
}

/// Loads `names` in order, isolating failures per extension.
pub fn load(names: &[String]) -> LoadedExtensions {
    let mut loaded = LoadedExtensions {
        names: Vec::new(),
        commands: Vec::new(),
        failures: Vec::new(),
    };
    let mut taken = HashSet::new();

    for name in names {
        match load_one(name, &loaded.names, &mut taken) {
            Ok((extension, commands)) => {
                info!(
                    "Loaded extension `{}` - {} ({} command(s))",
                    extension.name,
                    extension.description,
                    commands.len()
                );
                loaded.names.push(extension.name);
                loaded.commands.extend(commands);
            }
            Err(e) => {
                error!("Failed to load extension `{}`: {}", name, e);
                loaded.failures.push(e);
            }
        }
    }
    loaded
}

fn load_one(
    name: &str,
    already_loaded: &[&'static str],
    taken: &mut HashSet<String>,
) -> Result<(&'static Extension, Vec<Command>)> {
    let fail = |message: String| Error::Extension {
        name: name.to_string(),
        message,
    };

    let extension = find(name).ok_or_else(|| fail("no such extension".to_string()))?;
    if already_loaded.contains(&extension.name) {
        return Err(fail("already loaded".to_string()));
    }

    let commands = extension.initialize()?;
    let mut triggers = HashSet::new();
    for command in &commands {
        for trigger in std::iter::once(&command.name).chain(&command.aliases) {
            if taken.contains(trigger) || !triggers.insert(trigger.clone()) {
                return Err(fail(format!("command `{trigger}` is already registered")));
            }
        }
    }
    taken.extend(triggers);
    Ok((extension, commands))
}

/// Re-initializes a loaded extension, returning how many commands it provides.
pub fn reload(name: &str, loaded: &[&'static str]) -> Result<usize> {
    let extension = find(name)
        .filter(|e| loaded.contains(&e.name))
        .ok_or_else(|| Error::Extension {
            name: name.to_string(),
            message: "extension is not loaded".to_string(),
        })?;
    Ok(extension.initialize()?.len())
}
