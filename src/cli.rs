//! Command line interface.

use crate::config::{Environment, settings::DEFAULT_CONFIG_PATH, setup::TEMPLATE_PATH};
use clap::Parser;
use std::path::PathBuf;

/// Chip - a multi-purpose moderation bot for Discord.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Generate the configuration file interactively and exit
    #[arg(short = 'S', long, conflicts_with = "run")]
    pub setup: bool,

    /// Environment whose token the bot logs in with (defaults to `tokens.default`)
    #[arg(short = 'R', long, value_enum)]
    pub run: Option<Environment>,

    /// Path of the configuration file
    #[arg(long, env = "CHIP_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Template used by `--setup`
    #[arg(long, default_value = TEMPLATE_PATH)]
    pub template: PathBuf,
}
