#![allow(clippy::result_large_err)]

use chip::{
    bot,
    cli::Cli,
    config::{self, database, setup},
    errors::Result,
    logging,
};
use clap::Parser;
use dotenvy::dotenv;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // 1. Initialize logging (as early as possible)
    let guard = match logging::init(Path::new(logging::DEFAULT_LOG_FILE)) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{e}");
            exit(e.exit_code());
        }
    };

    // 2. Load .env file, non-fatal since variables can be set externally
    if dotenv().is_ok() {
        info!("Loaded .env file.");
    }

    let code = match run(cli).await {
        Ok(()) => 0,
        Err(e) => {
            error!("{}", e);
            e.exit_code()
        }
    };

    guard.shutdown();
    exit(code);
}

#[allow(clippy::exit)]
fn exit(code: i32) -> ! {
    std::process::exit(code)
}

async fn run(cli: Cli) -> Result<()> {
    if cli.setup {
        return setup::run(&cli.template, &cli.config);
    }

    // 3. Load the main application configuration
    let app_config = config::load_config(&cli.config)?;
    info!("Successfully processed application configuration.");

    // 4. Pick the token for the requested environment
    let environment = app_config.environment(cli.run);
    let token = app_config.tokens.token_for(environment)?.to_string();
    info!("Running as {}", environment);

    // 5. Initialize database
    let db = database::init_db(&app_config.database_path())
        .await
        .inspect(|_| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to initialize database: {}", e))?;

    // 6. Run the bot
    bot::run_bot(token, Arc::new(app_config), db).await
}
