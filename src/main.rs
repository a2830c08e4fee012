use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, fmt};

use foodshare::cli::{Cli, Commands, ConfigAction, OutputOptions};
use foodshare::commands::{cmd_browse, cmd_config_get, cmd_config_set, cmd_config_show};

/// Environment variable holding the log filter (e.g. `foodshare=debug`)
const LOG_ENV: &str = "FOODSHARE_LOG";

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Browse {
            route,
            filters,
            pages,
            json,
        } => cmd_browse(&route, filters.as_deref(), pages, OutputOptions::json(json)).await,

        Commands::Config { action } => match action {
            ConfigAction::Show { json } => cmd_config_show(OutputOptions::json(json)),
            ConfigAction::Set { key, value, json } => {
                cmd_config_set(&key, &value, OutputOptions::json(json))
            }
            ConfigAction::Get { key } => cmd_config_get(&key),
        },
    };

    match result {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}
