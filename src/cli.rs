use clap::{Parser, Subcommand};

use crate::listing::FOOD_LISTINGS_ROUTE;

#[derive(Parser)]
#[command(name = "foodshare")]
#[command(about = "Browse donated food listings")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch listings page by page from the server
    #[command(visible_alias = "b")]
    Browse {
        /// Listings route on the server
        #[arg(long, default_value = FOOD_LISTINGS_ROUTE)]
        route: String,

        /// Filter criteria as a JSON object (e.g. '{"foodTypes":["bakery"]}')
        #[arg(long)]
        filters: Option<String>,

        /// Additional pages to load after the first one
        #[arg(short, long, default_value_t = 0)]
        pages: usize,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show the effective configuration
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Set a configuration value
    Set {
        /// Dotted key (e.g. listings.buffer_capacity)
        key: String,

        /// New value
        value: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print a single configuration value
    Get {
        /// Dotted key (e.g. server.base_url)
        key: String,
    },
}

/// Output format selected on the command line
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputOptions {
    pub json: bool,
}

impl OutputOptions {
    pub fn json(json: bool) -> Self {
        Self { json }
    }
}
