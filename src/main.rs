mod availability;
mod cache;
mod cli;
mod config;
mod paths;
mod providers;
mod registry;
mod utils;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use cli::{cache::cache_cmd, list::list_cmd, ColorMode};

#[derive(
    Parser, Default, Clone, Copy, ValueEnum, strum_macros::Display, strum_macros::EnumString,
)]
#[strum(serialize_all = "lowercase")]
pub(crate) enum RequestedColorMode {
    #[default]
    Auto,
    On,
    Off,
}

#[derive(Parser)]
#[command(name = "xavail")]
#[command(
    about = "Lists the models available across inference providers",
    version = "0.0.1"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
    #[arg(long, global = true, default_value_t = RequestedColorMode::default())]
    color: RequestedColorMode,
    /// Read the configuration from the specified file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Increase logging verbosity (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// List available models or services
    List(ListArgs),
    /// Inspect or clear the model cache
    Cache(CacheArgs),
}

/// Possible listings
#[derive(Subcommand)]
pub(crate) enum ListObject {
    /// Models offered by the enabled services
    Models(ListModelArgs),
    /// Enabled services
    Providers,
}

/// Output formats
#[derive(
    Parser, ValueEnum, Default, Clone, Copy, strum_macros::Display, strum_macros::EnumString,
)]
#[strum(serialize_all = "snake_case")]
pub(crate) enum ListingFormat {
    /// Format the output as a table
    #[default]
    Table,
    /// Format the output as JSON
    Json,
    /// Format the output as a table without a header
    HeaderlessTable,
}

#[derive(Parser)]
pub(crate) struct ListArgs {
    /// Output the listing with the specified format
    #[arg(short, long, default_value_t = ListingFormat::default())]
    format: ListingFormat,
    /// List the specified object
    #[command(subcommand)]
    object: ListObject,
}

#[derive(Parser, Default)]
pub(crate) struct ListModelArgs {
    /// Query only the specified service, bypassing the cache
    #[arg(short, long)]
    service: Option<String>,
    /// Ignore the cached listing and query every service
    #[arg(long)]
    no_cache: bool,
    /// Only list the services offering the specified model, failing if none does
    #[arg(long, value_name = "MODEL", conflicts_with = "service")]
    contains: Option<String>,
}

#[derive(Parser)]
pub(crate) struct CacheArgs {
    #[command(subcommand)]
    action: CacheAction,
}

#[derive(Subcommand, Clone, Copy)]
pub(crate) enum CacheAction {
    /// Print the location of the cache file
    Path,
    /// Remove the cached listing
    Clear,
    /// Describe the cached listing
    Show,
}

fn init_logger(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .try_init()
        .ok();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_logger(cli.verbose);

    utils::errors::configure_color(ColorMode::resolve_auto(cli.color));

    let config = match config::read_config(cli.config) {
        Ok(config) => config,
        Err(err) => die!("{}", err),
    };

    match &cli.command {
        Some(Commands::List(args)) => list_cmd(&config, args).await,
        Some(Commands::Cache(args)) => cache_cmd(&config, args),
        None => {
            let args = ListArgs {
                format: ListingFormat::default(),
                object: ListObject::Models(ListModelArgs::default()),
            };

            list_cmd(&config, &args).await
        }
    }
}
