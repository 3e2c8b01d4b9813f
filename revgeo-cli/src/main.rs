//! Revgeo CLI - Command-line interface
//!
//! Resolves photo coordinates to place names through the revgeo library,
//! sharing its persistent cache between runs.

mod commands;
mod error;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use revgeo::logging::init_logging;

use commands::cache::CacheAction;
use commands::common::{load_settings, GlobalArgs};
use error::CliError;

#[derive(Debug, Parser)]
#[command(
    name = "revgeo",
    version,
    about = "Cached, rate-limited reverse geocoding for photo coordinates"
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Resolve a single latitude/longitude pair
    Lookup {
        #[arg(allow_negative_numbers = true)]
        latitude: f64,
        #[arg(allow_negative_numbers = true)]
        longitude: f64,
    },

    /// Resolve every `lat,lon` line in a file
    Batch {
        /// Text file with one `lat,lon` pair per line
        file: PathBuf,
    },

    /// Resolve the GPS position in an EXIF JSON dump
    Exif {
        /// JSON object with GPSLatitude/GPSLongitude fields
        file: PathBuf,
    },

    /// Inspect or clear the geocode cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let settings = load_settings(&cli.global)?;
    let _log_guard = init_logging(&settings.logging)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;

    let config = settings.geocoder;
    runtime.block_on(async move {
        match cli.command {
            Commands::Lookup {
                latitude,
                longitude,
            } => commands::lookup::run(config, latitude, longitude).await,
            Commands::Batch { file } => commands::batch::run(config, &file).await,
            Commands::Exif { file } => commands::exif::run(config, &file).await,
            Commands::Cache { action } => commands::cache::run(action, &config.cache_file).await,
        }
    })
}
