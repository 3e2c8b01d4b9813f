//! Options and helpers shared across CLI commands.

use std::path::PathBuf;

use clap::Args;
use revgeo::{ConfigFile, GeocoderConfig, ReverseGeocodeResult, ReverseGeocoder, StatsSnapshot};

use crate::error::CliError;

/// Options accepted by every command.
#[derive(Debug, Clone, Default, Args)]
pub struct GlobalArgs {
    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Cache file, overriding the config file
    #[arg(long, global = true, value_name = "PATH")]
    pub cache_file: Option<PathBuf>,

    /// Result language, e.g. `en` or `de`
    #[arg(long, global = true, value_name = "TAG")]
    pub lang: Option<String>,

    /// Log filter, e.g. `debug` or `revgeo=trace`
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log_level: Option<String>,
}

/// Loads the config file and applies command-line overrides.
///
/// An explicitly named config file must exist; the default one may be absent.
pub fn load_settings(args: &GlobalArgs) -> Result<ConfigFile, CliError> {
    let mut settings = match &args.config {
        Some(path) if !path.exists() => return Err(CliError::ConfigNotFound(path.clone())),
        Some(path) => ConfigFile::load_from(path)?,
        None => ConfigFile::load()?,
    };

    if let Some(cache_file) = &args.cache_file {
        settings.geocoder.cache_file = cache_file.clone();
    }
    if let Some(lang) = &args.lang {
        settings.geocoder = settings.geocoder.with_language(lang);
    }
    if let Some(level) = &args.log_level {
        settings.logging.level = level.clone();
    }

    Ok(settings)
}

/// Starts a Nominatim-backed geocoder on the current runtime.
pub fn start_geocoder(config: GeocoderConfig) -> Result<ReverseGeocoder, CliError> {
    Ok(ReverseGeocoder::nominatim(config)?)
}

/// Formats a result for one output line.
pub fn format_place(place: &ReverseGeocodeResult) -> String {
    match &place.display_name {
        Some(full) if !place.is_negative() => format!("{} ({})", place, full),
        _ => place.to_string(),
    }
}

pub fn print_stats(stats: &StatsSnapshot) {
    eprintln!("{}", stats);
}
