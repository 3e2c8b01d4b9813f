//! CLI error type and exit codes.

use std::io;
use std::path::PathBuf;

use revgeo::config::ConfigError;
use revgeo::geocoder::GeocoderError;
use revgeo::logging::LoggingError;
use thiserror::Error;

/// Exit code for bad configuration or logging setup.
pub const EXIT_CONFIG: i32 = 2;

/// Exit code for unusable input files or coordinates.
pub const EXIT_INPUT: i32 = 3;

/// Exit code for everything else.
pub const EXIT_FAILURE: i32 = 1;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Config file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    #[error(transparent)]
    Logging(#[from] LoggingError),

    #[error("Failed to start async runtime: {0}")]
    Runtime(#[source] io::Error),

    #[error(transparent)]
    Geocoder(#[from] GeocoderError),

    #[error("Failed to read {}: {source}", .path.display())]
    ReadInput {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{}:{line}: expected `lat,lon`, got {content:?}", .path.display())]
    BadLine {
        path: PathBuf,
        line: usize,
        content: String,
    },

    #[error("Invalid EXIF JSON in {}: {source}", .path.display())]
    ExifJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("No usable GPS position in {}", .0.display())]
    NoGps(PathBuf),

    #[error("Coordinates must be finite numbers, got {latitude}, {longitude}")]
    InvalidCoordinates { latitude: f64, longitude: f64 },

    #[error("Failed to clear cache {}: {source}", .path.display())]
    CacheClear {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_) | CliError::ConfigNotFound(_) | CliError::Logging(_) => EXIT_CONFIG,
            CliError::ReadInput { .. }
            | CliError::BadLine { .. }
            | CliError::ExifJson { .. }
            | CliError::NoGps(_)
            | CliError::InvalidCoordinates { .. } => EXIT_INPUT,
            CliError::Runtime(_) | CliError::Geocoder(_) | CliError::CacheClear { .. } => {
                EXIT_FAILURE
            }
        }
    }
}
