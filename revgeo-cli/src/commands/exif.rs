//! Lookup from an EXIF JSON dump.

use std::path::Path;

use revgeo::coord::exif::ExifGps;
use revgeo::GeocoderConfig;

use super::common::{format_place, print_stats, start_geocoder};
use crate::error::CliError;

pub async fn run(config: GeocoderConfig, path: &Path) -> Result<(), CliError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| CliError::ReadInput {
            path: path.to_path_buf(),
            source,
        })?;
    let point = read_gps(path, &text)?;

    let geocoder = start_geocoder(config)?;
    let place = geocoder
        .reverse_geocode(point.latitude, point.longitude)
        .await;
    let stats = geocoder.stats();
    geocoder.shutdown().await;

    let place = place.ok_or(CliError::NoGps(path.to_path_buf()))?;
    println!(
        "{},{}\t{}",
        point.latitude,
        point.longitude,
        format_place(&place)
    );
    print_stats(&stats);
    Ok(())
}

fn read_gps(path: &Path, text: &str) -> Result<revgeo::GeoPoint, CliError> {
    let gps: ExifGps = serde_json::from_str(text).map_err(|source| CliError::ExifJson {
        path: path.to_path_buf(),
        source,
    })?;
    gps.to_geo_point()
        .ok_or_else(|| CliError::NoGps(path.to_path_buf()))
}
