//! Single point lookup.

use revgeo::GeocoderConfig;

use super::common::{format_place, print_stats, start_geocoder};
use crate::error::CliError;

pub async fn run(config: GeocoderConfig, latitude: f64, longitude: f64) -> Result<(), CliError> {
    let geocoder = start_geocoder(config)?;
    let place = geocoder.reverse_geocode(latitude, longitude).await;
    let stats = geocoder.stats();
    geocoder.shutdown().await;

    let place = place.ok_or(CliError::InvalidCoordinates {
        latitude,
        longitude,
    })?;

    println!("{}", format_place(&place));
    print_stats(&stats);
    Ok(())
}
