//! Batch lookup from a text file of `lat,lon` lines.
//!
//! All points go through one geocoder at once, so duplicates share a request
//! and the scheduler paces the rest.

use std::path::Path;

use revgeo::{GeoPoint, GeocoderConfig};
use tracing::info;

use super::common::{format_place, print_stats, start_geocoder};
use crate::error::CliError;

pub async fn run(config: GeocoderConfig, path: &Path) -> Result<(), CliError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| CliError::ReadInput {
            path: path.to_path_buf(),
            source,
        })?;
    let points = parse_points(path, &text)?;
    info!(path = %path.display(), points = points.len(), "Resolving batch");

    let geocoder = start_geocoder(config)?;
    let lookups = points
        .iter()
        .map(|point| geocoder.reverse_geocode(point.latitude, point.longitude));
    let places = futures::future::join_all(lookups).await;
    let stats = geocoder.stats();
    geocoder.shutdown().await;

    for (point, place) in points.iter().zip(places) {
        let line = match place {
            Some(place) => format_place(&place),
            None => "(invalid coordinates)".to_string(),
        };
        println!("{},{}\t{}", point.latitude, point.longitude, line);
    }
    print_stats(&stats);
    Ok(())
}

/// Parses one point per line; blank lines and `#` comments are skipped.
pub fn parse_points(path: &Path, text: &str) -> Result<Vec<GeoPoint>, CliError> {
    let mut points = Vec::new();

    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let bad_line = || CliError::BadLine {
            path: path.to_path_buf(),
            line: index + 1,
            content: line.to_string(),
        };

        let (lat, lon) = line.split_once(',').ok_or_else(bad_line)?;
        let latitude = lat.trim().parse::<f64>().map_err(|_| bad_line())?;
        let longitude = lon.trim().parse::<f64>().map_err(|_| bad_line())?;
        points.push(GeoPoint::new(latitude, longitude));
    }

    Ok(points)
}
