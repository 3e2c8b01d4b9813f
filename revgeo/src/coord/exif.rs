//! EXIF GPS field conversion.
//!
//! Photo metadata stores GPS positions as unsigned magnitudes plus hemisphere
//! reference letters. Extraction tools emit the magnitudes either as numbers
//! or as numeric strings, so both are accepted here.

use serde::Deserialize;

use super::GeoPoint;

/// A GPS magnitude as found in EXIF JSON: a number or a numeric string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum GpsValue {
    Number(f64),
    Text(String),
}

impl GpsValue {
    /// Returns the finite numeric value, if any.
    ///
    /// Strings are trimmed before parsing; empty strings yield `None`.
    pub fn as_f64(&self) -> Option<f64> {
        let value = match self {
            GpsValue::Number(n) => *n,
            GpsValue::Text(s) => {
                let s = s.trim();
                if s.is_empty() {
                    return None;
                }
                s.parse::<f64>().ok()?
            }
        };
        value.is_finite().then_some(value)
    }
}

/// The GPS subset of a photo's EXIF block.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ExifGps {
    #[serde(rename = "GPSLatitude", default)]
    pub latitude: Option<GpsValue>,
    #[serde(rename = "GPSLatitudeRef", default)]
    pub latitude_ref: Option<String>,
    #[serde(rename = "GPSLongitude", default)]
    pub longitude: Option<GpsValue>,
    #[serde(rename = "GPSLongitudeRef", default)]
    pub longitude_ref: Option<String>,
}

impl ExifGps {
    /// Converts the EXIF fields to a signed decimal point.
    ///
    /// The southern and western hemispheres (`S`/`South`, `W`/`West`) produce
    /// negative values; any other reference, or none, yields the absolute
    /// value. Returns `None` when either magnitude is missing or not a finite
    /// number.
    pub fn to_geo_point(&self) -> Option<GeoPoint> {
        let latitude = self.latitude.as_ref()?.as_f64()?;
        let longitude = self.longitude.as_ref()?.as_f64()?;

        let south = matches!(self.latitude_ref.as_deref(), Some("S" | "South"));
        let west = matches!(self.longitude_ref.as_deref(), Some("W" | "West"));

        let latitude = if south {
            -latitude.abs()
        } else {
            latitude.abs()
        };
        let longitude = if west {
            -longitude.abs()
        } else {
            longitude.abs()
        };

        Some(GeoPoint::new(latitude, longitude))
    }
}
