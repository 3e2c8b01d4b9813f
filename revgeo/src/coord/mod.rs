//! Coordinate normalization module
//!
//! Turns raw latitude/longitude pairs into stable cache keys. Coordinates are
//! rounded to three decimal places (~111 m at the equator) so that nearby
//! points fold onto the same cache entry.

pub mod exif;

use std::fmt;

/// Number of decimal places kept when normalizing coordinates.
pub const COORD_PRECISION: usize = 3;

/// Language tag used when none is configured.
pub const DEFAULT_LANGUAGE: &str = "en";

/// A caller-supplied geographic point in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// A point is valid when both coordinates are finite real numbers.
    ///
    /// No range check is applied; the provider decides what out-of-range
    /// coordinates mean.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }
}

/// Normalized language tag.
///
/// Tags are trimmed and lower-cased; an empty tag becomes [`DEFAULT_LANGUAGE`]
/// so the tag is always present in the cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LanguageTag(String);

impl LanguageTag {
    pub fn new(tag: impl AsRef<str>) -> Self {
        let tag = tag.as_ref().trim();
        if tag.is_empty() {
            Self(DEFAULT_LANGUAGE.to_string())
        } else {
            Self(tag.to_ascii_lowercase())
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for LanguageTag {
    fn default() -> Self {
        Self(DEFAULT_LANGUAGE.to_string())
    }
}

impl fmt::Display for LanguageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Cache key of the form `{lat},{lon}@{lang}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Builds a key from already-rounded coordinates.
    pub fn from_rounded(latitude: f64, longitude: f64, language: &LanguageTag) -> Self {
        Self(format!("{},{}@{}", latitude, longitude, language))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A validated, rounded lookup ready for the cache and the provider.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedQuery {
    /// Latitude rounded to [`COORD_PRECISION`] places.
    pub latitude: f64,
    /// Longitude rounded to [`COORD_PRECISION`] places.
    pub longitude: f64,
    pub language: LanguageTag,
    pub key: CacheKey,
}

/// Validates and rounds a point, producing its cache key.
///
/// # Arguments
///
/// * `point` - Raw coordinates from the caller
/// * `language` - Language tag that becomes part of the key
///
/// # Returns
///
/// `None` if either coordinate is NaN or infinite.
pub fn normalize(point: GeoPoint, language: &LanguageTag) -> Option<NormalizedQuery> {
    if !point.is_valid() {
        return None;
    }

    let latitude = round_coordinate(point.latitude, COORD_PRECISION);
    let longitude = round_coordinate(point.longitude, COORD_PRECISION);
    let key = CacheKey::from_rounded(latitude, longitude, language);

    Some(NormalizedQuery {
        latitude,
        longitude,
        language: language.clone(),
        key,
    })
}

/// Rounds a value to `places` decimals, half away from zero.
///
/// Rounding is applied to the shortest decimal representation of the value
/// rather than to its binary expansion, so `40.7125` becomes `40.713` even
/// though the nearest double is slightly below the midpoint. Negative zero is
/// folded to zero. Non-finite input is returned unchanged.
pub fn round_coordinate(value: f64, places: usize) -> f64 {
    if !value.is_finite() {
        return value;
    }

    // f64 Display never uses exponent notation.
    let repr = value.abs().to_string();
    let (int_part, frac_part) = repr.split_once('.').unwrap_or((repr.as_str(), ""));

    if frac_part.len() <= places {
        return fold_negative_zero(value);
    }

    let mut digits: Vec<u8> = int_part
        .bytes()
        .chain(frac_part.bytes().take(places))
        .collect();

    if frac_part.as_bytes()[places] >= b'5' {
        increment_digits(&mut digits);
    }

    let split = digits.len() - places;
    let mut text = String::with_capacity(digits.len() + 2);
    if value.is_sign_negative() {
        text.push('-');
    }
    text.push_str(std::str::from_utf8(&digits[..split]).unwrap_or("0"));
    if places > 0 {
        text.push('.');
        text.push_str(std::str::from_utf8(&digits[split..]).unwrap_or("0"));
    }

    text.parse::<f64>()
        .map(fold_negative_zero)
        .unwrap_or_else(|_| fold_negative_zero(value))
}

/// Adds one unit in the last place to a string of ASCII digits.
fn increment_digits(digits: &mut Vec<u8>) {
    for digit in digits.iter_mut().rev() {
        if *digit == b'9' {
            *digit = b'0';
        } else {
            *digit += 1;
            return;
        }
    }
    digits.insert(0, b'1');
}

#[inline]
fn fold_negative_zero(value: f64) -> f64 {
    if value == 0.0 {
        0.0
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn en() -> LanguageTag {
        LanguageTag::default()
    }

    #[test]
    fn test_new_york_city_key() {
        let query = normalize(GeoPoint::new(40.7128, -74.0060), &en()).unwrap();
        assert_eq!(query.latitude, 40.713);
        assert_eq!(query.longitude, -74.006);
        assert_eq!(query.key.as_str(), "40.713,-74.006@en");
    }

    #[test]
    fn test_nearby_points_share_key() {
        let a = normalize(GeoPoint::new(40.71280001, -74.00600), &en()).unwrap();
        let b = normalize(GeoPoint::new(40.71284, -74.00601), &en()).unwrap();
        assert_eq!(a.key, b.key);
    }

    #[test]
    fn test_language_is_part_of_key() {
        let point = GeoPoint::new(48.8566, 2.3522);
        let en = normalize(point, &LanguageTag::new("en")).unwrap();
        let fr = normalize(point, &LanguageTag::new("fr")).unwrap();
        assert_ne!(en.key, fr.key);
        assert_eq!(fr.key.as_str(), "48.857,2.352@fr");
    }

    #[test]
    fn test_invalid_points_rejected() {
        assert!(normalize(GeoPoint::new(f64::NAN, 10.0), &en()).is_none());
        assert!(normalize(GeoPoint::new(10.0, f64::NAN), &en()).is_none());
        assert!(normalize(GeoPoint::new(f64::INFINITY, 10.0), &en()).is_none());
        assert!(normalize(GeoPoint::new(10.0, f64::NEG_INFINITY), &en()).is_none());
    }

    #[test]
    fn test_round_half_away_from_zero() {
        assert_eq!(round_coordinate(40.7125, 3), 40.713);
        assert_eq!(round_coordinate(-74.0065, 3), -74.007);
        assert_eq!(round_coordinate(1.0005, 3), 1.001);
        assert_eq!(round_coordinate(1.0004999, 3), 1.0);
    }

    #[test]
    fn test_round_carries_into_integer_part() {
        assert_eq!(round_coordinate(9.9995, 3), 10.0);
        assert_eq!(round_coordinate(-179.9996, 3), -180.0);
    }

    #[test]
    fn test_short_values_unchanged() {
        assert_eq!(round_coordinate(10.0, 3), 10.0);
        assert_eq!(round_coordinate(40.7, 3), 40.7);
        assert_eq!(round_coordinate(-0.25, 3), -0.25);
    }

    #[test]
    fn test_negative_zero_folded() {
        assert!(round_coordinate(-0.0001, 3).is_sign_positive());
        assert!(round_coordinate(-0.0, 3).is_sign_positive());

        let query = normalize(GeoPoint::new(-0.0002, 0.0), &en()).unwrap();
        assert_eq!(query.key.as_str(), "0,0@en");
    }

    #[test]
    fn test_integer_coordinates_render_without_fraction() {
        let query = normalize(GeoPoint::new(10.0, -20.0), &en()).unwrap();
        assert_eq!(query.key.as_str(), "10,-20@en");
    }

    #[test]
    fn test_language_tag_normalization() {
        assert_eq!(LanguageTag::new("").as_str(), "en");
        assert_eq!(LanguageTag::new("   ").as_str(), "en");
        assert_eq!(LanguageTag::new(" zh-CN ").as_str(), "zh-cn");
        assert_eq!(LanguageTag::default().as_str(), DEFAULT_LANGUAGE);
    }

    proptest! {
        #[test]
        fn prop_rounding_stays_within_half_unit(value in -180.0f64..180.0) {
            let rounded = round_coordinate(value, COORD_PRECISION);
            prop_assert!((rounded - value).abs() <= 0.0005 + 1e-9);
        }

        #[test]
        fn prop_rounding_is_idempotent(value in -180.0f64..180.0) {
            let once = round_coordinate(value, COORD_PRECISION);
            prop_assert_eq!(round_coordinate(once, COORD_PRECISION), once);
        }

        #[test]
        fn prop_key_is_deterministic(lat in -90.0f64..90.0, lon in -180.0f64..180.0) {
            let a = normalize(GeoPoint::new(lat, lon), &LanguageTag::default()).unwrap();
            let b = normalize(GeoPoint::new(lat, lon), &LanguageTag::default()).unwrap();
            prop_assert_eq!(a.key, b.key);
        }
    }
}
