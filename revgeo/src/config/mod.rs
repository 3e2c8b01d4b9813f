//! Geocoder configuration.
//!
//! [`GeocoderConfig`] holds everything needed to start a
//! [`ReverseGeocoder`](crate::geocoder::ReverseGeocoder). [`ConfigFile`]
//! reads it, together with logging settings, from an INI file:
//!
//! ```ini
//! [geocoding]
//! endpoint = https://nominatim.openstreetmap.org
//! accept_language = en
//! user_agent = my-photo-site/1.0
//! min_interval_ms = 1000
//! ttl_days = 365
//! timeout_secs = 30
//!
//! [cache]
//! file = /var/cache/photos/geocode-cache.json
//!
//! [logging]
//! level = info
//! file = /var/log/revgeo.log
//! ```
//!
//! Every key is optional; missing keys keep their defaults.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ini::{Ini, Properties};
use thiserror::Error;

use crate::coord::LanguageTag;
use crate::logging::LoggingConfig;
use crate::provider::{DEFAULT_ENDPOINT, DEFAULT_TIMEOUT};
use crate::scheduler::{SchedulerConfig, DEFAULT_MIN_INTERVAL};

/// How long a cached result stays fresh (one year).
pub const DEFAULT_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Cache file name inside the cache directory.
pub const CACHE_FILE_NAME: &str = "geocode-cache.json";

/// Config file name inside the config directory.
pub const CONFIG_FILE_NAME: &str = "config.ini";

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Errors raised while reading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file exists but could not be read or parsed.
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: ini::Error,
    },

    /// A key holds a value of the wrong type.
    #[error("Invalid value for [{section}] {key}: {value:?}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
    },
}

/// Settings for the reverse geocoder.
#[derive(Clone, Debug)]
pub struct GeocoderConfig {
    /// Provider base URL; `/reverse` is appended.
    pub endpoint: String,

    /// Identifying `User-Agent` sent with every request.
    pub user_agent: String,

    /// Language tag for results, part of every cache key.
    pub language: LanguageTag,

    /// JSON file holding the persistent cache.
    pub cache_file: PathBuf,

    /// Minimum spacing between provider requests.
    pub min_interval: Duration,

    /// Age after which cached entries are refreshed.
    pub ttl: Duration,

    /// Transport timeout for a single provider request.
    pub request_timeout: Duration,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            user_agent: default_user_agent(),
            language: LanguageTag::default(),
            cache_file: default_cache_path(),
            min_interval: DEFAULT_MIN_INTERVAL,
            ttl: DEFAULT_TTL,
            request_timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl GeocoderConfig {
    /// Creates a config with defaults and the given cache file.
    pub fn new(cache_file: impl Into<PathBuf>) -> Self {
        Self {
            cache_file: cache_file.into(),
            ..Self::default()
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_language(mut self, language: impl AsRef<str>) -> Self {
        self.language = LanguageTag::new(language);
        self
    }

    pub fn with_cache_file(mut self, cache_file: impl Into<PathBuf>) -> Self {
        self.cache_file = cache_file.into();
        self
    }

    pub fn with_min_interval(mut self, min_interval: Duration) -> Self {
        self.min_interval = min_interval;
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub(crate) fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            min_interval: self.min_interval,
        }
    }
}

/// Contents of the INI config file.
#[derive(Clone, Debug, Default)]
pub struct ConfigFile {
    pub geocoder: GeocoderConfig,
    pub logging: LoggingConfig,
}

impl ConfigFile {
    /// Loads the config from the default location.
    ///
    /// A missing file yields defaults.
    pub fn load() -> Result<Self, ConfigError> {
        match default_config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Loads the config from `path`; a missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let ini = match Ini::load_from_file(path) {
            Ok(ini) => ini,
            Err(ini::Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        Self::from_ini(&ini)
    }

    /// Builds the config from parsed INI contents.
    pub fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(section) = ini.section(Some("geocoding")) {
            let geocoder = &mut config.geocoder;
            if let Some(endpoint) = non_empty(section, "endpoint") {
                geocoder.endpoint = endpoint.to_string();
            }
            if let Some(language) = section.get("accept_language") {
                geocoder.language = LanguageTag::new(language);
            }
            if let Some(user_agent) = non_empty(section, "user_agent") {
                geocoder.user_agent = user_agent.to_string();
            }
            if let Some(ms) = parse_value::<u64>(section, "geocoding", "min_interval_ms")? {
                geocoder.min_interval = Duration::from_millis(ms);
            }
            if let Some(days) = parse_value::<u64>(section, "geocoding", "ttl_days")? {
                geocoder.ttl = Duration::from_secs(days.saturating_mul(SECONDS_PER_DAY));
            }
            if let Some(secs) = parse_value::<u64>(section, "geocoding", "timeout_secs")? {
                geocoder.request_timeout = Duration::from_secs(secs);
            }
        }

        if let Some(section) = ini.section(Some("cache")) {
            if let Some(file) = non_empty(section, "file") {
                config.geocoder.cache_file = PathBuf::from(file);
            }
        }

        if let Some(section) = ini.section(Some("logging")) {
            if let Some(level) = non_empty(section, "level") {
                config.logging.level = level.to_string();
            }
            if let Some(file) = non_empty(section, "file") {
                config.logging.file = Some(PathBuf::from(file));
            }
        }

        Ok(config)
    }
}

fn non_empty<'a>(section: &'a Properties, key: &str) -> Option<&'a str> {
    section.get(key).map(str::trim).filter(|v| !v.is_empty())
}

fn parse_value<T: FromStr>(
    section: &Properties,
    section_name: &str,
    key: &str,
) -> Result<Option<T>, ConfigError> {
    match non_empty(section, key) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                section: section_name.to_string(),
                key: key.to_string(),
                value: raw.to_string(),
            }),
    }
}

/// `User-Agent` used when none is configured.
pub fn default_user_agent() -> String {
    format!("revgeo/{}", crate::VERSION)
}

/// Default cache file: `<cache dir>/revgeo/geocode-cache.json`.
///
/// Falls back to `./.geocode-cache.json` when the platform has no cache
/// directory.
pub fn default_cache_path() -> PathBuf {
    dirs::cache_dir()
        .map(|dir| dir.join("revgeo").join(CACHE_FILE_NAME))
        .unwrap_or_else(|| PathBuf::from(format!(".{}", CACHE_FILE_NAME)))
}

/// Default config file: `<config dir>/revgeo/config.ini`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("revgeo").join(CONFIG_FILE_NAME))
}
