//! INI parsing: `Ini` → `ConfigFile`.
//!
//! The single place where INI key names are mapped to struct fields.

use std::path::PathBuf;
use std::str::FromStr;

use ini::{Ini, Properties};
use reqwest::Url;

use super::defaults::MAX_CONFIG_ZOOM;
use super::file::ConfigFileError;
use super::settings::ConfigFile;
use crate::geometry::{MAX_LAT, MAX_LON, MIN_LAT, MIN_LON};
use crate::map::BaseTile;

/// Parses an `Ini` into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [backend]
    if let Some(section) = ini.section(Some("backend")) {
        if let Some(v) = non_empty(section, "base_url") {
            Url::parse(v).map_err(|e| invalid("backend", "base_url", v, &e.to_string()))?;
            config.backend.base_url = Some(v.to_string());
        }
        if let Some(v) = non_empty(section, "timeout") {
            config.backend.timeout = positive("backend", "timeout", v)?;
        }
    }

    // [kml]
    if let Some(section) = ini.section(Some("kml")) {
        if let Some(v) = non_empty(section, "library_poll_interval_ms") {
            config.kml.library_poll_interval_ms = positive("kml", "library_poll_interval_ms", v)?;
        }
        if let Some(v) = non_empty(section, "library_max_attempts") {
            config.kml.library_max_attempts = positive("kml", "library_max_attempts", v)?;
        }
    }

    // [poller]
    if let Some(section) = ini.section(Some("poller")) {
        if let Some(v) = non_empty(section, "interval") {
            config.poller.interval = positive("poller", "interval", v)?;
        }
        if let Some(v) = non_empty(section, "timeout") {
            config.poller.timeout = positive("poller", "timeout", v)?;
        }
    }

    // [map]
    if let Some(section) = ini.section(Some("map")) {
        if let Some(v) = non_empty(section, "fit_padding") {
            config.map.fit_padding = number("map", "fit_padding", v, "expected pixels (0 or more)")?;
        }
        if let Some(v) = non_empty(section, "default_zoom") {
            let zoom: u8 = number("map", "default_zoom", v, "expected a zoom level from 0 to 22")?;
            if zoom > MAX_CONFIG_ZOOM {
                return Err(invalid("map", "default_zoom", v, "expected a zoom level from 0 to 22"));
            }
            config.map.default_zoom = zoom;
        }
        if let Some(v) = non_empty(section, "default_latitude") {
            config.map.default_latitude = coordinate("default_latitude", v, MIN_LAT, MAX_LAT)?;
        }
        if let Some(v) = non_empty(section, "default_longitude") {
            config.map.default_longitude = coordinate("default_longitude", v, MIN_LON, MAX_LON)?;
        }
        if let Some(v) = non_empty(section, "base_tile") {
            config.map.base_tile = v
                .parse::<BaseTile>()
                .map_err(|_| invalid("map", "base_tile", v, "must be one of: street, satellite, terrain"))?;
        }
    }

    // [logging]
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = non_empty(section, "directory") {
            config.logging.directory = expand_tilde(v);
        }
        if let Some(v) = non_empty(section, "file") {
            config.logging.file = v.to_string();
        }
    }

    Ok(config)
}

fn non_empty<'a>(section: &'a Properties, key: &str) -> Option<&'a str> {
    section.get(key).map(str::trim).filter(|v| !v.is_empty())
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn number<T: FromStr>(section: &str, key: &str, value: &str, reason: &str) -> Result<T, ConfigFileError> {
    value.parse().map_err(|_| invalid(section, key, value, reason))
}

fn positive<T>(section: &str, key: &str, value: &str) -> Result<T, ConfigFileError>
where
    T: FromStr + Default + PartialOrd,
{
    let parsed: T = number(section, key, value, "expected a positive whole number")?;
    if parsed <= T::default() {
        return Err(invalid(section, key, value, "expected a positive whole number"));
    }
    Ok(parsed)
}

fn coordinate(key: &str, value: &str, min: f64, max: f64) -> Result<f64, ConfigFileError> {
    let reason = format!("expected a number from {} to {}", min, max);
    let parsed: f64 = number("map", key, value, &reason)?;
    if !parsed.is_finite() || !(min..=max).contains(&parsed) {
        return Err(invalid("map", key, value, &reason));
    }
    Ok(parsed)
}

/// Expands `~/` to the home directory.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}
