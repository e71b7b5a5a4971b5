//! Settings structs for all configuration sections.
//!
//! Each struct represents one `[section]` of the INI config file.

use std::path::PathBuf;

use crate::map::BaseTile;

/// Complete configuration loaded from config.ini.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    pub backend: BackendSettings,
    pub kml: KmlSettings,
    pub poller: PollerSettings,
    pub map: MapSettings,
    pub logging: LoggingSettings,
}

/// Backend API settings.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendSettings {
    /// API base URL, used for assessments and relative KML references
    pub base_url: Option<String>,
    /// HTTP request timeout in seconds
    pub timeout: u64,
}

/// KML conversion library loading.
#[derive(Debug, Clone, PartialEq)]
pub struct KmlSettings {
    /// Milliseconds between capability probes
    pub library_poll_interval_ms: u64,
    /// Probes before the library is declared unavailable
    pub library_max_attempts: u32,
}

/// Drone analysis polling.
#[derive(Debug, Clone, PartialEq)]
pub struct PollerSettings {
    /// Seconds between polls
    pub interval: u64,
    /// Seconds before a session times out
    pub timeout: u64,
}

/// Map presentation.
#[derive(Debug, Clone, PartialEq)]
pub struct MapSettings {
    /// Padding around a fitted boundary, in pixels
    pub fit_padding: u32,
    pub default_zoom: u8,
    pub default_latitude: f64,
    pub default_longitude: f64,
    pub base_tile: BaseTile,
}

/// Log output location.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    pub directory: PathBuf,
    pub file: String,
}
