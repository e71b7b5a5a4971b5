//! Configuration file handling for ~/.agrimap/config.ini.
//!
//! Settings structs live in [`super::settings`], defaults in
//! [`super::defaults`], parsing in [`super::parser`] and serialization in
//! [`super::writer`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use ini::Ini;
use thiserror::Error;

pub use super::defaults::*;
pub use super::settings::*;

use crate::ingest::{LibraryConfig, PipelineConfig};
use crate::map::{LatLng, MapConfig, View};
use crate::poll::PollerConfig;

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] ini::Error),

    /// Failed to write config file
    #[error("Failed to write config file: {0}")]
    WriteError(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },

    /// Failed to create config directory
    #[error("Failed to create config directory: {0}")]
    DirectoryError(std::io::Error),
}

impl ConfigFile {
    /// Loads configuration from ~/.agrimap/config.ini.
    pub fn load() -> Result<Self, ConfigFileError> {
        Self::load_from(&config_file_path())
    }

    /// Loads configuration from `path`; a missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path)?;
        super::parser::parse_ini(&ini)
    }

    /// Saves configuration to ~/.agrimap/config.ini.
    pub fn save(&self) -> Result<(), ConfigFileError> {
        self.save_to(&config_file_path())
    }

    /// Saves configuration to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigFileError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigFileError::DirectoryError)?;
        }

        let content = super::writer::to_config_string(self);
        std::fs::write(path, content).map_err(|e| ConfigFileError::WriteError(e.to_string()))
    }

    /// Writes the default config file if none exists and returns its path.
    pub fn ensure_exists() -> Result<PathBuf, ConfigFileError> {
        let path = config_file_path();
        if !path.exists() {
            Self::default().save_to(&path)?;
        }
        Ok(path)
    }

    pub fn library_config(&self) -> LibraryConfig {
        LibraryConfig {
            probe_interval: Duration::from_millis(self.kml.library_poll_interval_ms),
            max_attempts: self.kml.library_max_attempts,
        }
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            base_url: self.backend.base_url.clone(),
            library: self.library_config(),
        }
    }

    pub fn poller_config(&self) -> PollerConfig {
        PollerConfig::from_secs(self.poller.interval, self.poller.timeout)
    }

    pub fn map_config(&self) -> MapConfig {
        MapConfig {
            fit_padding: self.map.fit_padding,
            default_view: View::new(
                LatLng::new(self.map.default_latitude, self.map.default_longitude),
                self.map.default_zoom,
            ),
            base_tile: self.map.base_tile,
        }
    }
}

/// Path to the config directory (~/.agrimap).
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".agrimap")
}

/// Path to the config file (~/.agrimap/config.ini).
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::BaseTile;

    #[test]
    fn test_default_config() {
        let config = ConfigFile::default();

        assert!(config.backend.base_url.is_none());
        assert_eq!(config.backend.timeout, 30);
        assert_eq!(config.kml.library_poll_interval_ms, 100);
        assert_eq!(config.kml.library_max_attempts, 50);
        assert_eq!(config.poller.interval, 15);
        assert_eq!(config.poller.timeout, 180);
        assert_eq!(config.map.fit_padding, 20);
        assert_eq!(config.map.default_zoom, 13);
        assert_eq!(config.map.base_tile, BaseTile::Street);
        assert!(config.logging.directory.ends_with("logs"));
    }

    #[test]
    fn test_load_nonexistent_returns_defaults() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nonexistent.ini");

        let config = ConfigFile::load_from(&config_path).unwrap();

        assert_eq!(config, ConfigFile::default());
    }

    #[test]
    fn test_typed_sub_configs() {
        let mut config = ConfigFile::default();
        config.backend.base_url = Some("https://api.example.com".to_string());
        config.kml.library_poll_interval_ms = 250;
        config.poller.interval = 5;
        config.map.base_tile = BaseTile::Satellite;

        let pipeline = config.pipeline_config();
        assert_eq!(pipeline.base_url.as_deref(), Some("https://api.example.com"));
        assert_eq!(pipeline.library.probe_interval, Duration::from_millis(250));
        assert_eq!(pipeline.library.max_attempts, 50);

        assert_eq!(config.poller_config(), PollerConfig::from_secs(5, 180));

        let map = config.map_config();
        assert_eq!(map.base_tile, BaseTile::Satellite);
        assert_eq!(map, MapConfig::default().with_base_tile(BaseTile::Satellite));
    }

    #[test]
    fn test_config_directory_name() {
        assert!(config_directory().ends_with(".agrimap"));
        assert!(config_file_path().ends_with("config.ini"));
    }
}
