//! Default values for all configuration settings.

use super::settings::*;
use crate::http::DEFAULT_HTTP_TIMEOUT_SECS;
use crate::ingest::{DEFAULT_PROBE_ATTEMPTS, DEFAULT_PROBE_INTERVAL_MS};
use crate::logging::DEFAULT_LOG_FILE;
use crate::map::{BaseTile, DEFAULT_CENTER, DEFAULT_FIT_PADDING_PX, DEFAULT_ZOOM};
use crate::poll::{DEFAULT_POLL_INTERVAL_SECS, DEFAULT_POLL_TIMEOUT_SECS};

/// Highest zoom accepted for `map.default_zoom`.
pub const MAX_CONFIG_ZOOM: u8 = 22;

/// Default log directory (~/.agrimap/logs).
pub fn default_log_directory() -> std::path::PathBuf {
    super::file::config_directory().join("logs")
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            backend: BackendSettings {
                base_url: None,
                timeout: DEFAULT_HTTP_TIMEOUT_SECS,
            },
            kml: KmlSettings {
                library_poll_interval_ms: DEFAULT_PROBE_INTERVAL_MS,
                library_max_attempts: DEFAULT_PROBE_ATTEMPTS,
            },
            poller: PollerSettings {
                interval: DEFAULT_POLL_INTERVAL_SECS,
                timeout: DEFAULT_POLL_TIMEOUT_SECS,
            },
            map: MapSettings {
                fit_padding: DEFAULT_FIT_PADDING_PX,
                default_zoom: DEFAULT_ZOOM,
                default_latitude: DEFAULT_CENTER.lat,
                default_longitude: DEFAULT_CENTER.lng,
                base_tile: BaseTile::Street,
            },
            logging: LoggingSettings {
                directory: default_log_directory(),
                file: DEFAULT_LOG_FILE.to_string(),
            },
        }
    }
}
