//! INI serialization: `ConfigFile` → commented INI string.

use std::path::Path;

use super::settings::ConfigFile;

/// Renders `config` as the commented INI written to `config.ini`.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let base_url = config.backend.base_url.as_deref().unwrap_or("");

    format!(
        r#"[backend]
; Backend API base URL. Assessments are read from <base_url>/assessments/<id>
; and relative KML references (e.g. /media/kml/field-12.kml) resolve against it.
; Example: base_url = https://api.example.com/api
base_url = {}
; HTTP request timeout in seconds (default: 30)
timeout = {}

[kml]
; While the KML conversion library loads, its export is probed every
; library_poll_interval_ms milliseconds, at most library_max_attempts times
; (defaults: 100 ms x 50 attempts)
library_poll_interval_ms = {}
library_max_attempts = {}

[poller]
; Seconds between checks for a finished drone analysis (default: 15)
interval = {}
; Seconds before giving up and asking the user to refresh later (default: 180)
timeout = {}

[map]
; Padding in pixels around a field boundary when zooming to it (default: 20)
fit_padding = {}
; View shown before any boundary is loaded
default_zoom = {}
default_latitude = {}
default_longitude = {}
; Base map: street, satellite or terrain (default: street)
base_tile = {}

[logging]
; Log directory and file name
directory = {}
file = {}
"#,
        base_url,
        config.backend.timeout,
        config.kml.library_poll_interval_ms,
        config.kml.library_max_attempts,
        config.poller.interval,
        config.poller.timeout,
        config.map.fit_padding,
        config.map.default_zoom,
        config.map.default_latitude,
        config.map.default_longitude,
        config.map.base_tile,
        path_to_string(&config.logging.directory),
        config.logging.file,
    )
}

/// Converts a path to a string, collapsing the home directory to `~`.
fn path_to_string(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(stripped) = path.strip_prefix(&home) {
            return format!("~/{}", stripped.display());
        }
    }
    path.display().to_string()
}
