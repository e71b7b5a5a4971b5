//! Configuration file and typed sub-configurations.
//!
//! `~/.agrimap/config.ini` is parsed into a [`ConfigFile`], from which each
//! component takes its own typed settings:
//!
//! ```
//! use agrimap::config::ConfigFile;
//!
//! let config = ConfigFile::default();
//! let poller = config.poller_config();
//! assert_eq!(poller.interval.as_secs(), 15);
//! ```

mod defaults;
mod file;
mod parser;
mod settings;
mod writer;

pub use file::{config_directory, config_file_path, ConfigFileError};
pub use defaults::{default_log_directory, MAX_CONFIG_ZOOM};
pub use settings::{
    BackendSettings, ConfigFile, KmlSettings, LoggingSettings, MapSettings, PollerSettings,
};
