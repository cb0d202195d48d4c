//! Configuration for octostage.
//!
//! Settings are read from `~/.octostage/config.ini` (or an explicit path) and
//! converted into the configuration objects of the individual components:
//! [`LoaderConfig`](crate::orchestrator::LoaderConfig),
//! [`ProcessBackendConfig`](crate::render::ProcessBackendConfig) and
//! [`FontSourceConfig`](crate::fonts::FontSourceConfig).
//!
//! # Example
//!
//! ```ignore
//! use octostage::config::ConfigFile;
//!
//! let config = ConfigFile::load()?;
//! let loader_config = config.loader_config();
//! ```

mod defaults;
mod file;
mod parser;
mod settings;
mod writer;

pub use defaults::{
    default_cache_directory, default_log_path, DEFAULT_FONT_FALLBACKS, DEFAULT_LOG_FILE,
    DEFAULT_REQUEST_TIMEOUT_SECS,
};
pub use file::{config_directory, config_file_path, ConfigFile, ConfigFileError};
pub use settings::{ContentSettings, FontSettings, LoggingSettings, RenderSettings, StagingSettings};
