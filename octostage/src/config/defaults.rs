//! Default values for all configuration settings.

use std::path::PathBuf;

use super::file::config_directory;
use super::settings::*;
use crate::render::DEFAULT_REQUEST_TIMEOUT;
use crate::staging::DEFAULT_MAX_CONCURRENT_ASSETS;

/// Fallback fonts tried when a document font is not installed.
pub const DEFAULT_FONT_FALLBACKS: &[&str] = &["Inter-Regular", "Roboto-Regular"];

/// Default engine response timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = DEFAULT_REQUEST_TIMEOUT.as_secs();

/// Default log file name.
pub const DEFAULT_LOG_FILE: &str = "octostage.log";

/// Default content cache directory (~/.octostage/cache).
pub fn default_cache_directory() -> PathBuf {
    config_directory().join("cache")
}

/// Default log file path (~/.octostage/octostage.log).
pub fn default_log_path() -> PathBuf {
    config_directory().join(DEFAULT_LOG_FILE)
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            content: ContentSettings {
                cache_directory: default_cache_directory(),
            },
            fonts: FontSettings {
                directory: None,
                fallbacks: DEFAULT_FONT_FALLBACKS
                    .iter()
                    .map(|name| name.to_string())
                    .collect(),
                system_fonts: true,
            },
            render: RenderSettings {
                command: None,
                args: Vec::new(),
                request_timeout: DEFAULT_REQUEST_TIMEOUT_SECS,
            },
            staging: StagingSettings {
                max_concurrent_assets: DEFAULT_MAX_CONCURRENT_ASSETS,
                asset_depth: None,
            },
            logging: LoggingSettings {
                file: default_log_path(),
            },
        }
    }
}
