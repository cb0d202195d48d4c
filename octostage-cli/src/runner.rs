//! CLI runner for common setup and operations.
//!
//! Encapsulates configuration loading, logging initialization and runtime
//! creation shared by the command handlers.

use crate::error::CliError;
use octostage::config::{config_file_path, ConfigFile};
use octostage::content::LocalContentCache;
use octostage::logging::{init_logging, split_log_path, LoggingGuard};
use std::future::Future;
use std::path::{Path, PathBuf};
use tokio::runtime::Runtime;
use tracing::info;

/// Runner that manages the CLI lifecycle.
pub struct CliRunner {
    /// Keeps logging active while the runner exists
    _logging_guard: LoggingGuard,
    config: ConfigFile,
    config_path: PathBuf,
    runtime: Runtime,
}

impl CliRunner {
    /// Load the configuration and initialize logging.
    ///
    /// # Arguments
    ///
    /// * `config_path` - Explicit config file, or `None` for ~/.octostage/config.ini
    /// * `debug_mode` - Enables debug-level logging when RUST_LOG is unset
    pub fn new(config_path: Option<&Path>, debug_mode: bool) -> Result<Self, CliError> {
        let config_path = config_path
            .map(Path::to_path_buf)
            .unwrap_or_else(config_file_path);
        let config = ConfigFile::load_from(&config_path)?;

        let (log_dir, log_file) = split_log_path(&config.logging.file);
        let logging_guard = init_logging(&log_dir, &log_file, debug_mode, debug_mode)
            .map_err(|e| CliError::LoggingInit(e.to_string()))?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("octostage")
            .build()
            .map_err(CliError::Runtime)?;

        Ok(Self {
            _logging_guard: logging_guard,
            config,
            config_path,
            runtime,
        })
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Log startup information for a command.
    pub fn log_startup(&self, command: &str) {
        info!("octostage v{}", octostage::VERSION);
        info!(config = %self.config_path.display(), "octostage CLI: {} command", command);
    }

    /// Local design cache at the configured directory.
    pub fn content_cache(&self) -> LocalContentCache {
        LocalContentCache::new(&self.config.content.cache_directory)
    }

    /// Run a future to completion on the runner's runtime.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }
}
