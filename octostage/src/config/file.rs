//! Configuration file handling for ~/.octostage/config.ini.
//!
//! Settings structs live in [`super::settings`], defaults in
//! [`super::defaults`], parsing in [`super::parser`] and serialization in
//! [`super::writer`].

use ini::Ini;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub use super::settings::*;

use crate::fonts::FontSourceConfig;
use crate::orchestrator::LoaderConfig;
use crate::render::ProcessBackendConfig;
use crate::staging::StagingConfig;

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
    /// Load configuration from the default path (~/.octostage/config.ini).
    pub fn load() -> Result<Self, ConfigFileError> {
        Self::load_from(&config_file_path())
    }

    /// Load configuration from a specific path.
    ///
    /// If the file doesn't exist, returns defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path)?;
        super::parser::parse_ini(&ini)
    }

    /// Save configuration to the default path.
    pub fn save(&self) -> Result<(), ConfigFileError> {
        self.save_to(&config_file_path())
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigFileError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigFileError::DirectoryError)?;
        }

        let content = super::writer::to_config_string(self);
        std::fs::write(path, content).map_err(|e| ConfigFileError::WriteError(e.to_string()))
    }

    /// Create the config file with defaults if it doesn't exist.
    ///
    /// Returns the path to the config file.
    pub fn ensure_exists(path: &Path) -> Result<PathBuf, ConfigFileError> {
        if !path.exists() {
            Self::default().save_to(path)?;
        }
        Ok(path.to_path_buf())
    }

    // =========================================================================
    // Component configuration
    // =========================================================================

    pub fn loader_config(&self) -> LoaderConfig {
        LoaderConfig {
            staging: StagingConfig {
                max_concurrent_assets: self.staging.max_concurrent_assets,
                asset_depth: self.staging.asset_depth,
            },
            font_directory: self.fonts.directory.clone(),
        }
    }

    /// Engine process settings, or `None` while no command is configured.
    pub fn process_backend_config(&self) -> Option<ProcessBackendConfig> {
        let command = self.render.command.as_ref()?;
        Some(
            ProcessBackendConfig::new(command)
                .with_args(self.render.args.clone())
                .with_request_timeout(Duration::from_secs(self.render.request_timeout)),
        )
    }

    pub fn font_source_config(&self) -> FontSourceConfig {
        FontSourceConfig {
            directory: self.fonts.directory.clone(),
            system_fonts: self.fonts.system_fonts,
            fallbacks: self.fonts.fallbacks.clone(),
        }
    }
}

/// Get the path to the config directory (~/.octostage).
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".octostage")
}

/// Get the path to the config file (~/.octostage/config.ini).
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}
